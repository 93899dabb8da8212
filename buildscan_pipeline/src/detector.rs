//! The detector adapter contract and its thread-safety wrapper.

use anyhow::Result;
use buildscan_core::RawDetection;
use image::RgbImage;
use parking_lot::Mutex;
use std::sync::Arc;

/// A black-box object detector. Implementations are not assumed to be reentrant;
/// see [`DetectorHandle`] for the serialization contract.
pub trait Detector: Send + Sync {
	fn detect(&self, image: &RgbImage, conf_threshold: f32) -> Result<Vec<RawDetection>>;

	/// Declares whether concurrent calls to `detect` are safe without external locking.
	/// Defaults to `false`; override only for adapters documented as reentrant.
	fn is_reentrant(&self) -> bool {
		false
	}
}

/// Wraps a [`Detector`] with the process-wide lock required by non-reentrant
/// implementations. Cloning shares the same underlying lock and detector.
#[derive(Clone)]
pub struct DetectorHandle {
	inner: Arc<dyn Detector>,
	lock: Arc<Mutex<()>>,
}

impl DetectorHandle {
	pub fn new(detector: Arc<dyn Detector>) -> DetectorHandle {
		DetectorHandle { inner: detector, lock: Arc::new(Mutex::new(())) }
	}

	pub fn detect(&self, image: &RgbImage, conf_threshold: f32) -> Result<Vec<RawDetection>> {
		if self.inner.is_reentrant() {
			return self.inner.detect(image, conf_threshold);
		}
		let _guard = self.lock.lock();
		self.inner.detect(image, conf_threshold)
	}
}

/// A deterministic stand-in detector used by tests and, absent a real model path,
/// by the binary itself: returns one fixed box per image when it's larger than a
/// token size, clamped to the image rectangle.
pub struct MockDetector {
	pub boxes: Vec<(f32, f32, f32, f32, f32)>,
}

impl Default for MockDetector {
	fn default() -> Self {
		MockDetector { boxes: vec![(10.0, 10.0, 100.0, 100.0, 0.9)] }
	}
}

impl Detector for MockDetector {
	fn detect(&self, image: &RgbImage, conf_threshold: f32) -> Result<Vec<RawDetection>> {
		let (w, h) = (image.width() as f32, image.height() as f32);
		Ok(self
			.boxes
			.iter()
			.filter(|&&(_, _, _, _, score)| score >= conf_threshold)
			.map(|&(x1, y1, x2, y2, score)| RawDetection {
				x1: x1.clamp(0.0, w),
				y1: y1.clamp(0.0, h),
				x2: x2.clamp(0.0, w),
				y2: y2.clamp(0.0, h),
				score,
				class: 0,
			})
			.collect())
	}

	fn is_reentrant(&self) -> bool {
		true
	}
}
