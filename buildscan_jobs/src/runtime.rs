//! Process-wide shared handle: the detector, the tile fetcher, and configuration.
//!
//! Kept deliberately small compared to a full event-bus/progress-factory runtime -
//! the orchestrator only ever needs these three things to run a job.

use buildscan_core::AppConfig;
use buildscan_pipeline::{DetectorHandle, HttpTileFetcher, MockDetector, TileFetcher};
use std::sync::Arc;

pub struct Runtime {
	pub config: AppConfig,
	pub detector: DetectorHandle,
	pub fetcher: Arc<dyn TileFetcher>,
}

impl Runtime {
	pub fn builder() -> RuntimeBuilder {
		RuntimeBuilder::new()
	}
}

pub struct RuntimeBuilder {
	config: Option<AppConfig>,
	detector: Option<DetectorHandle>,
	fetcher: Option<Arc<dyn TileFetcher>>,
	tile_url_template: Option<String>,
}

impl RuntimeBuilder {
	pub fn new() -> RuntimeBuilder {
		RuntimeBuilder { config: None, detector: None, fetcher: None, tile_url_template: None }
	}

	pub fn config(mut self, config: AppConfig) -> Self {
		self.config = Some(config);
		self
	}

	pub fn detector(mut self, detector: DetectorHandle) -> Self {
		self.detector = Some(detector);
		self
	}

	pub fn tile_url_template(mut self, template: impl Into<String>) -> Self {
		self.tile_url_template = Some(template.into());
		self
	}

	pub fn fetcher(mut self, fetcher: Arc<dyn TileFetcher>) -> Self {
		self.fetcher = Some(fetcher);
		self
	}

	pub fn build(self) -> anyhow::Result<Runtime> {
		let config = self.config.unwrap_or_default();
		let detector = self
			.detector
			.unwrap_or_else(|| DetectorHandle::new(Arc::new(MockDetector::default())));
		let fetcher = match self.fetcher {
			Some(f) => f,
			None => {
				let template = self
					.tile_url_template
					.unwrap_or_else(|| "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string());
				Arc::new(HttpTileFetcher::new(template)?)
			}
		};
		Ok(Runtime { config, detector, fetcher })
	}
}

impl Default for RuntimeBuilder {
	fn default() -> Self {
		RuntimeBuilder::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builder_defaults_to_mock_detector_and_osm_tiles() {
		let runtime = Runtime::builder().build().unwrap();
		assert_eq!(runtime.config.port, 5050);
	}
}
