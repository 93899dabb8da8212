//! Data types shared across the pipeline and job-management crates.

use serde::{Deserialize, Serialize};

use crate::tile::{GeoBounds, Tile};

/// One detection in tile-pixel space, as returned by the detector adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDetection {
	pub x1: f32,
	pub y1: f32,
	pub x2: f32,
	pub y2: f32,
	pub score: f32,
	pub class: u32,
}

impl RawDetection {
	pub fn width(&self) -> f32 {
		self.x2 - self.x1
	}

	pub fn height(&self) -> f32 {
		self.y2 - self.y1
	}
}

/// All detections found in a single tile, persisted as the "detailed" tile file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileResult {
	pub z: u8,
	pub x: u32,
	pub y: u32,
	pub bounds: (f64, f64, f64, f64),
	pub detections: Vec<RawDetection>,
	pub processed_at: String,
}

impl TileResult {
	pub fn tile(&self) -> Tile {
		Tile::new(self.z, self.x, self.y).expect("persisted tile coordinate is always valid")
	}

	pub fn geo_bounds(&self) -> GeoBounds {
		GeoBounds {
			west: self.bounds.0,
			south: self.bounds.1,
			east: self.bounds.2,
			north: self.bounds.3,
		}
	}
}

/// One entry of the "simple" tile file: a detection's centroid only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleDetection {
	pub id: String,
	pub longitude: f64,
	pub latitude: f64,
}

/// A final, user-visible building: a centroid plus a stable ordinal id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalBuilding {
	pub id: u32,
	pub longitude: f64,
	pub latitude: f64,
}

/// Tunable parameters accepted on a detection request, each defaulting from [`crate::config::AppConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
	pub zoom: u8,
	pub confidence: f32,
	pub batch_size: usize,
	pub enable_merging: bool,
	pub merge_iou_threshold: f64,
	pub merge_touch_enabled: bool,
	pub merge_min_edge_distance_deg: f64,
}

impl Default for DetectionParams {
	fn default() -> Self {
		let cfg = crate::config::AppConfig::default();
		DetectionParams {
			zoom: cfg.default_zoom,
			confidence: cfg.default_confidence,
			batch_size: cfg.default_batch_size,
			enable_merging: cfg.default_enable_merging,
			merge_iou_threshold: cfg.default_merge_iou_threshold,
			merge_touch_enabled: cfg.default_merge_touch_enabled,
			merge_min_edge_distance_deg: cfg.default_merge_min_edge_distance_deg,
		}
	}
}

impl DetectionParams {
	pub fn from_config(cfg: &crate::config::AppConfig) -> DetectionParams {
		DetectionParams {
			zoom: cfg.default_zoom,
			confidence: cfg.default_confidence,
			batch_size: cfg.default_batch_size,
			enable_merging: cfg.default_enable_merging,
			merge_iou_threshold: cfg.default_merge_iou_threshold,
			merge_touch_enabled: cfg.default_merge_touch_enabled,
			merge_min_edge_distance_deg: cfg.default_merge_min_edge_distance_deg,
		}
	}
}
