//! Reprojects per-tile detections to geographic rectangles and transitively merges
//! fragments of the same building across tile boundaries.

use buildscan_core::{RawDetection, Tile, TileResult};

use crate::rect::GeoRect;
use crate::unionfind::UnionFind;

#[derive(Debug, Clone)]
pub struct MergeConfig {
	pub iou_threshold: f64,
	pub touch_enabled: bool,
	pub min_edge_distance_deg: f64,
	pub allowed_phases: [bool; 3],
}

impl Default for MergeConfig {
	fn default() -> Self {
		MergeConfig {
			iou_threshold: 0.1,
			touch_enabled: true,
			min_edge_distance_deg: 1e-5,
			allowed_phases: [true, true, false],
		}
	}
}

#[derive(Debug, Clone)]
struct GeoDetection {
	id: String,
	tile: Tile,
	rect: GeoRect,
	score: f32,
}

#[derive(Debug, Clone)]
pub struct MergedBuilding {
	pub envelope: GeoRect,
	pub score: f32,
	pub original_ids: Vec<String>,
}

/// Reprojects every raw detection in `tiles` to a geographic rectangle. Step A of the merge.
fn reproject(tiles: &[TileResult]) -> Vec<GeoDetection> {
	let mut out = Vec::new();
	for tr in tiles {
		let tile = tr.tile();
		for (i, det) in tr.detections.iter().enumerate() {
			out.push(GeoDetection {
				id: format!("{}_{}", tile.id(), i),
				tile,
				rect: raw_detection_to_rect(&tile, det),
				score: det.score,
			});
		}
	}
	out
}

fn raw_detection_to_rect(tile: &Tile, det: &RawDetection) -> GeoRect {
	let (west, north) = tile.pixel_to_lonlat(det.x1 as f64, det.y1 as f64);
	let (east, south) = tile.pixel_to_lonlat(det.x2 as f64, det.y2 as f64);
	GeoRect::new(west, south, east, north)
}

/// Edge classified by phase; smaller `score` is a stronger merge signal within its phase.
struct Edge {
	phase: u8,
	score: f64,
	a: usize,
	b: usize,
}

/// How well two adjacent-tile detections align along the shared tile boundary: 1 means
/// their centroids line up across the boundary, 0 means they don't (or aren't adjacent).
///
/// The projection follows the direction between the two tiles, not either rectangle's
/// own shape: a horizontal tile boundary (tiles differ in x) checks latitude alignment,
/// a vertical one (tiles differ in y) checks longitude alignment, and a diagonal
/// boundary takes the minimum of both.
fn boundary_proximity(a: &GeoDetection, b: &GeoDetection) -> f64 {
	if !a.tile.is_adjacent(&b.tile) {
		return 0.0;
	}
	let dx = b.tile.x as i64 - a.tile.x as i64;
	let dy = b.tile.y as i64 - a.tile.y as i64;
	let (ca, cb) = (a.rect.centroid(), b.rect.centroid());

	let vertical_alignment = || -> f64 {
		let extent = a.rect.height().max(b.rect.height());
		if extent <= 0.0 {
			return 0.0;
		}
		(1.0 - (ca.1 - cb.1).abs() / extent).clamp(0.0, 1.0)
	};
	let horizontal_alignment = || -> f64 {
		let extent = a.rect.width().max(b.rect.width());
		if extent <= 0.0 {
			return 0.0;
		}
		(1.0 - (ca.0 - cb.0).abs() / extent).clamp(0.0, 1.0)
	};

	match (dx != 0, dy != 0) {
		(true, false) => vertical_alignment(),
		(false, true) => horizontal_alignment(),
		_ => vertical_alignment().min(horizontal_alignment()),
	}
}

fn classify(a: &GeoDetection, b: &GeoDetection, cfg: &MergeConfig) -> Option<Edge> {
	let iou = a.rect.iou(&b.rect);
	if iou > cfg.iou_threshold {
		return Some(Edge { phase: 1, score: -iou, a: 0, b: 0 });
	}

	let touches = a.rect.touches(&b.rect);
	let edge_dist = a.rect.edge_distance(&b.rect);
	let axis_align = (a.rect.axis().0 * b.rect.axis().0 + a.rect.axis().1 * b.rect.axis().1).abs();
	let boundary = boundary_proximity(a, b);

	if boundary > 0.7 {
		if cfg.touch_enabled && touches {
			let score = -boundary * axis_align.powi(5);
			return Some(Edge { phase: 2, score, a: 0, b: 0 });
		}
		if edge_dist > 0.0 && edge_dist < cfg.min_edge_distance_deg {
			let score = edge_dist / cfg.min_edge_distance_deg - boundary;
			return Some(Edge { phase: 2, score, a: 0, b: 0 });
		}
	}

	if cfg.touch_enabled && touches {
		let touch_len = a.rect.touch_length(&b.rect);
		return Some(Edge { phase: 3, score: -touch_len * axis_align.powi(5) * 0.5, a: 0, b: 0 });
	}

	if edge_dist > 0.0 && edge_dist < cfg.min_edge_distance_deg {
		let (ca, cb) = (a.rect.centroid(), b.rect.centroid());
		let center_dist = (ca.0 - cb.0).hypot(ca.1 - cb.1);
		let score = edge_dist * (1.0 + center_dist) / (axis_align.powi(5) + 1e-12);
		return Some(Edge { phase: 3, score, a: 0, b: 0 });
	}

	None
}

/// Reprojects and merges `tiles` into final merged buildings (Steps A-E).
pub fn merge(tiles: &[TileResult], cfg: &MergeConfig) -> Vec<MergedBuilding> {
	let detections = reproject(tiles);
	if detections.is_empty() {
		return Vec::new();
	}

	let mut edges = Vec::new();
	for i in 0..detections.len() {
		for j in (i + 1)..detections.len() {
			if detections[i].tile == detections[j].tile {
				continue;
			}
			if let Some(mut edge) = classify(&detections[i], &detections[j], cfg) {
				if !cfg.allowed_phases[(edge.phase - 1) as usize] {
					continue;
				}
				edge.a = i;
				edge.b = j;
				edges.push(edge);
			}
		}
	}
	edges.sort_by(|x, y| x.phase.cmp(&y.phase).then(x.score.partial_cmp(&y.score).unwrap()));

	let mut uf = UnionFind::new(detections.len());
	for edge in &edges {
		uf.union(edge.a, edge.b);
	}

	let mut components = uf.components();
	// Deterministic output order: by the lowest member index in each component.
	components.sort_by_key(|c| *c.iter().min().unwrap());

	components
		.into_iter()
		.map(|members| {
			let rects: Vec<GeoRect> = members.iter().map(|&i| detections[i].rect).collect();
			let score = members.iter().map(|&i| detections[i].score).fold(f32::MIN, f32::max);
			let mut original_ids: Vec<String> = members.iter().map(|&i| detections[i].id.clone()).collect();
			original_ids.sort();
			MergedBuilding {
				envelope: GeoRect::envelope(&rects).expect("component has at least one member"),
				score,
				original_ids,
			}
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use buildscan_core::RawDetection;

	fn tile_result(z: u8, x: u32, y: u32, dets: Vec<RawDetection>) -> TileResult {
		let tile = Tile::new(z, x, y).unwrap();
		let b = tile.bounds();
		TileResult {
			z,
			x,
			y,
			bounds: (b.west, b.south, b.east, b.north),
			detections: dets,
			processed_at: "2026-01-01T00:00:00Z".to_string(),
		}
	}

	fn det(x1: f32, y1: f32, x2: f32, y2: f32) -> RawDetection {
		RawDetection { x1, y1, x2, y2, score: 0.8, class: 0 }
	}

	#[test]
	fn empty_input_yields_empty_output() {
		assert!(merge(&[], &MergeConfig::default()).is_empty());
	}

	#[test]
	fn single_tile_single_detection_is_one_building() {
		let tiles = vec![tile_result(18, 100, 100, vec![det(10.0, 10.0, 50.0, 50.0)])];
		let out = merge(&tiles, &MergeConfig::default());
		assert_eq!(out.len(), 1);
		assert_eq!(out[0].original_ids.len(), 1);
	}

	#[test]
	fn adjacent_tile_detections_straddling_edge_merge() {
		// one detection touching the right edge of tile (18,100,100), the other touching
		// the left edge of its east neighbor (18,101,100) - same real-world building.
		let tiles = vec![
			tile_result(18, 100, 100, vec![det(200.0, 100.0, 256.0, 150.0)]),
			tile_result(18, 101, 100, vec![det(0.0, 100.0, 56.0, 150.0)]),
		];
		let out = merge(&tiles, &MergeConfig::default());
		assert_eq!(out.len(), 1);
		assert_eq!(out[0].original_ids.len(), 2);
	}

	#[test]
	fn touch_disabled_keeps_boundary_aligned_detections_separate() {
		let tiles = vec![
			tile_result(18, 100, 100, vec![det(200.0, 100.0, 256.0, 150.0)]),
			tile_result(18, 101, 100, vec![det(0.0, 100.0, 56.0, 150.0)]),
		];
		let cfg = MergeConfig { touch_enabled: false, ..MergeConfig::default() };
		let out = merge(&tiles, &cfg);
		assert_eq!(out.len(), 2);
	}

	#[test]
	fn far_apart_detections_stay_separate() {
		let tiles = vec![
			tile_result(18, 100, 100, vec![det(10.0, 10.0, 50.0, 50.0)]),
			tile_result(18, 200, 200, vec![det(10.0, 10.0, 50.0, 50.0)]),
		];
		let out = merge(&tiles, &MergeConfig::default());
		assert_eq!(out.len(), 2);
	}

	#[test]
	fn same_tile_detections_never_merge_into_each_other_directly() {
		let tiles = vec![tile_result(18, 100, 100, vec![det(0.0, 0.0, 50.0, 50.0), det(60.0, 60.0, 110.0, 110.0)])];
		let out = merge(&tiles, &MergeConfig::default());
		assert_eq!(out.len(), 2);
	}
}
