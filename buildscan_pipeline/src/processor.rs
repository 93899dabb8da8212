//! Runs tiles through fetch -> detect -> store using a fixed-size worker pool.

use anyhow::Result;
use buildscan_core::{Tile, TileResult};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::detector::DetectorHandle;
use crate::fetcher::TileFetcher;
use crate::store::{TileStore, now_rfc3339};

/// Fixed worker pool size: the detector is serialized by [`DetectorHandle`] regardless
/// of how many workers run concurrently, so a larger pool adds memory pressure without
/// adding throughput.
pub const WORKER_COUNT: usize = 2;

pub struct ProcessorConfig {
	pub batch_size: usize,
	pub confidence: f32,
}

/// Called after each batch completes with `(batches_done, batches_total, tiles_done)`.
pub type ProgressCallback = Arc<dyn Fn(usize, usize, usize) + Send + Sync>;

/// Loads any tile files already on disk for this job, then fetches and detects the
/// remaining tiles in fixed-size batches across a pool of [`WORKER_COUNT`] workers.
pub async fn process_tiles(
	tiles: Vec<Tile>,
	fetcher: Arc<dyn TileFetcher>,
	detector: DetectorHandle,
	store: Arc<TileStore>,
	config: ProcessorConfig,
	cancel: Arc<AtomicBool>,
	on_progress: Option<ProgressCallback>,
) -> Result<Vec<TileResult>> {
	let mut results = store.load_all()?;
	let done: std::collections::HashSet<String> = results.iter().map(|r| r.tile().id()).collect();
	let remaining: Vec<Tile> = tiles.into_iter().filter(|t| !done.contains(&t.id())).collect();

	let batches: Vec<Vec<Tile>> = remaining.chunks(config.batch_size.max(1)).map(|c| c.to_vec()).collect();
	let batches_total = batches.len();
	let confidence = config.confidence;

	let batch_results: Vec<Result<Vec<TileResult>>> = stream::iter(batches.into_iter().enumerate())
		.map(|(batch_idx, batch)| {
			let fetcher = fetcher.clone();
			let detector = detector.clone();
			let store = store.clone();
			let cancel = cancel.clone();
			async move {
				if cancel.load(Ordering::SeqCst) {
					return Ok(Vec::new());
				}
				process_batch(batch_idx, batch, fetcher, detector, store, confidence).await
			}
		})
		.buffer_unordered(WORKER_COUNT)
		.collect()
		.await;

	let mut batches_done = 0;
	for batch_result in batch_results {
		batches_done += 1;
		match batch_result {
			Ok(mut tile_results) => results.append(&mut tile_results),
			Err(e) => log::error!("batch failed: {e:#}"),
		}
		if let Some(cb) = &on_progress {
			cb(batches_done, batches_total, results.len());
		}
	}

	Ok(results)
}

async fn process_batch(
	_batch_idx: usize,
	batch: Vec<Tile>,
	fetcher: Arc<dyn TileFetcher>,
	detector: DetectorHandle,
	store: Arc<TileStore>,
	confidence: f32,
) -> Result<Vec<TileResult>> {
	let mut out = Vec::with_capacity(batch.len());
	for tile in batch {
		match process_one_tile(tile, &fetcher, &detector, confidence).await {
			Ok(result) => {
				store.save(&result)?;
				out.push(result);
			}
			Err(e) => log::warn!("skipping tile {tile:?}: {e:#}"),
		}
	}
	Ok(out)
}

async fn process_one_tile(
	tile: Tile,
	fetcher: &Arc<dyn TileFetcher>,
	detector: &DetectorHandle,
	confidence: f32,
) -> Result<TileResult> {
	let image = fetcher.fetch(tile).await?;
	let detector = detector.clone();
	let detections = tokio::task::spawn_blocking(move || detector.detect(&image, confidence)).await??;
	let bounds = tile.bounds();
	Ok(TileResult {
		z: tile.z,
		x: tile.x,
		y: tile.y,
		bounds: (bounds.west, bounds.south, bounds.east, bounds.north),
		detections,
		processed_at: now_rfc3339(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::detector::MockDetector;
	use async_trait::async_trait;
	use image::RgbImage;

	struct FixedFetcher;

	#[async_trait]
	impl TileFetcher for FixedFetcher {
		async fn fetch(&self, _tile: Tile) -> Result<RgbImage> {
			Ok(RgbImage::new(256, 256))
		}
	}

	#[tokio::test]
	async fn processes_every_tile_exactly_once() {
		let dir = tempfile::tempdir().unwrap();
		let store = Arc::new(TileStore::new(dir.path()).unwrap());
		let tiles = vec![Tile::new(18, 0, 0).unwrap(), Tile::new(18, 1, 0).unwrap(), Tile::new(18, 0, 1).unwrap()];

		let results = process_tiles(
			tiles,
			Arc::new(FixedFetcher),
			DetectorHandle::new(Arc::new(MockDetector::default())),
			store,
			ProcessorConfig { batch_size: 2, confidence: 0.25 },
			Arc::new(AtomicBool::new(false)),
			None,
		)
		.await
		.unwrap();

		assert_eq!(results.len(), 3);
	}

	#[tokio::test]
	async fn resume_skips_tiles_already_on_disk() {
		let dir = tempfile::tempdir().unwrap();
		let store = Arc::new(TileStore::new(dir.path()).unwrap());
		let tile = Tile::new(18, 5, 5).unwrap();
		let bounds = tile.bounds();
		store
			.save(&TileResult {
				z: 18,
				x: 5,
				y: 5,
				bounds: (bounds.west, bounds.south, bounds.east, bounds.north),
				detections: vec![],
				processed_at: now_rfc3339(),
			})
			.unwrap();

		let results = process_tiles(
			vec![tile],
			Arc::new(FixedFetcher),
			DetectorHandle::new(Arc::new(MockDetector::default())),
			store,
			ProcessorConfig { batch_size: 5, confidence: 0.25 },
			Arc::new(AtomicBool::new(false)),
			None,
		)
		.await
		.unwrap();

		assert_eq!(results.len(), 1);
	}

	#[tokio::test]
	async fn progress_callback_fires_per_batch() {
		let dir = tempfile::tempdir().unwrap();
		let store = Arc::new(TileStore::new(dir.path()).unwrap());
		let tiles: Vec<Tile> = (0..5).map(|x| Tile::new(18, x, 0).unwrap()).collect();
		let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
		let calls_clone = calls.clone();

		process_tiles(
			tiles,
			Arc::new(FixedFetcher),
			DetectorHandle::new(Arc::new(MockDetector::default())),
			store,
			ProcessorConfig { batch_size: 2, confidence: 0.25 },
			Arc::new(AtomicBool::new(false)),
			Some(Arc::new(move |done, total, count| calls_clone.lock().unwrap().push((done, total, count)))),
		)
		.await
		.unwrap();

		let calls = calls.lock().unwrap();
		assert_eq!(calls.len(), 3); // ceil(5/2) batches
		assert_eq!(calls.last().unwrap().2, 5);
	}
}
