//! Runs one job end-to-end: plan tiles, process them, merge, filter, and publish
//! the result or failure back onto the job manager.

use anyhow::{Context, Result};
use buildscan_core::FinalBuilding;
use buildscan_geometry::{MergeConfig, build_polygon, filter_and_number, merge, plan_tiles};
use buildscan_pipeline::{ProcessorConfig, TileStore, process_tiles};
use std::sync::Arc;

use crate::job::JobResult;
use crate::manager::JobManager;
use crate::runtime::Runtime;

/// Runs `job_id` to completion against `runtime`, recording progress and the final
/// outcome on `manager`. The job's temp tile directory is always removed on exit.
pub async fn run_job(manager: Arc<JobManager>, runtime: Arc<Runtime>, job_id: String) {
	let outcome = run_job_inner(&manager, &runtime, &job_id).await;
	if let Err(e) = outcome {
		log::error!("job {job_id} failed: {e:#}");
		manager.fail(&job_id, format!("{e:#}"));
	}
}

async fn run_job_inner(manager: &Arc<JobManager>, runtime: &Arc<Runtime>, job_id: &str) -> Result<()> {
	let (polygon, params) = manager
		.polygon_and_params(job_id)
		.ok_or_else(|| anyhow::anyhow!("job {job_id} vanished before it started"))?;
	let cancel = manager
		.cancel_token(job_id)
		.ok_or_else(|| anyhow::anyhow!("job {job_id} vanished before it started"))?;

	manager.update_progress(job_id, 5, "Initializing", 0);
	let temp_dir = tempfile::Builder::new()
		.prefix(&format!("buildscan-{job_id}-"))
		.tempdir()
		.context("creating job temp directory")?;
	let store = Arc::new(TileStore::new(temp_dir.path().join("tiles"))?);

	if cancel.is_cancelled() {
		return Ok(());
	}
	manager.update_progress(job_id, 15, "Validating", 0);
	let geo_polygon = build_polygon(&polygon).context("validating request polygon")?;

	if cancel.is_cancelled() {
		return Ok(());
	}
	manager.update_progress(job_id, 30, "Planning", 0);
	let tiles = plan_tiles(&geo_polygon, params.zoom).context("planning tiles")?;

	if cancel.is_cancelled() {
		return Ok(());
	}
	let manager_for_cb = manager.clone();
	let job_id_for_cb = job_id.to_string();
	let on_progress = Arc::new(move |done: usize, total: usize, tiles_done: usize| {
		let frac = if total == 0 { 1.0 } else { done as f64 / total as f64 };
		let progress = (35.0 + frac * (75.0 - 35.0)).round() as u8;
		manager_for_cb.update_progress(&job_id_for_cb, progress, "Processing", tiles_done as u32);
	});

	let tile_results = process_tiles(
		tiles,
		runtime.fetcher.clone(),
		runtime.detector.clone(),
		store,
		ProcessorConfig { batch_size: params.batch_size, confidence: params.confidence },
		cancel.inner(),
		Some(on_progress),
	)
	.await
	.context("processing tiles")?;

	if cancel.is_cancelled() {
		return Ok(());
	}
	manager.update_progress(job_id, 80, "Merging", 0);
	let merged = if params.enable_merging {
		let merge_cfg = MergeConfig {
			iou_threshold: params.merge_iou_threshold,
			touch_enabled: params.merge_touch_enabled,
			min_edge_distance_deg: params.merge_min_edge_distance_deg,
			..MergeConfig::default()
		};
		merge(&tile_results, &merge_cfg)
	} else {
		// merging disabled: every detection becomes its own "component" by reusing the
		// merger with an empty allowed-phase set, so evidence is computed but never unions.
		merge(&tile_results, &MergeConfig { allowed_phases: [false, false, false], ..MergeConfig::default() })
	};

	if cancel.is_cancelled() {
		return Ok(());
	}
	manager.update_progress(job_id, 95, "Emitting", merged.len() as u32);
	let buildings: Vec<FinalBuilding> = filter_and_number(merged, &geo_polygon);

	manager.complete(
		job_id,
		JobResult { total_buildings: buildings.len() as u32, buildings },
	);
	manager.update_progress(job_id, 100, "Done", 0);

	drop(temp_dir); // always clean up the job's tile directory, success or not
	Ok(())
}
