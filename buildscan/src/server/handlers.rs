//! HTTP handlers for the detection API.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use buildscan_core::{AppError, RequestPolygon};
use buildscan_geometry::{build_polygon, filter_and_number, merge, plan_tiles, MergeConfig};
use buildscan_pipeline::{ProcessorConfig, TileStore, process_tiles};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use super::dto::{
	AsyncSubmitResponse, JobListResponse, ResultResponse, StatusResponse, SubmitRequest, SyncSubmitResponse,
	anyhow_error_response, app_error_response,
};
use super::state::AppState;

fn parse_polygon(req: &SubmitRequest) -> Result<RequestPolygon, AppError> {
	let doc: buildscan_core::polygon::GeoJson =
		serde_json::from_value(req.polygon.clone()).map_err(|e| AppError::invalid_input(format!("invalid polygon: {e}")))?;
	RequestPolygon::from_geojson(&doc).map_err(|e| AppError::invalid_input(format!("invalid polygon: {e}")))
}

/// `POST /detect` - runs a job to completion inline and returns the result.
pub async fn submit_sync(State(state): State<AppState>, Json(req): Json<SubmitRequest>) -> Response {
	let started = Instant::now();
	let polygon = match parse_polygon(&req) {
		Ok(p) => p,
		Err(e) => return app_error_response(&e),
	};
	let params = req.params(&state.config);

	match run_inline(&state, polygon, params).await {
		Ok(buildings) => Json(SyncSubmitResponse {
			success: true,
			message: "ok".to_string(),
			total_buildings: buildings.len() as u32,
			buildings,
			execution_time: started.elapsed().as_secs_f64(),
		})
		.into_response(),
		Err(e) => anyhow_error_response(&e),
	}
}

async fn run_inline(
	state: &AppState,
	polygon: RequestPolygon,
	params: buildscan_core::DetectionParams,
) -> anyhow::Result<Vec<buildscan_core::FinalBuilding>> {
	let geo_polygon = build_polygon(&polygon)?;
	let tiles = plan_tiles(&geo_polygon, params.zoom)?;
	let temp_dir = tempfile::tempdir()?;
	let store = Arc::new(TileStore::new(temp_dir.path())?);

	let tile_results = process_tiles(
		tiles,
		state.runtime.fetcher.clone(),
		state.runtime.detector.clone(),
		store,
		ProcessorConfig { batch_size: params.batch_size, confidence: params.confidence },
		Arc::new(AtomicBool::new(false)),
		None,
	)
	.await?;

	let merge_cfg = MergeConfig {
		iou_threshold: params.merge_iou_threshold,
		touch_enabled: params.merge_touch_enabled,
		min_edge_distance_deg: params.merge_min_edge_distance_deg,
		allowed_phases: if params.enable_merging { MergeConfig::default().allowed_phases } else { [false, false, false] },
	};
	let merged = merge(&tile_results, &merge_cfg);
	Ok(filter_and_number(merged, &geo_polygon))
}

/// `POST /jobs` - submits a job and runs it in the background.
pub async fn submit_async(State(state): State<AppState>, Json(req): Json<SubmitRequest>) -> Response {
	let polygon = match parse_polygon(&req) {
		Ok(p) => p,
		Err(e) => return app_error_response(&e),
	};
	let params = req.params(&state.config);

	match state.manager.create(polygon, params, req.job_id.clone()) {
		Ok(job_id) => {
			let manager = state.manager.clone();
			let runtime = state.runtime.clone();
			let job_id_for_task = job_id.clone();
			tokio::spawn(async move {
				buildscan_jobs::run_job(manager, runtime, job_id_for_task).await;
			});
			Json(AsyncSubmitResponse {
				job_id,
				status: buildscan_jobs::JobStatus::Queued,
				submitted_at: buildscan_pipeline::store::now_rfc3339(),
			})
			.into_response()
		}
		Err(e) => app_error_response(&e),
	}
}

/// `GET /jobs/{job_id}` - current status and progress.
pub async fn get_status(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
	match state.manager.get(&job_id) {
		Some(job) => Json(StatusResponse::from(job)).into_response(),
		None => app_error_response(&AppError::unknown(format!("job {job_id:?} not found"))),
	}
}

/// `GET /jobs/{job_id}/result` - the final buildings once the job has finished.
pub async fn get_result(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
	let job = match state.manager.get(&job_id) {
		Some(job) => job,
		None => return app_error_response(&AppError::unknown(format!("job {job_id:?} not found"))),
	};

	use buildscan_jobs::JobStatus::*;
	match job.status {
		Completed => {
			let result = state.manager.result(&job_id).flatten().expect("completed job always has a result");
			Json(ResultResponse {
				job_id,
				status: job.status,
				total_buildings: result.total_buildings,
				buildings: result.buildings,
				execution_time: job.execution_time,
			})
			.into_response()
		}
		Queued | Processing => {
			(axum::http::StatusCode::ACCEPTED, Json(StatusResponse::from(job))).into_response()
		}
		Cancelled => (axum::http::StatusCode::GONE, Json(StatusResponse::from(job))).into_response(),
		Failed => app_error_response(&AppError::unprocessable(
			job.error_message.clone().unwrap_or_else(|| "job failed".to_string()),
		)),
	}
}

/// `POST /jobs/{job_id}/cancel` - cancels a non-terminal job.
pub async fn cancel_job(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
	match state.manager.cancel(&job_id) {
		Ok(()) => axum::http::StatusCode::OK.into_response(),
		Err(e) => app_error_response(&e),
	}
}

/// `GET /jobs` - lists all known jobs, newest first.
pub async fn list_jobs(State(state): State<AppState>) -> Response {
	let jobs = state.manager.list();
	Json(JobListResponse {
		total: jobs.len(),
		active: state.manager.active_count(),
		max_concurrent: state.manager.max_concurrent(),
		jobs: jobs.into_iter().map(StatusResponse::from).collect(),
	})
	.into_response()
}
