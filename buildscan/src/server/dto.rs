//! Request/response bodies and the mapping from [`AppError`] to an HTTP status code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use buildscan_core::{AppConfig, AppError, DetectionParams, ErrorKind, FinalBuilding};
use buildscan_jobs::{JobStatus, JobView};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
	pub polygon: serde_json::Value,
	pub zoom: Option<u8>,
	pub confidence: Option<f32>,
	pub batch_size: Option<usize>,
	pub enable_merging: Option<bool>,
	pub merge_iou_threshold: Option<f64>,
	pub merge_touch_enabled: Option<bool>,
	pub merge_min_edge_distance_deg: Option<f64>,
	pub job_id: Option<String>,
}

impl SubmitRequest {
	pub fn params(&self, config: &AppConfig) -> DetectionParams {
		let defaults = DetectionParams::from_config(config);
		DetectionParams {
			zoom: self.zoom.unwrap_or(defaults.zoom),
			confidence: self.confidence.unwrap_or(defaults.confidence),
			batch_size: self.batch_size.unwrap_or(defaults.batch_size),
			enable_merging: self.enable_merging.unwrap_or(defaults.enable_merging),
			merge_iou_threshold: self.merge_iou_threshold.unwrap_or(defaults.merge_iou_threshold),
			merge_touch_enabled: self.merge_touch_enabled.unwrap_or(defaults.merge_touch_enabled),
			merge_min_edge_distance_deg: self
				.merge_min_edge_distance_deg
				.unwrap_or(defaults.merge_min_edge_distance_deg),
		}
	}
}

#[derive(Debug, Serialize)]
pub struct SyncSubmitResponse {
	pub success: bool,
	pub message: String,
	pub buildings: Vec<FinalBuilding>,
	pub total_buildings: u32,
	pub execution_time: f64,
}

#[derive(Debug, Serialize)]
pub struct AsyncSubmitResponse {
	pub job_id: String,
	pub status: JobStatus,
	pub submitted_at: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
	pub job_id: String,
	pub status: JobStatus,
	pub progress: u8,
	pub stage: String,
	pub buildings_found: u32,
	pub estimated_time_remaining: Option<f64>,
	pub execution_time: f64,
	pub error_message: Option<String>,
}

impl From<JobView> for StatusResponse {
	fn from(job: JobView) -> Self {
		let estimated_time_remaining = if job.progress > 5 && !job.status.is_terminal() {
			Some((job.execution_time / job.progress as f64) * (100.0 - job.progress as f64))
		} else {
			None
		};
		StatusResponse {
			job_id: job.job_id,
			status: job.status,
			progress: job.progress,
			stage: job.stage,
			buildings_found: job.buildings_found,
			estimated_time_remaining,
			execution_time: job.execution_time,
			error_message: job.error_message,
		}
	}
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
	pub job_id: String,
	pub status: JobStatus,
	pub buildings: Vec<FinalBuilding>,
	pub total_buildings: u32,
	pub execution_time: f64,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
	pub total: usize,
	pub active: usize,
	pub max_concurrent: usize,
	pub jobs: Vec<StatusResponse>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
	pub error: String,
	pub message: String,
	pub detail: Option<String>,
	#[serde(rename = "type")]
	pub kind: String,
}

/// Maps a client-visible [`AppError`] to its HTTP response.
pub fn app_error_response(err: &AppError) -> Response {
	let status = match err.kind {
		ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
		ErrorKind::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
		ErrorKind::Duplicate => StatusCode::CONFLICT,
		ErrorKind::Capacity => StatusCode::TOO_MANY_REQUESTS,
		ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
		ErrorKind::Unknown => StatusCode::NOT_FOUND,
		ErrorKind::Terminal => StatusCode::CONFLICT,
	};
	let body = ErrorBody {
		error: format!("{:?}", err.kind),
		message: err.message.clone(),
		detail: None,
		kind: format!("{:?}", err.kind).to_lowercase(),
	};
	(status, Json(body)).into_response()
}

pub fn anyhow_error_response(err: &anyhow::Error) -> Response {
	match err.downcast_ref::<AppError>() {
		Some(app_err) => app_error_response(app_err),
		None => {
			let body = ErrorBody {
				error: "Internal".to_string(),
				message: "internal error".to_string(),
				detail: Some(format!("{err:#}")),
				kind: "internal".to_string(),
			};
			(StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
		}
	}
}
