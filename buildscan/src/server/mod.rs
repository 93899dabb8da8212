//! Router composition for the buildscan server. Wires handlers into an Axum `Router`
//! without mixing in server lifecycle logic.

pub mod dto;
mod handlers;
mod state;

use axum::Router;
use axum::routing::{get, post};
use buildscan_core::AppConfig;
use buildscan_jobs::{JobManager, Runtime};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

pub fn build_router(manager: Arc<JobManager>, runtime: Arc<Runtime>, config: AppConfig) -> Router {
	let state = AppState { manager, runtime, config };

	Router::new()
		.route("/detect", post(handlers::submit_sync))
		.route("/jobs", post(handlers::submit_async).get(handlers::list_jobs))
		.route("/jobs/{job_id}", get(handlers::get_status))
		.route("/jobs/{job_id}/result", get(handlers::get_result))
		.route("/jobs/{job_id}/cancel", post(handlers::cancel_job))
		.layer(CorsLayer::permissive())
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::Body;
	use axum::http::{Request, StatusCode};
	use buildscan_core::AppConfig;
	use buildscan_jobs::JobManager;
	use serde_json::json;
	use tower::ServiceExt; // for `oneshot`

	fn test_router() -> Router {
		let config = AppConfig::default();
		let manager = Arc::new(JobManager::new(config.max_concurrent_jobs, config.job_id_min_length, config.job_id_max_length));
		let runtime = Arc::new(Runtime::builder().config(config.clone()).build().unwrap());
		build_router(manager, runtime, config)
	}

	fn square_feature() -> serde_json::Value {
		json!({
			"type": "Polygon",
			"coordinates": [[[-122.421, 37.778], [-122.421, 37.781], [-122.418, 37.781], [-122.418, 37.778], [-122.421, 37.778]]]
		})
	}

	#[tokio::test]
	async fn unknown_job_status_is_404() {
		let app = test_router();
		let req = Request::builder().uri("/jobs/does-not-exist").body(Body::empty()).unwrap();
		let resp = app.oneshot(req).await.unwrap();
		assert_eq!(resp.status(), StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn submitting_async_job_returns_queued() {
		let app = test_router();
		let body = json!({ "polygon": square_feature(), "zoom": 20 });
		let req = Request::builder()
			.method("POST")
			.uri("/jobs")
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.unwrap();
		let resp = app.oneshot(req).await.unwrap();
		assert_eq!(resp.status(), StatusCode::OK);
	}

	#[tokio::test]
	async fn invalid_polygon_is_400() {
		let app = test_router();
		let body = json!({ "polygon": { "type": "Polygon", "coordinates": [[[0.0, 0.0]]] } });
		let req = Request::builder()
			.method("POST")
			.uri("/jobs")
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.unwrap();
		let resp = app.oneshot(req).await.unwrap();
		assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
	}

	#[tokio::test]
	async fn malformed_job_id_is_422() {
		let app = test_router();
		let body = json!({ "polygon": square_feature(), "job_id": "-x" });
		let req = Request::builder()
			.method("POST")
			.uri("/jobs")
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.unwrap();
		let resp = app.oneshot(req).await.unwrap();
		assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
	}

	#[tokio::test]
	async fn empty_job_list_reports_zero_active() {
		let app = test_router();
		let req = Request::builder().uri("/jobs").body(Body::empty()).unwrap();
		let resp = app.oneshot(req).await.unwrap();
		assert_eq!(resp.status(), StatusCode::OK);
	}
}
