use buildscan_core::AppConfig;
use buildscan_jobs::{JobManager, Runtime};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
	pub manager: Arc<JobManager>,
	pub runtime: Arc<Runtime>,
	pub config: AppConfig,
}
