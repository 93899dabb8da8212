//! Process configuration, read once from the environment at startup.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
	pub host: String,
	pub port: u16,
	pub model_path: String,
	pub max_concurrent_jobs: usize,
	pub job_cleanup_interval: Duration,
	pub default_zoom: u8,
	pub default_confidence: f32,
	pub default_batch_size: usize,
	pub default_enable_merging: bool,
	pub default_merge_iou_threshold: f64,
	pub default_merge_touch_enabled: bool,
	pub default_merge_min_edge_distance_deg: f64,
	pub job_id_min_length: usize,
	pub job_id_max_length: usize,
}

impl Default for AppConfig {
	fn default() -> Self {
		AppConfig {
			host: "0.0.0.0".to_string(),
			port: 5050,
			model_path: "best.pt".to_string(),
			max_concurrent_jobs: 2,
			job_cleanup_interval: Duration::from_secs_f64(3600.0),
			default_zoom: 18,
			default_confidence: 0.25,
			default_batch_size: 5,
			default_enable_merging: true,
			default_merge_iou_threshold: 0.1,
			default_merge_touch_enabled: true,
			default_merge_min_edge_distance_deg: 1e-5,
			job_id_min_length: 3,
			job_id_max_length: 50,
		}
	}
}

impl AppConfig {
	/// Loads configuration from the environment, falling back to [`AppConfig::default`]
	/// for any variable that is unset. Fails if a variable is set but cannot be parsed.
	pub fn from_env() -> Result<AppConfig> {
		let mut cfg = AppConfig::default();

		if let Some(v) = env_var("HOST")? {
			cfg.host = v;
		}
		if let Some(v) = env_parsed::<u16>("PORT")? {
			cfg.port = v;
		}
		if let Some(v) = env_var("MODEL_PATH")? {
			cfg.model_path = v;
		}
		if let Some(v) = env_parsed::<usize>("MAX_CONCURRENT_JOBS")? {
			cfg.max_concurrent_jobs = v;
		}
		if let Some(v) = env_parsed::<f64>("JOB_CLEANUP_INTERVAL_HOURS")? {
			cfg.job_cleanup_interval = Duration::from_secs_f64(v * 3600.0);
		}
		if let Some(v) = env_parsed::<u8>("DEFAULT_ZOOM")? {
			cfg.default_zoom = v;
		}
		if let Some(v) = env_parsed::<f32>("DEFAULT_CONFIDENCE")? {
			cfg.default_confidence = v;
		}
		if let Some(v) = env_parsed::<usize>("DEFAULT_BATCH_SIZE")? {
			cfg.default_batch_size = v;
		}
		if let Some(v) = env_parsed::<bool>("DEFAULT_ENABLE_MERGING")? {
			cfg.default_enable_merging = v;
		}
		if let Some(v) = env_parsed::<f64>("DEFAULT_MERGE_IOU_THRESHOLD")? {
			cfg.default_merge_iou_threshold = v;
		}
		if let Some(v) = env_parsed::<bool>("DEFAULT_MERGE_TOUCH_ENABLED")? {
			cfg.default_merge_touch_enabled = v;
		}
		if let Some(v) = env_parsed::<f64>("DEFAULT_MERGE_MIN_EDGE_DISTANCE_DEG")? {
			cfg.default_merge_min_edge_distance_deg = v;
		}
		if let Some(v) = env_parsed::<usize>("JOB_ID_MIN_LENGTH")? {
			cfg.job_id_min_length = v;
		}
		if let Some(v) = env_parsed::<usize>("JOB_ID_MAX_LENGTH")? {
			cfg.job_id_max_length = v;
		}

		anyhow::ensure!(
			cfg.job_id_min_length <= cfg.job_id_max_length,
			"JOB_ID_MIN_LENGTH ({}) must be <= JOB_ID_MAX_LENGTH ({})",
			cfg.job_id_min_length,
			cfg.job_id_max_length
		);
		anyhow::ensure!(cfg.max_concurrent_jobs >= 1, "MAX_CONCURRENT_JOBS must be >= 1");

		Ok(cfg)
	}
}

fn env_var(name: &str) -> Result<Option<String>> {
	match env::var(name) {
		Ok(v) => Ok(Some(v)),
		Err(env::VarError::NotPresent) => Ok(None),
		Err(e) => Err(e).with_context(|| format!("reading env var {name}")),
	}
}

fn env_parsed<T>(name: &str) -> Result<Option<T>>
where
	T: std::str::FromStr,
	T::Err: std::error::Error + Send + Sync + 'static,
{
	match env_var(name)? {
		Some(v) => Ok(Some(
			v.parse::<T>().with_context(|| format!("parsing env var {name}={v:?}"))?,
		)),
		None => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_table() {
		let cfg = AppConfig::default();
		assert_eq!(cfg.port, 5050);
		assert_eq!(cfg.max_concurrent_jobs, 2);
		assert_eq!(cfg.default_zoom, 18);
		assert!((cfg.default_confidence - 0.25).abs() < 1e-9);
		assert_eq!(cfg.default_batch_size, 5);
		assert!(cfg.default_enable_merging);
	}
}
