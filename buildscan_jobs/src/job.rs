//! The job lifecycle state machine.

use buildscan_core::{DetectionParams, FinalBuilding, RequestPolygon};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::cancel::CancelToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
	Queued,
	Processing,
	Completed,
	Failed,
	Cancelled,
}

impl JobStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
	pub buildings: Vec<FinalBuilding>,
	pub total_buildings: u32,
}

/// One submitted detection job. Mutations only ever go through [`crate::manager::JobManager`];
/// workers hold a cloned [`CancelToken`], never a reference back into this struct.
pub struct Job {
	pub job_id: String,
	pub status: JobStatus,
	pub progress: u8,
	pub stage: String,
	pub buildings_found: u32,
	pub start_time: OffsetDateTime,
	pub end_time: Option<OffsetDateTime>,
	pub error_message: Option<String>,
	pub polygon: RequestPolygon,
	pub params: DetectionParams,
	pub result: Option<JobResult>,
	pub cancel_token: CancelToken,
}

impl Job {
	pub fn new(job_id: String, polygon: RequestPolygon, params: DetectionParams) -> Job {
		Job {
			job_id,
			status: JobStatus::Queued,
			progress: 0,
			stage: "queued".to_string(),
			buildings_found: 0,
			start_time: OffsetDateTime::now_utc(),
			end_time: None,
			error_message: None,
			polygon,
			params,
			result: None,
			cancel_token: CancelToken::new(),
		}
	}

	pub fn execution_time(&self) -> f64 {
		let end = self.end_time.unwrap_or_else(OffsetDateTime::now_utc);
		(end - self.start_time).as_seconds_f64()
	}

	pub fn start_time_rfc3339(&self) -> String {
		self.start_time.format(&Rfc3339).unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn square() -> RequestPolygon {
		RequestPolygon { exterior_ring: vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)] }
	}

	#[test]
	fn new_job_starts_queued_with_zero_progress() {
		let job = Job::new("job-1".to_string(), square(), DetectionParams::default());
		assert_eq!(job.status, JobStatus::Queued);
		assert_eq!(job.progress, 0);
		assert!(!job.cancel_token.is_cancelled());
	}

	#[test]
	fn terminal_statuses_are_recognized() {
		assert!(JobStatus::Completed.is_terminal());
		assert!(JobStatus::Failed.is_terminal());
		assert!(JobStatus::Cancelled.is_terminal());
		assert!(!JobStatus::Queued.is_terminal());
		assert!(!JobStatus::Processing.is_terminal());
	}
}
