//! Concurrency-capped, thread-safe job table.

use buildscan_core::{AppError, DetectionParams, ErrorKind, RequestPolygon};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;

use crate::job::{Job, JobResult, JobStatus};

const JOB_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub struct JobManager {
	max_concurrent: usize,
	job_id_min_length: usize,
	job_id_max_length: usize,
	inner: Mutex<HashMap<String, Job>>,
}

/// A read-only view of a [`Job`], returned from manager queries so callers never hold
/// a reference into the locked table.
#[derive(Debug, Clone)]
pub struct JobView {
	pub job_id: String,
	pub status: JobStatus,
	pub progress: u8,
	pub stage: String,
	pub buildings_found: u32,
	pub start_time: OffsetDateTime,
	pub end_time: Option<OffsetDateTime>,
	pub error_message: Option<String>,
	pub execution_time: f64,
}

impl From<&Job> for JobView {
	fn from(job: &Job) -> Self {
		JobView {
			job_id: job.job_id.clone(),
			status: job.status,
			progress: job.progress,
			stage: job.stage.clone(),
			buildings_found: job.buildings_found,
			start_time: job.start_time,
			end_time: job.end_time,
			error_message: job.error_message.clone(),
			execution_time: job.execution_time(),
		}
	}
}

impl JobManager {
	pub fn new(max_concurrent: usize, job_id_min_length: usize, job_id_max_length: usize) -> JobManager {
		JobManager { max_concurrent, job_id_min_length, job_id_max_length, inner: Mutex::new(HashMap::new()) }
	}

	fn active_count_locked(table: &HashMap<String, Job>) -> usize {
		table.values().filter(|j| !j.status.is_terminal()).count()
	}

	pub fn active_count(&self) -> usize {
		Self::active_count_locked(&self.inner.lock())
	}

	pub fn max_concurrent(&self) -> usize {
		self.max_concurrent
	}

	fn validate_job_id(&self, id: &str) -> Result<(), AppError> {
		if id.len() < self.job_id_min_length || id.len() > self.job_id_max_length {
			return Err(AppError::unprocessable(format!(
				"job_id length must be between {} and {}",
				self.job_id_min_length, self.job_id_max_length
			)));
		}
		let valid_chars = id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
		let valid_ends = id
			.chars()
			.next()
			.is_some_and(|c| c.is_ascii_alphanumeric())
			&& id.chars().next_back().is_some_and(|c| c.is_ascii_alphanumeric());
		if !valid_chars || !valid_ends {
			return Err(AppError::unprocessable(
				"job_id must contain only letters, digits, '_' or '-', and start/end with an alphanumeric",
			));
		}
		Ok(())
	}

	fn generate_job_id() -> String {
		let mut rng = rand::thread_rng();
		(0..16).map(|_| JOB_ID_ALPHABET[rng.gen_range(0..JOB_ID_ALPHABET.len())] as char).collect()
	}

	/// Creates a new job, enforcing the concurrency cap and `job_id` validation.
	pub fn create(
		&self,
		polygon: RequestPolygon,
		params: DetectionParams,
		requested_id: Option<String>,
	) -> Result<String, AppError> {
		let mut table = self.inner.lock();

		if Self::active_count_locked(&table) >= self.max_concurrent {
			return Err(AppError::capacity(format!(
				"at most {} jobs may be queued or processing at once",
				self.max_concurrent
			)));
		}

		let job_id = match requested_id {
			Some(id) => {
				self.validate_job_id(&id)?;
				if table.contains_key(&id) {
					return Err(AppError::duplicate(format!("job_id {id:?} already exists")));
				}
				id
			}
			None => loop {
				let candidate = Self::generate_job_id();
				if !table.contains_key(&candidate) {
					break candidate;
				}
			},
		};

		table.insert(job_id.clone(), Job::new(job_id.clone(), polygon, params));
		Ok(job_id)
	}

	pub fn get(&self, job_id: &str) -> Option<JobView> {
		self.inner.lock().get(job_id).map(JobView::from)
	}

	pub fn result(&self, job_id: &str) -> Option<Option<JobResult>> {
		self.inner.lock().get(job_id).map(|j| j.result.clone())
	}

	pub fn polygon_and_params(&self, job_id: &str) -> Option<(RequestPolygon, DetectionParams)> {
		self.inner.lock().get(job_id).map(|j| (j.polygon.clone(), j.params.clone()))
	}

	pub fn cancel_token(&self, job_id: &str) -> Option<crate::cancel::CancelToken> {
		self.inner.lock().get(job_id).map(|j| j.cancel_token.clone())
	}

	pub fn update_progress(&self, job_id: &str, progress: u8, stage: &str, buildings_found: u32) {
		let mut table = self.inner.lock();
		if let Some(job) = table.get_mut(job_id) {
			if job.status.is_terminal() {
				return;
			}
			job.status = JobStatus::Processing;
			job.progress = progress.min(100).max(job.progress);
			job.stage = stage.to_string();
			job.buildings_found = buildings_found;
		}
	}

	pub fn complete(&self, job_id: &str, result: JobResult) {
		let mut table = self.inner.lock();
		if let Some(job) = table.get_mut(job_id) {
			if job.status.is_terminal() {
				return;
			}
			job.buildings_found = result.total_buildings;
			job.progress = 100;
			job.status = JobStatus::Completed;
			job.end_time = Some(OffsetDateTime::now_utc());
			job.result = Some(result);
		}
	}

	pub fn fail(&self, job_id: &str, message: impl Into<String>) {
		let mut table = self.inner.lock();
		if let Some(job) = table.get_mut(job_id) {
			if job.status.is_terminal() {
				return;
			}
			job.status = JobStatus::Failed;
			job.error_message = Some(message.into());
			job.end_time = Some(OffsetDateTime::now_utc());
		}
	}

	pub fn cancel(&self, job_id: &str) -> Result<(), AppError> {
		let mut table = self.inner.lock();
		let job = table.get_mut(job_id).ok_or_else(|| AppError::unknown(format!("job {job_id:?} not found")))?;
		if job.status.is_terminal() {
			return Err(AppError::terminal(format!("job {job_id:?} is already {:?}", job.status)));
		}
		job.status = JobStatus::Cancelled;
		job.end_time = Some(OffsetDateTime::now_utc());
		job.cancel_token.cancel();
		Ok(())
	}

	pub fn list(&self) -> Vec<JobView> {
		let table = self.inner.lock();
		let mut views: Vec<JobView> = table.values().map(JobView::from).collect();
		views.sort_by(|a, b| b.start_time.cmp(&a.start_time));
		views
	}

	/// Drops completed/failed/cancelled jobs whose `end_time` is older than `max_age`.
	pub fn cleanup_older_than(&self, max_age: std::time::Duration) {
		let cutoff = OffsetDateTime::now_utc() - max_age;
		let mut table = self.inner.lock();
		table.retain(|_, job| match job.end_time {
			Some(end) if job.status.is_terminal() => end >= cutoff,
			_ => true,
		});
	}
}

// ErrorKind is re-exported for callers that want to match on the AppError kind
// returned from these operations without re-importing buildscan_core directly.
pub use ErrorKind as JobErrorKind;

#[cfg(test)]
mod tests {
	use super::*;

	fn square() -> RequestPolygon {
		RequestPolygon { exterior_ring: vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)] }
	}

	#[test]
	fn enforces_concurrency_cap() {
		let mgr = JobManager::new(2, 3, 50);
		mgr.create(square(), DetectionParams::default(), None).unwrap();
		mgr.create(square(), DetectionParams::default(), None).unwrap();
		let err = mgr.create(square(), DetectionParams::default(), None).unwrap_err();
		assert_eq!(err.kind, ErrorKind::Capacity);
	}

	#[test]
	fn cancelling_a_job_frees_capacity() {
		let mgr = JobManager::new(1, 3, 50);
		let id = mgr.create(square(), DetectionParams::default(), None).unwrap();
		mgr.cancel(&id).unwrap();
		mgr.create(square(), DetectionParams::default(), None).unwrap();
	}

	use rstest::rstest;

	#[rstest]
	#[case("ab", false)] // below min length
	#[case("-abc", false)] // starts with a non-alphanumeric
	#[case("abc-", false)] // ends with a non-alphanumeric
	#[case("ab c1", false)] // space is not in the charset
	#[case("a_b-c1", true)]
	#[case("Job123", true)]
	fn validates_custom_job_ids(#[case] id: &str, #[case] valid: bool) {
		let mgr = JobManager::new(5, 3, 50);
		assert_eq!(mgr.create(square(), DetectionParams::default(), Some(id.to_string())).is_ok(), valid);
	}

	#[test]
	fn duplicate_custom_id_is_rejected() {
		let mgr = JobManager::new(5, 3, 50);
		mgr.create(square(), DetectionParams::default(), Some("job-x".to_string())).unwrap();
		let err = mgr
			.create(square(), DetectionParams::default(), Some("job-x".to_string()))
			.unwrap_err();
		assert_eq!(err.kind, ErrorKind::Duplicate);
	}

	#[test]
	fn progress_is_monotonic_and_clamped() {
		let mgr = JobManager::new(5, 3, 50);
		let id = mgr.create(square(), DetectionParams::default(), None).unwrap();
		mgr.update_progress(&id, 30, "Processing", 0);
		mgr.update_progress(&id, 10, "Processing", 0); // attempted regression
		let view = mgr.get(&id).unwrap();
		assert_eq!(view.progress, 30);
		assert_eq!(view.status, JobStatus::Processing);
	}

	#[test]
	fn terminal_job_cannot_be_mutated_further() {
		let mgr = JobManager::new(5, 3, 50);
		let id = mgr.create(square(), DetectionParams::default(), None).unwrap();
		mgr.complete(&id, JobResult { buildings: vec![], total_buildings: 0 });
		mgr.update_progress(&id, 50, "Processing", 1);
		let view = mgr.get(&id).unwrap();
		assert_eq!(view.progress, 100);
		assert_eq!(view.status, JobStatus::Completed);
	}

	#[test]
	fn cancel_after_terminal_is_rejected() {
		let mgr = JobManager::new(5, 3, 50);
		let id = mgr.create(square(), DetectionParams::default(), None).unwrap();
		mgr.complete(&id, JobResult { buildings: vec![], total_buildings: 0 });
		let err = mgr.cancel(&id).unwrap_err();
		assert_eq!(err.kind, ErrorKind::Terminal);
	}

	#[test]
	fn list_is_sorted_newest_first() {
		let mgr = JobManager::new(5, 3, 50);
		let first = mgr.create(square(), DetectionParams::default(), None).unwrap();
		std::thread::sleep(std::time::Duration::from_millis(5));
		let second = mgr.create(square(), DetectionParams::default(), None).unwrap();
		let jobs = mgr.list();
		assert_eq!(jobs[0].job_id, second);
		assert_eq!(jobs[1].job_id, first);
	}
}
