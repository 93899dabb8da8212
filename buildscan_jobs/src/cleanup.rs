//! Background sweep that evicts terminal jobs once they age out, so the in-memory
//! job table does not grow without bound across a long-lived server process.

use std::sync::Arc;
use std::time::Duration;

use crate::manager::JobManager;

const RETENTION: Duration = Duration::from_secs(24 * 3600);

/// Spawns a tokio task that calls [`JobManager::cleanup_older_than`] every `interval`.
/// Returns the task handle so the caller can abort it (e.g. in tests).
pub fn spawn_cleanup_sweep(manager: Arc<JobManager>, interval: Duration) -> tokio::task::JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);
		loop {
			ticker.tick().await;
			manager.cleanup_older_than(RETENTION);
		}
	})
}
