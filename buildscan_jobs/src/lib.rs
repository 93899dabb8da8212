//! Job lifecycle, concurrency-capped job manager, and the shared runtime handle.

pub mod cancel;
pub mod cleanup;
pub mod job;
pub mod manager;
pub mod orchestrator;
pub mod runtime;

pub use cancel::CancelToken;
pub use cleanup::spawn_cleanup_sweep;
pub use job::{Job, JobResult, JobStatus};
pub use manager::{JobManager, JobView};
pub use orchestrator::run_job;
pub use runtime::{Runtime, RuntimeBuilder};
