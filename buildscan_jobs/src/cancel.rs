//! A cancellation handle owned by a [`crate::job::Job`] and cloned into its workers.
//!
//! Kept as a dedicated type rather than a back-reference into the job table, so a
//! worker never needs to borrow the job it is running for.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
	pub fn new() -> CancelToken {
		CancelToken(Arc::new(AtomicBool::new(false)))
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}

	pub fn inner(&self) -> Arc<AtomicBool> {
		self.0.clone()
	}
}
