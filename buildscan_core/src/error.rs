//! Structured error kinds attached to an [`anyhow::Error`] at the point it becomes
//! client-visible. Internal errors stay untyped `anyhow::Error` and never construct
//! an [`AppError`].

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	InvalidInput,
	/// Well-formed but semantically rejected (bad job_id format, a job that ran to
	/// failure). Distinct from `InvalidInput` because it maps to HTTP 422, not 400.
	Unprocessable,
	Duplicate,
	Capacity,
	Unavailable,
	Unknown,
	Terminal,
}

/// A client-facing error: a [`ErrorKind`] plus a human-readable message.
///
/// Attached to an `anyhow::Error` via `.context(AppError::new(...))` or
/// `AppError::new(...).into()`; the HTTP layer recovers it with
/// `err.downcast_ref::<AppError>()` to choose a status code.
#[derive(Debug, Clone)]
pub struct AppError {
	pub kind: ErrorKind,
	pub message: String,
}

impl AppError {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> AppError {
		AppError { kind, message: message.into() }
	}

	pub fn invalid_input(message: impl Into<String>) -> AppError {
		AppError::new(ErrorKind::InvalidInput, message)
	}

	pub fn unprocessable(message: impl Into<String>) -> AppError {
		AppError::new(ErrorKind::Unprocessable, message)
	}

	pub fn duplicate(message: impl Into<String>) -> AppError {
		AppError::new(ErrorKind::Duplicate, message)
	}

	pub fn capacity(message: impl Into<String>) -> AppError {
		AppError::new(ErrorKind::Capacity, message)
	}

	pub fn unavailable(message: impl Into<String>) -> AppError {
		AppError::new(ErrorKind::Unavailable, message)
	}

	pub fn unknown(message: impl Into<String>) -> AppError {
		AppError::new(ErrorKind::Unknown, message)
	}

	pub fn terminal(message: impl Into<String>) -> AppError {
		AppError::new(ErrorKind::Terminal, message)
	}
}

impl fmt::Display for AppError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.message)
	}
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn downcast_recovers_kind() {
		let err: anyhow::Error = AppError::duplicate("job-x already exists").into();
		let app = err.downcast_ref::<AppError>().unwrap();
		assert_eq!(app.kind, ErrorKind::Duplicate);
	}
}
