use thiserror::Error;

/// Core watcher error types.
///
/// Only terminal conditions live here: setup failures are returned from
/// `start` before the loop runs, read failures end the loop. Non-fatal
/// irregularities (a subdirectory that cannot be subscribed, OS-side
/// buffer overflow, orphaned rename halves) are logged and absorbed,
/// never surfaced as errors.
#[derive(Error, Debug)]
pub enum WatcherError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON serialization error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Invalid path: {path}")]
	InvalidPath { path: String },

	#[error("Failed to subscribe to {path}: {source}")]
	Setup {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("Notification read failed: {source}")]
	Read {
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to stop watcher cleanly")]
	StopSignal,
}

impl WatcherError {
	/// Whether this error prevents the loop from ever starting.
	pub fn is_setup(&self) -> bool {
		matches!(
			self,
			WatcherError::InvalidPath { .. } | WatcherError::Setup { .. }
		)
	}

	/// Error category for logging.
	pub fn category(&self) -> &'static str {
		match self {
			WatcherError::Io(_) => "io",
			WatcherError::Json(_) => "serialization",
			WatcherError::InvalidPath { .. } => "configuration",
			WatcherError::Setup { .. } => "setup",
			WatcherError::Read { .. } => "read",
			WatcherError::StopSignal => "shutdown",
		}
	}
}

pub type Result<T> = std::result::Result<T, WatcherError>;
