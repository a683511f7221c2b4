use crate::error::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(target_os = "linux")]
pub(crate) mod inotify;
#[cfg(windows)]
pub(crate) mod windows;

/// Raw action code shared by both backends.
///
/// Windows FILE_ACTION_RENAMED_OLD_NAME/NEW_NAME and inotify
/// IN_MOVED_FROM/IN_MOVED_TO both map onto RenamedFrom/RenamedTo, so one
/// correlator serves both; on Windows the two halves arrive adjacent in a
/// single batch and resolve immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawAction {
	Added,
	Removed,
	Modified,
	RenamedFrom,
	RenamedTo,
}

/// One decoded notification record: the reconstructed absolute path plus
/// the action. `is_dir` is set when the OS record itself says whether the
/// entry is a directory (inotify IN_ISDIR); Windows gives no such hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawChange {
	pub path: PathBuf,
	pub action: RawAction,
	pub is_dir: Option<bool>,
}

/// Platform notification source.
///
/// One implementation per OS mechanism, selected at compile time; the
/// engine loop is written against this trait so the correlator, classifier
/// and routing logic stay platform-independent (and testable against a
/// scripted implementation).
pub(crate) trait NotificationBackend {
	/// Establish the initial subscriptions covering `root`. Failure here
	/// is fatal: the engine reports it and never enters the loop.
	fn subscribe(&mut self, root: &Path, recursive: bool) -> Result<()>;

	/// Extend coverage to a directory discovered at runtime. A no-op on
	/// natively recursive backends. Failures are non-fatal: logged, and
	/// the subtree is left unwatched.
	fn on_directory_created(&mut self, path: &Path);

	/// Block up to `timeout` for the next batch of records. `Ok(None)`
	/// means the wait timed out with nothing to report, giving the caller
	/// a chance to check its stop flag.
	fn next_batch(&mut self, timeout: Duration) -> Result<Option<Vec<RawChange>>>;
}
