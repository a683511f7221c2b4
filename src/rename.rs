use std::path::PathBuf;
use tracing::debug;

/// Pairs the two halves of a rename into one logical event.
///
/// inotify reports a move as separate IN_MOVED_FROM / IN_MOVED_TO records
/// that may be separated by other events; Windows reports adjacent
/// RENAMED_OLD_NAME / RENAMED_NEW_NAME records in the same batch. Both
/// flow through this state machine, instance-scoped so concurrent watcher
/// instances cannot corrupt each other's pairing.
///
/// At most one rename is tracked in flight: a second moved-from overwrites
/// the first (last-moved-from-wins), and concurrent interleaved renames
/// under heavy load may mis-pair. Accepted limitation.
#[derive(Debug, Default)]
pub(crate) struct RenameCorrelator {
	pending_old: Option<PathBuf>,
}

impl RenameCorrelator {
	pub fn new() -> Self {
		Self { pending_old: None }
	}

	/// Record the source half of a rename.
	pub fn moved_from(&mut self, path: PathBuf) {
		if let Some(stale) = self.pending_old.replace(path) {
			debug!("Discarding stale rename source: {}", stale.display());
		}
	}

	/// Resolve the destination half against the pending source, if any.
	///
	/// An orphaned moved-to (a move originating outside the watched tree)
	/// yields `None` and is dropped silently.
	pub fn moved_to(&mut self, path: PathBuf) -> Option<(PathBuf, PathBuf)> {
		match self.pending_old.take() {
			Some(old) => Some((old, path)),
			None => {
				debug!("Dropping orphaned rename destination: {}", path.display());
				None
			}
		}
	}
}
