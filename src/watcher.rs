use crate::backend::{NotificationBackend, RawAction};
use crate::classify;
use crate::error::{Result, WatcherError};
use crate::events::ChangeEvent;
use crate::rename::RenameCorrelator;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, error, info};

#[cfg(target_os = "linux")]
use crate::backend::inotify::InotifyBackend as PlatformBackend;
#[cfg(windows)]
use crate::backend::windows::ReadDirectoryChangesBackend as PlatformBackend;
#[cfg(not(any(target_os = "linux", windows)))]
compile_error!("dirwatch supports Linux (inotify) and Windows (ReadDirectoryChangesW) only");

/// How long one blocking wait on the backend may last before the loop
/// rechecks its stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct WatcherConfig {
	pub path: PathBuf,
	pub recursive: bool,
	/// Emit `FolderRenamed` when a correlated rename's new path is a
	/// directory. Off by default: historically only file renames were
	/// surfaced.
	pub rename_folders: bool,
}

/// Control handle for a running watcher.
pub struct WatcherHandle {
	stop: Arc<AtomicBool>,
	join: Option<thread::JoinHandle<Result<()>>>,
}

impl WatcherHandle {
	/// Signal the loop to stop and wait for it to release its OS
	/// subscriptions. Surfaces a read failure that already ended the loop.
	pub async fn stop(mut self) -> Result<()> {
		self.stop.store(true, Ordering::Relaxed);
		let Some(join) = self.join.take() else {
			return Ok(());
		};
		let result = tokio::task::spawn_blocking(move || join.join())
			.await
			.map_err(|_| WatcherError::StopSignal)?;
		result.map_err(|_| WatcherError::StopSignal)?
	}
}

/// Start watching `config.path` and return a control handle plus the
/// event stream.
///
/// Subscriptions are established before this returns, so a missing or
/// inaccessible root fails here and the loop never runs. An empty path is
/// a contractual no-op: no subscriptions, an immediately closed stream,
/// no error. Dropping the receiver ends the loop.
pub fn start(config: WatcherConfig) -> Result<(WatcherHandle, tokio_mpsc::UnboundedReceiver<ChangeEvent>)> {
	let (tx, rx) = tokio_mpsc::unbounded_channel();
	let stop = Arc::new(AtomicBool::new(false));

	if config.path.as_os_str().is_empty() {
		return Ok((WatcherHandle { stop, join: None }, rx));
	}
	if !config.path.is_dir() {
		return Err(WatcherError::InvalidPath {
			path: config.path.to_string_lossy().to_string(),
		});
	}

	let mut backend = PlatformBackend::new()?;
	backend.subscribe(&config.path, config.recursive)?;
	info!(
		"Watching {} (recursive: {})",
		config.path.display(),
		config.recursive
	);

	let loop_stop = Arc::clone(&stop);
	let join = thread::Builder::new()
		.name("dirwatch-loop".to_string())
		.spawn(move || {
			let result = run_loop(backend, &config, tx, &loop_stop);
			if let Err(e) = &result {
				error!("Notification loop failed ({}): {}", e.category(), e);
			}
			result
		})
		.map_err(WatcherError::Io)?;

	Ok((WatcherHandle { stop, join: Some(join) }, rx))
}

/// The central blocking cycle: wait for a batch of raw records, route
/// each through the rename correlator or the classifier, emit the typed
/// event. Single thread of control, no internal parallelism; the only
/// suspension point is the bounded wait inside `next_batch`.
fn run_loop<B: NotificationBackend>(
	mut backend: B, config: &WatcherConfig, tx: tokio_mpsc::UnboundedSender<ChangeEvent>,
	stop: &AtomicBool,
) -> Result<()> {
	let mut correlator = RenameCorrelator::new();

	while !stop.load(Ordering::Relaxed) {
		let batch = match backend.next_batch(POLL_INTERVAL)? {
			Some(batch) => batch,
			None => continue,
		};

		for record in batch {
			debug!("Raw record: {:?} {}", record.action, record.path.display());

			let kind = match record.action {
				RawAction::Added => {
					if record.is_dir.unwrap_or(false) || record.path.is_dir() {
						// Subscribe before handling anything further for
						// this directory; entries created in the gap can
						// still be missed.
						backend.on_directory_created(&record.path);
					}
					Some(classify::classify_added(record.path, record.is_dir))
				}
				RawAction::Removed => Some(classify::classify_removed(record.path)),
				RawAction::Modified => classify::classify_modified(record.path),
				RawAction::RenamedFrom => {
					correlator.moved_from(record.path);
					None
				}
				RawAction::RenamedTo => correlator.moved_to(record.path).and_then(
					|(from, to)| classify::classify_renamed(from, to, config.rename_folders),
				),
			};

			if let Some(kind) = kind {
				if tx.send(ChangeEvent::new(kind)).is_err() {
					debug!("Event receiver dropped, stopping loop");
					return Ok(());
				}
			}
		}
	}

	debug!("Notification loop stopped");
	Ok(())
}
