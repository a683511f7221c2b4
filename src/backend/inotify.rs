use crate::backend::{NotificationBackend, RawAction, RawChange};
use crate::error::{Result, WatcherError};
use crate::handles::WatchHandleTable;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify, WatchDescriptor};
use std::fs;
use std::io;
use std::os::fd::AsFd;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-directory backend built on inotify.
///
/// inotify has no native recursion: the root gets one watch, and when
/// recursive mode is on every directory found by a depth-first walk gets
/// its own watch, plus any directory discovered at runtime. Entries
/// created inside a brand-new directory before its watch is in place can
/// be missed; the window is closed as far as the mechanism allows by
/// subscribing before further records for that directory are processed.
pub(crate) struct InotifyBackend {
	inotify: Inotify,
	handles: WatchHandleTable<WatchDescriptor>,
	recursive: bool,
}

impl InotifyBackend {
	pub fn new() -> Result<Self> {
		let inotify = Inotify::init(InitFlags::IN_NONBLOCK | InitFlags::IN_CLOEXEC)
			.map_err(|errno| WatcherError::Io(io::Error::from(errno)))?;
		Ok(Self {
			inotify,
			handles: WatchHandleTable::new(),
			recursive: false,
		})
	}

	fn watch_mask() -> AddWatchFlags {
		AddWatchFlags::IN_CREATE
			| AddWatchFlags::IN_DELETE
			| AddWatchFlags::IN_MODIFY
			| AddWatchFlags::IN_MOVED_FROM
			| AddWatchFlags::IN_MOVED_TO
	}

	fn add_watch(&mut self, dir: &Path) -> io::Result<()> {
		if self.handles.covers(dir) {
			return Ok(());
		}
		let wd = self
			.inotify
			.add_watch(dir, Self::watch_mask())
			.map_err(io::Error::from)?;
		self.handles.insert(wd, dir.to_path_buf());
		debug!("Subscribed to {}", dir.display());
		Ok(())
	}

	/// Depth-first walk adding a watch per subdirectory. Failures here are
	/// warnings: the affected subtree is left unwatched.
	fn watch_subdirs(&mut self, dir: &Path) {
		let entries = match fs::read_dir(dir) {
			Ok(entries) => entries,
			Err(e) => {
				warn!("Cannot enumerate {}: {}", dir.display(), e);
				return;
			}
		};

		for entry in entries.flatten() {
			let path = entry.path();
			if !path.is_dir() {
				continue;
			}
			match self.add_watch(&path) {
				Ok(()) => self.watch_subdirs(&path),
				Err(e) => warn!("Failed to subscribe to {}: {}", path.display(), e),
			}
		}
	}

	fn decode(&self, event: &nix::sys::inotify::InotifyEvent) -> Option<RawChange> {
		let mask = event.mask;

		if mask.contains(AddWatchFlags::IN_Q_OVERFLOW) {
			// Kernel queue overflowed; later records in the burst are lost.
			warn!("inotify event queue overflowed, changes were dropped");
			return None;
		}

		let parent = match self.handles.resolve(&event.wd) {
			Some(parent) => parent,
			None => {
				debug!("Record for unknown watch descriptor, ignoring");
				return None;
			}
		};
		let path = match &event.name {
			Some(name) => parent.join(name),
			None => parent.to_path_buf(),
		};

		let action = if mask.contains(AddWatchFlags::IN_CREATE) {
			RawAction::Added
		} else if mask.contains(AddWatchFlags::IN_DELETE) {
			RawAction::Removed
		} else if mask.contains(AddWatchFlags::IN_MODIFY) {
			RawAction::Modified
		} else if mask.contains(AddWatchFlags::IN_MOVED_FROM) {
			RawAction::RenamedFrom
		} else if mask.contains(AddWatchFlags::IN_MOVED_TO) {
			RawAction::RenamedTo
		} else {
			// IN_IGNORED and friends carry no change of interest.
			return None;
		};

		Some(RawChange {
			path,
			action,
			is_dir: Some(mask.contains(AddWatchFlags::IN_ISDIR)),
		})
	}
}

impl NotificationBackend for InotifyBackend {
	fn subscribe(&mut self, root: &Path, recursive: bool) -> Result<()> {
		self.recursive = recursive;
		self.add_watch(root).map_err(|source| WatcherError::Setup {
			path: root.display().to_string(),
			source,
		})?;
		if recursive {
			self.watch_subdirs(root);
		}
		Ok(())
	}

	fn on_directory_created(&mut self, path: &Path) {
		if !self.recursive {
			return;
		}
		if let Err(e) = self.add_watch(path) {
			warn!("Failed to subscribe to {}: {}", path.display(), e);
			return;
		}
		// Anything created inside before the watch existed is only caught
		// by walking once more.
		self.watch_subdirs(path);
	}

	fn next_batch(&mut self, timeout: Duration) -> Result<Option<Vec<RawChange>>> {
		let millis = timeout.as_millis().min(u128::from(u16::MAX)) as u16;
		{
			let mut fds = [PollFd::new(self.inotify.as_fd(), PollFlags::POLLIN)];
			match poll(&mut fds, PollTimeout::from(millis)) {
				Ok(0) => return Ok(None),
				Ok(_) => {}
				Err(Errno::EINTR) => return Ok(None),
				Err(errno) => {
					return Err(WatcherError::Read { source: io::Error::from(errno) });
				}
			}
		}

		let events = match self.inotify.read_events() {
			Ok(events) => events,
			Err(Errno::EAGAIN) => return Ok(None),
			Err(errno) => {
				return Err(WatcherError::Read { source: io::Error::from(errno) });
			}
		};

		let batch: Vec<RawChange> = events.iter().filter_map(|e| self.decode(e)).collect();
		Ok(Some(batch))
	}
}
