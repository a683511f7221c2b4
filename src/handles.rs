use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};

/// Maps an opaque OS watch identifier to the directory it covers.
///
/// On inotify the key is a watch descriptor and the table holds one entry
/// per directory under the root; on Windows a single native-recursive
/// subscription yields exactly one entry. Entries grow while watching is
/// active and are never removed: the handle of a deleted directory simply
/// stops matching, an accepted leak bounded by the size of the tree.
#[derive(Debug, Default)]
pub(crate) struct WatchHandleTable<H: Eq + Hash> {
	entries: HashMap<H, PathBuf>,
}

impl<H: Eq + Hash> WatchHandleTable<H> {
	pub fn new() -> Self {
		Self { entries: HashMap::new() }
	}

	pub fn insert(&mut self, handle: H, dir: PathBuf) {
		self.entries.insert(handle, dir);
	}

	/// Directory covered by `handle`, if the handle is known.
	pub fn resolve(&self, handle: &H) -> Option<&Path> {
		self.entries.get(handle).map(PathBuf::as_path)
	}

	pub fn covers(&self, dir: &Path) -> bool {
		self.entries.values().any(|existing| existing == dir)
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.entries.len()
	}
}
