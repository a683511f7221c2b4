use crate::events::ChangeKind;
use std::path::{Path, PathBuf};

/// File-vs-folder classification for raw add/modify/remove signals.
///
/// The raw OS records carry only a path and an action code, so the entry
/// kind has to be recovered by statting the path at classification time.
/// For removed entries the path is already gone and an extension heuristic
/// stands in: a directory named `archive.old` or an extensionless file both
/// misclassify. Accepted approximation.

/// An add signal. `dir_hint` carries the backend's own knowledge when it
/// has any (inotify IN_ISDIR); otherwise the path is statted.
pub(crate) fn classify_added(path: PathBuf, dir_hint: Option<bool>) -> ChangeKind {
	let is_file = match dir_hint {
		Some(is_dir) => !is_dir && path.is_file(),
		None => path.is_file(),
	};
	if is_file {
		ChangeKind::FileAdded { path }
	} else {
		// Directory, or already gone again.
		ChangeKind::FolderAdded { path }
	}
}

/// A modify signal. Directory modifications are not surfaced.
pub(crate) fn classify_modified(path: PathBuf) -> Option<ChangeKind> {
	if path.is_file() {
		Some(ChangeKind::FileModified { path })
	} else {
		None
	}
}

/// A remove signal, classified by the extension heuristic.
pub(crate) fn classify_removed(path: PathBuf) -> ChangeKind {
	if has_extension(&path) {
		ChangeKind::FileRemoved { path }
	} else {
		ChangeKind::FolderRemoved { path }
	}
}

/// A correlated rename, classified by the new path's current type.
///
/// Folder renames are only emitted when `rename_folders` is set; the
/// default mirrors the historical behavior of emitting file renames only.
pub(crate) fn classify_renamed(
	from: PathBuf, to: PathBuf, rename_folders: bool,
) -> Option<ChangeKind> {
	if to.is_file() {
		Some(ChangeKind::FileRenamed { from, to })
	} else if rename_folders && to.is_dir() {
		Some(ChangeKind::FolderRenamed { from, to })
	} else {
		None
	}
}

fn has_extension(path: &Path) -> bool {
	path.extension().is_some()
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn test_added_file_vs_folder() {
		let dir = TempDir::new().unwrap();
		let file = dir.path().join("a.txt");
		std::fs::write(&file, "content").unwrap();
		let sub = dir.path().join("sub");
		std::fs::create_dir(&sub).unwrap();

		assert!(matches!(
			classify_added(file, None),
			ChangeKind::FileAdded { .. }
		));
		assert!(matches!(
			classify_added(sub, None),
			ChangeKind::FolderAdded { .. }
		));
		// A path that vanished before we could stat it falls back to folder.
		assert!(matches!(
			classify_added(dir.path().join("gone"), None),
			ChangeKind::FolderAdded { .. }
		));
	}

	#[test]
	fn test_added_honors_dir_hint() {
		let dir = TempDir::new().unwrap();
		let sub = dir.path().join("sub");
		std::fs::create_dir(&sub).unwrap();

		assert!(matches!(
			classify_added(sub, Some(true)),
			ChangeKind::FolderAdded { .. }
		));
	}

	#[test]
	fn test_modified_only_for_files() {
		let dir = TempDir::new().unwrap();
		let file = dir.path().join("a.txt");
		std::fs::write(&file, "content").unwrap();

		assert!(matches!(
			classify_modified(file),
			Some(ChangeKind::FileModified { .. })
		));
		assert_eq!(classify_modified(dir.path().to_path_buf()), None);
	}

	#[test]
	fn test_removed_extension_heuristic() {
		// The path no longer exists, so only the suffix decides. An
		// extensionless file misclassifies as a folder by design.
		assert!(matches!(
			classify_removed(PathBuf::from("/watched/notes.txt")),
			ChangeKind::FileRemoved { .. }
		));
		assert!(matches!(
			classify_removed(PathBuf::from("/watched/Makefile")),
			ChangeKind::FolderRemoved { .. }
		));
		assert!(matches!(
			classify_removed(PathBuf::from("/watched/archive.old")),
			ChangeKind::FileRemoved { .. }
		));
	}

	#[test]
	fn test_renamed_file() {
		let dir = TempDir::new().unwrap();
		let to = dir.path().join("b.txt");
		std::fs::write(&to, "content").unwrap();

		let kind = classify_renamed(dir.path().join("a.txt"), to.clone(), false);
		assert_eq!(
			kind,
			Some(ChangeKind::FileRenamed { from: dir.path().join("a.txt"), to })
		);
	}

	#[test]
	fn test_renamed_folder_policy() {
		let dir = TempDir::new().unwrap();
		let to = dir.path().join("renamed");
		std::fs::create_dir(&to).unwrap();

		// Default policy: directory renames produce nothing.
		assert_eq!(
			classify_renamed(dir.path().join("orig"), to.clone(), false),
			None
		);
		assert_eq!(
			classify_renamed(dir.path().join("orig"), to.clone(), true),
			Some(ChangeKind::FolderRenamed { from: dir.path().join("orig"), to })
		);
	}
}
