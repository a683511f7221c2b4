use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Typed filesystem change, normalized across backends.
///
/// Added/Modified/Removed carry the affected path; renames carry the
/// (old, new) pair. The file/folder split is decided by the classifier,
/// since the raw OS records carry only a path and an action code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeKind {
	FileAdded { path: PathBuf },
	FolderAdded { path: PathBuf },
	FileModified { path: PathBuf },
	FileRemoved { path: PathBuf },
	FolderRemoved { path: PathBuf },
	FileRenamed { from: PathBuf, to: PathBuf },
	FolderRenamed { from: PathBuf, to: PathBuf },
}

impl ChangeKind {
	/// The affected path; for renames, the new path.
	pub fn path(&self) -> &Path {
		match self {
			ChangeKind::FileAdded { path }
			| ChangeKind::FolderAdded { path }
			| ChangeKind::FileModified { path }
			| ChangeKind::FileRemoved { path }
			| ChangeKind::FolderRemoved { path } => path,
			ChangeKind::FileRenamed { to, .. } | ChangeKind::FolderRenamed { to, .. } => to,
		}
	}

	pub fn is_rename(&self) -> bool {
		matches!(
			self,
			ChangeKind::FileRenamed { .. } | ChangeKind::FolderRenamed { .. }
		)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
	pub id: Uuid,
	pub timestamp: DateTime<Utc>,
	pub kind: ChangeKind,
}

impl ChangeEvent {
	pub fn new(kind: ChangeKind) -> Self {
		Self { id: Uuid::new_v4(), timestamp: Utc::now(), kind }
	}

	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}
}
