// Integration tests for rename correlation: the two halves of a move
// must resolve to one typed rename event, with no intermediate
// Added/Removed events for the affected paths.

#![cfg(target_os = "linux")]

use dirwatch::{start, ChangeKind, WatcherConfig};
use serial_test::serial;
use std::path::PathBuf;

mod common;

fn config(path: PathBuf, rename_folders: bool) -> WatcherConfig {
	WatcherConfig { path, recursive: false, rename_folders }
}

#[tokio::test]
#[serial]
async fn test_file_rename_yields_single_event() {
	let (_dir, root) = common::setup_temp_dir();
	let from = root.join("a.txt");
	common::create_test_file(&from, "content").unwrap();

	let (handle, mut receiver) = start(config(root.clone(), false)).unwrap();

	let to = root.join("b.txt");
	std::fs::rename(&from, &to).unwrap();
	common::wait_for_events().await;

	let kinds = common::collect_kinds(&mut receiver, common::collect_window()).await;
	let renames: Vec<_> = kinds.iter().filter(|k| k.is_rename()).collect();
	assert_eq!(
		renames,
		vec![&ChangeKind::FileRenamed { from: from.clone(), to: to.clone() }],
		"expected exactly one FileRenamed, got {kinds:?}"
	);
	assert!(
		!kinds.iter().any(|k| matches!(
			k,
			ChangeKind::FileAdded { path } | ChangeKind::FileRemoved { path }
				if *path == from || *path == to
		)),
		"a rename must not surface as add/remove: {kinds:?}"
	);

	handle.stop().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_move_into_watched_tree_is_an_orphan_half() {
	let (_outside, outside_root) = common::setup_temp_dir();
	let (_dir, root) = common::setup_temp_dir();
	let source = outside_root.join("outside.txt");
	common::create_test_file(&source, "content").unwrap();

	let (handle, mut receiver) = start(config(root.clone(), false)).unwrap();

	// Only the moved-to half lands inside the watched tree; with no
	// pending moved-from it is dropped silently.
	let dest = root.join("outside.txt");
	std::fs::rename(&source, &dest).unwrap();
	common::wait_for_events().await;

	let kinds = common::collect_kinds(&mut receiver, common::collect_window()).await;
	assert!(
		!kinds.iter().any(|k| k.is_rename()),
		"an orphaned moved-to must not produce a rename: {kinds:?}"
	);

	handle.stop().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_directory_rename_follows_policy() {
	let (_dir, root) = common::setup_temp_dir();
	let from = root.join("orig");
	std::fs::create_dir(&from).unwrap();

	// Default policy: directory renames are not surfaced.
	let (handle, mut receiver) = start(config(root.clone(), false)).unwrap();
	let to = root.join("renamed");
	std::fs::rename(&from, &to).unwrap();
	common::wait_for_events().await;

	let kinds = common::collect_kinds(&mut receiver, common::collect_window()).await;
	assert!(
		!kinds.iter().any(|k| k.is_rename()),
		"directory rename suppressed by default: {kinds:?}"
	);
	handle.stop().await.unwrap();

	// Opt-in policy: the same rename produces FolderRenamed.
	std::fs::rename(&to, &from).unwrap();
	let (handle, mut receiver) = start(config(root.clone(), true)).unwrap();
	std::fs::rename(&from, &to).unwrap();
	common::wait_for_events().await;

	let kinds = common::collect_kinds(&mut receiver, common::collect_window()).await;
	assert!(
		kinds.iter().any(|k| matches!(
			k,
			ChangeKind::FolderRenamed { from: f, to: t } if *f == from && *t == to
		)),
		"expected FolderRenamed with rename_folders on: {kinds:?}"
	);
	handle.stop().await.unwrap();
}
