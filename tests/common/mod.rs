//! Common test utilities for the dirwatch integration tests

#![allow(dead_code)]

use dirwatch::{ChangeEvent, ChangeKind};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

/// Create a temporary directory for testing, with the path canonicalized
/// so event paths compare exactly.
pub fn setup_temp_dir() -> (TempDir, PathBuf) {
	let dir = TempDir::new().expect("Failed to create temp directory");
	let root = dir
		.path()
		.canonicalize()
		.expect("Failed to canonicalize temp directory");
	(dir, root)
}

/// Create a test file with content
pub fn create_test_file(path: &std::path::Path, content: &str) -> std::io::Result<()> {
	std::fs::write(path, content)
}

/// Wait long enough for filesystem events to propagate through the loop
pub async fn wait_for_events() {
	tokio::time::sleep(Duration::from_millis(400)).await;
}

/// Drain every event that arrives within `window`
pub async fn collect_kinds(
	receiver: &mut UnboundedReceiver<ChangeEvent>, window: Duration,
) -> Vec<ChangeKind> {
	let mut kinds = Vec::new();
	let deadline = tokio::time::Instant::now() + window;
	loop {
		match tokio::time::timeout_at(deadline, receiver.recv()).await {
			Ok(Some(event)) => kinds.push(event.kind),
			Ok(None) => break,
			Err(_) => break,
		}
	}
	kinds
}

/// Collection window generous enough for slow CI machines
pub fn collect_window() -> Duration {
	Duration::from_millis(800)
}
