use clap::Parser;
use dirwatch::{ChangeEvent, ChangeKind, WatcherConfig};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "dirwatch")]
#[command(about = "Watch a directory and report typed filesystem change events")]
struct Cli {
	/// Path to watch
	#[arg(short, long)]
	path: PathBuf,

	/// Watch subdirectories as well
	#[arg(short, long, default_value_t = false)]
	recursive: bool,

	/// Also report directory renames
	#[arg(long, default_value_t = false)]
	rename_folders: bool,

	/// Print events as JSON lines
	#[arg(long, default_value_t = false)]
	json: bool,

	/// Enable verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let level = if cli.verbose {
		Level::DEBUG
	} else {
		Level::INFO
	};
	tracing_subscriber::fmt().with_max_level(level).init();

	info!("Starting directory watcher for path: {:?}", cli.path);

	let config = WatcherConfig {
		path: cli.path,
		recursive: cli.recursive,
		rename_folders: cli.rename_folders,
	};
	let (handle, mut events) = dirwatch::start(config)?;

	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => break,
			event = events.recv() => match event {
				Some(event) => print_event(&event, cli.json)?,
				None => break,
			},
		}
	}

	info!("Shutting down watcher...");
	handle.stop().await?;
	Ok(())
}

fn print_event(event: &ChangeEvent, json: bool) -> anyhow::Result<()> {
	if json {
		println!("{}", event.to_json()?);
		return Ok(());
	}

	match &event.kind {
		ChangeKind::FileAdded { path } => info!("📄 FILE ADDED: {}", path.display()),
		ChangeKind::FolderAdded { path } => info!("📁 FOLDER ADDED: {}", path.display()),
		ChangeKind::FileModified { path } => info!("✏️  FILE MODIFIED: {}", path.display()),
		ChangeKind::FileRemoved { path } => info!("🗑️  FILE REMOVED: {}", path.display()),
		ChangeKind::FolderRemoved { path } => info!("🗑️  FOLDER REMOVED: {}", path.display()),
		ChangeKind::FileRenamed { from, to } => {
			info!("📝 FILE RENAMED: {} -> {}", from.display(), to.display());
		}
		ChangeKind::FolderRenamed { from, to } => {
			info!("📝 FOLDER RENAMED: {} -> {}", from.display(), to.display());
		}
	}
	Ok(())
}
