mod backend;
mod classify;
mod error;
mod events;
mod handles;
mod rename;
mod watcher;

pub use error::{Result, WatcherError};
pub use events::{ChangeEvent, ChangeKind};
pub use watcher::{start, WatcherConfig, WatcherHandle};
