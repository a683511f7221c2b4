use crate::backend::{NotificationBackend, RawAction, RawChange};
use crate::error::{Result, WatcherError};
use crate::handles::WatchHandleTable;
use std::ffi::OsString;
use std::io;
use std::mem::{self, MaybeUninit};
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::os::windows::io::{AsRawHandle, FromRawHandle, OwnedHandle, RawHandle};
use std::path::{Path, PathBuf};
use std::ptr;
use std::time::Duration;
use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{
	CloseHandle, ERROR_IO_PENDING, HANDLE, INVALID_HANDLE_VALUE, STATUS_NOTIFY_ENUM_DIR,
	WAIT_TIMEOUT,
};
use windows_sys::Win32::Storage::FileSystem::{
	CreateFileW, ReadDirectoryChangesW, FILE_ACTION_ADDED, FILE_ACTION_MODIFIED,
	FILE_ACTION_REMOVED, FILE_ACTION_RENAMED_NEW_NAME, FILE_ACTION_RENAMED_OLD_NAME,
	FILE_FLAG_BACKUP_SEMANTICS, FILE_FLAG_OVERLAPPED, FILE_LIST_DIRECTORY,
	FILE_NOTIFY_CHANGE_DIR_NAME, FILE_NOTIFY_CHANGE_FILE_NAME, FILE_NOTIFY_CHANGE_LAST_WRITE,
	FILE_NOTIFY_CHANGE_SIZE, FILE_NOTIFY_INFORMATION, FILE_SHARE_DELETE, FILE_SHARE_READ,
	FILE_SHARE_WRITE, OPEN_EXISTING,
};
use windows_sys::Win32::System::IO::{
	CreateIoCompletionPort, GetQueuedCompletionStatusEx, OVERLAPPED, OVERLAPPED_ENTRY,
};

const NOTIFY_FILTER: u32 = FILE_NOTIFY_CHANGE_FILE_NAME
	| FILE_NOTIFY_CHANGE_DIR_NAME
	| FILE_NOTIFY_CHANGE_SIZE
	| FILE_NOTIFY_CHANGE_LAST_WRITE;

const ROOT_KEY: usize = 1;
const MAX_COMPLETIONS: usize = 16;

/// If one burst of changes exceeds this, the OS silently drops the rest.
/// The engine does not retry or detect that condition.
const READ_BUFFER_SIZE: usize = 64 * 1024;

#[repr(C)]
struct ReadContext {
	overlapped: OVERLAPPED,
	buffer: Vec<u8>,
}

impl ReadContext {
	fn new() -> Self {
		Self {
			overlapped: unsafe { mem::zeroed() },
			buffer: vec![0u8; READ_BUFFER_SIZE],
		}
	}

	fn reset(&mut self) {
		self.overlapped = unsafe { mem::zeroed() };
	}
}

unsafe impl Send for ReadContext {}

struct CompletionPort {
	handle: HANDLE,
}

impl CompletionPort {
	fn new() -> io::Result<Self> {
		let handle = unsafe { CreateIoCompletionPort(INVALID_HANDLE_VALUE, 0, 0, 0) };
		if handle == 0 {
			Err(io::Error::last_os_error())
		} else {
			Ok(Self { handle })
		}
	}

	fn associate(&self, file: HANDLE, key: usize) -> io::Result<()> {
		let result = unsafe { CreateIoCompletionPort(file, self.handle, key, 0) };
		if result == 0 {
			Err(io::Error::last_os_error())
		} else {
			Ok(())
		}
	}
}

impl Drop for CompletionPort {
	fn drop(&mut self) {
		unsafe {
			if self.handle != 0 {
				CloseHandle(self.handle);
			}
		}
	}
}

/// Native-recursive backend built on `ReadDirectoryChangesW`.
///
/// One subscription on the root covers the entire subtree when recursion
/// is requested, so the handle table holds exactly one entry and runtime
/// coverage extension is a no-op. Records arrive as variable-length
/// `FILE_NOTIFY_INFORMATION` entries packed into one buffer, walked by
/// `NextEntryOffset`; a rename is two adjacent records (old name, then
/// new name) for the same underlying change.
pub(crate) struct ReadDirectoryChangesBackend {
	port: CompletionPort,
	directory: Option<OwnedHandle>,
	handles: WatchHandleTable<usize>,
	recursive: bool,
	context: Box<ReadContext>,
}

unsafe impl Send for ReadDirectoryChangesBackend {}

impl ReadDirectoryChangesBackend {
	pub fn new() -> Result<Self> {
		let port = CompletionPort::new().map_err(WatcherError::Io)?;
		Ok(Self {
			port,
			directory: None,
			handles: WatchHandleTable::new(),
			recursive: false,
			context: Box::new(ReadContext::new()),
		})
	}

	fn open_directory(path: &Path) -> io::Result<OwnedHandle> {
		let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
		wide.push(0);
		let handle = unsafe {
			CreateFileW(
				wide.as_ptr(),
				FILE_LIST_DIRECTORY,
				FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
				ptr::null_mut(),
				OPEN_EXISTING,
				FILE_FLAG_BACKUP_SEMANTICS | FILE_FLAG_OVERLAPPED,
				0,
			)
		};
		if handle == INVALID_HANDLE_VALUE {
			Err(io::Error::last_os_error())
		} else {
			Ok(unsafe { OwnedHandle::from_raw_handle(handle as RawHandle) })
		}
	}

	fn issue_read(&mut self) -> io::Result<()> {
		let Some(directory) = &self.directory else {
			return Err(io::Error::new(
				io::ErrorKind::NotConnected,
				"no directory subscribed",
			));
		};
		self.context.reset();
		let result = unsafe {
			ReadDirectoryChangesW(
				directory.as_raw_handle() as HANDLE,
				self.context.buffer.as_mut_ptr().cast(),
				self.context.buffer.len() as u32,
				self.recursive as i32,
				NOTIFY_FILTER,
				ptr::null_mut(),
				&mut self.context.overlapped,
				None,
			)
		};
		if result == 0 {
			let err = io::Error::last_os_error();
			if err.raw_os_error() == Some(ERROR_IO_PENDING as i32) {
				Ok(())
			} else {
				Err(err)
			}
		} else {
			Ok(())
		}
	}

	fn decode_buffer(&self, key: usize, bytes: usize) -> Vec<RawChange> {
		let mut changes = Vec::new();
		let Some(root) = self.handles.resolve(&key) else {
			debug!("Completion for unknown key {}, ignoring", key);
			return changes;
		};

		let mut offset = 0usize;
		while offset + mem::size_of::<FILE_NOTIFY_INFORMATION>() <= bytes {
			let record = unsafe {
				&*(self.context.buffer.as_ptr().add(offset) as *const FILE_NOTIFY_INFORMATION)
			};
			let name_len = (record.FileNameLength as usize) / 2;
			let name_slice =
				unsafe { std::slice::from_raw_parts(record.FileName.as_ptr(), name_len) };
			let relative = PathBuf::from(OsString::from_wide(name_slice));
			let path = root.join(relative);

			let action = match record.Action {
				FILE_ACTION_ADDED => Some(RawAction::Added),
				FILE_ACTION_REMOVED => Some(RawAction::Removed),
				FILE_ACTION_MODIFIED => Some(RawAction::Modified),
				FILE_ACTION_RENAMED_OLD_NAME => Some(RawAction::RenamedFrom),
				FILE_ACTION_RENAMED_NEW_NAME => Some(RawAction::RenamedTo),
				other => {
					debug!("Unknown action code {}, ignoring", other);
					None
				}
			};
			if let Some(action) = action {
				// No directory hint in these records; classification stats.
				changes.push(RawChange { path, action, is_dir: None });
			}

			if record.NextEntryOffset == 0 {
				break;
			}
			offset += record.NextEntryOffset as usize;
		}
		changes
	}
}

impl NotificationBackend for ReadDirectoryChangesBackend {
	fn subscribe(&mut self, root: &Path, recursive: bool) -> Result<()> {
		self.recursive = recursive;
		let directory = Self::open_directory(root).map_err(|source| WatcherError::Setup {
			path: root.display().to_string(),
			source,
		})?;
		self.port
			.associate(directory.as_raw_handle() as HANDLE, ROOT_KEY)
			.map_err(|source| WatcherError::Setup {
				path: root.display().to_string(),
				source,
			})?;
		self.directory = Some(directory);
		self.handles.insert(ROOT_KEY, root.to_path_buf());
		self.issue_read().map_err(|source| WatcherError::Setup {
			path: root.display().to_string(),
			source,
		})
	}

	fn on_directory_created(&mut self, _path: &Path) {
		// The root subscription already covers new subdirectories.
	}

	fn next_batch(&mut self, timeout: Duration) -> Result<Option<Vec<RawChange>>> {
		let mut entries: [OVERLAPPED_ENTRY; MAX_COMPLETIONS] =
			unsafe { MaybeUninit::zeroed().assume_init() };
		let mut removed = 0u32;
		let timeout_ms = timeout.as_millis().min(u32::MAX as u128) as u32;
		let result = unsafe {
			GetQueuedCompletionStatusEx(
				self.port.handle,
				entries.as_mut_ptr(),
				entries.len() as u32,
				&mut removed,
				timeout_ms,
				0,
			)
		};

		if result == 0 {
			let err = io::Error::last_os_error();
			if err.raw_os_error() == Some(WAIT_TIMEOUT as i32) {
				return Ok(None);
			}
			return Err(WatcherError::Read { source: err });
		}

		for entry in entries.iter().take(removed as usize) {
			if entry.lpOverlapped.is_null() {
				continue;
			}
			// Internal carries the NTSTATUS of the completed read. Only
			// warning/error severities (negative values) are fatal;
			// success-class statuses such as STATUS_NOTIFY_ENUM_DIR must
			// fall through to the overflow handling below.
			let status = entry.Internal as i32;
			if status_is_failure(status) {
				let source = io::Error::new(
					io::ErrorKind::Other,
					format!("directory read completed with status {status:#010x}"),
				);
				return Err(WatcherError::Read { source });
			}

			let bytes = entry.dwNumberOfBytesTransferred as usize;
			if status_is_overflow(status, bytes) {
				// The burst outgrew the buffer and the OS discarded it
				// wholesale, completing with STATUS_NOTIFY_ENUM_DIR and
				// zero bytes. Absorbed: the loop keeps running.
				warn!("Notification buffer overflowed, changes were dropped");
			}
			let changes = self.decode_buffer(entry.lpCompletionKey, bytes);
			self.issue_read()
				.map_err(|source| WatcherError::Read { source })?;
			return Ok(Some(changes));
		}

		Ok(None)
	}
}

/// NTSTATUS severity lives in the top two bits; warning (0b10) and error
/// (0b11) severities make the value negative as an i32.
fn status_is_failure(status: i32) -> bool {
	status < 0
}

fn status_is_overflow(status: i32, bytes: usize) -> bool {
	status == STATUS_NOTIFY_ENUM_DIR || bytes == 0
}
