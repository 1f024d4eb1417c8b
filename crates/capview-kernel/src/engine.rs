//! Contracts consumed by the hosting protocol engine.
//!
//! The engine owns sessions, command parsing and wire encoding. It asks a
//! [`FileSystemView`] for [`FileHandle`]s and calls a [`SessionHook`] around
//! transfers. Nothing here performs I/O on its own.

use std::io::{self, Read, Write};

/// One filesystem entry as the protocol engine sees it.
///
/// Queries answer `false`, `0` or `None` for entries that are missing or not
/// permitted; they never fail.
pub trait FileHandle {
    /// Backend-native handle, for collaborators that need it.
    type Physical;

    /// Absolute virtual path.
    fn absolute_path(&self) -> &str;

    fn name(&self) -> String;

    fn is_hidden(&self) -> bool;

    fn is_directory(&self) -> bool;

    fn is_file(&self) -> bool;

    fn does_exist(&self) -> bool;

    fn is_readable(&self) -> bool;

    fn is_writable(&self) -> bool;

    fn is_removable(&self) -> bool;

    fn owner_name(&self) -> &str;

    fn group_name(&self) -> &str;

    fn link_count(&self) -> u32;

    /// Last modification, milliseconds since the Unix epoch.
    fn last_modified(&self) -> i64;

    fn set_last_modified(&self, time: i64) -> bool;

    fn size(&self) -> u64;

    fn physical_file(&self) -> &Self::Physical;

    fn mkdir(&self) -> bool;

    fn delete(&self) -> bool;

    fn move_to(&self, destination: &Self) -> bool
    where
        Self: Sized;

    /// Children of a directory, `None` when this is not a listable directory.
    fn list_files(&self) -> Option<Vec<Self>>
    where
        Self: Sized;

    /// Stream the content, starting `offset` bytes in.
    fn create_input_stream(&self, offset: u64) -> io::Result<Box<dyn Read + Send>>;

    /// Stream new content, starting `offset` bytes in.
    fn create_output_stream(&self, offset: u64) -> io::Result<Box<dyn Write + Send>>;
}

/// Per-session filesystem view.
///
/// Each client session owns its own view, so the working directory is never
/// shared between sessions.
pub trait FileSystemView {
    type File: FileHandle;

    fn home_directory(&self) -> Self::File;

    fn working_directory(&self) -> Self::File;

    /// Returns false when the target cannot be entered.
    fn change_working_directory(&mut self, dir: &str) -> bool;

    fn get_file(&self, file: &str) -> Self::File;

    /// Whether handles support seeking to arbitrary offsets.
    fn is_random_accessible(&self) -> bool;

    fn dispose(&mut self);
}

/// Session the engine is serving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub id: u64,
    pub user: Option<String>,
}

/// Protocol request that triggered a hook, e.g. `STOR photo.jpg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: String,
    pub argument: Option<String>,
}

impl Request {
    pub fn new(command: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            argument: Some(argument.into()),
        }
    }
}

/// What the engine should do after a hook ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookResult {
    /// Continue with the engine's normal behavior.
    Default,
    /// Skip the engine's remaining handling of this request.
    Skip,
    /// Close the session.
    Disconnect,
}

/// Callbacks the engine invokes around transfers.
pub trait SessionHook: Send + Sync {
    /// Called once an upload has been fully written.
    fn on_upload_end(&self, session: &Session, request: &Request) -> HookResult {
        let _ = (session, request);
        HookResult::Default
    }
}
