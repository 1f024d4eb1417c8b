//! Capability stores.
//!
//! A capability store answers every question about a node by URI, and only
//! for nodes covered by a live grant:
//!
//! - **LocalStore**: real filesystem behind a grant table
//! - **MemoryStore**: in-memory ephemeral storage (tests, scratch)
//!
//! # Design
//!
//! Grants are per subtree and can be revoked at any time, so nothing above
//! the store caches metadata. Every adapter query is a fresh store call.
//!
//! ```text
//! CapabilityView ──get_file──▶ CapabilityFile ──uri──▶ dyn CapabilityStore
//!                                                         └── GrantTable
//! ```

mod grants;
mod local;
mod memory;

pub use grants::{Access, Grant, GrantTable};
pub use local::LocalStore;
pub use memory::MemoryStore;

use std::fmt;
use std::io::{self, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::uri::CapabilityUri;

/// Kind of capability node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// Metadata of one node, as reported by the store at call time.
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    /// Name of the node (not full path). `/` for the root.
    pub name: String,
    pub kind: NodeKind,
    /// Length in bytes as reported by the store, directories included.
    pub size: u64,
    /// Last modification time, if available.
    pub modified: Option<SystemTime>,
}

impl NodeMetadata {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    /// Last modification in milliseconds since the Unix epoch, 0 if unknown.
    pub fn modified_millis(&self) -> i64 {
        self.modified
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// Abstract capability-scoped storage.
///
/// Calls block until the underlying I/O completes. Implementations must be
/// shareable across sessions; each session holds its own view but all of
/// them may point at one store.
pub trait CapabilityStore: Send + Sync + fmt::Debug {
    /// Whether the node exists and is visible under a current grant.
    fn exists(&self, uri: &CapabilityUri) -> bool;

    /// Get metadata for a node.
    fn stat(&self, uri: &CapabilityUri) -> io::Result<NodeMetadata>;

    /// Whether a read grant currently covers an existing node.
    fn can_read(&self, uri: &CapabilityUri) -> bool;

    /// Whether a write grant currently covers an existing node.
    fn can_write(&self, uri: &CapabilityUri) -> bool;

    /// Immediate children of a directory, sorted by name.
    fn list(&self, uri: &CapabilityUri) -> io::Result<Vec<CapabilityUri>>;

    /// Create an empty file named `name` under `parent`.
    ///
    /// Fails if an entry with that name already exists or if the parent is
    /// not writable.
    fn create_file(
        &self,
        parent: &CapabilityUri,
        mime_type: &str,
        name: &str,
    ) -> io::Result<CapabilityUri>;

    /// Create a directory named `name` under `parent`.
    fn create_directory(&self, parent: &CapabilityUri, name: &str) -> io::Result<CapabilityUri>;

    /// Remove a file or empty directory.
    fn delete(&self, uri: &CapabilityUri) -> io::Result<()>;

    /// Open a node for sequential reading.
    fn open_read(&self, uri: &CapabilityUri) -> io::Result<Box<dyn Read + Send>>;

    /// Open a node for writing, creating or truncating it.
    fn open_write(&self, uri: &CapabilityUri) -> io::Result<Box<dyn Write + Send>>;
}

/// Reject names that would address anything other than a direct child.
pub(crate) fn check_child_name(name: &str) -> io::Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid entry name: {name:?}"),
        ));
    }
    Ok(())
}

pub(crate) fn permission_denied(what: &str, uri: &CapabilityUri) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("no {what} grant covers {uri}"),
    )
}
