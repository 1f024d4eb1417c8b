//! Backend tags and the listing records each backend hands over.

use serde::{Deserialize, Serialize};

use crate::permission::FilePermission;

/// Which storage system backs a [`UnifiedFile`](crate::UnifiedFile).
///
/// The declaration order is the wire tag (`Local` = 0 … `Sftp` = 3), so new
/// variants must only ever be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Plain local filesystem path.
    Local,
    /// Node of a capability-scoped, URI-addressed store.
    Capability,
    /// SMB share entry.
    Smb,
    /// SFTP listing entry.
    Sftp,
}

impl BackendKind {
    /// Short lowercase label, used in listings and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Capability => "capability",
            BackendKind::Smb => "smb",
            BackendKind::Sftp => "sftp",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live metadata read from a capability node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityAttributes {
    /// The node's capability URI, as a string.
    pub uri: String,
    pub name: String,
    pub is_directory: bool,
    /// Whether the store currently grants read access.
    pub can_read: bool,
    /// Whether the store currently grants write access.
    pub can_write: bool,
    /// Last modification, milliseconds since the Unix epoch.
    pub modified: i64,
    pub length: u64,
}

/// One entry of an SMB share listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbEntry {
    /// Full `smb://` path of the entry. Directories carry a trailing `/`.
    pub path: String,
    pub name: String,
    pub is_directory: bool,
    /// Last modification, milliseconds since the Unix epoch.
    pub modified: i64,
    pub length: u64,
}

/// Attributes reported by an SFTP server for one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SftpAttributes {
    pub size: u64,
    /// Last modification, seconds since the Unix epoch.
    pub mtime: i64,
    pub permissions: Vec<FilePermission>,
}

/// One entry of an SFTP directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SftpEntry {
    /// Entry name relative to the listed directory.
    pub name: String,
    pub attributes: SftpAttributes,
}
