//! capview-types: pure data types shared across capview crates.
//!
//! This crate holds the unifying file descriptor, [`UnifiedFile`], which
//! describes one logical file regardless of which storage system backs it:
//!
//! - **Local**: a plain filesystem path
//! - **Capability**: a node of a capability-scoped, URI-addressed store
//! - **Smb**: an entry from an SMB share listing
//! - **Sftp**: an entry from an SFTP directory listing
//!
//! Descriptors can be moved across process boundaries with
//! [`UnifiedFile::to_bytes`] and [`UnifiedFile::from_bytes`]. No I/O happens
//! here; backend listings are handed in as plain records.

mod backend;
mod codec;
mod descriptor;
mod permission;

pub use backend::{BackendKind, CapabilityAttributes, SftpAttributes, SftpEntry, SmbEntry};
pub use codec::CodecError;
pub use descriptor::UnifiedFile;
pub use permission::FilePermission;
