//! The unifying file descriptor.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::backend::{BackendKind, CapabilityAttributes, SftpEntry, SmbEntry};
use crate::permission::FilePermission;

/// One file, described uniformly across backends.
///
/// A descriptor is built once from a backend listing or stat call, may be
/// filled in further through the setters, and is then handed to readers.
///
/// Equality and hashing look at [`path`](Self::path) only. Two descriptors
/// for the same path with different sizes or dates are the same file, which
/// is what callers deduplicating listings in sets and maps rely on.
#[derive(Debug, Clone)]
pub struct UnifiedFile {
    kind: BackendKind,
    path: String,
    name: Option<String>,
    modified: i64,
    size: u64,
    is_directory: bool,
    permission: Option<String>,
    link: String,
}

impl UnifiedFile {
    /// A bare local path. Metadata is left at its defaults.
    pub fn local(path: impl Into<String>) -> Self {
        Self::bare(BackendKind::Local, path.into())
    }

    /// A local path with metadata the caller already knows.
    pub fn with_metadata(
        path: impl Into<String>,
        permission: impl Into<String>,
        modified: i64,
        size: u64,
        is_directory: bool,
    ) -> Self {
        let mut file = Self::local(path);
        file.permission = Some(permission.into());
        file.modified = modified;
        file.size = size;
        file.is_directory = is_directory;
        file
    }

    /// A capability node. The permission string reflects the grants held
    /// when the attributes were read.
    pub fn from_capability(attrs: CapabilityAttributes) -> Self {
        let mut file = Self::bare(BackendKind::Capability, attrs.uri);
        file.set_name(attrs.name);
        file.set_directory(attrs.is_directory);
        file.set_permission(grant_permission(attrs.can_read, attrs.can_write));
        file.set_modified(attrs.modified);
        file.set_size(if attrs.is_directory { 0 } else { attrs.length });
        file
    }

    /// An SMB share entry.
    pub fn from_smb(entry: SmbEntry) -> Self {
        let mut file = Self::bare(BackendKind::Smb, entry.path);
        file.set_name(entry.name);
        file.set_directory(entry.is_directory);
        file.set_modified(entry.modified);
        file.set_size(if entry.is_directory { 0 } else { entry.length });
        file
    }

    /// An SFTP listing entry found under `parent`.
    pub fn from_sftp(parent: &str, is_directory: bool, entry: SftpEntry) -> Self {
        let mut file = Self::bare(BackendKind::Sftp, format!("{}/{}", parent, entry.name));
        let attrs = entry.attributes;
        file.set_directory(is_directory);
        file.set_modified(attrs.mtime.saturating_mul(1000));
        file.set_size(if is_directory { 0 } else { attrs.size });
        file.set_permission(format!("{:o}", FilePermission::to_mask(&attrs.permissions)));
        file.set_name(entry.name);
        file
    }

    fn bare(kind: BackendKind, path: String) -> Self {
        Self {
            kind,
            path,
            name: None,
            modified: 0,
            size: 0,
            is_directory: false,
            permission: None,
            link: String::new(),
        }
    }

    pub(crate) fn from_parts(
        kind: BackendKind,
        path: String,
        permission: Option<String>,
        name: Option<String>,
        modified: i64,
        size: u64,
        is_directory: bool,
    ) -> Self {
        Self {
            kind,
            path,
            name,
            modified,
            size,
            is_directory,
            permission,
            link: String::new(),
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Display name: the explicitly set name if non-empty, otherwise the last
    /// segment of the path.
    pub fn name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => derived_name(&self.path),
        }
    }

    /// The explicitly set display name, without the path fallback.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Dotfile convention: hidden when the name starts with `.`.
    pub fn is_hidden(&self) -> bool {
        self.name().starts_with('.')
    }

    /// Last modification, milliseconds since the Unix epoch.
    pub fn modified(&self) -> i64 {
        self.modified
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    /// Symlink target, empty when the entry is not a link.
    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn set_link(&mut self, link: impl Into<String>) {
        self.link = link.into();
    }

    pub fn set_modified(&mut self, modified: i64) {
        self.modified = modified;
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub fn set_permission(&mut self, permission: impl Into<String>) {
        self.permission = Some(permission.into());
    }

    pub fn set_directory(&mut self, is_directory: bool) {
        self.is_directory = is_directory;
    }
}

impl PartialEq for UnifiedFile {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for UnifiedFile {}

impl Hash for UnifiedFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for UnifiedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UnifiedFile, path=[{}], name=[{}], size=[{}], date=[{}], permission=[{}]",
            self.path,
            self.name.as_deref().unwrap_or(""),
            self.size,
            self.modified,
            self.permission.as_deref().unwrap_or(""),
        )
    }
}

/// Permission string for a capability node: `r` when readable, `wx` when
/// writable (a write grant also allows entering and creating).
fn grant_permission(can_read: bool, can_write: bool) -> String {
    let mut per = String::with_capacity(3);
    if can_read {
        per.push('r');
    }
    if can_write {
        per.push_str("wx");
    }
    per
}

fn derived_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}
