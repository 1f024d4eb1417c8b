//! In-memory capability store.
//!
//! Used for scratch space and testing. All data is ephemeral.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use super::grants::{Access, GrantTable};
use super::{CapabilityStore, NodeKind, NodeMetadata, check_child_name, permission_denied};
use crate::uri::CapabilityUri;

/// Entry in the memory store.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, modified: SystemTime },
    Directory { modified: SystemTime },
}

type Entries = Arc<RwLock<HashMap<PathBuf, Entry>>>;

/// In-memory capability store keyed by absolute path.
///
/// The root directory `/` always exists. Grants work as in
/// [`LocalStore`](super::LocalStore).
#[derive(Debug)]
pub struct MemoryStore {
    entries: Entries,
    grants: GrantTable,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with no grants.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        // Root directory always exists
        entries.insert(
            PathBuf::from("/"),
            Entry::Directory {
                modified: SystemTime::now(),
            },
        );
        Self {
            entries: Arc::new(RwLock::new(entries)),
            grants: GrantTable::new(),
        }
    }

    /// Create an empty store with a single grant.
    pub fn with_grant(root: impl Into<PathBuf>, access: Access) -> Self {
        let store = Self::new();
        store.grants.grant(root, access);
        store
    }

    pub fn grants(&self) -> &GrantTable {
        &self.grants
    }

    /// Seed a directory and its parents, bypassing grants.
    pub fn seed_dir(&self, path: impl AsRef<Path>) {
        let mut entries = self.entries.write();
        let mut current = PathBuf::from("/");
        for component in path.as_ref().components() {
            if let std::path::Component::Normal(s) = component {
                current.push(s);
                entries.entry(current.clone()).or_insert(Entry::Directory {
                    modified: SystemTime::now(),
                });
            }
        }
    }

    /// Seed a file (and its parent directories), bypassing grants.
    pub fn seed_file(&self, path: impl AsRef<Path>, data: &[u8]) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.seed_dir(parent);
        }
        self.entries.write().insert(
            path.to_path_buf(),
            Entry::File {
                data: data.to_vec(),
                modified: SystemTime::now(),
            },
        );
    }

    fn readable_path(&self, uri: &CapabilityUri) -> io::Result<PathBuf> {
        let path = uri.to_path()?;
        if !self.grants.can_read(&path) {
            return Err(permission_denied("read", uri));
        }
        Ok(path)
    }

    fn writable_path(&self, uri: &CapabilityUri) -> io::Result<PathBuf> {
        let path = uri.to_path()?;
        if !self.grants.can_write(&path) {
            return Err(permission_denied("write", uri));
        }
        Ok(path)
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("not found: {}", path.display()),
        )
    }

    /// Check that `parent` is an existing, writable directory.
    fn writable_dir(&self, parent: &CapabilityUri) -> io::Result<PathBuf> {
        let dir = self.writable_path(parent)?;
        match self.entries.read().get(&dir) {
            Some(Entry::Directory { .. }) => Ok(dir),
            Some(Entry::File { .. }) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", dir.display()),
            )),
            None => Err(Self::not_found(&dir)),
        }
    }

    fn insert_new(&self, path: PathBuf, entry: Entry) -> io::Result<()> {
        let mut entries = self.entries.write();
        if entries.contains_key(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("already exists: {}", path.display()),
            ));
        }
        entries.insert(path, entry);
        Ok(())
    }
}

impl CapabilityStore for MemoryStore {
    fn exists(&self, uri: &CapabilityUri) -> bool {
        self.readable_path(uri)
            .map(|p| self.entries.read().contains_key(&p))
            .unwrap_or(false)
    }

    fn stat(&self, uri: &CapabilityUri) -> io::Result<NodeMetadata> {
        let path = self.readable_path(uri)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());

        match self.entries.read().get(&path) {
            Some(Entry::File { data, modified }) => Ok(NodeMetadata {
                name,
                kind: NodeKind::File,
                size: data.len() as u64,
                modified: Some(*modified),
            }),
            Some(Entry::Directory { modified }) => Ok(NodeMetadata {
                name,
                kind: NodeKind::Directory,
                size: 0,
                modified: Some(*modified),
            }),
            None => Err(Self::not_found(&path)),
        }
    }

    fn can_read(&self, uri: &CapabilityUri) -> bool {
        self.exists(uri)
    }

    fn can_write(&self, uri: &CapabilityUri) -> bool {
        self.writable_path(uri)
            .map(|p| self.entries.read().contains_key(&p))
            .unwrap_or(false)
    }

    fn list(&self, uri: &CapabilityUri) -> io::Result<Vec<CapabilityUri>> {
        let path = self.readable_path(uri)?;
        let entries = self.entries.read();

        match entries.get(&path) {
            Some(Entry::Directory { .. }) => {}
            Some(Entry::File { .. }) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {}", path.display()),
                ));
            }
            None => return Err(Self::not_found(&path)),
        }

        // Find all direct children
        let mut names: Vec<String> = entries
            .keys()
            .filter(|p| p.parent() == Some(path.as_path()))
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names.iter().map(|name| uri.join(name)).collect())
    }

    fn create_file(
        &self,
        parent: &CapabilityUri,
        mime_type: &str,
        name: &str,
    ) -> io::Result<CapabilityUri> {
        check_child_name(name)?;
        let dir = self.writable_dir(parent)?;
        let child = parent.join(name);
        tracing::trace!(uri = %child, mime_type, "create file");
        self.insert_new(
            dir.join(name),
            Entry::File {
                data: Vec::new(),
                modified: SystemTime::now(),
            },
        )?;
        Ok(child)
    }

    fn create_directory(&self, parent: &CapabilityUri, name: &str) -> io::Result<CapabilityUri> {
        check_child_name(name)?;
        let dir = self.writable_dir(parent)?;
        self.insert_new(
            dir.join(name),
            Entry::Directory {
                modified: SystemTime::now(),
            },
        )?;
        Ok(parent.join(name))
    }

    fn delete(&self, uri: &CapabilityUri) -> io::Result<()> {
        let path = self.writable_path(uri)?;
        if path == Path::new("/") {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot delete the root",
            ));
        }

        let mut entries = self.entries.write();
        match entries.get(&path) {
            Some(Entry::Directory { .. }) => {
                let has_children = entries.keys().any(|p| p.parent() == Some(path.as_path()));
                if has_children {
                    return Err(io::Error::new(
                        io::ErrorKind::DirectoryNotEmpty,
                        format!("directory not empty: {}", path.display()),
                    ));
                }
            }
            Some(Entry::File { .. }) => {}
            None => return Err(Self::not_found(&path)),
        }
        entries.remove(&path);
        Ok(())
    }

    fn open_read(&self, uri: &CapabilityUri) -> io::Result<Box<dyn Read + Send>> {
        let path = self.readable_path(uri)?;
        match self.entries.read().get(&path) {
            Some(Entry::File { data, .. }) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(Entry::Directory { .. }) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(Self::not_found(&path)),
        }
    }

    fn open_write(&self, uri: &CapabilityUri) -> io::Result<Box<dyn Write + Send>> {
        let path = self.writable_path(uri)?;
        {
            let entries = self.entries.read();
            if let Some(Entry::Directory { .. }) = entries.get(&path) {
                return Err(io::Error::new(
                    io::ErrorKind::IsADirectory,
                    format!("is a directory: {}", path.display()),
                ));
            }
            let parent_is_dir = path
                .parent()
                .is_some_and(|p| matches!(entries.get(p), Some(Entry::Directory { .. })));
            if !parent_is_dir {
                return Err(Self::not_found(&path));
            }
        }

        let mut writer = MemoryWriter {
            entries: Arc::clone(&self.entries),
            path,
            buf: Vec::new(),
        };
        // Truncate right away, like opening a file for writing would.
        writer.commit();
        Ok(Box::new(writer))
    }
}

/// Buffered writer that publishes its contents on flush and drop.
struct MemoryWriter {
    entries: Entries,
    path: PathBuf,
    buf: Vec<u8>,
}

impl MemoryWriter {
    fn commit(&mut self) {
        self.entries.write().insert(
            self.path.clone(),
            Entry::File {
                data: self.buf.clone(),
                modified: SystemTime::now(),
            },
        );
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit();
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.commit();
    }
}
