//! Local filesystem capability store.
//!
//! Nodes are real files and directories, but a node is only reachable while
//! a grant covers it.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use super::grants::{Access, GrantTable};
use super::{CapabilityStore, NodeKind, NodeMetadata, check_child_name, permission_denied};
use crate::uri::CapabilityUri;

/// Capability store over the real filesystem.
///
/// Reading needs any covering grant. Writing needs a read-write grant and a
/// target the OS does not mark read-only.
#[derive(Debug, Default)]
pub struct LocalStore {
    grants: GrantTable,
}

impl LocalStore {
    /// Create a store with no grants. Nothing is reachable until granted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a single grant.
    pub fn with_grant(root: impl Into<PathBuf>, access: Access) -> Self {
        let store = Self::new();
        store.grants.grant(root, access);
        store
    }

    /// The grant table, for granting and revoking at runtime.
    pub fn grants(&self) -> &GrantTable {
        &self.grants
    }

    fn readable_path(&self, uri: &CapabilityUri) -> io::Result<PathBuf> {
        let path = resolve(&uri.to_path()?, true)?;
        if self.access_for(&path).is_none() {
            return Err(permission_denied("read", uri));
        }
        Ok(path)
    }

    fn writable_path(&self, uri: &CapabilityUri) -> io::Result<PathBuf> {
        self.writable(uri, true)
    }

    /// Like `writable_path`, but a symlink in the last component is the
    /// node itself rather than its target.
    fn writable_link_path(&self, uri: &CapabilityUri) -> io::Result<PathBuf> {
        self.writable(uri, false)
    }

    fn writable(&self, uri: &CapabilityUri, follow: bool) -> io::Result<PathBuf> {
        let path = resolve(&uri.to_path()?, follow)?;
        if self.access_for(&path) != Some(Access::ReadWrite) {
            return Err(permission_denied("write", uri));
        }
        Ok(path)
    }

    /// Longest grant covering a resolved path. Grant roots are compared in
    /// canonical form so a symlinked root still matches.
    fn access_for(&self, resolved: &Path) -> Option<Access> {
        self.grants
            .grants()
            .into_iter()
            .filter_map(|grant| {
                let root = grant.root.canonicalize().unwrap_or(grant.root);
                resolved
                    .starts_with(&root)
                    .then_some((root.components().count(), grant.access))
            })
            .max_by_key(|(depth, _)| *depth)
            .map(|(_, access)| access)
    }

    fn node_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string())
    }
}

/// Resolve symlinks so grants are checked against where the OS will
/// actually go.
///
/// Existing paths are canonicalized. A missing path gets its parent
/// canonicalized and the file name appended. With `follow` unset, only the
/// parent is resolved and the last component is kept as is.
fn resolve(path: &Path, follow: bool) -> io::Result<PathBuf> {
    let exists = fs::symlink_metadata(path).is_ok();
    if exists && follow {
        // A dangling symlink fails here instead of being created through.
        return path.canonicalize();
    }

    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        // Filesystem root.
        return Ok(path.to_path_buf());
    };
    match parent.canonicalize() {
        Ok(parent) => Ok(parent.join(name)),
        // Parent missing: the fs call itself will fail.
        Err(_) => Ok(path.to_path_buf()),
    }
}

impl CapabilityStore for LocalStore {
    fn exists(&self, uri: &CapabilityUri) -> bool {
        self.readable_path(uri).is_ok_and(|p| p.exists())
    }

    fn stat(&self, uri: &CapabilityUri) -> io::Result<NodeMetadata> {
        let path = self.readable_path(uri)?;
        // stat follows symlinks
        let meta = fs::metadata(&path)?;

        // Special files (sockets, pipes, devices) are reported as files.
        let kind = if meta.is_dir() {
            NodeKind::Directory
        } else {
            NodeKind::File
        };

        Ok(NodeMetadata {
            name: Self::node_name(&path),
            kind,
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    fn can_read(&self, uri: &CapabilityUri) -> bool {
        self.readable_path(uri).and_then(fs::metadata).is_ok()
    }

    fn can_write(&self, uri: &CapabilityUri) -> bool {
        self.writable_path(uri)
            .and_then(fs::metadata)
            .map(|meta| !meta.permissions().readonly())
            .unwrap_or(false)
    }

    fn list(&self, uri: &CapabilityUri) -> io::Result<Vec<CapabilityUri>> {
        let path = self.readable_path(uri)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&path)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
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
        let dir = self.writable_path(parent)?;
        let child = parent.join(name);
        tracing::trace!(uri = %child, mime_type, "create file");
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(name))?;
        Ok(child)
    }

    fn create_directory(&self, parent: &CapabilityUri, name: &str) -> io::Result<CapabilityUri> {
        check_child_name(name)?;
        let dir = self.writable_path(parent)?;
        fs::create_dir(dir.join(name))?;
        Ok(parent.join(name))
    }

    fn delete(&self, uri: &CapabilityUri) -> io::Result<()> {
        let path = self.writable_link_path(uri)?;
        let meta = fs::symlink_metadata(&path)?;

        if meta.is_dir() {
            fs::remove_dir(&path)
        } else {
            fs::remove_file(&path)
        }
    }

    fn open_read(&self, uri: &CapabilityUri) -> io::Result<Box<dyn Read + Send>> {
        let path = self.readable_path(uri)?;
        Ok(Box::new(File::open(path)?))
    }

    fn open_write(&self, uri: &CapabilityUri) -> io::Result<Box<dyn Write + Send>> {
        let path = self.writable_path(uri)?;
        Ok(Box::new(File::create(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(access: Access) -> (LocalStore, TempDir, CapabilityUri) {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::with_grant(dir.path(), access);
        let root = CapabilityUri::from_path(dir.path()).unwrap();
        (store, dir, root)
    }

    #[test]
    fn test_create_and_stat() {
        let (store, _dir, root) = setup(Access::ReadWrite);

        let file = store.create_file(&root, "text/plain", "a.txt").unwrap();
        let meta = store.stat(&file).unwrap();
        assert!(meta.is_file());
        assert_eq!(meta.size, 0);
        assert_eq!(meta.name, "a.txt");
    }

    #[test]
    fn test_create_file_refuses_existing() {
        let (store, _dir, root) = setup(Access::ReadWrite);

        store.create_file(&root, "text/plain", "a.txt").unwrap();
        let err = store.create_file(&root, "text/plain", "a.txt").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_write_then_read() {
        let (store, _dir, root) = setup(Access::ReadWrite);
        let uri = root.join("hello.txt");

        let mut out = store.open_write(&uri).unwrap();
        out.write_all(b"hello").unwrap();
        drop(out);

        let mut data = String::new();
        store.open_read(&uri).unwrap().read_to_string(&mut data).unwrap();
        assert_eq!(data, "hello");
    }

    #[test]
    fn test_list_sorted() {
        let (store, dir, root) = setup(Access::ReadWrite);
        fs::write(dir.path().join("b.txt"), b"b").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let names: Vec<_> = store
            .list(&root)
            .unwrap()
            .iter()
            .filter_map(CapabilityUri::last_segment)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
    }

    #[test]
    fn test_read_only_grant() {
        let (store, dir, root) = setup(Access::ReadOnly);
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let file = root.join("a.txt");

        assert!(store.can_read(&file));
        assert!(!store.can_write(&file));

        let err = store.create_file(&root, "text/plain", "b.txt").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        let err = store.delete(&file).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_revoked_node_is_invisible() {
        let (store, dir, root) = setup(Access::ReadWrite);
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let file = root.join("a.txt");
        assert!(store.exists(&file));

        store.grants().revoke(dir.path());
        assert!(!store.exists(&file));
        assert!(!store.can_read(&file));
        assert_eq!(
            store.stat(&file).unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_invalid_child_name() {
        let (store, _dir, root) = setup(Access::ReadWrite);
        for name in ["", ".", "..", "a/b"] {
            let err = store.create_directory(&root, name).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "name {name:?}");
        }
    }

    #[test]
    fn test_delete_directory() {
        let (store, _dir, root) = setup(Access::ReadWrite);
        let sub = store.create_directory(&root, "sub").unwrap();
        assert!(store.stat(&sub).unwrap().is_dir());

        store.delete(&sub).unwrap();
        assert!(!store.exists(&sub));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_out_of_grant_is_denied() {
        let (store, dir, root) = setup(Access::ReadWrite);
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), b"secret").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let secret = root.join("link").join("secret.txt");
        assert!(!store.exists(&secret));
        assert!(!store.can_read(&secret));
        let err = store.open_read(&secret).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

        let planted = root.join("link").join("planted.txt");
        let err = store.open_write(&planted).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        let err = store.create_file(&root.join("link"), "text/plain", "x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(!outside.path().join("planted.txt").exists());
        assert!(!outside.path().join("x").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_not_written_through() {
        let (store, dir, root) = setup(Access::ReadWrite);
        let outside = TempDir::new().unwrap();
        let target = outside.path().join("created.txt");
        std::os::unix::fs::symlink(&target, dir.path().join("dangling")).unwrap();

        assert!(store.open_write(&root.join("dangling")).is_err());
        assert!(!target.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_grant_is_followed() {
        let (store, dir, root) = setup(Access::ReadWrite);
        fs::create_dir(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real/a.txt"), b"a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

        let mut data = String::new();
        store.open_read(&root.join("alias").join("a.txt")).unwrap().read_to_string(&mut data).unwrap();
        assert_eq!(data, "a");
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_removes_link_not_target() {
        let (store, dir, root) = setup(Access::ReadWrite);
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("a.txt"), dir.path().join("ln")).unwrap();

        store.delete(&root.join("ln")).unwrap();
        assert!(fs::symlink_metadata(dir.path().join("ln")).is_err());
        assert!(dir.path().join("a.txt").exists());
    }
}
