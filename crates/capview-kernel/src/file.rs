//! Capability node adapter.
//!
//! A [`CapabilityFile`] binds one virtual path to one capability URI and
//! answers the engine's questions by asking the store, every time. Grants
//! can be revoked between two calls, so nothing is cached.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use capview_types::{CapabilityAttributes, UnifiedFile};

use crate::engine::FileHandle;
use crate::store::{CapabilityStore, NodeMetadata};
use crate::uri::CapabilityUri;

/// Content type used for write probes.
const PROBE_MIME_TYPE: &str = "application/octet-stream";

static PROBE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One entry of a [`CapabilityView`](crate::CapabilityView).
#[derive(Debug, Clone)]
pub struct CapabilityFile {
    absolute_path: String,
    uri: CapabilityUri,
    store: Arc<dyn CapabilityStore>,
}

impl CapabilityFile {
    pub(crate) fn new(
        store: Arc<dyn CapabilityStore>,
        absolute_path: impl Into<String>,
        uri: CapabilityUri,
    ) -> Self {
        Self {
            absolute_path: absolute_path.into(),
            uri,
            store,
        }
    }

    pub fn uri(&self) -> &CapabilityUri {
        &self.uri
    }

    /// Virtual path of this entry recombined from its name.
    ///
    /// Entries returned by [`list_files`](FileHandle::list_files) carry the
    /// listed directory's path as their absolute path; this joins that path
    /// with the entry's own name.
    pub fn entry_path(&self) -> String {
        let name = self.name();
        if self.absolute_path.ends_with('/') {
            format!("{}{}", self.absolute_path, name)
        } else {
            format!("{}/{}", self.absolute_path, name)
        }
    }

    /// Snapshot this node as a unified descriptor.
    pub fn to_unified(&self) -> UnifiedFile {
        let meta = self.stat();
        UnifiedFile::from_capability(CapabilityAttributes {
            uri: self.uri.to_string(),
            name: self.name(),
            is_directory: meta.as_ref().is_some_and(NodeMetadata::is_dir),
            can_read: self.is_readable(),
            can_write: self.store.can_write(&self.uri),
            modified: meta.as_ref().map_or(0, NodeMetadata::modified_millis),
            length: meta.as_ref().map_or(0, |m| m.size),
        })
    }

    fn stat(&self) -> Option<NodeMetadata> {
        self.store.stat(&self.uri).ok()
    }

    /// Write test for a target that does not exist yet.
    ///
    /// The store only answers grant questions for existing nodes, so try to
    /// create a placeholder next to the target and remove it again.
    fn probe_create(&self) -> bool {
        let Some(parent) = self.uri.parent() else {
            tracing::debug!(path = %self.absolute_path, "write probe: no parent");
            return false;
        };

        let probe_name = format!(
            ".capview-probe-{}-{}",
            std::process::id(),
            PROBE_COUNTER.fetch_add(1, Ordering::Relaxed)
        );

        match self.store.create_file(&parent, PROBE_MIME_TYPE, &probe_name) {
            Ok(placeholder) => {
                if let Err(e) = self.store.delete(&placeholder) {
                    tracing::warn!(uri = %placeholder, error = %e, "write probe left a placeholder behind");
                }
                tracing::debug!(path = %self.absolute_path, "write probe: writable");
                true
            }
            Err(e) => {
                tracing::debug!(path = %self.absolute_path, error = %e, "write probe: not writable");
                false
            }
        }
    }
}

impl FileHandle for CapabilityFile {
    type Physical = CapabilityUri;

    fn absolute_path(&self) -> &str {
        &self.absolute_path
    }

    fn name(&self) -> String {
        self.uri.last_segment().unwrap_or_else(|| "/".to_string())
    }

    // Dotfiles are not treated as hidden at this layer.
    fn is_hidden(&self) -> bool {
        false
    }

    fn is_directory(&self) -> bool {
        self.stat().is_some_and(|m| m.is_dir())
    }

    fn is_file(&self) -> bool {
        self.stat().is_some_and(|m| m.is_file())
    }

    fn does_exist(&self) -> bool {
        self.store.exists(&self.uri)
    }

    fn is_readable(&self) -> bool {
        self.store.can_read(&self.uri)
    }

    fn is_writable(&self) -> bool {
        if self.does_exist() {
            self.store.can_write(&self.uri)
        } else {
            self.probe_create()
        }
    }

    /// A write grant implies a delete grant.
    fn is_removable(&self) -> bool {
        self.store.can_write(&self.uri)
    }

    fn owner_name(&self) -> &str {
        "user"
    }

    fn group_name(&self) -> &str {
        "group"
    }

    /// The store has no hard links; report the conventional POSIX counts.
    fn link_count(&self) -> u32 {
        if self.is_directory() { 3 } else { 1 }
    }

    fn last_modified(&self) -> i64 {
        self.stat().map_or(0, |m| m.modified_millis())
    }

    fn set_last_modified(&self, _time: i64) -> bool {
        false
    }

    fn size(&self) -> u64 {
        self.stat().map_or(0, |m| m.size)
    }

    fn physical_file(&self) -> &CapabilityUri {
        &self.uri
    }

    fn mkdir(&self) -> bool {
        let (Some(parent), Some(name)) = (self.uri.parent(), self.uri.last_segment()) else {
            return false;
        };
        match self.store.create_directory(&parent, &name) {
            Ok(created) => self.store.exists(&created),
            Err(e) => {
                tracing::debug!(path = %self.absolute_path, error = %e, "mkdir failed");
                false
            }
        }
    }

    fn delete(&self) -> bool {
        match self.store.delete(&self.uri) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(path = %self.absolute_path, error = %e, "delete failed");
                false
            }
        }
    }

    /// Moves across capability nodes are not supported; copy and delete.
    fn move_to(&self, _destination: &Self) -> bool {
        false
    }

    fn list_files(&self) -> Option<Vec<Self>> {
        if !self.is_directory() {
            return None;
        }

        match self.store.list(&self.uri) {
            Ok(children) => Some(
                children
                    .into_iter()
                    .map(|uri| {
                        CapabilityFile::new(Arc::clone(&self.store), self.absolute_path.clone(), uri)
                    })
                    .collect(),
            ),
            Err(e) => {
                tracing::warn!(path = %self.absolute_path, error = %e, "listing failed");
                None
            }
        }
    }

    fn create_input_stream(&self, offset: u64) -> io::Result<Box<dyn Read + Send>> {
        let mut reader = self.store.open_read(&self.uri)?;
        if offset > 0 {
            // Not seekable: read past the skipped prefix.
            let skipped = io::copy(&mut reader.by_ref().take(offset), &mut io::sink())?;
            if skipped < offset {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("offset {offset} is past the end of {}", self.absolute_path),
                ));
            }
        }
        Ok(reader)
    }

    fn create_output_stream(&self, offset: u64) -> io::Result<Box<dyn Write + Send>> {
        if offset > 0 {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "capability storage does not support writing at an offset",
            ));
        }
        self.store.open_write(&self.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Access, MemoryStore};
    use std::path::Path;

    fn file(store: &Arc<MemoryStore>, virtual_path: &str, local: &str) -> CapabilityFile {
        let store: Arc<dyn CapabilityStore> = store.clone();
        CapabilityFile::new(
            store,
            virtual_path,
            CapabilityUri::from_path(Path::new(local)).unwrap(),
        )
    }

    fn sdcard() -> Arc<MemoryStore> {
        let store = MemoryStore::with_grant("/sdcard", Access::ReadWrite);
        store.seed_dir("/sdcard");
        Arc::new(store)
    }

    #[test]
    fn fixed_identities() {
        let store = sdcard();
        store.seed_file("/sdcard/a.txt", b"abc");
        let f = file(&store, "/a.txt", "/sdcard/a.txt");

        assert_eq!(f.owner_name(), "user");
        assert_eq!(f.group_name(), "group");
        assert_eq!(f.link_count(), 1);
        assert_eq!(file(&store, "/", "/sdcard").link_count(), 3);
    }

    #[test]
    fn metadata_is_live() {
        let store = sdcard();
        store.seed_file("/sdcard/a.txt", b"abc");
        let f = file(&store, "/a.txt", "/sdcard/a.txt");
        assert_eq!(f.size(), 3);

        store.seed_file("/sdcard/a.txt", b"abcdef");
        assert_eq!(f.size(), 6);
    }

    #[test]
    fn revocation_is_seen_by_next_query() {
        let store = sdcard();
        store.seed_file("/sdcard/a.txt", b"abc");
        let f = file(&store, "/a.txt", "/sdcard/a.txt");
        assert!(f.does_exist());
        assert!(f.is_writable());

        store.grants().grant("/sdcard", Access::ReadOnly);
        assert!(f.does_exist());
        assert!(!f.is_writable());
        assert!(!f.is_removable());

        store.grants().revoke(Path::new("/sdcard"));
        assert!(!f.does_exist());
        assert!(!f.is_readable());
        assert_eq!(f.size(), 0);
    }

    #[test]
    fn probe_under_writable_parent() {
        let store = sdcard();
        let parent = file(&store, "/", "/sdcard");
        let before: Vec<_> = parent.list_files().unwrap().iter().map(|c| c.name()).collect();

        let target = file(&store, "/new.bin", "/sdcard/new.bin");
        assert!(target.is_writable());
        assert!(!target.does_exist());

        let after: Vec<_> = parent.list_files().unwrap().iter().map(|c| c.name()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn probe_under_read_only_parent() {
        let store = Arc::new(MemoryStore::with_grant("/sdcard", Access::ReadOnly));
        store.seed_dir("/sdcard");
        let target = file(&store, "/new.bin", "/sdcard/new.bin");
        assert!(!target.is_writable());
    }

    #[test]
    fn probe_under_missing_parent() {
        let store = sdcard();
        let target = file(&store, "/nope/new.bin", "/sdcard/nope/new.bin");
        assert!(!target.is_writable());
    }

    #[test]
    fn hidden_is_always_false() {
        let store = sdcard();
        store.seed_file("/sdcard/.profile", b"");
        assert!(!file(&store, "/.profile", "/sdcard/.profile").is_hidden());
    }

    #[test]
    fn list_non_directory_is_none() {
        let store = sdcard();
        store.seed_file("/sdcard/a.txt", b"abc");
        assert!(file(&store, "/a.txt", "/sdcard/a.txt").list_files().is_none());
        assert!(file(&store, "/missing", "/sdcard/missing").list_files().is_none());
    }

    #[test]
    fn list_empty_directory_is_empty() {
        let store = sdcard();
        store.seed_dir("/sdcard/empty");
        let listing = file(&store, "/empty", "/sdcard/empty").list_files();
        assert_eq!(listing.map(|l| l.len()), Some(0));
    }

    #[test]
    fn children_inherit_parent_path() {
        let store = sdcard();
        store.seed_file("/sdcard/DCIM/a.jpg", b"");
        store.seed_file("/sdcard/DCIM/b.jpg", b"");

        let children = file(&store, "/DCIM", "/sdcard/DCIM").list_files().unwrap();
        assert_eq!(children.len(), 2);
        for child in &children {
            assert_eq!(child.absolute_path(), "/DCIM");
        }
        assert_eq!(children[0].entry_path(), "/DCIM/a.jpg");
        assert_eq!(children[1].entry_path(), "/DCIM/b.jpg");
    }

    #[test]
    fn mkdir_and_delete() {
        let store = sdcard();
        let dir = file(&store, "/Music", "/sdcard/Music");
        assert!(dir.mkdir());
        assert!(dir.is_directory());
        assert!(!dir.mkdir());
        assert!(dir.delete());
        assert!(!dir.does_exist());
    }

    #[test]
    fn unsupported_operations_fail() {
        let store = sdcard();
        store.seed_file("/sdcard/a.txt", b"abc");
        let a = file(&store, "/a.txt", "/sdcard/a.txt");
        let b = file(&store, "/b.txt", "/sdcard/b.txt");

        assert!(!a.set_last_modified(0));
        assert!(!a.move_to(&b));
        assert!(a.does_exist());
    }

    #[test]
    fn streams() {
        let store = sdcard();
        let f = file(&store, "/a.txt", "/sdcard/a.txt");

        let mut out = f.create_output_stream(0).unwrap();
        out.write_all(b"hello world").unwrap();
        drop(out);

        let mut tail = String::new();
        f.create_input_stream(6).unwrap().read_to_string(&mut tail).unwrap();
        assert_eq!(tail, "world");

        let err = f.create_output_stream(3).err().map(|e| e.kind());
        assert_eq!(err, Some(io::ErrorKind::Unsupported));
        let err = f.create_input_stream(100).err().map(|e| e.kind());
        assert_eq!(err, Some(io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn unified_snapshot() {
        let store = sdcard();
        store.seed_file("/sdcard/DCIM/a.jpg", b"12345");

        let unified = file(&store, "/DCIM/a.jpg", "/sdcard/DCIM/a.jpg").to_unified();
        assert_eq!(unified.path(), "file:///sdcard/DCIM/a.jpg");
        assert_eq!(unified.name(), "a.jpg");
        assert_eq!(unified.size(), 5);
        assert_eq!(unified.permission(), Some("rwx"));

        let dir = file(&store, "/DCIM", "/sdcard/DCIM").to_unified();
        assert!(dir.is_directory());
        assert_eq!(dir.size(), 0);
    }
}
