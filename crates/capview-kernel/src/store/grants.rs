//! Per-subtree access grants.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;

/// Level of access a grant confers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Access to one subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub root: PathBuf,
    pub access: Access,
}

/// Revocable grants, consulted on every store call.
///
/// The most specific (longest) covering grant decides, so a read-only grant
/// on `/sdcard/Android` carves an exception out of a read-write grant on
/// `/sdcard`.
#[derive(Debug, Default)]
pub struct GrantTable {
    grants: RwLock<Vec<Grant>>,
}

impl GrantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant access to a subtree, replacing any grant on the same root.
    pub fn grant(&self, root: impl Into<PathBuf>, access: Access) {
        let root = root.into();
        let mut grants = self.grants.write();
        grants.retain(|g| g.root != root);
        tracing::debug!(root = %root.display(), ?access, "grant");
        grants.push(Grant { root, access });
    }

    /// Revoke the grant on exactly `root`. Returns false if there was none.
    pub fn revoke(&self, root: &Path) -> bool {
        let mut grants = self.grants.write();
        let before = grants.len();
        grants.retain(|g| g.root != root);
        let revoked = grants.len() != before;
        if revoked {
            tracing::debug!(root = %root.display(), "revoke");
        }
        revoked
    }

    /// Access currently held for `path`, if any grant covers it.
    pub fn access_for(&self, path: &Path) -> Option<Access> {
        self.grants
            .read()
            .iter()
            .filter(|g| path.starts_with(&g.root))
            .max_by_key(|g| g.root.components().count())
            .map(|g| g.access)
    }

    pub fn can_read(&self, path: &Path) -> bool {
        self.access_for(path).is_some()
    }

    pub fn can_write(&self, path: &Path) -> bool {
        self.access_for(path) == Some(Access::ReadWrite)
    }

    /// Snapshot of the current grants.
    pub fn grants(&self) -> Vec<Grant> {
        self.grants.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_grant_no_access() {
        let table = GrantTable::new();
        assert_eq!(table.access_for(Path::new("/sdcard/a")), None);
    }

    #[test]
    fn grant_covers_subtree_only() {
        let table = GrantTable::new();
        table.grant("/sdcard/DCIM", Access::ReadWrite);

        assert!(table.can_write(Path::new("/sdcard/DCIM")));
        assert!(table.can_write(Path::new("/sdcard/DCIM/2024/a.jpg")));
        assert!(!table.can_read(Path::new("/sdcard")));
        // component-wise: a sibling with a common string prefix is not covered
        assert!(!table.can_read(Path::new("/sdcard/DCIMX")));
    }

    #[test]
    fn most_specific_grant_wins() {
        let table = GrantTable::new();
        table.grant("/sdcard", Access::ReadWrite);
        table.grant("/sdcard/Android", Access::ReadOnly);

        assert!(table.can_write(Path::new("/sdcard/Music/song.mp3")));
        assert!(table.can_read(Path::new("/sdcard/Android/data")));
        assert!(!table.can_write(Path::new("/sdcard/Android/data")));
    }

    #[test]
    fn revoke_takes_effect_immediately() {
        let table = GrantTable::new();
        table.grant("/sdcard", Access::ReadWrite);
        assert!(table.can_read(Path::new("/sdcard/x")));

        assert!(table.revoke(Path::new("/sdcard")));
        assert!(!table.can_read(Path::new("/sdcard/x")));
        assert!(!table.revoke(Path::new("/sdcard")));
    }

    #[test]
    fn regrant_replaces() {
        let table = GrantTable::new();
        table.grant("/sdcard", Access::ReadWrite);
        table.grant("/sdcard", Access::ReadOnly);
        assert_eq!(table.grants().len(), 1);
        assert!(!table.can_write(Path::new("/sdcard/x")));
    }
}
