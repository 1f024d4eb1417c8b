//! The confined filesystem view.
//!
//! Protocol clients address files by virtual absolute paths such as
//! `/DCIM/Camera/a.jpg`. The view maps those onto capability URIs below a
//! confinement root:
//!
//! ```text
//! virtual /DCIM/a.jpg  ──▶  root /storage/emulated/0 + /DCIM/a.jpg
//!                      ──▶  file:///storage/emulated/0/DCIM/a.jpg
//! ```
//!
//! Resolution is lexical and never leaves the root. Only changing directory
//! touches the filesystem, to canonicalize the target.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engine::FileSystemView;
use crate::error::ViewError;
use crate::file::CapabilityFile;
use crate::paths::{self, CURRENT_DIR, FILESYSTEM_ROOT};
use crate::store::CapabilityStore;
use crate::uri::CapabilityUri;

/// One session's view of a capability store.
#[derive(Debug)]
pub struct CapabilityView {
    store: Arc<dyn CapabilityStore>,
    root: PathBuf,
    canonical_root: PathBuf,
    root_uri: CapabilityUri,
    current_dir: String,
}

impl CapabilityView {
    /// Create a view confined to `root`, starting at `/`.
    pub fn new(store: Arc<dyn CapabilityStore>, root: impl Into<PathBuf>) -> Result<Self, ViewError> {
        let root = root.into();
        if !root.is_absolute() {
            return Err(ViewError::RootNotAbsolute(root));
        }
        let root_uri = CapabilityUri::from_path(&root)?;
        let canonical_root = root.canonicalize().unwrap_or_else(|_| root.clone());

        Ok(Self {
            store,
            root,
            canonical_root,
            root_uri,
            current_dir: FILESYSTEM_ROOT.to_string(),
        })
    }

    /// The confinement root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &Arc<dyn CapabilityStore> {
        &self.store
    }

    /// Current working directory as a virtual path.
    pub fn current_dir(&self) -> &str {
        &self.current_dir
    }

    fn file_for(&self, virtual_path: String) -> CapabilityFile {
        let uri = paths::confined_segments(&virtual_path)
            .into_iter()
            .fold(self.root_uri.clone(), |uri, segment| uri.join(segment));
        CapabilityFile::new(Arc::clone(&self.store), virtual_path, uri)
    }
}

impl FileSystemView for CapabilityView {
    type File = CapabilityFile;

    /// There are no per-user homes; home is the root.
    fn home_directory(&self) -> CapabilityFile {
        self.file_for(FILESYSTEM_ROOT.to_string())
    }

    fn working_directory(&self) -> CapabilityFile {
        self.get_file(&self.current_dir)
    }

    fn change_working_directory(&mut self, dir: &str) -> bool {
        if dir == FILESYSTEM_ROOT {
            self.current_dir = FILESYSTEM_ROOT.to_string();
            return true;
        }

        let base = if dir.starts_with(FILESYSTEM_ROOT) {
            self.root.clone()
        } else {
            self.root.join(self.current_dir.trim_start_matches('/'))
        };
        let target = base.join(dir.trim_start_matches('/'));

        let canonical = match target.canonicalize() {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!(dir, error = %e, "cwd: cannot resolve");
                return false;
            }
        };

        match canonical.strip_prefix(&self.canonical_root) {
            Ok(relative) => self.current_dir = paths::to_virtual(relative),
            Err(_) => {
                tracing::debug!(dir, resolved = %canonical.display(), "cwd: escapes root, clamping to /");
                self.current_dir = FILESYSTEM_ROOT.to_string();
            }
        }
        true
    }

    fn get_file(&self, file: &str) -> CapabilityFile {
        match file {
            FILESYSTEM_ROOT => self.file_for(FILESYSTEM_ROOT.to_string()),
            CURRENT_DIR => self.file_for(self.current_dir.clone()),
            _ => self.file_for(paths::with_leading_slash(file)),
        }
    }

    fn is_random_accessible(&self) -> bool {
        false
    }

    fn dispose(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FileHandle;
    use crate::store::{Access, LocalStore};
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (CapabilityView, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalStore::with_grant(dir.path(), Access::ReadWrite));
        let view = CapabilityView::new(store, dir.path()).unwrap();
        (view, dir)
    }

    #[test]
    fn relative_root_is_rejected() {
        let store = Arc::new(LocalStore::new());
        let err = CapabilityView::new(store, "relative/root").unwrap_err();
        assert!(matches!(err, ViewError::RootNotAbsolute(_)));
    }

    #[test]
    fn starts_at_root() {
        let (view, _dir) = setup();
        assert_eq!(view.working_directory().absolute_path(), "/");
        assert_eq!(view.home_directory().absolute_path(), "/");
        assert!(!view.is_random_accessible());
    }

    #[test]
    fn sentinels() {
        let (mut view, dir) = setup();
        fs::create_dir(dir.path().join("DCIM")).unwrap();
        assert!(view.change_working_directory("/DCIM"));

        assert_eq!(view.get_file("/").absolute_path(), "/");
        assert_eq!(view.get_file("./").absolute_path(), "/DCIM");
        assert_eq!(view.get_file("a.txt").absolute_path(), "/a.txt");
    }

    #[test]
    fn get_file_does_not_check_existence() {
        let (view, _dir) = setup();
        let file = view.get_file("/nope/never.txt");
        assert_eq!(file.absolute_path(), "/nope/never.txt");
        assert!(!file.does_exist());
    }

    #[test]
    fn get_file_stays_inside_root() {
        let (view, dir) = setup();
        let file = view.get_file("/../../etc/passwd");
        assert_eq!(file.absolute_path(), "/../../etc/passwd");
        let backing = file.uri().to_path().unwrap();
        assert!(backing.starts_with(dir.path()), "{} escaped", backing.display());
    }

    #[test]
    fn relative_cd() {
        let (mut view, dir) = setup();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();

        assert!(view.change_working_directory("a"));
        assert!(view.change_working_directory("b"));
        assert_eq!(view.current_dir(), "/a/b");
        assert!(view.change_working_directory(".."));
        assert_eq!(view.current_dir(), "/a");
    }

    #[test]
    fn cd_to_root_of_root_is_root() {
        let (mut view, dir) = setup();
        fs::create_dir(dir.path().join("a")).unwrap();
        assert!(view.change_working_directory("/a"));
        assert!(view.change_working_directory(".."));
        assert_eq!(view.current_dir(), "/");
    }

    #[test]
    fn dispose_is_harmless() {
        let (mut view, _dir) = setup();
        view.dispose();
        assert_eq!(view.working_directory().absolute_path(), "/");
    }

    proptest! {
        #[test]
        fn get_file_adds_leading_slash(path in "[a-zA-Z0-9_./]{0,24}") {
            prop_assume!(path != "/" && path != "./");
            let store = Arc::new(LocalStore::new());
            let view = CapabilityView::new(store, "/nonexistent-root").unwrap();

            let expected = if path.starts_with('/') { path.clone() } else { format!("/{path}") };
            let file = view.get_file(&path);
            prop_assert_eq!(file.absolute_path(), expected.as_str());
        }
    }
}
