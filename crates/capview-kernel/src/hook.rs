//! Upload-completion hook.
//!
//! After an upload lands, the media index has to learn about the new file.
//! [`UploadHook`] turns the request argument back into a local path under
//! the confinement root and hands it to an [`IndexRefresher`].

use std::path::PathBuf;
use std::sync::Arc;

use capview_types::UnifiedFile;

use crate::engine::{HookResult, Request, Session, SessionHook};
use crate::paths;

/// Something that keeps an external index in step with the filesystem.
pub trait IndexRefresher: Send + Sync {
    fn refresh(&self, files: &[UnifiedFile]);
}

/// Refresher that only records refreshes in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingRefresher;

impl IndexRefresher for LoggingRefresher {
    fn refresh(&self, files: &[UnifiedFile]) {
        for file in files {
            tracing::info!(path = file.path(), "index refresh");
        }
    }
}

/// Session hook that refreshes the index for every completed upload.
pub struct UploadHook {
    root: PathBuf,
    refresher: Arc<dyn IndexRefresher>,
}

impl UploadHook {
    pub fn new(root: impl Into<PathBuf>, refresher: Arc<dyn IndexRefresher>) -> Self {
        Self {
            root: root.into(),
            refresher,
        }
    }

    /// Local path of an uploaded file, given the request argument.
    pub fn local_path(&self, argument: &str) -> PathBuf {
        let virtual_path = paths::with_leading_slash(argument);
        paths::confined_segments(&virtual_path)
            .into_iter()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl std::fmt::Debug for UploadHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadHook").field("root", &self.root).finish_non_exhaustive()
    }
}

impl SessionHook for UploadHook {
    fn on_upload_end(&self, session: &Session, request: &Request) -> HookResult {
        match request.argument.as_deref() {
            Some(argument) => {
                let path = self.local_path(argument);
                tracing::debug!(session = session.id, path = %path.display(), "upload finished");
                self.refresher
                    .refresh(&[UnifiedFile::local(path.to_string_lossy().into_owned())]);
            }
            None => {
                tracing::warn!(session = session.id, command = %request.command, "upload finished without an argument");
            }
        }
        HookResult::Default
    }
}
