//! Construction-time errors.
//!
//! Runtime queries never surface these: not-found and permission-denied are
//! reported as `false` / `None` by the view and its file handles.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    /// The confinement root must be an absolute local path.
    #[error("confinement root must be absolute: {}", .0.display())]
    RootNotAbsolute(PathBuf),

    /// The value cannot be used as a hierarchical `file://` capability URI.
    #[error("malformed capability uri: {0}")]
    MalformedUri(String),
}
