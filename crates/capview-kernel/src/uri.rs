//! Capability URIs.
//!
//! A capability URI is the only handle the store accepts. URIs here are
//! hierarchical `file://` URLs whose path mirrors the local filesystem, so a
//! parent handle can be derived by dropping the last path segment.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::ViewError;

/// Addressable handle of one capability node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityUri(Url);

impl CapabilityUri {
    /// Build a URI for an absolute local path.
    pub fn from_path(path: &Path) -> Result<Self, ViewError> {
        Url::from_file_path(path)
            .map(Self)
            .map_err(|()| ViewError::MalformedUri(path.display().to_string()))
    }

    /// Parse a URI string. Only hierarchical `file` URLs are accepted.
    pub fn parse(uri: &str) -> Result<Self, ViewError> {
        let url = Url::parse(uri).map_err(|e| ViewError::MalformedUri(format!("{uri}: {e}")))?;
        if url.scheme() != "file" || url.cannot_be_a_base() {
            return Err(ViewError::MalformedUri(uri.to_string()));
        }
        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Local filesystem path this URI stands for.
    pub fn to_path(&self) -> io::Result<PathBuf> {
        self.0.to_file_path().map_err(|()| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a local capability uri: {}", self.0),
            )
        })
    }

    /// Decoded last path segment, `None` for the filesystem root.
    pub fn last_segment(&self) -> Option<String> {
        let path = self.to_path().ok()?;
        path.file_name().map(|n| n.to_string_lossy().into_owned())
    }

    /// Append one path segment (percent-encoded as needed).
    pub fn join(&self, segment: &str) -> CapabilityUri {
        let mut url = self.0.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(segment);
        }
        CapabilityUri(url)
    }

    /// Handle of the containing node.
    ///
    /// Drops the last segment and re-derives the handle from the local path
    /// of what remains. The root URI has no parent.
    pub fn parent(&self) -> Option<CapabilityUri> {
        self.last_segment()?;
        let mut url = self.0.clone();
        url.path_segments_mut().ok()?.pop_if_empty().pop();
        let parent = url.to_file_path().ok()?;
        CapabilityUri::from_path(&parent).ok()
    }
}

impl fmt::Display for CapabilityUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_is_malformed() {
        let err = CapabilityUri::from_path(Path::new("relative/dir")).unwrap_err();
        assert!(matches!(err, ViewError::MalformedUri(_)));
    }

    #[test]
    fn non_file_scheme_is_malformed() {
        assert!(CapabilityUri::parse("content://com.example/tree/1").is_err());
        assert!(CapabilityUri::parse("mailto:someone@example.com").is_err());
        assert!(CapabilityUri::parse("file:///sdcard/a.txt").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn join_encodes_and_decodes() {
        let root = CapabilityUri::from_path(Path::new("/sdcard")).unwrap();
        let child = root.join("my photo.jpg");
        assert_eq!(child.as_str(), "file:///sdcard/my%20photo.jpg");
        assert_eq!(child.last_segment().as_deref(), Some("my photo.jpg"));
        assert_eq!(child.to_path().unwrap(), PathBuf::from("/sdcard/my photo.jpg"));
    }

    #[cfg(unix)]
    #[test]
    fn parent_drops_last_segment() {
        let uri = CapabilityUri::from_path(Path::new("/sdcard/DCIM/a.jpg")).unwrap();
        let parent = uri.parent().unwrap();
        assert_eq!(parent.to_path().unwrap(), PathBuf::from("/sdcard/DCIM"));
        assert_eq!(parent.parent().unwrap().to_path().unwrap(), PathBuf::from("/sdcard"));
    }

    #[cfg(unix)]
    #[test]
    fn root_has_no_parent() {
        let root = CapabilityUri::from_path(Path::new("/")).unwrap();
        assert_eq!(root.last_segment(), None);
        assert_eq!(root.parent(), None);
    }
}
