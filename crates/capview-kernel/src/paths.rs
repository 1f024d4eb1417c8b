//! Virtual path helpers.
//!
//! Virtual paths are `/`-separated absolute strings handed out to protocol
//! clients. None of these helpers touch the filesystem.

use std::path::{Component, Path};

pub const FILESYSTEM_ROOT: &str = "/";

pub const CURRENT_DIR: &str = "./";

/// Prefix a leading `/` if missing.
pub fn with_leading_slash(path: &str) -> String {
    if path.starts_with(FILESYSTEM_ROOT) {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Lexical segments of a virtual path, with `.` dropped and `..` resolved.
///
/// `..` never climbs above the root: `/../../etc` yields `["etc"]`.
pub fn confined_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments
}

/// Virtual path for a location relative to the confinement root.
/// An empty remainder is the root itself.
pub fn to_virtual(relative: &Path) -> String {
    let segments: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect();

    if segments.is_empty() {
        FILESYSTEM_ROOT.to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}
