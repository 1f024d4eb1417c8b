//! Binary layout of [`UnifiedFile`] for crossing process boundaries.
//!
//! Fields are written in a fixed order with bincode's default options
//! (little-endian, fixed-width integers):
//!
//! | # | field | encoding |
//! |---|-------|----------|
//! | 1 | backend kind | `u32` tag |
//! | 2 | path | `u64` length + UTF-8 |
//! | 3 | permission | `u8` presence + string |
//! | 4 | display name | `u8` presence + string |
//! | 5 | last modified | `i64` ms |
//! | 6 | size | `u64` |
//! | 7 | directory flag | `u8` |
//!
//! There is no version field. Reordering fields breaks every reader.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::BackendKind;
use crate::descriptor::UnifiedFile;

/// Failure to encode or decode a [`UnifiedFile`].
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encoding unified file: {0}")]
    Encode(#[source] bincode::Error),
    #[error("decoding unified file: {0}")]
    Decode(#[source] bincode::Error),
}

#[derive(Serialize, Deserialize)]
struct WireRecord {
    kind: BackendKind,
    path: String,
    permission: Option<String>,
    name: Option<String>,
    modified: i64,
    size: u64,
    is_directory: bool,
}

impl UnifiedFile {
    /// Encode this descriptor. The symlink target is not transported.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let record = WireRecord {
            kind: self.kind(),
            path: self.path().to_string(),
            permission: self.permission().map(str::to_string),
            name: self.display_name().map(str::to_string),
            modified: self.modified(),
            size: self.size(),
            is_directory: self.is_directory(),
        };
        bincode::serialize(&record).map_err(CodecError::Encode)
    }

    /// Decode a descriptor written by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let record: WireRecord = bincode::deserialize(bytes).map_err(CodecError::Decode)?;
        Ok(UnifiedFile::from_parts(
            record.kind,
            record.path,
            record.permission,
            record.name,
            record.modified,
            record.size,
            record.is_directory,
        ))
    }
}
