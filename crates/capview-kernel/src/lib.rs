//! capview-kernel: a confined virtual-path view over capability storage.
//!
//! This crate provides:
//!
//! - **Stores**: the [`CapabilityStore`] trait with local and in-memory
//!   backends, gated by revocable per-subtree grants
//! - **Adapter**: [`CapabilityFile`], which answers protocol queries for one
//!   node by probing the store, including the probe-create write test
//! - **View**: [`CapabilityView`], mapping virtual absolute paths to
//!   capability URIs under a confinement root and tracking the session's
//!   working directory
//! - **Hook**: [`UploadHook`], refreshing an external index after uploads
//!
//! The protocol engine itself lives elsewhere and talks to this crate
//! through the [`FileSystemView`], [`FileHandle`] and [`SessionHook`]
//! contracts.

pub mod engine;
pub mod paths;
pub mod store;

mod error;
mod file;
mod hook;
mod uri;
mod view;

pub use engine::{FileHandle, FileSystemView, HookResult, Request, Session, SessionHook};
pub use error::ViewError;
pub use file::CapabilityFile;
pub use hook::{IndexRefresher, LoggingRefresher, UploadHook};
pub use store::{Access, CapabilityStore, GrantTable, LocalStore, MemoryStore, NodeKind, NodeMetadata};
pub use uri::CapabilityUri;
pub use view::CapabilityView;

pub use capview_types::UnifiedFile;
