//! Shared types for folio: the post document model, its title invariant, posts and their
//! storage, plus configuration, errors and telemetry used by every crate in the workspace.

#[cfg(feature = "cache")]
pub mod cache;
pub mod config;
pub mod doc;
pub mod error;
pub mod lifecycle;
pub mod post;
pub mod schema;
pub mod store;
#[cfg(feature = "telemetry")]
pub mod telemetry;
pub mod title;

pub use config::FolioConfig;
pub use doc::{Document, Mark, Node};
pub use error::{FolioError, Result};
pub use post::{Post, PostMetadata};
pub use schema::{StructuralViolation, enforce_invariant, validate};
pub use store::{JsonFilePostStore, MemoryPostStore, PostStore};
pub use title::extract_title;
