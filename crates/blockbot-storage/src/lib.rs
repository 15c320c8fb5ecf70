//! Storage for blockbot workspaces and modules.
//!
//! Provides the [`ModuleStore`] trait defining the storage contract, the
//! [`InMemoryStore`] and [`SqliteStore`] backends, and the persisted module
//! content model.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`path`]: `<workspace>/<module>.blk` path conventions
//! - [`types`]: stored module entries and grouped projects
//! - [`content`]: module content text (make / parse)
//! - [`traits`]: ModuleStore trait definition
//! - [`listing`]: grouping entries into projects
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: migrations and connection setup
//! - [`sqlite`]: SqliteStore implementation

pub mod content;
pub mod error;
pub mod listing;
pub mod memory;
pub mod path;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use content::{make_module_content_text, new_module_content_text, parse_module_content_text, ModuleContent};
pub use error::StorageError;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::ModuleStore;
pub use types::{ModuleEntry, Project};
