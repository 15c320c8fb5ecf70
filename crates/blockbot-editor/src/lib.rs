//! Module editing on top of a [`ModuleStore`](blockbot_storage::ModuleStore).
//!
//! [`Editor`] opens one module at a time: it fetches the module with its
//! workspace robot and mechanisms, hosts the module's
//! [`EditSession`](blockbot_core::EditSession), generates python and
//! content text from it, and saves back to the store. Saving a robot or
//! mechanism rewrites the workspace modules that depend on it.

pub mod config;
pub mod editor;
pub mod error;

pub use config::EditorConfig;
pub use editor::{Editor, OpenModule, SaveReport};
pub use error::EditorError;
