//! The [`ModuleStore`] trait defining the storage contract for modules.
//!
//! Modules are opaque content texts addressed by path; the store knows
//! their type and modification time but never parses them. Key/value
//! entries hold small editor preferences next to the modules.
//!
//! All backends ([`InMemoryStore`](crate::InMemoryStore),
//! [`SqliteStore`](crate::SqliteStore)) implement this trait with identical
//! semantics, so editors and tools are written once against it.

use std::collections::BTreeMap;

use blockbot_core::ModuleType;

use crate::error::StorageError;
use crate::types::{ModuleEntry, Project};

/// The storage contract for workspaces and modules.
///
/// Operations are async so remote backends fit the same contract. Every
/// failure is a [`StorageError`]; a failed write leaves the store as it
/// was.
#[allow(async_fn_in_trait)]
pub trait ModuleStore {
    // -------------------------------------------------------------------
    // Modules
    // -------------------------------------------------------------------

    /// Lists every stored module.
    async fn list_entries(&self) -> Result<Vec<ModuleEntry>, StorageError>;

    /// Fetches the content text of one module.
    ///
    /// Fails with [`StorageError::NotFound`] if no module has that path.
    async fn fetch_module_content_text(&self, path: &str) -> Result<String, StorageError>;

    /// Stores a new module. Fails with [`StorageError::AlreadyExists`] if
    /// the path is taken.
    async fn create_module(&self, module_type: ModuleType, path: &str, text: &str) -> Result<(), StorageError>;

    /// Overwrites the content of an existing module and bumps its
    /// modification time. Fails with [`StorageError::NotFound`] if missing.
    async fn save_module(&self, path: &str, text: &str) -> Result<(), StorageError>;

    /// Removes one module. Deleting a missing path fails with
    /// [`StorageError::NotFound`].
    async fn delete_entry(&self, path: &str) -> Result<(), StorageError>;

    /// Moves or duplicates one module to a new path within the store.
    async fn rename_or_copy_module(&self, old_path: &str, new_path: &str, copy: bool) -> Result<(), StorageError>;

    // -------------------------------------------------------------------
    // Workspaces
    // -------------------------------------------------------------------

    /// Moves or duplicates every module of a workspace under a new name,
    /// atomically. The robot module is renamed after the new workspace;
    /// every other module keeps its name.
    async fn rename_or_copy_workspace(&self, old_name: &str, new_name: &str, copy: bool) -> Result<(), StorageError>;

    /// Removes every module of a workspace.
    async fn delete_workspace(&self, name: &str) -> Result<(), StorageError>;

    // -------------------------------------------------------------------
    // Key/value entries
    // -------------------------------------------------------------------

    /// The value stored under `key`, or `default` if there is none.
    async fn fetch_entry(&self, key: &str, default: &str) -> Result<String, StorageError>;

    async fn save_entry(&self, key: &str, value: &str) -> Result<(), StorageError>;

    // -------------------------------------------------------------------
    // Provided
    // -------------------------------------------------------------------

    /// Every workspace with its modules, grouped and sorted by name.
    async fn list_projects(&self) -> Result<Vec<Project>, StorageError> {
        let entries = self.list_entries().await?;
        Ok(crate::listing::group_projects(&entries))
    }

    /// Whether a module exists at `path`.
    async fn contains_module(&self, path: &str) -> Result<bool, StorageError> {
        match self.fetch_module_content_text(path).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// New paths for every module of workspace `old_name` moved to `new_name`.
///
/// Fails with [`StorageError::NotFound`] if the workspace has no modules and
/// with [`StorageError::AlreadyExists`] if any target path is taken.
pub(crate) fn plan_workspace_move(
    entries: &[ModuleEntry],
    old_name: &str,
    new_name: &str,
) -> Result<BTreeMap<String, String>, StorageError> {
    if !crate::path::is_valid_name(new_name) {
        return Err(StorageError::InvalidPath {
            path: new_name.to_string(),
        });
    }
    let mut moves = BTreeMap::new();
    for entry in entries {
        let Ok((workspace, module)) = crate::path::parse_module_path(&entry.path) else {
            continue;
        };
        if workspace != old_name {
            continue;
        }
        let new_path = if entry.module_type == ModuleType::Robot {
            crate::path::robot_path(new_name)
        } else {
            crate::path::module_path(new_name, module)
        };
        // A mechanism named after the new workspace lands on the robot path.
        if moves.values().any(|p| p == &new_path) {
            return Err(StorageError::AlreadyExists { path: new_path });
        }
        moves.insert(entry.path.clone(), new_path);
    }
    if moves.is_empty() {
        return Err(StorageError::NotFound {
            path: old_name.to_string(),
        });
    }
    for new_path in moves.values() {
        if entries.iter().any(|e| &e.path == new_path) {
            return Err(StorageError::AlreadyExists { path: new_path.clone() });
        }
    }
    Ok(moves)
}
