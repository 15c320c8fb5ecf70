//! In-memory implementation of [`ModuleStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests and tools that need
//! no persistence. It keeps modules in a sorted map with the same
//! semantics as the SQLite backend, and can be switched to an unavailable
//! state to exercise storage failure paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use blockbot_core::ModuleType;
use tracing::debug;

use crate::error::StorageError;
use crate::path;
use crate::traits::{plan_workspace_move, ModuleStore};
use crate::types::{now_millis, ModuleEntry};

#[derive(Debug, Clone)]
struct StoredModule {
    module_type: ModuleType,
    content: String,
    date_modified_millis: i64,
}

#[derive(Debug, Default)]
struct State {
    /// Keyed by module path.
    modules: BTreeMap<String, StoredModule>,
    entries: HashMap<String, String>,
}

impl State {
    fn entries(&self) -> Vec<ModuleEntry> {
        self.modules
            .iter()
            .map(|(path, m)| ModuleEntry {
                path: path.clone(),
                module_type: m.module_type,
                date_modified_millis: m.date_modified_millis,
            })
            .collect()
    }

    fn module(&self, path: &str) -> Result<&StoredModule, StorageError> {
        self.modules
            .get(path)
            .ok_or_else(|| StorageError::NotFound { path: path.to_string() })
    }

    fn ensure_free(&self, path: &str) -> Result<(), StorageError> {
        if self.modules.contains_key(path) {
            return Err(StorageError::AlreadyExists { path: path.to_string() });
        }
        Ok(())
    }
}

/// Module store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following operation fail with
    /// [`StorageError::Unavailable`] until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable);
        }
        self.state.lock().map_err(|_| StorageError::Unavailable)
    }
}

impl ModuleStore for InMemoryStore {
    async fn list_entries(&self) -> Result<Vec<ModuleEntry>, StorageError> {
        Ok(self.state()?.entries())
    }

    async fn fetch_module_content_text(&self, path: &str) -> Result<String, StorageError> {
        Ok(self.state()?.module(path)?.content.clone())
    }

    async fn create_module(&self, module_type: ModuleType, path: &str, text: &str) -> Result<(), StorageError> {
        path::parse_module_path(path)?;
        let mut state = self.state()?;
        state.ensure_free(path)?;
        state.modules.insert(
            path.to_string(),
            StoredModule {
                module_type,
                content: text.to_string(),
                date_modified_millis: now_millis(),
            },
        );
        debug!(path, %module_type, "module created");
        Ok(())
    }

    async fn save_module(&self, path: &str, text: &str) -> Result<(), StorageError> {
        let mut state = self.state()?;
        let module = state
            .modules
            .get_mut(path)
            .ok_or_else(|| StorageError::NotFound { path: path.to_string() })?;
        module.content = text.to_string();
        module.date_modified_millis = now_millis();
        debug!(path, bytes = text.len(), "module saved");
        Ok(())
    }

    async fn delete_entry(&self, path: &str) -> Result<(), StorageError> {
        let mut state = self.state()?;
        state
            .modules
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound { path: path.to_string() })
    }

    async fn rename_or_copy_module(&self, old_path: &str, new_path: &str, copy: bool) -> Result<(), StorageError> {
        path::parse_module_path(new_path)?;
        let mut state = self.state()?;
        let mut module = state.module(old_path)?.clone();
        state.ensure_free(new_path)?;
        module.date_modified_millis = now_millis();
        state.modules.insert(new_path.to_string(), module);
        if !copy {
            state.modules.remove(old_path);
        }
        debug!(old_path, new_path, copy, "module moved");
        Ok(())
    }

    async fn rename_or_copy_workspace(&self, old_name: &str, new_name: &str, copy: bool) -> Result<(), StorageError> {
        let mut state = self.state()?;
        let moves = plan_workspace_move(&state.entries(), old_name, new_name)?;
        let now = now_millis();
        for (old_path, new_path) in &moves {
            let mut module = state.module(old_path)?.clone();
            module.date_modified_millis = now;
            state.modules.insert(new_path.clone(), module);
            if !copy {
                state.modules.remove(old_path);
            }
        }
        debug!(old_name, new_name, copy, modules = moves.len(), "workspace moved");
        Ok(())
    }

    async fn delete_workspace(&self, name: &str) -> Result<(), StorageError> {
        let mut state = self.state()?;
        let before = state.modules.len();
        state
            .modules
            .retain(|p, _| path::workspace_name(p).map_or(true, |w| w != name));
        if state.modules.len() == before {
            return Err(StorageError::NotFound { path: name.to_string() });
        }
        Ok(())
    }

    async fn fetch_entry(&self, key: &str, default: &str) -> Result<String, StorageError> {
        Ok(self
            .state()?
            .entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string()))
    }

    async fn save_entry(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.state()?.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
