//! SQLite implementation of [`ModuleStore`].
//!
//! [`SqliteStore`] keeps module content texts in a single `modules` table
//! with WAL mode and automatic schema migrations. Every write that touches
//! more than one row runs inside one transaction, so a workspace rename
//! either moves every module or none.

use std::sync::{Mutex, MutexGuard};

use blockbot_core::ModuleType;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::StorageError;
use crate::path;
use crate::traits::{plan_workspace_move, ModuleStore};
use crate::types::{now_millis, ModuleEntry};

/// SQLite-backed implementation of [`ModuleStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        info!(path, "opened module database");
        Ok(SqliteStore { conn: Mutex::new(conn) })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn: Mutex::new(conn) })
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Unavailable)
    }

    fn parse_type(raw: &str) -> Result<ModuleType, StorageError> {
        raw.parse::<ModuleType>().map_err(|e| StorageError::InvalidContent {
            reason: e.to_string(),
        })
    }

    fn entries(conn: &Connection) -> Result<Vec<ModuleEntry>, StorageError> {
        let mut stmt =
            conn.prepare("SELECT path, module_type, date_modified_millis FROM modules ORDER BY path")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        let mut entries = Vec::new();
        for row in rows {
            let (path, module_type, date_modified_millis) = row?;
            entries.push(ModuleEntry {
                path,
                module_type: Self::parse_type(&module_type)?,
                date_modified_millis,
            });
        }
        Ok(entries)
    }

    fn exists(conn: &Connection, path: &str) -> Result<bool, StorageError> {
        Ok(conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM modules WHERE path = ?1)",
            params![path],
            |row| row.get(0),
        )?)
    }

    /// Copies the row at `old_path` to `new_path` with a fresh timestamp.
    fn copy_row(conn: &Connection, old_path: &str, new_path: &str, now: i64) -> Result<(), StorageError> {
        let copied = conn.execute(
            "INSERT INTO modules (path, module_type, content, date_modified_millis)
             SELECT ?2, module_type, content, ?3 FROM modules WHERE path = ?1",
            params![old_path, new_path, now],
        )?;
        if copied == 0 {
            return Err(StorageError::NotFound {
                path: old_path.to_string(),
            });
        }
        Ok(())
    }
}

impl ModuleStore for SqliteStore {
    async fn list_entries(&self) -> Result<Vec<ModuleEntry>, StorageError> {
        Self::entries(&*self.conn()?)
    }

    async fn fetch_module_content_text(&self, path: &str) -> Result<String, StorageError> {
        self.conn()?
            .query_row(
                "SELECT content FROM modules WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound { path: path.to_string() })
    }

    async fn create_module(&self, module_type: ModuleType, path: &str, text: &str) -> Result<(), StorageError> {
        path::parse_module_path(path)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if Self::exists(&tx, path)? {
            return Err(StorageError::AlreadyExists { path: path.to_string() });
        }
        tx.execute(
            "INSERT INTO modules (path, module_type, content, date_modified_millis) VALUES (?1, ?2, ?3, ?4)",
            params![path, module_type.as_str(), text, now_millis()],
        )?;
        tx.commit()?;
        debug!(path, %module_type, "module created");
        Ok(())
    }

    async fn save_module(&self, path: &str, text: &str) -> Result<(), StorageError> {
        let updated = self.conn()?.execute(
            "UPDATE modules SET content = ?2, date_modified_millis = ?3 WHERE path = ?1",
            params![path, text, now_millis()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound { path: path.to_string() });
        }
        debug!(path, bytes = text.len(), "module saved");
        Ok(())
    }

    async fn delete_entry(&self, path: &str) -> Result<(), StorageError> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM modules WHERE path = ?1", params![path])?;
        if deleted == 0 {
            return Err(StorageError::NotFound { path: path.to_string() });
        }
        Ok(())
    }

    async fn rename_or_copy_module(&self, old_path: &str, new_path: &str, copy: bool) -> Result<(), StorageError> {
        path::parse_module_path(new_path)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if !Self::exists(&tx, old_path)? {
            return Err(StorageError::NotFound {
                path: old_path.to_string(),
            });
        }
        if Self::exists(&tx, new_path)? {
            return Err(StorageError::AlreadyExists {
                path: new_path.to_string(),
            });
        }
        Self::copy_row(&tx, old_path, new_path, now_millis())?;
        if !copy {
            tx.execute("DELETE FROM modules WHERE path = ?1", params![old_path])?;
        }
        tx.commit()?;
        debug!(old_path, new_path, copy, "module moved");
        Ok(())
    }

    async fn rename_or_copy_workspace(&self, old_name: &str, new_name: &str, copy: bool) -> Result<(), StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let moves = plan_workspace_move(&Self::entries(&tx)?, old_name, new_name)?;
        let now = now_millis();
        for (old_path, new_path) in &moves {
            Self::copy_row(&tx, old_path, new_path, now)?;
            if !copy {
                tx.execute("DELETE FROM modules WHERE path = ?1", params![old_path])?;
            }
        }
        tx.commit()?;
        info!(old_name, new_name, copy, modules = moves.len(), "workspace moved");
        Ok(())
    }

    async fn delete_workspace(&self, name: &str) -> Result<(), StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let doomed: Vec<String> = Self::entries(&tx)?
            .into_iter()
            .filter(|e| path::workspace_name(&e.path).is_ok_and(|w| w == name))
            .map(|e| e.path)
            .collect();
        if doomed.is_empty() {
            return Err(StorageError::NotFound { path: name.to_string() });
        }
        for path in &doomed {
            tx.execute("DELETE FROM modules WHERE path = ?1", params![path])?;
        }
        tx.commit()?;
        info!(workspace = name, modules = doomed.len(), "workspace deleted");
        Ok(())
    }

    async fn fetch_entry(&self, key: &str, default: &str) -> Result<String, StorageError> {
        let value: Option<String> = self
            .conn()?
            .query_row("SELECT value FROM entries WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    async fn save_entry(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT INTO entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}
