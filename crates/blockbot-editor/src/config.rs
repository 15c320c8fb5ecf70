//! Editor configuration from the environment.
//!
//! - `BLOCKBOT_DB_PATH`: SQLite database file path (default: "blockbot.db")
//! - `BLOCKBOT_INDENT`: spaces per indentation level of generated python
//!   (default: 4)

use blockbot_codegen::{GenerateOptions, DEFAULT_INDENT};
use tracing::warn;

pub const DB_PATH_VAR: &str = "BLOCKBOT_DB_PATH";
pub const INDENT_VAR: &str = "BLOCKBOT_INDENT";
pub const DEFAULT_DB_PATH: &str = "blockbot.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    pub db_path: String,
    pub indent: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            db_path: DEFAULT_DB_PATH.to_string(),
            indent: DEFAULT_INDENT,
        }
    }
}

impl EditorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any variable source. Unparsable values fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup(DB_PATH_VAR).unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let indent = match lookup(INDENT_VAR) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "ignoring unparsable {INDENT_VAR}");
                DEFAULT_INDENT
            }),
            None => DEFAULT_INDENT,
        };
        EditorConfig { db_path, indent }
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            indent: self.indent,
            ..GenerateOptions::default()
        }
    }
}
