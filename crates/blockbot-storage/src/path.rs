//! Module path conventions.
//!
//! A module lives at `<workspace>/<module>.blk`. The robot module of a
//! workspace is named after the workspace itself.

use crate::error::StorageError;

pub const MODULE_EXTENSION: &str = ".blk";

/// Workspace and module names: a letter, then letters, digits or `_`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

pub fn module_path(workspace: &str, module: &str) -> String {
    format!("{workspace}/{module}{MODULE_EXTENSION}")
}

pub fn robot_path(workspace: &str) -> String {
    module_path(workspace, workspace)
}

/// Splits a module path into `(workspace, module)`.
pub fn parse_module_path(path: &str) -> Result<(&str, &str), StorageError> {
    let invalid = || StorageError::InvalidPath { path: path.to_string() };
    let (workspace, file) = path.split_once('/').ok_or_else(invalid)?;
    let module = file.strip_suffix(MODULE_EXTENSION).ok_or_else(invalid)?;
    if !is_valid_name(workspace) || !is_valid_name(module) {
        return Err(invalid());
    }
    Ok((workspace, module))
}

pub fn workspace_name(path: &str) -> Result<&str, StorageError> {
    parse_module_path(path).map(|(workspace, _)| workspace)
}

pub fn module_name(path: &str) -> Result<&str, StorageError> {
    parse_module_path(path).map(|(_, module)| module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_split_into_workspace_and_module() {
        let path = module_path("Alpha", "arm");
        assert_eq!(path, "Alpha/arm.blk");
        assert_eq!(parse_module_path(&path).unwrap(), ("Alpha", "arm"));
        assert_eq!(robot_path("Alpha"), "Alpha/Alpha.blk");
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for bad in ["Alpha", "Alpha/arm", "Alpha/arm.txt", "/arm.blk", "Alpha/sub/arm.blk", "1x/arm.blk"] {
            assert!(
                matches!(parse_module_path(bad), Err(StorageError::InvalidPath { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn names() {
        assert!(is_valid_name("Drive_2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("_x"));
        assert!(!is_valid_name("my arm"));
    }
}
