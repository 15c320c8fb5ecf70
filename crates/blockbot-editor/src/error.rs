//! Editor error types.

use blockbot_codegen::CodegenError;
use blockbot_core::{CoreError, ModuleType};
use blockbot_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    /// A store operation failed. The open module is left as it was.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An operation that needs an open module ran with none open.
    #[error("no module is open")]
    NoCurrentModule,

    /// The open module is not the robot and its workspace robot could not
    /// be read.
    #[error("robot content of workspace '{workspace}' is not available")]
    RobotContentUnavailable { workspace: String },

    #[error("invalid name: '{name}'")]
    InvalidName { name: String },

    /// The robot moves and goes away only with its whole workspace.
    #[error("'{path}' is the workspace robot")]
    RobotModule { path: String },

    /// Robots are created with their project, never on their own.
    #[error("cannot create a module of type '{0}' in an existing workspace")]
    InvalidModuleType(ModuleType),
}
