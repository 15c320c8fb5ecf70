//! Module identity: which workspace a module belongs to and what it is.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The role of a module within its workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    Robot,
    Mechanism,
    #[serde(rename = "opmode")]
    OpMode,
    Unknown,
}

impl ModuleType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleType::Robot => "robot",
            ModuleType::Mechanism => "mechanism",
            ModuleType::OpMode => "opmode",
            ModuleType::Unknown => "unknown",
        }
    }

    /// Robots and mechanisms declare components, events and methods that
    /// other modules can use.
    pub fn exports_declarations(self) -> bool {
        matches!(self, ModuleType::Robot | ModuleType::Mechanism)
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "robot" => Ok(ModuleType::Robot),
            "mechanism" => Ok(ModuleType::Mechanism),
            "opmode" => Ok(ModuleType::OpMode),
            "unknown" => Ok(ModuleType::Unknown),
            other => Err(CoreError::UnknownModuleType {
                name: other.to_string(),
            }),
        }
    }
}

/// An identified module of a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub module_path: String,
    pub module_type: ModuleType,
    pub module_name: String,
    pub workspace_name: String,
    pub date_modified_millis: i64,
}

impl Module {
    pub fn is_robot(&self) -> bool {
        self.module_type == ModuleType::Robot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_type_round_trips_through_str() {
        for ty in [
            ModuleType::Robot,
            ModuleType::Mechanism,
            ModuleType::OpMode,
            ModuleType::Unknown,
        ] {
            assert_eq!(ty.as_str().parse::<ModuleType>().unwrap(), ty);
            assert_eq!(serde_json::to_value(ty).unwrap(), ty.as_str());
        }
        assert!("teleop".parse::<ModuleType>().is_err());
    }

    #[test]
    fn only_robot_and_mechanism_export() {
        assert!(ModuleType::Robot.exports_declarations());
        assert!(ModuleType::Mechanism.exports_declarations());
        assert!(!ModuleType::OpMode.exports_declarations());
    }
}
