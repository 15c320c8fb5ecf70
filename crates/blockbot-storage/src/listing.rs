//! Grouping of stored modules into projects.

use std::collections::BTreeMap;

use blockbot_core::ModuleType;
use tracing::warn;

use crate::types::{ModuleEntry, Project};

/// Groups entries by workspace. Workspaces are sorted by name, as are their
/// mechanisms and opmodes. Modules of a workspace that has no robot are not
/// listed.
pub fn group_projects(entries: &[ModuleEntry]) -> Vec<Project> {
    let mut robots = BTreeMap::new();
    let mut members: BTreeMap<String, Vec<_>> = BTreeMap::new();

    for entry in entries {
        let module = match entry.to_module() {
            Ok(module) => module,
            Err(e) => {
                warn!(path = %entry.path, error = %e, "skipping unlisted module");
                continue;
            }
        };
        if module.module_type == ModuleType::Robot {
            robots.insert(module.workspace_name.clone(), module);
        } else {
            members.entry(module.workspace_name.clone()).or_default().push(module);
        }
    }

    robots
        .into_iter()
        .map(|(name, robot)| {
            let mut modules = members.remove(&name).unwrap_or_default();
            modules.sort_by(|a, b| a.module_name.cmp(&b.module_name));
            let (mechanisms, rest): (Vec<_>, Vec<_>) = modules
                .into_iter()
                .partition(|m| m.module_type == ModuleType::Mechanism);
            Project {
                name,
                robot,
                mechanisms,
                op_modes: rest.into_iter().filter(|m| m.module_type == ModuleType::OpMode).collect(),
            }
        })
        .collect()
}
