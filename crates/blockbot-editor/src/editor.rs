//! The [`Editor`]: one open module between the store, its edit session and
//! the code generator.
//!
//! Loading a module fetches its content together with the workspace robot
//! (and then the workspace mechanisms), so the session can reconcile every
//! reference against the declarations those modules export. Saving
//! regenerates the content text; the module counts as modified whenever
//! that text differs from the last saved one.

use std::collections::BTreeMap;

use blockbot_codegen::{generate_module, GenerateOptions, GeneratedModule};
use blockbot_core::block::field;
use blockbot_core::decl::{ComponentDecl, EventDecl, MethodDecl};
use blockbot_core::{BlockKind, ChangeRegistry, DeclarationScope, Declarations, EditSession, Module, ModuleType};
use blockbot_storage::{make_module_content_text, parse_module_content_text, path, ModuleContent, ModuleStore, StorageError};
use tracing::{info, warn};

use crate::error::EditorError;

/// A module open for editing.
#[derive(Debug)]
pub struct OpenModule {
    pub module: Module,
    session: EditSession,
    /// Content text as last fetched or saved.
    saved_text: String,
    /// Workspace robot content. `None` when the open module is the robot.
    robot: Option<ModuleContent>,
}

impl OpenModule {
    pub fn session(&self) -> &EditSession {
        &self.session
    }
}

/// Outcome of [`Editor::save`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Paths of other modules rewritten to follow the saved declarations.
    pub updated_dependents: Vec<String>,
}

pub struct Editor<S: ModuleStore> {
    store: S,
    options: GenerateOptions,
    current: Option<OpenModule>,
}

impl<S: ModuleStore> Editor<S> {
    pub fn new(store: S, options: GenerateOptions) -> Self {
        Editor {
            store,
            options,
            current: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current(&self) -> Option<&OpenModule> {
        self.current.as_ref()
    }

    fn open(&self) -> Result<&OpenModule, EditorError> {
        self.current.as_ref().ok_or(EditorError::NoCurrentModule)
    }

    pub fn session(&self) -> Result<&EditSession, EditorError> {
        Ok(&self.open()?.session)
    }

    pub fn session_mut(&mut self) -> Result<&mut EditSession, EditorError> {
        self.current
            .as_mut()
            .map(|open| &mut open.session)
            .ok_or(EditorError::NoCurrentModule)
    }

    /// Drops the open module and its session.
    pub fn close(&mut self) {
        self.current = None;
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Opens the module at `path`, replacing any open module.
    ///
    /// On failure the previously open module stays open.
    pub async fn load_module(&mut self, path: &str) -> Result<&OpenModule, EditorError> {
        let (workspace, _) = path::parse_module_path(path)?;
        let robot_path = path::robot_path(workspace);

        let (text, robot_text, entries) = tokio::try_join!(
            self.store.fetch_module_content_text(path),
            fetch_optional(&self.store, &robot_path),
            self.store.list_entries(),
        )?;

        let entry = entries
            .iter()
            .find(|e| e.path == path)
            .ok_or_else(|| StorageError::NotFound { path: path.to_string() })?;
        let module = entry.to_module()?;
        let content = parse_module_content_text(&text)?;

        let robot = match robot_text {
            Some(robot_text) if !module.is_robot() => Some(parse_module_content_text(&robot_text)?),
            _ => None,
        };
        let mechanisms = fetch_mechanisms(&self.store, &module).await?;
        let scope = scope_for(robot.as_ref(), &mechanisms);

        let session = EditSession::load(&content.blocks, scope, ChangeRegistry::with_defaults())?;
        info!(
            path,
            module_type = %module.module_type,
            blocks = session.graph().len(),
            warnings = session.warnings().len(),
            "module loaded"
        );

        self.current = Some(OpenModule {
            module,
            session,
            saved_text: text,
            robot,
        });
        self.open()
    }

    // -----------------------------------------------------------------------
    // Content and generation
    // -----------------------------------------------------------------------

    /// Python source of the open module.
    pub fn generate_python(&self) -> Result<GeneratedModule, EditorError> {
        let open = self.open()?;
        Ok(generate_module(
            &open.module,
            open.session.graph(),
            open.session.scope(),
            &self.options,
        )?)
    }

    /// Content text of the open module as it would be saved now.
    pub fn module_content_text(&self) -> Result<String, EditorError> {
        let open = self.open()?;
        content_text_for(&open.module, &open.session, &self.options)
    }

    pub fn is_modified(&self) -> Result<bool, EditorError> {
        let open = self.open()?;
        Ok(self.module_content_text()? != open.saved_text)
    }

    /// Saves the open module. After a robot or mechanism save, every other
    /// module of the workspace is reloaded against the new declarations and
    /// rewritten if its content changed.
    ///
    /// If the store fails, nothing is marked saved and the session is kept.
    pub async fn save(&mut self) -> Result<SaveReport, EditorError> {
        let text = self.module_content_text()?;
        let module = self.open()?.module.clone();

        self.store.save_module(&module.module_path, &text).await?;
        if let Some(open) = self.current.as_mut() {
            open.saved_text = text;
        }
        info!(path = %module.module_path, "module saved");

        let mut report = SaveReport::default();
        if module.module_type.exports_declarations() {
            report.updated_dependents = self.sync_dependents(&module).await?;
        }
        Ok(report)
    }

    async fn sync_dependents(&self, saved: &Module) -> Result<Vec<String>, EditorError> {
        let entries = self.store.list_entries().await?;
        let robot_path = path::robot_path(&saved.workspace_name);
        let robot = match fetch_optional(&self.store, &robot_path).await? {
            Some(text) => Some(parse_module_content_text(&text)?),
            None => None,
        };

        let mut updated = Vec::new();
        for entry in &entries {
            if entry.path == saved.module_path
                || path::workspace_name(&entry.path).ok() != Some(saved.workspace_name.as_str())
            {
                continue;
            }
            let module = entry.to_module()?;
            let text = self.store.fetch_module_content_text(&entry.path).await?;
            let content = match parse_module_content_text(&text) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %entry.path, error = %e, "skipping unreadable dependent");
                    continue;
                }
            };
            let mechanisms = fetch_mechanisms(&self.store, &module).await?;
            let robot_content = if module.is_robot() { None } else { robot.as_ref() };
            let scope = scope_for(robot_content, &mechanisms);
            let session = EditSession::load(&content.blocks, scope, ChangeRegistry::with_defaults())?;
            let new_text = content_text_for(&module, &session, &self.options)?;
            if new_text != text {
                self.store.save_module(&entry.path, &new_text).await?;
                updated.push(entry.path.clone());
            }
        }
        if !updated.is_empty() {
            info!(workspace = %saved.workspace_name, modules = updated.len(), "dependents updated");
        }
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Robot declarations
    // -----------------------------------------------------------------------

    /// Declarations of the workspace robot. When the robot itself is open
    /// these come from its live graph and include `Within` methods;
    /// otherwise they are the exported declarations fetched with the open
    /// module.
    pub fn robot_declarations(&self) -> Result<Declarations, EditorError> {
        let open = self.open()?;
        if open.module.is_robot() {
            return Ok(open.session.declarations());
        }
        open.robot
            .as_ref()
            .map(ModuleContent::declarations)
            .ok_or_else(|| EditorError::RobotContentUnavailable {
                workspace: open.module.workspace_name.clone(),
            })
    }

    pub fn get_components_from_robot(&self) -> Result<Vec<ComponentDecl>, EditorError> {
        Ok(self.robot_declarations()?.components)
    }

    pub fn get_events_from_robot(&self) -> Result<Vec<EventDecl>, EditorError> {
        Ok(self.robot_declarations()?.events)
    }

    pub fn get_methods_from_robot(&self) -> Result<Vec<MethodDecl>, EditorError> {
        Ok(self.robot_declarations()?.methods)
    }

    // -----------------------------------------------------------------------
    // Creating projects and modules
    // -----------------------------------------------------------------------

    /// Creates a workspace holding a new, empty robot module.
    pub async fn create_project(&self, name: &str) -> Result<String, EditorError> {
        let robot_path = path::robot_path(name);
        self.create(ModuleType::Robot, name, name, &robot_path).await?;
        Ok(robot_path)
    }

    /// Creates a mechanism or opmode in an existing workspace.
    pub async fn create_module(&self, workspace: &str, name: &str, module_type: ModuleType) -> Result<String, EditorError> {
        if !matches!(module_type, ModuleType::Mechanism | ModuleType::OpMode) {
            return Err(EditorError::InvalidModuleType(module_type));
        }
        let robot_path = path::robot_path(workspace);
        if !self.store.contains_module(&robot_path).await? {
            return Err(StorageError::NotFound { path: robot_path }.into());
        }
        let module_path = path::module_path(workspace, name);
        self.create(module_type, workspace, name, &module_path).await?;
        Ok(module_path)
    }

    async fn create(&self, module_type: ModuleType, workspace: &str, name: &str, module_path: &str) -> Result<(), EditorError> {
        for n in [workspace, name] {
            if !path::is_valid_name(n) {
                return Err(EditorError::InvalidName { name: n.to_string() });
            }
        }
        let module = Module {
            module_path: module_path.to_string(),
            module_type,
            module_name: name.to_string(),
            workspace_name: workspace.to_string(),
            date_modified_millis: 0,
        };
        let session = starter_session(&module)?;
        let text = content_text_for(&module, &session, &self.options)?;
        self.store.create_module(module_type, module_path, &text).await?;
        info!(path = module_path, %module_type, "module created");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Renaming, copying and deleting modules
    // -----------------------------------------------------------------------

    /// Renames or copies a mechanism or opmode to `new_name` within its
    /// workspace and returns the new path. A renamed open module is closed.
    pub async fn rename_or_copy_module(&mut self, path: &str, new_name: &str, copy: bool) -> Result<String, EditorError> {
        let workspace = non_robot_workspace(path)?;
        if !path::is_valid_name(new_name) {
            return Err(EditorError::InvalidName {
                name: new_name.to_string(),
            });
        }
        let new_path = path::module_path(&workspace, new_name);
        self.store.rename_or_copy_module(path, &new_path, copy).await?;
        if !copy {
            self.close_if_open(path);
        }
        info!(path, new_path = %new_path, copy, "module moved");
        Ok(new_path)
    }

    /// Deletes a mechanism or opmode. A deleted open module is closed.
    pub async fn delete_module(&mut self, path: &str) -> Result<(), EditorError> {
        non_robot_workspace(path)?;
        self.store.delete_entry(path).await?;
        self.close_if_open(path);
        info!(path, "module deleted");
        Ok(())
    }

    fn close_if_open(&mut self, path: &str) {
        if self.current.as_ref().is_some_and(|open| open.module.module_path == path) {
            self.current = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Workspace of `path`, refusing the workspace robot.
fn non_robot_workspace(module_path: &str) -> Result<String, EditorError> {
    let (workspace, name) = path::parse_module_path(module_path)?;
    if name == workspace {
        return Err(EditorError::RobotModule {
            path: module_path.to_string(),
        });
    }
    Ok(workspace.to_string())
}

async fn fetch_optional<S: ModuleStore>(store: &S, path: &str) -> Result<Option<String>, StorageError> {
    match store.fetch_module_content_text(path).await {
        Ok(text) => Ok(Some(text)),
        Err(StorageError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Contents of every mechanism of `module`'s workspace except `module`
/// itself, keyed by module name. Unreadable contents are skipped.
async fn fetch_mechanisms<S: ModuleStore>(store: &S, module: &Module) -> Result<BTreeMap<String, ModuleContent>, StorageError> {
    let mut mechanisms = BTreeMap::new();
    for entry in store.list_entries().await? {
        if entry.module_type != ModuleType::Mechanism || entry.path == module.module_path {
            continue;
        }
        let Ok((workspace, name)) = path::parse_module_path(&entry.path) else {
            continue;
        };
        if workspace != module.workspace_name {
            continue;
        }
        let text = store.fetch_module_content_text(&entry.path).await?;
        match parse_module_content_text(&text) {
            Ok(content) => {
                mechanisms.insert(name.to_string(), content);
            }
            Err(e) => warn!(path = %entry.path, error = %e, "skipping unreadable mechanism"),
        }
    }
    Ok(mechanisms)
}

fn scope_for(robot: Option<&ModuleContent>, mechanisms: &BTreeMap<String, ModuleContent>) -> DeclarationScope {
    let mut scope = DeclarationScope::new();
    if let Some(robot) = robot {
        scope = scope.with_robot(robot.declarations());
    }
    for (name, content) in mechanisms {
        scope = scope.with_mechanism(name.clone(), content.declarations());
    }
    scope
}

/// Generates and packs the content text of a module session. Robots and
/// mechanisms export components, events and outside methods; opmodes export
/// nothing.
fn content_text_for(module: &Module, session: &EditSession, options: &GenerateOptions) -> Result<String, EditorError> {
    let generated = generate_module(module, session.graph(), session.scope(), options)?;
    for diagnostic in &generated.diagnostics {
        warn!(path = %module.module_path, %diagnostic, "generation diagnostic");
    }
    let exported = if module.module_type.exports_declarations() {
        generated.declarations.exported()
    } else {
        Declarations::default()
    };
    Ok(make_module_content_text(
        module,
        session.serialize(),
        exported.components,
        exported.events,
        exported.methods,
        generated.op_mode,
    )?)
}

/// The blocks a new module starts with.
fn starter_session(module: &Module) -> Result<EditSession, EditorError> {
    let mut session = EditSession::new(ChangeRegistry::with_defaults(), DeclarationScope::new());
    match module.module_type {
        ModuleType::Robot | ModuleType::Mechanism => {
            session.create_block(BlockKind::ComponentHolder);
        }
        ModuleType::OpMode => {
            let details = session.create_block(BlockKind::OpModeDetails);
            session.set_field(details, field::NAME, &module.module_name)?;
        }
        ModuleType::Unknown => return Err(EditorError::InvalidModuleType(module.module_type)),
    }
    Ok(session)
}
