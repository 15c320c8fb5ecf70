//! Blockbot command line tools.
//!
//! Provides the `blockbot` binary for working with robot projects stored in
//! a SQLite module database: listing projects, creating projects and
//! modules, generating python, checking references, and renaming, copying
//! or deleting modules and whole workspaces.
//!
//! The database path and indent width come from `BLOCKBOT_DB_PATH` and
//! `BLOCKBOT_INDENT` unless `--db` / `--indent` are given.
//!
//! Exit codes: 0 = success, 1 = rejected request, 2 = check found problems,
//! 3 = storage error.

use std::process;

use clap::{Parser, Subcommand};
use tracing::debug;

use blockbot_core::ModuleType;
use blockbot_editor::{Editor, EditorConfig, EditorError};
use blockbot_storage::{ModuleStore, SqliteStore, StorageError};

/// Robot block programs and their python.
#[derive(Parser)]
#[command(name = "blockbot", about = "Robot block programs and their python")]
struct Cli {
    /// Path to the module database file.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Spaces per indentation level of generated python.
    #[arg(long, global = true)]
    indent: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List projects with their modules.
    List,

    /// Create a project holding an empty robot.
    NewProject {
        name: String,
    },

    /// Create a mechanism or opmode in an existing project.
    NewModule {
        workspace: String,
        name: String,

        /// Module type: mechanism or opmode.
        #[arg(short = 't', long = "type", default_value = "opmode")]
        module_type: String,
    },

    /// Print the python generated for a module, e.g. `Alpha/auto.blk`.
    Generate {
        path: String,
    },

    /// Report block warnings and generation diagnostics of a module.
    Check {
        path: String,
    },

    /// Rename a mechanism or opmode within its project.
    RenameModule {
        path: String,
        new_name: String,
    },

    /// Copy a mechanism or opmode under a new name in its project.
    CopyModule {
        path: String,
        new_name: String,
    },

    /// Delete a mechanism or opmode.
    DeleteModule {
        path: String,
    },

    /// Copy every module of a workspace under a new name.
    CopyWorkspace {
        from: String,
        to: String,
    },

    /// Rename a workspace and all of its modules.
    RenameWorkspace {
        from: String,
        to: String,
    },

    /// Delete a workspace and all of its modules.
    DeleteWorkspace {
        name: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config = EditorConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(indent) = cli.indent {
        config.indent = indent;
    }
    debug!(db = %config.db_path, indent = config.indent, "configuration");

    let store = match SqliteStore::new(&config.db_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to open database '{}': {}", config.db_path, e);
            process::exit(3);
        }
    };
    let mut editor = Editor::new(store, config.generate_options());

    let exit_code = match cli.command {
        Commands::List => run_list(&editor).await,
        Commands::NewProject { name } => run_new_project(&editor, &name).await,
        Commands::NewModule {
            workspace,
            name,
            module_type,
        } => run_new_module(&editor, &workspace, &name, &module_type).await,
        Commands::Generate { path } => run_generate(&mut editor, &path).await,
        Commands::Check { path } => run_check(&mut editor, &path).await,
        Commands::RenameModule { path, new_name } => run_move_module(&mut editor, &path, &new_name, false).await,
        Commands::CopyModule { path, new_name } => run_move_module(&mut editor, &path, &new_name, true).await,
        Commands::DeleteModule { path } => run_delete_module(&mut editor, &path).await,
        Commands::CopyWorkspace { from, to } => run_move_workspace(&editor, &from, &to, true).await,
        Commands::RenameWorkspace { from, to } => run_move_workspace(&editor, &from, &to, false).await,
        Commands::DeleteWorkspace { name } => run_delete_workspace(&editor, &name).await,
    };
    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

async fn run_list(editor: &Editor<SqliteStore>) -> i32 {
    let projects = match editor.store().list_projects().await {
        Ok(p) => p,
        Err(e) => return report_storage(&e),
    };
    if projects.is_empty() {
        println!("no projects");
    }
    for project in &projects {
        println!("{}", project.name);
        for module in project.modules() {
            println!("  {:<10} {}", module.module_type.as_str(), module.module_path);
        }
    }
    0
}

async fn run_new_project(editor: &Editor<SqliteStore>, name: &str) -> i32 {
    match editor.create_project(name).await {
        Ok(path) => {
            println!("{}", path);
            0
        }
        Err(e) => report(&e),
    }
}

async fn run_new_module(editor: &Editor<SqliteStore>, workspace: &str, name: &str, module_type: &str) -> i32 {
    let module_type = match module_type.parse::<ModuleType>() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match editor.create_module(workspace, name, module_type).await {
        Ok(path) => {
            println!("{}", path);
            0
        }
        Err(e) => report(&e),
    }
}

async fn run_generate(editor: &mut Editor<SqliteStore>, path: &str) -> i32 {
    if let Err(e) = editor.load_module(path).await {
        return report(&e);
    }
    match editor.generate_python() {
        Ok(generated) => {
            print!("{}", generated.python);
            for diagnostic in &generated.diagnostics {
                eprintln!("{}", diagnostic);
            }
            0
        }
        Err(e) => report(&e),
    }
}

/// Returns 2 when the module has block warnings or generation diagnostics.
async fn run_check(editor: &mut Editor<SqliteStore>, path: &str) -> i32 {
    if let Err(e) = editor.load_module(path).await {
        return report(&e);
    }
    let warnings = match editor.session() {
        Ok(session) => session.warnings(),
        Err(e) => return report(&e),
    };
    let diagnostics = match editor.generate_python() {
        Ok(generated) => generated.diagnostics,
        Err(e) => return report(&e),
    };

    for (block, warning) in &warnings {
        println!("warning: block {}: {}", block, warning);
    }
    for diagnostic in &diagnostics {
        println!("{}", diagnostic);
    }
    let problems = warnings.len() + diagnostics.len();
    if problems == 0 {
        println!("{}: ok", path);
        0
    } else {
        println!("{}: {} problem(s)", path, problems);
        2
    }
}

async fn run_move_module(editor: &mut Editor<SqliteStore>, path: &str, new_name: &str, copy: bool) -> i32 {
    match editor.rename_or_copy_module(path, new_name, copy).await {
        Ok(new_path) => {
            println!("{}", new_path);
            0
        }
        Err(e) => report(&e),
    }
}

async fn run_delete_module(editor: &mut Editor<SqliteStore>, path: &str) -> i32 {
    match editor.delete_module(path).await {
        Ok(()) => 0,
        Err(e) => report(&e),
    }
}

async fn run_move_workspace(editor: &Editor<SqliteStore>, from: &str, to: &str, copy: bool) -> i32 {
    match editor.store().rename_or_copy_workspace(from, to, copy).await {
        Ok(()) => 0,
        Err(e) => report_storage(&e),
    }
}

async fn run_delete_workspace(editor: &Editor<SqliteStore>, name: &str) -> i32 {
    match editor.store().delete_workspace(name).await {
        Ok(()) => 0,
        Err(e) => report_storage(&e),
    }
}

// ---------------------------------------------------------------------------
// Error reporting
// ---------------------------------------------------------------------------

fn report(err: &EditorError) -> i32 {
    match err {
        EditorError::Storage(e) => report_storage(e),
        other => {
            eprintln!("Error: {}", other);
            1
        }
    }
}

/// Missing or conflicting modules are the caller's mistake; anything else
/// is the database failing.
fn report_storage(err: &StorageError) -> i32 {
    eprintln!("Error: {}", err);
    match err {
        StorageError::NotFound { .. } | StorageError::AlreadyExists { .. } | StorageError::InvalidPath { .. } => 1,
        _ => 3,
    }
}
