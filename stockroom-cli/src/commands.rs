//! Turns parsed subcommands into dispatcher requests and runs them.

use crate::args::{Cli, Commands, ConfigCommands};
use crate::settings::{self, AppSettings};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stockroom_core::{seed_defaults, CommandError, Dispatcher, Inventory, StockroomError};

/// Every variant prints as `Kind: message`, the same shape as [`CommandError`].
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Command(#[from] CommandError),

    #[error("InvalidPayload: Invalid JSON argument: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage: IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage: {0}")]
    Settings(String),

    #[error("UnknownCommand: '{0}' does not go through the inventory")]
    NotARequest(&'static str),
}

impl From<StockroomError> for CliError {
    fn from(err: StockroomError) -> Self {
        Self::Command(CommandError::from(err))
    }
}

/// A dispatcher command name and its payload.
#[derive(Debug, PartialEq)]
pub struct Request {
    pub command: String,
    pub payload: Value,
}

impl Request {
    fn new(command: impl Into<String>, payload: Value) -> Self {
        Self {
            command: command.into(),
            payload,
        }
    }
}

/// Maps a subcommand onto the dispatcher command it stands for.
pub fn request(command: &Commands) -> Result<Request, CliError> {
    let req = match command {
        Commands::List { kind } => Request::new(kind.list_command(), Value::Null),
        Commands::Get { kind, name } => Request::new(
            format!("get_{}", kind.command_suffix()),
            json!({ "name": name }),
        ),
        Commands::Add { kind, json } => Request::new(
            format!("add_{}", kind.command_suffix()),
            json!({ "item": serde_json::from_str::<Value>(json)? }),
        ),
        Commands::Update {
            kind,
            ori_name,
            json,
        } => Request::new(
            format!("update_{}", kind.command_suffix()),
            json!({ "ori_name": ori_name, "new_item": serde_json::from_str::<Value>(json)? }),
        ),
        Commands::Delete { kind, name } => Request::new(
            format!("del_{}", kind.command_suffix()),
            json!({ "name": name }),
        ),
        Commands::Tree { root: None } => Request::new("get_tree", Value::Null),
        Commands::Tree { root: Some(root) } => {
            Request::new("get_subtree", json!({ "name": root }))
        }
        Commands::Restock { name, qty } => Request::new(
            "increment_part",
            json!({ "name": name, "increment": i64::from(*qty) }),
        ),
        Commands::Use { name, qty } => Request::new(
            "increment_part",
            json!({ "name": name, "increment": -i64::from(*qty) }),
        ),
        Commands::History { limit } => Request::new("get_operations", json!({ "limit": limit })),
        Commands::Export { path } => Request::new("export_inventory", json!({ "path": path })),
        Commands::Import { path } => Request::new("import_inventory", json!({ "path": path })),
        Commands::Invoke { command, payload } => {
            let payload = match payload {
                Some(raw) => serde_json::from_str(raw)?,
                None => Value::Null,
            };
            Request::new(command.as_str(), payload)
        }
        Commands::Init { .. } => return Err(CliError::NotARequest("init")),
        Commands::Config(_) => return Err(CliError::NotARequest("config")),
    };
    Ok(req)
}

/// Executes `cli`, returning what should be printed on success.
pub fn run(cli: Cli) -> Result<Value, CliError> {
    if let Commands::Config(cmd) = &cli.command {
        return run_config(cmd);
    }

    let db_path = cli
        .global
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(settings::load_settings().database_path));

    if let Commands::Init { empty } = cli.command {
        return init(&db_path, empty);
    }

    let req = request(&cli.command)?;
    let inventory = open_inventory(&db_path)?;
    let dispatcher = Dispatcher::new(Arc::new(inventory));
    Ok(dispatcher.invoke(&req.command, req.payload)?)
}

fn open_inventory(path: &Path) -> Result<Inventory, CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Inventory::open_or_create(path)?)
}

fn init(path: &Path, empty: bool) -> Result<Value, CliError> {
    let inventory = open_inventory(path)?;
    let seeded = if empty { 0 } else { seed_defaults(&inventory)? };
    Ok(Value::String(format!(
        "Inventory ready at {} ({seeded} starter records added)",
        path.display()
    )))
}

fn run_config(cmd: &ConfigCommands) -> Result<Value, CliError> {
    match cmd {
        ConfigCommands::Show => Ok(serde_json::to_value(settings::load_settings())?),
        ConfigCommands::SetDb { path } => {
            let settings = AppSettings {
                database_path: path.to_string_lossy().to_string(),
            };
            settings::save_settings(&settings).map_err(CliError::Settings)?;
            Ok(Value::String(format!(
                "Default inventory set to {}",
                path.display()
            )))
        }
    }
}
