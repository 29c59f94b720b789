//! Named-command entry point used by front-ends.
//!
//! A front-end sends a command name plus a JSON payload and receives either a
//! JSON value or a [`CommandError`]. Payload keys are snake_case, matching the
//! names the UI has always sent (`name`, `item`, `ori_name`, `new_item`,
//! `increment`).

use crate::{
    export_inventory, import_inventory, Category, Inventory, Manufacturer, Package, Part,
    StockroomError,
};
use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Stable failure vocabulary returned to front-ends.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidReference,
    ReferencedElsewhere,
    CycleDetected,
    Underflow,
    InvalidPayload,
    UnknownCommand,
    /// Disk or database failure. The only kind a retry cannot fix by changing the request.
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Serialized as `{"kind": "...", "message": "..."}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{kind}: {message}")]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CommandError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<StockroomError> for CommandError {
    fn from(err: StockroomError) -> Self {
        let kind = match &err {
            StockroomError::NotFound { .. } => ErrorKind::NotFound,
            StockroomError::Conflict { .. } => ErrorKind::Conflict,
            StockroomError::InvalidReference { .. } => ErrorKind::InvalidReference,
            StockroomError::ReferencedElsewhere { .. } => ErrorKind::ReferencedElsewhere,
            StockroomError::CycleDetected { .. } => ErrorKind::CycleDetected,
            StockroomError::Underflow { .. } => ErrorKind::Underflow,
            StockroomError::ValidationFailed(_) => ErrorKind::InvalidPayload,
            StockroomError::Database(_)
            | StockroomError::InvalidInventory(_)
            | StockroomError::Io(_)
            | StockroomError::Json(_)
            | StockroomError::Yaml(_) => ErrorKind::Storage,
        };
        let message = if err.is_storage_failure() {
            error!("storage failure: {err}");
            err.to_string()
        } else {
            err.user_message()
        };
        Self { kind, message }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NameArgs {
    name: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AddArgs<T> {
    item: T,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateArgs<T> {
    ori_name: String,
    new_item: T,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct IncrementArgs {
    name: String,
    increment: i64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct HistoryArgs {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PathArgs {
    path: PathBuf,
}

fn parse<T: DeserializeOwned>(command: &str, payload: Value) -> Result<T, CommandError> {
    let payload = if payload.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        payload
    };
    serde_json::from_value(payload).map_err(|e| {
        CommandError::new(
            ErrorKind::InvalidPayload,
            format!("Invalid payload for '{command}': {e}"),
        )
    })
}

fn to_json<T: Serialize>(value: T) -> Result<Value, CommandError> {
    serde_json::to_value(value).map_err(|e| CommandError::new(ErrorKind::Storage, e.to_string()))
}

fn done(message: String) -> Result<Value, CommandError> {
    Ok(Value::String(message))
}

/// Routes named commands to an [`Inventory`].
#[derive(Clone)]
pub struct Dispatcher {
    inventory: Arc<Inventory>,
}

impl Dispatcher {
    pub fn new(inventory: Arc<Inventory>) -> Self {
        Self { inventory }
    }

    pub fn inventory(&self) -> &Arc<Inventory> {
        &self.inventory
    }

    /// Runs `command` with `payload`.
    ///
    /// Queries return the requested records; mutations return a short
    /// confirmation string.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::UnknownCommand`] for an unrecognised name,
    /// [`ErrorKind::InvalidPayload`] if the payload does not match the
    /// command's shape, otherwise the kind matching the store's failure.
    pub fn invoke(&self, command: &str, payload: Value) -> Result<Value, CommandError> {
        debug!("invoke {command}");
        let inv = &*self.inventory;
        match command {
            // Parts
            "get_part" => {
                let args: NameArgs = parse(command, payload)?;
                to_json(inv.get_part(&args.name)?)
            }
            "get_parts" => to_json(inv.list_parts()),
            "add_part" => {
                let args: AddArgs<Part> = parse(command, payload)?;
                let name = args.item.name.clone();
                inv.add_part(args.item)?;
                done(format!("Part '{name}' added"))
            }
            "update_part" => {
                let args: UpdateArgs<Part> = parse(command, payload)?;
                let name = args.new_item.name.clone();
                inv.update_part(&args.ori_name, args.new_item)?;
                done(format!("Part '{name}' updated"))
            }
            "del_part" => {
                let args: NameArgs = parse(command, payload)?;
                inv.delete_part(&args.name)?;
                done(format!("Part '{}' deleted", args.name))
            }
            "increment_part" => {
                let args: IncrementArgs = parse(command, payload)?;
                let quantity = inv.modify_part_quantity(&args.name, args.increment)?;
                done(format!("Part '{}' quantity is now {quantity}", args.name))
            }

            // Categories
            "get_category" => {
                let args: NameArgs = parse(command, payload)?;
                to_json(inv.get_category(&args.name)?)
            }
            "get_categories" => to_json(inv.list_categories()),
            "add_category" => {
                let args: AddArgs<Category> = parse(command, payload)?;
                let name = args.item.name.clone();
                inv.add_category(args.item)?;
                done(format!("Category '{name}' added"))
            }
            "update_category" => {
                let args: UpdateArgs<Category> = parse(command, payload)?;
                let name = args.new_item.name.clone();
                inv.update_category(&args.ori_name, args.new_item)?;
                done(format!("Category '{name}' updated"))
            }
            "del_category" => {
                let args: NameArgs = parse(command, payload)?;
                inv.delete_category(&args.name)?;
                done(format!("Category '{}' deleted", args.name))
            }
            "get_tree" => to_json(inv.category_tree()),
            "get_subtree" => {
                let args: NameArgs = parse(command, payload)?;
                to_json(inv.category_subtree(&args.name)?)
            }
            "get_ancestors" => {
                let args: NameArgs = parse(command, payload)?;
                to_json(inv.category_ancestors(&args.name)?)
            }

            // Packages
            "get_package" => {
                let args: NameArgs = parse(command, payload)?;
                to_json(inv.get_package(&args.name)?)
            }
            "get_packages" => to_json(inv.list_packages()),
            "add_package" => {
                let args: AddArgs<Package> = parse(command, payload)?;
                let name = args.item.name.clone();
                inv.add_package(args.item)?;
                done(format!("Package '{name}' added"))
            }
            "update_package" => {
                let args: UpdateArgs<Package> = parse(command, payload)?;
                let name = args.new_item.name.clone();
                inv.update_package(&args.ori_name, args.new_item)?;
                done(format!("Package '{name}' updated"))
            }
            "del_package" => {
                let args: NameArgs = parse(command, payload)?;
                inv.delete_package(&args.name)?;
                done(format!("Package '{}' deleted", args.name))
            }

            // Manufacturers
            "get_mfr" => {
                let args: NameArgs = parse(command, payload)?;
                to_json(inv.get_manufacturer(&args.name)?)
            }
            "get_mfrs" => to_json(inv.list_manufacturers()),
            "add_mfr" => {
                let args: AddArgs<Manufacturer> = parse(command, payload)?;
                let name = args.item.name.clone();
                inv.add_manufacturer(args.item)?;
                done(format!("Manufacturer '{name}' added"))
            }
            "update_mfr" => {
                let args: UpdateArgs<Manufacturer> = parse(command, payload)?;
                let name = args.new_item.name.clone();
                inv.update_manufacturer(&args.ori_name, args.new_item)?;
                done(format!("Manufacturer '{name}' updated"))
            }
            "del_mfr" => {
                let args: NameArgs = parse(command, payload)?;
                inv.delete_manufacturer(&args.name)?;
                done(format!("Manufacturer '{}' deleted", args.name))
            }

            // History and backup
            "get_operations" => {
                let args: HistoryArgs = parse(command, payload)?;
                to_json(inv.list_operations(args.limit)?)
            }
            "export_inventory" => {
                let args: PathArgs = parse(command, payload)?;
                to_json(export_inventory(inv, &args.path)?)
            }
            "import_inventory" => {
                let args: PathArgs = parse(command, payload)?;
                to_json(import_inventory(inv, &args.path)?)
            }

            _ => Err(CommandError::new(
                ErrorKind::UnknownCommand,
                format!("Unknown command '{command}'"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::NamedTempFile;

    fn dispatcher() -> (NamedTempFile, Dispatcher) {
        let temp = NamedTempFile::new().unwrap();
        let inv = Inventory::create(temp.path()).unwrap();
        (temp, Dispatcher::new(Arc::new(inv)))
    }

    fn kind_of(result: Result<Value, CommandError>) -> ErrorKind {
        result.unwrap_err().kind
    }

    #[test]
    fn test_part_lifecycle() {
        let (_temp, d) = dispatcher();
        d.invoke("add_category", json!({"item": {"name": "Resistors"}}))
            .unwrap();
        d.invoke(
            "add_part",
            json!({"item": {"name": "R1", "quantity": 3, "category": "Resistors"}}),
        )
        .unwrap();

        let part = d.invoke("get_part", json!({"name": "R1"})).unwrap();
        assert_eq!(part["quantity"], 3);

        let msg = d
            .invoke("increment_part", json!({"name": "R1", "increment": 2}))
            .unwrap();
        assert!(msg.as_str().unwrap().contains('5'));

        assert_eq!(
            kind_of(d.invoke("increment_part", json!({"name": "R1", "increment": -9}))),
            ErrorKind::Underflow
        );

        let msg = d
            .invoke(
                "update_part",
                json!({"ori_name": "R1", "new_item": {"name": "R10k", "quantity": 5, "category": "Resistors"}}),
            )
            .unwrap();
        assert_eq!(msg, "Part 'R10k' updated");
        assert_eq!(
            kind_of(d.invoke("get_part", json!({"name": "R1"}))),
            ErrorKind::NotFound
        );

        d.invoke("del_part", json!({"name": "R10k"})).unwrap();
        assert_eq!(d.invoke("get_parts", Value::Null).unwrap(), json!([]));
    }

    #[test]
    fn test_huge_increment_is_invalid_payload() {
        let (_temp, d) = dispatcher();
        d.invoke("add_category", json!({"item": {"name": "Resistors"}}))
            .unwrap();
        d.invoke(
            "add_part",
            json!({"item": {"name": "R1", "quantity": 3, "category": "Resistors"}}),
        )
        .unwrap();

        assert_eq!(
            kind_of(d.invoke("increment_part", json!({"name": "R1", "increment": i64::MAX}))),
            ErrorKind::InvalidPayload
        );
        assert_eq!(
            kind_of(d.invoke("increment_part", json!({"name": "R1", "increment": i64::MIN}))),
            ErrorKind::Underflow
        );
        let part = d.invoke("get_part", json!({"name": "R1"})).unwrap();
        assert_eq!(part["quantity"], 3);
    }

    #[test]
    fn test_rename_messages_name_the_new_record() {
        let (_temp, d) = dispatcher();
        d.invoke("add_category", json!({"item": {"name": "Caps"}})).unwrap();
        d.invoke("add_package", json!({"item": {"name": "SOT23", "pkg_type": "Smt"}}))
            .unwrap();
        d.invoke("add_mfr", json!({"item": {"name": "TI"}})).unwrap();

        let msg = d
            .invoke(
                "update_category",
                json!({"ori_name": "Caps", "new_item": {"name": "Capacitors"}}),
            )
            .unwrap();
        assert_eq!(msg, "Category 'Capacitors' updated");
        let msg = d
            .invoke(
                "update_package",
                json!({"ori_name": "SOT23", "new_item": {"name": "SOT-23", "pkg_type": "Smt"}}),
            )
            .unwrap();
        assert_eq!(msg, "Package 'SOT-23' updated");
        let msg = d
            .invoke(
                "update_mfr",
                json!({"ori_name": "TI", "new_item": {"name": "Texas Instruments"}}),
            )
            .unwrap();
        assert_eq!(msg, "Manufacturer 'Texas Instruments' updated");
    }

    #[test]
    fn test_update_with_unknown_reference() {
        let (_temp, d) = dispatcher();
        d.invoke("add_category", json!({"item": {"name": "Resistors"}}))
            .unwrap();
        d.invoke(
            "add_part",
            json!({"item": {"name": "R1", "quantity": 3, "category": "Resistors"}}),
        )
        .unwrap();

        assert_eq!(
            kind_of(d.invoke(
                "update_part",
                json!({"ori_name": "R1", "new_item": {"name": "R1", "quantity": 3, "category": "Nowhere"}})
            )),
            ErrorKind::InvalidReference
        );
        assert_eq!(
            kind_of(d.invoke(
                "update_category",
                json!({"ori_name": "Resistors", "new_item": {"name": "Resistors", "parent": "Missing"}})
            )),
            ErrorKind::InvalidReference
        );
        let part = d.invoke("get_part", json!({"name": "R1"})).unwrap();
        assert_eq!(part["category"], "Resistors");
        assert_eq!(
            d.invoke("get_tree", Value::Null).unwrap(),
            json!([{"name": "Resistors", "children": []}])
        );
    }

    #[test]
    fn test_tree_commands() {
        let (_temp, d) = dispatcher();
        d.invoke("add_category", json!({"item": {"name": "A"}})).unwrap();
        d.invoke("add_category", json!({"item": {"name": "B", "parent": "A"}}))
            .unwrap();
        d.invoke("add_category", json!({"item": {"name": "C", "parent": "B"}}))
            .unwrap();

        assert_eq!(
            d.invoke("get_tree", json!({})).unwrap(),
            json!([{"name": "A", "children": [{"name": "B", "children": [{"name": "C", "children": []}]}]}])
        );
        assert_eq!(
            d.invoke("get_ancestors", json!({"name": "C"})).unwrap(),
            json!(["B", "A"])
        );
        assert_eq!(
            kind_of(d.invoke(
                "update_category",
                json!({"ori_name": "A", "new_item": {"name": "A", "parent": "C"}})
            )),
            ErrorKind::CycleDetected
        );
        assert_eq!(
            kind_of(d.invoke("del_category", json!({"name": "A"}))),
            ErrorKind::ReferencedElsewhere
        );
    }

    #[test]
    fn test_reference_and_conflict_errors() {
        let (_temp, d) = dispatcher();
        d.invoke("add_category", json!({"item": {"name": "MCU"}})).unwrap();
        d.invoke("add_mfr", json!({"item": {"name": "ST", "url": "https://st.com"}}))
            .unwrap();
        assert_eq!(
            kind_of(d.invoke("add_mfr", json!({"item": {"name": "ST"}}))),
            ErrorKind::Conflict
        );
        assert_eq!(
            kind_of(d.invoke(
                "add_part",
                json!({"item": {"name": "STM32", "quantity": 1, "category": "MCU", "package": "LQFP-48"}})
            )),
            ErrorKind::InvalidReference
        );
        d.invoke("add_package", json!({"item": {"name": "LQFP-48", "pkg_type": "Smt"}}))
            .unwrap();
        d.invoke(
            "add_part",
            json!({"item": {"name": "STM32", "quantity": 1, "category": "MCU", "package": "LQFP-48", "mfr": "ST"}}),
        )
        .unwrap();
        d.invoke(
            "update_mfr",
            json!({"ori_name": "ST", "new_item": {"name": "STMicro"}}),
        )
        .unwrap();
        let part = d.invoke("get_part", json!({"name": "STM32"})).unwrap();
        assert_eq!(part["mfr"], "STMicro");
    }

    #[test]
    fn test_payload_errors() {
        let (_temp, d) = dispatcher();
        assert_eq!(
            kind_of(d.invoke("get_part", json!({}))),
            ErrorKind::InvalidPayload
        );
        assert_eq!(
            kind_of(d.invoke("increment_part", json!({"name": "R1", "increment": "two"}))),
            ErrorKind::InvalidPayload
        );
        // Legacy flattened part shape.
        assert_eq!(
            kind_of(d.invoke(
                "add_part",
                json!({"item": {"name": "R1", "quantity": 1, "category": "X", "digikey_no": "311-1"}})
            )),
            ErrorKind::InvalidPayload
        );
        assert_eq!(
            kind_of(d.invoke("add_part", json!({"item": {"name": "R1", "quantity": -1, "category": "X"}}))),
            ErrorKind::InvalidPayload
        );
        assert_eq!(
            kind_of(d.invoke("add_category", json!({"item": {"name": "  "}}))),
            ErrorKind::InvalidPayload
        );
        assert_eq!(
            kind_of(d.invoke("launch_rocket", Value::Null)),
            ErrorKind::UnknownCommand
        );
    }

    #[test]
    fn test_command_error_serialization() {
        let err = CommandError::new(ErrorKind::Underflow, "Only 3 of 'R1' in stock");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"kind": "Underflow", "message": "Only 3 of 'R1' in stock"})
        );
    }

    #[test]
    fn test_operations_and_backup_commands() {
        let (_temp, d) = dispatcher();
        d.invoke("add_package", json!({"item": {"name": "TO-92", "pkg_type": "Tht"}}))
            .unwrap();
        let ops = d.invoke("get_operations", json!({"limit": 1})).unwrap();
        assert_eq!(ops[0]["operationType"], "CreateRecord");

        let backup = NamedTempFile::new().unwrap();
        let summary = d
            .invoke("export_inventory", json!({"path": backup.path()}))
            .unwrap();
        assert_eq!(summary["packages"], 1);

        let (_other, target) = dispatcher();
        let result = target
            .invoke("import_inventory", json!({"path": backup.path()}))
            .unwrap();
        assert_eq!(result["packages"]["imported"], 1);
    }
}
