//! Core library for Stockroom, a hierarchical inventory of electronic parts.
//!
//! The primary entry point is [`Inventory`], which represents an open
//! inventory database file. All record mutations go through `Inventory`
//! methods; front-ends usually reach it through the [`Dispatcher`], which
//! accepts named commands with JSON payloads.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    catalog::{PartCatalog, References},
    dispatcher::{CommandError, Dispatcher, ErrorKind},
    entity::{
        Category, CustomField, Entity, EntityKind, Manufacturer, Package, PackageType, Part,
        Supplier, TreeNode,
    },
    error::{Result, StockroomError},
    export::{
        export_inventory, import_inventory, BackupFormat, ExportInventory, ExportSummary,
        ImportCount, ImportResult, APP_VERSION, EXPORT_VERSION,
    },
    inventory::{Inventory, Snapshot},
    operation::Operation,
    operation_log::{OperationLog, OperationSummary, PurgeStrategy},
    registry::Registry,
    seed::seed_defaults,
    storage::Storage,
    tree::CategoryTree,
};
