//! Internal domain modules for the Stockroom core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod catalog;
pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod export;
pub mod inventory;
pub mod operation;
pub mod operation_log;
pub mod registry;
pub mod seed;
pub mod storage;
pub mod tree;

#[doc(inline)]
pub use catalog::{PartCatalog, References};
#[doc(inline)]
pub use dispatcher::{CommandError, Dispatcher, ErrorKind};
#[doc(inline)]
pub use entity::{
    Category, CustomField, Entity, EntityKind, Manufacturer, Package, PackageType, Part, Supplier,
    TreeNode,
};
#[doc(inline)]
pub use error::{Result, StockroomError};
#[doc(inline)]
pub use export::{
    export_inventory, import_inventory, BackupFormat, ExportInventory, ExportSummary, ImportCount,
    ImportResult, APP_VERSION, EXPORT_VERSION,
};
#[doc(inline)]
pub use inventory::{Inventory, Snapshot};
#[doc(inline)]
pub use operation::Operation;
#[doc(inline)]
pub use operation_log::{OperationLog, OperationSummary, PurgeStrategy};
#[doc(inline)]
pub use registry::Registry;
#[doc(inline)]
pub use seed::seed_defaults;
#[doc(inline)]
pub use storage::Storage;
#[doc(inline)]
pub use tree::CategoryTree;
