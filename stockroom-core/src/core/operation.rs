//! Change records for the inventory operation log.

use crate::EntityKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single applied mutation, recorded in the inventory operation log.
///
/// Every variant carries a stable `operation_id` and a wall-clock `timestamp`
/// (Unix seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// A record was added.
    CreateRecord {
        operation_id: String,
        timestamp: i64,
        kind: EntityKind,
        name: String,
    },
    /// A record was replaced, possibly under a new name.
    UpdateRecord {
        operation_id: String,
        timestamp: i64,
        kind: EntityKind,
        old_name: String,
        new_name: String,
        /// Number of records whose references followed a rename.
        cascaded: usize,
    },
    /// A record was removed.
    DeleteRecord {
        operation_id: String,
        timestamp: i64,
        kind: EntityKind,
        name: String,
    },
    /// The stock level of a part was adjusted by `delta`, ending at `quantity`.
    AdjustQuantity {
        operation_id: String,
        timestamp: i64,
        part: String,
        delta: i64,
        quantity: u32,
    },
}

impl Operation {
    pub fn create(kind: EntityKind, name: &str) -> Self {
        Self::CreateRecord {
            operation_id: new_operation_id(),
            timestamp: now(),
            kind,
            name: name.to_string(),
        }
    }

    pub fn update(kind: EntityKind, old_name: &str, new_name: &str, cascaded: usize) -> Self {
        Self::UpdateRecord {
            operation_id: new_operation_id(),
            timestamp: now(),
            kind,
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            cascaded,
        }
    }

    pub fn delete(kind: EntityKind, name: &str) -> Self {
        Self::DeleteRecord {
            operation_id: new_operation_id(),
            timestamp: now(),
            kind,
            name: name.to_string(),
        }
    }

    pub fn adjust(part: &str, delta: i64, quantity: u32) -> Self {
        Self::AdjustQuantity {
            operation_id: new_operation_id(),
            timestamp: now(),
            part: part.to_string(),
            delta,
            quantity,
        }
    }

    /// Returns the stable identifier for this operation.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        match self {
            Self::CreateRecord { operation_id, .. }
            | Self::UpdateRecord { operation_id, .. }
            | Self::DeleteRecord { operation_id, .. }
            | Self::AdjustQuantity { operation_id, .. } => operation_id,
        }
    }

    /// Returns the Unix timestamp (seconds) when this operation was created.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::CreateRecord { timestamp, .. }
            | Self::UpdateRecord { timestamp, .. }
            | Self::DeleteRecord { timestamp, .. }
            | Self::AdjustQuantity { timestamp, .. } => *timestamp,
        }
    }

    /// Name of the variant, stored in the `operation_type` column.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CreateRecord { .. } => "CreateRecord",
            Self::UpdateRecord { .. } => "UpdateRecord",
            Self::DeleteRecord { .. } => "DeleteRecord",
            Self::AdjustQuantity { .. } => "AdjustQuantity",
        }
    }

    /// The record the operation applied to, by the name it carries afterwards.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::CreateRecord { name, .. } | Self::DeleteRecord { name, .. } => name,
            Self::UpdateRecord { new_name, .. } => new_name,
            Self::AdjustQuantity { part, .. } => part,
        }
    }
}

fn new_operation_id() -> String {
    Uuid::new_v4().to_string()
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
