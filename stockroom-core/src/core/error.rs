//! Error types for the Stockroom core library.

use crate::EntityKind;
use thiserror::Error;

/// All errors that can occur within the Stockroom core library.
#[derive(Debug, Error)]
pub enum StockroomError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A name does not resolve to a record of the given kind.
    #[error("{kind} not found: {name}")]
    NotFound { kind: EntityKind, name: String },

    /// The target name is already taken by a different record of the same kind.
    #[error("{kind} already exists: {name}")]
    Conflict { kind: EntityKind, name: String },

    /// A record points at a category, package or manufacturer that does not exist.
    #[error("Referenced {kind} does not exist: {name}")]
    InvalidReference { kind: EntityKind, name: String },

    /// A delete was blocked because another record still points at the target.
    #[error("{kind} '{name}' is still referenced by {referrer}")]
    ReferencedElsewhere {
        kind: EntityKind,
        name: String,
        referrer: String,
    },

    /// Assigning `parent` to category `name` would close a loop in the category forest.
    #[error("Setting the parent of '{name}' to '{parent}' would create a cycle")]
    CycleDetected { name: String, parent: String },

    /// A quantity adjustment would leave a negative stock level.
    #[error("Not enough stock of '{name}': {available} available, {requested} requested")]
    Underflow {
        name: String,
        available: u32,
        requested: u64,
    },

    /// A record failed field-level validation (empty name, quantity overflow, ...).
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The opened file is not a valid Stockroom inventory.
    #[error("Invalid inventory: {0}")]
    InvalidInventory(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored or transferred data could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML backup could not be (de)serialized.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),
}

/// Convenience alias that pins the error type to [`StockroomError`].
pub type Result<T> = std::result::Result<T, StockroomError>;

impl StockroomError {
    pub(crate) fn not_found(kind: EntityKind, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    pub(crate) fn conflict(kind: EntityKind, name: &str) -> Self {
        Self::Conflict {
            kind,
            name: name.to_string(),
        }
    }

    pub(crate) fn invalid_reference(kind: EntityKind, name: &str) -> Self {
        Self::InvalidReference {
            kind,
            name: name.to_string(),
        }
    }

    /// Returns `true` for failures of the storage medium, which the store cannot repair.
    #[must_use]
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Io(_)
                | Self::Json(_)
                | Self::Yaml(_)
                | Self::InvalidInventory(_)
        )
    }

    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::NotFound { kind, name } => format!("{kind} '{name}' no longer exists"),
            Self::Conflict { kind, name } => format!("A {} named '{name}' already exists", kind.label()),
            Self::InvalidReference { kind, name } => {
                format!("Unknown {} '{name}'", kind.label())
            }
            Self::ReferencedElsewhere { kind, name, referrer } => {
                format!("Cannot delete {} '{name}': still used by {referrer}", kind.label())
            }
            Self::CycleDetected { name, parent } => {
                format!("'{parent}' cannot be the parent of '{name}'")
            }
            Self::Underflow {
                name, available, ..
            } => format!("Only {available} of '{name}' in stock"),
            Self::ValidationFailed(msg) => msg.clone(),
            Self::InvalidInventory(_) => "Could not open inventory file".to_string(),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
            Self::Yaml(e) => format!("Data format error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_kind() {
        let e = StockroomError::not_found(EntityKind::Package, "SOT-23");
        assert_eq!(e.to_string(), "Package not found: SOT-23");
        assert!(!e.is_storage_failure());
    }

    #[test]
    fn test_underflow_user_message() {
        let e = StockroomError::Underflow {
            name: "R1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(e.user_message(), "Only 3 of 'R1' in stock");
    }

    #[test]
    fn test_io_is_storage_failure() {
        let e = StockroomError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(e.is_storage_failure());
    }
}
