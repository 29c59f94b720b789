//! Durable operation log and purge strategies for the inventory.

use crate::{Operation, Result};
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};

/// Controls which old operations are removed from the log.
#[derive(Debug, Clone, Copy)]
pub enum PurgeStrategy {
    /// Retain only the most recent `keep_last` operations.
    LocalOnly { keep_last: usize },
}

/// One row of the operation log as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSummary {
    pub operation_id: String,
    pub timestamp: i64,
    pub operation_type: String,
    pub target: String,
    pub operation: Operation,
}

/// Records inventory mutations to the `operations` table and purges stale entries.
pub struct OperationLog {
    strategy: PurgeStrategy,
}

impl OperationLog {
    /// Creates a new `OperationLog` with the given purge strategy.
    pub fn new(strategy: PurgeStrategy) -> Self {
        Self { strategy }
    }

    /// Serialises `op` and appends it to the `operations` table within `tx`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StockroomError::Database`] if the INSERT fails, or
    /// [`crate::StockroomError::Json`] if `op` cannot be serialised.
    pub fn log(&self, tx: &Transaction, op: &Operation) -> Result<()> {
        let op_json = serde_json::to_string(op)?;

        tx.execute(
            "INSERT INTO operations (operation_id, timestamp, operation_type, target, operation_data)
             VALUES (?, ?, ?, ?, ?)",
            rusqlite::params![
                op.operation_id(),
                op.timestamp(),
                op.type_name(),
                op.target(),
                op_json,
            ],
        )?;

        Ok(())
    }

    /// Deletes old operations from the log according to the purge strategy.
    ///
    /// Call this after every [`log`](Self::log) call to keep the table bounded in size.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StockroomError::Database`] if the DELETE fails.
    pub fn purge_if_needed(&self, tx: &Transaction) -> Result<()> {
        match self.strategy {
            PurgeStrategy::LocalOnly { keep_last } => {
                tx.execute(
                    "DELETE FROM operations WHERE id NOT IN (
                        SELECT id FROM operations ORDER BY id DESC LIMIT ?
                    )",
                    [keep_last as i64],
                )?;
            }
        }
        Ok(())
    }

    /// Returns logged operations, newest first, at most `limit` of them when given.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StockroomError::Database`] if the query fails, or
    /// [`crate::StockroomError::Json`] if a stored row cannot be parsed.
    pub fn list(&self, conn: &Connection, limit: Option<usize>) -> Result<Vec<OperationSummary>> {
        let limit = limit.map_or(-1, |l| l as i64);
        let mut stmt = conn.prepare(
            "SELECT operation_id, timestamp, operation_type, target, operation_data
             FROM operations ORDER BY id DESC LIMIT ?",
        )?;
        let rows = stmt
            .query_map([limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(operation_id, timestamp, operation_type, target, data)| {
                Ok(OperationSummary {
                    operation_id,
                    timestamp,
                    operation_type,
                    target,
                    operation: serde_json::from_str(&data)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityKind, Storage};
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_and_purge() {
        let temp = NamedTempFile::new().unwrap();
        let mut storage = Storage::create(temp.path()).unwrap();
        let log = OperationLog::new(PurgeStrategy::LocalOnly { keep_last: 5 });

        let tx = storage.connection_mut().transaction().unwrap();
        for i in 0..10 {
            let op = Operation::create(EntityKind::Part, &format!("R{i}"));
            log.log(&tx, &op).unwrap();
        }
        log.purge_if_needed(&tx).unwrap();
        tx.commit().unwrap();

        let count: i64 = storage
            .connection()
            .query_row("SELECT COUNT(*) FROM operations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_list_newest_first_with_limit() {
        let temp = NamedTempFile::new().unwrap();
        let mut storage = Storage::create(temp.path()).unwrap();
        let log = OperationLog::new(PurgeStrategy::LocalOnly { keep_last: 100 });

        let tx = storage.connection_mut().transaction().unwrap();
        log.log(&tx, &Operation::create(EntityKind::Part, "R1")).unwrap();
        log.log(&tx, &Operation::adjust("R1", 4, 4)).unwrap();
        log.log(&tx, &Operation::delete(EntityKind::Part, "R1")).unwrap();
        tx.commit().unwrap();

        let all = log.list(storage.connection(), None).unwrap();
        let types: Vec<_> = all.iter().map(|s| s.operation_type.as_str()).collect();
        assert_eq!(types, ["DeleteRecord", "AdjustQuantity", "CreateRecord"]);

        let latest = log.list(storage.connection(), Some(1)).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].target, "R1");
    }
}
