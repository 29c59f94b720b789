//! SQLite persistence for the inventory file.

use crate::{
    Category, CustomField, Entity, EntityKind, Manufacturer, Package, PackageType, Part, Result,
    StockroomError, Supplier,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// Current layout version written to `inventory_meta`.
pub const SCHEMA_VERSION: &str = "1";

const REQUIRED_TABLES: [&str; 6] = [
    "categories",
    "packages",
    "manufacturers",
    "parts",
    "operations",
    "inventory_meta",
];

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.execute(
            "INSERT OR REPLACE INTO inventory_meta (key, value) VALUES ('schema_version', ?)",
            [SCHEMA_VERSION],
        )?;
        Ok(Self { conn })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Validate database structure
        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type='table'
             AND name IN ('categories', 'packages', 'manufacturers', 'parts', 'operations', 'inventory_meta')",
            [],
            |row| row.get(0),
        )?;

        if table_count != REQUIRED_TABLES.len() as i64 {
            return Err(StockroomError::InvalidInventory(
                "Not a valid Stockroom database".to_string(),
            ));
        }

        // Migrate: add starred column if it doesn't exist
        let column_exists: bool = conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info('parts') WHERE name='starred'",
            [],
            |row| row.get::<_, i64>(0).map(|count| count > 0),
        )?;

        if !column_exists {
            log::info!("migrating parts table: adding starred column");
            conn.execute(
                "ALTER TABLE parts ADD COLUMN starred INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
        }

        let storage = Self { conn };
        match storage.meta("schema_version")? {
            Some(version) if version != SCHEMA_VERSION => {
                return Err(StockroomError::InvalidInventory(format!(
                    "Unsupported schema version {version}"
                )));
            }
            Some(_) => {}
            None => {
                storage.conn.execute(
                    "INSERT INTO inventory_meta (key, value) VALUES ('schema_version', ?)",
                    [SCHEMA_VERSION],
                )?;
            }
        }

        Ok(storage)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Reads a value from `inventory_meta`.
    fn meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM inventory_meta WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

/// A record kind with its own table.
///
/// Writers take a plain [`Connection`] so they can run inside a
/// [`rusqlite::Transaction`], which derefs to one.
pub trait Table: Entity + Sized {
    const TABLE: &'static str;

    /// All rows in insertion order.
    fn load_all(conn: &Connection) -> Result<Vec<Self>>;

    fn insert(&self, conn: &Connection) -> Result<()>;

    /// Overwrites the row stored under `old_name`, keeping its position.
    fn update(&self, conn: &Connection, old_name: &str) -> Result<()>;

    fn delete(conn: &Connection, name: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE name = ?", Self::TABLE);
        conn.execute(&sql, [name])?;
        Ok(())
    }
}

impl Table for Category {
    const TABLE: &'static str = "categories";

    fn load_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT name, parent, alias FROM categories ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Category {
                    name: row.get(0)?,
                    parent: row.get(1)?,
                    alias: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO categories (name, parent, alias) VALUES (?, ?, ?)",
            params![self.name, self.parent, self.alias],
        )?;
        Ok(())
    }

    fn update(&self, conn: &Connection, old_name: &str) -> Result<()> {
        conn.execute(
            "UPDATE categories SET name = ?, parent = ?, alias = ? WHERE name = ?",
            params![self.name, self.parent, self.alias, old_name],
        )?;
        Ok(())
    }
}

impl Table for Package {
    const TABLE: &'static str = "packages";

    fn load_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT name, pkg_type, alias FROM packages ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Package {
                    name: row.get(0)?,
                    pkg_type: PackageType::from_db(&row.get::<_, String>(1)?),
                    alias: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO packages (name, pkg_type, alias) VALUES (?, ?, ?)",
            params![self.name, self.pkg_type.as_str(), self.alias],
        )?;
        Ok(())
    }

    fn update(&self, conn: &Connection, old_name: &str) -> Result<()> {
        conn.execute(
            "UPDATE packages SET name = ?, pkg_type = ?, alias = ? WHERE name = ?",
            params![self.name, self.pkg_type.as_str(), self.alias, old_name],
        )?;
        Ok(())
    }
}

impl Table for Manufacturer {
    const TABLE: &'static str = "manufacturers";

    fn load_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT name, alias, url FROM manufacturers ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Manufacturer {
                    name: row.get(0)?,
                    alias: row.get(1)?,
                    url: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO manufacturers (name, alias, url) VALUES (?, ?, ?)",
            params![self.name, self.alias, self.url],
        )?;
        Ok(())
    }

    fn update(&self, conn: &Connection, old_name: &str) -> Result<()> {
        conn.execute(
            "UPDATE manufacturers SET name = ?, alias = ?, url = ? WHERE name = ?",
            params![self.name, self.alias, self.url, old_name],
        )?;
        Ok(())
    }
}

const PART_COLUMNS: &str = "name, quantity, category, package, package_detail, mfr, location, \
     alias, description, mfr_no, datasheet_link, product_link, image_link, \
     custom_fields_json, suppliers_json, starred";

/// Maps a `parts` row onto a [`Part`], returning the two JSON columns unparsed.
fn part_from_row(row: &Row) -> rusqlite::Result<(Part, String, String)> {
    let part = Part {
        name: row.get(0)?,
        quantity: row.get(1)?,
        category: row.get(2)?,
        package: row.get(3)?,
        package_detail: row.get(4)?,
        mfr: row.get(5)?,
        location: row.get(6)?,
        alias: row.get(7)?,
        description: row.get(8)?,
        mfr_no: row.get(9)?,
        datasheet_link: row.get(10)?,
        product_link: row.get(11)?,
        image_link: row.get(12)?,
        custom_fields: Vec::new(),
        suppliers: Vec::new(),
        starred: row.get(15)?,
    };
    Ok((part, row.get(13)?, row.get(14)?))
}

impl Table for Part {
    const TABLE: &'static str = "parts";

    fn load_all(conn: &Connection) -> Result<Vec<Self>> {
        let sql = format!("SELECT {PART_COLUMNS} FROM parts ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], part_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(mut part, fields_json, suppliers_json)| {
                part.custom_fields = serde_json::from_str::<Vec<CustomField>>(&fields_json)?;
                part.suppliers = serde_json::from_str::<Vec<Supplier>>(&suppliers_json)?;
                Ok(part)
            })
            .collect()
    }

    fn insert(&self, conn: &Connection) -> Result<()> {
        let sql = format!(
            "INSERT INTO parts ({PART_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        conn.execute(
            &sql,
            params![
                self.name,
                self.quantity,
                self.category,
                self.package,
                self.package_detail,
                self.mfr,
                self.location,
                self.alias,
                self.description,
                self.mfr_no,
                self.datasheet_link,
                self.product_link,
                self.image_link,
                serde_json::to_string(&self.custom_fields)?,
                serde_json::to_string(&self.suppliers)?,
                self.starred,
            ],
        )?;
        Ok(())
    }

    fn update(&self, conn: &Connection, old_name: &str) -> Result<()> {
        conn.execute(
            "UPDATE parts SET name = ?, quantity = ?, category = ?, package = ?, package_detail = ?,
                mfr = ?, location = ?, alias = ?, description = ?, mfr_no = ?, datasheet_link = ?,
                product_link = ?, image_link = ?, custom_fields_json = ?, suppliers_json = ?,
                starred = ?
             WHERE name = ?",
            params![
                self.name,
                self.quantity,
                self.category,
                self.package,
                self.package_detail,
                self.mfr,
                self.location,
                self.alias,
                self.description,
                self.mfr_no,
                self.datasheet_link,
                self.product_link,
                self.image_link,
                serde_json::to_string(&self.custom_fields)?,
                serde_json::to_string(&self.suppliers)?,
                self.starred,
                old_name,
            ],
        )?;
        Ok(())
    }
}

/// Re-points stored references to a renamed record. Returns the number of rows changed.
pub fn retarget_references(conn: &Connection, kind: EntityKind, old: &str, new: &str) -> Result<usize> {
    let changed = match kind {
        EntityKind::Category => {
            conn.execute(
                "UPDATE categories SET parent = ? WHERE parent = ?",
                [new, old],
            )? + conn.execute("UPDATE parts SET category = ? WHERE category = ?", [new, old])?
        }
        EntityKind::Package => {
            conn.execute("UPDATE parts SET package = ? WHERE package = ?", [new, old])?
        }
        EntityKind::Manufacturer => {
            conn.execute("UPDATE parts SET mfr = ? WHERE mfr = ?", [new, old])?
        }
        EntityKind::Part => 0,
    };
    Ok(changed)
}

pub fn set_part_quantity(conn: &Connection, name: &str, quantity: u32) -> Result<()> {
    conn.execute(
        "UPDATE parts SET quantity = ? WHERE name = ?",
        params![quantity, name],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn table_names(storage: &Storage) -> Vec<String> {
        storage
            .connection()
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_create_storage() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::create(temp.path()).unwrap();

        let tables = table_names(&storage);
        for table in REQUIRED_TABLES {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
        assert_eq!(storage.meta("schema_version").unwrap().as_deref(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_open_existing_storage() {
        let temp = NamedTempFile::new().unwrap();
        Storage::create(temp.path()).unwrap();

        let storage = Storage::open(temp.path()).unwrap();
        assert!(table_names(&storage).contains(&"parts".to_string()));
    }

    #[test]
    fn test_open_invalid_database() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "not a database").unwrap();

        assert!(Storage::open(temp.path()).is_err());
    }

    #[test]
    fn test_open_foreign_database_is_invalid_inventory() {
        let temp = NamedTempFile::new().unwrap();
        {
            let conn = Connection::open(temp.path()).unwrap();
            conn.execute("CREATE TABLE notes (id TEXT PRIMARY KEY)", []).unwrap();
        }
        assert!(matches!(
            Storage::open(temp.path()),
            Err(StockroomError::InvalidInventory(_))
        ));
    }

    #[test]
    fn test_open_rejects_newer_schema_version() {
        let temp = NamedTempFile::new().unwrap();
        {
            let storage = Storage::create(temp.path()).unwrap();
            storage
                .connection()
                .execute(
                    "UPDATE inventory_meta SET value = '99' WHERE key = 'schema_version'",
                    [],
                )
                .unwrap();
        }
        assert!(matches!(
            Storage::open(temp.path()),
            Err(StockroomError::InvalidInventory(_))
        ));
    }

    #[test]
    fn test_migration_adds_starred_column() {
        let temp = NamedTempFile::new().unwrap();
        {
            let conn = Connection::open(temp.path()).unwrap();
            conn.execute_batch(
                "CREATE TABLE categories (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE, parent TEXT, alias TEXT);
                 CREATE TABLE packages (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE, pkg_type TEXT NOT NULL, alias TEXT);
                 CREATE TABLE manufacturers (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE, alias TEXT, url TEXT);
                 CREATE TABLE parts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE,
                    quantity INTEGER NOT NULL, category TEXT NOT NULL, package TEXT,
                    package_detail TEXT, mfr TEXT, location TEXT, alias TEXT, description TEXT,
                    mfr_no TEXT, datasheet_link TEXT, product_link TEXT, image_link TEXT,
                    custom_fields_json TEXT NOT NULL DEFAULT '[]',
                    suppliers_json TEXT NOT NULL DEFAULT '[]');
                 CREATE TABLE operations (id INTEGER PRIMARY KEY);
                 CREATE TABLE inventory_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
                 INSERT INTO parts (name, quantity, category) VALUES ('R1', 4, 'Resistors');",
            )
            .unwrap();
        }

        let storage = Storage::open(temp.path()).unwrap();
        let parts = Part::load_all(storage.connection()).unwrap();
        assert_eq!(parts.len(), 1);
        assert!(!parts[0].starred);
        assert_eq!(storage.meta("schema_version").unwrap().as_deref(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_part_round_trips_through_table() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::create(temp.path()).unwrap();
        let conn = storage.connection();

        let mut part = Part::new("STM32F103", "MCU", 12);
        part.package = Some("LQFP-48".to_string());
        part.custom_fields.push(CustomField {
            name: "Flash".to_string(),
            field_type: "text".to_string(),
            value: "64K".to_string(),
        });
        part.suppliers.push(Supplier {
            name: "LCSC".to_string(),
            link: "https://lcsc.com".to_string(),
            price: Some(1.25),
            note: String::new(),
        });
        part.insert(conn).unwrap();

        let loaded = Part::load_all(conn).unwrap();
        assert_eq!(loaded, vec![part]);
    }

    #[test]
    fn test_update_keeps_row_order() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::create(temp.path()).unwrap();
        let conn = storage.connection();

        for name in ["SOT-23", "SOIC-8", "TO-92"] {
            Package::new(name, PackageType::Smt, None).insert(conn).unwrap();
        }
        Package::new("SOIC-8W", PackageType::Smt, None)
            .update(conn, "SOIC-8")
            .unwrap();
        Package::delete(conn, "SOT-23").unwrap();

        let names: Vec<_> = Package::load_all(conn)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["SOIC-8W", "TO-92"]);
    }

    #[test]
    fn test_retarget_category_references() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::create(temp.path()).unwrap();
        let conn = storage.connection();

        Category::new("Caps", None, None).insert(conn).unwrap();
        Category::new("Ceramic", Some("Caps"), None).insert(conn).unwrap();
        Part::new("C1", "Caps", 1).insert(conn).unwrap();

        let changed = retarget_references(conn, EntityKind::Category, "Caps", "Capacitors").unwrap();
        assert_eq!(changed, 2);
        let cats = Category::load_all(conn).unwrap();
        assert_eq!(cats[1].parent.as_deref(), Some("Capacitors"));
    }
}
