//! Inventory backup as a single JSON or YAML document.

use crate::{Category, Inventory, Manufacturer, Package, Part, Result, StockroomError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Version of the backup layout written by [`export_inventory`].
pub const EXPORT_VERSION: u32 = 1;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Encoding of a backup file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupFormat {
    Json,
    Yaml,
}

impl BackupFormat {
    /// `.yaml` and `.yml` files are YAML; anything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }
}

/// Top-level structure of a backup file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInventory {
    pub version: u32,
    pub app_version: String,
    pub categories: Vec<Category>,
    pub packages: Vec<Package>,
    pub manufacturers: Vec<Manufacturer>,
    pub parts: Vec<Part>,
}

/// Record counts written by [`export_inventory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub path: String,
    pub categories: usize,
    pub packages: usize,
    pub manufacturers: usize,
    pub parts: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCount {
    pub imported: usize,
    pub skipped: usize,
}

/// Outcome of [`import_inventory`], per record kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub app_version: String,
    pub categories: ImportCount,
    pub packages: ImportCount,
    pub manufacturers: ImportCount,
    pub parts: ImportCount,
}

/// Writes every record of `inventory` to `path`, overwriting any existing file.
/// The encoding follows [`BackupFormat::from_path`].
///
/// # Errors
///
/// Returns [`StockroomError::Io`], [`StockroomError::Json`] or
/// [`StockroomError::Yaml`] if the file cannot be written.
pub fn export_inventory(inventory: &Inventory, path: &Path) -> Result<ExportSummary> {
    let snapshot = inventory.snapshot();
    let doc = ExportInventory {
        version: EXPORT_VERSION,
        app_version: APP_VERSION.to_string(),
        categories: snapshot.categories,
        packages: snapshot.packages,
        manufacturers: snapshot.manufacturers,
        parts: snapshot.parts,
    };

    match BackupFormat::from_path(path) {
        BackupFormat::Json => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &doc)?;
        }
        BackupFormat::Yaml => fs::write(path, serde_yml::to_string(&doc)?)?,
    }

    let summary = ExportSummary {
        path: path.display().to_string(),
        categories: doc.categories.len(),
        packages: doc.packages.len(),
        manufacturers: doc.manufacturers.len(),
        parts: doc.parts.len(),
    };
    info!(
        "exported {} categories, {} packages, {} manufacturers, {} parts to {}",
        summary.categories, summary.packages, summary.manufacturers, summary.parts, summary.path
    );
    Ok(summary)
}

/// Reads a backup and adds its records to `inventory`.
///
/// Categories go in parents first, followed by packages, manufacturers and
/// parts. A record whose name is taken, or that is rejected by validation, is
/// skipped and counted; the remaining records are still imported.
///
/// # Errors
///
/// Returns [`StockroomError::InvalidInventory`] for an unsupported backup
/// version, [`StockroomError::Io`], [`StockroomError::Json`] or
/// [`StockroomError::Yaml`] if the file cannot be read, or the first storage
/// failure hit while adding records.
pub fn import_inventory(inventory: &Inventory, path: &Path) -> Result<ImportResult> {
    let doc: ExportInventory = match BackupFormat::from_path(path) {
        BackupFormat::Json => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        BackupFormat::Yaml => serde_yml::from_str(&fs::read_to_string(path)?)?,
    };
    if doc.version == 0 || doc.version > EXPORT_VERSION {
        return Err(StockroomError::InvalidInventory(format!(
            "Unsupported backup version {}",
            doc.version
        )));
    }

    let mut result = ImportResult {
        app_version: doc.app_version,
        categories: ImportCount::default(),
        packages: ImportCount::default(),
        manufacturers: ImportCount::default(),
        parts: ImportCount::default(),
    };

    // A child can only be added once its parent exists, so keep sweeping
    // until a pass makes no progress.
    let mut pending = doc.categories;
    loop {
        let before = pending.len();
        let mut deferred = Vec::new();
        for category in pending {
            let ready = match &category.parent {
                Some(parent) => inventory.get_category(parent).is_ok(),
                None => true,
            };
            if ready {
                let name = category.name.clone();
                tally(&mut result.categories, &name, inventory.add_category(category))?;
            } else {
                deferred.push(category);
            }
        }
        pending = deferred;
        if pending.is_empty() || pending.len() == before {
            break;
        }
    }
    for category in pending {
        warn!("skipping category '{}': parent never resolved", category.name);
        result.categories.skipped += 1;
    }

    for package in doc.packages {
        let name = package.name.clone();
        tally(&mut result.packages, &name, inventory.add_package(package))?;
    }
    for manufacturer in doc.manufacturers {
        let name = manufacturer.name.clone();
        tally(&mut result.manufacturers, &name, inventory.add_manufacturer(manufacturer))?;
    }
    for part in doc.parts {
        let name = part.name.clone();
        tally(&mut result.parts, &name, inventory.add_part(part))?;
    }

    info!(
        "imported {} categories, {} packages, {} manufacturers, {} parts from {}",
        result.categories.imported,
        result.packages.imported,
        result.manufacturers.imported,
        result.parts.imported,
        path.display()
    );
    Ok(result)
}

fn tally(count: &mut ImportCount, name: &str, outcome: Result<()>) -> Result<()> {
    match outcome {
        Ok(()) => count.imported += 1,
        Err(e) if e.is_storage_failure() => return Err(e),
        Err(e) => {
            warn!("skipping '{name}': {e}");
            count.skipped += 1;
        }
    }
    Ok(())
}
