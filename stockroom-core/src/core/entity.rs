//! Record types for the four inventory entity kinds.
//!
//! Every record is keyed by its `name`. Records cross the command boundary as
//! JSON with snake_case keys, matching the payloads the front-end sends.
//! Unknown keys are rejected so that older, flattened record shapes surface as
//! payload errors instead of being half-read.

use crate::{Result, StockroomError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// The four kinds of record held by the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,
    Package,
    Manufacturer,
    Part,
}

impl EntityKind {
    /// Lower-case noun used in user-facing messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Package => "package",
            Self::Manufacturer => "manufacturer",
            Self::Part => "part",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Category => "Category",
            Self::Package => "Package",
            Self::Manufacturer => "Manufacturer",
            Self::Part => "Part",
        };
        f.write_str(s)
    }
}

/// A named record that can live in a [`Registry`](crate::Registry).
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync {
    /// The kind reported in errors and operation log entries.
    const KIND: EntityKind;

    /// The unique key of this record.
    fn name(&self) -> &str;

    /// Trims the name and turns empty optional strings into `None`.
    fn normalize(&mut self);

    /// Field-level checks that do not depend on other records.
    ///
    /// # Errors
    ///
    /// Returns [`StockroomError::ValidationFailed`] describing the first problem found.
    fn validate(&self) -> Result<()> {
        require_name(Self::KIND, self.name())
    }
}

/// A node in the category forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Category {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Category {
    pub fn new(name: &str, parent: Option<&str>, alias: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            alias: alias.map(str::to_string),
        }
    }
}

impl Entity for Category {
    const KIND: EntityKind = EntityKind::Category;

    fn name(&self) -> &str {
        &self.name
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        normalize_opt(&mut self.parent);
        normalize_opt(&mut self.alias);
        if let Some(parent) = self.parent.as_mut() {
            *parent = parent.trim().to_string();
        }
    }
}

/// Mounting style of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageType {
    /// Surface-mount.
    Smt,
    /// Through-hole.
    Tht,
    Others,
}

impl PackageType {
    /// Column value used in the `packages` table.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Smt => "smt",
            Self::Tht => "tht",
            Self::Others => "others",
        }
    }

    /// Parses a stored column value; anything unrecognised maps to [`PackageType::Others`].
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value {
            "smt" => Self::Smt,
            "tht" => Self::Tht,
            _ => Self::Others,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Package {
    pub name: String,
    pub pkg_type: PackageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Package {
    pub fn new(name: &str, pkg_type: PackageType, alias: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            pkg_type,
            alias: alias.map(str::to_string),
        }
    }
}

impl Entity for Package {
    const KIND: EntityKind = EntityKind::Package;

    fn name(&self) -> &str {
        &self.name
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        normalize_opt(&mut self.alias);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manufacturer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Manufacturer {
    pub fn new(name: &str, alias: Option<&str>, url: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            alias: alias.map(str::to_string),
            url: url.map(str::to_string),
        }
    }
}

impl Entity for Manufacturer {
    const KIND: EntityKind = EntityKind::Manufacturer;

    fn name(&self) -> &str {
        &self.name
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        normalize_opt(&mut self.alias);
        normalize_opt(&mut self.url);
    }
}

/// A user-defined attribute attached to a part.
///
/// `field_type` is an opaque tag chosen by the front-end; it is only required
/// to be non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomField {
    pub name: String,
    pub field_type: String,
    pub value: String,
}

/// A place a part can be bought from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Supplier {
    pub name: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default)]
    pub note: String,
}

/// A stocked electronic part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Part {
    pub name: String,
    pub quantity: u32,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfr_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasheet_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default)]
    pub suppliers: Vec<Supplier>,
    #[serde(default)]
    pub starred: bool,
}

impl Part {
    /// Creates a part with only the required fields set.
    pub fn new(name: &str, category: &str, quantity: u32) -> Self {
        Self {
            name: name.to_string(),
            quantity,
            category: category.to_string(),
            package: None,
            package_detail: None,
            mfr: None,
            location: None,
            alias: None,
            description: None,
            mfr_no: None,
            datasheet_link: None,
            product_link: None,
            image_link: None,
            custom_fields: Vec::new(),
            suppliers: Vec::new(),
            starred: false,
        }
    }
}

impl Entity for Part {
    const KIND: EntityKind = EntityKind::Part;

    fn name(&self) -> &str {
        &self.name
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.category = self.category.trim().to_string();
        for field in [
            &mut self.package,
            &mut self.package_detail,
            &mut self.mfr,
            &mut self.location,
            &mut self.alias,
            &mut self.description,
            &mut self.mfr_no,
            &mut self.datasheet_link,
            &mut self.product_link,
            &mut self.image_link,
        ] {
            normalize_opt(field);
        }
        if let Some(package) = self.package.as_mut() {
            *package = package.trim().to_string();
        }
        if let Some(mfr) = self.mfr.as_mut() {
            *mfr = mfr.trim().to_string();
        }
    }

    fn validate(&self) -> Result<()> {
        require_name(Self::KIND, &self.name)?;
        if self.category.is_empty() {
            return Err(StockroomError::ValidationFailed(format!(
                "Part '{}' must have a category",
                self.name
            )));
        }
        for field in &self.custom_fields {
            if field.name.trim().is_empty() || field.field_type.trim().is_empty() {
                return Err(StockroomError::ValidationFailed(format!(
                    "Custom fields of part '{}' need a name and a type",
                    self.name
                )));
            }
        }
        for supplier in &self.suppliers {
            if supplier.name.trim().is_empty() {
                return Err(StockroomError::ValidationFailed(format!(
                    "Suppliers of part '{}' need a name",
                    self.name
                )));
            }
            if supplier.price.is_some_and(|p| !p.is_finite() || p < 0.0) {
                return Err(StockroomError::ValidationFailed(format!(
                    "Supplier '{}' of part '{}' has an invalid price",
                    supplier.name, self.name
                )));
            }
        }
        Ok(())
    }
}

/// Read-only view of one category and its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub children: Vec<TreeNode>,
}

fn require_name(kind: EntityKind, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StockroomError::ValidationFailed(format!(
            "{kind} name must not be empty"
        )));
    }
    Ok(())
}

fn normalize_opt(value: &mut Option<String>) {
    if value.as_deref().is_some_and(|s| s.trim().is_empty()) {
        *value = None;
    }
}
