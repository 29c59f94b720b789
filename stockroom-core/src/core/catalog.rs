//! Part records, their outgoing references, and stock-level arithmetic.

use crate::{
    Category, Entity, EntityKind, Manufacturer, Package, Part, Registry, Result, StockroomError,
};

/// Read-only view of the registries a part may point into.
#[derive(Clone, Copy)]
pub struct References<'a> {
    pub categories: &'a Registry<Category>,
    pub packages: &'a Registry<Package>,
    pub manufacturers: &'a Registry<Manufacturer>,
}

impl References<'_> {
    /// Checks that the category, package and manufacturer named by `part` all exist.
    ///
    /// # Errors
    ///
    /// Returns [`StockroomError::InvalidReference`] for the first name that does not resolve.
    pub fn check(&self, part: &Part) -> Result<()> {
        if !self.categories.contains(&part.category) {
            return Err(StockroomError::invalid_reference(
                EntityKind::Category,
                &part.category,
            ));
        }
        if let Some(package) = &part.package {
            if !self.packages.contains(package) {
                return Err(StockroomError::invalid_reference(EntityKind::Package, package));
            }
        }
        if let Some(mfr) = &part.mfr {
            if !self.manufacturers.contains(mfr) {
                return Err(StockroomError::invalid_reference(EntityKind::Manufacturer, mfr));
            }
        }
        Ok(())
    }
}

/// The part collection together with the queries that cut across it.
#[derive(Debug, Clone, Default)]
pub struct PartCatalog {
    parts: Registry<Part>,
}

impl PartCatalog {
    pub fn new(parts: Registry<Part>) -> Self {
        Self { parts }
    }

    pub fn get(&self, name: &str) -> Result<&Part> {
        self.parts.get(name)
    }

    pub fn list(&self) -> &[Part] {
        self.parts.list()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Validates a new part: field checks, name uniqueness, then references.
    ///
    /// # Errors
    ///
    /// [`StockroomError::ValidationFailed`], [`StockroomError::Conflict`] or
    /// [`StockroomError::InvalidReference`].
    pub fn check_add(&self, part: &Part, refs: References<'_>) -> Result<()> {
        part.validate()?;
        self.parts.check_add(part)?;
        refs.check(part)
    }

    /// Validates replacing `old_name` with `part`.
    ///
    /// # Errors
    ///
    /// As [`check_add`](Self::check_add), plus [`StockroomError::NotFound`] if
    /// `old_name` does not exist.
    pub fn check_update(&self, old_name: &str, part: &Part, refs: References<'_>) -> Result<()> {
        part.validate()?;
        self.parts.check_replace(old_name, part)?;
        refs.check(part)
    }

    pub fn add(&mut self, part: Part) -> Result<()> {
        self.parts.add(part)
    }

    pub fn replace(&mut self, old_name: &str, part: Part) -> Result<Part> {
        self.parts.replace(old_name, part)
    }

    pub fn remove(&mut self, name: &str) -> Result<Part> {
        self.parts.remove(name)
    }

    /// Computes the stock level of `name` after applying `delta`, without storing it.
    ///
    /// # Errors
    ///
    /// Returns [`StockroomError::NotFound`] for an unknown part,
    /// [`StockroomError::Underflow`] if the result would be negative, or
    /// [`StockroomError::ValidationFailed`] if it would not fit in a `u32`.
    pub fn adjusted_quantity(&self, name: &str, delta: i64) -> Result<u32> {
        let part = self.parts.get(name)?;
        let too_large = || {
            StockroomError::ValidationFailed(format!("Quantity of '{name}' would exceed {}", u32::MAX))
        };
        let next = i64::from(part.quantity)
            .checked_add(delta)
            .ok_or_else(too_large)?;
        if next < 0 {
            return Err(StockroomError::Underflow {
                name: name.to_string(),
                available: part.quantity,
                requested: delta.unsigned_abs(),
            });
        }
        u32::try_from(next).map_err(|_| too_large())
    }

    pub fn set_quantity(&mut self, name: &str, quantity: u32) -> Result<()> {
        self.parts.get_mut(name)?.quantity = quantity;
        Ok(())
    }

    /// Parts whose `kind` reference equals `name`, in catalog order.
    pub fn referrers<'a>(
        &'a self,
        kind: EntityKind,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Part> + 'a {
        self.parts
            .iter()
            .filter(move |part| reference_of(part, kind) == Some(name))
    }

    /// Re-points every `kind` reference equal to `old` at `new`. Returns how many parts changed.
    pub fn retarget(&mut self, kind: EntityKind, old: &str, new: &str) -> usize {
        let mut changed = 0;
        for part in self.parts.iter_mut() {
            let slot = match kind {
                EntityKind::Category => Some(&mut part.category),
                EntityKind::Package => part.package.as_mut(),
                EntityKind::Manufacturer => part.mfr.as_mut(),
                EntityKind::Part => None,
            };
            if let Some(value) = slot {
                if *value == old {
                    *value = new.to_string();
                    changed += 1;
                }
            }
        }
        changed
    }
}

fn reference_of(part: &Part, kind: EntityKind) -> Option<&str> {
    match kind {
        EntityKind::Category => Some(part.category.as_str()),
        EntityKind::Package => part.package.as_deref(),
        EntityKind::Manufacturer => part.mfr.as_deref(),
        EntityKind::Part => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PackageType;

    struct Fixture {
        categories: Registry<Category>,
        packages: Registry<Package>,
        manufacturers: Registry<Manufacturer>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut categories = Registry::new();
            categories.add(Category::new("Resistors", None, None)).unwrap();
            let mut packages = Registry::new();
            packages.add(Package::new("0603", PackageType::Smt, None)).unwrap();
            let mut manufacturers = Registry::new();
            manufacturers.add(Manufacturer::new("Yageo", None, None)).unwrap();
            Self {
                categories,
                packages,
                manufacturers,
            }
        }

        fn refs(&self) -> References<'_> {
            References {
                categories: &self.categories,
                packages: &self.packages,
                manufacturers: &self.manufacturers,
            }
        }
    }

    fn resistor(name: &str, quantity: u32) -> Part {
        let mut part = Part::new(name, "Resistors", quantity);
        part.package = Some("0603".to_string());
        part.mfr = Some("Yageo".to_string());
        part
    }

    #[test]
    fn test_check_add_resolves_references() {
        let fx = Fixture::new();
        let catalog = PartCatalog::default();
        catalog.check_add(&resistor("R1", 1), fx.refs()).unwrap();

        let mut bad = resistor("R2", 1);
        bad.package = Some("TO-220".to_string());
        let err = catalog.check_add(&bad, fx.refs()).unwrap_err();
        assert!(matches!(
            err,
            StockroomError::InvalidReference { kind: EntityKind::Package, .. }
        ));
    }

    #[test]
    fn test_adjusted_quantity_underflow() {
        let mut catalog = PartCatalog::default();
        catalog.add(resistor("R1", 3)).unwrap();
        let err = catalog.adjusted_quantity("R1", -5).unwrap_err();
        assert!(matches!(
            err,
            StockroomError::Underflow { available: 3, requested: 5, .. }
        ));
        assert_eq!(catalog.adjusted_quantity("R1", 2).unwrap(), 5);
        assert_eq!(catalog.adjusted_quantity("R1", -3).unwrap(), 0);
    }

    #[test]
    fn test_adjusted_quantity_overflow() {
        let mut catalog = PartCatalog::default();
        catalog.add(resistor("R1", u32::MAX)).unwrap();
        assert!(matches!(
            catalog.adjusted_quantity("R1", 1),
            Err(StockroomError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_adjusted_quantity_extreme_deltas() {
        let mut catalog = PartCatalog::default();
        catalog.add(resistor("R1", 3)).unwrap();
        assert!(matches!(
            catalog.adjusted_quantity("R1", i64::MAX),
            Err(StockroomError::ValidationFailed(_))
        ));
        assert!(matches!(
            catalog.adjusted_quantity("R1", i64::MIN),
            Err(StockroomError::Underflow { available: 3, .. })
        ));
        assert_eq!(catalog.get("R1").unwrap().quantity, 3);
    }

    #[test]
    fn test_retarget_and_referrers() {
        let mut catalog = PartCatalog::default();
        catalog.add(resistor("R1", 1)).unwrap();
        catalog.add(resistor("R2", 1)).unwrap();
        catalog.add(Part::new("C1", "Capacitors", 1)).unwrap();

        assert_eq!(catalog.referrers(EntityKind::Package, "0603").count(), 2);
        assert_eq!(catalog.retarget(EntityKind::Package, "0603", "SMD 0603"), 2);
        assert_eq!(catalog.referrers(EntityKind::Package, "0603").count(), 0);
        assert_eq!(catalog.referrers(EntityKind::Package, "SMD 0603").count(), 2);
        assert_eq!(catalog.retarget(EntityKind::Category, "Capacitors", "Caps"), 1);
        assert_eq!(catalog.get("C1").unwrap().category, "Caps");
    }
}
