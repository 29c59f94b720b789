//! Insertion-ordered, name-keyed record collections.

use crate::{Entity, Result, StockroomError};
use std::collections::HashMap;

/// Holds the records of one entity kind, unique by name, in insertion order.
///
/// A rename through [`replace`](Self::replace) keeps the record in its
/// original slot, so listings stay stable across renames.
#[derive(Debug, Clone)]
pub struct Registry<T: Entity> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Entity> Default for Registry<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Entity> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from records already known to be unique, e.g. rows loaded from storage.
    ///
    /// # Errors
    ///
    /// Returns [`StockroomError::Conflict`] if two records share a name.
    pub fn from_records(records: Vec<T>) -> Result<Self> {
        let mut registry = Self::new();
        for record in records {
            registry.add(record)?;
        }
        Ok(registry)
    }

    /// Looks up a record by name.
    ///
    /// # Errors
    ///
    /// Returns [`StockroomError::NotFound`] if `name` is not registered.
    pub fn get(&self, name: &str) -> Result<&T> {
        self.index
            .get(name)
            .map(|&i| &self.items[i])
            .ok_or_else(|| StockroomError::not_found(T::KIND, name))
    }

    /// Mutable access for in-place edits. Callers must not change the record's name.
    pub(crate) fn get_mut(&mut self, name: &str) -> Result<&mut T> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.items[i]),
            None => Err(StockroomError::not_found(T::KIND, name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn list(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Same contract as [`get_mut`](Self::get_mut): names stay untouched.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Checks that `item` could be added without mutating anything.
    ///
    /// # Errors
    ///
    /// Returns [`StockroomError::Conflict`] if the name is taken.
    pub fn check_add(&self, item: &T) -> Result<()> {
        if self.contains(item.name()) {
            return Err(StockroomError::conflict(T::KIND, item.name()));
        }
        Ok(())
    }

    /// Checks that `old_name` could be replaced by `item` without mutating anything.
    ///
    /// # Errors
    ///
    /// Returns [`StockroomError::NotFound`] if `old_name` is absent, or
    /// [`StockroomError::Conflict`] if `item` is renamed onto another record.
    pub fn check_replace(&self, old_name: &str, item: &T) -> Result<()> {
        if !self.contains(old_name) {
            return Err(StockroomError::not_found(T::KIND, old_name));
        }
        if item.name() != old_name && self.contains(item.name()) {
            return Err(StockroomError::conflict(T::KIND, item.name()));
        }
        Ok(())
    }

    /// Appends `item`.
    ///
    /// # Errors
    ///
    /// Returns [`StockroomError::Conflict`] if the name is taken.
    pub fn add(&mut self, item: T) -> Result<()> {
        self.check_add(&item)?;
        self.index.insert(item.name().to_string(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    /// Replaces the record stored under `old_name`, renaming it if `item` carries a new name.
    ///
    /// Returns the previous record.
    ///
    /// # Errors
    ///
    /// See [`check_replace`](Self::check_replace).
    pub fn replace(&mut self, old_name: &str, item: T) -> Result<T> {
        self.check_replace(old_name, &item)?;
        let slot = self
            .index
            .remove(old_name)
            .ok_or_else(|| StockroomError::not_found(T::KIND, old_name))?;
        self.index.insert(item.name().to_string(), slot);
        Ok(std::mem::replace(&mut self.items[slot], item))
    }

    /// Removes and returns the record stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StockroomError::NotFound`] if `name` is not registered.
    pub fn remove(&mut self, name: &str) -> Result<T> {
        let slot = self
            .index
            .remove(name)
            .ok_or_else(|| StockroomError::not_found(T::KIND, name))?;
        let removed = self.items.remove(slot);
        for i in self.index.values_mut() {
            if *i > slot {
                *i -= 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Manufacturer, Package, PackageType};

    fn pkg(name: &str) -> Package {
        Package::new(name, PackageType::Smt, None)
    }

    #[test]
    fn test_add_then_get() {
        let mut reg = Registry::new();
        reg.add(pkg("SOT-23")).unwrap();
        assert_eq!(reg.get("SOT-23").unwrap(), &pkg("SOT-23"));
    }

    #[test]
    fn test_duplicate_add_is_conflict_and_keeps_original() {
        let mut reg = Registry::new();
        reg.add(Manufacturer::new("TI", Some("Texas"), None)).unwrap();
        let err = reg.add(Manufacturer::new("TI", None, None)).unwrap_err();
        assert!(matches!(err, StockroomError::Conflict { .. }));
        assert_eq!(reg.get("TI").unwrap().alias.as_deref(), Some("Texas"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_replace_renames_in_place() {
        let mut reg = Registry::new();
        for name in ["A", "B", "C"] {
            reg.add(pkg(name)).unwrap();
        }
        let old = reg.replace("B", pkg("B2")).unwrap();
        assert_eq!(old.name, "B");
        let names: Vec<_> = reg.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["A", "B2", "C"]);
        assert!(matches!(reg.get("B"), Err(StockroomError::NotFound { .. })));
    }

    #[test]
    fn test_replace_onto_existing_name_is_conflict() {
        let mut reg = Registry::new();
        reg.add(pkg("A")).unwrap();
        reg.add(pkg("B")).unwrap();
        let err = reg.replace("A", pkg("B")).unwrap_err();
        assert!(matches!(err, StockroomError::Conflict { .. }));
        assert!(reg.contains("A"));
    }

    #[test]
    fn test_replace_missing_is_not_found() {
        let mut reg: Registry<Package> = Registry::new();
        assert!(matches!(
            reg.replace("nope", pkg("x")),
            Err(StockroomError::NotFound { .. })
        ));
    }

    #[test]
    fn test_remove_reindexes_following_records() {
        let mut reg = Registry::new();
        for name in ["A", "B", "C"] {
            reg.add(pkg(name)).unwrap();
        }
        reg.remove("A").unwrap();
        assert_eq!(reg.get("C").unwrap().name, "C");
        reg.replace("C", pkg("D")).unwrap();
        let names: Vec<_> = reg.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["B", "D"]);
    }
}
