//! The inventory: every registry, the category tree and the backing file behind one lock.

use crate::core::storage::{self, Table};
use crate::{
    Category, CategoryTree, Entity, EntityKind, Manufacturer, Operation, OperationLog,
    OperationSummary, Package, Part, PartCatalog, PurgeStrategy, References, Registry, Result,
    StockroomError, Storage, TreeNode,
};
use log::{debug, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory view of the inventory file.
#[derive(Debug, Default)]
struct State {
    categories: Registry<Category>,
    packages: Registry<Package>,
    manufacturers: Registry<Manufacturer>,
    catalog: PartCatalog,
    tree: CategoryTree,
}

impl State {
    fn references(&self) -> References<'_> {
        References {
            categories: &self.categories,
            packages: &self.packages,
            manufacturers: &self.manufacturers,
        }
    }

    fn rebuild_tree(&mut self) {
        self.tree = CategoryTree::build(self.categories.list());
    }
}

/// Point-in-time copy of every record, taken under a single read lock.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub categories: Vec<Category>,
    pub packages: Vec<Package>,
    pub manufacturers: Vec<Manufacturer>,
    pub parts: Vec<Part>,
}

/// Kinds that parts point at by name and that live in their own registry.
trait PartReference: Table {
    fn registry(state: &State) -> &Registry<Self>;
    fn registry_mut(state: &mut State) -> &mut Registry<Self>;
}

impl PartReference for Package {
    fn registry(state: &State) -> &Registry<Self> {
        &state.packages
    }

    fn registry_mut(state: &mut State) -> &mut Registry<Self> {
        &mut state.packages
    }
}

impl PartReference for Manufacturer {
    fn registry(state: &State) -> &Registry<Self> {
        &state.manufacturers
    }

    fn registry_mut(state: &mut State) -> &mut Registry<Self> {
        &mut state.manufacturers
    }
}

/// An open Stockroom inventory backed by a SQLite database.
///
/// `Inventory` is the consistency boundary for all record mutations. Reads
/// take a shared lock on the in-memory state and may run in parallel. Every
/// mutation takes the exclusive lock, validates the request in full, writes
/// the change and its [`Operation`] in one SQLite transaction, and only then
/// applies it to memory. A rejected or failed mutation therefore leaves both
/// the file and the in-memory view untouched.
///
/// The type is `Send + Sync`; share it as `Arc<Inventory>`.
pub struct Inventory {
    path: PathBuf,
    state: RwLock<State>,
    // Always locked after `state`.
    storage: Mutex<Storage>,
    operation_log: OperationLog,
}

impl Inventory {
    /// Creates a new, empty inventory database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StockroomError::Database`] for any SQLite failure.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = Storage::create(&path)?;
        info!("created inventory at {}", path.as_ref().display());
        Self::from_storage(path.as_ref(), storage)
    }

    /// Opens an existing inventory database and loads every record into memory.
    ///
    /// # Errors
    ///
    /// Returns [`StockroomError::InvalidInventory`] if the file is not a
    /// Stockroom database, or [`StockroomError::Database`] /
    /// [`StockroomError::Json`] if stored rows cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = Storage::open(&path)?;
        let inventory = Self::from_storage(path.as_ref(), storage)?;
        info!(
            "opened inventory at {} ({} parts)",
            path.as_ref().display(),
            inventory.read_state().catalog.len()
        );
        Ok(inventory)
    }

    /// Opens `path` if it holds data, otherwise creates a fresh inventory there.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let has_data = std::fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);
        if has_data {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    fn from_storage(path: &Path, storage: Storage) -> Result<Self> {
        let conn = storage.connection();
        let categories = Registry::from_records(Category::load_all(conn)?)?;
        let mut state = State {
            categories,
            packages: Registry::from_records(Package::load_all(conn)?)?,
            manufacturers: Registry::from_records(Manufacturer::load_all(conn)?)?,
            catalog: PartCatalog::new(Registry::from_records(Part::load_all(conn)?)?),
            tree: CategoryTree::default(),
        };
        state.rebuild_tree();

        Ok(Self {
            path: path.to_path_buf(),
            state: RwLock::new(state),
            storage: Mutex::new(storage),
            operation_log: OperationLog::new(PurgeStrategy::LocalOnly { keep_last: 1000 }),
        })
    }

    /// Returns the file path this inventory was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_storage(&self) -> MutexGuard<'_, Storage> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `write` and logs `op` inside one transaction. Callers hold the state write lock.
    fn persist<F>(&self, op: &Operation, write: F) -> Result<()>
    where
        F: FnOnce(&Connection) -> Result<()>,
    {
        let mut storage = self.lock_storage();
        let tx = storage.connection_mut().transaction()?;
        write(&tx)?;
        self.operation_log.log(&tx, op)?;
        self.operation_log.purge_if_needed(&tx)?;
        tx.commit()?;
        Ok(())
    }

    /// Copies every record under a single read lock.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.read_state();
        Snapshot {
            categories: state.categories.list().to_vec(),
            packages: state.packages.list().to_vec(),
            manufacturers: state.manufacturers.list().to_vec(),
            parts: state.catalog.list().to_vec(),
        }
    }

    // ── Categories ──────────────────────────────────────────────

    pub fn get_category(&self, name: &str) -> Result<Category> {
        self.read_state().categories.get(name).cloned()
    }

    pub fn list_categories(&self) -> Vec<Category> {
        self.read_state().categories.list().to_vec()
    }

    /// Adds a category. Its parent, if any, must already exist.
    ///
    /// # Errors
    ///
    /// [`StockroomError::Conflict`] for a taken name,
    /// [`StockroomError::InvalidReference`] for a missing parent, or
    /// [`StockroomError::CycleDetected`] if the category names itself as parent.
    pub fn add_category(&self, mut category: Category) -> Result<()> {
        category.normalize();
        category.validate()?;

        let mut guard = self.write_state();
        let state = &mut *guard;
        state.categories.check_add(&category)?;
        if let Some(parent) = &category.parent {
            if *parent == category.name {
                return Err(StockroomError::CycleDetected {
                    name: category.name.clone(),
                    parent: parent.clone(),
                });
            }
            if !state.categories.contains(parent) {
                return Err(StockroomError::invalid_reference(EntityKind::Category, parent));
            }
        }

        let op = Operation::create(EntityKind::Category, &category.name);
        self.persist(&op, |conn| category.insert(conn))?;
        debug!("added category '{}'", category.name);
        state.categories.add(category)?;
        state.rebuild_tree();
        Ok(())
    }

    /// Replaces the category stored under `old_name`.
    ///
    /// A rename re-points every child category and every part that referenced
    /// the old name, in the same transaction.
    ///
    /// # Errors
    ///
    /// [`StockroomError::NotFound`], [`StockroomError::Conflict`],
    /// [`StockroomError::InvalidReference`] for a missing parent, or
    /// [`StockroomError::CycleDetected`] if the new parent is the category itself
    /// or one of its descendants.
    pub fn update_category(&self, old_name: &str, mut category: Category) -> Result<()> {
        category.normalize();
        category.validate()?;

        let mut guard = self.write_state();
        let state = &mut *guard;
        state.categories.check_replace(old_name, &category)?;
        if let Some(parent) = &category.parent {
            let cycle = || StockroomError::CycleDetected {
                name: category.name.clone(),
                parent: parent.clone(),
            };
            if *parent == category.name || parent == old_name {
                return Err(cycle());
            }
            if !state.categories.contains(parent) {
                return Err(StockroomError::invalid_reference(EntityKind::Category, parent));
            }
            if state.tree.would_cycle(old_name, parent) {
                return Err(cycle());
            }
        }

        let new_name = category.name.clone();
        let renamed = new_name != old_name;
        let cascaded = if renamed {
            state.tree.children(old_name).len()
                + state.catalog.referrers(EntityKind::Category, old_name).count()
        } else {
            0
        };

        let op = Operation::update(EntityKind::Category, old_name, &new_name, cascaded);
        self.persist(&op, |conn| {
            category.update(conn, old_name)?;
            if renamed {
                storage::retarget_references(conn, EntityKind::Category, old_name, &new_name)?;
            }
            Ok(())
        })?;

        state.categories.replace(old_name, category)?;
        if renamed {
            for child in state.categories.iter_mut() {
                if child.parent.as_deref() == Some(old_name) {
                    child.parent = Some(new_name.clone());
                }
            }
            state.catalog.retarget(EntityKind::Category, old_name, &new_name);
            debug!("renamed category '{old_name}' to '{new_name}' ({cascaded} references)");
        } else {
            debug!("updated category '{new_name}'");
        }
        state.rebuild_tree();
        Ok(())
    }

    /// Deletes a category that has no child categories and no parts.
    ///
    /// # Errors
    ///
    /// [`StockroomError::NotFound`] or [`StockroomError::ReferencedElsewhere`].
    pub fn delete_category(&self, name: &str) -> Result<()> {
        let mut guard = self.write_state();
        let state = &mut *guard;
        state.categories.get(name)?;
        let referrer = state
            .tree
            .children(name)
            .first()
            .map(|child| format!("category '{child}'"))
            .or_else(|| {
                state
                    .catalog
                    .referrers(EntityKind::Category, name)
                    .next()
                    .map(|part| format!("part '{}'", part.name))
            });
        if let Some(referrer) = referrer {
            return Err(StockroomError::ReferencedElsewhere {
                kind: EntityKind::Category,
                name: name.to_string(),
                referrer,
            });
        }

        let op = Operation::delete(EntityKind::Category, name);
        self.persist(&op, |conn| Category::delete(conn, name))?;
        state.categories.remove(name)?;
        state.rebuild_tree();
        debug!("deleted category '{name}'");
        Ok(())
    }

    /// Returns the whole category forest.
    pub fn category_tree(&self) -> Vec<TreeNode> {
        self.read_state().tree.tree()
    }

    pub fn category_subtree(&self, name: &str) -> Result<TreeNode> {
        self.read_state().tree.subtree(name)
    }

    /// Names from the immediate parent of `name` up to its root.
    pub fn category_ancestors(&self, name: &str) -> Result<Vec<String>> {
        self.read_state().tree.ancestors(name)
    }

    // ── Packages and manufacturers ──────────────────────────────

    pub fn get_package(&self, name: &str) -> Result<Package> {
        self.read_state().packages.get(name).cloned()
    }

    pub fn list_packages(&self) -> Vec<Package> {
        self.read_state().packages.list().to_vec()
    }

    pub fn add_package(&self, package: Package) -> Result<()> {
        self.add_reference(package)
    }

    /// Replaces the package stored under `old_name`; a rename follows into every part.
    pub fn update_package(&self, old_name: &str, package: Package) -> Result<()> {
        self.update_reference(old_name, package)
    }

    pub fn delete_package(&self, name: &str) -> Result<()> {
        self.delete_reference::<Package>(name)
    }

    pub fn get_manufacturer(&self, name: &str) -> Result<Manufacturer> {
        self.read_state().manufacturers.get(name).cloned()
    }

    pub fn list_manufacturers(&self) -> Vec<Manufacturer> {
        self.read_state().manufacturers.list().to_vec()
    }

    pub fn add_manufacturer(&self, manufacturer: Manufacturer) -> Result<()> {
        self.add_reference(manufacturer)
    }

    /// Replaces the manufacturer stored under `old_name`; a rename follows into every part.
    pub fn update_manufacturer(&self, old_name: &str, manufacturer: Manufacturer) -> Result<()> {
        self.update_reference(old_name, manufacturer)
    }

    pub fn delete_manufacturer(&self, name: &str) -> Result<()> {
        self.delete_reference::<Manufacturer>(name)
    }

    fn add_reference<T: PartReference>(&self, mut item: T) -> Result<()> {
        item.normalize();
        item.validate()?;

        let mut state = self.write_state();
        T::registry(&state).check_add(&item)?;

        let op = Operation::create(T::KIND, item.name());
        self.persist(&op, |conn| item.insert(conn))?;
        debug!("added {} '{}'", T::KIND.label(), item.name());
        T::registry_mut(&mut state).add(item)
    }

    fn update_reference<T: PartReference>(&self, old_name: &str, mut item: T) -> Result<()> {
        item.normalize();
        item.validate()?;

        let mut guard = self.write_state();
        let state = &mut *guard;
        T::registry(state).check_replace(old_name, &item)?;

        let new_name = item.name().to_string();
        let renamed = new_name != old_name;
        let cascaded = if renamed {
            state.catalog.referrers(T::KIND, old_name).count()
        } else {
            0
        };

        let op = Operation::update(T::KIND, old_name, &new_name, cascaded);
        self.persist(&op, |conn| {
            item.update(conn, old_name)?;
            if renamed {
                storage::retarget_references(conn, T::KIND, old_name, &new_name)?;
            }
            Ok(())
        })?;

        T::registry_mut(state).replace(old_name, item)?;
        if renamed {
            state.catalog.retarget(T::KIND, old_name, &new_name);
        }
        debug!("updated {} '{old_name}' -> '{new_name}'", T::KIND.label());
        Ok(())
    }

    fn delete_reference<T: PartReference>(&self, name: &str) -> Result<()> {
        let mut guard = self.write_state();
        let state = &mut *guard;
        T::registry(state).get(name)?;
        if let Some(part) = state.catalog.referrers(T::KIND, name).next() {
            return Err(StockroomError::ReferencedElsewhere {
                kind: T::KIND,
                name: name.to_string(),
                referrer: format!("part '{}'", part.name),
            });
        }

        let op = Operation::delete(T::KIND, name);
        self.persist(&op, |conn| T::delete(conn, name))?;
        T::registry_mut(state).remove(name)?;
        debug!("deleted {} '{name}'", T::KIND.label());
        Ok(())
    }

    // ── Parts ───────────────────────────────────────────────────

    pub fn get_part(&self, name: &str) -> Result<Part> {
        self.read_state().catalog.get(name).cloned()
    }

    pub fn list_parts(&self) -> Vec<Part> {
        self.read_state().catalog.list().to_vec()
    }

    /// Adds a part whose category, package and manufacturer must already exist.
    ///
    /// # Errors
    ///
    /// [`StockroomError::ValidationFailed`], [`StockroomError::Conflict`] or
    /// [`StockroomError::InvalidReference`].
    pub fn add_part(&self, mut part: Part) -> Result<()> {
        part.normalize();

        let mut guard = self.write_state();
        let state = &mut *guard;
        state.catalog.check_add(&part, state.references())?;

        let op = Operation::create(EntityKind::Part, &part.name);
        self.persist(&op, |conn| part.insert(conn))?;
        debug!("added part '{}' (qty {})", part.name, part.quantity);
        state.catalog.add(part)
    }

    /// Replaces the part stored under `old_name`, renaming it if `part.name` differs.
    pub fn update_part(&self, old_name: &str, mut part: Part) -> Result<()> {
        part.normalize();

        let mut guard = self.write_state();
        let state = &mut *guard;
        state.catalog.check_update(old_name, &part, state.references())?;

        let op = Operation::update(EntityKind::Part, old_name, &part.name, 0);
        self.persist(&op, |conn| part.update(conn, old_name))?;
        debug!("updated part '{old_name}' -> '{}'", part.name);
        state.catalog.replace(old_name, part)?;
        Ok(())
    }

    pub fn delete_part(&self, name: &str) -> Result<()> {
        let mut guard = self.write_state();
        let state = &mut *guard;
        state.catalog.get(name)?;

        let op = Operation::delete(EntityKind::Part, name);
        self.persist(&op, |conn| Part::delete(conn, name))?;
        state.catalog.remove(name)?;
        debug!("deleted part '{name}'");
        Ok(())
    }

    /// Adds `delta` (which may be negative) to the stock level of `name` and
    /// returns the new quantity.
    ///
    /// The read-modify-write happens under the write lock, so concurrent
    /// adjustments of the same part never lose an update.
    ///
    /// # Errors
    ///
    /// [`StockroomError::NotFound`], [`StockroomError::Underflow`] if the
    /// result would be negative, or [`StockroomError::ValidationFailed`] if it
    /// would exceed `u32::MAX`. The stored quantity is unchanged on error.
    pub fn modify_part_quantity(&self, name: &str, delta: i64) -> Result<u32> {
        let mut guard = self.write_state();
        let state = &mut *guard;
        let quantity = state.catalog.adjusted_quantity(name, delta)?;

        let op = Operation::adjust(name, delta, quantity);
        self.persist(&op, |conn| storage::set_part_quantity(conn, name, quantity))?;
        state.catalog.set_quantity(name, quantity)?;
        debug!("adjusted part '{name}' by {delta} to {quantity}");
        Ok(quantity)
    }

    // ── History ─────────────────────────────────────────────────

    /// Returns logged operations, newest first.
    pub fn list_operations(&self, limit: Option<usize>) -> Result<Vec<OperationSummary>> {
        let storage = self.lock_storage();
        self.operation_log.list(storage.connection(), limit)
    }
}
