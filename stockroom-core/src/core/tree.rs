//! Parent/child index over the category forest.

use crate::{Category, EntityKind, Result, StockroomError, TreeNode};
use std::collections::HashMap;

/// Adjacency derived from the `parent` links of all categories.
///
/// The index is rebuilt from the category registry after every category
/// mutation. Roots and children keep the insertion order of the categories,
/// not alphabetical order.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    roots: Vec<String>,
    children: HashMap<String, Vec<String>>,
    parents: HashMap<String, Option<String>>,
}

impl CategoryTree {
    /// Builds the index from categories in insertion order.
    ///
    /// A category whose parent is missing is listed as a root so it stays reachable.
    pub fn build<'a, I>(categories: I) -> Self
    where
        I: IntoIterator<Item = &'a Category>,
    {
        let categories: Vec<&Category> = categories.into_iter().collect();
        let mut tree = Self::default();
        for cat in &categories {
            tree.parents.insert(cat.name.clone(), cat.parent.clone());
            tree.children.entry(cat.name.clone()).or_default();
        }
        for cat in &categories {
            match &cat.parent {
                Some(parent) if tree.parents.contains_key(parent) => {
                    tree.children
                        .entry(parent.clone())
                        .or_default()
                        .push(cat.name.clone());
                }
                Some(parent) => {
                    log::warn!("category '{}' points at missing parent '{parent}'", cat.name);
                    tree.roots.push(cat.name.clone());
                }
                None => tree.roots.push(cat.name.clone()),
            }
        }
        tree
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parents.contains_key(name)
    }

    /// Returns the full forest, one [`TreeNode`] per root category.
    pub fn tree(&self) -> Vec<TreeNode> {
        self.roots.iter().map(|r| self.node(r)).collect()
    }

    /// Returns the subtree rooted at `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StockroomError::NotFound`] if `name` is not a category.
    pub fn subtree(&self, name: &str) -> Result<TreeNode> {
        if !self.contains(name) {
            return Err(StockroomError::not_found(EntityKind::Category, name));
        }
        Ok(self.node(name))
    }

    /// Direct children of `name`, in insertion order. Unknown names have none.
    pub fn children(&self, name: &str) -> &[String] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the chain of ancestors of `name`, from its immediate parent up to the root.
    ///
    /// # Errors
    ///
    /// Returns [`StockroomError::NotFound`] if `name` is not a category.
    pub fn ancestors(&self, name: &str) -> Result<Vec<String>> {
        let mut current = self
            .parents
            .get(name)
            .ok_or_else(|| StockroomError::not_found(EntityKind::Category, name))?;
        let mut chain = Vec::new();
        while let Some(parent) = current {
            if chain.len() > self.parents.len() {
                break;
            }
            chain.push(parent.clone());
            current = match self.parents.get(parent) {
                Some(next) => next,
                None => break,
            };
        }
        Ok(chain)
    }

    /// Returns `true` if making `proposed_parent` the parent of `name` would create a cycle.
    ///
    /// Walks upward from `proposed_parent`; meeting `name` on the way means the
    /// new link would close a loop. Cost is proportional to the depth of
    /// `proposed_parent`.
    pub fn would_cycle(&self, name: &str, proposed_parent: &str) -> bool {
        let mut current = proposed_parent;
        // Bounded by the number of categories in case stored data already loops.
        for _ in 0..=self.parents.len() {
            if current == name {
                return true;
            }
            match self.parents.get(current) {
                Some(Some(parent)) => current = parent,
                _ => return false,
            }
        }
        true
    }

    fn node(&self, name: &str) -> TreeNode {
        TreeNode {
            name: name.to_string(),
            children: self.children(name).iter().map(|c| self.node(c)).collect(),
        }
    }
}
