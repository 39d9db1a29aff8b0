//! # Pantry
//!
//! The user's owned-ingredient set. Names are normalized on the way in and
//! are unique: adding a name that is already present replaces the quantity
//! and unit of the existing entry and keeps its id.

use anyhow::{bail, Result};
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::ingredient_parser::{normalize_name, parse_ingredient_line};
use crate::recipe_model::OwnedIngredient;

/// In-memory owned-ingredient collection
///
/// Serializes as `{"next_id": .., "items": [..]}` so ids of removed entries
/// are never handed out again after a reload. A plain JSON array of
/// ingredients is still accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredPantry", into = "StoredPantry")]
pub struct Pantry {
    items: Vec<OwnedIngredient>,
    next_id: i64,
}

impl Default for Pantry {
    fn default() -> Self {
        Self::new()
    }
}

impl Pantry {
    /// Create an empty pantry
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
        }
    }

    /// All owned ingredients in insertion order
    pub fn list(&self) -> &[OwnedIngredient] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add an ingredient, replacing any entry with the same normalized name
    ///
    /// # Errors
    ///
    /// Fails when `name` is blank.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use recetas::pantry::Pantry;
    ///
    /// let mut pantry = Pantry::new();
    /// let first = pantry.add("Tomate", "2", "kg")?.id;
    /// let second = pantry.add("tomate ", "3", "kg")?.id;
    ///
    /// assert_eq!(first, second);
    /// assert_eq!(pantry.len(), 1);
    /// assert_eq!(pantry.list()[0].quantity, "3");
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn add(&mut self, name: &str, quantity: &str, unit: &str) -> Result<&OwnedIngredient> {
        let name = normalize_name(name);
        if name.is_empty() {
            bail!("Ingredient name cannot be empty");
        }

        let index = match self.items.iter().position(|item| item.name == name) {
            Some(index) => {
                debug!("Replacing pantry entry '{}'", name);
                let item = &mut self.items[index];
                item.quantity = quantity.trim().to_string();
                item.unit = unit.trim().to_string();
                index
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;
                info!("Adding '{}' to pantry with ID: {}", name, id);
                self.items.push(OwnedIngredient {
                    id,
                    name,
                    quantity: quantity.trim().to_string(),
                    unit: unit.trim().to_string(),
                    created_at: Utc::now(),
                });
                self.items.len() - 1
            }
        };

        Ok(&self.items[index])
    }

    /// Parse a free text line such as `"500 g pasta"` and add it
    pub fn add_line(&mut self, line: &str) -> Result<&OwnedIngredient> {
        match parse_ingredient_line(line) {
            Some(parsed) => self.add(&parsed.name, &parsed.quantity, &parsed.unit),
            None => bail!("Could not find an ingredient name in {:?}", line),
        }
    }

    /// Remove an ingredient by id, returning whether it existed
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        let removed = self.items.len() < before;

        if removed {
            info!("Removed pantry entry with ID: {}", id);
        } else {
            info!("No pantry entry found with ID: {}", id);
        }
        removed
    }

    pub fn get(&self, id: i64) -> Option<&OwnedIngredient> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Look up an ingredient by name, case-insensitively
    pub fn find_by_name(&self, name: &str) -> Option<&OwnedIngredient> {
        let name = normalize_name(name);
        self.items.iter().find(|item| item.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.name.as_str()).collect()
    }
}

impl From<Vec<OwnedIngredient>> for Pantry {
    /// Rebuild a pantry from stored entries
    ///
    /// Entries are renormalized; when two share a name the later one wins
    /// but keeps the earlier position and id.
    fn from(entries: Vec<OwnedIngredient>) -> Self {
        let mut items: Vec<OwnedIngredient> = Vec::with_capacity(entries.len());
        for mut entry in entries {
            entry.name = normalize_name(&entry.name);
            if entry.name.is_empty() {
                continue;
            }
            match items.iter_mut().find(|item| item.name == entry.name) {
                Some(existing) => {
                    existing.quantity = entry.quantity;
                    existing.unit = entry.unit;
                }
                None => items.push(entry),
            }
        }

        let next_id = items.iter().map(|item| item.id).max().unwrap_or(0).max(0) + 1;
        Self { items, next_id }
    }
}

impl From<Pantry> for Vec<OwnedIngredient> {
    fn from(pantry: Pantry) -> Self {
        pantry.items
    }
}

/// On-disk shape of a pantry
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredPantry {
    Tracked {
        next_id: i64,
        items: Vec<OwnedIngredient>,
    },
    Entries(Vec<OwnedIngredient>),
}

impl From<StoredPantry> for Pantry {
    fn from(stored: StoredPantry) -> Self {
        match stored {
            StoredPantry::Tracked { next_id, items } => {
                let mut pantry = Pantry::from(items);
                // The counter never moves backwards past removed ids
                pantry.next_id = pantry.next_id.max(next_id);
                pantry
            }
            StoredPantry::Entries(items) => Pantry::from(items),
        }
    }
}

impl From<Pantry> for StoredPantry {
    fn from(pantry: Pantry) -> Self {
        StoredPantry::Tracked {
            next_id: pantry.next_id,
            items: pantry.items,
        }
    }
}
