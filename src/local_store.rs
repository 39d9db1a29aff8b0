//! # Local Store
//!
//! On-device persistence: a single JSON document holding the pantry, the
//! recipe catalog, favorites and per-recipe ingredient checklists. Every
//! mutating call writes the whole document back atomically (temp file in the
//! same directory, then rename).

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::matcher::find_matching_recipes;
use crate::pantry::Pantry;
use crate::recipe_model::{
    seed_recipes, CheckedIngredients, FavoriteRecipe, MatchResult, OwnedIngredient,
    RecipeDefinition,
};

/// Contents of the store file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub user_ingredients: Pantry,
    #[serde(default)]
    pub recipes: Vec<RecipeDefinition>,
    #[serde(default)]
    pub favorites: Vec<FavoriteRecipe>,
    /// Recipe id to checklist
    #[serde(default)]
    pub checked_ingredients: BTreeMap<String, CheckedIngredients>,
}

/// JSON file backed store
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    data: StoreData,
}

impl LocalStore {
    /// Open the store at `path`, creating it with the seed recipes if missing
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            info!("Initializing local store at: {}", path.display());
            let store = Self {
                path,
                data: StoreData {
                    recipes: seed_recipes(),
                    ..Default::default()
                },
            };
            store.save()?;
            return Ok(store);
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read local store {}", path.display()))?;
        let data: StoreData = if raw.trim().is_empty() {
            warn!("Local store {} is empty, starting fresh", path.display());
            StoreData {
                recipes: seed_recipes(),
                ..Default::default()
            }
        } else {
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse local store {}", path.display()))?
        };

        info!(
            "Opened local store {} ({} ingredients, {} recipes, {} favorites)",
            path.display(),
            data.user_ingredients.len(),
            data.recipes.len(),
            data.favorites.len()
        );
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    /// Write the document atomically
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;

        let mut temp_file = NamedTempFile::new_in(&dir).context("Failed to create temp file")?;
        serde_json::to_writer_pretty(temp_file.as_file_mut(), &self.data)
            .context("Failed to serialize local store")?;
        temp_file.as_file_mut().flush()?;
        temp_file
            .persist(&self.path)
            .with_context(|| format!("Failed to write local store {}", self.path.display()))?;
        Ok(())
    }

    // Pantry

    pub fn pantry(&self) -> &Pantry {
        &self.data.user_ingredients
    }

    /// Add or replace an owned ingredient and persist
    pub fn add_ingredient(&mut self, name: &str, quantity: &str, unit: &str) -> Result<OwnedIngredient> {
        let added = self.data.user_ingredients.add(name, quantity, unit)?.clone();
        self.save()?;
        Ok(added)
    }

    /// Parse a free text line (e.g. `"500 g pasta"`), add it and persist
    pub fn add_ingredient_line(&mut self, line: &str) -> Result<OwnedIngredient> {
        let added = self.data.user_ingredients.add_line(line)?.clone();
        self.save()?;
        Ok(added)
    }

    pub fn remove_ingredient(&mut self, id: i64) -> Result<bool> {
        let removed = self.data.user_ingredients.remove(id);
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    // Recipes

    pub fn all_recipes(&self) -> &[RecipeDefinition] {
        &self.data.recipes
    }

    /// Add a recipe, replacing one with the same id
    pub fn add_recipe(&mut self, recipe: RecipeDefinition) -> Result<()> {
        let existing = recipe.id.as_ref().and_then(|id| {
            self.data
                .recipes
                .iter()
                .position(|r| r.id.as_ref() == Some(id))
        });
        match existing {
            Some(index) => {
                info!("Replacing recipe '{}'", recipe.name);
                self.data.recipes[index] = recipe;
            }
            None => {
                info!("Adding recipe '{}'", recipe.name);
                self.data.recipes.push(recipe);
            }
        }
        self.save()
    }

    /// Rank the stored recipes against the stored pantry
    pub fn find_matches(&self) -> Vec<MatchResult> {
        find_matching_recipes(self.data.user_ingredients.list(), &self.data.recipes)
    }

    // Favorites

    pub fn favorites(&self) -> &[FavoriteRecipe] {
        &self.data.favorites
    }

    pub fn is_favorite(&self, meal_id: &str) -> bool {
        self.data.favorites.iter().any(|f| f.meal_id == meal_id)
    }

    /// Add a favorite; re-adding the same meal refreshes its record
    pub fn add_favorite(&mut self, favorite: FavoriteRecipe) -> Result<()> {
        match self
            .data
            .favorites
            .iter_mut()
            .find(|f| f.meal_id == favorite.meal_id)
        {
            Some(existing) => *existing = favorite,
            None => {
                info!("Adding favorite '{}' ({})", favorite.name, favorite.meal_id);
                self.data.favorites.push(favorite);
            }
        }
        self.save()
    }

    pub fn remove_favorite(&mut self, meal_id: &str) -> Result<bool> {
        let before = self.data.favorites.len();
        self.data.favorites.retain(|f| f.meal_id != meal_id);
        let removed = self.data.favorites.len() < before;
        if removed {
            info!("Removed favorite {}", meal_id);
            self.save()?;
        }
        Ok(removed)
    }

    /// Flip the favorite state of a meal, returning the new state
    pub fn toggle_favorite(&mut self, favorite: FavoriteRecipe) -> Result<bool> {
        if self.is_favorite(&favorite.meal_id) {
            self.remove_favorite(&favorite.meal_id)?;
            Ok(false)
        } else {
            self.add_favorite(favorite)?;
            Ok(true)
        }
    }

    // Ingredient checklists

    pub fn set_ingredient_checked(&mut self, recipe_id: &str, ingredient: &str, checked: bool) -> Result<()> {
        self.data
            .checked_ingredients
            .entry(recipe_id.to_string())
            .or_default()
            .insert(ingredient.to_string(), checked);
        self.save()
    }

    /// Checklist for a recipe, empty when none was saved
    pub fn checked_ingredients(&self, recipe_id: &str) -> CheckedIngredients {
        self.data
            .checked_ingredients
            .get(recipe_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear_checked_ingredients(&mut self, recipe_id: &str) -> Result<bool> {
        let removed = self.data.checked_ingredients.remove(recipe_id).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }
}
