//! # Recipe and Pantry Data Model
//!
//! This module defines the data structures shared by the matcher, the local
//! store, the Postgres store and the recipe API adapter.
//!
//! ## Core Concepts
//!
//! - **OwnedIngredient**: an ingredient the user has declared as available
//! - **RecipeDefinition**: a recipe name plus its ordered required ingredients
//! - **MatchResult**: a recipe annotated with how much of it the user can cook
//! - **FavoriteRecipe**: a bookmarked recipe from the remote catalog
//!
//! ## Usage
//!
//! ```rust
//! use recetas::recipe_model::{OwnedIngredient, RecipeDefinition};
//!
//! let pasta = OwnedIngredient::new("pasta").with_quantity("500", "g");
//! let recipe = RecipeDefinition::new("Pasta con tomate", &["pasta", "tomate"])
//!     .with_instructions("1. Hervir la pasta");
//!
//! assert_eq!(pasta.unit, "g");
//! assert_eq!(recipe.required_ingredients.len(), 2);
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An ingredient the user already has at home
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedIngredient {
    /// Store-assigned identifier, stable across re-adds of the same name
    pub id: i64,

    /// Case-insensitive ingredient name (e.g., "tomate", "pasta")
    pub name: String,

    /// Free text amount (e.g., "2", "a handful")
    #[serde(default)]
    pub quantity: String,

    /// Free text unit label (e.g., "kg", "cups"), possibly empty
    #[serde(default)]
    pub unit: String,

    /// When the entry was first added
    pub created_at: DateTime<Utc>,
}

/// A recipe as consumed by the matcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDefinition {
    /// Catalog identifier (seed id or remote meal id)
    #[serde(default)]
    pub id: Option<String>,

    /// Display name
    pub name: String,

    /// Ordered list of required ingredient names
    #[serde(rename = "ingredients")]
    pub required_ingredients: Vec<String>,

    /// Preparation steps, never read by the matcher
    #[serde(default)]
    pub instructions: String,

    #[serde(default)]
    pub image_url: Option<String>,

    /// Preparation time in minutes
    #[serde(default)]
    pub prep_time: Option<u32>,
}

/// A recipe row whose ingredient list is still JSON encoded, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecipe {
    pub id: i64,
    pub name: String,
    /// JSON array of ingredient names (e.g., `["pasta","tomate"]`)
    pub ingredients: String,
    pub instructions: String,
    pub image_url: Option<String>,
    pub prep_time: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// A recipe ranked against the user's pantry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// The recipe being ranked
    #[serde(flatten)]
    pub recipe: RecipeDefinition,

    /// Required ingredients the user owns, in recipe order
    pub matching_ingredients: Vec<String>,

    /// Number of matching ingredients
    pub match_count: usize,

    /// `match_count` as a percentage of required ingredients, in `[0, 100]`
    pub match_percentage: f64,
}

/// A bookmarked recipe from the remote catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecipe {
    pub meal_id: String,
    pub name: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-recipe checklist state: ingredient name to checked flag
pub type CheckedIngredients = BTreeMap<String, bool>;

impl OwnedIngredient {
    /// Create an owned ingredient with just a name
    pub fn new(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            quantity: String::new(),
            unit: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Set the amount and unit
    pub fn with_quantity(mut self, quantity: &str, unit: &str) -> Self {
        self.quantity = quantity.to_string();
        self.unit = unit.to_string();
        self
    }

    /// Set the store identifier
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }
}

impl RecipeDefinition {
    /// Create a recipe from a name and its required ingredient names
    pub fn new(name: &str, ingredients: &[&str]) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            required_ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            instructions: String::new(),
            image_url: None,
            prep_time: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = instructions.to_string();
        self
    }

    pub fn with_image_url(mut self, url: &str) -> Self {
        self.image_url = Some(url.to_string());
        self
    }

    pub fn with_prep_time(mut self, minutes: u32) -> Self {
        self.prep_time = Some(minutes);
        self
    }
}

impl StoredRecipe {
    /// Decode the JSON ingredient list into a `RecipeDefinition`
    ///
    /// A malformed ingredient string is reported here, before the recipe
    /// ever reaches the matcher.
    pub fn into_definition(self) -> Result<RecipeDefinition> {
        let required_ingredients: Vec<String> = serde_json::from_str(&self.ingredients)
            .with_context(|| {
                format!(
                    "Recipe {} ({}) has a malformed ingredient list",
                    self.id, self.name
                )
            })?;

        Ok(RecipeDefinition {
            id: Some(self.id.to_string()),
            name: self.name,
            required_ingredients,
            instructions: self.instructions,
            image_url: self.image_url,
            prep_time: self.prep_time.and_then(|t| u32::try_from(t).ok()),
        })
    }
}

impl MatchResult {
    /// Whether the user owns every required ingredient
    pub fn is_complete(&self) -> bool {
        self.match_count == self.recipe.required_ingredients.len()
    }

    /// Required ingredients the user still needs to buy, in recipe order
    pub fn missing_ingredients(&self) -> Vec<&str> {
        self.recipe
            .required_ingredients
            .iter()
            .filter(|required| !self.matching_ingredients.contains(required))
            .map(String::as_str)
            .collect()
    }
}

impl fmt::Display for OwnedIngredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.quantity.is_empty(), self.unit.is_empty()) {
            (true, _) => write!(f, "{}", self.name),
            (false, true) => write!(f, "{} {}", self.quantity, self.name),
            (false, false) => write!(f, "{} {} {}", self.quantity, self.unit, self.name),
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}/{} ingredients, {:.0}%)",
            self.recipe.name,
            self.match_count,
            self.recipe.required_ingredients.len(),
            self.match_percentage
        )
    }
}

/// The sample recipes every fresh local store starts with
pub fn seed_recipes() -> Vec<RecipeDefinition> {
    vec![
        RecipeDefinition::new(
            "Pasta con tomate",
            &["pasta", "tomate", "ajo", "aceite", "sal"],
        )
        .with_id("1")
        .with_instructions(
            "1. Hervir la pasta\n2. Saltear ajo en aceite\n3. Agregar tomate\n4. Mezclar con pasta",
        ),
        RecipeDefinition::new(
            "Ensalada simple",
            &["lechuga", "tomate", "cebolla", "aceite", "vinagre"],
        )
        .with_id("2")
        .with_instructions("1. Cortar verduras\n2. Mezclar\n3. Aliñar con aceite y vinagre"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(ingredients: &str) -> StoredRecipe {
        StoredRecipe {
            id: 7,
            name: "Tortilla".to_string(),
            ingredients: ingredients.to_string(),
            instructions: "Batir y cuajar".to_string(),
            image_url: None,
            prep_time: Some(20),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_stored_recipe_decodes_ingredient_json() {
        let recipe = stored(r#"["huevo","patata","aceite"]"#)
            .into_definition()
            .unwrap();

        assert_eq!(recipe.id.as_deref(), Some("7"));
        assert_eq!(recipe.required_ingredients, vec!["huevo", "patata", "aceite"]);
        assert_eq!(recipe.prep_time, Some(20));
    }

    #[test]
    fn test_stored_recipe_rejects_malformed_json() {
        let err = stored("huevo, patata").into_definition().unwrap_err();
        assert!(err.to_string().contains("malformed ingredient list"));
    }

    #[test]
    fn test_owned_ingredient_display() {
        assert_eq!(OwnedIngredient::new("sal").to_string(), "sal");
        assert_eq!(
            OwnedIngredient::new("huevos").with_quantity("6", "").to_string(),
            "6 huevos"
        );
        assert_eq!(
            OwnedIngredient::new("harina").with_quantity("1", "kg").to_string(),
            "1 kg harina"
        );
    }

    #[test]
    fn test_recipe_serializes_ingredients_key() {
        let recipe = RecipeDefinition::new("Pan", &["harina", "agua"]);
        let json = serde_json::to_value(&recipe).unwrap();
        assert_eq!(json["ingredients"], serde_json::json!(["harina", "agua"]));
    }

    #[test]
    fn test_seed_recipes() {
        let seeds = seed_recipes();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].name, "Pasta con tomate");
        assert_eq!(seeds[1].required_ingredients.len(), 5);
    }

    #[test]
    fn test_missing_ingredients() {
        let result = MatchResult {
            recipe: RecipeDefinition::new("Pasta", &["pasta", "tomate", "sal"]),
            matching_ingredients: vec!["pasta".to_string()],
            match_count: 1,
            match_percentage: 100.0 / 3.0,
        };

        assert!(!result.is_complete());
        assert_eq!(result.missing_ingredients(), vec!["tomate", "sal"]);
    }
}
