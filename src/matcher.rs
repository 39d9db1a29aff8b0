//! # Recipe Matcher
//!
//! Ranks recipes by how many of their required ingredients the user already
//! owns. Everything here is pure: no I/O, no shared state, safe to call from
//! any number of threads at once.
//!
//! ## Ranking
//!
//! 1. A required ingredient matches when some owned ingredient has the same
//!    name, compared case-insensitively. No substring, fuzzy, unit or
//!    quantity comparison.
//! 2. Recipes with no match (including recipes with no required ingredients)
//!    are dropped.
//! 3. The rest are ordered by match count, then match percentage, both
//!    descending. Full ties keep catalog order.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use tracing::debug;

use crate::recipe_model::{MatchResult, OwnedIngredient, RecipeDefinition};

/// Rank `all_recipes` against the user's `owned_ingredients`
///
/// # Examples
///
/// ```rust
/// use recetas::matcher::find_matching_recipes;
/// use recetas::recipe_model::{OwnedIngredient, RecipeDefinition};
///
/// let owned = vec![OwnedIngredient::new("Pasta")];
/// let recipes = vec![RecipeDefinition::new("Pasta con tomate", &["pasta", "tomate"])];
///
/// let results = find_matching_recipes(&owned, &recipes);
/// assert_eq!(results[0].match_count, 1);
/// assert_eq!(results[0].match_percentage, 50.0);
/// ```
pub fn find_matching_recipes(
    owned_ingredients: &[OwnedIngredient],
    all_recipes: &[RecipeDefinition],
) -> Vec<MatchResult> {
    if owned_ingredients.is_empty() || all_recipes.is_empty() {
        debug!(
            owned = owned_ingredients.len(),
            recipes = all_recipes.len(),
            "Nothing to match"
        );
        return Vec::new();
    }

    let owned_names: HashSet<String> = owned_ingredients
        .iter()
        .map(|ingredient| ingredient.name.to_lowercase())
        .collect();

    let mut results: Vec<MatchResult> = all_recipes
        .iter()
        .filter_map(|recipe| score_recipe(recipe, &owned_names))
        .collect();

    // `sort_by` is stable, so full ties keep catalog order
    results.sort_by(|a, b| {
        b.match_count
            .cmp(&a.match_count)
            .then_with(|| b.match_percentage.total_cmp(&a.match_percentage))
    });

    debug!(
        owned = owned_names.len(),
        recipes = all_recipes.len(),
        matched = results.len(),
        "Ranked recipes against pantry"
    );

    results
}

/// Score one recipe, or `None` when nothing in it is owned
fn score_recipe(recipe: &RecipeDefinition, owned_names: &HashSet<String>) -> Option<MatchResult> {
    let total = recipe.required_ingredients.len();
    if total == 0 {
        return None;
    }

    let matching_ingredients: Vec<String> = recipe
        .required_ingredients
        .iter()
        .filter(|required| owned_names.contains(&required.to_lowercase()))
        .cloned()
        .collect();

    let match_count = matching_ingredients.len();
    if match_count == 0 {
        return None;
    }

    Some(MatchResult {
        recipe: recipe.clone(),
        matching_ingredients,
        match_count,
        match_percentage: match_count as f64 / total as f64 * 100.0,
    })
}

/// An item returned by one or more per-ingredient searches
#[derive(Debug, Clone, PartialEq)]
pub struct HitCount<T> {
    pub item: T,
    /// Number of searches that returned this item
    pub hits: usize,
}

/// Merge per-ingredient search results and rank items by how many searches
/// returned them
///
/// Items are deduplicated by `key`; the first occurrence is kept. Ordering
/// is by hit count descending, with ties left in first-seen order. There is
/// no percentage tie-break because the searches do not report how many
/// ingredients each item needs.
pub fn rank_by_hit_count<T, K, F>(batches: impl IntoIterator<Item = Vec<T>>, key: F) -> Vec<HitCount<T>>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut ranked: Vec<HitCount<T>> = Vec::new();
    let mut positions: HashMap<K, usize> = HashMap::new();

    for batch in batches {
        for item in batch {
            let k = key(&item);
            match positions.get(&k) {
                Some(&index) => ranked[index].hits += 1,
                None => {
                    positions.insert(k, ranked.len());
                    ranked.push(HitCount { item, hits: 1 });
                }
            }
        }
    }

    ranked.sort_by(|a, b| b.hits.cmp(&a.hits));
    ranked
}
