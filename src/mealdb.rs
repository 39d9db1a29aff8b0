//! # TheMealDB Client
//!
//! Thin client for the public TheMealDB JSON API plus the adapter that turns
//! its flattened meal records into the shapes the rest of the crate uses.
//!
//! TheMealDB stores up to twenty ingredients per meal as separate
//! `strIngredient1..strIngredient20` / `strMeasure1..strMeasure20` fields.
//! `Meal::ingredients` folds them into an ordered list so nothing past this
//! module ever sees the flattened columns.
//!
//! Every endpoint answers `{"meals": [...]}` or `{"meals": null}`; the
//! latter is an empty result, not an error.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::api_errors::ApiError;
use crate::circuit_breaker::CircuitBreaker;
use crate::config::{MealDbConfig, RecoveryConfig};
use crate::matcher::{rank_by_hit_count, HitCount};
use crate::recipe_model::{FavoriteRecipe, RecipeDefinition};

/// TheMealDB packs at most this many ingredient columns per meal
pub const MAX_INGREDIENT_SLOTS: usize = 20;

const YOUTUBE_HOSTS: &[&str] = &["www.youtube.com", "youtube.com"];

/// Full meal record from `search.php`, `lookup.php` or `random.php`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    #[serde(rename = "idMeal")]
    pub id: String,
    #[serde(rename = "strMeal")]
    pub name: String,
    #[serde(rename = "strCategory", default)]
    pub category: Option<String>,
    #[serde(rename = "strArea", default)]
    pub area: Option<String>,
    #[serde(rename = "strInstructions", default)]
    pub instructions: Option<String>,
    #[serde(rename = "strMealThumb", default)]
    pub thumbnail: Option<String>,
    #[serde(rename = "strTags", default)]
    pub tags: Option<String>,
    #[serde(rename = "strYoutube", default)]
    pub youtube: Option<String>,
    #[serde(rename = "strSource", default)]
    pub source: Option<String>,
    /// Remaining fields, including the flattened ingredient/measure columns
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Short meal record from `filter.php`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSummary {
    #[serde(rename = "idMeal")]
    pub id: String,
    #[serde(rename = "strMeal")]
    pub name: String,
    #[serde(rename = "strMealThumb", default)]
    pub thumbnail: Option<String>,
}

/// One entry of `list.php?i=list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientInfo {
    #[serde(rename = "idIngredient", default)]
    pub id: Option<String>,
    #[serde(rename = "strIngredient")]
    pub name: String,
    #[serde(rename = "strDescription", default)]
    pub description: Option<String>,
    #[serde(rename = "strType", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CategoryName {
    #[serde(rename = "strCategory")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct MealsEnvelope<T> {
    meals: Option<Vec<T>>,
}

/// An ingredient line of a meal, measure as written by TheMealDB
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealIngredient {
    pub name: String,
    pub measure: String,
}

impl Meal {
    /// Ordered ingredient/measure pairs, skipping blank slots
    pub fn ingredients(&self) -> Vec<MealIngredient> {
        (1..=MAX_INGREDIENT_SLOTS)
            .filter_map(|slot| {
                let name = self.text_field(&format!("strIngredient{slot}"))?;
                let measure = self
                    .text_field(&format!("strMeasure{slot}"))
                    .unwrap_or_default();
                Some(MealIngredient { name, measure })
            })
            .collect()
    }

    /// Trimmed, non-empty string value of a flattened field
    fn text_field(&self, key: &str) -> Option<String> {
        self.extra
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Comma separated `strTags` split into trimmed tags
    pub fn tags(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The tutorial video link, only when it points at YouTube
    pub fn video_url(&self) -> Option<&str> {
        let raw = self.youtube.as_deref()?.trim();
        let url = Url::parse(raw).ok()?;
        let host = url.host_str()?;
        YOUTUBE_HOSTS.contains(&host).then_some(raw)
    }

    /// Normalize into the shape the matcher consumes
    pub fn to_definition(&self) -> RecipeDefinition {
        RecipeDefinition {
            id: Some(self.id.clone()),
            name: self.name.clone(),
            required_ingredients: self.ingredients().into_iter().map(|i| i.name).collect(),
            instructions: self.instructions.clone().unwrap_or_default(),
            image_url: self.thumbnail.clone(),
            prep_time: None,
        }
    }

    pub fn to_favorite(&self) -> FavoriteRecipe {
        FavoriteRecipe {
            meal_id: self.id.clone(),
            name: self.name.clone(),
            thumbnail: self.thumbnail.clone(),
            created_at: Utc::now(),
        }
    }
}

impl MealSummary {
    pub fn to_favorite(&self) -> FavoriteRecipe {
        FavoriteRecipe {
            meal_id: self.id.clone(),
            name: self.name.clone(),
            thumbnail: self.thumbnail.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Trimmed ingredient names with blanks and case-insensitive repeats removed
///
/// The first spelling of a repeated name is kept.
pub fn unique_ingredient_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty() && seen.insert(name.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// TheMealDB HTTP client with retries and a circuit breaker
#[derive(Debug)]
pub struct MealDbClient {
    http: reqwest::Client,
    base_url: String,
    recovery: RecoveryConfig,
    breaker: CircuitBreaker,
}

impl MealDbClient {
    /// Build a client from configuration
    pub fn new(config: &MealDbConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Initialization(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            recovery: config.recovery.clone(),
            breaker: CircuitBreaker::new(&config.recovery),
        })
    }

    /// Search meals by (partial) name
    pub async fn search_by_name(&self, name: &str) -> Result<Vec<Meal>, ApiError> {
        self.get_meals("search.php", &[("s", name)]).await
    }

    pub async fn filter_by_category(&self, category: &str) -> Result<Vec<MealSummary>, ApiError> {
        self.get_meals("filter.php", &[("c", category)]).await
    }

    /// Meals that use a single main ingredient
    pub async fn filter_by_ingredient(&self, ingredient: &str) -> Result<Vec<MealSummary>, ApiError> {
        self.get_meals("filter.php", &[("i", ingredient)]).await
    }

    /// Full detail of one meal, `None` when the id is unknown
    pub async fn lookup(&self, meal_id: &str) -> Result<Option<Meal>, ApiError> {
        let meals: Vec<Meal> = self.get_meals("lookup.php", &[("i", meal_id)]).await?;
        Ok(meals.into_iter().next())
    }

    pub async fn random(&self) -> Result<Option<Meal>, ApiError> {
        let meals: Vec<Meal> = self.get_meals("random.php", &[]).await?;
        Ok(meals.into_iter().next())
    }

    /// Category names, e.g. "Beef", "Dessert"
    pub async fn list_categories(&self) -> Result<Vec<String>, ApiError> {
        let categories: Vec<CategoryName> = self.get_meals("list.php", &[("c", "list")]).await?;
        Ok(categories.into_iter().map(|c| c.name).collect())
    }

    /// Every ingredient TheMealDB knows about
    pub async fn list_ingredients(&self) -> Result<Vec<IngredientInfo>, ApiError> {
        self.get_meals("list.php", &[("i", "list")]).await
    }

    /// Meals using any of `ingredients`, ranked by how many of them each uses
    ///
    /// The API filters by one ingredient at a time, so this runs one search
    /// per ingredient and merges the results with `rank_by_hit_count`.
    pub async fn search_by_ingredients(
        &self,
        ingredients: &[String],
    ) -> Result<Vec<HitCount<MealSummary>>, ApiError> {
        let ingredients = unique_ingredient_names(ingredients);
        let mut batches = Vec::with_capacity(ingredients.len());
        for ingredient in &ingredients {
            batches.push(self.filter_by_ingredient(ingredient).await?);
        }

        let ranked = rank_by_hit_count(batches, |meal: &MealSummary| meal.id.clone());
        info!(
            ingredients = ingredients.len(),
            meals = ranked.len(),
            "Ranked meals by ingredient hits"
        );
        Ok(ranked)
    }

    /// GET `endpoint` with retries; `"meals": null` becomes an empty list
    async fn get_meals<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ApiError> {
        if self.breaker.is_open() {
            warn!(endpoint, "Skipping request, circuit breaker open");
            return Err(ApiError::CircuitOpen);
        }

        let url = format!("{}/{}", self.base_url, endpoint);
        let mut attempt: u32 = 0;

        loop {
            match self.fetch_once::<T>(&url, query).await {
                Ok(meals) => {
                    self.breaker.record_success();
                    debug!(endpoint, results = meals.len(), "Recipe API request succeeded");
                    return Ok(meals);
                }
                Err(e) if e.is_transient() => {
                    self.breaker.record_failure();
                    if attempt >= self.recovery.max_retries || self.breaker.is_open() {
                        warn!(endpoint, attempts = attempt + 1, error = %e, "Recipe API request failed");
                        return Err(e);
                    }
                    let delay = self.recovery.retry_delay(attempt);
                    warn!(
                        endpoint,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying recipe API request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(endpoint, error = %e, "Recipe API request failed");
                    return Err(e);
                }
            }
        }
    }

    async fn fetch_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ApiError> {
        let response = self.http.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                code: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let envelope: MealsEnvelope<T> = response.json().await?;
        Ok(envelope.meals.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meal(value: Value) -> Meal {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_ingredients_fold_flattened_columns() {
        let meal = meal(json!({
            "idMeal": "52772",
            "strMeal": "Teriyaki Chicken Casserole",
            "strIngredient1": "soy sauce",
            "strMeasure1": "3/4 cup",
            "strIngredient2": " water ",
            "strMeasure2": null,
            "strIngredient3": "",
            "strMeasure3": " ",
            "strIngredient4": null,
            "strIngredient5": "brown sugar",
            "strMeasure5": "1/2 cup "
        }));

        assert_eq!(
            meal.ingredients(),
            vec![
                MealIngredient { name: "soy sauce".into(), measure: "3/4 cup".into() },
                MealIngredient { name: "water".into(), measure: String::new() },
                MealIngredient { name: "brown sugar".into(), measure: "1/2 cup".into() },
            ]
        );
    }

    #[test]
    fn test_video_url_only_youtube() {
        let mut m = meal(json!({"idMeal": "1", "strMeal": "X"}));
        assert_eq!(m.video_url(), None);

        m.youtube = Some("https://www.youtube.com/watch?v=4aZr5hZXP_s".into());
        assert_eq!(m.video_url(), Some("https://www.youtube.com/watch?v=4aZr5hZXP_s"));

        m.youtube = Some("https://youtube.com/watch?v=abc".into());
        assert!(m.video_url().is_some());

        m.youtube = Some("https://evil.example/watch?v=abc".into());
        assert_eq!(m.video_url(), None);

        m.youtube = Some("not a url".into());
        assert_eq!(m.video_url(), None);
    }

    #[test]
    fn test_tags_split() {
        let m = meal(json!({"idMeal": "1", "strMeal": "X", "strTags": "Meat, Casserole,,"}));
        assert_eq!(m.tags(), vec!["Meat", "Casserole"]);
    }

    #[test]
    fn test_to_definition() {
        let m = meal(json!({
            "idMeal": "9",
            "strMeal": "Pancakes",
            "strInstructions": "Mix and fry",
            "strMealThumb": "https://img/pancakes.jpg",
            "strIngredient1": "Flour",
            "strIngredient2": "Eggs",
            "strIngredient3": "Milk"
        }));
        let def = m.to_definition();

        assert_eq!(def.id.as_deref(), Some("9"));
        assert_eq!(def.required_ingredients, vec!["Flour", "Eggs", "Milk"]);
        assert_eq!(def.instructions, "Mix and fry");
        assert_eq!(def.image_url.as_deref(), Some("https://img/pancakes.jpg"));
    }

    #[test]
    fn test_null_meals_envelope_is_empty() {
        let envelope: MealsEnvelope<MealSummary> = serde_json::from_str(r#"{"meals":null}"#).unwrap();
        assert!(envelope.meals.unwrap_or_default().is_empty());
    }

    #[test]
    fn test_missing_meals_key_is_empty() {
        let envelope: MealsEnvelope<Meal> = serde_json::from_str("{}").unwrap();
        assert!(envelope.meals.unwrap_or_default().is_empty());
    }

    #[test]
    fn test_unique_ingredient_names() {
        let names: Vec<String> = ["chicken", " Chicken", "", "rice", "CHICKEN ", "  "]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(unique_ingredient_names(&names), vec!["chicken", "rice"]);
    }
}
