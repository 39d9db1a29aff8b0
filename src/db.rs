//! # Postgres Store
//!
//! Hosted per-user persistence: pantry, recipe catalog, favorites and
//! ingredient checklists. Every per-user call takes the caller's
//! `UserContext` explicitly; there is no ambient "current user".

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::ingredient_parser::normalize_name;
use crate::recipe_model::{
    CheckedIngredients, FavoriteRecipe, OwnedIngredient, RecipeDefinition, StoredRecipe,
};

/// A registered user
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    /// Identifier issued by the identity provider
    pub external_id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Identity of the caller, passed to every per-user query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: i64,
}

impl User {
    pub fn context(&self) -> UserContext {
        UserContext { user_id: self.id }
    }
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            external_id TEXT NOT NULL UNIQUE,
            email TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_ingredients (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            quantity TEXT NOT NULL DEFAULT '',
            unit TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (user_id, name)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create user_ingredients table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipes (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            ingredients TEXT NOT NULL,
            instructions TEXT NOT NULL DEFAULT '',
            image_url TEXT,
            prep_time INTEGER,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create recipes table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS favorites (
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            meal_id TEXT NOT NULL,
            name TEXT NOT NULL,
            thumbnail TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (user_id, meal_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create favorites table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS checked_ingredients (
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            recipe_id TEXT NOT NULL,
            ingredients TEXT NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (user_id, recipe_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create checked_ingredients table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        external_id: row.try_get("external_id")?,
        email: row.try_get("email")?,
        created_at: row.try_get("created_at")?,
    })
}

fn ingredient_from_row(row: &PgRow) -> Result<OwnedIngredient> {
    Ok(OwnedIngredient {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        quantity: row.try_get("quantity")?,
        unit: row.try_get("unit")?,
        created_at: row.try_get("created_at")?,
    })
}

fn favorite_from_row(row: &PgRow) -> Result<FavoriteRecipe> {
    Ok(FavoriteRecipe {
        meal_id: row.try_get("meal_id")?,
        name: row.try_get("name")?,
        thumbnail: row.try_get("thumbnail")?,
        created_at: row.try_get("created_at")?,
    })
}

// Users

/// Get the user for an identity provider id, creating it on first sight
///
/// An existing user keeps its original email.
pub async fn get_or_create_user(pool: &PgPool, external_id: &str, email: Option<&str>) -> Result<User> {
    let row = sqlx::query(
        "INSERT INTO users (external_id, email) VALUES ($1, $2)
         ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id
         RETURNING id, external_id, email, created_at",
    )
    .bind(external_id)
    .bind(email)
    .fetch_one(pool)
    .await
    .context("Failed to get or create user")?;

    let user = user_from_row(&row)?;
    debug!(user_id = user.id, external_id, "Resolved user");
    Ok(user)
}

pub async fn get_user_by_external_id(pool: &PgPool, external_id: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, external_id, email, created_at FROM users WHERE external_id = $1")
        .bind(external_id)
        .fetch_optional(pool)
        .await
        .context("Failed to read user")?;

    row.as_ref().map(user_from_row).transpose()
}

// Pantry

/// Add an owned ingredient, replacing quantity and unit when the name exists
pub async fn upsert_user_ingredient(
    pool: &PgPool,
    ctx: &UserContext,
    name: &str,
    quantity: &str,
    unit: &str,
) -> Result<OwnedIngredient> {
    let name = normalize_name(name);
    anyhow::ensure!(!name.is_empty(), "Ingredient name cannot be empty");

    let row = sqlx::query(
        "INSERT INTO user_ingredients (user_id, name, quantity, unit) VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id, name) DO UPDATE SET quantity = EXCLUDED.quantity, unit = EXCLUDED.unit
         RETURNING id, name, quantity, unit, created_at",
    )
    .bind(ctx.user_id)
    .bind(&name)
    .bind(quantity.trim())
    .bind(unit.trim())
    .fetch_one(pool)
    .await
    .context("Failed to save user ingredient")?;

    let ingredient = ingredient_from_row(&row)?;
    info!(user_id = ctx.user_id, ingredient_id = ingredient.id, name = %ingredient.name, "Saved user ingredient");
    Ok(ingredient)
}

/// The user's owned ingredients, oldest first
pub async fn list_user_ingredients(pool: &PgPool, ctx: &UserContext) -> Result<Vec<OwnedIngredient>> {
    let rows = sqlx::query(
        "SELECT id, name, quantity, unit, created_at FROM user_ingredients
         WHERE user_id = $1 ORDER BY id",
    )
    .bind(ctx.user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list user ingredients")?;

    rows.iter().map(ingredient_from_row).collect()
}

pub async fn remove_user_ingredient(pool: &PgPool, ctx: &UserContext, ingredient_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM user_ingredients WHERE id = $1 AND user_id = $2")
        .bind(ingredient_id)
        .bind(ctx.user_id)
        .execute(pool)
        .await
        .context("Failed to delete user ingredient")?;

    let removed = result.rows_affected() > 0;
    info!(user_id = ctx.user_id, ingredient_id, removed, "Removed user ingredient");
    Ok(removed)
}

// Recipes

/// Store a recipe, JSON encoding its ingredient list; returns the new id
pub async fn insert_recipe(pool: &PgPool, recipe: &RecipeDefinition) -> Result<i64> {
    let ingredients = serde_json::to_string(&recipe.required_ingredients)
        .context("Failed to encode recipe ingredients")?;
    let prep_time = recipe.prep_time.and_then(|t| i32::try_from(t).ok());

    let row = sqlx::query(
        "INSERT INTO recipes (name, ingredients, instructions, image_url, prep_time)
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(&recipe.name)
    .bind(ingredients)
    .bind(&recipe.instructions)
    .bind(&recipe.image_url)
    .bind(prep_time)
    .fetch_one(pool)
    .await
    .context("Failed to insert recipe")?;

    let id: i64 = row.try_get("id")?;
    info!(recipe_id = id, name = %recipe.name, "Inserted recipe");
    Ok(id)
}

/// Raw recipe rows, ingredient lists still JSON encoded
pub async fn list_stored_recipes(pool: &PgPool) -> Result<Vec<StoredRecipe>> {
    let rows = sqlx::query(
        "SELECT id, name, ingredients, instructions, image_url, prep_time, created_at
         FROM recipes ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list recipes")?;

    rows.iter()
        .map(|row| -> Result<StoredRecipe> {
            Ok(StoredRecipe {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                ingredients: row.try_get("ingredients")?,
                instructions: row.try_get("instructions")?,
                image_url: row.try_get("image_url")?,
                prep_time: row.try_get("prep_time")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .collect()
}

/// All recipes, decoded for the matcher
pub async fn list_recipes(pool: &PgPool) -> Result<Vec<RecipeDefinition>> {
    list_stored_recipes(pool)
        .await?
        .into_iter()
        .map(StoredRecipe::into_definition)
        .collect()
}

// Favorites

/// Add a favorite; adding the same meal twice keeps one row
pub async fn add_favorite(pool: &PgPool, ctx: &UserContext, favorite: &FavoriteRecipe) -> Result<()> {
    sqlx::query(
        "INSERT INTO favorites (user_id, meal_id, name, thumbnail, created_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (user_id, meal_id) DO UPDATE SET name = EXCLUDED.name, thumbnail = EXCLUDED.thumbnail",
    )
    .bind(ctx.user_id)
    .bind(&favorite.meal_id)
    .bind(&favorite.name)
    .bind(&favorite.thumbnail)
    .bind(favorite.created_at)
    .execute(pool)
    .await
    .context("Failed to add favorite")?;

    info!(user_id = ctx.user_id, meal_id = %favorite.meal_id, "Added favorite");
    Ok(())
}

pub async fn remove_favorite(pool: &PgPool, ctx: &UserContext, meal_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND meal_id = $2")
        .bind(ctx.user_id)
        .bind(meal_id)
        .execute(pool)
        .await
        .context("Failed to remove favorite")?;

    Ok(result.rows_affected() > 0)
}

/// The user's favorites, most recent first
pub async fn list_favorites(pool: &PgPool, ctx: &UserContext) -> Result<Vec<FavoriteRecipe>> {
    let rows = sqlx::query(
        "SELECT meal_id, name, thumbnail, created_at FROM favorites
         WHERE user_id = $1 ORDER BY created_at DESC, meal_id",
    )
    .bind(ctx.user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list favorites")?;

    rows.iter().map(favorite_from_row).collect()
}

pub async fn is_favorite(pool: &PgPool, ctx: &UserContext, meal_id: &str) -> Result<bool> {
    let row = sqlx::query("SELECT 1 AS found FROM favorites WHERE user_id = $1 AND meal_id = $2")
        .bind(ctx.user_id)
        .bind(meal_id)
        .fetch_optional(pool)
        .await
        .context("Failed to check favorite")?;

    Ok(row.is_some())
}

// Ingredient checklists

/// Replace the checklist of a recipe
pub async fn set_checked_ingredients(
    pool: &PgPool,
    ctx: &UserContext,
    recipe_id: &str,
    ingredients: &CheckedIngredients,
) -> Result<()> {
    let encoded = serde_json::to_string(ingredients).context("Failed to encode checklist")?;

    sqlx::query(
        "INSERT INTO checked_ingredients (user_id, recipe_id, ingredients, updated_at)
         VALUES ($1, $2, $3, NOW())
         ON CONFLICT (user_id, recipe_id) DO UPDATE SET ingredients = EXCLUDED.ingredients, updated_at = NOW()",
    )
    .bind(ctx.user_id)
    .bind(recipe_id)
    .bind(encoded)
    .execute(pool)
    .await
    .context("Failed to save checked ingredients")?;

    Ok(())
}

/// Checklist of a recipe, empty when none was saved
pub async fn get_checked_ingredients(
    pool: &PgPool,
    ctx: &UserContext,
    recipe_id: &str,
) -> Result<CheckedIngredients> {
    let row = sqlx::query("SELECT ingredients FROM checked_ingredients WHERE user_id = $1 AND recipe_id = $2")
        .bind(ctx.user_id)
        .bind(recipe_id)
        .fetch_optional(pool)
        .await
        .context("Failed to read checked ingredients")?;

    match row {
        Some(row) => {
            let encoded: String = row.try_get("ingredients")?;
            serde_json::from_str(&encoded).context("Stored checklist is not valid JSON")
        }
        None => Ok(CheckedIngredients::new()),
    }
}

pub async fn clear_checked_ingredients(pool: &PgPool, ctx: &UserContext, recipe_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM checked_ingredients WHERE user_id = $1 AND recipe_id = $2")
        .bind(ctx.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .context("Failed to clear checked ingredients")?;

    Ok(result.rows_affected() > 0)
}
