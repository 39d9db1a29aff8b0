//! # Recetas
//!
//! Recipe discovery around a pantry: track the ingredients you own, rank
//! recipes by how many of them you can already cover, browse TheMealDB and
//! keep favorites and per-recipe checklists.

pub mod api_errors;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod ingredient_parser;
pub mod local_store;
pub mod matcher;
pub mod mealdb;
pub mod pantry;
pub mod recipe_model;
