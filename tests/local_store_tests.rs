use anyhow::Result;
use chrono::Utc;
use recetas::local_store::LocalStore;
use recetas::recipe_model::{FavoriteRecipe, RecipeDefinition};
use tempfile::TempDir;

fn setup_store() -> Result<(LocalStore, TempDir)> {
    let dir = TempDir::new()?;
    let store = LocalStore::open(dir.path().join("recetas.json"))?;
    Ok((store, dir))
}

fn favorite(meal_id: &str, name: &str) -> FavoriteRecipe {
    FavoriteRecipe {
        meal_id: meal_id.to_string(),
        name: name.to_string(),
        thumbnail: Some(format!("https://img.example/{meal_id}.jpg")),
        created_at: Utc::now(),
    }
}

#[test]
fn test_pantry_survives_reopen() -> Result<()> {
    let (mut store, dir) = setup_store()?;

    let pasta = store.add_ingredient("Pasta", "500", "g")?;
    store.add_ingredient_line("1 kg tomate")?;
    assert_eq!(pasta.name, "pasta");

    let reopened = LocalStore::open(dir.path().join("recetas.json"))?;
    assert_eq!(reopened.pantry().names(), vec!["pasta", "tomate"]);
    assert_eq!(reopened.pantry().get(pasta.id).unwrap().quantity, "500");

    Ok(())
}

#[test]
fn test_readd_and_remove_ingredient() -> Result<()> {
    let (mut store, dir) = setup_store()?;

    let first = store.add_ingredient("ajo", "1", "")?;
    let again = store.add_ingredient("AJO", "3", "dientes")?;
    assert_eq!(first.id, again.id);
    assert_eq!(store.pantry().len(), 1);

    assert!(store.remove_ingredient(first.id)?);
    assert!(!store.remove_ingredient(first.id)?);

    let reopened = LocalStore::open(dir.path().join("recetas.json"))?;
    assert!(reopened.pantry().is_empty());

    Ok(())
}

#[test]
fn test_removed_ids_not_reused_after_reopen() -> Result<()> {
    let (mut store, dir) = setup_store()?;

    let ajo = store.add_ingredient("ajo", "", "")?;
    let sal = store.add_ingredient("sal", "", "")?;
    assert!(store.remove_ingredient(sal.id)?);

    let mut reopened = LocalStore::open(dir.path().join("recetas.json"))?;
    let aceite = reopened.add_ingredient("aceite", "1", "l")?;

    assert_eq!(ajo.id, 1);
    assert_eq!(sal.id, 2);
    assert_eq!(aceite.id, 3);

    Ok(())
}

#[test]
fn test_opens_store_with_plain_ingredient_array() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("recetas.json");
    std::fs::write(
        &path,
        r#"{"user_ingredients": [
            {"id": 4, "name": "Pasta", "quantity": "500", "unit": "g", "created_at": "2024-01-01T00:00:00Z"}
        ]}"#,
    )?;

    let mut store = LocalStore::open(&path)?;
    assert_eq!(store.pantry().names(), vec!["pasta"]);
    assert_eq!(store.add_ingredient("sal", "", "")?.id, 5);

    Ok(())
}

#[test]
fn test_find_matches_uses_stored_data() -> Result<()> {
    let (mut store, _dir) = setup_store()?;
    assert!(store.find_matches().is_empty());

    store.add_ingredient("tomate", "", "")?;
    store.add_ingredient("pasta", "", "")?;

    let results = store.find_matches();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].recipe.name, "Pasta con tomate");
    assert_eq!(results[0].match_percentage, 40.0);
    assert_eq!(results[1].recipe.name, "Ensalada simple");

    Ok(())
}

#[test]
fn test_add_recipe_replaces_same_id() -> Result<()> {
    let (mut store, dir) = setup_store()?;

    store.add_recipe(RecipeDefinition::new("Tortilla", &["huevo", "patata"]).with_id("52"))?;
    store.add_recipe(
        RecipeDefinition::new("Tortilla de patatas", &["huevo", "patata", "cebolla"]).with_id("52"),
    )?;
    store.add_recipe(RecipeDefinition::new("Sin id", &["agua"]))?;

    let reopened = LocalStore::open(dir.path().join("recetas.json"))?;
    let names: Vec<&str> = reopened.all_recipes().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Pasta con tomate", "Ensalada simple", "Tortilla de patatas", "Sin id"]
    );

    Ok(())
}

#[test]
fn test_favorites_add_toggle_remove() -> Result<()> {
    let (mut store, dir) = setup_store()?;

    store.add_favorite(favorite("52772", "Teriyaki Chicken Casserole"))?;
    store.add_favorite(favorite("52772", "Teriyaki Chicken Casserole"))?;
    assert_eq!(store.favorites().len(), 1);
    assert!(store.is_favorite("52772"));

    assert!(store.toggle_favorite(favorite("52959", "Baked salmon"))?);
    assert!(!store.toggle_favorite(favorite("52772", "Teriyaki Chicken Casserole"))?);

    let reopened = LocalStore::open(dir.path().join("recetas.json"))?;
    let ids: Vec<&str> = reopened.favorites().iter().map(|f| f.meal_id.as_str()).collect();
    assert_eq!(ids, vec!["52959"]);

    assert!(!store.remove_favorite("52772")?);
    assert!(store.remove_favorite("52959")?);
    assert!(store.favorites().is_empty());

    Ok(())
}

#[test]
fn test_checked_ingredients() -> Result<()> {
    let (mut store, dir) = setup_store()?;

    assert!(store.checked_ingredients("52772").is_empty());

    store.set_ingredient_checked("52772", "soy sauce", true)?;
    store.set_ingredient_checked("52772", "water", true)?;
    store.set_ingredient_checked("52772", "water", false)?;
    store.set_ingredient_checked("1", "pasta", true)?;

    let reopened = LocalStore::open(dir.path().join("recetas.json"))?;
    let checked = reopened.checked_ingredients("52772");
    assert_eq!(checked.get("soy sauce"), Some(&true));
    assert_eq!(checked.get("water"), Some(&false));

    assert!(store.clear_checked_ingredients("52772")?);
    assert!(!store.clear_checked_ingredients("52772")?);
    assert!(store.checked_ingredients("52772").is_empty());
    assert_eq!(store.checked_ingredients("1").len(), 1);

    Ok(())
}

#[test]
fn test_store_file_is_readable_json() -> Result<()> {
    let (mut store, dir) = setup_store()?;
    store.add_ingredient("arroz", "1", "kg")?;

    let raw = std::fs::read_to_string(dir.path().join("recetas.json"))?;
    let json: serde_json::Value = serde_json::from_str(&raw)?;

    assert_eq!(json["user_ingredients"]["items"][0]["name"], "arroz");
    assert_eq!(json["user_ingredients"]["next_id"], 2);
    assert_eq!(json["recipes"][0]["ingredients"][0], "pasta");
    assert!(json["favorites"].as_array().unwrap().is_empty());

    Ok(())
}
