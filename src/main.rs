use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use recetas::config::AppConfig;
use recetas::db;
use recetas::local_store::LocalStore;
use recetas::matcher::find_matching_recipes;
use recetas::mealdb::{unique_ingredient_names, Meal, MealDbClient, MealSummary};
use recetas::recipe_model::MatchResult;

#[derive(Parser)]
#[command(name = "recetas")]
#[command(about = "Find recipes you can cook with what you have", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage owned ingredients
    Pantry {
        #[command(subcommand)]
        action: PantryAction,
    },
    /// Rank stored recipes by the ingredients you own
    Match,
    /// List stored recipes
    Recipes,
    /// Search TheMealDB by recipe name
    Search { name: String },
    /// List TheMealDB recipes in a category
    Category { name: String },
    /// List TheMealDB recipes using an ingredient
    Ingredient { name: String },
    /// Rank TheMealDB recipes by how many of these ingredients they use
    Ingredients {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Show a TheMealDB recipe in full
    Show {
        id: String,
        /// Also add the recipe to the local catalog
        #[arg(long)]
        save: bool,
    },
    /// List TheMealDB categories
    Categories,
    /// Manage favorite recipes
    Favorites {
        #[command(subcommand)]
        action: FavoriteAction,
    },
    /// Tick an ingredient on a recipe checklist
    Check {
        recipe_id: String,
        ingredient: String,
        /// Untick instead
        #[arg(long)]
        off: bool,
    },
    /// Show a recipe checklist
    Checked {
        recipe_id: String,
        /// Clear the checklist
        #[arg(long)]
        clear: bool,
    },
    /// Postgres store commands (needs DATABASE_URL)
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum PantryAction {
    /// List owned ingredients
    List,
    /// Add from free text, e.g. "500 g pasta"
    Add { line: String },
    /// Add with explicit fields
    AddItem {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        quantity: String,
        #[arg(long, default_value = "")]
        unit: String,
    },
    /// Remove by id
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum FavoriteAction {
    List,
    /// Add a TheMealDB recipe by id
    Add { id: String },
    Remove { id: String },
}

#[derive(Subcommand)]
enum DbAction {
    /// Create tables
    Init,
    /// Copy the local pantry and recipes into Postgres for the current user
    Sync,
    /// Rank Postgres recipes by the current user's pantry
    Match,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("RECETAS_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    info!(store = %config.store_path.display(), "Starting recetas");

    match cli.command {
        Commands::Pantry { action } => pantry(&config, action)?,
        Commands::Match => {
            let store = LocalStore::open(&config.store_path)?;
            print_matches(&store.find_matches());
        }
        Commands::Recipes => {
            let store = LocalStore::open(&config.store_path)?;
            for recipe in store.all_recipes() {
                println!(
                    "[{}] {}: {}",
                    recipe.id.as_deref().unwrap_or("-"),
                    recipe.name,
                    recipe.required_ingredients.join(", ")
                );
            }
        }
        Commands::Search { name } => {
            let client = MealDbClient::new(&config.mealdb)?;
            for meal in client.search_by_name(&name).await? {
                println!("[{}] {}", meal.id, meal.name);
            }
        }
        Commands::Category { name } => {
            let client = MealDbClient::new(&config.mealdb)?;
            print_summaries(&client.filter_by_category(&name).await?);
        }
        Commands::Ingredient { name } => {
            let client = MealDbClient::new(&config.mealdb)?;
            print_summaries(&client.filter_by_ingredient(&name).await?);
        }
        Commands::Ingredients { names } => {
            let client = MealDbClient::new(&config.mealdb)?;
            let wanted = unique_ingredient_names(&names).len();
            for hit in client.search_by_ingredients(&names).await? {
                println!("[{}] {} ({} of {})", hit.item.id, hit.item.name, hit.hits, wanted);
            }
        }
        Commands::Show { id, save } => {
            let client = MealDbClient::new(&config.mealdb)?;
            let Some(meal) = client.lookup(&id).await? else {
                bail!("No recipe with id {id}");
            };
            let mut store = LocalStore::open(&config.store_path)?;
            print_meal(&meal, store.is_favorite(&meal.id));
            if save {
                store.add_recipe(meal.to_definition())?;
                println!("Saved to local catalog.");
            }
        }
        Commands::Categories => {
            let client = MealDbClient::new(&config.mealdb)?;
            for category in client.list_categories().await? {
                println!("{category}");
            }
        }
        Commands::Favorites { action } => favorites(&config, action).await?,
        Commands::Check {
            recipe_id,
            ingredient,
            off,
        } => {
            let mut store = LocalStore::open(&config.store_path)?;
            store.set_ingredient_checked(&recipe_id, &ingredient, !off)?;
        }
        Commands::Checked { recipe_id, clear } => {
            let mut store = LocalStore::open(&config.store_path)?;
            if clear {
                store.clear_checked_ingredients(&recipe_id)?;
            } else {
                for (ingredient, checked) in store.checked_ingredients(&recipe_id) {
                    println!("[{}] {}", if checked { "x" } else { " " }, ingredient);
                }
            }
        }
        Commands::Db { action } => database(&config, action).await?,
    }

    Ok(())
}

fn pantry(config: &AppConfig, action: PantryAction) -> Result<()> {
    let mut store = LocalStore::open(&config.store_path)?;
    match action {
        PantryAction::List => {
            for ingredient in store.pantry().list() {
                println!("{:>4}  {}", ingredient.id, ingredient);
            }
        }
        PantryAction::Add { line } => {
            let added = store.add_ingredient_line(&line)?;
            println!("{:>4}  {}", added.id, added);
        }
        PantryAction::AddItem {
            name,
            quantity,
            unit,
        } => {
            let added = store.add_ingredient(&name, &quantity, &unit)?;
            println!("{:>4}  {}", added.id, added);
        }
        PantryAction::Remove { id } => {
            if !store.remove_ingredient(id)? {
                bail!("No ingredient with id {id}");
            }
        }
    }
    Ok(())
}

async fn favorites(config: &AppConfig, action: FavoriteAction) -> Result<()> {
    let mut store = LocalStore::open(&config.store_path)?;
    match action {
        FavoriteAction::List => {
            for favorite in store.favorites() {
                println!("[{}] {}", favorite.meal_id, favorite.name);
            }
        }
        FavoriteAction::Add { id } => {
            let client = MealDbClient::new(&config.mealdb)?;
            let Some(meal) = client.lookup(&id).await? else {
                bail!("No recipe with id {id}");
            };
            store.add_favorite(meal.to_favorite())?;
            println!("Added {} to favorites.", meal.name);
        }
        FavoriteAction::Remove { id } => {
            if !store.remove_favorite(&id)? {
                bail!("Recipe {id} is not a favorite");
            }
        }
    }
    Ok(())
}

async fn database(config: &AppConfig, action: DbAction) -> Result<()> {
    let Some(url) = config.database_url.as_deref() else {
        bail!("DATABASE_URL must be set for db commands");
    };
    let pool = PgPool::connect(url)
        .await
        .context("Failed to connect to database")?;

    match action {
        DbAction::Init => db::init_database_schema(&pool).await?,
        DbAction::Sync => {
            db::init_database_schema(&pool).await?;
            let user = db::get_or_create_user(&pool, &config.user_id, None).await?;
            let ctx = user.context();
            let store = LocalStore::open(&config.store_path)?;

            for ingredient in store.pantry().list() {
                db::upsert_user_ingredient(&pool, &ctx, &ingredient.name, &ingredient.quantity, &ingredient.unit)
                    .await?;
            }
            for favorite in store.favorites() {
                db::add_favorite(&pool, &ctx, favorite).await?;
            }
            let known: Vec<String> = db::list_recipes(&pool)
                .await?
                .into_iter()
                .map(|r| r.name)
                .collect();
            for recipe in store.all_recipes() {
                if !known.contains(&recipe.name) {
                    db::insert_recipe(&pool, recipe).await?;
                }
            }
            println!(
                "Synced {} ingredients and {} favorites for {}.",
                store.pantry().len(),
                store.favorites().len(),
                config.user_id
            );
        }
        DbAction::Match => {
            let user = db::get_or_create_user(&pool, &config.user_id, None).await?;
            let owned = db::list_user_ingredients(&pool, &user.context()).await?;
            let recipes = db::list_recipes(&pool).await?;
            print_matches(&find_matching_recipes(&owned, &recipes));
        }
    }
    Ok(())
}

fn print_matches(results: &[MatchResult]) {
    if results.is_empty() {
        println!("No recipes match your ingredients.");
        return;
    }
    for result in results {
        println!("{result}");
        println!("    have: {}", result.matching_ingredients.join(", "));
        let missing = result.missing_ingredients();
        if !missing.is_empty() {
            println!("    need: {}", missing.join(", "));
        }
    }
}

fn print_summaries(meals: &[MealSummary]) {
    for meal in meals {
        println!("[{}] {}", meal.id, meal.name);
    }
}

fn print_meal(meal: &Meal, favorite: bool) {
    println!("{}{}", meal.name, if favorite { " ★" } else { "" });
    let origin: Vec<&str> = [meal.category.as_deref(), meal.area.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !origin.is_empty() {
        println!("{}", origin.join(" · "));
    }
    let tags = meal.tags();
    if !tags.is_empty() {
        println!("Tags: {}", tags.join(", "));
    }

    println!("\nIngredients:");
    for ingredient in meal.ingredients() {
        if ingredient.measure.is_empty() {
            println!("  - {}", ingredient.name);
        } else {
            println!("  - {} ({})", ingredient.name, ingredient.measure);
        }
    }

    if let Some(instructions) = meal.instructions.as_deref() {
        println!("\nInstructions:\n{}", instructions.trim());
    }
    if let Some(video) = meal.video_url() {
        println!("\nVideo: {video}");
    }
}
