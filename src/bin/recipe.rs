//! Recipe CLI - build and stage packages from declarative recipes
//!
//! Usage:
//!   recipe build <recipe>          Run the full pipeline and commit to the store
//!   recipe source <recipe>         Acquire the source only
//!   recipe plan <recipe>           Show what a build would do
//!   recipe info <recipe>           Show package linkage metadata
//!   recipe list                    List recipes and stored packages

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use pkg_recipe::executor::StaticResolver;
use pkg_recipe::{Context, Executor, PackageStore, Recipe, SourceSpec, is_valid_name, output};
use std::path::{Path, PathBuf};

/// Default directory under the user's data dir (XDG compliant)
fn default_data_path(leaf: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recipe")
        .join(leaf)
}

fn default_build_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("recipe/build")
}

#[derive(Parser)]
#[command(name = "recipe")]
#[command(about = "Build and stage pkg-config packages from declarative recipes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to recipes directory
    #[arg(short = 'r', long, global = true, env = "RECIPE_PATH")]
    recipes_path: Option<PathBuf>,

    /// Package store directory
    #[arg(short = 's', long, global = true, env = "RECIPE_STORE")]
    store: Option<PathBuf>,

    /// Build directory sources are acquired into
    #[arg(short, long, global = true, env = "RECIPE_BUILD_DIR")]
    build_dir: Option<PathBuf>,

    /// Echo build command output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run source, config, build, package and info, then commit to the store
    Build {
        /// Recipe name (`name` or `name@version`) or path to a recipe file
        recipe: String,

        /// Use a package root for a dependency instead of the store (NAME=PATH)
        #[arg(long = "with", value_parser = parse_with)]
        with: Vec<(String, PathBuf)>,
    },

    /// Acquire the source tree only
    Source {
        recipe: String,
    },

    /// Show the resolved source, dependencies, commands and artifacts
    Plan {
        recipe: String,
    },

    /// Show package linkage metadata
    Info {
        recipe: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available recipes and stored packages
    List,
}

fn parse_with(s: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{}'", s))?;
    if name.is_empty() || path.is_empty() {
        return Err(format!("expected NAME=PATH, got '{}'", s));
    }
    Ok((name.to_string(), PathBuf::from(path)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let recipes_path = cli
        .recipes_path
        .clone()
        .unwrap_or_else(|| default_data_path("recipes"));
    let store = PackageStore::new(cli.store.clone().unwrap_or_else(|| default_data_path("packages")));

    match &cli.command {
        Commands::Build { recipe, with } => {
            let recipe = load_recipe(recipe, &recipes_path)?;
            let package_dir = store.prepare(&recipe)?;
            let ctx = context_for(&cli, &recipe, package_dir);

            let resolver = with
                .iter()
                .fold(StaticResolver::new(), |r, (name, path)| r.with(name, path))
                .fallback(store.clone());
            let executor = Executor::new(ctx).with_resolver(resolver);

            output::action(&format!("Building {} {}", recipe.name, recipe.version));
            let execution = match executor.execute(&recipe) {
                Ok(execution) => execution,
                Err(e) => {
                    let done: Vec<&str> = e.completed.iter().map(|p| p.name()).collect();
                    output::error(&format!("{}: {}", e, e.error));
                    if !done.is_empty() {
                        output::detail(&format!("completed: {}", done.join(", ")));
                    }
                    std::process::exit(1);
                }
            };
            let stored = store.commit(&recipe, &execution.info)?;

            output::success(&format!(
                "{} {} staged ({} files) in {}",
                recipe.name,
                recipe.version,
                execution.staged.len(),
                stored.root.display()
            ));
            output::info(&format!("libs: {}", execution.info.libs.join(", ")));
        }

        Commands::Source { recipe } => {
            let recipe = load_recipe(recipe, &recipes_path)?;
            let ctx = context_for(&cli, &recipe, store.package_root(&recipe));
            let executor = Executor::new(ctx);

            output::action(&format!("Fetching {} {}", recipe.name, recipe.version));
            let source_dir = executor.acquire_source(&recipe)?;
            output::success(&format!("source in {}", source_dir.display()));
        }

        Commands::Plan { recipe } => {
            let recipe = load_recipe(recipe, &recipes_path)?;
            let ctx = context_for(&cli, &recipe, store.package_root(&recipe));
            show_plan(&recipe, &ctx);
        }

        Commands::Info { recipe, json } => {
            let recipe = load_recipe(recipe, &recipes_path)?;
            let info = Executor::describe_package_info(&recipe);
            if *json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                output::info(&format!("{} {}", info.name.bold(), info.version));
                if let Some(desc) = &recipe.description {
                    println!("  {}", desc);
                }
                println!("  {} {}", "libs:".cyan(), info.libs.join(", "));
                println!("  {} {}", "pkg-config:".cyan(), info.pkg_config);
                println!("  {} {}", "package id:".cyan(), recipe.package_id());
            }
        }

        Commands::List => {
            list(&recipes_path, &store)?;
        }
    }

    Ok(())
}

fn context_for(cli: &Cli, recipe: &Recipe, package_dir: PathBuf) -> Context {
    let work_dir = cli
        .build_dir
        .clone()
        .unwrap_or_else(default_build_path)
        .join(format!("{}-{}", recipe.name, recipe.version));
    Context::new(work_dir, package_dir).verbose(cli.verbose)
}

fn show_plan(recipe: &Recipe, ctx: &Context) {
    output::action(&format!("Plan for {} {}", recipe.name, recipe.version));

    output::sub_action("source");
    let method = match &recipe.source {
        SourceSpec::Git(_) => "git clone",
        SourceSpec::Archive(_) => "download",
    };
    output::detail(&format!("{} {}", method, recipe.source_url()));
    output::detail(&format!("into {}", ctx.work_dir.join(recipe.source_dir_name()).display()));

    output::sub_action("config");
    if recipe.deps.is_empty() {
        output::detail("(no dependencies)");
    }
    for dep in &recipe.deps {
        output::detail(&format!("requires {}", dep));
    }

    output::sub_action("build");
    for cmd in &recipe.build.commands {
        output::detail(&recipe.expand(cmd));
    }

    output::sub_action("package");
    for rule in &recipe.artifacts {
        output::detail(&format!(
            "{}/{} -> {}{}",
            rule.from,
            recipe.expand(&rule.pattern),
            rule.kind,
            if rule.required { "" } else { " (optional)" }
        ));
    }
    output::detail(&format!("root {}", ctx.package_dir.display()));
    output::detail(&format!("package id {}", recipe.package_id()));

    output::sub_action("info");
    output::detail(&format!("libs: {}", recipe.libs().join(", ")));
}

fn list(recipes_path: &Path, store: &PackageStore) -> Result<()> {
    output::info("Recipes:");
    let recipes = recipe_files(recipes_path)?;
    if recipes.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for path in recipes {
        match Recipe::load(&path) {
            Ok(r) => {
                let built = store.find(&r.name, &r.version)?.is_some();
                let status = if built { "[built]" } else { "" };
                output::list_item(&format!("{} {}", r.name, r.version), status, built);
            }
            Err(e) => output::warning(&format!("{}: {}", path.display(), e)),
        }
    }

    output::info(&format!("Stored packages in {}:", store.root().display()));
    let packages = store.list()?;
    if packages.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for p in packages {
        output::list_item(
            &format!("{} {}", p.manifest.name, p.manifest.version),
            &p.manifest.package_id,
            true,
        );
    }
    Ok(())
}

fn recipe_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read recipes directory: {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("toml"))
        .collect();
    files.sort();
    Ok(files)
}

/// Load a recipe by path, `name@version` or bare name (newest version).
fn load_recipe(spec: &str, recipes_path: &Path) -> Result<Recipe> {
    let path = resolve_recipe(spec, recipes_path)?;
    Recipe::load(&path).with_context(|| format!("Failed to load recipe: {}", path.display()))
}

fn resolve_recipe(spec: &str, recipes_path: &Path) -> Result<PathBuf> {
    let is_explicit_path = spec.contains('/') || spec.contains('\\') || spec.ends_with(".toml");
    if is_explicit_path {
        let as_path = PathBuf::from(spec);
        if as_path.exists() {
            return Ok(as_path);
        }
        anyhow::bail!("Recipe file not found: {}", spec);
    }

    let (name, version) = match spec.split_once('@') {
        Some((n, v)) => (n, Some(v)),
        None => (spec, None),
    };
    if !is_valid_name(name) {
        anyhow::bail!(
            "Invalid package name '{}': must start with a letter or digit and contain only letters, digits, '-', '_', '.' and '+'",
            name
        );
    }

    if let Some(version) = version {
        let file = recipes_path.join(format!("{}-{}.toml", name, version));
        if file.exists() {
            return Ok(file);
        }
        anyhow::bail!("Recipe not found: {}@{}\nSearched in: {}", name, version, recipes_path.display());
    }

    let plain = recipes_path.join(format!("{}.toml", name));
    if plain.exists() {
        return Ok(plain);
    }

    // Newest <name>-<version>.toml
    let prefix = format!("{}-", name);
    let newest = recipe_files(recipes_path)?
        .into_iter()
        .filter_map(|p| {
            let stem = p.file_stem()?.to_str()?;
            let version = semver::Version::parse(stem.strip_prefix(&prefix)?).ok()?;
            Some((version, p))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, p)| p);

    newest.ok_or_else(|| {
        anyhow::anyhow!("Recipe not found: {}\nSearched in: {}", name, recipes_path.display())
    })
}
