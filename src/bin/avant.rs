//! avant — the Avant CLI
//!
//! # Usage
//!
//! ```bash
//! # Scaffold avant/schema.avant
//! avant init
//!
//! # Show what the schema compiles to
//! avant models
//!
//! # Export table metadata
//! avant build --out tables.json
//!
//! # Compile a request
//! avant sql User '{"op": "findUnique", "args": {"where": {"email": "a@b.com"}}}'
//! ```

use anyhow::{bail, Context, Result};
use avant::prelude::*;
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const STARTER_SCHEMA: &str = "schema User {
  id string $id
  email string $unique
  name string? $default('Unknown')
  role *Role $relation(fields: [roleId], references: [id])
  roleId string
  age number
}

schema Role {
  id string $id
  name string
  user *User[] $relation(fields: [id], references: [roleId])
}
";

#[derive(Parser)]
#[command(name = "avant")]
#[command(version)]
#[command(about = "Schema-driven query compiler", long_about = None)]
#[command(after_help = "EXAMPLES:
    avant init
    avant models
    avant build --out tables.json
    avant sql User '{\"op\": \"findMany\", \"args\": {\"take\": 10}}'")]
struct Cli {
    /// Config file (defaults to ./avant.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Schema file (overrides the config)
    #[arg(short, long, global = true)]
    schema: Option<PathBuf>,

    /// Table name prefix (overrides the config)
    #[arg(long, global = true, env = "AVANT_PREFIX")]
    prefix: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter schema to <DIR>/avant/schema.avant
    Init {
        /// Project directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Print models, unique columns, defaults and relations
    Models,
    /// Export compiled table metadata as JSON
    Build {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Compile a JSON request against a model
    Sql {
        /// Model name
        model: String,
        /// Request, e.g. '{"op": "findMany", "args": {"take": 5}}'
        query: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(prefix) = &cli.prefix {
        config = config.with_prefix(prefix.clone());
    }
    if let Some(schema) = &cli.schema {
        config = config.with_schema(schema.clone());
    }

    match &cli.command {
        Commands::Init { dir } => init_project(dir),
        Commands::Models => show_models(&load_registry(&config)?),
        Commands::Build { out } => build(&load_registry(&config)?, out.as_deref()),
        Commands::Sql { model, query } => compile_query(&load_registry(&config)?, model, query),
    }
}

fn load_registry(config: &Config) -> Result<Registry> {
    let text = fs::read_to_string(&config.schema)
        .with_context(|| format!("failed to read schema {}", config.schema.display()))?;
    let registry = Registry::parse(&text, &config.prefix)?;
    tracing::info!(
        "Loaded {} models from {}",
        registry.models().len(),
        config.schema.display()
    );
    Ok(registry)
}

fn init_project(dir: &Path) -> Result<()> {
    let folder = dir.join("avant");
    let schema = folder.join("schema.avant");

    if dir.join("schema.avant").exists() {
        bail!("{} already exists", dir.join("schema.avant").display());
    }
    if folder.exists() {
        bail!("{} already exists", folder.display());
    }

    fs::create_dir_all(&folder)?;
    fs::write(&schema, STARTER_SCHEMA)?;
    println!("{} Wrote {}", "✓".green(), schema.display().to_string().cyan());
    Ok(())
}

fn show_models(registry: &Registry) -> Result<()> {
    for model in registry.models() {
        let Some(meta) = registry.metadata(&model.name) else {
            continue;
        };
        println!("{} {}", model.name.cyan().bold(), format!("→ {}", meta.table_name).dimmed());

        for field in &model.fields {
            let mut flags = Vec::new();
            if field.is_id {
                flags.push("id".to_string());
            }
            if field.is_unique {
                flags.push("unique".to_string());
            }
            if let Some(default) = &field.default {
                flags.push(format!("default {}", default));
            }
            if let Some(rel) = &field.relation {
                flags.push(format!(
                    "{}.{} → {}.{}",
                    model.name, rel.local_field, rel.target_model, rel.referenced_field
                ));
            }
            println!(
                "  {:<12} {:<16} {}",
                field.name.white(),
                field.ty.declared().yellow(),
                flags.join(", ").dimmed()
            );
        }

        if !meta.relations.is_empty() {
            println!("  {}", "Joins:".dimmed());
            for (target, rel) in &meta.relations {
                println!(
                    "    LEFT JOIN {} ON {}.{} = {}.{}",
                    target.green(),
                    meta.table_name,
                    rel.field,
                    target,
                    rel.references
                );
            }
        }
        println!();
    }
    Ok(())
}

fn build(registry: &Registry, out: Option<&Path>) -> Result<()> {
    let json = registry.to_json()?;
    match out {
        Some(path) => {
            fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{} Wrote {}", "✓".green(), path.display().to_string().cyan());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn compile_query(registry: &Registry, model: &str, query: &str) -> Result<()> {
    let query: Query = serde_json::from_str(query).context("invalid request JSON")?;
    let client = Client::new(registry);
    let sql = client.compile(model, &query)?;
    println!("{}", sql);
    Ok(())
}
