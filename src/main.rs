use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use felis_core::catalog::{default_patterns, EXCELLENCE_THRESHOLD};
use felis_core::{init_logging, AppConfig, ExcellentTrait, Metrics};
use felis_data::{CatId, EventData};
use felis_io::{from_json, read_json_file, to_json_pretty, SqliteStore};
use felis_lib::{EvolutionService, GeneticsService, Parentage};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Database path, overriding the config
    #[arg(long)]
    db: Option<String>,

    /// Random seed, overriding the config
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the built-in trait catalog into the database
    SeedCatalog,
    /// Create a first-generation cat with random traits
    Founder {
        #[arg(long)]
        cat_id: CatId,
    },
    /// Create a child of one or two stored parents
    Breed {
        #[arg(long)]
        parent1: CatId,
        #[arg(long)]
        parent2: Option<CatId>,
        #[arg(long)]
        child: CatId,
    },
    /// Compute inheritance for two parents without storing a child
    Inherit {
        #[arg(long)]
        parent1: CatId,
        #[arg(long)]
        parent2: CatId,
    },
    /// Apply an activity event to a cat
    Event {
        #[arg(long)]
        cat_id: CatId,
        /// Activity type, e.g. training or exploration
        #[arg(long)]
        event_type: String,
        /// Event payload as JSON
        #[arg(long, conflicts_with = "data_file")]
        data: Option<String>,
        /// Event payload read from a JSON file
        #[arg(long)]
        data_file: Option<String>,
    },
    /// Print a cat's genetic profile, evolution state and event log
    Show {
        #[arg(long)]
        cat_id: CatId,
    },
    /// Check whether two cats may breed
    CheckBreeding {
        #[arg(long)]
        parent1: CatId,
        #[arg(long)]
        parent2: CatId,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", to_json_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config))?;
    if let Some(db) = args.db {
        config.storage.database_path = db;
    }
    if args.seed.is_some() {
        config.storage.seed = args.seed;
    }
    tracing::info!(
        fingerprint = %config.fingerprint(),
        database = %config.storage.database_path,
        "Configuration loaded"
    );

    let store = Arc::new(SqliteStore::open(&config.storage.database_path)?);
    let metrics = Arc::new(Metrics::new());
    let genetics =
        GeneticsService::new(Arc::clone(&store), config.clone()).with_metrics(Arc::clone(&metrics));
    let evolution = EvolutionService::new(Arc::clone(&store), config).with_metrics(metrics);

    match args.command {
        Command::SeedCatalog => {
            let count = store.seed_catalog(&default_patterns())?;
            println!("Seeded {count} trait patterns.");
        }
        Command::Founder { cat_id } => {
            print_json(&genetics.initialize_profile(cat_id, Parentage::Founder)?)?;
        }
        Command::Breed {
            parent1,
            parent2,
            child,
        } => {
            let parentage = match parent2 {
                Some(parent2) => Parentage::Pair(parent1, parent2),
                None => Parentage::Single(parent1),
            };
            print_json(&genetics.initialize_profile(child, parentage)?)?;
        }
        Command::Inherit { parent1, parent2 } => {
            print_json(&genetics.process_inheritance(parent1, parent2)?)?;
        }
        Command::Event {
            cat_id,
            event_type,
            data,
            data_file,
        } => {
            let payload: EventData = match (data, data_file) {
                (Some(json), _) => from_json(&json)?,
                (None, Some(path)) => read_json_file(path)?,
                (None, None) => EventData::default(),
            };
            let event = evolution.apply_event(cat_id, event_type.as_str(), payload)?;
            print_json(&event)?;
        }
        Command::Show { cat_id } => {
            #[derive(Serialize)]
            struct CatReport {
                profile: Option<felis_data::GeneticProfile>,
                category_values: Option<BTreeMap<felis_data::TraitCategory, f64>>,
                excellent_traits: Option<Vec<ExcellentTrait>>,
                evolution: Option<felis_data::EvolutionData>,
                next_stage_threshold: Option<u64>,
                can_evolve: bool,
                events: Vec<felis_data::EvolutionEvent>,
            }

            print_json(&CatReport {
                profile: genetics.profile(cat_id)?,
                category_values: genetics.category_values(cat_id)?,
                excellent_traits: genetics.excellent_traits(cat_id, EXCELLENCE_THRESHOLD)?,
                evolution: evolution.evolution_data(cat_id)?,
                next_stage_threshold: evolution.next_stage_threshold(cat_id)?,
                can_evolve: evolution.can_evolve(cat_id)?,
                events: evolution.events(cat_id)?,
            })?;
        }
        Command::CheckBreeding { parent1, parent2 } => {
            let issues = genetics.compatibility(
                (parent1, evolution.stage(parent1)?),
                (parent2, evolution.stage(parent2)?),
            )?;
            if issues.is_empty() {
                println!("Cats {parent1} and {parent2} can breed.");
            } else {
                println!("Cats {parent1} and {parent2} cannot breed:");
                for issue in issues {
                    println!("  - {issue}");
                }
            }
        }
    }

    Ok(())
}
