#[macro_use]
pub mod macros;

use felis_core::catalog::default_patterns;
use felis_core::{AppConfig, RandomProvider, ScriptedRandom, SeededRandom};
use felis_data::{CatId, Gene, GeneticProfile, TraitValue};
use felis_io::{GeneticStore, SqliteStore};
use felis_lib::{EvolutionService, GeneticsService};
use std::sync::Arc;

#[allow(dead_code)]
pub struct Engine {
    pub store: Arc<SqliteStore>,
    pub genetics: GeneticsService<SqliteStore>,
    pub evolution: EvolutionService<SqliteStore>,
    pub config: AppConfig,
}

#[allow(dead_code)]
pub struct EngineBuilder {
    config: AppConfig,
    profiles: Vec<GeneticProfile>,
    genetics_rng: Option<Box<dyn RandomProvider>>,
    evolution_rng: Option<Box<dyn RandomProvider>>,
    seed_catalog: bool,
}

#[allow(dead_code)]
impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            profiles: Vec::new(),
            genetics_rng: None,
            evolution_rng: None,
            seed_catalog: true,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.storage.seed = Some(seed);
        self.genetics_rng = Some(Box::new(SeededRandom::new(seed)));
        self.evolution_rng = Some(Box::new(SeededRandom::new(seed.wrapping_add(1))));
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    /// Queues exact uniform draws for the evolution service.
    pub fn with_evolution_draws(mut self, draws: Vec<f64>) -> Self {
        self.evolution_rng = Some(Box::new(ScriptedRandom::new(draws)));
        self
    }

    pub fn with_genetics_random(mut self, rng: Box<dyn RandomProvider>) -> Self {
        self.genetics_rng = Some(rng);
        self
    }

    pub fn with_profile(mut self, profile: GeneticProfile) -> Self {
        self.profiles.push(profile);
        self
    }

    pub fn without_catalog(mut self) -> Self {
        self.seed_catalog = false;
        self
    }

    pub fn build(self) -> Engine {
        let store = Arc::new(SqliteStore::open_in_memory().expect("in-memory store"));
        if self.seed_catalog {
            store
                .seed_catalog(&default_patterns())
                .expect("Failed to seed catalog in test builder");
        }
        for profile in &self.profiles {
            store.insert_profile(profile).expect("Failed to insert profile");
        }

        let mut genetics = GeneticsService::new(Arc::clone(&store), self.config.clone());
        if let Some(rng) = self.genetics_rng {
            genetics = genetics.with_random(rng);
        }
        let mut evolution = EvolutionService::new(Arc::clone(&store), self.config.clone());
        if let Some(rng) = self.evolution_rng {
            evolution = evolution.with_random(rng);
        }

        Engine {
            store,
            genetics,
            evolution,
            config: self.config,
        }
    }
}

#[allow(dead_code)]
pub struct ProfileBuilder {
    profile: GeneticProfile,
}

#[allow(dead_code)]
impl ProfileBuilder {
    pub fn new(cat_id: CatId) -> Self {
        Self {
            profile: GeneticProfile::founder(cat_id),
        }
    }

    pub fn generation(mut self, generation: u32) -> Self {
        self.profile.generation = generation;
        self
    }

    pub fn lineage(mut self, ancestors: &[CatId]) -> Self {
        self.profile.lineage_path = ancestors.to_vec();
        self
    }

    pub fn marker(mut self, name: &str, value: impl Into<Gene>) -> Self {
        self.profile
            .genetic_markers
            .insert(name.to_string(), value.into());
        self
    }

    pub fn allele(mut self, trait_name: &str, allele: &str) -> Self {
        self.profile
            .trait_data
            .insert(trait_name.to_string(), TraitValue::Allele(allele.to_string()));
        self
    }

    pub fn genes(mut self, trait_name: &str, genes: &[(&str, Gene)]) -> Self {
        self.profile.trait_data.insert(
            trait_name.to_string(),
            TraitValue::Genes(
                genes
                    .iter()
                    .map(|(marker, gene)| ((*marker).to_string(), gene.clone()))
                    .collect(),
            ),
        );
        self
    }

    pub fn build(self) -> GeneticProfile {
        self.profile
    }
}
