use crate::error::{EngineError, Result};
use chrono::Utc;
use felis_core::random::provider_for;
use felis_core::{
    category_values, check_compatibility, excellent_traits, AppConfig, Breeder, ExcellentTrait,
    Incompatibility, Metrics, PatternSet, RandomProvider,
};
use felis_data::{
    CatId, EvolutionStage, GeneticProfile, InheritanceResult, Mutation, TraitCategory,
};
use felis_io::{GeneticStore, TraitPatternCatalog};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Where a new profile's genes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parentage {
    /// Random traits drawn from the catalog.
    Founder,
    /// One known parent, inherited against itself.
    Single(CatId),
    /// Two known parents.
    Pair(CatId, CatId),
}

/// Creates genetic profiles and computes inheritance for parent pairs.
pub struct GeneticsService<S> {
    store: Arc<S>,
    config: AppConfig,
    rng: Mutex<Box<dyn RandomProvider>>,
    metrics: Arc<Metrics>,
}

impl<S> GeneticsService<S>
where
    S: GeneticStore + TraitPatternCatalog,
{
    /// Uses the configured seed when present, entropy otherwise.
    pub fn new(store: Arc<S>, config: AppConfig) -> Self {
        let rng = provider_for(config.storage.seed);
        Self {
            store,
            config,
            rng: Mutex::new(rng),
            metrics: Arc::new(Metrics::new()),
        }
    }

    #[must_use]
    pub fn with_random(mut self, rng: Box<dyn RandomProvider>) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn patterns(&self) -> Result<PatternSet> {
        self.store
            .patterns()
            .map(PatternSet::new)
            .map_err(|e| {
                tracing::error!(error = %e, "Trait catalog unavailable");
                self.metrics.increment_counter("catalog_unavailable");
                EngineError::CatalogUnavailable(e)
            })
    }

    fn load_parents(&self, ids: &[CatId]) -> Result<Vec<GeneticProfile>> {
        let mut parents = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        for &id in ids {
            match self.store.load_profile(id)? {
                Some(profile) => parents.push(profile),
                None => missing.push(id),
            }
        }
        if !missing.is_empty() {
            tracing::error!(missing = ?missing, "Parent genetic data not found");
            self.metrics.increment_counter("missing_parent");
            return Err(EngineError::MissingParentData(missing));
        }
        Ok(parents)
    }

    pub fn profile(&self, cat_id: CatId) -> Result<Option<GeneticProfile>> {
        Ok(self.store.load_profile(cat_id)?)
    }

    /// Average numeric trait level per category; `None` for an unknown cat.
    pub fn category_values(&self, cat_id: CatId) -> Result<Option<BTreeMap<TraitCategory, f64>>> {
        Ok(self.profile(cat_id)?.as_ref().map(category_values))
    }

    /// Traits whose level reaches `threshold`; `None` for an unknown cat.
    pub fn excellent_traits(
        &self,
        cat_id: CatId,
        threshold: f64,
    ) -> Result<Option<Vec<ExcellentTrait>>> {
        Ok(self
            .profile(cat_id)?
            .map(|profile| excellent_traits(&profile, threshold)))
    }

    /// Builds, persists and returns the profile of a new cat.
    ///
    /// The profile only exists once the write succeeds.
    pub fn initialize_profile(&self, cat_id: CatId, parentage: Parentage) -> Result<GeneticProfile> {
        let patterns = self.patterns()?;
        let breeder = Breeder::new(&self.config);

        let profile = match parentage {
            Parentage::Founder => {
                let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
                breeder.founder(cat_id, &patterns, rng.as_mut())
            }
            Parentage::Single(parent_id) => {
                let parents = self.load_parents(&[parent_id])?;
                let parent = &parents[0];
                let result = self.inherit(parent, parent, &patterns);
                breeder.child_profile(cat_id, &[parent], &result)
            }
            Parentage::Pair(parent1_id, parent2_id) => {
                let parents = self.load_parents(&[parent1_id, parent2_id])?;
                let (p1, p2) = (&parents[0], &parents[1]);
                let result = self.inherit(p1, p2, &patterns);
                breeder.child_profile(cat_id, &[p1, p2], &result)
            }
        };

        self.store.insert_profile(&profile).map_err(|e| {
            tracing::error!(cat_id, error = %e, "Failed to persist genetic profile");
            EngineError::from(e)
        })?;
        self.metrics.record_profile();

        tracing::info!(
            cat_id,
            generation = profile.generation,
            traits = profile.trait_data.len(),
            mutations = profile.mutation_history.len(),
            "Genetic profile initialized"
        );
        Ok(profile)
    }

    /// Runs inheritance, mutation and fitness for two stored parents.
    ///
    /// Nothing is persisted; storing the child is the caller's job.
    pub fn process_inheritance(
        &self,
        parent1_id: CatId,
        parent2_id: CatId,
    ) -> Result<InheritanceResult> {
        let parents = self.load_parents(&[parent1_id, parent2_id])?;
        let patterns = self.patterns()?;
        let result = self.inherit(&parents[0], &parents[1], &patterns);

        tracing::info!(
            parent1 = parent1_id,
            parent2 = parent2_id,
            traits = result.inherited_traits.len(),
            mutations = result.mutations.len(),
            fitness_score = result.fitness_score,
            "Inheritance processed"
        );
        Ok(result)
    }

    /// Creates a child of two stored parents.
    pub fn breed(&self, parent1_id: CatId, parent2_id: CatId, child_id: CatId) -> Result<GeneticProfile> {
        self.initialize_profile(child_id, Parentage::Pair(parent1_id, parent2_id))
    }

    /// Appends a mutation to an existing profile's history.
    pub fn record_mutation(&self, cat_id: CatId, mutation: &Mutation) -> Result<GeneticProfile> {
        let profile = self.store.append_mutation(cat_id, mutation)?;
        tracing::info!(
            cat_id,
            kind = %mutation.kind,
            origin = mutation.origin.name(),
            "Mutation recorded"
        );
        Ok(profile)
    }

    /// Pairing rules broken by two stored cats at the given stages.
    pub fn compatibility(
        &self,
        parent1: (CatId, EvolutionStage),
        parent2: (CatId, EvolutionStage),
    ) -> Result<Vec<Incompatibility>> {
        let parents = self.load_parents(&[parent1.0, parent2.0])?;
        Ok(check_compatibility(
            &self.config.breeding,
            (&parents[0], parent1.1),
            (&parents[1], parent2.1),
        ))
    }

    fn inherit(
        &self,
        parent1: &GeneticProfile,
        parent2: &GeneticProfile,
        patterns: &PatternSet,
    ) -> InheritanceResult {
        let result = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            Breeder::new(&self.config).inherit(parent1, parent2, patterns, rng.as_mut(), Utc::now())
        };
        self.metrics.record_inheritance(result.mutations.len());
        result
    }
}
