use crate::error::{EngineError, Result};
use chrono::Utc;
use felis_core::random::provider_for;
use felis_core::{AppConfig, EvolutionEngine, Metrics, RandomProvider};
use felis_data::{CatId, EventData, EventId, EventType, EvolutionData, EvolutionEvent, EvolutionStage};
use felis_io::EvolutionStore;
use std::sync::{Arc, Mutex};

/// Applies activity events to a cat's evolution state.
///
/// Each event is one atomic transaction: experience, adaptations, mutations
/// and the stage change are committed together with the event record, or not
/// at all.
pub struct EvolutionService<S> {
    store: Arc<S>,
    config: AppConfig,
    rng: Mutex<Box<dyn RandomProvider>>,
    metrics: Arc<Metrics>,
}

impl<S> EvolutionService<S>
where
    S: EvolutionStore,
{
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

    fn engine(&self) -> EvolutionEngine<'_> {
        EvolutionEngine::new(&self.config.evolution)
    }

    /// Processes an event and returns the id of the recorded event.
    pub fn process_event(
        &self,
        cat_id: CatId,
        event_type: impl Into<EventType>,
        data: EventData,
    ) -> Result<EventId> {
        self.apply_event(cat_id, event_type, data).map(|event| event.id)
    }

    /// Processes an event and returns the full recorded event.
    pub fn apply_event(
        &self,
        cat_id: CatId,
        event_type: impl Into<EventType>,
        data: EventData,
    ) -> Result<EvolutionEvent> {
        let event_type = event_type.into();
        let now = Utc::now();
        let engine = self.engine();

        let applied = self.store.apply_event(cat_id, now, |current| {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            engine.advance(current, event_type.clone(), data, rng.as_mut(), now)
        });

        let event = applied.map_err(|source| {
            tracing::error!(
                cat_id,
                event_type = %event_type,
                error = %source,
                "Failed to process evolution event"
            );
            self.metrics.increment_counter("evolution_failures");
            EngineError::EvolutionProcessing { cat_id, source }
        })?;

        let record = &event.record;
        self.metrics.record_event(
            record.experience_gain,
            record.adaptations.len(),
            record.mutations.len(),
        );
        tracing::info!(
            cat_id,
            event_id = event.id,
            event_type = %record.event_type,
            experience_gain = record.experience_gain,
            new_stage = record.new_stage.level(),
            adaptations = record.adaptations.len(),
            mutations = record.mutations.len(),
            "Evolution event processed"
        );
        Ok(event)
    }

    /// Stored evolution state; `None` before the first event.
    pub fn evolution_data(&self, cat_id: CatId) -> Result<Option<EvolutionData>> {
        Ok(self.store.load_evolution(cat_id)?)
    }

    /// Current stage, `Basic` for cats without recorded events.
    pub fn stage(&self, cat_id: CatId) -> Result<EvolutionStage> {
        Ok(self
            .evolution_data(cat_id)?
            .map(|data| data.evolution_stage)
            .unwrap_or_default())
    }

    pub fn events(&self, cat_id: CatId) -> Result<Vec<EvolutionEvent>> {
        Ok(self.store.events_for(cat_id)?)
    }

    pub fn can_evolve(&self, cat_id: CatId) -> Result<bool> {
        let data = self.current_or_new(cat_id)?;
        Ok(self.engine().can_evolve(&data))
    }

    /// Experience required for the next stage; `None` at the ceiling.
    pub fn next_stage_threshold(&self, cat_id: CatId) -> Result<Option<u64>> {
        let data = self.current_or_new(cat_id)?;
        Ok(self.engine().next_stage_threshold(&data))
    }

    fn current_or_new(&self, cat_id: CatId) -> Result<EvolutionData> {
        Ok(self
            .evolution_data(cat_id)?
            .unwrap_or_else(|| EvolutionData::new(cat_id, Utc::now())))
    }
}
