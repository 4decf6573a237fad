//! Engine metrics collection.
//!
//! Provides structured logging and counters for monitoring breeding and
//! evolution activity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Metrics collector shared by the genetics and evolution services.
pub struct Metrics {
    inheritances: AtomicU64,
    profiles: AtomicU64,
    events: AtomicU64,
    experience: AtomicU64,
    pub counters: Mutex<HashMap<String, AtomicU64>>,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inheritances: AtomicU64::new(0),
            profiles: AtomicU64::new(0),
            events: AtomicU64::new(0),
            experience: AtomicU64::new(0),
            counters: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Records a computed inheritance and the mutations it produced.
    pub fn record_inheritance(&self, mutations: usize) {
        self.inheritances.fetch_add(1, Ordering::Relaxed);
        self.add_to_counter("genetic_mutations", mutations as u64);
    }

    /// Records a persisted genetic profile.
    pub fn record_profile(&self) {
        self.profiles.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a committed evolution event.
    pub fn record_event(&self, experience_gain: u64, adaptations: usize, mutations: usize) {
        let events = self.events.fetch_add(1, Ordering::Relaxed) + 1;
        self.experience.fetch_add(experience_gain, Ordering::Relaxed);
        self.add_to_counter("adaptations", adaptations as u64);
        self.add_to_counter("evolution_mutations", mutations as u64);

        if events.is_multiple_of(1000) {
            tracing::info!(
                events,
                experience = self.experience.load(Ordering::Relaxed),
                elapsed_ms = self.elapsed().as_millis() as u64,
                "Evolution events processed"
            );
        }
    }

    /// Increments a named counter.
    pub fn increment_counter(&self, name: &str) {
        self.add_to_counter(name, 1);
    }

    fn add_to_counter(&self, name: &str, amount: u64) {
        if amount == 0 {
            return;
        }
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(amount, Ordering::Relaxed);
    }

    /// Current value of a named counter; 0 if it was never touched.
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn inheritance_count(&self) -> u64 {
        self.inheritances.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn profile_count(&self) -> u64 {
        self.profiles.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total_experience(&self) -> u64 {
        self.experience.load(Ordering::Relaxed)
    }

    /// Gets elapsed time since metrics creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Initialize tracing subscriber for logging.
pub fn init_logging() {
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::INFO)
            .finish(),
    )
    .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.event_count(), 0);
        assert_eq!(metrics.counter("adaptations"), 0);
    }

    #[test]
    fn test_record_event() {
        let metrics = Metrics::new();
        metrics.record_event(18, 2, 1);
        metrics.record_event(5, 0, 0);
        assert_eq!(metrics.event_count(), 2);
        assert_eq!(metrics.total_experience(), 23);
        assert_eq!(metrics.counter("adaptations"), 2);
        assert_eq!(metrics.counter("evolution_mutations"), 1);
    }

    #[test]
    fn test_increment_counter() {
        let metrics = Metrics::new();
        metrics.increment_counter("missing_parent");
        metrics.increment_counter("missing_parent");
        assert_eq!(metrics.counter("missing_parent"), 2);
    }

    #[test]
    fn test_record_inheritance() {
        let metrics = Metrics::new();
        metrics.record_inheritance(3);
        metrics.record_profile();
        assert_eq!(metrics.inheritance_count(), 1);
        assert_eq!(metrics.profile_count(), 1);
        assert_eq!(metrics.counter("genetic_mutations"), 3);
    }
}
