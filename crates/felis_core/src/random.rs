//! Random sampling primitives.
//!
//! Every probabilistic operation in the engine draws through [`RandomProvider`],
//! so a run can be made reproducible with [`SeededRandom`] or fully scripted
//! with [`ScriptedRandom`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::collections::VecDeque;

/// Uniform and Gaussian sampling source.
pub trait RandomProvider: Send {
    /// Uniform sample in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Normal sample with the given mean and standard deviation.
    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64;

    /// Uniform index in `0..len`. Returns 0 for an empty range.
    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.uniform() * len as f64) as usize).min(len - 1)
    }

    /// Strength in `(0, 1]`, in steps of 0.01.
    fn strength(&mut self) -> f64 {
        (self.pick(100) + 1) as f64 / 100.0
    }

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.uniform() < p
    }
}

fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    match Normal::new(mean, std_dev) {
        Ok(normal) => normal.sample(rng),
        Err(err) => {
            tracing::warn!(mean, std_dev, error = %err, "Invalid normal distribution, using mean");
            mean
        }
    }
}

/// Reproducible provider backed by ChaCha8.
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl RandomProvider for SeededRandom {
    fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        sample_normal(&mut self.rng, mean, std_dev)
    }
}

/// Provider drawing from the calling thread's generator.
#[derive(Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomProvider for ThreadRandom {
    fn uniform(&mut self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }

    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        sample_normal(&mut rand::thread_rng(), mean, std_dev)
    }
}

/// Provider replaying queued draws, then falling back to a seeded source.
///
/// Queued Gaussian values are standard-normal `z` scores, scaled by the
/// requested mean and standard deviation.
pub struct ScriptedRandom {
    uniforms: VecDeque<f64>,
    normals: VecDeque<f64>,
    fallback: SeededRandom,
}

impl ScriptedRandom {
    #[must_use]
    pub fn new(uniforms: impl IntoIterator<Item = f64>) -> Self {
        Self {
            uniforms: uniforms.into_iter().collect(),
            normals: VecDeque::new(),
            fallback: SeededRandom::new(0),
        }
    }

    #[must_use]
    pub fn with_normals(mut self, normals: impl IntoIterator<Item = f64>) -> Self {
        self.normals = normals.into_iter().collect();
        self
    }

    /// Number of queued uniform draws not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.uniforms.len()
    }
}

impl RandomProvider for ScriptedRandom {
    fn uniform(&mut self) -> f64 {
        match self.uniforms.pop_front() {
            Some(v) => v,
            None => self.fallback.uniform(),
        }
    }

    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        match self.normals.pop_front() {
            Some(z) => mean + z * std_dev,
            None => self.fallback.gaussian(mean, std_dev),
        }
    }
}

/// Seeded provider when a seed is configured, thread-local otherwise.
#[must_use]
pub fn provider_for(seed: Option<u64>) -> Box<dyn RandomProvider> {
    match seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom),
    }
}
