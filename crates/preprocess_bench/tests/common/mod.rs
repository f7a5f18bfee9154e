//! Shared helpers for harness-level integration tests: controlled-cost
//! stages and a minimal dataset builder, so timing behavior can be tested
//! without real image transforms.
#![allow(dead_code)]

use anyhow::Result;
use preprocess_bench::{Sample, SampleSource, SamplingRng, Stage};
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tch::Tensor;

/// Stage that sleeps for a fixed duration. Lets tests pin expected
/// medians without depending on real transform cost.
pub struct SleepStage {
    name: &'static str,
    duration: Duration,
}

impl SleepStage {
    pub fn new(name: &'static str, millis: u64) -> Self {
        Self {
            name,
            duration: Duration::from_millis(millis),
        }
    }
}

impl Stage for SleepStage {
    fn name(&self) -> &str {
        self.name
    }

    fn invoke(&self, sample: Sample, _rng: &mut StdRng) -> Result<Sample> {
        if !self.duration.is_zero() {
            std::thread::sleep(self.duration);
        }
        Ok(sample)
    }
}

/// Stage that counts its invocations, for warm-up accounting tests.
pub struct CountingStage {
    pub invocations: Arc<AtomicUsize>,
}

impl CountingStage {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        (
            Self {
                invocations: counter.clone(),
            },
            counter,
        )
    }
}

impl Stage for CountingStage {
    fn name(&self) -> &str {
        "counting"
    }

    fn invoke(&self, sample: Sample, _rng: &mut StdRng) -> Result<Sample> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(sample)
    }
}

/// Minimal tensor-backed dataset: sample i carries the scalar i.
pub fn index_dataset(
    _api: preprocess_bench::ApiVariant,
    _rng: &mut SamplingRng,
    num_samples: usize,
) -> Result<SampleSource> {
    SampleSource::materialize(
        (0..).map(|i: i64| Ok(Sample::tensor(Tensor::from_slice(&[i]), Some(i)))),
        num_samples,
    )
}
