use crate::sample::Sample;
use crate::stage::Stage;
use anyhow::{ensure, Result};
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};

/// An ordered composition of stages, instrumented to record the elapsed
/// time of every stage invocation individually.
///
/// Per-stage timing (not just end-to-end) is the point of this harness:
/// stage cost profiles differ wildly (object construction vs. vectorized
/// tensor math vs. fused kernels), and a single end-to-end number would
/// hide which stage dominates.
///
/// # Lifecycle
/// One `TimedPipeline` is created per run configuration. A warm-up pass
/// followed by [`reset_times`](Self::reset_times) excludes one-time setup
/// cost (lazy kernel builds, cache priming) from the timed pass;
/// [`extract_times`](Self::extract_times) snapshots the accumulated
/// measurements afterwards.
///
/// # Example
/// ```ignore
/// let mut pipeline = TimedPipeline::new(stages)?;
/// for sample in source.slice(..10) {
///     pipeline.invoke(sample.clone(), &mut rng)?;
/// }
/// pipeline.reset_times();
/// for sample in source.iter() {
///     pipeline.invoke(sample.clone(), &mut rng)?;
/// }
/// let times = pipeline.extract_times();
/// ```
pub struct TimedPipeline {
    stages: Vec<Box<dyn Stage>>,
    times: Vec<Vec<Duration>>,
}

impl fmt::Debug for TimedPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedPipeline")
            .field(
                "stages",
                &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("times", &self.times)
            .finish()
    }
}

impl TimedPipeline {
    /// Creates a pipeline from an ordered stage sequence.
    ///
    /// Stage names key the measurement accumulators, so they must be
    /// unique within the pipeline.
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Result<Self> {
        ensure!(!stages.is_empty(), "A pipeline needs at least one stage");

        let mut seen = HashSet::new();
        for stage in &stages {
            ensure!(
                seen.insert(stage.name().to_string()),
                "Duplicate stage name in pipeline: {}",
                stage.name()
            );
        }

        let times = stages.iter().map(|_| Vec::new()).collect();
        Ok(Self { stages, times })
    }

    /// Runs the sample through every stage in declared order, feeding each
    /// stage's output to the next. The elapsed time of each stage call is
    /// appended to that stage's measurement sequence.
    pub fn invoke(&mut self, sample: Sample, rng: &mut StdRng) -> Result<Sample> {
        let mut sample = sample;
        for (stage, times) in self.stages.iter().zip(self.times.iter_mut()) {
            let start = Instant::now();
            sample = stage.invoke(sample, rng)?;
            times.push(start.elapsed());
        }
        Ok(sample)
    }

    /// Clears all measurement sequences, preserving stage identity and
    /// order. Called between the warm-up and the timed pass.
    pub fn reset_times(&mut self) {
        for times in &mut self.times {
            times.clear();
        }
    }

    /// Read-only snapshot of the accumulated measurements, in stage order.
    pub fn extract_times(&self) -> Vec<(String, Vec<Duration>)> {
        self.stages
            .iter()
            .zip(self.times.iter())
            .map(|(stage, times)| (stage.name().to_string(), times.clone()))
            .collect()
    }

    /// Stage names in declared order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }
}
