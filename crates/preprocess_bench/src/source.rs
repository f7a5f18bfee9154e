use crate::sample::Sample;
use anyhow::{ensure, Result};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::ops::RangeBounds;

/// Seeded generator for dataset sampling, with explicit state snapshots.
///
/// All randomized sampling during source materialization draws from one of
/// these handles. The driver snapshots the generator once per task and
/// restores it before every configuration, so every configuration of a task
/// sees the identical draw of samples in the identical order — the
/// precondition for comparing timings across input representations and API
/// variants at all.
///
/// # Example
/// ```ignore
/// let mut rng = SamplingRng::seed_from(0);
/// let initial = rng.snapshot();
/// let first = build_source(&mut rng)?;
/// rng.restore(&initial);
/// let second = build_source(&mut rng)?; // identical draw
/// ```
#[derive(Debug, Clone)]
pub struct SamplingRng(StdRng);

impl SamplingRng {
    pub fn seed_from(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Captures the current generator state.
    pub fn snapshot(&self) -> SamplingRng {
        self.clone()
    }

    /// Rewinds the generator to a previously captured state.
    pub fn restore(&mut self, snapshot: &SamplingRng) {
        *self = snapshot.clone();
    }
}

impl RngCore for SamplingRng {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }
}

/// A finite, indexable, immutable-after-construction collection of samples.
///
/// Materialization is deliberately eager: every sample is produced before
/// the timed region begins, trading memory for the elimination of
/// per-iteration generation jitter from the measurements. Reintroducing a
/// lazy path would put that jitter back into the timings, so none exists.
#[derive(Debug, Clone)]
pub struct SampleSource {
    samples: Vec<Sample>,
}

impl SampleSource {
    /// Consumes exactly `sample_count` items from a lazy, possibly
    /// infinite generator. Fails if the generator runs dry first.
    pub fn materialize<I>(generator: I, sample_count: usize) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Sample>>,
    {
        let mut samples = Vec::with_capacity(sample_count);
        for item in generator.into_iter().take(sample_count) {
            samples.push(item?);
        }
        ensure!(
            samples.len() == sample_count,
            "Sample generator ran dry after {} of {} samples",
            samples.len(),
            sample_count
        );
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Random-access lookup by index.
    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    /// Contiguous sub-range view, used for the warm-up prefix.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> &[Sample] {
        &self.samples[(range.start_bound().cloned(), range.end_bound().cloned())]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Content equality against another source, element by element.
    pub fn content_eq(&self, other: &SampleSource) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| a.content_eq(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use tch::Tensor;

    fn sample_with(value: i64) -> Sample {
        Sample::tensor(Tensor::from_slice(&[value]), Some(value))
    }

    #[test]
    fn test_materialize_consumes_exactly_count() -> Result<()> {
        // Infinite generator: only `sample_count` items may be drawn.
        let generator = (0..).map(|i| Ok(sample_with(i)));
        let source = SampleSource::materialize(generator, 5)?;
        assert_eq!(source.len(), 5);
        assert_eq!(source.get(4).unwrap().label, Some(4));
        assert!(source.get(5).is_none());
        Ok(())
    }

    #[test]
    fn test_materialize_fails_on_short_generator() {
        let generator = (0..3).map(|i| Ok(sample_with(i)));
        let err = SampleSource::materialize(generator, 5).unwrap_err();
        assert!(err.to_string().contains("ran dry after 3 of 5"));
    }

    #[test]
    fn test_materialize_propagates_generator_errors() {
        let generator = (0..5).map(|i| {
            if i == 2 {
                Err(anyhow::anyhow!("corrupt record"))
            } else {
                Ok(sample_with(i))
            }
        });
        assert!(SampleSource::materialize(generator, 5).is_err());
    }

    #[test]
    fn test_slicing() -> Result<()> {
        let source = SampleSource::materialize((0..).map(|i| Ok(sample_with(i))), 10)?;
        let prefix = source.slice(..3);
        assert_eq!(prefix.len(), 3);
        assert_eq!(prefix[2].label, Some(2));
        assert_eq!(source.slice(4..7).len(), 3);
        Ok(())
    }

    #[test]
    fn test_snapshot_restore_replays_draws() {
        let mut rng = SamplingRng::seed_from(42);
        let initial = rng.snapshot();

        let first: Vec<u64> = (0..8).map(|_| rng.random_range(0..1000)).collect();
        rng.restore(&initial);
        let second: Vec<u64> = (0..8).map(|_| rng.random_range(0..1000)).collect();

        assert_eq!(first, second);
    }
}
