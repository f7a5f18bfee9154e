use crate::sample::Sample;
use anyhow::Result;
use rand::rngs::StdRng;

/// A single named unit of work in a preprocessing pipeline.
///
/// A stage consumes a sample and produces a transformed sample. Stages may
/// draw from the provided random generator (stochastic augmentation) but
/// must carry no state across samples — the same stage instance fed the
/// same sample and the same generator state must produce the same output.
///
/// Heterogeneous implementations (vectorized tensor math, object-oriented
/// image operations, lazily built fused kernels) all share this one
/// contract, so the timing harness can treat them uniformly.
///
/// Errors propagate to the caller uncaught: a failing stage aborts the
/// configuration's run. The harness performs no per-sample recovery.
pub trait Stage: Send {
    /// Stable human-readable name, unique within one pipeline.
    fn name(&self) -> &str;

    /// Applies the transform. `rng` is the run's stage-level generator,
    /// reseeded by the driver before every timed pass.
    fn invoke(&self, sample: Sample, rng: &mut StdRng) -> Result<Sample>;
}
