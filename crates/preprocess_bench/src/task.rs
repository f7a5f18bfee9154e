use crate::pipeline::TimedPipeline;
use crate::source::{SampleSource, SamplingRng};
use anyhow::Result;
use std::fmt;

/// The in-memory form of a sample's image data at pipeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputRepr {
    /// Channel-first `[C, H, W]` tensor.
    Tensor,
    /// Decoded image object.
    Image,
}

impl fmt::Display for InputRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputRepr::Tensor => write!(f, "tensor"),
            InputRepr::Image => write!(f, "image"),
        }
    }
}

/// Which of the two preprocessing API families builds the stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiVariant {
    /// The older, object-oriented per-sample API. Supports both input
    /// representations.
    Legacy,
    /// The vectorized replacement API. Tensor-backed input only.
    Current,
}

impl ApiVariant {
    /// Benchmark order: the current API runs first within each input
    /// representation.
    pub const ORDERED: [ApiVariant; 2] = [ApiVariant::Current, ApiVariant::Legacy];
}

impl fmt::Display for ApiVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVariant::Legacy => write!(f, "legacy"),
            ApiVariant::Current => write!(f, "current"),
        }
    }
}

/// Which normalization implementation the pipeline builder should place at
/// the end of the stage sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizeKind {
    /// Plain channel-wise `(x - mean) / std`.
    #[default]
    Standard,
    /// Same math on a channels-last (`[H, W, C]`) layout.
    ChannelsLast,
    /// Same math after forcing a contiguous channels-first layout.
    ChannelsFirst,
    /// Fused scale/bias kernel, built lazily on first invocation. The
    /// build cost lands in the warm-up pass and never in the timed pass.
    Fused,
}

/// Options forwarded to the pipeline builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageOptions {
    pub normalize: NormalizeKind,
}

/// Builds one pipeline for a configuration, or declines with `Ok(None)`
/// when the combination is not expressible in that API family.
pub type PipelineBuilder =
    fn(InputRepr, ApiVariant, StageOptions) -> Result<Option<TimedPipeline>>;

/// Materializes the sample source for a configuration. The API variant is
/// part of the contract because the two families historically shipped
/// different dataset wrappers; the generated content must nevertheless be
/// identical for a given generator state, or cross-API comparisons would
/// be meaningless.
pub type DatasetBuilder = fn(ApiVariant, &mut SamplingRng, usize) -> Result<SampleSource>;

/// One benchmarked task: a pipeline builder, a dataset builder, and the
/// stage options to build with, under a human-readable label.
#[derive(Clone)]
pub struct Task {
    pub label: String,
    pub pipeline_builder: PipelineBuilder,
    pub dataset_builder: DatasetBuilder,
    pub options: StageOptions,
}

impl Task {
    pub fn new(
        label: impl Into<String>,
        pipeline_builder: PipelineBuilder,
        dataset_builder: DatasetBuilder,
        options: StageOptions,
    ) -> Self {
        Self {
            label: label.into(),
            pipeline_builder,
            dataset_builder,
            options,
        }
    }
}

/// Whether a `(representation, API)` pair is defined at all. The current
/// API has no decoded-image entry point, so that combination is a defined
/// skip — never an error.
pub fn is_applicable(repr: InputRepr, api: ApiVariant) -> bool {
    !(repr == InputRepr::Image && api == ApiVariant::Current)
}

/// Builds one concrete `(TimedPipeline, SampleSource)` pair for a
/// configuration, or returns `Ok(None)` when the pipeline builder declines
/// the combination. The dataset is only materialized once the pipeline is
/// known to exist — materialization is the expensive half.
pub fn assemble(
    task: &Task,
    repr: InputRepr,
    api: ApiVariant,
    rng: &mut SamplingRng,
    sample_count: usize,
) -> Result<Option<(TimedPipeline, SampleSource)>> {
    let Some(pipeline) = (task.pipeline_builder)(repr, api, task.options)? else {
        return Ok(None);
    };
    let source = (task.dataset_builder)(api, rng, sample_count)?;
    Ok(Some((pipeline, source)))
}
