//! Per-stage latency benchmark for image preprocessing pipelines.
//!
//! Compares two preprocessing API families (legacy / current) across two
//! input representations (tensor-backed / decoded-image-object), timing
//! every transform stage individually and reporting per-stage medians plus
//! a pairwise relative-slowdown matrix.
//!
//! ```text
//! Stage ─► TimedPipeline ─► assemble ◄─ SampleSource
//!                         │
//!                     driver::run
//! ```

pub mod dataset;
pub mod driver;
pub mod pipeline;
pub mod report;
pub mod sample;
pub mod source;
pub mod stage;
pub mod stats;
pub mod task;
pub mod transforms;

pub use dataset::classification_dataset;
pub use driver::{run, ConfigSummary, RunPlan, TaskReport};
pub use pipeline::TimedPipeline;
pub use report::Tee;
pub use sample::{ImageData, Sample};
pub use source::{SampleSource, SamplingRng};
pub use stage::Stage;
pub use task::{ApiVariant, InputRepr, NormalizeKind, StageOptions, Task};
pub use transforms::{classification_complex, classification_simple};
