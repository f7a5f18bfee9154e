//! The run driver: walks the cross product of (task, input representation,
//! API variant), executes warm-up and timed passes, and aggregates the
//! comparative statistics.

use crate::report::{render_banner, render_stage_table, render_summary_table};
use crate::source::SamplingRng;
use crate::stats::{per_stage_medians, slowdown_matrix, total_median_us, StageStats};
use crate::task::{assemble, is_applicable, ApiVariant, InputRepr, Task};
use anyhow::{ensure, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;

/// Everything one benchmark run needs, fixed up front.
///
/// # Example
/// ```ignore
/// let plan = RunPlan::builder()
///     .task(task)
///     .num_samples(1_000)
///     .build();
/// let reports = driver::run(&plan, &mut tee)?;
/// ```
#[derive(Clone)]
pub struct RunPlan {
    /// Benchmarked tasks, reported in order.
    pub tasks: Vec<Task>,
    /// Input representations to cross with the API variants.
    pub input_reprs: Vec<InputRepr>,
    /// Samples per configuration, materialized eagerly.
    pub num_samples: usize,
    /// Seed for the dataset sampling generator. Snapshotted per task and
    /// restored before every configuration.
    pub dataset_seed: u64,
    /// Seed for stage-level randomness, reapplied before every timed pass.
    pub stage_seed: u64,
    /// Untimed warm-up prefix, excluded from all statistics.
    pub warmup_samples: usize,
}

impl Default for RunPlan {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            input_reprs: vec![InputRepr::Tensor, InputRepr::Image],
            num_samples: 1_000,
            dataset_seed: 0,
            stage_seed: 0,
            warmup_samples: 10,
        }
    }
}

impl RunPlan {
    pub fn builder() -> RunPlanBuilder {
        RunPlanBuilder::default()
    }
}

/// Builder for [`RunPlan`] with method chaining.
#[derive(Default)]
pub struct RunPlanBuilder {
    plan: RunPlan,
}

impl RunPlanBuilder {
    pub fn task(mut self, task: Task) -> Self {
        self.plan.tasks.push(task);
        self
    }

    pub fn input_reprs(mut self, reprs: Vec<InputRepr>) -> Self {
        self.plan.input_reprs = reprs;
        self
    }

    pub fn num_samples(mut self, num_samples: usize) -> Self {
        self.plan.num_samples = num_samples;
        self
    }

    pub fn dataset_seed(mut self, seed: u64) -> Self {
        self.plan.dataset_seed = seed;
        self
    }

    pub fn stage_seed(mut self, seed: u64) -> Self {
        self.plan.stage_seed = seed;
        self
    }

    pub fn warmup_samples(mut self, warmup_samples: usize) -> Self {
        self.plan.warmup_samples = warmup_samples;
        self
    }

    pub fn build(self) -> RunPlan {
        self.plan
    }
}

/// Aggregated result of one timed configuration.
#[derive(Debug, Clone)]
pub struct ConfigSummary {
    pub repr: InputRepr,
    pub api: ApiVariant,
    pub stage_medians: Vec<StageStats>,
    pub total_median_us: f64,
}

impl ConfigSummary {
    pub fn label(&self) -> String {
        format!("{}, {}", self.repr, self.api)
    }
}

/// One task's recorded configurations plus the pairwise slowdown matrix
/// over their totals (`slowdown[row][col] = total(row) / total(col)`).
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub label: String,
    pub configs: Vec<ConfigSummary>,
    pub slowdown: Vec<Vec<f64>>,
}

impl TaskReport {
    /// Total for a configuration, if it was recorded.
    pub fn total_for(&self, repr: InputRepr, api: ApiVariant) -> Option<f64> {
        self.configs
            .iter()
            .find(|c| c.repr == repr && c.api == api)
            .map(|c| c.total_median_us)
    }
}

/// Executes the full plan, writing human-readable tables to `out` and
/// returning the structured reports.
///
/// Measurement discipline:
/// - the tensor backend is pinned to a single thread before anything runs;
/// - the sampling generator is restored to the plan's initial snapshot
///   before every configuration, so every configuration of a task sees the
///   identical sample draw;
/// - the first `warmup_samples` samples run before `reset_times`, keeping
///   one-time setup cost (lazy kernel builds, cache priming) out of the
///   reported numbers;
/// - the stage generator is reseeded to the fixed stage seed right before
///   each timed pass, so stochastic stages replay across configurations.
///
/// Any stage or dataset failure aborts the whole run: partial results
/// would report skewed timings, which is worse than no results.
pub fn run(plan: &RunPlan, out: &mut dyn Write) -> Result<Vec<TaskReport>> {
    ensure!(!plan.tasks.is_empty(), "Run plan has no tasks");
    ensure!(plan.num_samples > 0, "Run plan needs at least one sample");

    // Worker processes of a data loader each execute single-threaded;
    // measured latencies should match that execution context.
    tch::set_num_threads(1);

    let mut rng = SamplingRng::seed_from(plan.dataset_seed);
    let initial_state = rng.snapshot();

    let mut reports = Vec::with_capacity(plan.tasks.len());
    for task in &plan.tasks {
        write!(out, "{}", render_banner(&task.label))?;

        let mut configs = Vec::new();
        for &repr in &plan.input_reprs {
            for api in ApiVariant::ORDERED {
                if !is_applicable(repr, api) {
                    continue;
                }

                rng.restore(&initial_state);
                let Some((mut pipeline, source)) =
                    assemble(task, repr, api, &mut rng, plan.num_samples)?
                else {
                    continue;
                };

                writeln!(out, "input = {}, api = {}", repr, api)?;
                writeln!(out)?;

                let mut warmup_rng = StdRng::seed_from_u64(plan.stage_seed);
                for sample in source.slice(..plan.warmup_samples.min(source.len())) {
                    pipeline.invoke(sample.clone(), &mut warmup_rng)?;
                }
                pipeline.reset_times();

                let mut stage_rng = StdRng::seed_from_u64(plan.stage_seed);
                for sample in source.iter() {
                    pipeline.invoke(sample.clone(), &mut stage_rng)?;
                }

                let extracted = pipeline.extract_times();
                let stage_medians = per_stage_medians(&extracted);
                let total = total_median_us(&extracted)?;

                write!(out, "{}", render_stage_table(&stage_medians, total))?;
                writeln!(out)?;
                writeln!(
                    out,
                    "Results computed for {} samples and reported in µs",
                    source.len()
                )?;
                writeln!(out, "{}", "-".repeat(60))?;

                configs.push(ConfigSummary {
                    repr,
                    api,
                    stage_medians,
                    total_median_us: total,
                });
            }
        }

        let totals: Vec<f64> = configs.iter().map(|c| c.total_median_us).collect();
        let labels: Vec<String> = configs.iter().map(|c| c.label()).collect();
        let slowdown = slowdown_matrix(&totals);

        writeln!(out, "Summary")?;
        writeln!(out)?;
        write!(out, "{}", render_summary_table(&labels, &slowdown))?;
        writeln!(out)?;
        writeln!(out, "Slowdown computed as row / column")?;
        out.flush()?;

        reports.push(TaskReport {
            label: task.label.clone(),
            configs,
            slowdown,
        });
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::config_id;

    #[test]
    fn test_empty_plan_rejected() {
        let plan = RunPlan::builder().build();
        let mut sink = std::io::sink();
        assert!(run(&plan, &mut sink).is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let plan = RunPlan::builder().num_samples(50).build();
        assert_eq!(plan.num_samples, 50);
        assert_eq!(plan.warmup_samples, 10);
        assert_eq!(
            plan.input_reprs,
            vec![InputRepr::Tensor, InputRepr::Image]
        );
    }

    #[test]
    fn test_config_label_and_id() {
        let summary = ConfigSummary {
            repr: InputRepr::Tensor,
            api: ApiVariant::Current,
            stage_medians: Vec::new(),
            total_median_us: 0.0,
        };
        assert_eq!(summary.label(), "tensor, current");
        assert_eq!(config_id(0), "[a]");
        assert_eq!(config_id(2), "[c]");
    }
}
