use anyhow::Result;
use preprocess_bench::{
    classification_complex, classification_dataset, classification_simple, driver, NormalizeKind,
    RunPlan, StageOptions, Task, Tee,
};

/// Samples per configuration.
const NUM_SAMPLES: usize = 1_000;
/// Seed for the dataset sampling generator.
const DATASET_SEED: u64 = 0;
/// Seed for stage-level randomness during the timed pass.
const STAGE_SEED: u64 = 0;
/// Directory receiving the timestamped run logs.
const RESULTS_DIR: &str = "results";

fn normalize_options(kind: NormalizeKind) -> StageOptions {
    StageOptions { normalize: kind }
}

fn main() -> Result<()> {
    let mut tee = Tee::create(RESULTS_DIR)?;

    let plan = RunPlan::builder()
        .task(Task::new(
            "Classif simple",
            classification_simple,
            classification_dataset,
            StageOptions::default(),
        ))
        .task(Task::new(
            "Classif simple, CL-Normalize",
            classification_simple,
            classification_dataset,
            normalize_options(NormalizeKind::ChannelsLast),
        ))
        .task(Task::new(
            "Classif simple, CF-Normalize",
            classification_simple,
            classification_dataset,
            normalize_options(NormalizeKind::ChannelsFirst),
        ))
        .task(Task::new(
            "Classif simple, fused-Normalize",
            classification_simple,
            classification_dataset,
            normalize_options(NormalizeKind::Fused),
        ))
        .task(Task::new(
            "Classif complex",
            classification_complex,
            classification_dataset,
            StageOptions::default(),
        ))
        .task(Task::new(
            "Classif complex, CL-Normalize",
            classification_complex,
            classification_dataset,
            normalize_options(NormalizeKind::ChannelsLast),
        ))
        .task(Task::new(
            "Classif complex, CF-Normalize",
            classification_complex,
            classification_dataset,
            normalize_options(NormalizeKind::ChannelsFirst),
        ))
        .task(Task::new(
            "Classif complex, fused-Normalize",
            classification_complex,
            classification_dataset,
            normalize_options(NormalizeKind::Fused),
        ))
        .num_samples(NUM_SAMPLES)
        .dataset_seed(DATASET_SEED)
        .stage_seed(STAGE_SEED)
        .build();

    driver::run(&plan, &mut tee)?;
    Ok(())
}
