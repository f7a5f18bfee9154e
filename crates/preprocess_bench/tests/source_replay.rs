//! Determinism of sample-source materialization: rewinding the seeded
//! generator must replay the identical sample draw, whatever
//! representation the samples are later converted into.

use anyhow::Result;
use preprocess_bench::transforms::{current, legacy};
use preprocess_bench::{classification_dataset, ApiVariant, SamplingRng, Stage};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_rewound_generator_replays_the_source() -> Result<()> {
    let mut rng = SamplingRng::seed_from(0);
    let initial = rng.snapshot();

    let first = classification_dataset(ApiVariant::Current, &mut rng, 8)?;
    rng.restore(&initial);
    let second = classification_dataset(ApiVariant::Current, &mut rng, 8)?;

    assert!(first.content_eq(&second));
    Ok(())
}

#[test]
fn test_replay_holds_after_conversion_to_either_representation() -> Result<()> {
    let mut rng = SamplingRng::seed_from(3);
    let initial = rng.snapshot();

    let first = classification_dataset(ApiVariant::Legacy, &mut rng, 4)?;
    rng.restore(&initial);
    let second = classification_dataset(ApiVariant::Legacy, &mut rng, 4)?;

    let mut stage_rng = StdRng::seed_from_u64(0);
    for (a, b) in first.iter().zip(second.iter()) {
        // Decoded representation
        assert!(a.content_eq(b));

        // Tensor representation, via both conversion families
        let ta = legacy::ToImageTensor.invoke(a.clone(), &mut stage_rng)?;
        let tb = legacy::ToImageTensor.invoke(b.clone(), &mut stage_rng)?;
        assert!(ta.content_eq(&tb));

        let ca = current::ToImageTensor.invoke(a.clone(), &mut stage_rng)?;
        let cb = current::ToImageTensor.invoke(b.clone(), &mut stage_rng)?;
        assert!(ca.content_eq(&cb));
    }
    Ok(())
}

#[test]
fn test_different_seeds_draw_different_sources() -> Result<()> {
    let mut rng_a = SamplingRng::seed_from(1);
    let mut rng_b = SamplingRng::seed_from(2);

    let a = classification_dataset(ApiVariant::Current, &mut rng_a, 4)?;
    let b = classification_dataset(ApiVariant::Current, &mut rng_b, 4)?;

    assert!(!a.content_eq(&b));
    Ok(())
}

#[test]
fn test_continuing_without_rewind_diverges() -> Result<()> {
    // Without an explicit restore the generator keeps advancing, so a
    // second materialization sees a different draw. This is exactly the
    // failure mode the snapshot discipline exists to prevent.
    let mut rng = SamplingRng::seed_from(5);

    let first = classification_dataset(ApiVariant::Current, &mut rng, 4)?;
    let second = classification_dataset(ApiVariant::Current, &mut rng, 4)?;

    assert!(!first.content_eq(&second));
    Ok(())
}
