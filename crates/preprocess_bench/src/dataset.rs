//! Synthetic classification dataset.
//!
//! The benchmark measures transform cost, not storage: samples are
//! generated in memory from the seeded sampling generator instead of being
//! decoded from disk, which keeps runs self-contained and exactly
//! replayable. Image dimensions vary per sample (as a real photo corpus
//! would) so geometric stages see realistic size diversity.

use crate::sample::Sample;
use crate::source::{SampleSource, SamplingRng};
use crate::task::ApiVariant;
use anyhow::{anyhow, Result};
use image::{DynamicImage, RgbImage};
use rand::{Rng, RngCore};

const MIN_SIDE: u32 = 160;
const MAX_SIDE: u32 = 480;
const NUM_CLASSES: i64 = 1000;

/// Builds the classification sample source: `num_samples` randomly sized
/// RGB images with integer labels, materialized eagerly.
///
/// Satisfies the dataset-builder contract. The API variant is accepted
/// for contract parity but does not influence content: both variants must
/// see byte-identical samples for a given generator state, or the
/// cross-variant comparison would measure the dataset instead of the
/// pipeline.
pub fn classification_dataset(
    _api: ApiVariant,
    rng: &mut SamplingRng,
    num_samples: usize,
) -> Result<SampleSource> {
    let generator = std::iter::from_fn(|| Some(synthetic_sample(rng)));
    SampleSource::materialize(generator, num_samples)
}

fn synthetic_sample(rng: &mut SamplingRng) -> Result<Sample> {
    let width = rng.random_range(MIN_SIDE..=MAX_SIDE);
    let height = rng.random_range(MIN_SIDE..=MAX_SIDE);

    let mut pixels = vec![0u8; (width * height * 3) as usize];
    rng.fill_bytes(&mut pixels);
    let image = RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("Pixel buffer does not match {}x{}", width, height))?;

    let label = rng.random_range(0..NUM_CLASSES);
    Ok(Sample::decoded(DynamicImage::ImageRgb8(image), Some(label)))
}
