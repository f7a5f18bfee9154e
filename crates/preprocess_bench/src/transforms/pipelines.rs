//! Classification pipeline builders over the two stage families.
//!
//! Stage order tracks the entry representation: tensor-backed pipelines
//! convert up front and run every transform on tensors; decoded-image
//! pipelines (legacy API only) run the geometric and photometric stages
//! on the image object and convert just before normalization.

use crate::pipeline::TimedPipeline;
use crate::stage::Stage;
use crate::task::{is_applicable, ApiVariant, InputRepr, StageOptions};
use crate::transforms::{current, legacy, Normalize};
use anyhow::Result;

const CROP_SIZE: i64 = 224;
const FLIP_P: f64 = 0.5;
const JITTER_STRENGTH: f64 = 0.4;
const ERASE_P: f64 = 0.5;

/// Baseline training pipeline: convert, crop, flip, normalize.
pub fn classification_simple(
    repr: InputRepr,
    api: ApiVariant,
    options: StageOptions,
) -> Result<Option<TimedPipeline>> {
    build_classification(repr, api, options, false)
}

/// The baseline plus color jitter and random erasing.
pub fn classification_complex(
    repr: InputRepr,
    api: ApiVariant,
    options: StageOptions,
) -> Result<Option<TimedPipeline>> {
    build_classification(repr, api, options, true)
}

fn build_classification(
    repr: InputRepr,
    api: ApiVariant,
    options: StageOptions,
    complex: bool,
) -> Result<Option<TimedPipeline>> {
    if !is_applicable(repr, api) {
        return Ok(None);
    }

    let stages: Vec<Box<dyn Stage>> = match (repr, api) {
        (InputRepr::Tensor, ApiVariant::Current) => {
            let mut stages: Vec<Box<dyn Stage>> = vec![
                Box::new(current::ToImageTensor),
                Box::new(current::ConvertDtype),
                Box::new(current::RandomResizedCrop::new(CROP_SIZE)?),
                Box::new(current::RandomHorizontalFlip::new(FLIP_P)?),
            ];
            if complex {
                stages.push(Box::new(current::ColorJitter::new(
                    JITTER_STRENGTH,
                    JITTER_STRENGTH,
                    JITTER_STRENGTH,
                )?));
                stages.push(Box::new(current::RandomErasing::new(ERASE_P)?));
            }
            stages.push(Box::new(Normalize::imagenet(options.normalize)));
            stages
        }
        (InputRepr::Tensor, ApiVariant::Legacy) => {
            let mut stages: Vec<Box<dyn Stage>> = vec![
                Box::new(legacy::ToImageTensor),
                Box::new(legacy::ConvertDtype),
                Box::new(legacy::RandomResizedCrop::new(CROP_SIZE)?),
                Box::new(legacy::RandomHorizontalFlip::new(FLIP_P)?),
            ];
            if complex {
                stages.push(Box::new(legacy::ColorJitter::new(
                    JITTER_STRENGTH,
                    JITTER_STRENGTH,
                    JITTER_STRENGTH,
                )?));
                stages.push(Box::new(legacy::RandomErasing::new(ERASE_P)?));
            }
            stages.push(Box::new(Normalize::imagenet(options.normalize)));
            stages
        }
        (InputRepr::Image, ApiVariant::Legacy) => {
            let mut stages: Vec<Box<dyn Stage>> = vec![
                Box::new(legacy::RandomResizedCrop::new(CROP_SIZE)?),
                Box::new(legacy::RandomHorizontalFlip::new(FLIP_P)?),
            ];
            if complex {
                stages.push(Box::new(legacy::ColorJitter::new(
                    JITTER_STRENGTH,
                    JITTER_STRENGTH,
                    JITTER_STRENGTH,
                )?));
                stages.push(Box::new(legacy::RandomErasing::new(ERASE_P)?));
            }
            stages.push(Box::new(legacy::ToImageTensor));
            stages.push(Box::new(legacy::ConvertDtype));
            stages.push(Box::new(Normalize::imagenet(options.normalize)));
            stages
        }
        (InputRepr::Image, ApiVariant::Current) => return Ok(None),
    };

    Ok(Some(TimedPipeline::new(stages)?))
}
