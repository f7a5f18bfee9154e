//! The current stage family: vectorized tensor math, tensor-backed input
//! only. Mirrors the legacy stage set name-for-name so per-stage rows line
//! up across configurations.

use crate::sample::Sample;
use crate::stage::Stage;
use crate::transforms::{sample_crop_region, sample_erase_region};
use anyhow::{ensure, Result};
use image::DynamicImage;
use rand::rngs::StdRng;
use rand::Rng;
use tch::{Kind, Tensor};

// ============================================================================
// ToImageTensor
// ============================================================================

/// Converts a decoded image into a channel-first `[3, H, W]` u8 tensor,
/// leaving the result as a permuted view for downstream ops to consume.
#[derive(Debug, Clone)]
pub struct ToImageTensor;

impl Stage for ToImageTensor {
    fn name(&self) -> &str {
        "to_image_tensor"
    }

    fn invoke(&self, sample: Sample, _rng: &mut StdRng) -> Result<Sample> {
        let Sample { image, label } = sample;
        let img = image.into_decoded()?;
        let rgb = match img {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.to_rgb8(),
        };
        let (width, height) = rgb.dimensions();
        ensure!(
            width > 0 && height > 0,
            "Image dimensions must be positive (got {}x{})",
            width,
            height
        );

        let tensor = Tensor::from_slice(rgb.as_raw())
            .reshape(&[height as i64, width as i64, 3])
            .permute(&[2, 0, 1]);
        Ok(Sample::tensor(tensor, label))
    }
}

// ============================================================================
// ConvertDtype
// ============================================================================

/// Converts a u8 tensor to f32 in [0, 1] with a single scale.
#[derive(Debug, Clone)]
pub struct ConvertDtype;

impl Stage for ConvertDtype {
    fn name(&self) -> &str {
        "convert_dtype"
    }

    fn invoke(&self, sample: Sample, _rng: &mut StdRng) -> Result<Sample> {
        let Sample { image, label } = sample;
        let tensor = image.into_tensor()?;
        let converted = tensor.to_kind(Kind::Float).f_mul_scalar(1.0 / 255.0)?;
        Ok(Sample::tensor(converted, label))
    }
}

// ============================================================================
// RandomResizedCrop
// ============================================================================

/// Random area/aspect crop resized to a square output. The crop is taken
/// as a view and resampled directly, with no intermediate copy.
#[derive(Debug, Clone)]
pub struct RandomResizedCrop {
    size: i64,
    scale: (f64, f64),
    ratio: (f64, f64),
}

impl RandomResizedCrop {
    pub fn new(size: i64) -> Result<Self> {
        ensure!(size > 0, "Crop output size must be positive (got {})", size);
        Ok(Self {
            size,
            scale: (0.08, 1.0),
            ratio: (3.0 / 4.0, 4.0 / 3.0),
        })
    }
}

impl Stage for RandomResizedCrop {
    fn name(&self) -> &str {
        "random_resized_crop"
    }

    fn invoke(&self, sample: Sample, rng: &mut StdRng) -> Result<Sample> {
        let Sample { image, label } = sample;
        let tensor = image.into_tensor()?;
        let (_c, height, width) = tensor.size3()?;
        let (left, top, w, h) = sample_crop_region(rng, width, height, self.scale, self.ratio);

        let resized = tensor
            .narrow(1, top, h)
            .narrow(2, left, w)
            .unsqueeze(0)
            .f_upsample_bilinear2d(&[self.size, self.size], false, None, None)?
            .squeeze_dim(0);
        Ok(Sample::tensor(resized, label))
    }
}

// ============================================================================
// RandomHorizontalFlip
// ============================================================================

/// Flips the width axis with probability `p`, in one kernel.
#[derive(Debug, Clone)]
pub struct RandomHorizontalFlip {
    p: f64,
}

impl RandomHorizontalFlip {
    pub fn new(p: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&p),
            "Probability must be in [0.0, 1.0] range (got {})",
            p
        );
        Ok(Self { p })
    }
}

impl Stage for RandomHorizontalFlip {
    fn name(&self) -> &str {
        "horizontal_flip"
    }

    fn invoke(&self, sample: Sample, rng: &mut StdRng) -> Result<Sample> {
        let Sample { image, label } = sample;
        let tensor = image.into_tensor()?;
        let out = if rng.random_bool(self.p) {
            tensor.flip(&[2])
        } else {
            tensor
        };
        Ok(Sample::tensor(out, label))
    }
}

// ============================================================================
// ColorJitter
// ============================================================================

/// Brightness, contrast, and saturation jitter as one fused expression
/// chain over the whole tensor.
#[derive(Debug, Clone)]
pub struct ColorJitter {
    brightness: f64,
    contrast: f64,
    saturation: f64,
}

impl ColorJitter {
    pub fn new(brightness: f64, contrast: f64, saturation: f64) -> Result<Self> {
        for (name, value) in [
            ("brightness", brightness),
            ("contrast", contrast),
            ("saturation", saturation),
        ] {
            ensure!(
                (0.0..1.0).contains(&value),
                "ColorJitter {} strength must be in [0.0, 1.0) (got {})",
                name,
                value
            );
        }
        Ok(Self {
            brightness,
            contrast,
            saturation,
        })
    }

    fn draw_factor(rng: &mut StdRng, strength: f64) -> f64 {
        rng.random_range(1.0 - strength..=1.0 + strength)
    }
}

impl Stage for ColorJitter {
    fn name(&self) -> &str {
        "color_jitter"
    }

    fn invoke(&self, sample: Sample, rng: &mut StdRng) -> Result<Sample> {
        let Sample { image, label } = sample;
        let tensor = image.into_tensor()?;
        let b = Self::draw_factor(rng, self.brightness);
        let c = Self::draw_factor(rng, self.contrast);
        let s = Self::draw_factor(rng, self.saturation);

        let bright = tensor * b;
        let mean = bright.mean(Kind::Float);
        let contrasted = (&bright - &mean) * c + &mean;
        let gray = (contrasted.select(0, 0) * 0.299
            + contrasted.select(0, 1) * 0.587
            + contrasted.select(0, 2) * 0.114)
            .unsqueeze(0);
        let saturated = &contrasted * s + &gray * (1.0 - s);

        Ok(Sample::tensor(saturated.clamp(0.0, 1.0), label))
    }
}

// ============================================================================
// RandomErasing
// ============================================================================

/// With probability `p`, zeroes a random rectangle in place on a fresh
/// copy of the tensor.
#[derive(Debug, Clone)]
pub struct RandomErasing {
    p: f64,
    scale: (f64, f64),
    ratio: (f64, f64),
}

impl RandomErasing {
    pub fn new(p: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&p),
            "Probability must be in [0.0, 1.0] range (got {})",
            p
        );
        Ok(Self {
            p,
            scale: (0.02, 0.33),
            ratio: (0.3, 3.3),
        })
    }
}

impl Stage for RandomErasing {
    fn name(&self) -> &str {
        "random_erasing"
    }

    fn invoke(&self, sample: Sample, rng: &mut StdRng) -> Result<Sample> {
        let Sample { image, label } = sample;
        let tensor = image.into_tensor()?;
        if !rng.random_bool(self.p) {
            return Ok(Sample::tensor(tensor, label));
        }

        let (_c, height, width) = tensor.size3()?;
        let Some((left, top, w, h)) = sample_erase_region(rng, width, height, self.scale, self.ratio)
        else {
            return Ok(Sample::tensor(tensor, label));
        };

        let out = tensor.copy();
        let mut region = out.narrow(1, top, h).narrow(2, left, w);
        let _ = region.fill_(0.0);
        Ok(Sample::tensor(out, label))
    }
}
