//! The legacy stage family: object-oriented, one sample at a time.
//!
//! Decoded images are processed with per-pixel buffer operations; tensors
//! take the straightforward op-by-op path with explicit intermediate
//! copies. This family exists to be measured against [`current`], not to
//! be fast.
//!
//! [`current`]: crate::transforms::current

use crate::sample::{ImageData, Sample};
use crate::stage::Stage;
use crate::transforms::{sample_crop_region, sample_erase_region};
use anyhow::{ensure, Result};
use image::{imageops::FilterType, DynamicImage, ImageBuffer, RgbImage};
use rand::rngs::StdRng;
use rand::Rng;
use tch::{Device, Kind, Tensor};

// ============================================================================
// ToImageTensor
// ============================================================================

/// Converts a decoded image into a channel-first `[3, H, W]` u8 tensor.
///
/// Non-RGB inputs are converted to RGB first. The output is made
/// contiguous eagerly, the hallmark of this family.
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
            .permute(&[2, 0, 1])
            .contiguous();
        Ok(Sample::tensor(tensor, label))
    }
}

// ============================================================================
// ConvertDtype
// ============================================================================

/// Converts a u8 tensor to f32 in the [0, 1] range: cast, then divide.
#[derive(Debug, Clone)]
pub struct ConvertDtype;

impl Stage for ConvertDtype {
    fn name(&self) -> &str {
        "convert_dtype"
    }

    fn invoke(&self, sample: Sample, _rng: &mut StdRng) -> Result<Sample> {
        let Sample { image, label } = sample;
        let tensor = image.into_tensor()?;
        let converted = tensor.to_kind(Kind::Float).f_div_scalar(255.0)?;
        Ok(Sample::tensor(converted, label))
    }
}

// ============================================================================
// RandomResizedCrop
// ============================================================================

/// Crops a random region (area and aspect ratio drawn from the configured
/// ranges) and resizes it to a square output.
///
/// # Example
/// ```ignore
/// let crop = RandomResizedCrop::new(224)?;
/// let cropped = crop.invoke(sample, &mut rng)?;
/// ```
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
        match image {
            ImageData::Decoded(img) => {
                let (width, height) = (img.width() as i64, img.height() as i64);
                let (left, top, w, h) =
                    sample_crop_region(rng, width, height, self.scale, self.ratio);
                let out = img
                    .crop_imm(left as u32, top as u32, w as u32, h as u32)
                    .resize_exact(self.size as u32, self.size as u32, FilterType::Triangle);
                Ok(Sample::decoded(out, label))
            }
            ImageData::Tensor(tensor) => {
                let (_c, height, width) = tensor.size3()?;
                let (left, top, w, h) =
                    sample_crop_region(rng, width, height, self.scale, self.ratio);
                // Copy the crop out before resampling
                let cropped = tensor.narrow(1, top, h).narrow(2, left, w).contiguous();
                let resized = cropped
                    .unsqueeze(0)
                    .f_upsample_bilinear2d(&[self.size, self.size], false, None, None)?
                    .squeeze_dim(0);
                Ok(Sample::tensor(resized, label))
            }
        }
    }
}

// ============================================================================
// RandomHorizontalFlip
// ============================================================================

/// Flips the image horizontally with probability `p`.
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

    /// Flips an RGB8 image by copying each row right-to-left.
    fn flip_rgb8(img: RgbImage) -> RgbImage {
        let (width, height) = img.dimensions();
        let width = width as usize;
        let source = img.into_raw();

        let mut flipped = Vec::with_capacity(source.len());
        for y in 0..height as usize {
            for x in 0..width {
                let src = (y * width + (width - 1 - x)) * 3;
                flipped.extend_from_slice(&source[src..src + 3]);
            }
        }

        ImageBuffer::from_raw(width as u32, height, flipped)
            .expect("flipped buffer has the source dimensions")
    }
}

impl Stage for RandomHorizontalFlip {
    fn name(&self) -> &str {
        "horizontal_flip"
    }

    fn invoke(&self, sample: Sample, rng: &mut StdRng) -> Result<Sample> {
        let Sample { image, label } = sample;
        if !rng.random_bool(self.p) {
            return Ok(Sample::new(image, label));
        }

        match image {
            ImageData::Decoded(img) => {
                let flipped = match img {
                    DynamicImage::ImageRgb8(rgb) => DynamicImage::ImageRgb8(Self::flip_rgb8(rgb)),
                    other => other.fliph(),
                };
                Ok(Sample::decoded(flipped, label))
            }
            ImageData::Tensor(tensor) => {
                let (_c, _h, width) = tensor.size3()?;
                // Reverse the width axis by explicit index selection
                let reversed = Tensor::arange_start_step(width - 1, -1, -1, (Kind::Int64, Device::Cpu));
                Ok(Sample::tensor(tensor.index_select(2, &reversed), label))
            }
        }
    }
}

// ============================================================================
// ColorJitter
// ============================================================================

/// Jitters brightness, contrast, and saturation by factors drawn uniformly
/// from `1 ± strength`, applied in that fixed order.
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

    /// Blends every pixel toward its gray value, per pixel.
    fn saturate_rgb8(img: RgbImage, factor: f64) -> RgbImage {
        let (width, height) = img.dimensions();
        let mut pixels = img.into_raw();
        for px in pixels.chunks_exact_mut(3) {
            let gray = 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64;
            for channel in px.iter_mut() {
                let blended = *channel as f64 * factor + gray * (1.0 - factor);
                *channel = blended.clamp(0.0, 255.0) as u8;
            }
        }
        ImageBuffer::from_raw(width, height, pixels).expect("buffer dimensions unchanged")
    }
}

impl Stage for ColorJitter {
    fn name(&self) -> &str {
        "color_jitter"
    }

    fn invoke(&self, sample: Sample, rng: &mut StdRng) -> Result<Sample> {
        let Sample { image, label } = sample;
        let b = Self::draw_factor(rng, self.brightness);
        let c = Self::draw_factor(rng, self.contrast);
        let s = Self::draw_factor(rng, self.saturation);

        match image {
            ImageData::Decoded(img) => {
                let jittered = img
                    .brighten(((b - 1.0) * 64.0) as i32)
                    .adjust_contrast(((c - 1.0) * 100.0) as f32);
                let rgb = match jittered {
                    DynamicImage::ImageRgb8(rgb) => rgb,
                    other => other.to_rgb8(),
                };
                Ok(Sample::decoded(
                    DynamicImage::ImageRgb8(Self::saturate_rgb8(rgb, s)),
                    label,
                ))
            }
            ImageData::Tensor(tensor) => {
                // Op-by-op with a materialized copy between adjustments
                let bright = tensor.f_mul_scalar(b)?.contiguous();

                let mean = bright.mean(Kind::Float);
                let contrasted = ((&bright - &mean) * c + &mean).contiguous();

                let gray = (contrasted.select(0, 0) * 0.299
                    + contrasted.select(0, 1) * 0.587
                    + contrasted.select(0, 2) * 0.114)
                    .unsqueeze(0);
                let saturated = &contrasted * s + &gray * (1.0 - s);

                Ok(Sample::tensor(saturated.clamp(0.0, 1.0), label))
            }
        }
    }
}

// ============================================================================
// RandomErasing
// ============================================================================

/// With probability `p`, zeroes out a random rectangle of the image.
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
        if !rng.random_bool(self.p) {
            return Ok(Sample::new(image, label));
        }

        match image {
            ImageData::Decoded(img) => {
                let (width, height) = (img.width() as i64, img.height() as i64);
                let Some((left, top, w, h)) =
                    sample_erase_region(rng, width, height, self.scale, self.ratio)
                else {
                    return Ok(Sample::decoded(img, label));
                };

                let mut rgb = match img {
                    DynamicImage::ImageRgb8(rgb) => rgb,
                    other => other.to_rgb8(),
                };
                for y in top..top + h {
                    for x in left..left + w {
                        rgb.put_pixel(x as u32, y as u32, image::Rgb([0, 0, 0]));
                    }
                }
                Ok(Sample::decoded(DynamicImage::ImageRgb8(rgb), label))
            }
            ImageData::Tensor(tensor) => {
                let (_c, height, width) = tensor.size3()?;
                let Some((left, top, w, h)) =
                    sample_erase_region(rng, width, height, self.scale, self.ratio)
                else {
                    return Ok(Sample::tensor(tensor, label));
                };

                // Mask multiply: zero the region without touching the input
                let mask = Tensor::ones(&[1, height, width], (tensor.kind(), Device::Cpu));
                let mut region = mask.narrow(1, top, h).narrow(2, left, w);
                let _ = region.fill_(0.0);
                Ok(Sample::tensor(&tensor * &mask, label))
            }
        }
    }
}
