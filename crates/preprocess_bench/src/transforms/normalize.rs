//! Channel-wise normalization, the stage the benchmark varies.
//!
//! The four variants compute the same values by different routes, so
//! configurations differ only in cost, never in output:
//! - `Standard`: `(x - mean) / std` with parameter tensors built per call
//! - `ChannelsLast`: identical math on a `[H, W, C]` layout
//! - `ChannelsFirst`: identical math after forcing a contiguous `[C, H, W]`
//! - `Fused`: a lazily built scale/bias kernel; one multiply-add per call

use crate::sample::Sample;
use crate::stage::Stage;
use crate::task::NormalizeKind;
use anyhow::{ensure, Context, Result};
use rand::rngs::StdRng;
use std::cell::OnceCell;
use tch::{Kind, Tensor};

/// Normalizes a float `[C, H, W]` tensor with per-channel statistics.
///
/// # Mathematical Operation
/// ```text
/// output[c, h, w] = (input[c, h, w] - mean[c]) / std[c]
/// ```
pub struct Normalize {
    mean: Vec<f32>,
    std: Vec<f32>,
    kind: NormalizeKind,
    /// Fused (scale, bias) kernel, built on first use. The build cost is
    /// a one-time setup expense that the warm-up pass absorbs.
    fused: OnceCell<(Tensor, Tensor)>,
}

impl Normalize {
    pub fn new(mean: &[f32], std: &[f32], kind: NormalizeKind) -> Result<Self> {
        ensure!(!mean.is_empty(), "Normalization mean cannot be empty");
        ensure!(
            mean.len() == std.len(),
            "The mean and standard deviation for normalization must match in dimension
            (mean has {}, std has {})",
            mean.len(),
            std.len()
        );
        ensure!(
            std.iter().all(|&s| s != 0.0),
            "Normalization std must be nonzero"
        );
        Ok(Self {
            mean: mean.to_vec(),
            std: std.to_vec(),
            kind,
            fused: OnceCell::new(),
        })
    }

    /// ImageNet RGB statistics.
    pub fn imagenet(kind: NormalizeKind) -> Self {
        Self {
            mean: vec![0.485, 0.456, 0.406],
            std: vec![0.229, 0.224, 0.225],
            kind,
            fused: OnceCell::new(),
        }
    }

    fn check_channels(&self, tensor: &Tensor) -> Result<i64> {
        let (num_channels, _height, _width) = tensor
            .size3()
            .context("Input must be a 3D tensor [C, H, W]")?;
        ensure!(
            num_channels as usize == self.mean.len(),
            "Channel count mismatch: input has {} channels but normalization expects {}",
            num_channels,
            self.mean.len()
        );
        Ok(num_channels)
    }

    fn standard(&self, tensor: &Tensor) -> Result<Tensor> {
        let num_channels = self.check_channels(tensor)?;
        let mean_t = Tensor::from_slice(&self.mean)
            .reshape(&[num_channels, 1, 1])
            .to_kind(tensor.kind());
        let std_t = Tensor::from_slice(&self.std)
            .reshape(&[num_channels, 1, 1])
            .to_kind(tensor.kind());
        Ok((tensor - mean_t) / std_t)
    }

    fn channels_last(&self, tensor: &Tensor) -> Result<Tensor> {
        self.check_channels(tensor)?;
        let hwc = tensor.permute(&[1, 2, 0]).contiguous();
        let mean_t = Tensor::from_slice(&self.mean).to_kind(hwc.kind());
        let std_t = Tensor::from_slice(&self.std).to_kind(hwc.kind());
        let normalized = (hwc - mean_t) / std_t;
        Ok(normalized.permute(&[2, 0, 1]))
    }

    fn channels_first(&self, tensor: &Tensor) -> Result<Tensor> {
        self.check_channels(tensor)?;
        self.standard(&tensor.contiguous())
    }

    fn fused(&self, tensor: &Tensor) -> Result<Tensor> {
        let num_channels = self.check_channels(tensor)?;
        let (scale, bias) = self.fused.get_or_init(|| {
            let mean_t = Tensor::from_slice(&self.mean)
                .reshape(&[num_channels, 1, 1])
                .to_kind(Kind::Float);
            let std_t = Tensor::from_slice(&self.std)
                .reshape(&[num_channels, 1, 1])
                .to_kind(Kind::Float);
            let scale = std_t.reciprocal();
            let bias = -(&mean_t * &scale);
            (scale, bias)
        });
        Ok(tensor * scale + bias)
    }
}

impl Stage for Normalize {
    fn name(&self) -> &str {
        "normalize"
    }

    fn invoke(&self, sample: Sample, _rng: &mut StdRng) -> Result<Sample> {
        let Sample { image, label } = sample;
        let tensor = image.into_tensor()?;
        let normalized = match self.kind {
            NormalizeKind::Standard => self.standard(&tensor)?,
            NormalizeKind::ChannelsLast => self.channels_last(&tensor)?,
            NormalizeKind::ChannelsFirst => self.channels_first(&tensor)?,
            NormalizeKind::Fused => self.fused(&tensor)?,
        };
        Ok(Sample::tensor(normalized, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use tch::Device;

    fn run(kind: NormalizeKind, input: &Tensor) -> Result<Tensor> {
        let mut rng = StdRng::seed_from_u64(0);
        Normalize::imagenet(kind)
            .invoke(Sample::tensor(input.shallow_clone(), None), &mut rng)?
            .image
            .into_tensor()
    }

    #[test]
    fn test_unit_statistics_center_the_input() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let norm = Normalize::new(&[1.0; 3], &[1.0; 3], NormalizeKind::Standard)?;
        let tensor = Tensor::ones(&[3, 16, 16], (Kind::Float, Device::Cpu));

        let out = norm
            .invoke(Sample::tensor(tensor, None), &mut rng)?
            .image
            .into_tensor()?;
        for c in 0..3 {
            let channel_mean = out.select(0, c).mean(Kind::Float);
            assert!(channel_mean.double_value(&[]).abs() < 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_all_variants_compute_the_same_values() -> Result<()> {
        let input = Tensor::rand(&[3, 12, 10], (Kind::Float, Device::Cpu));
        let reference = run(NormalizeKind::Standard, &input)?;

        for kind in [
            NormalizeKind::ChannelsLast,
            NormalizeKind::ChannelsFirst,
            NormalizeKind::Fused,
        ] {
            let out = run(kind, &input)?;
            assert_eq!(out.size(), reference.size());
            assert!(
                out.allclose(&reference, 1e-5, 1e-7, false),
                "{:?} diverged from Standard",
                kind
            );
        }
        Ok(())
    }

    #[test]
    fn test_fused_kernel_is_reused_across_invocations() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let norm = Normalize::imagenet(NormalizeKind::Fused);
        let input = Tensor::rand(&[3, 8, 8], (Kind::Float, Device::Cpu));

        let first = norm
            .invoke(Sample::tensor(input.shallow_clone(), None), &mut rng)?
            .image
            .into_tensor()?;
        let second = norm
            .invoke(Sample::tensor(input, None), &mut rng)?
            .image
            .into_tensor()?;
        assert!(first.allclose(&second, 0.0, 0.0, false));
        Ok(())
    }

    #[test]
    fn test_channel_mismatch_is_fatal() {
        let mut rng = StdRng::seed_from_u64(0);
        let norm = Normalize::imagenet(NormalizeKind::Standard);
        let tensor = Tensor::ones(&[1, 4, 4], (Kind::Float, Device::Cpu));
        assert!(norm.invoke(Sample::tensor(tensor, None), &mut rng).is_err());
    }

    #[test]
    fn test_zero_std_rejected_at_construction() {
        assert!(Normalize::new(&[0.5; 3], &[0.0, 1.0, 1.0], NormalizeKind::Standard).is_err());
    }
}
