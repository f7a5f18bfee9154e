use anyhow::{anyhow, Result};
use image::DynamicImage;
use tch::Tensor;

/// The in-memory form of a sample's image data at pipeline entry.
///
/// The benchmark compares the same pipelines over two representations:
/// - `Tensor`: a channel-first `[C, H, W]` `tch::Tensor`
/// - `Decoded`: a decoded image object (`image::DynamicImage`)
///
/// Stages declare which representations they accept; feeding the wrong
/// representation into a stage is a construction bug and surfaces as a
/// fatal error during the run.
#[derive(Debug)]
pub enum ImageData {
    Tensor(Tensor),
    Decoded(DynamicImage),
}

/// Shallow clone for tensors: storage is shared, so stages must never
/// mutate tensor data in place.
impl Clone for ImageData {
    fn clone(&self) -> Self {
        match self {
            ImageData::Tensor(t) => ImageData::Tensor(t.shallow_clone()),
            ImageData::Decoded(img) => ImageData::Decoded(img.clone()),
        }
    }
}

impl ImageData {
    /// Borrows the tensor payload, or errors for decoded images.
    pub fn as_tensor(&self) -> Result<&Tensor> {
        match self {
            ImageData::Tensor(t) => Ok(t),
            ImageData::Decoded(_) => Err(anyhow!(
                "Expected a tensor-backed image but found a decoded image object"
            )),
        }
    }

    /// Consumes the payload as a tensor, or errors for decoded images.
    pub fn into_tensor(self) -> Result<Tensor> {
        match self {
            ImageData::Tensor(t) => Ok(t),
            ImageData::Decoded(_) => Err(anyhow!(
                "Expected a tensor-backed image but found a decoded image object"
            )),
        }
    }

    /// Consumes the payload as a decoded image, or errors for tensors.
    pub fn into_decoded(self) -> Result<DynamicImage> {
        match self {
            ImageData::Decoded(img) => Ok(img),
            ImageData::Tensor(_) => Err(anyhow!(
                "Expected a decoded image object but found a tensor"
            )),
        }
    }

    /// Value equality across the two representations.
    ///
    /// Used by determinism tests: two materializations of the same seeded
    /// source must be content-equal, whatever the representation.
    pub fn content_eq(&self, other: &ImageData) -> bool {
        match (self, other) {
            (ImageData::Tensor(a), ImageData::Tensor(b)) => {
                a.size() == b.size() && a.kind() == b.kind() && a.equal(b)
            }
            (ImageData::Decoded(a), ImageData::Decoded(b)) => a.as_bytes() == b.as_bytes(),
            _ => false,
        }
    }
}

/// A single data example flowing through a pipeline: image data plus an
/// optional classification label. Stages transform the image and pass the
/// label through untouched.
#[derive(Debug, Clone)]
pub struct Sample {
    pub image: ImageData,
    pub label: Option<i64>,
}

impl Sample {
    pub fn new(image: ImageData, label: Option<i64>) -> Self {
        Self { image, label }
    }

    /// Convenience constructor for a tensor-backed sample.
    pub fn tensor(tensor: Tensor, label: Option<i64>) -> Self {
        Self::new(ImageData::Tensor(tensor), label)
    }

    /// Convenience constructor for a decoded-image sample.
    pub fn decoded(image: DynamicImage, label: Option<i64>) -> Self {
        Self::new(ImageData::Decoded(image), label)
    }

    /// Replaces the image payload, keeping the label.
    pub fn with_image(self, image: ImageData) -> Self {
        Self {
            image,
            label: self.label,
        }
    }

    pub fn content_eq(&self, other: &Sample) -> bool {
        self.label == other.label && self.image.content_eq(&other.image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tch::{Kind, Tensor};

    fn test_image(marker: u8) -> DynamicImage {
        let mut img = RgbImage::new(2, 2);
        img.put_pixel(0, 0, Rgb([marker, 0, 0]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_tensor_sample_round_trip() -> Result<()> {
        let sample = Sample::tensor(Tensor::from_slice(&[1i64, 2, 3]), Some(7));
        assert_eq!(sample.label, Some(7));

        let t = sample.image.into_tensor()?;
        assert_eq!(t.size(), vec![3]);
        Ok(())
    }

    #[test]
    fn test_representation_mismatch_is_an_error() {
        let sample = Sample::decoded(test_image(1), None);
        assert!(sample.image.as_tensor().is_err());

        let sample = Sample::tensor(Tensor::from_slice(&[0i64]), None);
        assert!(sample.image.into_decoded().is_err());
    }

    #[test]
    fn test_content_equality() {
        let a = Sample::decoded(test_image(3), Some(1));
        let b = Sample::decoded(test_image(3), Some(1));
        let c = Sample::decoded(test_image(4), Some(1));
        assert!(a.content_eq(&b));
        assert!(!a.content_eq(&c));

        let ta = Sample::tensor(Tensor::from_slice(&[1.0f32, 2.0]), None);
        let tb = Sample::tensor(Tensor::from_slice(&[1.0f32, 2.0]), None);
        let tc = Sample::tensor(Tensor::from_slice(&[1.0f32, 3.0]), None);
        assert!(ta.content_eq(&tb));
        assert!(!ta.content_eq(&tc));

        // Representation matters for equality
        let img = Sample::decoded(test_image(1), None);
        let ten = Sample::tensor(Tensor::zeros(&[3, 2, 2], (Kind::Uint8, tch::Device::Cpu)), None);
        assert!(!img.content_eq(&ten));
    }

    #[test]
    fn test_shallow_clone_shares_storage() {
        let sample = Sample::tensor(Tensor::from_slice(&[1.0f32, 2.0]), None);
        let clone = sample.clone();
        assert!(sample.content_eq(&clone));
    }
}
