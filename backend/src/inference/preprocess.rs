use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, RgbImage};
use ndarray::Array4;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Pixel normalization expected by the pretrained network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Scale to `[-1, 1]`.
    #[default]
    #[serde(rename = "mobilenet_v2")]
    MobileNetV2,
    /// BGR channel order, ImageNet mean subtracted, no scaling.
    Caffe,
    /// Scale to `[0, 1]`, then per-channel ImageNet mean/std.
    Torch,
}

const CAFFE_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];
const TORCH_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const TORCH_STD: [f32; 3] = [0.229, 0.224, 0.225];

impl Normalization {
    /// Value for output channel `channel` of an RGB pixel.
    pub fn apply(&self, rgb: [u8; 3], channel: usize) -> f32 {
        match self {
            Normalization::MobileNetV2 => rgb[channel] as f32 / 127.5 - 1.0,
            Normalization::Caffe => rgb[2 - channel] as f32 - CAFFE_MEAN_BGR[channel],
            Normalization::Torch => {
                (rgb[channel] as f32 / 255.0 - TORCH_MEAN[channel]) / TORCH_STD[channel]
            }
        }
    }
}

/// Reads and decodes an image file, trusting its content over its extension.
pub fn load_image(path: &Path) -> Result<DynamicImage, PreprocessError> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(image)
}

/// Converts any decoded image into a normalized `[1, size, size, 3]` batch.
///
/// Palette, grayscale and alpha images all go through an RGB conversion first;
/// the resize ignores aspect ratio, like the network's reference pipeline.
pub fn prepare_image(image: &DynamicImage, size: u32, normalization: Normalization) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let resized: RgbImage = if rgb.dimensions() == (size, size) {
        rgb
    } else {
        imageops::resize(&rgb, size, size, FilterType::CatmullRom)
    };

    let side = size as usize;
    Array4::from_shape_fn((1, side, side, 3), |(_, y, x, c)| {
        let pixel = resized.get_pixel(x as u32, y as u32);
        normalization.apply(pixel.0, c)
    })
}
