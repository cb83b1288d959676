use crate::error::{Error, Result};
use image::{DynamicImage, imageops, imageops::FilterType};
use ndarray::Array4;
use serde::{Deserialize, Serialize};

/// Spatial input size of the classifier.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl InputSize {
    pub const fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }

    /// NHWC shape of a single-image batch.
    pub fn batch_shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, 3]
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self::square(128)
    }
}

/// Decode an uploaded byte buffer, guessing the format from its content.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| Error::invalid_input(format!("Invalid image data: {}", e)))
}

/// Normalize an image into a `(1, H, W, 3)` tensor with values in `[0, 1]`.
pub fn preprocess(image: &DynamicImage, size: InputSize) -> Result<Array4<f32>> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::preprocessing("image has zero width or height"));
    }
    if size.width == 0 || size.height == 0 {
        return Err(Error::preprocessing(format!(
            "invalid target size {}x{}",
            size.width, size.height
        )));
    }

    let rgb = image.to_rgb8();
    let resized = imageops::resize(&rgb, size.width, size.height, FilterType::Lanczos3);

    let tensor = Array4::<f32>::from_shape_fn(
        (1, size.height as usize, size.width as usize, 3),
        |(_, y, x, c)| {
            let p = resized.get_pixel(x as u32, y as u32);
            p[c] as f32 / 255.0
        },
    );
    Ok(tensor)
}

/// Zero-filled batch used to warm up a freshly loaded model.
pub fn zeros(size: InputSize) -> Array4<f32> {
    Array4::zeros((1, size.height as usize, size.width as usize, 3))
}
