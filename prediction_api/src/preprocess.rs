use crate::config::PreprocessConfig;
use image::{imageops::FilterType, ColorType, DynamicImage, ImageError, ImageReader};
use ndarray::{Array, Ix4};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Error decoding image: {0}")]
    Decode(#[from] ImageError),
    #[error("Image must be in RGB format, got {0:?}")]
    UnsupportedImageFormat(ColorType),
    #[error("Image of {width}x{height} exceeds the {max_width}x{max_height} limit")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
}

/// Turns encoded image bytes into an NHWC `[1, size, size, 3]` tensor in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    target_size: u32,
    max_width: u32,
    max_height: u32,
    strict_rgb: bool,
}

impl ImagePreprocessor {
    pub fn new(config: &PreprocessConfig) -> Self {
        Self {
            target_size: config.target_size,
            max_width: config.max_width,
            max_height: config.max_height,
            strict_rgb: config.strict_rgb,
        }
    }

    pub fn preprocess(&self, image_data: &[u8]) -> Result<Array<f32, Ix4>, PreprocessError> {
        // Header-only read, so oversized images are refused before a full decode.
        let (width, height) = reader(image_data)?.into_dimensions()?;
        self.check_dimensions(width, height)?;

        let img = reader(image_data)?.decode()?;
        if self.strict_rgb && img.color().channel_count() != 3 {
            return Err(PreprocessError::UnsupportedImageFormat(img.color()));
        }

        Ok(self.to_tensor(&img))
    }

    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<(), PreprocessError> {
        if height > self.max_height || width > self.max_width {
            return Err(PreprocessError::ImageTooLarge {
                width,
                height,
                max_width: self.max_width,
                max_height: self.max_height,
            });
        }
        Ok(())
    }

    fn to_tensor(&self, img: &DynamicImage) -> Array<f32, Ix4> {
        let size = self.target_size;
        let resized = img.resize_exact(size, size, FilterType::Nearest).to_rgb8();

        let mut input = Array::zeros((1, size as usize, size as usize, 3));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            let [r, g, b] = pixel.0;
            input[[0, y, x, 0]] = (r as f32) / 255.;
            input[[0, y, x, 1]] = (g as f32) / 255.;
            input[[0, y, x, 2]] = (b as f32) / 255.;
        }
        input
    }
}

fn reader(image_data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, PreprocessError> {
    let reader = ImageReader::new(Cursor::new(image_data))
        .with_guessed_format()
        .map_err(ImageError::from)?;
    Ok(reader)
}
