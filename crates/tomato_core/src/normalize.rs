//! Decoding, preview cropping and tensor preparation for uploaded photos.

use crate::config::Size;
use crate::error::{PredictError, Result};
use fast_image_resize as fir;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage, imageops::FilterType};
use ndarray::{Array4, ArrayView4};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Pixel scaling applied before inference.
///
/// The choice belongs to the model artifact: a network trained with one mode
/// produces meaningless scores when fed tensors prepared with the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalization {
    /// EfficientNet feature scaling. The network rescales internally, so raw
    /// 0..=255 values are passed through unchanged.
    #[serde(rename = "efficientnet")]
    EfficientNet,
    /// Linear rescale into [0,1].
    #[serde(rename = "unit_scale")]
    UnitScale,
}

impl Normalization {
    #[inline]
    pub fn apply(self, value: u8) -> f32 {
        match self {
            Normalization::EfficientNet => value as f32,
            Normalization::UnitScale => value as f32 / 255.0,
        }
    }

    /// Closed range of values this mode can produce.
    pub fn value_range(self) -> (f32, f32) {
        match self {
            Normalization::EfficientNet => (0.0, 255.0),
            Normalization::UnitScale => (0.0, 1.0),
        }
    }
}

/// NHWC float tensor with a leading batch dimension of 1.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceTensor {
    data: Array4<f32>,
}

impl InferenceTensor {
    pub fn shape(&self) -> [usize; 4] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3]]
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }
}

/// Rectangle in source pixel coordinates, fractional like the resizer expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Largest box with the aspect ratio of `target` that fits in `width`×`height`,
/// positioned by `centering` (0.5, 0.5 is the middle).
pub fn fit_crop_box(width: u32, height: u32, target: Size, centering: (f64, f64)) -> CropBox {
    let (w, h) = (width as f64, height as f64);
    let source_aspect = w / h;
    let target_aspect = target.width as f64 / target.height as f64;

    let (crop_w, crop_h) = if source_aspect > target_aspect {
        (target_aspect * h, h)
    } else {
        (w, w / target_aspect)
    };

    CropBox {
        left: (w - crop_w) * centering.0.clamp(0.0, 1.0),
        top: (h - crop_h) * centering.1.clamp(0.0, 1.0),
        width: crop_w,
        height: crop_h,
    }
}

/// Decodes uploaded bytes (JPEG or PNG) into an RGB image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PredictError::UnreadableImage(e.to_string()))?;
    match reader.format() {
        Some(ImageFormat::Jpeg) | Some(ImageFormat::Png) => {}
        Some(other) => {
            return Err(PredictError::UnreadableImage(format!(
                "unsupported format {other:?}"
            )));
        }
        None => {
            return Err(PredictError::UnreadableImage(
                "unrecognised image data".to_string(),
            ));
        }
    }
    let img = reader
        .decode()
        .map_err(|e| PredictError::UnreadableImage(e.to_string()))?;
    Ok(DynamicImage::ImageRgb8(img.into_rgb8()))
}

/// Centre-cropped, aspect-preserving Lanczos downscale to exactly `target`.
pub fn make_preview(image: &DynamicImage, target: Size) -> Result<RgbImage> {
    let src = image.to_rgb8();
    let (w, h) = src.dimensions();
    let crop = fit_crop_box(w, h, target, (0.5, 0.5));

    let src_view = fir::images::ImageRef::new(w, h, src.as_raw(), fir::PixelType::U8x3)
        .map_err(|e| PredictError::Resize(e.to_string()))?;
    let mut dst = fir::images::Image::new(target.width, target.height, fir::PixelType::U8x3);
    let opts = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3))
        .crop(crop.left, crop.top, crop.width, crop.height);
    fir::Resizer::new()
        .resize(&src_view, &mut dst, &opts)
        .map_err(|e| PredictError::Resize(e.to_string()))?;

    RgbImage::from_raw(target.width, target.height, dst.into_vec())
        .ok_or_else(|| PredictError::Resize("preview buffer has wrong length".to_string()))
}

/// Converts to RGB, stretches to `model_size` and scales pixels per `normalization`.
pub fn prepare_for_model(
    image: &DynamicImage,
    model_size: Size,
    normalization: Normalization,
) -> InferenceTensor {
    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(
        &rgb,
        model_size.width,
        model_size.height,
        FilterType::Lanczos3,
    );
    let mut data = Array4::<f32>::zeros((
        1,
        model_size.height as usize,
        model_size.width as usize,
        3,
    ));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (row, col) = (y as usize, x as usize);
        for (c, value) in pixel.0.iter().enumerate() {
            data[[0, row, col, c]] = normalization.apply(*value);
        }
    }
    tracing::debug!(
        "prepared {}x{} tensor ({:?}) from {}x{} image",
        model_size.width,
        model_size.height,
        normalization,
        image.width(),
        image.height()
    );
    InferenceTensor { data }
}

/// Preview and tensor preparation bound to one configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    pub preview_size: Size,
    pub model_size: Size,
    pub normalization: Normalization,
}

impl Normalizer {
    pub fn preview(&self, image: &DynamicImage) -> Result<RgbImage> {
        make_preview(image, self.preview_size)
    }

    pub fn tensor(&self, image: &DynamicImage) -> InferenceTensor {
        prepare_for_model(image, self.model_size, self.normalization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{ImageBuffer, Rgb};
    use rstest::rstest;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        DynamicImage::ImageRgb8(img)
    }

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[rstest]
    #[case(1000, 250)]
    #[case(250, 1000)]
    #[case(526, 250)]
    #[case(13, 7)]
    #[case(3000, 3000)]
    fn preview_has_exact_target_size(#[case] w: u32, #[case] h: u32) {
        let target = Size::new(526, 250);
        let preview = make_preview(&gradient(w, h), target).unwrap();
        assert_eq!(preview.dimensions(), (526, 250));
    }

    #[test]
    fn crop_box_trims_wide_images_horizontally() {
        let crop = fit_crop_box(1000, 250, Size::new(526, 250), (0.5, 0.5));
        assert_relative_eq!(crop.width, 526.0, epsilon = 1e-9);
        assert_relative_eq!(crop.height, 250.0);
        assert_relative_eq!(crop.left, 237.0, epsilon = 1e-9);
        assert_relative_eq!(crop.top, 0.0);
    }

    #[test]
    fn crop_box_trims_tall_images_vertically() {
        let crop = fit_crop_box(200, 400, Size::new(100, 100), (0.5, 0.5));
        assert_relative_eq!(crop.width, 200.0);
        assert_relative_eq!(crop.height, 200.0);
        assert_relative_eq!(crop.left, 0.0);
        assert_relative_eq!(crop.top, 100.0);
    }

    #[test]
    fn preview_keeps_the_centre_of_the_image() {
        // Red band in the middle, blue on the outer thirds.
        let img = ImageBuffer::from_fn(300, 100, |x, _| {
            if (100..200).contains(&x) {
                Rgb([255u8, 0, 0])
            } else {
                Rgb([0u8, 0, 255])
            }
        });
        let preview = make_preview(&DynamicImage::ImageRgb8(img), Size::new(50, 50)).unwrap();
        let centre = preview.get_pixel(25, 25);
        assert!(centre.0[0] > 200 && centre.0[2] < 50, "centre was {centre:?}");
    }

    #[rstest]
    #[case(Normalization::EfficientNet)]
    #[case(Normalization::UnitScale)]
    fn tensor_has_batch_nhwc_shape_and_bounded_values(#[case] mode: Normalization) {
        let tensor = prepare_for_model(&gradient(640, 480), Size::new(224, 224), mode);
        assert_eq!(tensor.shape(), [1, 224, 224, 3]);
        let (lo, hi) = mode.value_range();
        assert!(tensor.view().iter().all(|v| (lo..=hi).contains(v)));
    }

    #[test]
    fn tensor_from_grayscale_has_three_channels() {
        let gray = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(30, 60, image::Luma([128u8])));
        let tensor = prepare_for_model(&gray, Size::new(224, 224), Normalization::UnitScale);
        assert_eq!(tensor.shape(), [1, 224, 224, 3]);
        let view = tensor.view();
        assert_relative_eq!(view[[0, 100, 100, 0]], 128.0 / 255.0, epsilon = 1e-6);
        assert_relative_eq!(view[[0, 100, 100, 2]], 128.0 / 255.0, epsilon = 1e-6);
    }

    #[test]
    fn normalization_modes_differ_by_255() {
        let solid = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(10, 10, Rgb([51u8, 102, 204])));
        let raw = prepare_for_model(&solid, Size::new(224, 224), Normalization::EfficientNet);
        let unit = prepare_for_model(&solid, Size::new(224, 224), Normalization::UnitScale);
        assert_relative_eq!(raw.view()[[0, 0, 0, 1]], 102.0, epsilon = 1e-4);
        assert_relative_eq!(unit.view()[[0, 0, 0, 1]], 0.4, epsilon = 1e-4);
    }

    #[test]
    fn decode_accepts_png_and_jpeg() {
        let img = gradient(32, 16);
        for format in [ImageFormat::Png, ImageFormat::Jpeg] {
            let decoded = decode_image(&encode(&img, format)).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (32, 16));
            assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
        }
    }

    #[test]
    fn decode_rejects_truncated_png() {
        let bytes = encode(&gradient(64, 64), ImageFormat::Png);
        let err = decode_image(&bytes[..bytes.len() / 3]).unwrap_err();
        assert!(matches!(err, PredictError::UnreadableImage(_)));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode_image(b"definitely not a tomato").unwrap_err();
        assert!(matches!(err, PredictError::UnreadableImage(_)));
    }
}
