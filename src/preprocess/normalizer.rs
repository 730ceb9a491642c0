//! Image normalization: raw bytes in, fixed-shape network input out.
//!
//! Every image goes through the same steps:
//! 1. reject empty, oversized or unsupported input;
//! 2. decode to 8-bit RGB (alpha is dropped);
//! 3. scale so the longer side equals `input_size`, keeping the aspect ratio;
//! 4. letterbox: centre the result on an `input_size × input_size` canvas
//!    filled with the mean colour (images are padded, never cropped);
//! 5. per-channel `(v / 255 - mean) / std`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use tracing::debug;

use crate::error::ScoreError;
use crate::math::tensor::Tensor3;
use crate::preprocess::format::ImageFormat;

/// ImageNet channel means, in [0, 1].
pub const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations, in [0, 1].
pub const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];
/// Letterbox fill: the channel means as 8-bit values, so padding normalizes to ~0.
pub const PAD_COLOR: [u8; 3] = [124, 116, 104];

/// Default ceiling on encoded image size.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

// ---------------------------------------------------------------------------
// RawImage
// ---------------------------------------------------------------------------

/// Encoded image bytes as received, plus the format the caller declared.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    /// Declared format tag ("jpeg", "png", ...).  `None` means "sniff it".
    pub declared_format: Option<String>,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>, declared_format: impl Into<String>) -> RawImage {
        RawImage { bytes, declared_format: Some(declared_format.into()) }
    }

    /// An image whose format is taken from its content alone.
    pub fn undeclared(bytes: Vec<u8>) -> RawImage {
        RawImage { bytes, declared_format: None }
    }

    /// Decodes a base64 payload.  Whitespace is ignored and a
    /// `data:image/...;base64,` prefix is stripped.
    pub fn from_base64(data: &str, declared_format: impl Into<String>) -> Result<RawImage, ScoreError> {
        let payload = match data.trim_start().strip_prefix("data:") {
            Some(rest) => rest
                .split_once(";base64,")
                .map(|(_, b64)| b64)
                .ok_or_else(|| ScoreError::Decode("data URL is not base64 encoded".into()))?,
            None => data,
        };
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| ScoreError::Decode(format!("invalid base64 payload: {}", e)))?;
        Ok(RawImage::new(bytes, declared_format))
    }
}

// ---------------------------------------------------------------------------
// NormalizedTensor
// ---------------------------------------------------------------------------

/// Where a normalized tensor came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Width of the decoded image before resizing.
    pub width: u32,
    /// Height of the decoded image before resizing.
    pub height: u32,
    /// The declared format tag, or the sniffed format when none was declared.
    pub format: String,
}

/// Network input: always `size × size × 3`, normalized per channel.
///
/// Only the normalizer constructs these, so the shape invariant holds for
/// every value in circulation.
#[derive(Debug, Clone)]
pub struct NormalizedTensor {
    tensor: Tensor3,
    source: SourceInfo,
}

impl NormalizedTensor {
    pub fn shape(&self) -> [usize; 3] {
        self.tensor.shape()
    }

    pub fn tensor(&self) -> &Tensor3 {
        &self.tensor
    }

    pub fn source(&self) -> &SourceInfo {
        &self.source
    }

    pub fn pixel(&self, y: usize, x: usize) -> [f32; 3] {
        let p = self.tensor.pixel(y, x);
        [p[0], p[1], p[2]]
    }
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Normalizer {
    pub input_size: u32,
    pub max_image_bytes: usize,
}

impl Normalizer {
    pub fn new(input_size: u32) -> Normalizer {
        Normalizer { input_size, max_image_bytes: DEFAULT_MAX_IMAGE_BYTES }
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Normalizer {
        self.max_image_bytes = max_image_bytes;
        self
    }

    pub fn normalize(&self, raw: &RawImage) -> Result<NormalizedTensor, ScoreError> {
        if raw.bytes.is_empty() {
            return Err(ScoreError::Decode("image is empty".into()));
        }
        if raw.bytes.len() > self.max_image_bytes {
            return Err(ScoreError::Decode(format!(
                "image is {} bytes, limit is {}", raw.bytes.len(), self.max_image_bytes
            )));
        }
        let declared = raw.declared_format.as_deref().map(ImageFormat::parse).transpose()?;

        let detected = image::guess_format(&raw.bytes)
            .map_err(|_| ScoreError::Decode("unrecognised image data".into()))?;
        let format = ImageFormat::from_detected(detected).ok_or_else(|| {
            ScoreError::UnsupportedFormat(format!("content is {:?}", detected))
        })?;
        if let Some(declared) = declared {
            if declared != format {
                debug!(declared = %declared, detected = %format, "declared format differs from content");
            }
        }

        let decoded = image::load_from_memory_with_format(&raw.bytes, format.to_image_format())
            .map_err(|e| ScoreError::Decode(e.to_string()))?
            .to_rgb8();
        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(ScoreError::Decode("image has no pixels".into()));
        }

        let canvas = letterbox(&decoded, self.input_size);
        let tensor = to_normalized_tensor(&canvas);
        let source = SourceInfo {
            width,
            height,
            format: raw
                .declared_format
                .clone()
                .unwrap_or_else(|| format.as_str().to_owned()),
        };
        debug!(width, height, format = %format, size = self.input_size, "image normalized");
        Ok(NormalizedTensor { tensor, source })
    }
}

/// Normalizes with default limits.
pub fn normalize(raw: &RawImage, input_size: u32) -> Result<NormalizedTensor, ScoreError> {
    Normalizer::new(input_size).normalize(raw)
}

/// Side lengths after scaling the longer side to `target`.
pub fn fitted_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    let scale = target as f64 / width.max(height) as f64;
    let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, target);
    (fit(width), fit(height))
}

/// Resizes `image` into a `target × target` canvas, preserving aspect ratio
/// and padding the short side symmetrically with `PAD_COLOR`.
pub fn letterbox(image: &RgbImage, target: u32) -> RgbImage {
    let (new_w, new_h) = fitted_dimensions(image.width(), image.height(), target);
    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(target, target, Rgb(PAD_COLOR));
    let x_offset = (target - new_w) / 2;
    let y_offset = (target - new_h) / 2;
    imageops::overlay(&mut canvas, &resized, x_offset as i64, y_offset as i64);
    canvas
}

fn to_normalized_tensor(canvas: &RgbImage) -> Tensor3 {
    let (w, h) = canvas.dimensions();
    let data = canvas
        .pixels()
        .flat_map(|p| (0..3).map(move |c| normalize_channel(p.0[c], c)))
        .collect();
    Tensor3 { height: h as usize, width: w as usize, channels: 3, data }
}

/// Normalized value of one 8-bit channel sample.
pub fn normalize_channel(value: u8, channel: usize) -> f32 {
    (value as f32 / 255.0 - CHANNEL_MEAN[channel]) / CHANNEL_STD[channel]
}
