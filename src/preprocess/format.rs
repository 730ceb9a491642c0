use std::fmt;

use crate::error::ScoreError;

/// Image container formats the normalizer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Bmp,
    Gif,
}

impl ImageFormat {
    pub const SUPPORTED: [ImageFormat; 4] =
        [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Bmp, ImageFormat::Gif];

    /// Parses a declared format tag such as `"jpeg"`, `"JPG"` or `"image/png"`.
    pub fn parse(tag: &str) -> Result<ImageFormat, ScoreError> {
        let tag = tag.trim().to_ascii_lowercase();
        let tag = tag.strip_prefix("image/").unwrap_or(tag.as_str());
        match tag {
            "jpeg" | "jpg" | "pjpeg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "bmp" | "x-ms-bmp" => Ok(ImageFormat::Bmp),
            "gif" => Ok(ImageFormat::Gif),
            other => Err(ScoreError::UnsupportedFormat(format!(
                "'{}' is not one of jpeg, png, bmp, gif", other
            ))),
        }
    }

    /// Maps a format sniffed by the `image` crate onto the supported set.
    pub fn from_detected(format: image::ImageFormat) -> Option<ImageFormat> {
        match format {
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::Png => Some(ImageFormat::Png),
            image::ImageFormat::Bmp => Some(ImageFormat::Bmp),
            image::ImageFormat::Gif => Some(ImageFormat::Gif),
            _ => None,
        }
    }

    pub fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
            ImageFormat::Gif => image::ImageFormat::Gif,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Gif => "gif",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
