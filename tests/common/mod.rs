#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};

use food_aesthetics::{NetworkSpec, RawImage, Scorer, ScorerConfig, ScoringNetwork};

/// Input resolution used by the test networks; small enough to keep tests fast.
pub const TEST_INPUT_SIZE: u32 = 32;

fn encode(image: DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// A gradient so different sizes produce different content.
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    encode(DynamicImage::ImageRgb8(img), ImageOutputFormat::Png)
}

pub fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color))), ImageOutputFormat::Png)
}

pub fn solid_rgba_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    encode(DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color))), ImageOutputFormat::Png)
}

pub fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 60]));
    encode(DynamicImage::ImageRgb8(img), ImageOutputFormat::Jpeg(90))
}

pub fn png_image(width: u32, height: u32) -> RawImage {
    RawImage::new(gradient_png(width, height), "png")
}

pub fn broken_image() -> RawImage {
    RawImage::new(b"this is not an image at all".to_vec(), "jpeg")
}

pub fn network(seed: u64) -> ScoringNetwork {
    NetworkSpec::with_input_size(TEST_INPUT_SIZE).build(seed).unwrap()
}

pub fn scorer(batch_size: usize) -> Scorer {
    Scorer::with_model(Arc::new(network(11)), ScorerConfig::with_batch_size(batch_size)).unwrap()
}
