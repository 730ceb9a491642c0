pub mod format;
pub mod normalizer;

pub use format::ImageFormat;
pub use normalizer::{normalize, Normalizer, NormalizedTensor, RawImage, SourceInfo};
