pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod preprocess;
pub mod calibrate;
pub mod scorer;
pub mod config;
pub mod error;
pub mod logging;

// Convenience re-exports
pub use activation::activation::ActivationFunction;
pub use calibrate::{AestheticScore, Calibrator, RawScore, DEFAULT_TEMPERATURE};
pub use config::{ScorerConfig, ServiceConfig};
pub use error::{ErrorKind, ScoreError};
pub use network::{ModelMetadata, NetworkSpec, ScoringModel, ScoringNetwork};
pub use preprocess::{normalize, ImageFormat, NormalizedTensor, RawImage};
pub use scorer::{BatchResult, CancelFlag, Failure, ImageOutcome, ScoredImage, Scorer};
