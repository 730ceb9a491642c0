use serde::{Deserialize, Serialize};

/// Optional annotations stored alongside the weights in a model artifact.
/// All fields are `Option` so artifacts without metadata deserialize cleanly.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelMetadata {
    pub description: Option<String>,
    /// Free-form version tag of the trained weights.
    pub version: Option<String>,
    /// Calibration temperature frozen at training time.  Falls back to
    /// `DEFAULT_TEMPERATURE` when absent.
    pub calibration_temperature: Option<f64>,
}
