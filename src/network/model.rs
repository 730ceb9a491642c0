use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::calibrate::{Calibrator, RawScore, DEFAULT_TEMPERATURE};
use crate::error::ScoreError;
use crate::preprocess::normalizer::NormalizedTensor;

/// Per-image result of a forward pass.
pub type ImageInference = Result<RawScore, ScoreError>;

/// A frozen scorer: normalized tensors in, one raw score per tensor out.
///
/// Implementations take `&self` only and must not carry state between calls,
/// so a single instance can serve any number of threads at once.
pub trait ScoringModel: Send + Sync {
    /// Side length of the square input the model expects.
    fn input_size(&self) -> u32;

    /// Temperature the model's outputs were calibrated with.
    fn calibration_temperature(&self) -> f64 {
        DEFAULT_TEMPERATURE
    }

    /// Runs one combined forward pass.
    ///
    /// The inner results are per image, in input order.  The outer `Err` means
    /// the batch as a whole could not be evaluated.
    fn infer(&self, batch: &[NormalizedTensor]) -> Result<Vec<ImageInference>, ScoreError>;
}

/// A model together with the calibrator derived from it at install time.
#[derive(Clone)]
pub struct LoadedModel {
    pub model: Arc<dyn ScoringModel>,
    pub calibrator: Calibrator,
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("input_size", &self.model.input_size())
            .field("calibrator", &self.calibrator)
            .finish()
    }
}

/// Process-wide, write-once holder for the scoring model.
///
/// Installation happens at most once; afterwards every reader gets the same
/// `Arc` without taking a lock.  Readers that arrive first see
/// `ModelNotLoaded`.
#[derive(Debug, Default)]
pub struct ModelSlot {
    inner: OnceLock<LoadedModel>,
}

impl ModelSlot {
    pub fn new() -> Self {
        ModelSlot { inner: OnceLock::new() }
    }

    pub fn install(&self, model: Arc<dyn ScoringModel>) -> Result<(), ScoreError> {
        let calibrator = Calibrator::new(model.calibration_temperature())?;
        let input_size = model.input_size();
        self.inner
            .set(LoadedModel { model, calibrator })
            .map_err(|_| ScoreError::ModelLoad("a model is already installed".into()))?;
        info!(input_size, temperature = calibrator.temperature(), "scoring model installed");
        Ok(())
    }

    pub fn get(&self) -> Result<&LoadedModel, ScoreError> {
        self.inner.get().ok_or(ScoreError::ModelNotLoaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.get().is_some()
    }
}
