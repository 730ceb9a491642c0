use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use crate::calibrate::{RawScore, DEFAULT_TEMPERATURE};
use crate::error::ScoreError;
use crate::layers::{conv::Conv2d, dense::Dense, pool::global_average_pool};
use crate::network::metadata::ModelMetadata;
use crate::network::model::{ImageInference, ScoringModel};
use crate::preprocess::normalizer::NormalizedTensor;

/// Convolutional backbone, global average pooling and a dense scoring head
/// ending in a single linear unit.
///
/// Weights are frozen: every method takes `&self`, so one instance is shared
/// read-only by all scoring calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringNetwork {
    pub input_size: u32,
    pub backbone: Vec<Conv2d>,
    pub head: Vec<Dense>,
    #[serde(default)]
    pub metadata: ModelMetadata,
}

impl ScoringNetwork {
    /// Checks that the layers chain together and end in one output.
    pub fn validate(&self) -> Result<(), ScoreError> {
        let invalid = |msg: String| -> Result<(), ScoreError> { Err(ScoreError::ModelLoad(msg)) };
        if self.input_size == 0 {
            return invalid("input_size must be non-zero".into());
        }
        if self.backbone.is_empty() || self.head.is_empty() {
            return invalid("network needs at least one convolution and one dense layer".into());
        }

        let mut channels = 3;
        for (i, conv) in self.backbone.iter().enumerate() {
            if let Err(e) = conv.check() {
                return invalid(format!("backbone layer {}: {}", i, e));
            }
            if conv.in_channels != channels {
                return invalid(format!(
                    "backbone layer {} expects {} input channels, previous layer produces {}",
                    i, conv.in_channels, channels
                ));
            }
            channels = conv.out_channels;
        }

        let mut features = channels;
        for (i, dense) in self.head.iter().enumerate() {
            if let Err(e) = dense.check() {
                return invalid(format!("head layer {}: {}", i, e));
            }
            if dense.input_size != features {
                return invalid(format!(
                    "head layer {} expects {} inputs, previous layer produces {}",
                    i, dense.input_size, features
                ));
            }
            features = dense.size;
        }
        if features != 1 {
            return invalid(format!("scoring head must end in 1 output, found {}", features));
        }

        let finite = self.backbone.iter().all(|c| c.weights.iter().chain(&c.biases).all(|v| v.is_finite()))
            && self.head.iter().all(|d| d.weights.iter().chain(&d.biases).all(|v| v.is_finite()));
        if !finite {
            return invalid("weights contain non-finite values".into());
        }

        if let Some(t) = self.metadata.calibration_temperature {
            if !t.is_finite() || t <= 0.0 {
                return invalid(format!("calibration temperature must be positive, got {}", t));
            }
        }
        Ok(())
    }

    /// Scores one tensor.  Fails if the tensor has the wrong shape or the
    /// output is not finite.
    pub fn forward(&self, input: &NormalizedTensor) -> Result<RawScore, ScoreError> {
        let expected = [self.input_size as usize, self.input_size as usize, 3];
        if input.shape() != expected {
            return Err(ScoreError::Inference(format!(
                "input shape {:?} does not match network input {:?}",
                input.shape(), expected
            )));
        }

        let mut layers = self.backbone.iter();
        let first = layers
            .next()
            .ok_or_else(|| ScoreError::Inference("network has no backbone".into()))?;
        let mut features = first.forward(input.tensor());
        for conv in layers {
            features = conv.forward(&features);
        }

        let mut current = global_average_pool(&features);
        for dense in &self.head {
            current = dense.forward(&current);
        }

        let raw = current.first().copied().unwrap_or(f32::NAN) as f64;
        if !raw.is_finite() {
            return Err(ScoreError::Inference(format!("network produced a non-finite score ({})", raw)));
        }
        Ok(raw)
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<(), ScoreError> {
        let file = std::fs::File::create(path)
            .map_err(|e| ScoreError::ModelLoad(format!("cannot create '{}': {}", path, e)))?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| ScoreError::ModelLoad(format!("cannot write '{}': {}", path, e)))
    }

    /// Deserializes and validates a network previously written by `save_json`.
    pub fn load_json(path: &str) -> Result<ScoringNetwork, ScoreError> {
        let file = std::fs::File::open(path)
            .map_err(|e| ScoreError::ModelLoad(format!("cannot open '{}': {}", path, e)))?;
        let reader = std::io::BufReader::new(file);
        let network: ScoringNetwork = serde_json::from_reader(reader)
            .map_err(|e| ScoreError::ModelLoad(format!("cannot parse '{}': {}", path, e)))?;
        network.validate()?;
        Ok(network)
    }
}

impl ScoringModel for ScoringNetwork {
    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn calibration_temperature(&self) -> f64 {
        self.metadata.calibration_temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// Images are evaluated in parallel but independently, so a tensor scores
    /// identically alone or inside any batch.
    fn infer(&self, batch: &[NormalizedTensor]) -> Result<Vec<ImageInference>, ScoreError> {
        Ok(batch.par_iter().map(|tensor| self.forward(tensor)).collect())
    }
}
