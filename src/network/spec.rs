use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::calibrate::DEFAULT_TEMPERATURE;
use crate::error::ScoreError;
use crate::layers::{conv::Conv2d, dense::Dense};
use crate::network::metadata::ModelMetadata;
use crate::network::network::ScoringNetwork;

fn default_kernel() -> usize {
    3
}

/// One convolution in the backbone.  Input channels are implied by the
/// previous layer (3 for the first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvSpec {
    pub out_channels: usize,
    #[serde(default = "default_kernel")]
    pub kernel: usize,
    pub stride: usize,
    pub activation: ActivationFunction,
}

/// One dense layer in the scoring head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseSpec {
    pub size: usize,
    pub activation: ActivationFunction,
}

/// Architecture of a scoring network, independent of its weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub input_size: u32,
    pub backbone: Vec<ConvSpec>,
    pub head: Vec<DenseSpec>,
    #[serde(default)]
    pub metadata: ModelMetadata,
}

impl NetworkSpec {
    /// The production architecture: 224px input, four stride-2 convolutions
    /// and a two-layer head.
    pub fn food_default() -> NetworkSpec {
        NetworkSpec::with_input_size(224)
    }

    /// The production layer stack at a different input resolution.
    pub fn with_input_size(input_size: u32) -> NetworkSpec {
        let conv = |out_channels| ConvSpec {
            out_channels,
            kernel: 3,
            stride: 2,
            activation: ActivationFunction::ReLU,
        };
        NetworkSpec {
            input_size,
            backbone: vec![conv(16), conv(32), conv(64), conv(64)],
            head: vec![
                DenseSpec { size: 32, activation: ActivationFunction::ReLU },
                DenseSpec { size: 1, activation: ActivationFunction::Identity },
            ],
            metadata: ModelMetadata {
                description: Some("food aesthetics scorer".into()),
                version: None,
                calibration_temperature: Some(DEFAULT_TEMPERATURE),
            },
        }
    }

    /// Instantiates the architecture with He-initialized weights drawn from
    /// `seed`.  The same seed always yields the same weights.
    pub fn build(&self, seed: u64) -> Result<ScoringNetwork, ScoreError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut channels = 3;
        let backbone: Vec<Conv2d> = self
            .backbone
            .iter()
            .map(|c| {
                let layer = Conv2d::new(channels, c.out_channels, c.kernel, c.stride, c.activation, &mut rng);
                channels = c.out_channels;
                layer
            })
            .collect();
        let mut features = channels;
        let head: Vec<Dense> = self
            .head
            .iter()
            .map(|d| {
                let layer = Dense::new(d.size, features, d.activation, &mut rng);
                features = d.size;
                layer
            })
            .collect();

        let network = ScoringNetwork {
            input_size: self.input_size,
            backbone,
            head,
            metadata: self.metadata.clone(),
        };
        network.validate()?;
        Ok(network)
    }
}
