use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::math::tensor::he_normal;

/// Fully connected layer.  `weights` is an `input_size × size` matrix stored
/// row-major, so the output is `x · W + b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub size: usize,
    pub input_size: usize,
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
    pub activation: ActivationFunction,
}

impl Dense {
    pub fn new(size: usize, input_size: usize, activation: ActivationFunction, rng: &mut StdRng) -> Dense {
        Dense {
            size,
            input_size,
            weights: he_normal(rng, input_size * size, input_size),
            biases: vec![0.0; size],
            activation,
        }
    }

    pub fn check(&self) -> Result<(), String> {
        if self.size == 0 || self.input_size == 0 {
            return Err("layer sizes must be non-zero".into());
        }
        if self.weights.len() != self.input_size * self.size {
            return Err(format!(
                "expected {} weights for {}->{}, found {}",
                self.input_size * self.size, self.input_size, self.size, self.weights.len()
            ));
        }
        if self.biases.len() != self.size {
            return Err(format!("expected {} biases, found {}", self.size, self.biases.len()));
        }
        Ok(())
    }

    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        debug_assert_eq!(input.len(), self.input_size);
        let mut out = self.biases.clone();
        for (i, &x) in input.iter().enumerate() {
            let row = &self.weights[i * self.size..(i + 1) * self.size];
            for (o, w) in out.iter_mut().zip(row) {
                *o += x * w;
            }
        }
        self.activation.apply_in_place(&mut out);
        out
    }
}
