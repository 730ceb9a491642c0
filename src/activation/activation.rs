use serde::{Serialize, Deserialize};
use std::f32::consts::PI;

/// Element-wise non-linearity applied after a layer's linear transform.
///
/// The scorer is inference-only, so there are no derivatives here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Identity,
    ReLU,
    LeakyReLU { alpha: f32 },
    Sigmoid,
    Tanh,
    Elu { alpha: f32 },
    Gelu,
    Swish,
}

impl ActivationFunction {
    pub fn function(&self, x: f32) -> f32 {
        match self {
            ActivationFunction::Identity => x,
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
            ActivationFunction::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { x } else { alpha * (x.exp() - 1.0) }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f32 / PI).sqrt();
                0.5 * x * (1.0 + (c * (x + 0.044715 * x.powi(3))).tanh())
            }
            ActivationFunction::Swish => x / (1.0 + (-x).exp()),
        }
    }

    /// Applies the activation to every element of `values` in place.
    pub fn apply_in_place(&self, values: &mut [f32]) {
        if *self == ActivationFunction::Identity {
            return;
        }
        for v in values.iter_mut() {
            *v = self.function(*v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relu_family() {
        assert_eq!(ActivationFunction::ReLU.function(-2.0), 0.0);
        assert_eq!(ActivationFunction::ReLU.function(1.5), 1.5);
        assert_eq!(ActivationFunction::LeakyReLU { alpha: 0.1 }.function(-2.0), -0.2);
    }

    #[test]
    fn sigmoid_midpoint() {
        assert!((ActivationFunction::Sigmoid.function(0.0) - 0.5).abs() < 1e-7);
    }

    #[test]
    fn activation_round_trips_through_json() {
        let act = ActivationFunction::Elu { alpha: 1.0 };
        let json = serde_json::to_string(&act).unwrap();
        let back: ActivationFunction = serde_json::from_str(&json).unwrap();
        assert_eq!(act, back);
    }
}
