use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// A dense height × width × channels array of `f32`, stored row-major with
/// channels innermost (HWC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor3 {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub data: Vec<f32>,
}

impl Tensor3 {
    pub fn zeros(height: usize, width: usize, channels: usize) -> Tensor3 {
        Tensor3 {
            height,
            width,
            channels,
            data: vec![0.0; height * width * channels],
        }
    }

    /// Wraps an existing HWC buffer.  Returns `None` if the length does not
    /// match the shape.
    pub fn from_data(height: usize, width: usize, channels: usize, data: Vec<f32>) -> Option<Tensor3> {
        if data.len() != height * width * channels {
            return None;
        }
        Some(Tensor3 { height, width, channels, data })
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }

    #[inline]
    pub fn index(&self, y: usize, x: usize, c: usize) -> usize {
        (y * self.width + x) * self.channels + c
    }

    /// The channel vector at one spatial position.
    pub fn pixel(&self, y: usize, x: usize) -> &[f32] {
        let start = self.index(y, x, 0);
        &self.data[start..start + self.channels]
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

// ---------------------------------------------------------------------------
// Weight initialization
// ---------------------------------------------------------------------------

/// Samples a single value from N(0, 1) using the Box-Muller transform.
fn sample_standard_normal(rng: &mut StdRng) -> f32 {
    // Uniform on (0, 1] to avoid log(0).
    let u1: f32 = 1.0 - rng.gen::<f32>();
    let u2: f32 = 1.0 - rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// He initialization: `len` samples from N(0, sqrt(2 / fan_in)).
///
/// Suited to layers followed by ReLU, which zeroes half of its inputs on
/// average.
pub fn he_normal(rng: &mut StdRng, len: usize, fan_in: usize) -> Vec<f32> {
    let std_dev = (2.0 / fan_in.max(1) as f32).sqrt();
    (0..len).map(|_| sample_standard_normal(rng) * std_dev).collect()
}
