use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::math::tensor::{he_normal, Tensor3};

/// 2-D convolution over an HWC tensor with zero padding of `kernel / 2`.
///
/// Weights are laid out `[out_channel][ky][kx][in_channel]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv2d {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel: usize,
    pub stride: usize,
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
    pub activation: ActivationFunction,
}

impl Conv2d {
    /// He-initialized convolution drawn from `rng`.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        activation: ActivationFunction,
        rng: &mut StdRng,
    ) -> Conv2d {
        let fan_in = kernel * kernel * in_channels;
        Conv2d {
            in_channels,
            out_channels,
            kernel,
            stride,
            weights: he_normal(rng, out_channels * fan_in, fan_in),
            biases: vec![0.0; out_channels],
            activation,
        }
    }

    pub fn padding(&self) -> usize {
        self.kernel / 2
    }

    /// Spatial output size for an input side of `side`.
    pub fn output_side(&self, side: usize) -> usize {
        (side + 2 * self.padding()).saturating_sub(self.kernel) / self.stride + 1
    }

    /// Checks the layer's internal consistency; returns a description of the
    /// first problem found.
    pub fn check(&self) -> Result<(), String> {
        if self.kernel == 0 || self.kernel % 2 == 0 {
            return Err(format!("kernel must be odd and non-zero, got {}", self.kernel));
        }
        if self.stride == 0 {
            return Err("stride must be at least 1".into());
        }
        if self.in_channels == 0 || self.out_channels == 0 {
            return Err("channel counts must be non-zero".into());
        }
        let expected = self.out_channels * self.kernel * self.kernel * self.in_channels;
        if self.weights.len() != expected {
            return Err(format!(
                "expected {} weights for {}x{}x{}->{}, found {}",
                expected, self.kernel, self.kernel, self.in_channels, self.out_channels,
                self.weights.len()
            ));
        }
        if self.biases.len() != self.out_channels {
            return Err(format!(
                "expected {} biases, found {}", self.out_channels, self.biases.len()
            ));
        }
        Ok(())
    }

    pub fn forward(&self, input: &Tensor3) -> Tensor3 {
        debug_assert_eq!(input.channels, self.in_channels);
        let pad = self.padding() as isize;
        let k = self.kernel;
        let out_h = self.output_side(input.height);
        let out_w = self.output_side(input.width);
        let mut out = Tensor3::zeros(out_h, out_w, self.out_channels);

        for oy in 0..out_h {
            for ox in 0..out_w {
                let base_y = (oy * self.stride) as isize - pad;
                let base_x = (ox * self.stride) as isize - pad;
                for oc in 0..self.out_channels {
                    let mut sum = self.biases[oc];
                    let w_oc = &self.weights[oc * k * k * self.in_channels..];
                    for ky in 0..k {
                        let iy = base_y + ky as isize;
                        if iy < 0 || iy >= input.height as isize {
                            continue;
                        }
                        for kx in 0..k {
                            let ix = base_x + kx as isize;
                            if ix < 0 || ix >= input.width as isize {
                                continue;
                            }
                            let px = input.pixel(iy as usize, ix as usize);
                            let w = &w_oc[(ky * k + kx) * self.in_channels..][..self.in_channels];
                            sum += px.iter().zip(w).map(|(a, b)| a * b).sum::<f32>();
                        }
                    }
                    let idx = out.index(oy, ox, oc);
                    out.data[idx] = self.activation.function(sum);
                }
            }
        }
        out
    }
}
