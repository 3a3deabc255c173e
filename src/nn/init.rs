//! Weight initialization functions.
//!
//! Every draw goes through a caller-provided RNG so that a whole model is
//! reproducible from one seed.
//!
//! - `default_uniform` matches the PyTorch `nn.Linear` default,
//!   U(-1/√fan_in, 1/√fan_in), for weights and biases.
//! - `normal` gives N(mean, std), used for the small per-component weight
//!   scales of the dynamics models (std 1e-1 down to 1e-4).

use crate::autograd::Tensor;
use rand::Rng;

/// Initialization scheme for a [`super::Linear`] layer's weight.
///
/// Biases always use the default uniform scheme.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LayerInit {
    /// U(-1/√fan_in, 1/√fan_in)
    #[default]
    Default,
    /// N(0, std)
    Normal {
        /// Standard deviation of the weight draw
        std: f32,
    },
}

/// PyTorch's default `Linear` initialization bound for a given fan-in.
#[must_use]
pub fn default_bound(fan_in: usize) -> f32 {
    if fan_in == 0 {
        0.0
    } else {
        1.0 / (fan_in as f32).sqrt()
    }
}

/// Default uniform initialization, U(-1/√fan_in, 1/√fan_in).
pub fn default_uniform<R: Rng + ?Sized>(shape: &[usize], fan_in: usize, rng: &mut R) -> Tensor {
    let bound = default_bound(fan_in);
    uniform(shape, -bound, bound, rng)
}

/// Uniform distribution initialization, U(low, high).
pub fn uniform<R: Rng + ?Sized>(shape: &[usize], low: f32, high: f32, rng: &mut R) -> Tensor {
    let numel: usize = shape.iter().product();
    let data: Vec<f32> = if high > low {
        (0..numel).map(|_| rng.gen_range(low..high)).collect()
    } else {
        vec![low; numel]
    };

    Tensor::from_vec(data, shape)
}

/// Normal distribution initialization, N(mean, std).
pub fn normal<R: Rng + ?Sized>(shape: &[usize], mean: f32, std: f32, rng: &mut R) -> Tensor {
    let numel: usize = shape.iter().product();
    let data: Vec<f32> = (0..numel).map(|_| mean + std * standard_normal(rng)).collect();

    Tensor::from_vec(data, shape)
}

/// One N(0, 1) draw via the Box–Muller transform.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen_range(f32::MIN_POSITIVE..1.0_f32);
    let u2: f32 = rng.gen_range(0.0_f32..1.0_f32);
    (-2.0_f32 * u1.ln()).sqrt() * (2.0_f32 * std::f32::consts::PI * u2).cos()
}
