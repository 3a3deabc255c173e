//! Activation function modules.
//!
//! These wrap tensor activations for use in [`super::Sequential`] stacks.

use super::module::Module;
use crate::autograd::Tensor;

/// Rectified Linear Unit activation: ReLU(x) = max(0, x)
///
/// ```
/// use sdigraph::autograd::Tensor;
/// use sdigraph::nn::{Module, ReLU};
///
/// let y = ReLU::new().forward(&Tensor::from_slice(&[-1.0, 0.0, 2.0]));
/// assert_eq!(y.data(), &[0.0, 0.0, 2.0]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ReLU;

impl ReLU {
    /// Create a new ReLU activation.
    pub fn new() -> Self {
        Self
    }
}

impl Module for ReLU {
    fn forward(&self, input: &Tensor) -> Tensor {
        input.relu()
    }
}

/// Softplus activation: ln(1 + eˣ).
///
/// Strictly positive output; used as the head of the variance networks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Softplus;

impl Softplus {
    /// Create a new Softplus activation.
    pub fn new() -> Self {
        Self
    }
}

impl Module for Softplus {
    fn forward(&self, input: &Tensor) -> Tensor {
        input.softplus()
    }
}
