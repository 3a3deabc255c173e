//! Fully connected (linear) layer.
//!
//! Implements the transformation y = xWᵀ + b.

use rand::Rng;

use super::init::{default_uniform, normal, LayerInit};
use super::module::Module;
use crate::autograd::Tensor;

/// Fully connected layer: y = xWᵀ + b
///
/// # Shape
///
/// - Input: `(N, in_features)`
/// - Output: `(N, out_features)`
///
/// # Example
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use sdigraph::autograd::Tensor;
/// use sdigraph::nn::{LayerInit, Linear, Module};
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let layer = Linear::with_init(3, 8, LayerInit::Normal { std: 0.1 }, &mut rng);
/// let out = layer.forward(&Tensor::ones(&[5, 3]));
/// assert_eq!(out.shape(), &[5, 8]);
/// ```
pub struct Linear {
    /// Weight matrix, shape: [out_features, in_features]
    weight: Tensor,

    /// Bias vector, shape: [out_features]
    bias: Tensor,

    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Create a Linear layer with the default initialization.
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        Self::with_init(in_features, out_features, LayerInit::Default, rng)
    }

    /// Create a Linear layer with an explicit weight initialization.
    pub fn with_init<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        init: LayerInit,
        rng: &mut R,
    ) -> Self {
        let shape = [out_features, in_features];
        let weight = match init {
            LayerInit::Default => default_uniform(&shape, in_features, rng),
            LayerInit::Normal { std } => normal(&shape, 0.0, std, rng),
        }
        .requires_grad();
        let bias = default_uniform(&[out_features], in_features, rng).requires_grad();

        Self {
            weight,
            bias,
            in_features,
            out_features,
        }
    }

    /// Get the input feature dimension.
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Get the output feature dimension.
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Replace the weight matrix, keeping gradient tracking on.
    ///
    /// # Panics
    ///
    /// Panics if the shape differs from `[out_features, in_features]`.
    pub fn set_weight(&mut self, weight: Tensor) {
        assert_eq!(
            weight.shape(),
            &[self.out_features, self.in_features],
            "set_weight: wrong shape"
        );
        self.weight = weight.requires_grad();
    }

    /// Replace the bias vector, keeping gradient tracking on.
    ///
    /// # Panics
    ///
    /// Panics if the shape differs from `[out_features]`.
    pub fn set_bias(&mut self, bias: Tensor) {
        assert_eq!(bias.shape(), &[self.out_features], "set_bias: wrong shape");
        self.bias = bias.requires_grad();
    }

    /// Get reference to weight tensor.
    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    /// Get reference to bias tensor.
    pub fn bias(&self) -> &Tensor {
        &self.bias
    }
}

impl Module for Linear {
    fn forward(&self, input: &Tensor) -> Tensor {
        // transpose per call so the gradient reaches `weight` itself
        input
            .matmul(&self.weight.transpose())
            .broadcast_add(&self.bias)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weight, &mut self.bias]
    }
}

impl std::fmt::Debug for Linear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linear")
            .field("in_features", &self.in_features)
            .field("out_features", &self.out_features)
            .finish_non_exhaustive()
    }
}
