//! The `Module` trait shared by all layers.

use crate::autograd::Tensor;

/// A differentiable building block with learnable parameters.
///
/// Parameters are returned in a stable order; optimizers rely on that
/// order to keep per-parameter state aligned across steps.
pub trait Module {
    /// Forward pass.
    fn forward(&self, input: &Tensor) -> Tensor;

    /// Learnable parameters.
    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    /// Mutable learnable parameters, same order as [`Module::parameters`].
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }

    /// Total number of scalar parameters.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }
}
