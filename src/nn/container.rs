//! Container modules for composing neural networks.

use rand::Rng;

use super::activation::{ReLU, Softplus};
use super::init::LayerInit;
use super::linear::Linear;
use super::module::Module;
use crate::autograd::Tensor;

/// Sequential container for chaining modules.
///
/// Modules are executed in order, with each module's output
/// becoming the next module's input.
///
/// # Example
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use sdigraph::autograd::Tensor;
/// use sdigraph::nn::{Linear, Module, ReLU, Sequential};
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let model = Sequential::new()
///     .add(Linear::new(2, 16, &mut rng))
///     .add(ReLU::new())
///     .add(Linear::new(16, 1, &mut rng));
///
/// assert_eq!(model.forward(&Tensor::zeros(&[4, 2])).shape(), &[4, 1]);
/// ```
pub struct Sequential {
    modules: Vec<Box<dyn Module>>,
}

impl Sequential {
    /// Create an empty Sequential container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Add a module to the sequence.
    ///
    /// Returns self for method chaining.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn add<M: Module + 'static>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Get the number of modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for Sequential {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for Sequential {
    fn forward(&self, input: &Tensor) -> Tensor {
        self.modules
            .iter()
            .fold(input.clone(), |x, module| module.forward(&x))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.modules.iter().flat_map(|m| m.parameters()).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.modules
            .iter_mut()
            .flat_map(|m| m.parameters_mut())
            .collect()
    }
}

impl std::fmt::Debug for Sequential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequential")
            .field("num_modules", &self.modules.len())
            .finish()
    }
}

/// Layer widths and head for an [`mlp`] stack.
#[derive(Debug, Clone, PartialEq)]
pub struct MlpSpec {
    /// `[in, hidden.., out]`, at least two entries
    pub widths: Vec<usize>,
    /// Weight initialization shared by every `Linear`
    pub init: LayerInit,
    /// Append a `Softplus` after the last layer
    pub softplus_head: bool,
}

impl MlpSpec {
    /// Plain stack with default initialization and no head.
    #[must_use]
    pub fn new(widths: &[usize]) -> Self {
        Self {
            widths: widths.to_vec(),
            init: LayerInit::Default,
            softplus_head: false,
        }
    }

    /// Draw weights from N(0, std).
    #[must_use]
    pub fn normal(mut self, std: f32) -> Self {
        self.init = LayerInit::Normal { std };
        self
    }

    /// End the stack with a `Softplus`.
    #[must_use]
    pub fn softplus(mut self) -> Self {
        self.softplus_head = true;
        self
    }
}

/// Build `Linear → (ReLU → Linear)*`, optionally closed by `Softplus`.
///
/// # Panics
///
/// Panics if `spec.widths` has fewer than two entries.
pub fn mlp<R: Rng + ?Sized>(spec: &MlpSpec, rng: &mut R) -> Sequential {
    assert!(spec.widths.len() >= 2, "mlp needs at least input and output widths");

    let mut seq = Sequential::new();
    for (i, pair) in spec.widths.windows(2).enumerate() {
        if i > 0 {
            seq = seq.add(ReLU::new());
        }
        seq = seq.add(Linear::with_init(pair[0], pair[1], spec.init, rng));
    }
    if spec.softplus_head {
        seq = seq.add(Softplus::new());
    }
    seq
}
