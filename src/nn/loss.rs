//! Differentiable regression losses.
//!
//! The dynamics models mostly sum their residuals; `Reduction::Sum` is
//! therefore as common here as the conventional mean.
//!
//! # Example
//!
//! ```
//! use sdigraph::autograd::Tensor;
//! use sdigraph::nn::loss::{L1Loss, Reduction};
//!
//! let pred = Tensor::from_slice(&[1.0, 2.0, 3.0]).requires_grad();
//! let target = Tensor::from_slice(&[1.5, 2.0, 2.0]);
//! let loss = L1Loss::with_reduction(Reduction::Sum).forward(&pred, &target);
//! assert!((loss.item() - 1.5).abs() < 1e-6);
//! ```

use crate::autograd::Tensor;

/// Reduction mode for loss functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reduction {
    /// Return loss per element (no reduction)
    None,
    /// Return mean of losses (default)
    #[default]
    Mean,
    /// Return sum of losses
    Sum,
}

impl Reduction {
    /// Reduce a per-element loss tensor.
    #[must_use]
    pub fn apply(self, losses: Tensor) -> Tensor {
        match self {
            Reduction::None => losses,
            Reduction::Mean => losses.mean(),
            Reduction::Sum => losses.sum(),
        }
    }
}

/// Squared error loss: reduce((pred - target)²).
#[derive(Debug, Clone, Copy, Default)]
pub struct MSELoss {
    reduction: Reduction,
}

impl MSELoss {
    /// Create a new MSELoss with mean reduction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create MSELoss with specified reduction.
    #[must_use]
    pub fn with_reduction(reduction: Reduction) -> Self {
        Self { reduction }
    }

    /// Compute the loss.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn forward(&self, pred: &Tensor, target: &Tensor) -> Tensor {
        assert_eq!(
            pred.shape(),
            target.shape(),
            "Prediction and target shapes must match"
        );
        self.reduction.apply(pred.sub(target).pow(2.0))
    }
}

/// Absolute error loss: reduce(|pred - target|).
#[derive(Debug, Clone, Copy, Default)]
pub struct L1Loss {
    reduction: Reduction,
}

impl L1Loss {
    /// Create a new L1Loss with mean reduction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create L1Loss with specified reduction.
    #[must_use]
    pub fn with_reduction(reduction: Reduction) -> Self {
        Self { reduction }
    }

    /// Compute the loss.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn forward(&self, pred: &Tensor, target: &Tensor) -> Tensor {
        assert_eq!(
            pred.shape(),
            target.shape(),
            "Prediction and target shapes must match"
        );
        self.reduction.apply(pred.sub(target).abs())
    }
}
