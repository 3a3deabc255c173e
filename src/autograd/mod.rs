//! Reverse-mode automatic differentiation for the message-passing models.
//!
//! Tape-based, define-by-run: every differentiable op on a [`Tensor`] that
//! requires gradients records a [`GradFn`] to a thread-local
//! [`ComputationGraph`]; `backward()` replays the tape in reverse and stores
//! gradients on the leaf tensors (model parameters).
//!
//! # Example
//!
//! ```
//! use sdigraph::autograd::{clear_graph, get_grad, Tensor};
//!
//! let x = Tensor::from_slice(&[1.0, 2.0, 3.0]).requires_grad();
//! let w = Tensor::from_slice(&[0.5, 0.5, 0.5]);
//!
//! let y = x.mul(&w).sum();
//! y.backward();
//!
//! let grad = get_grad(x.id()).expect("x is a leaf that requires grad");
//! assert_eq!(grad.data(), &[0.5, 0.5, 0.5]);
//! clear_graph();
//! ```
//!
//! # References
//!
//! - Baydin, A. G., et al. (2018). Automatic differentiation in machine learning: a survey. JMLR.
//! - Griewank, A., & Walther, A. (2008). Evaluating derivatives. SIAM.

pub(crate) mod grad_fn;
mod graph;
mod ops;
mod tensor;

pub use grad_fn::GradFn;
pub use graph::ComputationGraph;
pub use ops::ScatterReduce;
pub use tensor::{Tensor, TensorId};

use std::cell::RefCell;

thread_local! {
    /// Computation graph for the current thread.
    static GRAPH: RefCell<ComputationGraph> = RefCell::new(ComputationGraph::new());

    /// Gradient tracking switch (off inside `no_grad`).
    static GRAD_ENABLED: RefCell<bool> = const { RefCell::new(true) };
}

/// Execute a closure without gradient tracking.
///
/// Used for inference accessors (sampling, averaging) so that rollouts do
/// not grow the tape.
///
/// ```
/// use sdigraph::autograd::{no_grad, Tensor};
///
/// let x = Tensor::from_slice(&[1.0, 2.0]).requires_grad();
/// let y = no_grad(|| x.mul(&x).sum());
/// assert!(!y.requires_grad_enabled());
/// ```
pub fn no_grad<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let prev = GRAD_ENABLED.with(|enabled| enabled.replace(false));
    let result = f();
    GRAD_ENABLED.with(|enabled| *enabled.borrow_mut() = prev);
    result
}

/// Check if gradient tracking is currently enabled.
#[must_use]
pub fn is_grad_enabled() -> bool {
    GRAD_ENABLED.with(|enabled| *enabled.borrow())
}

pub(crate) fn with_graph<F, R>(f: F) -> R
where
    F: FnOnce(&mut ComputationGraph) -> R,
{
    GRAPH.with(|graph| f(&mut graph.borrow_mut()))
}

/// Clear the computation graph. Call once per training step, after the
/// optimizer has consumed the gradients.
pub fn clear_graph() {
    GRAPH.with(|graph| graph.borrow_mut().clear());
}

/// Get gradient for a tensor by ID from the graph.
#[must_use]
pub fn get_grad(id: TensorId) -> Option<Tensor> {
    with_graph(|graph| graph.get_grad(id))
}

/// Clear gradient for a specific tensor by ID.
pub fn clear_grad(id: TensorId) {
    with_graph(|graph| graph.clear_grad(id));
}

/// Number of operations currently on this thread's tape.
#[must_use]
pub fn tape_len() -> usize {
    with_graph(|graph| graph.len())
}
