//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use sdigraph::prelude::*;
//! ```

pub use crate::autograd::{clear_graph, get_grad, no_grad, Tensor};
pub use crate::config::{Dynamics, ModelConfig, Residual, StateDim};
pub use crate::distributions::Normal;
pub use crate::error::{Result, SdiError};
pub use crate::graph::{EdgeIndex, EdgeTypeWeights, GraphSample};
pub use crate::models::{DynamicsModel, InwNeuG, SdiWeighted, SwNeuG, WNeuG};
pub use crate::nn::gnn::{Aggregation, Flow, MessagePassing};
pub use crate::nn::optim::{Adam, Optimizer, SGD};
pub use crate::nn::Module;
