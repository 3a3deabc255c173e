//! Sdigraph: message-passing surrogates for stochastic dynamics on weighted networks.
//!
//! Models read a graph of node states, send learned messages along its
//! directed edges, and predict per-node drifts, Euler next states, or
//! Gaussian next-state distributions. They are trained by gradient
//! descent against simulation data.
//!
//! # Quick Start
//!
//! ```
//! use sdigraph::prelude::*;
//!
//! let config = ModelConfig::default().with_hidden(8).with_delta_t(0.01);
//! let weights = EdgeTypeWeights::new(vec![1.0, 0.0, 0.0, 1.0], 2, 2).unwrap();
//! let mut model = SdiWeighted::new(config, weights).unwrap();
//!
//! // y[:, 0] is the next state, y[:, 1] the observed drift
//! let g = GraphSample::new(
//!     Tensor::new(&[0.2, -0.1, 0.4, 0.0], &[4, 1]),
//!     EdgeIndex::from_pairs(&[[0, 1], [1, 2], [2, 3], [3, 0]]),
//! )
//! .unwrap()
//! .with_target(Tensor::new(&[0.21, 0.5, -0.09, 0.3, 0.39, -0.4, 0.0, 0.1], &[4, 2]))
//! .unwrap();
//!
//! let mut optimizer = Adam::new(model.parameters_mut(), 1e-3);
//! let loss = model.loss(&g).unwrap();
//! loss.backward();
//! optimizer.step_with_params(&mut model.parameters_mut());
//! clear_graph();
//! ```
//!
//! # Modules
//!
//! - [`autograd`]: Tensors with tape-based reverse-mode differentiation
//! - [`nn`]: Layers, MLP stacks, losses, optimizers, message passing
//! - [`graph`]: Edge lists, edge-type weights, graph samples and batching
//! - [`distributions`]: Per-node Gaussian predictive distributions
//! - [`models`]: `SdiWeighted`, `WNeuG`, `SwNeuG`, `InwNeuG`
//! - [`config`]: Model configuration and JSON loading
//! - [`error`]: Error type

pub mod autograd;
pub mod config;
pub mod distributions;
pub mod error;
pub mod graph;
pub mod models;
pub mod nn;
pub mod prelude;

pub use error::{Result, SdiError};
