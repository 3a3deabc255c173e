//! Message passing over directed graphs.
//!
//! A layer implements [`MessagePassing`] by supplying a per-edge
//! `message` and, optionally, a per-node `update`. The provided
//! [`MessagePassing::propagate`] gathers endpoint states, evaluates
//! messages for every edge in one batched call, and reduces them onto
//! their receiving nodes.
//!
//! With [`Flow::SourceToTarget`] an edge `(j, i)` carries information from
//! `x_j` to `x_i`: `x_i` is the receiver's state and `x_j` the sender's.
//!
//! # References
//!
//! - Gilmer, J., et al. (2017). Neural Message Passing for Quantum
//!   Chemistry. ICML.
//! - Fey, M., & Lenssen, J. E. (2019). Fast Graph Representation Learning
//!   with `PyTorch` Geometric.

mod message_passing;

pub use message_passing::{Aggregation, Flow, MessagePassing};
