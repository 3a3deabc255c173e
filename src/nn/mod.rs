//! Neural network building blocks for the dynamics models.
//!
//! Organized around the [`Module`] trait:
//!
//! - **Layers**: [`Linear`]
//! - **Activations**: [`ReLU`], [`Softplus`]
//! - **Containers**: [`Sequential`], built by hand or with [`mlp`]
//! - **Losses**: [`loss::L1Loss`], [`loss::MSELoss`]
//! - **Optimizers**: [`optim::SGD`], [`optim::Adam`]
//! - **Message passing**: [`gnn::MessagePassing`]
//!
//! Every constructor that draws weights takes the caller's RNG, so a model
//! built from a seeded `StdRng` is fully reproducible.
//!
//! # Example
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use sdigraph::autograd::Tensor;
//! use sdigraph::nn::{mlp, MlpSpec, Module};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let head = mlp(&MlpSpec::new(&[3, 16, 16, 1]).normal(1e-3).softplus(), &mut rng);
//! let sigma = head.forward(&Tensor::zeros(&[10, 3]));
//! assert_eq!(sigma.shape(), &[10, 1]);
//! ```
//!
//! # References
//!
//! - Paszke, A., et al. (2019). `PyTorch`: An imperative style, high-performance
//!   deep learning library. `NeurIPS`.
//! - Kingma, D. P., & Ba, J. (2015). Adam: A method for stochastic optimization. ICLR.

mod activation;
mod container;
pub mod gnn;
pub mod init;
mod linear;
pub mod loss;
mod module;
pub mod optim;

pub use activation::{ReLU, Softplus};
pub use container::{mlp, MlpSpec, Sequential};
pub use init::LayerInit;
pub use linear::Linear;
pub use module::Module;
