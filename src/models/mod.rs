//! Message-passing surrogates for stochastic network dynamics.
//!
//! Every model reads node states `x: [N × F]` whose first `ndim` columns
//! are the state variables, sends messages along the directed edges, and
//! turns the summed messages plus a node-local network into drifts that
//! an explicit Euler step integrates:
//!
//! ```text
//! dx/dt = f_x(x) + Σ_j m(x_i, x_j, w_ij)
//! dy/dt = f_y(x)
//! dz/dt = f_z(x)
//! update_k = x_k + Δt · d_k
//! ```
//!
//! Only x receives coupling input; y and z are node-local.
//!
//! | model | messages | output |
//! |---|---|---|
//! | [`SdiWeighted`] | weight-scaled | per-node Gaussians around the Euler means |
//! | [`WNeuG`] | weight as feature | `[updates…, drifts…]` |
//! | [`SwNeuG`] | weight-scaled | `[updates…, drifts…]`, pure coupling for ndim 1 |
//! | [`InwNeuG`] | weight-gated | drift scaled per horizon, one row per graph |

mod inwneug;
mod messages;
mod sdi_weighted;
mod swneug;
mod wneug;

use rand::Rng;

use crate::autograd::Tensor;
use crate::config::{ModelConfig, Residual};
use crate::error::{Result, SdiError};
use crate::graph::{EdgeTypeWeights, GraphSample};
use crate::nn::init::standard_normal;
use crate::nn::loss::{L1Loss, MSELoss, Reduction};
use crate::nn::{Module, Sequential};

pub use inwneug::InwNeuG;
pub use messages::{WeightFeatureMessage, WeightGatedMessage, WeightScaledMessage};
pub use sdi_weighted::{SdiOutput, SdiWeighted};
pub use swneug::SwNeuG;
pub use wneug::WNeuG;

/// Operations shared by all model families.
pub trait DynamicsModel {
    /// Configuration the model was built from.
    fn config(&self) -> &ModelConfig;

    /// Scalar training loss against `g.y`.
    ///
    /// # Errors
    ///
    /// Returns `MissingTarget` without targets, or a dimension error when
    /// the graph does not fit the model.
    fn loss(&self, g: &GraphSample) -> Result<Tensor>;

    /// Deterministic next-state estimates, one tensor per state variable.
    ///
    /// # Errors
    ///
    /// Returns a dimension error when the graph does not fit the model.
    fn average_trajectories(&self, g: &GraphSample) -> Result<Vec<Tensor>>;

    /// Learnable parameters in a stable order.
    fn parameters(&self) -> Vec<&Tensor>;

    /// Mutable learnable parameters, same order as [`DynamicsModel::parameters`].
    fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

    /// Total number of scalar parameters.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }
}

/// Add one N(0, 1)·`scale` offset per state variable to that column of every node.
///
/// Columns beyond `ndim` are left untouched.
pub fn augment<R: Rng + ?Sized>(x: &Tensor, ndim: usize, scale: f32, rng: &mut R) -> Tensor {
    let (rows, cols) = x.dims2();
    let offsets: Vec<f32> = (0..ndim.min(cols))
        .map(|_| standard_normal(rng) * scale)
        .collect();

    let mut data = vec![0.0; rows * cols];
    for row in data.chunks_mut(cols) {
        row[..offsets.len()].copy_from_slice(&offsets);
    }
    x.add(&Tensor::from_vec(data, &[rows, cols]))
}

/// Validate a graph against the model's configuration and tile the edge weights.
pub(crate) fn prepare(
    config: &ModelConfig,
    weights: &EdgeTypeWeights,
    g: &GraphSample,
) -> Result<Tensor> {
    g.validate()?;
    if g.num_features() != config.node_features {
        return Err(SdiError::dimension_mismatch(
            "node_features",
            config.node_features,
            g.num_features(),
        ));
    }
    weights.tile(g.edge_index.num_edges())
}

/// Check that the edge-type block carries at least `channels` weights.
pub(crate) fn require_channels(weights: &EdgeTypeWeights, channels: usize) -> Result<()> {
    if weights.channels() < channels {
        return Err(SdiError::invalid_hyperparameter(
            "edge_type_weights channels",
            weights.channels(),
            &format!(">= {channels}"),
        ));
    }
    Ok(())
}

/// Target matrix with at least `columns` columns.
pub(crate) fn target_columns(g: &GraphSample, columns: usize) -> Result<&Tensor> {
    let y = g.target()?;
    let width = y.shape()[1];
    if width < columns {
        return Err(SdiError::dimension_mismatch("target columns", columns, width));
    }
    Ok(y)
}

/// Explicit Euler step: `x + Δt · drift`.
pub(crate) fn euler(x: &Tensor, drift: &Tensor, delta_t: f32) -> Tensor {
    x.add(&drift.mul_scalar(delta_t))
}

/// Summed residual between `target` and `pred`.
pub(crate) fn residual_loss(residual: Residual, pred: &Tensor, target: &Tensor) -> Tensor {
    match residual {
        Residual::Absolute => L1Loss::with_reduction(Reduction::Sum).forward(pred, target),
        Residual::Squared => MSELoss::with_reduction(Reduction::Sum).forward(pred, target),
    }
}

/// Parameters of a list of networks, in order.
pub(crate) fn collect_parameters<'a>(nets: impl IntoIterator<Item = &'a Sequential>) -> Vec<&'a Tensor> {
    nets.into_iter().flat_map(Module::parameters).collect()
}

/// Mutable parameters of a list of networks, in order.
pub(crate) fn collect_parameters_mut<'a>(
    nets: impl IntoIterator<Item = &'a mut Sequential>,
) -> Vec<&'a mut Tensor> {
    nets.into_iter().flat_map(Module::parameters_mut).collect()
}

/// Drifts for every state variable; x also receives the aggregated messages.
pub(crate) fn drifts(nets: &[Sequential], x: &Tensor, aggr: &Tensor) -> Vec<Tensor> {
    nets.iter()
        .enumerate()
        .map(|(k, net)| {
            let f = net.forward(x);
            if k == 0 {
                f.add(aggr)
            } else {
                f
            }
        })
        .collect()
}

/// Euler updates of every state column given its drift.
pub(crate) fn updates(x: &Tensor, drifts: &[Tensor], delta_t: f32) -> Vec<Tensor> {
    drifts
        .iter()
        .enumerate()
        .map(|(k, d)| euler(&x.column(k), d, delta_t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeIndex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_augment_shifts_state_columns_only() {
        let x = Tensor::new(&[1.0, 2.0, 5.0, 3.0, 4.0, 5.0], &[2, 3]);
        let out = augment(&x, 2, 3.0, &mut StdRng::seed_from_u64(0));
        let d = out.data();

        // same offset for every node, feature column untouched
        assert!((d[0] - 1.0 - (d[3] - 3.0)).abs() < 1e-5);
        assert!((d[1] - 2.0 - (d[4] - 4.0)).abs() < 1e-5);
        assert_eq!(d[2], 5.0);
        assert_eq!(d[5], 5.0);
        assert!((d[0] - 1.0).abs() > 0.0);
    }

    #[test]
    fn test_augment_zero_scale_is_identity() {
        let x = Tensor::new(&[1.0, 2.0], &[2, 1]);
        let out = augment(&x, 1, 0.0, &mut StdRng::seed_from_u64(0));
        assert_eq!(out.data(), x.data());
    }

    #[test]
    fn test_prepare_checks_features_and_tiling() {
        let config = ModelConfig::default();
        let weights = EdgeTypeWeights::new(vec![1.0, 0.5], 1, 2).expect("block");
        let g = GraphSample::new(Tensor::zeros(&[2, 1]), EdgeIndex::from_pairs(&[[0, 1], [1, 0]]))
            .expect("graph");
        assert_eq!(prepare(&config, &weights, &g).expect("tiled").shape(), &[2, 2]);

        let wide = GraphSample::new(Tensor::zeros(&[2, 2]), EdgeIndex::default()).expect("graph");
        assert!(matches!(
            prepare(&config, &weights, &wide),
            Err(SdiError::DimensionMismatch { .. })
        ));

        let two_types = EdgeTypeWeights::new(vec![1.0, 0.5, 1.0, 0.5], 2, 2).expect("block");
        let odd = GraphSample::new(Tensor::zeros(&[2, 1]), EdgeIndex::from_pairs(&[[0, 1]]))
            .expect("graph");
        assert!(matches!(
            prepare(&config, &two_types, &odd),
            Err(SdiError::EdgeWeightTiling { .. })
        ));
    }

    #[test]
    fn test_euler_exact() {
        let x = Tensor::new(&[1.0, -2.0], &[2, 1]);
        let d = Tensor::new(&[0.5, 4.0], &[2, 1]);
        let out = euler(&x, &d, 0.1);
        assert!((out.data()[0] - 1.05).abs() < 1e-6);
        assert!((out.data()[1] + 1.6).abs() < 1e-6);
    }

    #[test]
    fn test_residual_losses() {
        let pred = Tensor::new(&[1.0, 2.0], &[2, 1]);
        let target = Tensor::new(&[0.0, 4.0], &[2, 1]);
        assert!((residual_loss(Residual::Absolute, &pred, &target).item() - 3.0).abs() < 1e-6);
        assert!((residual_loss(Residual::Squared, &pred, &target).item() - 5.0).abs() < 1e-6);
    }
}
