//! Deterministic surrogate with weight-scaled messages.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::messages::WeightScaledMessage;
use super::wneug::node_spec;
use super::{
    augment, collect_parameters, collect_parameters_mut, drifts, prepare, require_channels,
    residual_loss, target_columns, updates, DynamicsModel,
};
use crate::autograd::{no_grad, Tensor};
use crate::config::{ModelConfig, StateDim};
use crate::error::Result;
use crate::graph::{EdgeTypeWeights, GraphSample};
use crate::nn::gnn::MessagePassing;
use crate::nn::{mlp, Sequential};

/// Scaled-weight neural graph.
///
/// For one state variable the drift is the coupling alone,
/// `dx/dt = Σ_j m(x_i, x_j, w_ij)`, and `prediction` is
/// `[Δt · dx/dt, dx/dt]`: the first column is the increment, not the next
/// state. For two or three variables it matches [`super::WNeuG`]'s
/// `[updates…, drifts…]` layout with node-local drift networks.
pub struct SwNeuG {
    config: ModelConfig,
    weights: EdgeTypeWeights,
    messages: WeightScaledMessage,
    /// Empty for one state variable
    node: Vec<Sequential>,
}

impl SwNeuG {
    /// Build the model, drawing all weights from `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` for an invalid config or an
    /// edge-type block with fewer than two weight channels.
    pub fn new(config: ModelConfig, weights: EdgeTypeWeights) -> Result<Self> {
        config.validate()?;
        require_channels(&weights, 2)?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let (f, h) = (config.node_features, config.hidden);
        let messages = WeightScaledMessage::new(h, None, config.aggregation, config.flow, &mut rng);
        let node = match config.ndim {
            StateDim::One => Vec::new(),
            ndim => (0..ndim.count())
                .map(|k| mlp(&node_spec(k, f, h), &mut rng))
                .collect(),
        };

        let model = Self {
            config,
            weights,
            messages,
            node,
        };
        debug!(
            ndim = model.config.ndim.count(),
            num_parameters = model.num_parameters(),
            "built SwNeuG"
        );
        Ok(model)
    }

    /// Per-node prediction; see the type docs for the column layout.
    ///
    /// # Errors
    ///
    /// Returns a dimension error when the graph does not fit the model.
    pub fn prediction(&self, g: &GraphSample) -> Result<Tensor> {
        let w = prepare(&self.config, &self.weights, g)?;
        Ok(self.step(&g.x, g, &w))
    }

    /// [`SwNeuG::prediction`] from randomly shifted node states.
    ///
    /// # Errors
    ///
    /// As [`SwNeuG::prediction`].
    pub fn prediction_augmented<R: Rng + ?Sized>(
        &self,
        g: &GraphSample,
        rng: &mut R,
    ) -> Result<Tensor> {
        let w = prepare(&self.config, &self.weights, g)?;
        let x = augment(&g.x, self.config.ndim.count(), self.config.augmentation, rng);
        Ok(self.step(&x, g, &w))
    }

    fn step(&self, x: &Tensor, g: &GraphSample, w: &Tensor) -> Tensor {
        let aggr = self.messages.propagate(x, &g.edge_index, Some(w));
        if self.node.is_empty() {
            let increment = aggr.mul_scalar(self.config.delta_t);
            return Tensor::cat_cols(&[&increment, &aggr]);
        }
        let drifts = drifts(&self.node, x, &aggr);
        let updates = updates(x, &drifts, self.config.delta_t);
        let columns: Vec<&Tensor> = updates.iter().chain(&drifts).collect();
        Tensor::cat_cols(&columns)
    }
}

impl DynamicsModel for SwNeuG {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Residual on the first column only.
    fn loss(&self, g: &GraphSample) -> Result<Tensor> {
        let y = target_columns(g, 1)?;
        let pred = self.prediction(g)?;
        let loss = residual_loss(self.config.residual, &pred.column(0), &y.column(0));
        debug!(loss = loss.item(), "SwNeuG loss");
        Ok(loss)
    }

    /// For one state variable this is the increment column.
    fn average_trajectories(&self, g: &GraphSample) -> Result<Vec<Tensor>> {
        no_grad(|| -> Result<Vec<Tensor>> {
            let pred = self.prediction(g)?;
            Ok((0..self.config.ndim.count()).map(|k| pred.column(k)).collect())
        })
    }

    fn parameters(&self) -> Vec<&Tensor> {
        collect_parameters(self.messages.nets().into_iter().chain(&self.node))
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        collect_parameters_mut(self.messages.nets_mut().into_iter().chain(&mut self.node))
    }
}

impl std::fmt::Debug for SwNeuG {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwNeuG")
            .field("ndim", &self.config.ndim)
            .field("hidden", &self.config.hidden)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{clear_graph, tape_len};
    use crate::config::Residual;
    use crate::error::SdiError;
    use crate::graph::EdgeIndex;

    fn star() -> GraphSample {
        GraphSample::new(
            Tensor::new(&[0.5, -0.1, 0.2, 0.9], &[4, 1]),
            EdgeIndex::from_pairs(&[[1, 0], [2, 0], [3, 0]]),
        )
        .expect("graph")
    }

    fn weights() -> EdgeTypeWeights {
        EdgeTypeWeights::new(vec![1.0, 0.0], 1, 2).expect("weights")
    }

    #[test]
    fn test_one_dim_is_pure_coupling() {
        let config = ModelConfig::default().with_hidden(4).with_delta_t(0.1);
        let model = SwNeuG::new(config, weights()).expect("model");
        let pred = model.prediction(&star()).expect("prediction");

        assert_eq!(pred.shape(), &[4, 2]);
        // nodes without incoming edges have zero drift
        for row in 1..4 {
            assert_eq!(pred.data()[row * 2], 0.0);
            assert_eq!(pred.data()[row * 2 + 1], 0.0);
        }
        assert!((pred.data()[0] - 0.1 * pred.data()[1]).abs() < 1e-6);
        clear_graph();
    }

    #[test]
    fn test_one_dim_has_only_message_parameters() {
        let model = SwNeuG::new(ModelConfig::default().with_hidden(4), weights()).expect("model");
        // two message nets of four layers
        assert_eq!(model.parameters().len(), 16);
    }

    #[test]
    fn test_two_dim_layout() {
        let config = ModelConfig::for_state_dim(StateDim::Two).with_hidden(4);
        let model = SwNeuG::new(config, weights()).expect("model");
        let g = GraphSample::new(Tensor::zeros(&[3, 2]), EdgeIndex::from_pairs(&[[0, 1]]))
            .expect("graph");
        assert_eq!(model.prediction(&g).expect("prediction").shape(), &[3, 4]);
        clear_graph();
    }

    #[test]
    fn test_loss_uses_first_column() {
        let config = ModelConfig::default()
            .with_hidden(4)
            .with_residual(Residual::Squared);
        let model = SwNeuG::new(config, weights()).expect("model");
        let g = star().with_target(Tensor::full(&[4, 3], 2.0)).expect("target");

        let pred = model.prediction(&g).expect("prediction");
        let expected: f32 = (0..4).map(|r| (2.0 - pred.data()[r * 2]).powi(2)).sum();
        assert!((model.loss(&g).expect("loss").item() - expected).abs() < 1e-4);
        clear_graph();
    }

    #[test]
    fn test_loss_rejects_empty_target() {
        let model = SwNeuG::new(ModelConfig::default().with_hidden(4), weights()).expect("model");
        let g = star().with_target(Tensor::zeros(&[4, 0])).expect("target");
        assert!(matches!(model.loss(&g), Err(SdiError::DimensionMismatch { .. })));
        clear_graph();
    }

    #[test]
    fn test_average_trajectories_leave_tape_empty() {
        let model = SwNeuG::new(ModelConfig::default().with_hidden(4), weights()).expect("model");
        let g = star();
        clear_graph();
        for _ in 0..10 {
            model.average_trajectories(&g).expect("avg");
        }
        assert_eq!(tape_len(), 0);
    }
}
