//! Deterministic surrogate with edge weights as message features.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::messages::WeightFeatureMessage;
use super::{
    augment, collect_parameters, collect_parameters_mut, drifts, prepare, require_channels,
    residual_loss, target_columns, updates, DynamicsModel,
};
use crate::autograd::{no_grad, Tensor};
use crate::config::{ModelConfig, Residual};
use crate::error::{Result, SdiError};
use crate::graph::{EdgeTypeWeights, GraphSample};
use crate::nn::gnn::MessagePassing;
use crate::nn::{mlp, MlpSpec, Sequential};

/// Drift network widths shared by the deterministic models.
pub(crate) fn node_spec(k: usize, features: usize, hidden: usize) -> MlpSpec {
    if k == 0 {
        MlpSpec::new(&[features, hidden, hidden, hidden, 1])
    } else {
        MlpSpec::new(&[features, hidden, hidden, 1])
    }
}

/// Weighted neural graph: edge weights enter the message networks as inputs.
///
/// `prediction` is `[N × 2·ndim]`: the Euler updates of every state
/// variable followed by their drifts.
pub struct WNeuG {
    config: ModelConfig,
    weights: EdgeTypeWeights,
    messages: WeightFeatureMessage,
    node: Vec<Sequential>,
}

impl WNeuG {
    /// Build the model, drawing all weights from `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` for an invalid config or an
    /// edge-type block with fewer than three weight channels.
    pub fn new(config: ModelConfig, weights: EdgeTypeWeights) -> Result<Self> {
        config.validate()?;
        require_channels(&weights, 3)?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let (f, h) = (config.node_features, config.hidden);
        let messages = WeightFeatureMessage::new(h, config.aggregation, config.flow, &mut rng);
        let node = (0..config.ndim.count())
            .map(|k| mlp(&node_spec(k, f, h), &mut rng))
            .collect();

        let model = Self {
            config,
            weights,
            messages,
            node,
        };
        debug!(
            ndim = model.config.ndim.count(),
            num_parameters = model.num_parameters(),
            "built WNeuG"
        );
        Ok(model)
    }

    /// `[updates…, drifts…]` for every node.
    ///
    /// # Errors
    ///
    /// Returns a dimension error when the graph does not fit the model.
    pub fn prediction(&self, g: &GraphSample) -> Result<Tensor> {
        let w = prepare(&self.config, &self.weights, g)?;
        Ok(self.step(&g.x, g, &w))
    }

    /// [`WNeuG::prediction`] from randomly shifted node states.
    ///
    /// # Errors
    ///
    /// As [`WNeuG::prediction`].
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
        let drifts = drifts(&self.node, x, &aggr);
        let updates = updates(x, &drifts, self.config.delta_t);
        let columns: Vec<&Tensor> = updates.iter().chain(&drifts).collect();
        Tensor::cat_cols(&columns)
    }
}

impl DynamicsModel for WNeuG {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// `Absolute`: Σ|y − ŷ| over every column; `Squared`: Σ(y₀ − ŷ₀)².
    fn loss(&self, g: &GraphSample) -> Result<Tensor> {
        let loss = match self.config.residual {
            Residual::Absolute => {
                let y = g.target()?;
                let pred = self.prediction(g)?;
                if y.shape() != pred.shape() {
                    return Err(SdiError::shape_mismatch("target", pred.shape(), y.shape()));
                }
                residual_loss(Residual::Absolute, &pred, y)
            }
            Residual::Squared => {
                let y = target_columns(g, 1)?;
                let pred = self.prediction(g)?;
                residual_loss(Residual::Squared, &pred.column(0), &y.column(0))
            }
        };
        debug!(loss = loss.item(), "WNeuG loss");
        Ok(loss)
    }

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

impl std::fmt::Debug for WNeuG {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WNeuG")
            .field("ndim", &self.config.ndim)
            .field("hidden", &self.config.hidden)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{clear_graph, tape_len};
    use crate::config::StateDim;
    use crate::graph::EdgeIndex;

    fn graph(features: usize) -> GraphSample {
        let x: Vec<f32> = (0..4 * features).map(|i| i as f32 * 0.1).collect();
        GraphSample::new(
            Tensor::from_vec(x, &[4, features]),
            EdgeIndex::from_pairs(&[[0, 1], [1, 2], [2, 3], [3, 0]]),
        )
        .expect("graph")
    }

    fn weights() -> EdgeTypeWeights {
        EdgeTypeWeights::from_rows(&[vec![1.0, 0.0, 0.5], vec![0.0, 1.0, 0.5]]).expect("weights")
    }

    #[test]
    fn test_prediction_layout() {
        for ndim in [StateDim::One, StateDim::Two, StateDim::Three] {
            let config = ModelConfig::for_state_dim(ndim).with_hidden(5).with_delta_t(0.2);
            let model = WNeuG::new(config, weights()).expect("model");
            let g = graph(ndim.count());
            let pred = model.prediction(&g).expect("prediction");
            let n = ndim.count();
            assert_eq!(pred.shape(), &[4, 2 * n]);

            for row in 0..4 {
                for k in 0..n {
                    let update = pred.data()[row * 2 * n + k];
                    let drift = pred.data()[row * 2 * n + n + k];
                    let x = g.x.data()[row * n + k];
                    assert!((update - (x + 0.2 * drift)).abs() < 1e-5);
                }
            }
        }
        clear_graph();
    }

    #[test]
    fn test_rejects_two_channel_weights() {
        let w = EdgeTypeWeights::new(vec![1.0, 1.0], 1, 2).expect("weights");
        assert!(WNeuG::new(ModelConfig::default(), w).is_err());
    }

    #[test]
    fn test_absolute_loss_needs_full_target() {
        let model = WNeuG::new(ModelConfig::default().with_hidden(4), weights()).expect("model");
        let g = graph(1).with_target(Tensor::zeros(&[4, 1])).expect("target");
        assert!(matches!(model.loss(&g), Err(SdiError::DimensionMismatch { .. })));

        let g = graph(1).with_target(Tensor::zeros(&[4, 2])).expect("target");
        let pred = model.prediction(&g).expect("prediction");
        let expected: f32 = pred.data().iter().map(|v| v.abs()).sum();
        assert!((model.loss(&g).expect("loss").item() - expected).abs() < 1e-4);
        clear_graph();
    }

    #[test]
    fn test_squared_loss_uses_first_column() {
        let config = ModelConfig::default().with_hidden(4).with_residual(Residual::Squared);
        let model = WNeuG::new(config, weights()).expect("model");
        let g = graph(1).with_target(Tensor::ones(&[4, 1])).expect("target");

        let pred = model.prediction(&g).expect("prediction");
        let expected: f32 = (0..4).map(|r| (1.0 - pred.data()[r * 2]).powi(2)).sum();
        assert!((model.loss(&g).expect("loss").item() - expected).abs() < 1e-4);
        clear_graph();
    }

    #[test]
    fn test_average_trajectories_are_update_columns() {
        let config = ModelConfig::for_state_dim(StateDim::Two).with_hidden(4);
        let model = WNeuG::new(config, weights()).expect("model");
        let g = graph(2);
        let pred = model.prediction(&g).expect("prediction");
        let avg = model.average_trajectories(&g).expect("avg");
        assert_eq!(avg.len(), 2);
        assert_eq!(avg[1].data(), pred.column(1).data());
        clear_graph();
    }

    #[test]
    fn test_squared_loss_rejects_empty_target() {
        let config = ModelConfig::default().with_hidden(4).with_residual(Residual::Squared);
        let model = WNeuG::new(config, weights()).expect("model");
        let g = graph(1).with_target(Tensor::zeros(&[4, 0])).expect("target");
        assert!(matches!(model.loss(&g), Err(SdiError::DimensionMismatch { .. })));
        clear_graph();
    }

    #[test]
    fn test_average_trajectories_leave_tape_empty() {
        let model = WNeuG::new(ModelConfig::default().with_hidden(4), weights()).expect("model");
        let g = graph(1);
        clear_graph();
        for _ in 0..10 {
            model.average_trajectories(&g).expect("avg");
        }
        assert_eq!(tape_len(), 0);
    }
}
