//! Multi-horizon surrogate with weight-gated messages.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::messages::WeightGatedMessage;
use super::wneug::node_spec;
use super::{
    augment, collect_parameters, collect_parameters_mut, prepare, require_channels,
    residual_loss, DynamicsModel,
};
use crate::autograd::{no_grad, Tensor};
use crate::config::{ModelConfig, StateDim};
use crate::error::{Result, SdiError};
use crate::graph::{EdgeTypeWeights, GraphSample};
use crate::nn::gnn::MessagePassing;
use crate::nn::{mlp, MlpSpec, Module, Sequential};

/// Multi-horizon weighted neural graph for a single state variable.
///
/// The drift `dx/dt = f_x(x) + Σ_j m(x_j, w_ij)` is scaled by a learned
/// factor `T(s)` for every horizon `s`. Batched graphs of
/// `nodes_per_graph` nodes each give one output row per graph:
/// `[dx/dt·T(s₁) | dx/dt·T(s₂) | …]`, width `horizons × nodes_per_graph`.
pub struct InwNeuG {
    config: ModelConfig,
    weights: EdgeTypeWeights,
    messages: WeightGatedMessage,
    node_x: Sequential,
    time_scale: Sequential,
}

impl InwNeuG {
    /// Build the model, drawing all weights from `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` for an invalid config, a state
    /// dimension other than one, or an edge-type block with fewer than
    /// three weight channels.
    pub fn new(config: ModelConfig, weights: EdgeTypeWeights) -> Result<Self> {
        config.validate()?;
        if config.ndim != StateDim::One {
            return Err(SdiError::invalid_hyperparameter(
                "ndim",
                config.ndim.count(),
                "1 for the multi-horizon model",
            ));
        }
        require_channels(&weights, 3)?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let (f, h) = (config.node_features, config.hidden);
        let messages = WeightGatedMessage::new(h, config.aggregation, config.flow, &mut rng);
        let node_x = mlp(&node_spec(0, f, h), &mut rng);
        let time_scale = mlp(&MlpSpec::new(&[1, h, h, h, 1]), &mut rng);

        let model = Self {
            config,
            weights,
            messages,
            node_x,
            time_scale,
        };
        debug!(
            horizons = model.config.horizons.len(),
            nodes_per_graph = model.config.nodes_per_graph,
            num_parameters = model.num_parameters(),
            "built InwNeuG"
        );
        Ok(model)
    }

    /// Output width per graph.
    #[must_use]
    pub fn output_width(&self) -> usize {
        self.config.horizons.len() * self.config.nodes_per_graph
    }

    /// Learned scale `T(s)` for each configured horizon.
    #[must_use]
    pub fn horizon_scales(&self) -> Vec<f32> {
        let s = Tensor::new(&self.config.horizons, &[self.config.horizons.len(), 1]);
        no_grad(|| self.time_scale.forward(&s).data().to_vec())
    }

    /// `[B × horizons·nodes_per_graph]` drift projections.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the node count is not a multiple of
    /// `nodes_per_graph`, or as the other models when the graph does not fit.
    pub fn prediction(&self, g: &GraphSample) -> Result<Tensor> {
        let w = prepare(&self.config, &self.weights, g)?;
        self.step(&g.x, g, &w)
    }

    /// [`InwNeuG::prediction`] from randomly shifted node states.
    ///
    /// # Errors
    ///
    /// As [`InwNeuG::prediction`].
    pub fn prediction_augmented<R: Rng + ?Sized>(
        &self,
        g: &GraphSample,
        rng: &mut R,
    ) -> Result<Tensor> {
        let w = prepare(&self.config, &self.weights, g)?;
        let x = augment(&g.x, 1, self.config.augmentation, rng);
        self.step(&x, g, &w)
    }

    fn graphs_in_batch(&self, num_nodes: usize) -> Result<usize> {
        let per = self.config.nodes_per_graph;
        if num_nodes == 0 || num_nodes % per != 0 {
            return Err(SdiError::DimensionMismatch {
                expected: format!("a positive multiple of nodes_per_graph={per}"),
                actual: num_nodes.to_string(),
            });
        }
        Ok(num_nodes / per)
    }

    fn step(&self, x: &Tensor, g: &GraphSample, w: &Tensor) -> Result<Tensor> {
        let n = g.num_nodes();
        let batch = self.graphs_in_batch(n)?;

        let aggr = self.messages.propagate(x, &g.edge_index, Some(w));
        let dxdt = self.node_x.forward(x).add(&aggr);

        let per_horizon: Vec<Tensor> = self
            .config
            .horizons
            .iter()
            .map(|&s| {
                let scale = self.time_scale.forward(&Tensor::full(&[n, 1], s));
                dxdt.mul(&scale).view(&[batch, self.config.nodes_per_graph])
            })
            .collect();
        let parts: Vec<&Tensor> = per_horizon.iter().collect();
        Ok(Tensor::cat_cols(&parts))
    }
}

impl DynamicsModel for InwNeuG {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Residual against the targets laid out like the prediction.
    fn loss(&self, g: &GraphSample) -> Result<Tensor> {
        let y = g.target()?;
        let pred = self.prediction(g)?;
        if y.numel() != pred.numel() {
            return Err(SdiError::dimension_mismatch("target elements", pred.numel(), y.numel()));
        }
        let loss = residual_loss(self.config.residual, &pred, &y.view(pred.shape()));
        debug!(loss = loss.item(), "InwNeuG loss");
        Ok(loss)
    }

    fn average_trajectories(&self, g: &GraphSample) -> Result<Vec<Tensor>> {
        no_grad(|| -> Result<Vec<Tensor>> { Ok(vec![self.prediction(g)?]) })
    }

    fn parameters(&self) -> Vec<&Tensor> {
        collect_parameters(
            self.messages
                .nets()
                .into_iter()
                .chain([&self.node_x, &self.time_scale]),
        )
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        collect_parameters_mut(
            self.messages
                .nets_mut()
                .into_iter()
                .chain([&mut self.node_x, &mut self.time_scale]),
        )
    }
}

impl std::fmt::Debug for InwNeuG {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InwNeuG")
            .field("horizons", &self.config.horizons)
            .field("nodes_per_graph", &self.config.nodes_per_graph)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{clear_graph, tape_len};
    use crate::graph::EdgeIndex;

    fn config() -> ModelConfig {
        ModelConfig::default()
            .with_hidden(4)
            .with_nodes_per_graph(3)
            .with_horizons(&[1.0, 3.0])
    }

    fn weights() -> EdgeTypeWeights {
        EdgeTypeWeights::from_rows(&[
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ])
        .expect("weights")
    }

    fn two_triangles() -> GraphSample {
        let one = GraphSample::new(
            Tensor::new(&[0.1, 0.4, -0.2], &[3, 1]),
            EdgeIndex::from_pairs(&[[0, 1], [1, 2], [2, 0]]),
        )
        .expect("graph");
        GraphSample::batch(&[one.clone(), one]).expect("batch")
    }

    #[test]
    fn test_rejects_multi_dim_state() {
        let config = ModelConfig::for_state_dim(StateDim::Two);
        let err = InwNeuG::new(config, weights()).unwrap_err();
        assert!(err.to_string().contains("ndim"));
    }

    #[test]
    fn test_prediction_shape() {
        let model = InwNeuG::new(config(), weights()).expect("model");
        let pred = model.prediction(&two_triangles()).expect("prediction");
        assert_eq!(pred.shape(), &[2, 6]);
        assert_eq!(model.output_width(), 6);
        // identical graphs give identical rows
        assert_eq!(pred.data()[..6], pred.data()[6..]);
        clear_graph();
    }

    #[test]
    fn test_horizon_blocks_share_drift() {
        let model = InwNeuG::new(config(), weights()).expect("model");
        let pred = model.prediction(&two_triangles()).expect("prediction");
        let t = model.horizon_scales();

        // block s holds dxdt · T(s), so block ratios equal the scale ratio
        for node in 0..3 {
            let a = pred.data()[node];
            let b = pred.data()[3 + node];
            assert!((a * t[1] - b * t[0]).abs() < 1e-5);
        }
        clear_graph();
    }

    #[test]
    fn test_node_count_must_divide() {
        let model = InwNeuG::new(config().with_nodes_per_graph(4), weights()).expect("model");
        assert!(matches!(
            model.prediction(&two_triangles()),
            Err(SdiError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_loss_reshapes_targets() {
        let model = InwNeuG::new(config(), weights()).expect("model");
        let g = two_triangles()
            .with_target(Tensor::zeros(&[6, 2]))
            .expect("target");
        let pred = model.prediction(&g).expect("prediction");
        let expected: f32 = pred.data().iter().map(|v| v.abs()).sum();
        assert!((model.loss(&g).expect("loss").item() - expected).abs() < 1e-4);

        let short = two_triangles()
            .with_target(Tensor::zeros(&[6, 1]))
            .expect("target");
        assert!(model.loss(&short).is_err());
        clear_graph();
    }

    #[test]
    fn test_inference_accessors_leave_tape_empty() {
        let model = InwNeuG::new(config(), weights()).expect("model");
        let g = two_triangles();
        clear_graph();
        for _ in 0..10 {
            model.average_trajectories(&g).expect("avg");
            assert_eq!(model.horizon_scales().len(), 2);
        }
        assert_eq!(tape_len(), 0);
    }
}
