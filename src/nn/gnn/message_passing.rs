use serde::{Deserialize, Serialize};

use crate::autograd::{ScatterReduce, Tensor};
use crate::graph::EdgeIndex;

/// Permutation-invariant reduction of incoming messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Sum of incoming messages
    #[default]
    Add,
    /// Mean of incoming messages; 0 for nodes without incoming edges
    Mean,
    /// Element-wise maximum; 0 for nodes without incoming edges
    Max,
}

impl From<Aggregation> for ScatterReduce {
    fn from(aggr: Aggregation) -> Self {
        match aggr {
            Aggregation::Add => ScatterReduce::Add,
            Aggregation::Mean => ScatterReduce::Mean,
            Aggregation::Max => ScatterReduce::Max,
        }
    }
}

/// Direction information travels along an edge `(src, dst)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// `src` sends, `dst` receives
    #[default]
    SourceToTarget,
    /// `dst` sends, `src` receives
    TargetToSource,
}

impl Flow {
    /// `(senders, receivers)` for this direction.
    #[must_use]
    pub fn endpoints<'a>(&self, edge_index: &'a EdgeIndex) -> (&'a [usize], &'a [usize]) {
        match self {
            Flow::SourceToTarget => (edge_index.src(), edge_index.dst()),
            Flow::TargetToSource => (edge_index.dst(), edge_index.src()),
        }
    }
}

/// A message-passing layer.
///
/// # Example
///
/// ```
/// use sdigraph::autograd::Tensor;
/// use sdigraph::graph::EdgeIndex;
/// use sdigraph::nn::gnn::MessagePassing;
///
/// /// Sends the sender's state unchanged.
/// struct Relay;
///
/// impl MessagePassing for Relay {
///     fn message(&self, _x_i: &Tensor, x_j: &Tensor, _edge_attr: Option<&Tensor>) -> Tensor {
///         x_j.clone()
///     }
/// }
///
/// let x = Tensor::new(&[1.0, 2.0, 4.0], &[3, 1]);
/// let edges = EdgeIndex::from_pairs(&[[0, 2], [1, 2]]);
/// let out = Relay.propagate(&x, &edges, None);
/// assert_eq!(out.data(), &[0.0, 0.0, 3.0]);
/// ```
pub trait MessagePassing {
    /// Reduction applied per receiving node.
    fn aggregation(&self) -> Aggregation {
        Aggregation::Add
    }

    /// Edge direction.
    fn flow(&self) -> Flow {
        Flow::SourceToTarget
    }

    /// Messages for all edges at once.
    ///
    /// `x_i` and `x_j` are `[E × F]` receiver and sender states, and
    /// `edge_attr` is the `[E × C]` per-edge attribute block if any.
    /// Returns `[E × M]`.
    fn message(&self, x_i: &Tensor, x_j: &Tensor, edge_attr: Option<&Tensor>) -> Tensor;

    /// Combine the `[N × M]` aggregate with the node states.
    fn update(&self, aggr: Tensor, _x: &Tensor) -> Tensor {
        aggr
    }

    /// Gather, message, aggregate, update.
    ///
    /// # Panics
    ///
    /// Panics if an edge endpoint is not a row of `x`; callers validate
    /// the graph first.
    fn propagate(&self, x: &Tensor, edge_index: &EdgeIndex, edge_attr: Option<&Tensor>) -> Tensor {
        let num_nodes = x.dims2().0;
        let (senders, receivers) = self.flow().endpoints(edge_index);
        if receivers.is_empty() {
            tracing::warn!(num_nodes, "propagate called with an empty edge set");
        }
        tracing::trace!(
            num_nodes,
            num_edges = receivers.len(),
            aggregation = ?self.aggregation(),
            "propagate"
        );

        let x_i = x.index_select(receivers);
        let x_j = x.index_select(senders);
        let messages = self.message(&x_i, &x_j, edge_attr);
        let aggr = messages.scatter(receivers, num_nodes, self.aggregation().into());
        self.update(aggr, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{clear_graph, get_grad};

    /// Message `x_j - x_i` with a configurable reduction.
    struct Diff(Aggregation, Flow);

    impl MessagePassing for Diff {
        fn aggregation(&self) -> Aggregation {
            self.0
        }

        fn flow(&self) -> Flow {
            self.1
        }

        fn message(&self, x_i: &Tensor, x_j: &Tensor, _edge_attr: Option<&Tensor>) -> Tensor {
            x_j.sub(x_i)
        }
    }

    fn line() -> (Tensor, EdgeIndex) {
        // 0 -> 2, 1 -> 2, 2 -> 0
        (
            Tensor::new(&[1.0, 3.0, 10.0], &[3, 1]),
            EdgeIndex::from_pairs(&[[0, 2], [1, 2], [2, 0]]),
        )
    }

    #[test]
    fn test_source_to_target_sum() {
        let (x, e) = line();
        let out = Diff(Aggregation::Add, Flow::SourceToTarget).propagate(&x, &e, None);
        // node 0 receives 10-1, node 2 receives (1-10)+(3-10)
        assert_eq!(out.data(), &[9.0, 0.0, -16.0]);
    }

    #[test]
    fn test_target_to_source_sum() {
        let (x, e) = line();
        let out = Diff(Aggregation::Add, Flow::TargetToSource).propagate(&x, &e, None);
        assert_eq!(out.data(), &[9.0, 7.0, -9.0]);
    }

    #[test]
    fn test_mean_and_max() {
        let (x, e) = line();
        let mean = Diff(Aggregation::Mean, Flow::SourceToTarget).propagate(&x, &e, None);
        assert_eq!(mean.data(), &[9.0, 0.0, -8.0]);

        let max = Diff(Aggregation::Max, Flow::SourceToTarget).propagate(&x, &e, None);
        assert_eq!(max.data(), &[9.0, 0.0, -7.0]);
    }

    #[test]
    fn test_empty_edges_give_zeros() {
        let x = Tensor::new(&[1.0, 2.0], &[2, 1]);
        let out = Diff(Aggregation::Add, Flow::SourceToTarget).propagate(
            &x,
            &EdgeIndex::default(),
            None,
        );
        assert_eq!(out.data(), &[0.0, 0.0]);
    }

    #[test]
    fn test_gradient_flows_to_node_states() {
        clear_graph();
        let (x, e) = line();
        let x = x.requires_grad();
        Diff(Aggregation::Add, Flow::SourceToTarget)
            .propagate(&x, &e, None)
            .sum()
            .backward();

        // each edge contributes +1 to its sender and -1 to its receiver
        let grad = get_grad(x.id()).expect("x grad");
        assert_eq!(grad.data(), &[0.0, 1.0, -1.0]);
        clear_graph();
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Flow::TargetToSource).expect("serialize");
        assert_eq!(json, "\"target_to_source\"");
        let aggr: Aggregation = serde_json::from_str("\"mean\"").expect("deserialize");
        assert_eq!(aggr, Aggregation::Mean);
    }
}
