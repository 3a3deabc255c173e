//! Edge message functions.
//!
//! Each layer turns the receiver state `x_i`, the sender state `x_j` (both
//! column 0 only) and the edge's static weights into a scalar message.
//! Without edge attributes every weight channel is 1.

use rand::Rng;

use crate::autograd::Tensor;
use crate::nn::gnn::{Aggregation, Flow, MessagePassing};
use crate::nn::{mlp, MlpSpec, Module, Sequential};

/// Edge attributes, or unit weights when none were given.
fn weights_or_unit(edge_attr: Option<&Tensor>, edges: usize, channels: usize) -> Tensor {
    match edge_attr {
        Some(w) => w.clone(),
        None => Tensor::ones(&[edges, channels]),
    }
}

/// `[x_i₀, x_j₀]` per edge.
fn endpoint_pair(x_i: &Tensor, x_j: &Tensor) -> Tensor {
    Tensor::cat_cols(&[&x_i.column(0), &x_j.column(0)])
}

/// Hidden stack `[input, hidden × depth, 1]`.
fn widths(input: usize, hidden: usize, depth: usize) -> Vec<usize> {
    let mut w = vec![input];
    w.extend(std::iter::repeat(hidden).take(depth));
    w.push(1);
    w
}

/// `ret([x_i, x_j]) · w₀ + ant([x_i, x_j]) · w₁`
///
/// Retrograde and anterograde networks share the input; the static edge
/// weights scale their outputs.
pub struct WeightScaledMessage {
    ret: Sequential,
    ant: Sequential,
    aggregation: Aggregation,
    flow: Flow,
}

impl WeightScaledMessage {
    /// Two `2 → h → h → h → 1` networks. `std` selects N(0, std) weights.
    pub fn new<R: Rng + ?Sized>(
        hidden: usize,
        std: Option<f32>,
        aggregation: Aggregation,
        flow: Flow,
        rng: &mut R,
    ) -> Self {
        let mut spec = MlpSpec::new(&widths(2, hidden, 3));
        if let Some(std) = std {
            spec = spec.normal(std);
        }
        Self {
            ret: mlp(&spec, rng),
            ant: mlp(&spec, rng),
            aggregation,
            flow,
        }
    }

    pub(crate) fn nets(&self) -> [&Sequential; 2] {
        [&self.ret, &self.ant]
    }

    pub(crate) fn nets_mut(&mut self) -> [&mut Sequential; 2] {
        [&mut self.ret, &mut self.ant]
    }
}

impl MessagePassing for WeightScaledMessage {
    fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    fn flow(&self) -> Flow {
        self.flow
    }

    fn message(&self, x_i: &Tensor, x_j: &Tensor, edge_attr: Option<&Tensor>) -> Tensor {
        let pair = endpoint_pair(x_i, x_j);
        let w = weights_or_unit(edge_attr, pair.dims2().0, 2);
        self.ret
            .forward(&pair)
            .mul(&w.column(0))
            .add(&self.ant.forward(&pair).mul(&w.column(1)))
    }
}

/// `ret([x_i, x_j, w₀]) + ant([x_i, x_j, w₁]) + euc([x_j, w₂])`
///
/// The weights enter as input features instead of scaling the output.
pub struct WeightFeatureMessage {
    ret: Sequential,
    ant: Sequential,
    euc: Sequential,
    aggregation: Aggregation,
    flow: Flow,
}

impl WeightFeatureMessage {
    /// `ret`, `ant`: `3 → h×4 → 1`; `euc`: `2 → h×3 → 1`; default init.
    pub fn new<R: Rng + ?Sized>(
        hidden: usize,
        aggregation: Aggregation,
        flow: Flow,
        rng: &mut R,
    ) -> Self {
        let four = MlpSpec::new(&widths(3, hidden, 4));
        Self {
            ret: mlp(&four, rng),
            ant: mlp(&four, rng),
            euc: mlp(&MlpSpec::new(&widths(2, hidden, 3)), rng),
            aggregation,
            flow,
        }
    }

    pub(crate) fn nets(&self) -> [&Sequential; 3] {
        [&self.ret, &self.ant, &self.euc]
    }

    pub(crate) fn nets_mut(&mut self) -> [&mut Sequential; 3] {
        [&mut self.ret, &mut self.ant, &mut self.euc]
    }
}

impl MessagePassing for WeightFeatureMessage {
    fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    fn flow(&self) -> Flow {
        self.flow
    }

    fn message(&self, x_i: &Tensor, x_j: &Tensor, edge_attr: Option<&Tensor>) -> Tensor {
        let pair = endpoint_pair(x_i, x_j);
        let w = weights_or_unit(edge_attr, pair.dims2().0, 3);
        let sender = x_j.column(0);

        let ret = self.ret.forward(&Tensor::cat_cols(&[&pair, &w.column(0)]));
        let ant = self.ant.forward(&Tensor::cat_cols(&[&pair, &w.column(1)]));
        let euc = self.euc.forward(&Tensor::cat_cols(&[&sender, &w.column(2)]));
        ret.add(&ant).add(&euc)
    }
}

/// `Σ_k msg_k([x_j, w_k]) · 1[w_k ≠ 0]`
///
/// Only the sender's state enters; an edge type contributes through
/// channel `k` only where its weight is non-zero.
pub struct WeightGatedMessage {
    channels: [Sequential; 3],
    aggregation: Aggregation,
    flow: Flow,
}

impl WeightGatedMessage {
    /// Three `2 → h×4 → 1` networks, default init.
    pub fn new<R: Rng + ?Sized>(
        hidden: usize,
        aggregation: Aggregation,
        flow: Flow,
        rng: &mut R,
    ) -> Self {
        let spec = MlpSpec::new(&widths(2, hidden, 4));
        Self {
            channels: [mlp(&spec, rng), mlp(&spec, rng), mlp(&spec, rng)],
            aggregation,
            flow,
        }
    }

    pub(crate) fn nets(&self) -> [&Sequential; 3] {
        let [a, b, c] = &self.channels;
        [a, b, c]
    }

    pub(crate) fn nets_mut(&mut self) -> [&mut Sequential; 3] {
        let [a, b, c] = &mut self.channels;
        [a, b, c]
    }
}

impl MessagePassing for WeightGatedMessage {
    fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    fn flow(&self) -> Flow {
        self.flow
    }

    fn message(&self, _x_i: &Tensor, x_j: &Tensor, edge_attr: Option<&Tensor>) -> Tensor {
        let sender = x_j.column(0);
        let edges = sender.dims2().0;
        let w = weights_or_unit(edge_attr, edges, 3);

        let mut total: Option<Tensor> = None;
        for (k, net) in self.channels.iter().enumerate() {
            let wk = w.column(k);
            let gate: Vec<f32> = wk
                .data()
                .iter()
                .map(|&v| if v == 0.0 { 0.0 } else { 1.0 })
                .collect();
            let msg = net
                .forward(&Tensor::cat_cols(&[&sender, &wk]))
                .mul(&Tensor::from_vec(gate, &[edges, 1]));
            total = Some(match total {
                Some(acc) => acc.add(&msg),
                None => msg,
            });
        }
        total.unwrap_or_else(|| Tensor::zeros(&[edges, 1]))
    }
}
