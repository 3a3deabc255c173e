//! Graph containers consumed by the message-passing models.
//!
//! - [`EdgeIndex`]: directed edges in COO form, `(src[e], dst[e])`.
//! - [`EdgeTypeWeights`]: one row of static weights per edge type, tiled
//!   over batched graphs whose edge list repeats the same structure.
//! - [`GraphSample`]: node states, edges and optional targets.

use crate::autograd::Tensor;
use crate::error::{Result, SdiError};

/// Directed edge list in COO format.
///
/// # Example
///
/// ```
/// use sdigraph::graph::EdgeIndex;
///
/// let edges = EdgeIndex::from_pairs(&[[0, 1], [1, 2], [2, 0]]);
/// assert_eq!(edges.num_edges(), 3);
/// assert_eq!(edges.in_degrees(3), vec![1, 1, 1]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EdgeIndex {
    src: Vec<usize>,
    dst: Vec<usize>,
}

impl EdgeIndex {
    /// Create from `[source, target]` pairs.
    #[must_use]
    pub fn from_pairs(edges: &[[usize; 2]]) -> Self {
        Self {
            src: edges.iter().map(|e| e[0]).collect(),
            dst: edges.iter().map(|e| e[1]).collect(),
        }
    }

    /// Create from separate source and target vectors.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the vectors differ in length.
    pub fn from_coo(src: Vec<usize>, dst: Vec<usize>) -> Result<Self> {
        if src.len() != dst.len() {
            return Err(SdiError::dimension_mismatch(
                "edge targets",
                src.len(),
                dst.len(),
            ));
        }
        Ok(Self { src, dst })
    }

    /// Number of edges.
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.src.len()
    }

    /// Check if there are no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    /// Edge sources.
    #[must_use]
    pub fn src(&self) -> &[usize] {
        &self.src
    }

    /// Edge targets.
    #[must_use]
    pub fn dst(&self) -> &[usize] {
        &self.dst
    }

    /// Check that every endpoint is a valid node.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` for the first endpoint `>= num_nodes`.
    pub fn validate(&self, num_nodes: usize) -> Result<()> {
        match self.src.iter().chain(&self.dst).find(|&&n| n >= num_nodes) {
            Some(&bad) => Err(SdiError::index_out_of_bounds(bad, num_nodes)),
            None => Ok(()),
        }
    }

    /// Number of incoming edges per node.
    #[must_use]
    pub fn in_degrees(&self, num_nodes: usize) -> Vec<usize> {
        let mut degrees = vec![0; num_nodes];
        for &t in self.dst.iter().filter(|&&t| t < num_nodes) {
            degrees[t] += 1;
        }
        degrees
    }

    /// Same edges with every direction flipped.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            src: self.dst.clone(),
            dst: self.src.clone(),
        }
    }

    /// Same edges with every node index shifted by `by`.
    #[must_use]
    pub fn offset(&self, by: usize) -> Self {
        Self {
            src: self.src.iter().map(|n| n + by).collect(),
            dst: self.dst.iter().map(|n| n + by).collect(),
        }
    }
}

/// Static weights per edge type, `[E_types × channels]`.
///
/// Batched graphs repeat one network's edge list, so the block is tiled
/// `num_edges / E_types` times to give every edge its weights.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeTypeWeights {
    data: Vec<f32>,
    rows: usize,
    channels: usize,
}

impl EdgeTypeWeights {
    /// Create from row-major data.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `data.len() != rows * channels`, or
    /// `InvalidHyperparameter` if either dimension is zero.
    pub fn new(data: Vec<f32>, rows: usize, channels: usize) -> Result<Self> {
        if rows == 0 || channels == 0 {
            return Err(SdiError::invalid_hyperparameter(
                "edge_type_weights",
                format!("{rows}x{channels}"),
                "non-empty [E_types x channels] block",
            ));
        }
        if data.len() != rows * channels {
            return Err(SdiError::dimension_mismatch(
                "edge_type_weights",
                rows * channels,
                data.len(),
            ));
        }
        Ok(Self {
            data,
            rows,
            channels,
        })
    }

    /// Create from one row per edge type.
    ///
    /// # Errors
    ///
    /// Returns an error if rows are empty or ragged.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let channels = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != channels) {
            return Err(SdiError::dimension_mismatch(
                "edge_type_weights channels",
                channels,
                bad.len(),
            ));
        }
        Self::new(rows.concat(), rows.len(), channels)
    }

    /// Number of edge types.
    #[must_use]
    pub fn num_types(&self) -> usize {
        self.rows
    }

    /// Number of weight channels per edge type.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Weight channel `c` of edge type `t`.
    #[must_use]
    pub fn get(&self, t: usize, c: usize) -> Option<f32> {
        (t < self.rows && c < self.channels).then(|| self.data[t * self.channels + c])
    }

    /// Repeat the block over `num_edges` edges as a constant `[E × channels]` tensor.
    ///
    /// # Errors
    ///
    /// Returns `EdgeWeightTiling` if `num_edges` is not a multiple of the
    /// number of edge types.
    pub fn tile(&self, num_edges: usize) -> Result<Tensor> {
        if num_edges % self.rows != 0 {
            return Err(SdiError::EdgeWeightTiling {
                edges: num_edges,
                weight_rows: self.rows,
            });
        }
        let data = self.data.repeat(num_edges / self.rows);
        Ok(Tensor::from_vec(data, &[num_edges, self.channels]))
    }
}

/// One graph (or a batch of disjoint graphs) of node states.
///
/// `x` is `[N × F]`; column `k < ndim` holds state variable `k`.
/// `y`, when present, is `[N × D]` supervision.
#[derive(Debug, Clone)]
pub struct GraphSample {
    /// Node states
    pub x: Tensor,
    /// Directed edges
    pub edge_index: EdgeIndex,
    /// Supervision targets
    pub y: Option<Tensor>,
}

impl GraphSample {
    /// Create a sample without targets.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` is not 2-D or an edge references a missing node.
    pub fn new(x: Tensor, edge_index: EdgeIndex) -> Result<Self> {
        let sample = Self {
            x,
            edge_index,
            y: None,
        };
        sample.validate()?;
        Ok(sample)
    }

    /// Attach a target matrix.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `y` is not `[N × D]`.
    pub fn with_target(mut self, y: Tensor) -> Result<Self> {
        self.y = Some(y);
        self.validate()?;
        Ok(self)
    }

    /// Number of nodes.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.x.shape().first().copied().unwrap_or(0)
    }

    /// Number of node features.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.x.shape().get(1).copied().unwrap_or(0)
    }

    /// Check shapes and edge endpoints.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` or `IndexOutOfBounds`.
    pub fn validate(&self) -> Result<()> {
        if self.x.ndim() != 2 {
            return Err(SdiError::dimension_mismatch("node state ndim", 2, self.x.ndim()));
        }
        let n = self.num_nodes();
        self.edge_index.validate(n)?;
        if let Some(y) = &self.y {
            if y.ndim() != 2 || y.shape()[0] != n {
                return Err(SdiError::shape_mismatch("target rows", &[n], y.shape()));
            }
        }
        Ok(())
    }

    /// The target matrix.
    ///
    /// # Errors
    ///
    /// Returns `MissingTarget` if none was attached.
    pub fn target(&self) -> Result<&Tensor> {
        self.y.as_ref().ok_or(SdiError::MissingTarget)
    }

    /// Concatenate samples into one disjoint graph.
    ///
    /// Node indices of sample `k` are shifted by the node count of the
    /// samples before it, so edge lists repeat with the same structure.
    /// Targets are kept only when every sample carries one.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty batch or mismatched feature widths.
    pub fn batch(samples: &[GraphSample]) -> Result<GraphSample> {
        let first = samples.first().ok_or_else(|| {
            SdiError::invalid_hyperparameter("batch", 0, "at least one graph sample")
        })?;
        let features = first.num_features();
        let target_width = first.y.as_ref().map(|y| y.shape()[1]);

        let mut x = Vec::new();
        let mut y = Vec::new();
        let (mut src, mut dst) = (Vec::new(), Vec::new());
        let mut all_targets = true;
        let mut offset = 0;

        for sample in samples {
            sample.validate()?;
            if sample.num_features() != features {
                return Err(SdiError::dimension_mismatch(
                    "batch node features",
                    features,
                    sample.num_features(),
                ));
            }
            x.extend_from_slice(sample.x.data());
            match (&sample.y, target_width) {
                (Some(t), Some(w)) if t.shape()[1] == w => y.extend_from_slice(t.data()),
                (Some(t), Some(w)) => {
                    return Err(SdiError::dimension_mismatch("batch target width", w, t.shape()[1]))
                }
                _ => all_targets = false,
            }
            let shifted = sample.edge_index.offset(offset);
            src.extend(shifted.src);
            dst.extend(shifted.dst);
            offset += sample.num_nodes();
        }

        let y = match (all_targets, target_width) {
            (true, Some(w)) => Some(Tensor::from_vec(y, &[offset, w])),
            _ => None,
        };
        Ok(GraphSample {
            x: Tensor::from_vec(x, &[offset, features]),
            edge_index: EdgeIndex { src, dst },
            y,
        })
    }
}
