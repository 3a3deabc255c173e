//! Model configuration.
//!
//! One [`ModelConfig`] describes every model family; fields a family does
//! not use are ignored by it. Configurations load from JSON, and missing
//! fields take their defaults.
//!
//! # Example
//!
//! ```
//! use sdigraph::config::{Dynamics, ModelConfig, StateDim};
//!
//! let config = ModelConfig::from_json_str(
//!     r#"{ "node_features": 3, "ndim": 3, "dynamics": "hindmarsh_rose" }"#,
//! )
//! .expect("valid config");
//! assert_eq!(config.ndim, StateDim::Three);
//! assert_eq!(config.dynamics, Dynamics::HindmarshRose);
//! assert_eq!(config.hidden, 50);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SdiError};
use crate::nn::gnn::{Aggregation, Flow};

/// Number of state variables per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum StateDim {
    /// x only
    One,
    /// x, y
    Two,
    /// x, y, z
    Three,
}

impl StateDim {
    /// Number of state columns.
    #[must_use]
    pub fn count(self) -> usize {
        match self {
            StateDim::One => 1,
            StateDim::Two => 2,
            StateDim::Three => 3,
        }
    }
}

impl TryFrom<usize> for StateDim {
    type Error = SdiError;

    fn try_from(ndim: usize) -> Result<Self> {
        match ndim {
            1 => Ok(StateDim::One),
            2 => Ok(StateDim::Two),
            3 => Ok(StateDim::Three),
            other => Err(SdiError::invalid_hyperparameter("ndim", other, "1, 2 or 3")),
        }
    }
}

impl From<StateDim> for usize {
    fn from(ndim: StateDim) -> Self {
        ndim.count()
    }
}

/// Which dynamical system the model is fitted to.
///
/// Only affects initialization scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dynamics {
    /// Hindmarsh–Rose neurons; the slow z drift starts near zero
    HindmarshRose,
    /// Anything else
    #[default]
    Generic,
}

/// Residual penalty used by the deterministic models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Residual {
    /// Σ|y - ŷ|
    #[default]
    Absolute,
    /// Σ(y - ŷ)²
    Squared,
}

/// Hyperparameters shared by all model families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Node feature width F
    pub node_features: usize,
    /// Message width; the aggregate feeds the scalar x drift, so it must be 1
    pub msg_dim: usize,
    /// State variables per node
    pub ndim: StateDim,
    /// Euler step size Δt
    pub delta_t: f32,
    /// Hidden layer width of every MLP
    pub hidden: usize,
    /// Message reduction
    pub aggregation: Aggregation,
    /// Edge direction
    pub flow: Flow,
    /// Target system
    pub dynamics: Dynamics,
    /// Residual penalty of the deterministic models
    pub residual: Residual,
    /// Nodes per graph in a batch, used by the multi-horizon model
    pub nodes_per_graph: usize,
    /// Prediction horizons of the multi-horizon model
    pub horizons: Vec<f32>,
    /// Scale of the per-dimension augmentation offset
    pub augmentation: f32,
    /// Seed for weight initialization
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            node_features: 1,
            msg_dim: 1,
            ndim: StateDim::One,
            delta_t: 0.01,
            hidden: 50,
            aggregation: Aggregation::Add,
            flow: Flow::SourceToTarget,
            dynamics: Dynamics::Generic,
            residual: Residual::Absolute,
            nodes_per_graph: 160,
            horizons: vec![1.0, 3.0, 6.0, 9.0],
            augmentation: 3.0,
            seed: 42,
        }
    }
}

impl ModelConfig {
    /// Config for `ndim` state variables observed directly as features.
    #[must_use]
    pub fn for_state_dim(ndim: StateDim) -> Self {
        Self {
            node_features: ndim.count(),
            ndim,
            ..Self::default()
        }
    }

    /// Set the node feature width.
    #[must_use]
    pub fn with_node_features(mut self, node_features: usize) -> Self {
        self.node_features = node_features;
        self
    }

    /// Set the state dimension.
    #[must_use]
    pub fn with_ndim(mut self, ndim: StateDim) -> Self {
        self.ndim = ndim;
        self
    }

    /// Set the Euler step.
    #[must_use]
    pub fn with_delta_t(mut self, delta_t: f32) -> Self {
        self.delta_t = delta_t;
        self
    }

    /// Set the hidden width.
    #[must_use]
    pub fn with_hidden(mut self, hidden: usize) -> Self {
        self.hidden = hidden;
        self
    }

    /// Set the message reduction.
    #[must_use]
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Set the edge direction.
    #[must_use]
    pub fn with_flow(mut self, flow: Flow) -> Self {
        self.flow = flow;
        self
    }

    /// Set the target system.
    #[must_use]
    pub fn with_dynamics(mut self, dynamics: Dynamics) -> Self {
        self.dynamics = dynamics;
        self
    }

    /// Set the residual penalty.
    #[must_use]
    pub fn with_residual(mut self, residual: Residual) -> Self {
        self.residual = residual;
        self
    }

    /// Set the nodes per batched graph.
    #[must_use]
    pub fn with_nodes_per_graph(mut self, nodes_per_graph: usize) -> Self {
        self.nodes_per_graph = nodes_per_graph;
        self
    }

    /// Set the prediction horizons.
    #[must_use]
    pub fn with_horizons(mut self, horizons: &[f32]) -> Self {
        self.horizons = horizons.to_vec();
        self
    }

    /// Set the augmentation scale.
    #[must_use]
    pub fn with_augmentation(mut self, augmentation: f32) -> Self {
        self.augmentation = augmentation;
        self
    }

    /// Set the initialization seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.node_features < self.ndim.count() {
            return Err(SdiError::invalid_hyperparameter(
                "node_features",
                self.node_features,
                "at least ndim",
            ));
        }
        if self.msg_dim != 1 {
            return Err(SdiError::invalid_hyperparameter("msg_dim", self.msg_dim, "exactly 1"));
        }
        if !(self.delta_t.is_finite() && self.delta_t > 0.0) {
            return Err(SdiError::invalid_hyperparameter("delta_t", self.delta_t, "finite and > 0"));
        }
        if self.hidden == 0 {
            return Err(SdiError::invalid_hyperparameter("hidden", self.hidden, "> 0"));
        }
        if self.nodes_per_graph == 0 {
            return Err(SdiError::invalid_hyperparameter(
                "nodes_per_graph",
                self.nodes_per_graph,
                "> 0",
            ));
        }
        if self.horizons.is_empty() || self.horizons.iter().any(|h| !h.is_finite()) {
            return Err(SdiError::invalid_hyperparameter(
                "horizons",
                format!("{:?}", self.horizons),
                "non-empty list of finite values",
            ));
        }
        if !(self.augmentation.is_finite() && self.augmentation >= 0.0) {
            return Err(SdiError::invalid_hyperparameter(
                "augmentation",
                self.augmentation,
                "finite and >= 0",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed JSON, or the validation error.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise as
    /// [`ModelConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
