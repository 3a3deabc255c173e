//! Per-node Gaussian predictive distributions.

use rand::Rng;

use crate::autograd::Tensor;
use crate::error::{Result, SdiError};
use crate::nn::init::standard_normal;
use crate::nn::loss::Reduction;

/// ½ ln 2π
const HALF_LN_TWO_PI: f32 = 0.918_938_5;

/// Element-wise Normal(loc, scale), with `scale` the standard deviation.
///
/// `log_prob` is differentiable in both `loc` and `scale`; `sample` is not.
///
/// # Example
///
/// ```
/// use sdigraph::autograd::Tensor;
/// use sdigraph::distributions::Normal;
///
/// let dist = Normal::new(Tensor::zeros(&[1, 1]), Tensor::ones(&[1, 1])).expect("valid");
/// let lp = dist.log_prob(&Tensor::zeros(&[1, 1])).expect("same shape");
/// assert!((lp.item() + 0.918_938_5).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct Normal {
    loc: Tensor,
    scale: Tensor,
}

impl Normal {
    /// Create a distribution.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the shapes differ, or
    /// `InvalidHyperparameter` if any scale is not strictly positive.
    pub fn new(loc: Tensor, scale: Tensor) -> Result<Self> {
        if loc.shape() != scale.shape() {
            return Err(SdiError::shape_mismatch("normal scale", loc.shape(), scale.shape()));
        }
        if let Some(bad) = scale.data().iter().find(|s| !(**s > 0.0 && s.is_finite())) {
            return Err(SdiError::invalid_hyperparameter("scale", bad, "finite and > 0"));
        }
        Ok(Self { loc, scale })
    }

    /// Mean of the distribution.
    #[must_use]
    pub fn mean(&self) -> &Tensor {
        &self.loc
    }

    /// Standard deviation of the distribution.
    #[must_use]
    pub fn stddev(&self) -> &Tensor {
        &self.scale
    }

    /// Log density: −(v−μ)²/(2σ²) − ln σ − ½ ln 2π.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `value` has a different shape.
    pub fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        if value.shape() != self.loc.shape() {
            return Err(SdiError::shape_mismatch("normal value", self.loc.shape(), value.shape()));
        }
        let two_var = self.scale.pow(2.0).mul_scalar(2.0);
        let quad = value.sub(&self.loc).pow(2.0).div(&two_var);
        Ok(quad
            .neg()
            .sub(&self.scale.log())
            .add_scalar(-HALF_LN_TWO_PI))
    }

    /// Reduced negative log-likelihood of `value`.
    ///
    /// # Errors
    ///
    /// As [`Normal::log_prob`].
    pub fn nll(&self, value: &Tensor, reduction: Reduction) -> Result<Tensor> {
        Ok(reduction.apply(self.log_prob(value)?.neg()))
    }

    /// One independent draw per element, outside the computation graph.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Tensor {
        let data: Vec<f32> = self
            .loc
            .data()
            .iter()
            .zip(self.scale.data())
            .map(|(&mu, &sigma)| mu + sigma * standard_normal(rng))
            .collect();
        Tensor::from_vec(data, self.loc.shape())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{clear_graph, get_grad};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn closed_form(v: f32, mu: f32, sigma: f32) -> f32 {
        -(v - mu).powi(2) / (2.0 * sigma * sigma)
            - sigma.ln()
            - 0.5 * (2.0 * std::f32::consts::PI).ln()
    }

    #[test]
    fn test_log_prob_closed_form() {
        let dist = Normal::new(
            Tensor::new(&[0.0, 1.0, -2.0], &[3, 1]),
            Tensor::new(&[1.0, 0.5, 2.0], &[3, 1]),
        )
        .expect("valid");
        let value = Tensor::new(&[0.3, 1.0, 1.0], &[3, 1]);
        let lp = dist.log_prob(&value).expect("log_prob");

        for (i, (&got, (v, (mu, s)))) in lp
            .data()
            .iter()
            .zip([0.3, 1.0, 1.0].iter().zip([(0.0, 1.0), (1.0, 0.5), (-2.0, 2.0)]))
            .enumerate()
        {
            let expected = closed_form(*v, mu, s);
            assert!((got - expected).abs() < 1e-5, "row {i}: {got} vs {expected}");
        }
    }

    #[test]
    fn test_nll_sum_and_mean() {
        let dist = Normal::new(Tensor::zeros(&[2, 1]), Tensor::ones(&[2, 1])).expect("valid");
        let v = Tensor::new(&[1.0, -1.0], &[2, 1]);
        let per = 0.5 + HALF_LN_TWO_PI;

        let sum = dist.nll(&v, Reduction::Sum).expect("nll");
        let mean = dist.nll(&v, Reduction::Mean).expect("nll");
        assert!((sum.item() - 2.0 * per).abs() < 1e-5);
        assert!((mean.item() - per).abs() < 1e-5);
    }

    #[test]
    fn test_log_prob_gradients() {
        clear_graph();
        let loc = Tensor::new(&[0.5], &[1, 1]).requires_grad();
        let scale = Tensor::new(&[2.0], &[1, 1]).requires_grad();
        let dist = Normal::new(loc.clone(), scale.clone()).expect("valid");

        dist.log_prob(&Tensor::new(&[1.5], &[1, 1]))
            .expect("log_prob")
            .sum()
            .backward();

        // ∂/∂μ = (v-μ)/σ², ∂/∂σ = (v-μ)²/σ³ - 1/σ
        let g_mu = get_grad(loc.id()).expect("loc grad").item();
        let g_sigma = get_grad(scale.id()).expect("scale grad").item();
        assert!((g_mu - 0.25).abs() < 1e-5, "{g_mu}");
        assert!((g_sigma - (0.125 - 0.5)).abs() < 1e-5, "{g_sigma}");
        clear_graph();
    }

    #[test]
    fn test_rejects_bad_scale_and_shape() {
        assert!(Normal::new(Tensor::zeros(&[2, 1]), Tensor::zeros(&[2, 1])).is_err());
        assert!(Normal::new(Tensor::zeros(&[2, 1]), Tensor::ones(&[1, 2])).is_err());
        let dist = Normal::new(Tensor::zeros(&[2, 1]), Tensor::ones(&[2, 1])).expect("valid");
        assert!(dist.log_prob(&Tensor::zeros(&[2])).is_err());
    }

    #[test]
    fn test_sample_moments() {
        let n = 20_000;
        let dist = Normal::new(Tensor::full(&[n, 1], 1.5), Tensor::full(&[n, 1], 0.5))
            .expect("valid");
        let s = dist.sample(&mut StdRng::seed_from_u64(11));

        let mean: f32 = s.data().iter().sum::<f32>() / n as f32;
        let var: f32 = s.data().iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n as f32;
        assert!((mean - 1.5).abs() < 0.02, "mean {mean}");
        assert!((var - 0.25).abs() < 0.02, "var {var}");
        assert!(!s.requires_grad_enabled());
    }
}
