//! Gradient-based optimizers.
//!
//! Optimizers read the gradients left on the thread's computation graph by
//! `backward()` and update parameter tensors in place, so parameter IDs
//! stay stable across steps.
//!
//! # Example
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use sdigraph::autograd::{clear_graph, Tensor};
//! use sdigraph::nn::loss::MSELoss;
//! use sdigraph::nn::optim::{Adam, Optimizer};
//! use sdigraph::nn::{Linear, Module};
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let mut model = Linear::new(2, 1, &mut rng);
//! let mut optimizer = Adam::new(model.parameters_mut(), 1e-2);
//!
//! let x = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
//! let y = Tensor::new(&[1.0, 0.0], &[2, 1]);
//! for _ in 0..10 {
//!     let loss = MSELoss::new().forward(&model.forward(&x), &y);
//!     loss.backward();
//!     optimizer.step_with_params(&mut model.parameters_mut());
//!     clear_graph();
//! }
//! ```

use crate::autograd::{clear_grad, get_grad, Tensor, TensorId};

/// Common trait for all optimizers.
pub trait Optimizer {
    /// Apply one update to `params`, in the order the optimizer was built with.
    fn step_with_params(&mut self, params: &mut [&mut Tensor]);

    /// Drop the gradients of every tracked parameter.
    fn zero_grad(&mut self);

    /// Get current learning rate.
    fn lr(&self) -> f32;

    /// Set learning rate.
    fn set_lr(&mut self, lr: f32);
}

/// Per-parameter state buffers, grown lazily on first use.
fn ensure_state(buffers: &mut Vec<Vec<f32>>, idx: usize, len: usize) {
    if idx >= buffers.len() {
        buffers.resize(idx + 1, Vec::new());
    }
    if buffers[idx].len() != len {
        buffers[idx] = vec![0.0; len];
    }
}

/// Stochastic Gradient Descent with optional momentum.
///
/// ```text
/// v_t = momentum * v_{t-1} + grad
/// param = param - lr * v_t                       (classic)
/// param = param - lr * (momentum * v_t + grad)   (Nesterov)
/// ```
#[derive(Debug)]
pub struct SGD {
    param_ids: Vec<TensorId>,
    lr: f32,
    momentum: f32,
    weight_decay: f32,
    nesterov: bool,
    velocities: Vec<Vec<f32>>,
}

impl SGD {
    /// Create a new SGD optimizer.
    #[allow(clippy::needless_pass_by_value)]
    #[must_use]
    pub fn new(params: Vec<&mut Tensor>, lr: f32) -> Self {
        Self {
            param_ids: params.iter().map(|p| p.id()).collect(),
            lr,
            momentum: 0.0,
            weight_decay: 0.0,
            nesterov: false,
            velocities: Vec::new(),
        }
    }

    /// Set the momentum factor.
    #[must_use]
    pub fn momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }

    /// Enable Nesterov momentum.
    #[must_use]
    pub fn nesterov(mut self) -> Self {
        self.nesterov = true;
        self
    }

    /// Set weight decay (L2 regularization).
    #[must_use]
    pub fn weight_decay(mut self, wd: f32) -> Self {
        self.weight_decay = wd;
        self
    }

    fn update_param(&mut self, param: &mut Tensor, idx: usize) {
        let Some(grad) = get_grad(param.id()) else {
            return;
        };
        let param_data = param.data_mut();
        ensure_state(&mut self.velocities, idx, param_data.len());
        let velocity = &mut self.velocities[idx];

        for ((p, &g), v) in param_data.iter_mut().zip(grad.data()).zip(velocity) {
            let g = g + self.weight_decay * *p;
            if self.momentum == 0.0 {
                *p -= self.lr * g;
                continue;
            }
            *v = self.momentum * *v + g;
            let direction = if self.nesterov {
                self.momentum * *v + g
            } else {
                *v
            };
            *p -= self.lr * direction;
        }
    }
}

impl Optimizer for SGD {
    fn step_with_params(&mut self, params: &mut [&mut Tensor]) {
        for (idx, param) in params.iter_mut().enumerate() {
            self.update_param(param, idx);
        }
    }

    fn zero_grad(&mut self) {
        for &id in &self.param_ids {
            clear_grad(id);
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}

/// Adam optimizer (Kingma & Ba, 2015).
///
/// ```text
/// m_t = β₁ * m_{t-1} + (1 - β₁) * grad
/// v_t = β₂ * v_{t-1} + (1 - β₂) * grad²
/// param = param - lr * m̂_t / (√v̂_t + ε)
/// ```
#[derive(Debug)]
pub struct Adam {
    param_ids: Vec<TensorId>,
    lr: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    weight_decay: f32,
    m: Vec<Vec<f32>>,
    v: Vec<Vec<f32>>,
    t: i32,
}

impl Adam {
    /// Create a new Adam optimizer (β₁=0.9, β₂=0.999, ε=1e-8).
    #[allow(clippy::needless_pass_by_value)]
    #[must_use]
    pub fn new(params: Vec<&mut Tensor>, lr: f32) -> Self {
        Self {
            param_ids: params.iter().map(|p| p.id()).collect(),
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.0,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    /// Set beta parameters.
    #[must_use]
    pub fn betas(mut self, beta1: f32, beta2: f32) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    /// Set epsilon.
    #[must_use]
    pub fn eps(mut self, eps: f32) -> Self {
        self.eps = eps;
        self
    }

    /// Set weight decay (added to the gradient).
    #[must_use]
    pub fn weight_decay(mut self, wd: f32) -> Self {
        self.weight_decay = wd;
        self
    }

    /// Number of steps taken so far.
    #[must_use]
    pub fn steps(&self) -> i32 {
        self.t
    }

    fn update_param(&mut self, param: &mut Tensor, idx: usize) {
        let Some(grad) = get_grad(param.id()) else {
            return;
        };
        let param_data = param.data_mut();
        ensure_state(&mut self.m, idx, param_data.len());
        ensure_state(&mut self.v, idx, param_data.len());

        let bias_correction1 = 1.0 - self.beta1.powi(self.t);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t);
        let (m, v) = (&mut self.m[idx], &mut self.v[idx]);

        for (i, p) in param_data.iter_mut().enumerate() {
            let g = grad.data()[i] + self.weight_decay * *p;
            m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * g;
            v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * g * g;

            let m_hat = m[i] / bias_correction1;
            let v_hat = v[i] / bias_correction2;
            *p -= self.lr * m_hat / (v_hat.sqrt() + self.eps);
        }
    }
}

impl Optimizer for Adam {
    fn step_with_params(&mut self, params: &mut [&mut Tensor]) {
        self.t += 1;
        for (idx, param) in params.iter_mut().enumerate() {
            self.update_param(param, idx);
        }
    }

    fn zero_grad(&mut self) {
        for &id in &self.param_ids {
            clear_grad(id);
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::clear_graph;

    /// Gradient of Σ(p - target)² is 2(p - target).
    fn quadratic_step(p: &Tensor, target: f32) {
        let t = Tensor::full(p.shape(), target);
        p.sub(&t).pow(2.0).sum().backward();
    }

    #[test]
    fn test_sgd_vanilla_update() {
        clear_graph();
        let mut p = Tensor::from_slice(&[1.0, -1.0]).requires_grad();
        let mut opt = SGD::new(vec![&mut p], 0.1);

        quadratic_step(&p, 0.0);
        opt.step_with_params(&mut [&mut p]);

        // p - 0.1 * 2p = 0.8p
        assert!((p.data()[0] - 0.8).abs() < 1e-6);
        assert!((p.data()[1] + 0.8).abs() < 1e-6);
        clear_graph();
    }

    #[test]
    fn test_sgd_momentum_accumulates() {
        clear_graph();
        let mut p = Tensor::from_slice(&[1.0]).requires_grad();
        let mut opt = SGD::new(vec![&mut p], 0.1).momentum(0.9);

        quadratic_step(&p, 0.0);
        opt.step_with_params(&mut [&mut p]);
        let after_first = p.data()[0];
        clear_graph();

        quadratic_step(&p, 0.0);
        opt.step_with_params(&mut [&mut p]);
        let second_move = after_first - p.data()[0];

        // v2 = 0.9 * 2.0 + 2 * 0.8, step = 0.1 * v2
        assert!((second_move - 0.1 * (1.8 + 1.6)).abs() < 1e-5);
        clear_graph();
    }

    #[test]
    fn test_adam_first_step_is_lr() {
        clear_graph();
        let mut p = Tensor::from_slice(&[3.0, -2.0]).requires_grad();
        let mut opt = Adam::new(vec![&mut p], 0.01);

        quadratic_step(&p, 0.0);
        opt.step_with_params(&mut [&mut p]);

        // bias-corrected first step moves by lr * sign(grad)
        assert!((p.data()[0] - 2.99).abs() < 1e-4);
        assert!((p.data()[1] + 1.99).abs() < 1e-4);
        assert_eq!(opt.steps(), 1);
        clear_graph();
    }

    #[test]
    fn test_adam_converges_on_quadratic() {
        let mut p = Tensor::from_slice(&[5.0]).requires_grad();
        let mut opt = Adam::new(vec![&mut p], 0.1);

        for _ in 0..300 {
            clear_graph();
            quadratic_step(&p, 1.5);
            opt.step_with_params(&mut [&mut p]);
        }
        clear_graph();
        assert!((p.data()[0] - 1.5).abs() < 0.05, "got {}", p.data()[0]);
    }

    #[test]
    fn test_missing_gradient_is_skipped() {
        clear_graph();
        let mut p = Tensor::from_slice(&[1.0]).requires_grad();
        let mut opt = Adam::new(vec![&mut p], 0.1);
        opt.step_with_params(&mut [&mut p]);
        assert_eq!(p.data(), &[1.0]);
    }

    #[test]
    fn test_zero_grad_and_lr() {
        clear_graph();
        let mut p = Tensor::from_slice(&[1.0]).requires_grad();
        let mut opt = SGD::new(vec![&mut p], 0.1);
        quadratic_step(&p, 0.0);
        assert!(get_grad(p.id()).is_some());

        opt.zero_grad();
        assert!(get_grad(p.id()).is_none());

        opt.set_lr(0.5);
        assert!((opt.lr() - 0.5).abs() < f32::EPSILON);
        clear_graph();
    }
}
