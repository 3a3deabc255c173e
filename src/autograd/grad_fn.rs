//! Gradient function trait and implementations.
//!
//! Each differentiable operation implements `GradFn` to define how gradients
//! flow backward through it. Implementations capture only what the backward
//! rule needs (inputs, outputs, or index maps).

use super::tensor::Tensor;

/// Trait for functions that compute gradients during backward pass.
///
/// For element-wise addition z = x + y, ∂z/∂x = ∂z/∂y = 1, so
/// `backward(grad_output)` returns `[grad_output, grad_output]`.
pub trait GradFn: Send + Sync {
    /// Compute gradients with respect to inputs, in input order.
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor>;

    /// Human-readable name for debugging.
    fn name(&self) -> &'static str;
}

/// Map an element-wise gradient back onto an input's shape.
///
/// Inputs either match the output element count (reshape) or are scalars
/// broadcast over it (sum).
fn reduce_to_shape(grad: &Tensor, shape: &[usize]) -> Tensor {
    let numel: usize = shape.iter().product();
    if numel == grad.numel() {
        Tensor::new(grad.data(), shape)
    } else {
        debug_assert_eq!(numel, 1, "cannot reduce gradient onto shape {shape:?}");
        let total: f32 = grad.data().iter().sum();
        Tensor::full(shape, total)
    }
}

fn map_grad(grad_output: &Tensor, f: impl Fn(f32) -> f32) -> Tensor {
    let data = grad_output.data().iter().map(|&g| f(g)).collect();
    Tensor::from_vec(data, grad_output.shape())
}

fn zip_grad(grad_output: &Tensor, saved: &Tensor, f: impl Fn(f32, f32) -> f32) -> Tensor {
    let data = grad_output
        .data()
        .iter()
        .zip(saved.data())
        .map(|(&g, &s)| f(g, s))
        .collect();
    Tensor::from_vec(data, grad_output.shape())
}

// ============================================================================
// Element-wise Operations
// ============================================================================

pub(crate) struct AddBackward {
    pub(crate) x_shape: Vec<usize>,
    pub(crate) y_shape: Vec<usize>,
}

impl GradFn for AddBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        vec![
            reduce_to_shape(grad_output, &self.x_shape),
            reduce_to_shape(grad_output, &self.y_shape),
        ]
    }

    fn name(&self) -> &'static str {
        "AddBackward"
    }
}

pub(crate) struct SubBackward {
    pub(crate) x_shape: Vec<usize>,
    pub(crate) y_shape: Vec<usize>,
}

impl GradFn for SubBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let neg = map_grad(grad_output, |g| -g);
        vec![
            reduce_to_shape(grad_output, &self.x_shape),
            reduce_to_shape(&neg, &self.y_shape),
        ]
    }

    fn name(&self) -> &'static str {
        "SubBackward"
    }
}

pub(crate) struct MulBackward {
    pub(crate) x: Tensor,
    pub(crate) y: Tensor,
}

impl GradFn for MulBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂(x*y)/∂x = y, ∂(x*y)/∂y = x
        let grad_x = zip_grad(grad_output, &self.y, |g, y| g * y);
        let grad_y = zip_grad(grad_output, &self.x, |g, x| g * x);
        vec![
            reduce_to_shape(&grad_x, self.x.shape()),
            reduce_to_shape(&grad_y, self.y.shape()),
        ]
    }

    fn name(&self) -> &'static str {
        "MulBackward"
    }
}

pub(crate) struct DivBackward {
    pub(crate) x: Tensor,
    pub(crate) y: Tensor,
}

impl GradFn for DivBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂(x/y)/∂x = 1/y, ∂(x/y)/∂y = -x/y²
        let grad_x = zip_grad(grad_output, &self.y, |g, y| g / y);
        let grad_y_data = grad_output
            .data()
            .iter()
            .zip(self.x.data())
            .zip(self.y.data())
            .map(|((&g, &x), &y)| -g * x / (y * y))
            .collect();
        let grad_y = Tensor::from_vec(grad_y_data, grad_output.shape());
        vec![
            reduce_to_shape(&grad_x, self.x.shape()),
            reduce_to_shape(&grad_y, self.y.shape()),
        ]
    }

    fn name(&self) -> &'static str {
        "DivBackward"
    }
}

pub(crate) struct NegBackward;

impl GradFn for NegBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        vec![map_grad(grad_output, |g| -g)]
    }

    fn name(&self) -> &'static str {
        "NegBackward"
    }
}

/// z = x * c for a constant c
pub(crate) struct ScaleBackward {
    pub(crate) factor: f32,
}

impl GradFn for ScaleBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        vec![map_grad(grad_output, |g| g * self.factor)]
    }

    fn name(&self) -> &'static str {
        "ScaleBackward"
    }
}

/// z = x + c for a constant c
pub(crate) struct ShiftBackward;

impl GradFn for ShiftBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        vec![grad_output.clone()]
    }

    fn name(&self) -> &'static str {
        "ShiftBackward"
    }
}

// ============================================================================
// Transcendental Operations
// ============================================================================

pub(crate) struct ExpBackward {
    /// exp(x), saved instead of x
    pub(crate) output: Tensor,
}

impl GradFn for ExpBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        vec![zip_grad(grad_output, &self.output, |g, e| g * e)]
    }

    fn name(&self) -> &'static str {
        "ExpBackward"
    }
}

pub(crate) struct LogBackward {
    pub(crate) x: Tensor,
}

impl GradFn for LogBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        vec![zip_grad(grad_output, &self.x, |g, x| g / x)]
    }

    fn name(&self) -> &'static str {
        "LogBackward"
    }
}

pub(crate) struct PowBackward {
    pub(crate) x: Tensor,
    pub(crate) n: f32,
}

impl GradFn for PowBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂(x^n)/∂x = n * x^(n-1)
        vec![zip_grad(grad_output, &self.x, |g, x| {
            g * self.n * x.powf(self.n - 1.0)
        })]
    }

    fn name(&self) -> &'static str {
        "PowBackward"
    }
}

pub(crate) struct SqrtBackward {
    pub(crate) output: Tensor,
}

impl GradFn for SqrtBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        vec![zip_grad(grad_output, &self.output, |g, s| g * 0.5 / s)]
    }

    fn name(&self) -> &'static str {
        "SqrtBackward"
    }
}

pub(crate) struct AbsBackward {
    pub(crate) x: Tensor,
}

impl GradFn for AbsBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // subgradient 0 at the kink
        vec![zip_grad(grad_output, &self.x, |g, x| {
            if x > 0.0 {
                g
            } else if x < 0.0 {
                -g
            } else {
                0.0
            }
        })]
    }

    fn name(&self) -> &'static str {
        "AbsBackward"
    }
}

// ============================================================================
// Reduction Operations
// ============================================================================

pub(crate) struct SumBackward {
    pub(crate) input_shape: Vec<usize>,
}

impl GradFn for SumBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        vec![Tensor::full(&self.input_shape, grad_output.item())]
    }

    fn name(&self) -> &'static str {
        "SumBackward"
    }
}

pub(crate) struct MeanBackward {
    pub(crate) input_shape: Vec<usize>,
}

impl GradFn for MeanBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let numel: usize = self.input_shape.iter().product();
        let g = grad_output.item() / numel as f32;
        vec![Tensor::full(&self.input_shape, g)]
    }

    fn name(&self) -> &'static str {
        "MeanBackward"
    }
}

// ============================================================================
// Activation Functions
// ============================================================================

pub(crate) struct ReluBackward {
    pub(crate) x: Tensor,
}

impl GradFn for ReluBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        vec![zip_grad(grad_output, &self.x, |g, x| {
            if x > 0.0 {
                g
            } else {
                0.0
            }
        })]
    }

    fn name(&self) -> &'static str {
        "ReluBackward"
    }
}

pub(crate) struct SoftplusBackward {
    pub(crate) x: Tensor,
    pub(crate) threshold: f32,
}

impl GradFn for SoftplusBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // d softplus(x)/dx = sigmoid(x); identity above the threshold
        vec![zip_grad(grad_output, &self.x, |g, x| {
            if x > self.threshold {
                g
            } else {
                g / (1.0 + (-x).exp())
            }
        })]
    }

    fn name(&self) -> &'static str {
        "SoftplusBackward"
    }
}

// ============================================================================
// Linear Algebra and Shape
// ============================================================================

pub(crate) struct MatmulBackward {
    pub(crate) x: Tensor,
    pub(crate) y: Tensor,
}

impl GradFn for MatmulBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // z = x @ y, x: [m, k], y: [k, n]
        // ∂L/∂x = g @ yᵀ, ∂L/∂y = xᵀ @ g
        let (m, k) = self.x.dims2();
        let n = self.y.shape()[1];
        let g = grad_output.data();
        let x = self.x.data();
        let y = self.y.data();

        let mut grad_x = vec![0.0; m * k];
        for i in 0..m {
            for p in 0..k {
                let mut acc = 0.0;
                for j in 0..n {
                    acc += g[i * n + j] * y[p * n + j];
                }
                grad_x[i * k + p] = acc;
            }
        }

        let mut grad_y = vec![0.0; k * n];
        for i in 0..m {
            for p in 0..k {
                let xv = x[i * k + p];
                if xv == 0.0 {
                    continue;
                }
                for j in 0..n {
                    grad_y[p * n + j] += xv * g[i * n + j];
                }
            }
        }

        vec![
            Tensor::from_vec(grad_x, &[m, k]),
            Tensor::from_vec(grad_y, &[k, n]),
        ]
    }

    fn name(&self) -> &'static str {
        "MatmulBackward"
    }
}

pub(crate) struct TransposeBackward;

impl GradFn for TransposeBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let (rows, cols) = grad_output.dims2();
        let g = grad_output.data();
        let mut data = vec![0.0; rows * cols];
        for i in 0..rows {
            for j in 0..cols {
                data[j * rows + i] = g[i * cols + j];
            }
        }
        vec![Tensor::from_vec(data, &[cols, rows])]
    }

    fn name(&self) -> &'static str {
        "TransposeBackward"
    }
}

/// z = X + b broadcast over rows; X: [rows, cols], b: [cols]
pub(crate) struct BroadcastAddBackward {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
}

impl GradFn for BroadcastAddBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let mut grad_b = vec![0.0; self.cols];
        for row in grad_output.data().chunks(self.cols) {
            for (acc, &g) in grad_b.iter_mut().zip(row) {
                *acc += g;
            }
        }
        vec![
            Tensor::new(grad_output.data(), &[self.rows, self.cols]),
            Tensor::from_vec(grad_b, &[self.cols]),
        ]
    }

    fn name(&self) -> &'static str {
        "BroadcastAddBackward"
    }
}

pub(crate) struct ViewBackward {
    pub(crate) input_shape: Vec<usize>,
}

impl GradFn for ViewBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        vec![Tensor::new(grad_output.data(), &self.input_shape)]
    }

    fn name(&self) -> &'static str {
        "ViewBackward"
    }
}

/// z = X[:, start..start + width]
pub(crate) struct SliceColsBackward {
    pub(crate) start: usize,
    pub(crate) total_cols: usize,
}

impl GradFn for SliceColsBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let (rows, width) = grad_output.dims2();
        let mut data = vec![0.0; rows * self.total_cols];
        for (r, g_row) in grad_output.data().chunks(width).enumerate() {
            let offset = r * self.total_cols + self.start;
            data[offset..offset + width].copy_from_slice(g_row);
        }
        vec![Tensor::from_vec(data, &[rows, self.total_cols])]
    }

    fn name(&self) -> &'static str {
        "SliceColsBackward"
    }
}

/// z = [X₀ | X₁ | …] along columns
pub(crate) struct CatColsBackward {
    pub(crate) widths: Vec<usize>,
}

impl GradFn for CatColsBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let (rows, total) = grad_output.dims2();
        let g = grad_output.data();
        let mut start = 0;
        self.widths
            .iter()
            .map(|&w| {
                let mut data = Vec::with_capacity(rows * w);
                for r in 0..rows {
                    data.extend_from_slice(&g[r * total + start..r * total + start + w]);
                }
                start += w;
                Tensor::from_vec(data, &[rows, w])
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "CatColsBackward"
    }
}

// ============================================================================
// Gather / Scatter (message passing)
// ============================================================================

/// z[e] = X[indices[e]]
pub(crate) struct IndexSelectBackward {
    pub(crate) indices: Vec<usize>,
    pub(crate) num_rows: usize,
}

impl GradFn for IndexSelectBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let (_, cols) = grad_output.dims2();
        let mut data = vec![0.0; self.num_rows * cols];
        for (g_row, &idx) in grad_output.data().chunks(cols).zip(&self.indices) {
            for (acc, &g) in data[idx * cols..(idx + 1) * cols].iter_mut().zip(g_row) {
                *acc += g;
            }
        }
        vec![Tensor::from_vec(data, &[self.num_rows, cols])]
    }

    fn name(&self) -> &'static str {
        "IndexSelectBackward"
    }
}

/// z[n] = Σ_{e: index[e] = n} X[e] (optionally divided by the count)
pub(crate) struct ScatterSumBackward {
    pub(crate) index: Vec<usize>,
    /// Per-output-row divisor; all ones for plain sums
    pub(crate) scale: Vec<f32>,
}

impl GradFn for ScatterSumBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let (_, cols) = grad_output.dims2();
        let g = grad_output.data();
        let mut data = Vec::with_capacity(self.index.len() * cols);
        for &n in &self.index {
            let s = self.scale[n];
            data.extend(g[n * cols..(n + 1) * cols].iter().map(|&v| v * s));
        }
        vec![Tensor::from_vec(data, &[self.index.len(), cols])]
    }

    fn name(&self) -> &'static str {
        "ScatterSumBackward"
    }
}

/// z[n, c] = max_{e: index[e] = n} X[e, c]
pub(crate) struct ScatterMaxBackward {
    /// Winning source row per output element, `None` for isolated nodes
    pub(crate) winners: Vec<Option<usize>>,
    pub(crate) num_src_rows: usize,
}

impl GradFn for ScatterMaxBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let (_, cols) = grad_output.dims2();
        let mut data = vec![0.0; self.num_src_rows * cols];
        for (flat, (&g, winner)) in grad_output.data().iter().zip(&self.winners).enumerate() {
            if let Some(src) = winner {
                data[src * cols + flat % cols] += g;
            }
        }
        vec![Tensor::from_vec(data, &[self.num_src_rows, cols])]
    }

    fn name(&self) -> &'static str {
        "ScatterMaxBackward"
    }
}
