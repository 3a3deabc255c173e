//! Differentiable operations for tensors.
//!
//! Each operation:
//! 1. Computes the forward result
//! 2. Records a `GradFn` to the computation graph (if gradient tracking is
//!    enabled and any input requires gradients)

use std::sync::Arc;

use super::grad_fn::{
    AbsBackward, AddBackward, BroadcastAddBackward, CatColsBackward, DivBackward, ExpBackward,
    GradFn, IndexSelectBackward, LogBackward, MatmulBackward, MeanBackward, MulBackward,
    NegBackward, PowBackward, ReluBackward, ScaleBackward, ScatterMaxBackward,
    ScatterSumBackward, ShiftBackward, SliceColsBackward, SoftplusBackward, SqrtBackward,
    SubBackward, SumBackward, TransposeBackward, ViewBackward,
};
use super::tensor::Tensor;
use super::{is_grad_enabled, with_graph};

/// Softplus switches to the identity above this input, as in PyTorch.
const SOFTPLUS_THRESHOLD: f32 = 20.0;

/// Reduction used when scattering edge rows onto destination nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScatterReduce {
    /// Sum of incoming rows
    #[default]
    Add,
    /// Mean of incoming rows (0 for nodes without incoming rows)
    Mean,
    /// Element-wise maximum of incoming rows (0 for nodes without incoming rows)
    Max,
}

/// Attach `grad_fn` to `result` and put it on the tape when any input
/// participates in differentiation.
fn record(mut result: Tensor, inputs: &[&Tensor], grad_fn: impl FnOnce() -> Arc<dyn GradFn>) -> Tensor {
    if !is_grad_enabled() || !inputs.iter().any(|t| t.requires_grad_enabled()) {
        return result;
    }

    let grad_fn = grad_fn();
    result.requires_grad_(true);
    result.set_grad_fn(grad_fn.clone());

    with_graph(|graph| {
        for input in inputs {
            graph.register_tensor(input);
        }
        graph.record(
            result.id(),
            grad_fn,
            inputs.iter().map(|t| t.id()).collect(),
        );
    });

    result
}

fn assert_same_numel(op: &str, a: &Tensor, b: &Tensor) {
    assert_eq!(
        a.numel(),
        b.numel(),
        "{op}: element count mismatch {:?} vs {:?}",
        a.shape(),
        b.shape()
    );
}

fn zip_with(a: &Tensor, b: &Tensor, f: impl Fn(f32, f32) -> f32) -> Tensor {
    let data = a
        .data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| f(x, y))
        .collect();
    Tensor::from_vec(data, a.shape())
}

fn map(a: &Tensor, f: impl Fn(f32) -> f32) -> Tensor {
    Tensor::from_vec(a.data().iter().map(|&x| f(x)).collect(), a.shape())
}

// ============================================================================
// Element-wise Operations
// ============================================================================

impl Tensor {
    /// Element-wise addition: z = self + other
    #[must_use]
    pub fn add(&self, other: &Tensor) -> Tensor {
        assert_same_numel("add", self, other);
        let result = zip_with(self, other, |a, b| a + b);
        record(result, &[self, other], || {
            Arc::new(AddBackward {
                x_shape: self.shape().to_vec(),
                y_shape: other.shape().to_vec(),
            })
        })
    }

    /// Element-wise subtraction: z = self - other
    #[must_use]
    pub fn sub(&self, other: &Tensor) -> Tensor {
        assert_same_numel("sub", self, other);
        let result = zip_with(self, other, |a, b| a - b);
        record(result, &[self, other], || {
            Arc::new(SubBackward {
                x_shape: self.shape().to_vec(),
                y_shape: other.shape().to_vec(),
            })
        })
    }

    /// Element-wise multiplication: z = self * other
    #[must_use]
    pub fn mul(&self, other: &Tensor) -> Tensor {
        assert_same_numel("mul", self, other);
        let result = zip_with(self, other, |a, b| a * b);
        record(result, &[self, other], || {
            Arc::new(MulBackward {
                x: self.detach(),
                y: other.detach(),
            })
        })
    }

    /// Element-wise division: z = self / other
    #[must_use]
    pub fn div(&self, other: &Tensor) -> Tensor {
        assert_same_numel("div", self, other);
        let result = zip_with(self, other, |a, b| a / b);
        record(result, &[self, other], || {
            Arc::new(DivBackward {
                x: self.detach(),
                y: other.detach(),
            })
        })
    }

    /// Element-wise negation: z = -self
    #[must_use]
    pub fn neg(&self) -> Tensor {
        record(map(self, |a| -a), &[self], || Arc::new(NegBackward))
    }

    /// Scalar multiplication: z = self * scalar
    #[must_use]
    pub fn mul_scalar(&self, scalar: f32) -> Tensor {
        record(map(self, |a| a * scalar), &[self], || {
            Arc::new(ScaleBackward { factor: scalar })
        })
    }

    /// Scalar addition: z = self + scalar
    #[must_use]
    pub fn add_scalar(&self, scalar: f32) -> Tensor {
        record(map(self, |a| a + scalar), &[self], || Arc::new(ShiftBackward))
    }

    /// Element-wise absolute value: z = |self|
    #[must_use]
    pub fn abs(&self) -> Tensor {
        record(map(self, f32::abs), &[self], || {
            Arc::new(AbsBackward { x: self.detach() })
        })
    }
}

// ============================================================================
// Transcendental Operations
// ============================================================================

impl Tensor {
    /// Element-wise exponential: z = exp(self)
    #[must_use]
    pub fn exp(&self) -> Tensor {
        let result = map(self, f32::exp);
        let output = result.detach();
        record(result, &[self], || Arc::new(ExpBackward { output }))
    }

    /// Element-wise natural logarithm: z = ln(self)
    #[must_use]
    pub fn log(&self) -> Tensor {
        record(map(self, f32::ln), &[self], || {
            Arc::new(LogBackward { x: self.detach() })
        })
    }

    /// Element-wise power: z = self^n
    #[must_use]
    pub fn pow(&self, n: f32) -> Tensor {
        record(map(self, |a| a.powf(n)), &[self], || {
            Arc::new(PowBackward {
                x: self.detach(),
                n,
            })
        })
    }

    /// Element-wise square root: z = √self
    #[must_use]
    pub fn sqrt(&self) -> Tensor {
        let result = map(self, f32::sqrt);
        let output = result.detach();
        record(result, &[self], || Arc::new(SqrtBackward { output }))
    }
}

// ============================================================================
// Reduction Operations
// ============================================================================

impl Tensor {
    /// Sum all elements: z = Σ self
    #[must_use]
    pub fn sum(&self) -> Tensor {
        let sum: f32 = self.data().iter().sum();
        record(Tensor::new(&[sum], &[1]), &[self], || {
            Arc::new(SumBackward {
                input_shape: self.shape().to_vec(),
            })
        })
    }

    /// Mean of all elements
    #[must_use]
    pub fn mean(&self) -> Tensor {
        let sum: f32 = self.data().iter().sum();
        let mean = sum / self.numel() as f32;
        record(Tensor::new(&[mean], &[1]), &[self], || {
            Arc::new(MeanBackward {
                input_shape: self.shape().to_vec(),
            })
        })
    }
}

// ============================================================================
// Activation Functions
// ============================================================================

impl Tensor {
    /// `ReLU` activation: z = max(0, self)
    #[must_use]
    pub fn relu(&self) -> Tensor {
        record(map(self, |a| a.max(0.0)), &[self], || {
            Arc::new(ReluBackward { x: self.detach() })
        })
    }

    /// Softplus activation: z = ln(1 + exp(self)), linear above 20.
    #[must_use]
    pub fn softplus(&self) -> Tensor {
        let result = map(self, |a| {
            if a > SOFTPLUS_THRESHOLD {
                a
            } else {
                a.exp().ln_1p()
            }
        });
        record(result, &[self], || {
            Arc::new(SoftplusBackward {
                x: self.detach(),
                threshold: SOFTPLUS_THRESHOLD,
            })
        })
    }
}

// ============================================================================
// Linear Algebra
// ============================================================================

impl Tensor {
    /// Matrix multiplication: z = self @ other (2-D only)
    #[must_use]
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        let (m, k1) = self.dims2();
        let (k2, n) = other.dims2();
        assert_eq!(k1, k2, "matmul dimension mismatch: {k1} vs {k2}");

        let a = self.data();
        let b = other.data();
        let mut data = vec![0.0; m * n];
        for i in 0..m {
            let out_row = &mut data[i * n..(i + 1) * n];
            for p in 0..k1 {
                let av = a[i * k1 + p];
                if av == 0.0 {
                    continue;
                }
                for (o, &bv) in out_row.iter_mut().zip(&b[p * n..(p + 1) * n]) {
                    *o += av * bv;
                }
            }
        }

        record(Tensor::from_vec(data, &[m, n]), &[self, other], || {
            Arc::new(MatmulBackward {
                x: self.detach(),
                y: other.detach(),
            })
        })
    }

    /// Transpose a 2-D tensor.
    #[must_use]
    pub fn transpose(&self) -> Tensor {
        let (rows, cols) = self.dims2();
        let src = self.data();
        let mut data = vec![0.0; rows * cols];
        for i in 0..rows {
            for j in 0..cols {
                data[j * rows + i] = src[i * cols + j];
            }
        }

        record(Tensor::from_vec(data, &[cols, rows]), &[self], || {
            Arc::new(TransposeBackward)
        })
    }

    /// Broadcast addition of a row vector: `[N, M] + [M] -> [N, M]`.
    ///
    /// Used for layer biases.
    #[must_use]
    pub fn broadcast_add(&self, other: &Tensor) -> Tensor {
        let (rows, cols) = self.dims2();
        assert_eq!(other.ndim(), 1, "broadcast_add requires 1D vector");
        assert_eq!(
            cols,
            other.shape()[0],
            "Matrix columns {cols} must match vector length {}",
            other.shape()[0]
        );

        let bias = other.data();
        let mut data = self.data().to_vec();
        for row in data.chunks_mut(cols) {
            for (v, &b) in row.iter_mut().zip(bias) {
                *v += b;
            }
        }

        record(Tensor::from_vec(data, self.shape()), &[self, other], || {
            Arc::new(BroadcastAddBackward { rows, cols })
        })
    }

    /// Reshape tensor to a new shape (row-major order is preserved).
    #[must_use]
    pub fn view(&self, new_shape: &[usize]) -> Tensor {
        let new_numel: usize = new_shape.iter().product();
        assert_eq!(
            self.numel(),
            new_numel,
            "view: number of elements must match ({} vs {new_numel})",
            self.numel()
        );

        record(Tensor::new(self.data(), new_shape), &[self], || {
            Arc::new(ViewBackward {
                input_shape: self.shape().to_vec(),
            })
        })
    }
}

// ============================================================================
// Column slicing and concatenation
// ============================================================================

impl Tensor {
    /// Columns `start..start + width` of a 2-D tensor.
    #[must_use]
    pub fn slice_cols(&self, start: usize, width: usize) -> Tensor {
        let (rows, cols) = self.dims2();
        assert!(
            start + width <= cols,
            "slice_cols: {start}..{} out of range for {cols} columns",
            start + width
        );

        let mut data = Vec::with_capacity(rows * width);
        for row in self.data().chunks(cols) {
            data.extend_from_slice(&row[start..start + width]);
        }

        record(Tensor::from_vec(data, &[rows, width]), &[self], || {
            Arc::new(SliceColsBackward {
                start,
                total_cols: cols,
            })
        })
    }

    /// Column `j` as an `[N, 1]` tensor.
    #[must_use]
    pub fn column(&self, j: usize) -> Tensor {
        self.slice_cols(j, 1)
    }

    /// Concatenate 2-D tensors with equal row counts along columns.
    ///
    /// # Panics
    ///
    /// Panics if `parts` is empty or the row counts differ.
    #[must_use]
    pub fn cat_cols(parts: &[&Tensor]) -> Tensor {
        assert!(!parts.is_empty(), "cat_cols requires at least one tensor");
        let rows = parts[0].dims2().0;
        let widths: Vec<usize> = parts
            .iter()
            .map(|p| {
                let (r, w) = p.dims2();
                assert_eq!(r, rows, "cat_cols: row count mismatch ({r} vs {rows})");
                w
            })
            .collect();
        let total: usize = widths.iter().sum();

        let mut data = Vec::with_capacity(rows * total);
        for r in 0..rows {
            for (part, &w) in parts.iter().zip(&widths) {
                data.extend_from_slice(&part.data()[r * w..(r + 1) * w]);
            }
        }

        record(Tensor::from_vec(data, &[rows, total]), parts, || {
            Arc::new(CatColsBackward { widths })
        })
    }
}

// ============================================================================
// Gather / Scatter
// ============================================================================

impl Tensor {
    /// Gather rows: `z[e] = self[indices[e]]`.
    #[must_use]
    pub fn index_select(&self, indices: &[usize]) -> Tensor {
        let (rows, cols) = self.dims2();
        let src = self.data();
        let mut data = Vec::with_capacity(indices.len() * cols);
        for &idx in indices {
            assert!(idx < rows, "index_select: row {idx} out of range for {rows} rows");
            data.extend_from_slice(&src[idx * cols..(idx + 1) * cols]);
        }

        record(
            Tensor::from_vec(data, &[indices.len(), cols]),
            &[self],
            || {
                Arc::new(IndexSelectBackward {
                    indices: indices.to_vec(),
                    num_rows: rows,
                })
            },
        )
    }

    /// Reduce rows onto `num_rows` output rows: row `e` goes to `index[e]`.
    ///
    /// For `Add` the result is independent of the order of the rows.
    #[must_use]
    pub fn scatter(&self, index: &[usize], num_rows: usize, reduce: ScatterReduce) -> Tensor {
        let (src_rows, cols) = self.dims2();
        assert_eq!(
            index.len(),
            src_rows,
            "scatter: index length {} must match row count {src_rows}",
            index.len()
        );
        assert!(
            index.iter().all(|&n| n < num_rows),
            "scatter: destination index out of range for {num_rows} rows"
        );

        let src = self.data();
        match reduce {
            ScatterReduce::Add | ScatterReduce::Mean => {
                let mut data = vec![0.0; num_rows * cols];
                let mut counts = vec![0usize; num_rows];
                for (row, &n) in src.chunks(cols).zip(index) {
                    counts[n] += 1;
                    for (acc, &v) in data[n * cols..(n + 1) * cols].iter_mut().zip(row) {
                        *acc += v;
                    }
                }

                let scale: Vec<f32> = match reduce {
                    ScatterReduce::Mean => counts
                        .iter()
                        .map(|&c| if c > 0 { 1.0 / c as f32 } else { 0.0 })
                        .collect(),
                    _ => vec![1.0; num_rows],
                };
                if reduce == ScatterReduce::Mean {
                    for (row, &s) in data.chunks_mut(cols).zip(&scale) {
                        row.iter_mut().for_each(|v| *v *= s);
                    }
                }

                record(Tensor::from_vec(data, &[num_rows, cols]), &[self], || {
                    Arc::new(ScatterSumBackward {
                        index: index.to_vec(),
                        scale,
                    })
                })
            }
            ScatterReduce::Max => {
                let mut data = vec![0.0; num_rows * cols];
                let mut winners: Vec<Option<usize>> = vec![None; num_rows * cols];
                for (e, (row, &n)) in src.chunks(cols).zip(index).enumerate() {
                    for (c, &v) in row.iter().enumerate() {
                        let slot = n * cols + c;
                        if winners[slot].map_or(true, |_| v > data[slot]) {
                            data[slot] = v;
                            winners[slot] = Some(e);
                        }
                    }
                }

                record(Tensor::from_vec(data, &[num_rows, cols]), &[self], || {
                    Arc::new(ScatterMaxBackward {
                        winners,
                        num_src_rows: src_rows,
                    })
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{clear_graph, get_grad, no_grad};

    /// Numerical gradient check using central differences.
    fn numerical_gradient<F>(f: &F, x: &Tensor, eps: f32) -> Vec<f32>
    where
        F: Fn(&Tensor) -> Tensor,
    {
        (0..x.numel())
            .map(|i| {
                let mut x_plus = x.data().to_vec();
                let mut x_minus = x.data().to_vec();
                x_plus[i] += eps;
                x_minus[i] -= eps;

                let y_plus = no_grad(|| f(&Tensor::new(&x_plus, x.shape())).item());
                let y_minus = no_grad(|| f(&Tensor::new(&x_minus, x.shape())).item());
                (y_plus - y_minus) / (2.0 * eps)
            })
            .collect()
    }

    fn check_gradient<F>(f: F, x: &Tensor, tol: f32)
    where
        F: Fn(&Tensor) -> Tensor,
    {
        clear_graph();
        let x_grad = x.clone().requires_grad();
        f(&x_grad).backward();
        let analytical = get_grad(x_grad.id()).expect("No gradient computed");
        clear_graph();

        let numerical = numerical_gradient(&f, x, 1e-2);
        for (i, (a, n)) in analytical.data().iter().zip(&numerical).enumerate() {
            assert!(
                (a - n).abs() < tol,
                "gradient mismatch at {i}: analytical {a}, numerical {n}"
            );
        }
    }

    fn sample_matrix(rows: usize, cols: usize) -> Tensor {
        let data: Vec<f32> = (0..rows * cols)
            .map(|i| ((i as f32 + 1.0) * 0.37).sin())
            .collect();
        Tensor::new(&data, &[rows, cols])
    }

    #[test]
    fn test_add_gradient() {
        clear_graph();
        let x = Tensor::from_slice(&[1.0, 2.0, 3.0]).requires_grad();
        let y = Tensor::from_slice(&[4.0, 5.0, 6.0]);

        x.add(&y).sum().backward();

        let grad = get_grad(x.id()).expect("Should have gradient");
        assert_eq!(grad.data(), &[1.0, 1.0, 1.0]);
        clear_graph();
    }

    #[test]
    fn test_mul_gradient() {
        clear_graph();
        let x = Tensor::from_slice(&[1.0, 2.0, 3.0]).requires_grad();
        let y = Tensor::from_slice(&[4.0, 5.0, 6.0]);

        x.mul(&y).sum().backward();

        let grad = get_grad(x.id()).expect("grad");
        assert_eq!(grad.data(), &[4.0, 5.0, 6.0]);
        clear_graph();
    }

    #[test]
    fn test_reused_input_accumulates() {
        // d/dx sum(x * x) = 2x
        clear_graph();
        let x = Tensor::from_slice(&[1.0, -2.0]).requires_grad();
        x.mul(&x).sum().backward();
        let grad = get_grad(x.id()).expect("grad");
        assert_eq!(grad.data(), &[2.0, -4.0]);
        clear_graph();
    }

    #[test]
    fn test_abs_gradient() {
        clear_graph();
        let x = Tensor::from_slice(&[-1.5, 0.0, 2.0]).requires_grad();
        x.abs().sum().backward();
        let grad = get_grad(x.id()).expect("grad");
        assert_eq!(grad.data(), &[-1.0, 0.0, 1.0]);
        clear_graph();
    }

    #[test]
    fn test_softplus_values() {
        let x = Tensor::from_slice(&[0.0, 30.0, -30.0]);
        let y = x.softplus();
        assert!((y.data()[0] - 2.0_f32.ln()).abs() < 1e-6);
        assert_eq!(y.data()[1], 30.0);
        assert!(y.data()[2] > 0.0 && y.data()[2] < 1e-12);
    }

    #[test]
    fn test_softplus_gradient() {
        let x = Tensor::from_slice(&[-2.0, -0.3, 0.0, 0.7, 3.0]);
        check_gradient(|t| t.softplus().sum(), &x, 1e-2);
    }

    #[test]
    fn test_log_exp_sqrt_gradients() {
        let x = Tensor::from_slice(&[0.5, 1.0, 2.5]);
        check_gradient(|t| t.log().sum(), &x, 1e-2);
        check_gradient(|t| t.exp().sum(), &x, 5e-2);
        check_gradient(|t| t.sqrt().sum(), &x, 1e-2);
        check_gradient(|t| t.pow(2.0).mean(), &x, 1e-2);
    }

    #[test]
    fn test_div_gradient() {
        let y = Tensor::from_slice(&[2.0, -4.0, 0.5]);
        let x = Tensor::from_slice(&[1.0, 3.0, -1.0]);
        check_gradient(|t| t.div(&y).sum(), &x, 1e-2);
        check_gradient(|t| x.div(t).sum(), &y, 5e-2);
    }

    #[test]
    fn test_matmul_forward() {
        let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        let b = Tensor::new(&[5.0, 6.0, 7.0, 8.0], &[2, 2]);
        let c = a.matmul(&b);
        assert_eq!(c.data(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_gradient() {
        let w = sample_matrix(3, 2);
        let x = sample_matrix(4, 3);
        check_gradient(|t| t.matmul(&w).pow(2.0).sum(), &x, 2e-2);
        check_gradient(|t| x.matmul(t).pow(2.0).sum(), &w, 2e-2);
    }

    #[test]
    fn test_transpose_broadcast_add_gradient() {
        let x = sample_matrix(3, 2);
        let b = Tensor::from_slice(&[0.3, -0.2]);
        check_gradient(|t| t.transpose().pow(2.0).sum(), &x, 1e-2);
        check_gradient(|t| x.broadcast_add(t).pow(2.0).sum(), &b, 2e-2);
    }

    #[test]
    fn test_slice_and_cat_cols() {
        let x = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let c1 = x.column(1);
        assert_eq!(c1.shape(), &[2, 1]);
        assert_eq!(c1.data(), &[2.0, 5.0]);

        let joined = Tensor::cat_cols(&[&x.column(2), &x.slice_cols(0, 2)]);
        assert_eq!(joined.data(), &[3.0, 1.0, 2.0, 6.0, 4.0, 5.0]);
    }

    #[test]
    fn test_cat_cols_gradient() {
        let x = sample_matrix(3, 2);
        let other = sample_matrix(3, 1);
        check_gradient(
            |t| Tensor::cat_cols(&[&other, t, &t.column(0)]).pow(2.0).sum(),
            &x,
            2e-2,
        );
    }

    #[test]
    fn test_index_select_gradient_scatters_back() {
        clear_graph();
        let x = Tensor::new(&[1.0, 2.0, 3.0], &[3, 1]).requires_grad();
        let gathered = x.index_select(&[0, 2, 2, 1, 2]);
        assert_eq!(gathered.data(), &[1.0, 3.0, 3.0, 2.0, 3.0]);

        gathered.sum().backward();
        let grad = get_grad(x.id()).expect("grad");
        assert_eq!(grad.data(), &[1.0, 1.0, 3.0]);
        clear_graph();
    }

    #[test]
    fn test_scatter_add_and_mean() {
        let rows = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[4, 1]);
        let index = [1, 1, 0, 1];

        let summed = rows.scatter(&index, 3, ScatterReduce::Add);
        assert_eq!(summed.data(), &[3.0, 7.0, 0.0]);

        let mean = rows.scatter(&index, 3, ScatterReduce::Mean);
        for (got, want) in mean.data().iter().zip([3.0, 7.0 / 3.0, 0.0]) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_scatter_max_routes_gradient_to_winner() {
        clear_graph();
        let rows = Tensor::new(&[1.0, 5.0, -2.0, 4.0], &[4, 1]).requires_grad();
        let out = rows.scatter(&[0, 0, 1, 0], 3, ScatterReduce::Max);
        assert_eq!(out.data(), &[5.0, -2.0, 0.0]);

        out.sum().backward();
        let grad = get_grad(rows.id()).expect("grad");
        assert_eq!(grad.data(), &[0.0, 1.0, 1.0, 0.0]);
        clear_graph();
    }

    #[test]
    fn test_scatter_mean_gradient() {
        let rows = sample_matrix(5, 2);
        check_gradient(
            |t| t.scatter(&[2, 0, 2, 2, 1], 3, ScatterReduce::Mean).pow(2.0).sum(),
            &rows,
            2e-2,
        );
    }

    #[test]
    fn test_view_roundtrip_gradient() {
        let x = sample_matrix(2, 4);
        check_gradient(|t| t.view(&[4, 2]).column(1).pow(2.0).sum(), &x, 1e-2);
    }

    #[test]
    fn test_constants_do_not_record() {
        clear_graph();
        let a = Tensor::from_slice(&[1.0, 2.0]);
        let b = Tensor::from_slice(&[3.0, 4.0]);
        let c = a.mul(&b).add_scalar(1.0);
        assert!(!c.requires_grad_enabled());
        assert_eq!(crate::autograd::tape_len(), 0);
    }
}
