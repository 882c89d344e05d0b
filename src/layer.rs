//! The affine (fully connected) layer.
//!
//! A `Linear` layer owns its weight matrix and bias vector together with
//! same-shape gradient accumulators. `backward` *adds into* the accumulators
//! rather than overwriting them; gradients accumulate until `zero_grad` is
//! called. This supports summing gradients over multiple backward passes and
//! makes the once-per-step reset an explicit part of the training loop.

use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::matmul::gemm_f32;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct Linear {
    in_features: usize,
    out_features: usize,
    /// Row-major matrix with shape (out_features, in_features).
    weights: Vec<f32>,
    biases: Vec<f32>,
    /// Gradient accumulators, same shapes as `weights` / `biases`.
    d_weights: Vec<f32>,
    d_biases: Vec<f32>,

    // Forward cache: the input matrix of the pending forward pass, row-major
    // (rows, in_features). `pending_rows` is `None` when no forward result is
    // available for backward consumption.
    input: Vec<f32>,
    pending_rows: Option<usize>,

    output: Vec<f32>,
    grad_input: Vec<f32>,
}

impl Linear {
    /// Construct a layer with weights drawn uniformly from
    /// `[-1/sqrt(in_features), 1/sqrt(in_features)]` and zero biases.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::Config(format!(
                "layer dims must be > 0, got in_features {in_features}, out_features {out_features}"
            )));
        }

        let bound = 1.0 / (in_features as f32).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let weights = (0..in_features * out_features)
            .map(|_| dist.sample(rng))
            .collect();

        Ok(Self {
            in_features,
            out_features,
            weights,
            biases: vec![0.0; out_features],
            d_weights: vec![0.0; in_features * out_features],
            d_biases: vec![0.0; out_features],
            input: Vec::new(),
            pending_rows: None,
            output: Vec::new(),
            grad_input: Vec::new(),
        })
    }

    #[inline]
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    #[inline]
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[inline]
    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    #[inline]
    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    #[inline]
    pub fn biases_mut(&mut self) -> &mut [f32] {
        &mut self.biases
    }

    #[inline]
    pub fn d_weights(&self) -> &[f32] {
        &self.d_weights
    }

    #[inline]
    pub fn d_biases(&self) -> &[f32] {
        &self.d_biases
    }

    /// Output of the most recent forward pass, row-major (rows, out_features).
    #[inline]
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    /// Gradient w.r.t. the input of the most recent backward pass, row-major
    /// (rows, in_features).
    #[inline]
    pub fn grad_input(&self) -> &[f32] {
        &self.grad_input
    }

    /// Forward pass for a batch.
    ///
    /// Computes `output = input * weights^T + biases` (bias broadcast over
    /// rows) and caches `input` for the backward pass.
    ///
    /// Shape contract: `input.len() == rows * in_features`.
    pub fn forward(&mut self, input: &[f32], rows: usize) -> Result<()> {
        if rows == 0 || input.len() != rows * self.in_features {
            return Err(Error::Shape(format!(
                "linear forward input len {} does not match rows {} * in_features {}",
                input.len(),
                rows,
                self.in_features
            )));
        }

        self.input.clear();
        self.input.extend_from_slice(input);
        self.pending_rows = Some(rows);

        self.output.resize(rows * self.out_features, 0.0);

        // output = input (rows x in) * weights^T (in x out).
        // Addressing `weights` with rsb=1, csb=in_features reads W transposed.
        gemm_f32(
            rows,
            self.out_features,
            self.in_features,
            1.0,
            input,
            self.in_features,
            1,
            &self.weights,
            1,
            self.in_features,
            0.0,
            &mut self.output,
            self.out_features,
            1,
        );

        for r in 0..rows {
            let row = r * self.out_features;
            for o in 0..self.out_features {
                self.output[row + o] += self.biases[o];
            }
        }

        Ok(())
    }

    /// Backward pass for a batch.
    ///
    /// Accumulates into the gradient buffers:
    /// - `d_weights += grad_output^T * cached_input`
    /// - `d_biases  += column-sum(grad_output)`
    ///
    /// and computes `grad_input = grad_output * weights`.
    ///
    /// Shape contract: `grad_output.len() == pending_rows * out_features`.
    pub fn backward(&mut self, grad_output: &[f32]) -> Result<()> {
        let rows = self.pending_rows.ok_or_else(|| {
            Error::State("linear backward called without a pending forward pass".to_owned())
        })?;

        if grad_output.len() != rows * self.out_features {
            return Err(Error::Shape(format!(
                "linear backward grad len {} does not match rows {} * out_features {}",
                grad_output.len(),
                rows,
                self.out_features
            )));
        }

        // d_weights (out x in) += grad_output^T (out x rows) * input (rows x in).
        gemm_f32(
            self.out_features,
            self.in_features,
            rows,
            1.0,
            grad_output,
            1,
            self.out_features,
            &self.input,
            self.in_features,
            1,
            1.0,
            &mut self.d_weights,
            self.in_features,
            1,
        );

        for r in 0..rows {
            let row = r * self.out_features;
            for o in 0..self.out_features {
                self.d_biases[o] += grad_output[row + o];
            }
        }

        // grad_input (rows x in) = grad_output (rows x out) * weights (out x in).
        self.grad_input.resize(rows * self.in_features, 0.0);
        gemm_f32(
            rows,
            self.in_features,
            self.out_features,
            1.0,
            grad_output,
            self.out_features,
            1,
            &self.weights,
            self.in_features,
            1,
            0.0,
            &mut self.grad_input,
            self.in_features,
            1,
        );

        Ok(())
    }

    /// Resets both gradient accumulators to zero.
    ///
    /// Must be invoked exactly once before each training step's backward pass.
    pub fn zero_grad(&mut self) {
        self.d_weights.fill(0.0);
        self.d_biases.fill(0.0);
    }

    /// Applies `param -= lr * d_param` to weights and biases, in place.
    #[inline]
    pub fn apply_update(&mut self, lr: f32) {
        for (w, &g) in self.weights.iter_mut().zip(&self.d_weights) {
            *w -= lr * g;
        }
        for (b, &g) in self.biases.iter_mut().zip(&self.d_biases) {
            *b -= lr * g;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layer(in_f: usize, out_f: usize, seed: u64) -> Linear {
        let mut rng = StdRng::seed_from_u64(seed);
        Linear::new_with_rng(in_f, out_f, &mut rng).unwrap()
    }

    #[test]
    fn forward_output_shape_matches_rows_by_out_features() {
        let mut l = layer(3, 4, 0);
        let input = [0.1_f32; 6]; // 2 rows
        l.forward(&input, 2).unwrap();
        assert_eq!(l.output().len(), 2 * 4);
    }

    #[test]
    fn forward_rejects_width_mismatch() {
        let mut l = layer(3, 4, 0);
        let input = [0.1_f32; 8]; // not a multiple of 3 rows
        assert!(matches!(l.forward(&input, 2), Err(Error::Shape(_))));
    }

    #[test]
    fn backward_without_forward_is_a_state_error() {
        let mut l = layer(2, 2, 0);
        let grad = [1.0_f32; 2];
        assert!(matches!(l.backward(&grad), Err(Error::State(_))));
    }

    #[test]
    fn init_is_bounded_and_biases_are_zero() {
        let l = layer(16, 8, 7);
        let bound = 1.0 / (16.0_f32).sqrt();
        assert!(l.weights().iter().all(|&w| w.abs() <= bound));
        assert!(l.biases().iter().all(|&b| b == 0.0));
        // Symmetry must be broken.
        assert!(l.weights().iter().any(|&w| w != 0.0));
    }

    #[test]
    fn seeded_init_is_deterministic() {
        let a = layer(4, 3, 123);
        let b = layer(4, 3, 123);
        assert_eq!(a.weights(), b.weights());
    }

    #[test]
    fn gradients_accumulate_until_cleared() {
        let mut l = layer(3, 2, 1);
        let input = [0.5_f32, -0.25, 1.0, 0.75, 0.1, -0.6];
        let grad = [1.0_f32, -2.0, 0.5, 0.25];

        l.forward(&input, 2).unwrap();
        l.backward(&grad).unwrap();
        let once_w = l.d_weights().to_vec();
        let once_b = l.d_biases().to_vec();

        // Second backward without zero_grad doubles every accumulator entry.
        l.backward(&grad).unwrap();
        for (a, b) in l.d_weights().iter().zip(&once_w) {
            assert!((a - 2.0 * b).abs() < 1e-6);
        }
        for (a, b) in l.d_biases().iter().zip(&once_b) {
            assert!((a - 2.0 * b).abs() < 1e-6);
        }

        // zero_grad + one backward matches a fresh single backward exactly.
        l.zero_grad();
        l.backward(&grad).unwrap();
        assert_eq!(l.d_weights(), &once_w[..]);
        assert_eq!(l.d_biases(), &once_b[..]);
    }

    #[test]
    fn backward_matches_numeric_gradients() {
        // Scalar objective: sum of outputs, so d_output is all ones.
        let mut l = layer(3, 2, 42);
        let input = [0.3_f32, -0.7, 0.2, 0.9, 0.05, -0.4];
        let grad = [1.0_f32; 4];

        l.forward(&input, 2).unwrap();
        l.backward(&grad).unwrap();
        let analytic_w = l.d_weights().to_vec();
        let analytic_b = l.d_biases().to_vec();
        let analytic_x = l.grad_input().to_vec();

        let eps = 1e-3_f32;
        let sum_of_outputs = |l: &mut Linear, input: &[f32]| -> f32 {
            l.forward(input, 2).unwrap();
            l.output().iter().sum()
        };

        for p in 0..l.weights().len() {
            let orig = l.weights()[p];
            l.weights_mut()[p] = orig + eps;
            let plus = sum_of_outputs(&mut l, &input);
            l.weights_mut()[p] = orig - eps;
            let minus = sum_of_outputs(&mut l, &input);
            l.weights_mut()[p] = orig;

            let numeric = (plus - minus) / (2.0 * eps);
            assert!(
                (analytic_w[p] - numeric).abs() < 1e-2,
                "weight {p}: analytic {} vs numeric {numeric}",
                analytic_w[p]
            );
        }

        for p in 0..l.biases().len() {
            let orig = l.biases()[p];
            l.biases_mut()[p] = orig + eps;
            let plus = sum_of_outputs(&mut l, &input);
            l.biases_mut()[p] = orig - eps;
            let minus = sum_of_outputs(&mut l, &input);
            l.biases_mut()[p] = orig;

            let numeric = (plus - minus) / (2.0 * eps);
            assert!(
                (analytic_b[p] - numeric).abs() < 1e-2,
                "bias {p}: analytic {} vs numeric {numeric}",
                analytic_b[p]
            );
        }

        let mut input_var = input;
        for i in 0..input_var.len() {
            let orig = input_var[i];
            input_var[i] = orig + eps;
            let plus = sum_of_outputs(&mut l, &input_var);
            input_var[i] = orig - eps;
            let minus = sum_of_outputs(&mut l, &input_var);
            input_var[i] = orig;

            let numeric = (plus - minus) / (2.0 * eps);
            assert!(
                (analytic_x[i] - numeric).abs() < 1e-2,
                "input {i}: analytic {} vs numeric {numeric}",
                analytic_x[i]
            );
        }
    }

    #[test]
    fn apply_update_moves_against_the_gradient() {
        let mut l = layer(2, 1, 0);
        l.weights_mut().copy_from_slice(&[1.0, -1.0]);
        l.biases_mut()[0] = 0.5;

        let input = [1.0_f32, 2.0];
        let grad = [1.0_f32];
        l.zero_grad();
        l.forward(&input, 1).unwrap();
        l.backward(&grad).unwrap();
        // d_w = [1.0, 2.0], d_b = [1.0]
        l.apply_update(0.1);

        assert!((l.weights()[0] - 0.9).abs() < 1e-6);
        assert!((l.weights()[1] - (-1.2)).abs() < 1e-6);
        assert!((l.biases()[0] - 0.4).abs() < 1e-6);
    }
}
