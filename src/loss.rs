//! The classification loss: log-softmax + negative log-likelihood, fused.
//!
//! Computing softmax probabilities and then their logarithm separately can
//! underflow for confident wrong predictions. The fused form subtracts the
//! row maximum before exponentiating, so `logsumexp` stays finite and the
//! per-example loss `logsumexp - score[label]` is exact.
//!
//! `forward` caches the softmax matrix and the labels so `backward` can
//! return the closed-form gradient `(softmax - one_hot) / batch_size`
//! without re-deriving a softmax-then-log chain.

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct SoftmaxNllLoss {
    classes: usize,

    // Forward cache, invalidated by the next forward call.
    softmax: Vec<f32>,
    labels: Vec<usize>,
    pending_rows: Option<usize>,

    grad: Vec<f32>,
}

impl SoftmaxNllLoss {
    pub fn new(classes: usize) -> Result<Self> {
        if classes == 0 {
            return Err(Error::Config("loss requires at least 1 class".to_owned()));
        }
        Ok(Self {
            classes,
            softmax: Vec::new(),
            labels: Vec::new(),
            pending_rows: None,
            grad: Vec::new(),
        })
    }

    #[inline]
    pub fn classes(&self) -> usize {
        self.classes
    }

    /// Mean negative log-likelihood of the log-softmax over the batch.
    ///
    /// `scores` is row-major `(labels.len(), classes)`; each label must be in
    /// `[0, classes)`.
    pub fn forward(&mut self, scores: &[f32], labels: &[usize]) -> Result<f32> {
        let rows = labels.len();
        if rows == 0 || scores.len() != rows * self.classes {
            return Err(Error::Shape(format!(
                "loss forward scores len {} does not match rows {} * classes {}",
                scores.len(),
                rows,
                self.classes
            )));
        }
        for (r, &label) in labels.iter().enumerate() {
            if label >= self.classes {
                return Err(Error::Value(format!(
                    "label {label} at row {r} is out of range for {} classes",
                    self.classes
                )));
            }
        }

        self.softmax.resize(rows * self.classes, 0.0);
        self.labels.clear();
        self.labels.extend_from_slice(labels);

        let mut total = 0.0_f32;
        for r in 0..rows {
            let row = &scores[r * self.classes..(r + 1) * self.classes];
            let (log_sum_exp, max_score) = log_sum_exp_and_max(row);

            // Softmax of the row, reusing the shifted exponentials.
            let out = &mut self.softmax[r * self.classes..(r + 1) * self.classes];
            let mut sum_exp = 0.0_f32;
            for (o, &s) in out.iter_mut().zip(row) {
                let e = (s - max_score).exp();
                *o = e;
                sum_exp += e;
            }
            let inv_sum = 1.0 / sum_exp;
            for o in out.iter_mut() {
                *o *= inv_sum;
            }

            total += log_sum_exp - row[labels[r]];
        }

        self.pending_rows = Some(rows);
        Ok(total / rows as f32)
    }

    /// Gradient of the mean loss w.r.t. `scores`:
    /// `(softmax(scores) - one_hot(labels)) / batch_size`.
    pub fn backward(&mut self) -> Result<&[f32]> {
        let rows = self.pending_rows.ok_or_else(|| {
            Error::State("loss backward called without a pending forward pass".to_owned())
        })?;

        let inv_rows = 1.0 / rows as f32;
        self.grad.resize(rows * self.classes, 0.0);
        self.grad.copy_from_slice(&self.softmax);
        for v in self.grad.iter_mut() {
            *v *= inv_rows;
        }
        for (r, &label) in self.labels.iter().enumerate() {
            self.grad[r * self.classes + label] -= inv_rows;
        }

        Ok(&self.grad)
    }
}

/// Returns `(logsumexp(xs), max(xs))` using the max-subtraction form.
#[inline]
pub(crate) fn log_sum_exp_and_max(xs: &[f32]) -> (f32, f32) {
    let mut max_x = xs[0];
    for &x in xs.iter().skip(1) {
        if x > max_x {
            max_x = x;
        }
    }
    let mut sum_exp = 0.0_f32;
    for &x in xs {
        sum_exp += (x - max_x).exp();
    }
    (max_x + sum_exp.ln(), max_x)
}
