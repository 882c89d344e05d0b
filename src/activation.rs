//! The rectified-linear activation.
//!
//! `Relu` is stateless as far as parameters go, but it retains a boolean mask
//! of which entries were positive during the most recent forward pass; the
//! backward pass multiplies the upstream gradient by that mask.
//!
//! Boundary convention: inputs that are exactly `0.0` receive zero gradient.
//! The subgradient at zero is arbitrary; this crate fixes it to zero and
//! tests it so the choice cannot drift.

use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct Relu {
    mask: Vec<bool>,
    pending: bool,
    output: Vec<f32>,
    grad_input: Vec<f32>,
}

impl Relu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output of the most recent forward pass.
    #[inline]
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    /// Gradient w.r.t. the input of the most recent backward pass.
    #[inline]
    pub fn grad_input(&self) -> &[f32] {
        &self.grad_input
    }

    /// Elementwise `max(0, x)`; caches the positive mask for backward.
    pub fn forward(&mut self, input: &[f32]) -> Result<()> {
        self.output.resize(input.len(), 0.0);
        self.mask.resize(input.len(), false);

        for (i, &x) in input.iter().enumerate() {
            let positive = x > 0.0;
            self.mask[i] = positive;
            self.output[i] = if positive { x } else { 0.0 };
        }
        self.pending = true;

        Ok(())
    }

    /// Multiplies `grad_output` by the cached mask.
    ///
    /// Entries whose forward input was non-positive (including exactly zero)
    /// get zero gradient.
    pub fn backward(&mut self, grad_output: &[f32]) -> Result<()> {
        if !self.pending {
            return Err(Error::State(
                "relu backward called without a pending forward pass".to_owned(),
            ));
        }
        if grad_output.len() != self.mask.len() {
            return Err(Error::Shape(format!(
                "relu backward grad len {} does not match forward len {}",
                grad_output.len(),
                self.mask.len()
            )));
        }

        self.grad_input.resize(grad_output.len(), 0.0);
        for (i, (&g, &m)) in grad_output.iter().zip(&self.mask).enumerate() {
            self.grad_input[i] = if m { g } else { 0.0 };
        }

        Ok(())
    }
}
