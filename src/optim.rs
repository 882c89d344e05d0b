//! The optimizer: plain stochastic gradient descent.
//!
//! The update rule is exactly `param -= lr * grad` for every parameter, with
//! no momentum and no adaptive scaling. Optimizer state is just the learning
//! rate; the parameters live in their layers and are mutated through the
//! network's handles.

use crate::{Error, Network, Result};

#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    lr: f32,
}

impl Sgd {
    /// Construct an SGD optimizer.
    ///
    /// Returns an error if `lr` is not finite or `lr <= 0`.
    #[inline]
    pub fn new(lr: f32) -> Result<Self> {
        if !(lr.is_finite() && lr > 0.0) {
            return Err(Error::Config(format!(
                "learning rate must be finite and > 0, got {lr}"
            )));
        }
        Ok(Self { lr })
    }

    #[inline]
    pub fn lr(&self) -> f32 {
        self.lr
    }

    /// Apply one update: `param -= lr * grad` for every parameter.
    ///
    /// Invoking this before any backward pass leaves the parameters unchanged
    /// because the gradient accumulators are still zero.
    #[inline]
    pub fn step(&self, network: &mut Network) {
        network.apply_update(self.lr);
    }
}
