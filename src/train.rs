//! The training loop.
//!
//! One step: reset gradient accumulators, forward through the component
//! sequence, compute the loss, backpropagate in reverse order, then apply
//! the SGD update. If any forward or backward stage fails the optimizer is
//! not invoked, so a failed step leaves the parameters at their pre-step
//! values.
//!
//! An epoch is one full pass over all batches the source supplies, in the
//! source's order. The epoch-average loss (mean of per-step batch-mean
//! losses) is the sole training-progress signal. Termination is a fixed,
//! caller-supplied epoch count; there is no early stopping or convergence
//! check.

use crate::loss::log_sum_exp_and_max;
use crate::{BatchSource, Error, Network, Result, Sgd, SoftmaxNllLoss};

#[derive(Debug, Clone)]
pub struct Trainer {
    network: Network,
    loss: SoftmaxNllLoss,
}

impl Trainer {
    pub fn new(network: Network) -> Result<Self> {
        let loss = SoftmaxNllLoss::new(network.output_dim())?;
        Ok(Self { network, loss })
    }

    #[inline]
    pub fn network(&self) -> &Network {
        &self.network
    }

    #[inline]
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    /// Train for a fixed number of epochs.
    ///
    /// Returns one average loss per epoch, in epoch order. `epochs == 0` is
    /// not an error; it performs no work and returns an empty vector.
    pub fn run<S: BatchSource>(
        &mut self,
        source: &mut S,
        epochs: usize,
        lr: f32,
    ) -> Result<Vec<f32>> {
        if source.input_dim() != self.network.input_dim() {
            return Err(Error::Shape(format!(
                "source input_dim {} does not match network input_dim {}",
                source.input_dim(),
                self.network.input_dim()
            )));
        }

        let sgd = Sgd::new(lr)?;
        let mut epoch_losses = Vec::with_capacity(epochs);

        for _ in 0..epochs {
            source.reset();
            let mut running_loss = 0.0_f32;
            let mut steps = 0_usize;

            while let Some(batch) = source.next_batch() {
                running_loss += self.step(batch.inputs(), batch.labels(), &sgd)?;
                steps += 1;
            }

            if steps == 0 {
                return Err(Error::Value(
                    "batch source yielded no batches for the epoch".to_owned(),
                ));
            }
            epoch_losses.push(running_loss / steps as f32);
        }

        Ok(epoch_losses)
    }

    /// One forward/backward/update cycle over a single batch.
    ///
    /// Returns the batch-mean loss. On error the optimizer has not run.
    fn step(&mut self, inputs: &[f32], labels: &[usize], sgd: &Sgd) -> Result<f32> {
        let rows = labels.len();

        self.network.zero_grad();
        let scores = self.network.forward(inputs, rows)?;
        let batch_loss = self.loss.forward(scores, labels)?;
        let grad = self.loss.backward()?;
        self.network.backward(grad, rows)?;
        sgd.step(&mut self.network);

        Ok(batch_loss)
    }

    /// Forward-only inference: class probabilities for each input row.
    ///
    /// Converts the raw scores to probabilities via the elementwise
    /// exponential of the log-softmax; each returned row is non-negative and
    /// sums to 1 within floating-point tolerance. No parameters are mutated
    /// and no gradients are accumulated.
    ///
    /// Returns a flat row-major buffer with shape `(rows, output_dim)`.
    pub fn predict(&mut self, inputs: &[f32], rows: usize) -> Result<Vec<f32>> {
        let classes = self.network.output_dim();
        let scores = self.network.forward(inputs, rows)?;

        let mut probs = vec![0.0_f32; rows * classes];
        for r in 0..rows {
            let row = &scores[r * classes..(r + 1) * classes];
            let (log_sum_exp, _) = log_sum_exp_and_max(row);
            let out = &mut probs[r * classes..(r + 1) * classes];
            for (p, &s) in out.iter_mut().zip(row) {
                *p = (s - log_sum_exp).exp();
            }
        }

        Ok(probs)
    }
}
