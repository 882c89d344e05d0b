//! A from-scratch mini-batch MLP trainer.
//!
//! `mlp-trainer` implements the forward/backward computation and parameter
//! updates for a small multilayer perceptron classifier without an autograd
//! engine: a fixed pipeline of affine layers and rectified-linear
//! activations, a fused log-softmax + negative log-likelihood loss over
//! integer class labels, and plain stochastic gradient descent.
//!
//! # Design goals
//!
//! - Explicit gradients: every layer owns same-shape gradient accumulators
//!   that `backward` adds into and `zero_grad` clears — no computation graph,
//!   no global gradient-tracking state.
//! - Clear contracts: shapes are validated at the API boundary and violations
//!   are [`Error`] values, not panics.
//! - Deterministic construction: all initialization goes through a seed or a
//!   caller-supplied RNG.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`.
//! - Matrices are flat row-major buffers with explicit `(rows, cols)` dims.
//! - Layer weights are row-major with shape `(out_features, in_features)`.
//! - A batch is an input matrix `(batch_size, input_dim)` plus one `usize`
//!   class label per row.
//!
//! # Forward/backward pairing
//!
//! Each component caches what its backward pass needs (the affine layer
//! caches its input, ReLU a positive mask) during `forward`. The cache is
//! overwritten by the next forward call, so a backward pass always applies
//! to the most recent forward pass; backward without a pending forward is a
//! [`Error::State`].
//!
//! # Quick start
//!
//! ```rust
//! use mlp_trainer::{Batches, NetworkBuilder, Trainer};
//!
//! # fn main() -> mlp_trainer::Result<()> {
//! // Two tiny 2-class clusters.
//! let xs = vec![
//!     vec![0.0, 0.1],
//!     vec![0.1, 0.0],
//!     vec![0.9, 1.0],
//!     vec![1.0, 0.9],
//! ];
//! let labels = vec![0, 0, 1, 1];
//! let mut source = Batches::from_rows(&xs, &labels, 2)?;
//!
//! let network = NetworkBuilder::new(2)?
//!     .add_hidden(8)?
//!     .add_output(2)?
//!     .build_with_seed(0)?;
//!
//! let mut trainer = Trainer::new(network)?;
//! let epoch_losses = trainer.run(&mut source, 50, 0.1)?;
//! assert_eq!(epoch_losses.len(), 50);
//!
//! // Forward-only inference: probabilities per class.
//! let probs = trainer.predict(&[0.05, 0.05], 1)?;
//! assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod builder;
pub mod data;
pub mod error;
pub mod layer;
pub mod loss;
pub(crate) mod matmul;
pub mod network;
pub mod optim;
pub mod train;

pub use activation::Relu;
pub use builder::NetworkBuilder;
pub use data::{Batch, BatchSource, Batches};
pub use error::{Error, Result};
pub use layer::Linear;
pub use loss::SoftmaxNllLoss;
pub use network::{Component, Network};
pub use optim::Sgd;
pub use train::Trainer;
