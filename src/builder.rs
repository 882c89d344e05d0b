//! Network builder.
//!
//! `NetworkBuilder` is the recommended way to define a model. It makes the
//! structure explicit (input width, hidden widths, class count) and keeps the
//! component sequence well-formed: every hidden layer is an affine transform
//! followed by a rectified-linear activation, and the output layer is a bare
//! affine transform producing raw scores for the loss.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::network::Component;
use crate::{Error, Linear, Network, Relu, Result};

#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    input_dim: usize,
    hidden: Vec<usize>,
    output_dim: Option<usize>,
}

impl NetworkBuilder {
    /// Start building a network that accepts inputs of width `input_dim`.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::Config("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            input_dim,
            hidden: Vec::new(),
            output_dim: None,
        })
    }

    /// Convenience constructor from a sizes list.
    ///
    /// `sizes` includes the input width, hidden widths, and the class count,
    /// so its length must be at least 2. All but the last entry after the
    /// input become ReLU hidden layers.
    pub fn from_sizes(sizes: &[usize]) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(Error::Config(
                "sizes must include input and output dims".to_owned(),
            ));
        }

        let mut b = Self::new(sizes[0])?;
        for &width in &sizes[1..sizes.len() - 1] {
            b = b.add_hidden(width)?;
        }
        b.add_output(sizes[sizes.len() - 1])
    }

    /// Add a hidden layer: affine transform + ReLU.
    pub fn add_hidden(mut self, width: usize) -> Result<Self> {
        if self.output_dim.is_some() {
            return Err(Error::Config(
                "cannot add a hidden layer after the output layer".to_owned(),
            ));
        }
        if width == 0 {
            return Err(Error::Config("hidden width must be > 0".to_owned()));
        }
        self.hidden.push(width);
        Ok(self)
    }

    /// Set the output layer: a bare affine transform with one score per class.
    pub fn add_output(mut self, classes: usize) -> Result<Self> {
        if self.output_dim.is_some() {
            return Err(Error::Config("output layer already set".to_owned()));
        }
        if classes == 0 {
            return Err(Error::Config("class count must be > 0".to_owned()));
        }
        self.output_dim = Some(classes);
        Ok(self)
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Network> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    ///
    /// Weights are drawn uniformly from
    /// `[-1/sqrt(in_features), 1/sqrt(in_features)]`; biases start at zero.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Network> {
        let output_dim = self
            .output_dim
            .ok_or_else(|| Error::Config("network must have an output layer".to_owned()))?;

        let mut components = Vec::with_capacity(2 * self.hidden.len() + 1);
        let mut in_dim = self.input_dim;
        for &width in &self.hidden {
            components.push(Component::Linear(Linear::new_with_rng(in_dim, width, rng)?));
            components.push(Component::Relu(Relu::new()));
            in_dim = width;
        }
        components.push(Component::Linear(Linear::new_with_rng(
            in_dim, output_dim, rng,
        )?));

        Ok(Network::from_parts(components, self.input_dim, output_dim))
    }
}
