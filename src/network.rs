//! The network: an ordered sequence of components.
//!
//! Data flows strictly forward through the sequence to produce raw scores,
//! then backward through the same sequence reversed to accumulate parameter
//! gradients. The component set is a closed enum: a fixed affine +
//! rectified-linear pipeline, not a general computation graph.

use crate::{Error, Linear, Relu, Result};

#[derive(Debug, Clone)]
pub enum Component {
    Linear(Linear),
    Relu(Relu),
}

impl Component {
    fn forward(&mut self, input: &[f32], rows: usize) -> Result<()> {
        match self {
            Component::Linear(l) => l.forward(input, rows),
            Component::Relu(a) => a.forward(input),
        }
    }

    fn backward(&mut self, grad_output: &[f32]) -> Result<()> {
        match self {
            Component::Linear(l) => l.backward(grad_output),
            Component::Relu(a) => a.backward(grad_output),
        }
    }

    fn output(&self) -> &[f32] {
        match self {
            Component::Linear(l) => l.output(),
            Component::Relu(a) => a.output(),
        }
    }

    fn grad_input(&self) -> &[f32] {
        match self {
            Component::Linear(l) => l.grad_input(),
            Component::Relu(a) => a.grad_input(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Network {
    components: Vec<Component>,
    input_dim: usize,
    output_dim: usize,
}

impl Network {
    pub(crate) fn from_parts(
        components: Vec<Component>,
        input_dim: usize,
        output_dim: usize,
    ) -> Self {
        debug_assert!(!components.is_empty());
        Self {
            components,
            input_dim,
            output_dim,
        }
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Iterates the parameterized layers in forward order.
    pub fn linears(&self) -> impl Iterator<Item = &Linear> {
        self.components.iter().filter_map(|c| match c {
            Component::Linear(l) => Some(l),
            Component::Relu(_) => None,
        })
    }

    /// Mutable counterpart of [`Network::linears`].
    pub fn linears_mut(&mut self) -> impl Iterator<Item = &mut Linear> {
        self.components.iter_mut().filter_map(|c| match c {
            Component::Linear(l) => Some(l),
            Component::Relu(_) => None,
        })
    }

    /// Forward pass for a batch: returns the raw scores, row-major
    /// `(rows, output_dim)`.
    ///
    /// Overwrites every component's forward cache; a backward pass always
    /// applies to the most recent forward call.
    pub fn forward(&mut self, input: &[f32], rows: usize) -> Result<&[f32]> {
        if rows == 0 || input.len() != rows * self.input_dim {
            return Err(Error::Shape(format!(
                "network forward input len {} does not match rows {} * input_dim {}",
                input.len(),
                rows,
                self.input_dim
            )));
        }

        for idx in 0..self.components.len() {
            if idx == 0 {
                self.components[0].forward(input, rows)?;
            } else {
                // Borrow the previous output immutably and the current
                // component mutably.
                let (left, right) = self.components.split_at_mut(idx);
                let prev = left[idx - 1].output();
                right[0].forward(prev, rows)?;
            }
        }

        Ok(self
            .components
            .last()
            .expect("network must have at least one component")
            .output())
    }

    /// Backward pass: propagates `grad_output` (gradient w.r.t. the scores)
    /// through the sequence in reverse, accumulating parameter gradients.
    ///
    /// Returns the gradient w.r.t. the network input.
    pub fn backward(&mut self, grad_output: &[f32], rows: usize) -> Result<&[f32]> {
        if grad_output.len() != rows * self.output_dim {
            return Err(Error::Shape(format!(
                "network backward grad len {} does not match rows {} * output_dim {}",
                grad_output.len(),
                rows,
                self.output_dim
            )));
        }

        let n = self.components.len();
        for idx in (0..n).rev() {
            if idx == n - 1 {
                self.components[idx].backward(grad_output)?;
            } else {
                let (left, right) = self.components.split_at_mut(idx + 1);
                let upstream = right[0].grad_input();
                left[idx].backward(upstream)?;
            }
        }

        Ok(self
            .components
            .first()
            .expect("network must have at least one component")
            .grad_input())
    }

    /// Resets every layer's gradient accumulators to zero.
    pub fn zero_grad(&mut self) {
        for layer in self.linears_mut() {
            layer.zero_grad();
        }
    }

    /// Applies `param -= lr * grad` to every parameter, in place.
    pub(crate) fn apply_update(&mut self, lr: f32) {
        for layer in self.linears_mut() {
            layer.apply_update(lr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NetworkBuilder, SoftmaxNllLoss};

    fn small_net(seed: u64) -> Network {
        NetworkBuilder::new(4)
            .unwrap()
            .add_hidden(5)
            .unwrap()
            .add_output(3)
            .unwrap()
            .build_with_seed(seed)
            .unwrap()
    }

    #[test]
    fn forward_output_width_equals_class_count() {
        let mut net = small_net(0);
        let input = [0.2_f32; 8]; // 2 rows of 4
        let scores = net.forward(&input, 2).unwrap();
        assert_eq!(scores.len(), 2 * 3);
    }

    #[test]
    fn forward_rejects_wrong_input_width() {
        let mut net = small_net(0);
        let input = [0.2_f32; 6];
        assert!(matches!(net.forward(&input, 2), Err(Error::Shape(_))));
    }

    #[test]
    fn backward_without_forward_is_a_state_error() {
        let mut net = small_net(0);
        let grad = [0.0_f32; 3];
        assert!(matches!(net.backward(&grad, 1), Err(Error::State(_))));
    }

    #[test]
    fn network_backward_matches_numeric_gradients() {
        let mut net = small_net(9);
        let mut loss = SoftmaxNllLoss::new(3).unwrap();
        let input = [0.3_f32, -0.7, 0.2, 0.9, 0.1, 0.4, -0.2, 0.6];
        let labels = [1_usize, 2];

        net.zero_grad();
        let scores = net.forward(&input, 2).unwrap();
        loss.forward(scores, &labels).unwrap();
        let grad = loss.backward().unwrap().to_vec();
        net.backward(&grad, 2).unwrap();

        let analytic: Vec<Vec<f32>> = net.linears().map(|l| l.d_weights().to_vec()).collect();

        let eps = 1e-3_f32;
        let num_layers = net.linears().count();
        for layer_idx in 0..num_layers {
            let w_len = analytic[layer_idx].len();
            for p in 0..w_len {
                let orig = {
                    let l = net.linears_mut().nth(layer_idx).unwrap();
                    let orig = l.weights()[p];
                    l.weights_mut()[p] = orig + eps;
                    orig
                };
                let scores = net.forward(&input, 2).unwrap().to_vec();
                let plus = loss.forward(&scores, &labels).unwrap();

                net.linears_mut().nth(layer_idx).unwrap().weights_mut()[p] = orig - eps;
                let scores = net.forward(&input, 2).unwrap().to_vec();
                let minus = loss.forward(&scores, &labels).unwrap();

                net.linears_mut().nth(layer_idx).unwrap().weights_mut()[p] = orig;

                let numeric = (plus - minus) / (2.0 * eps);
                let a = analytic[layer_idx][p];
                let diff = (a - numeric).abs();
                let scale = a.abs().max(numeric.abs()).max(1.0);
                assert!(
                    diff <= 2e-3 || diff / scale <= 2e-2,
                    "layer {layer_idx} weight {p}: analytic {a} vs numeric {numeric}"
                );
            }
        }
    }
}
