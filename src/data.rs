//! Batched dataset helpers.
//!
//! The trainer pulls `Batch` views from a `BatchSource`: a finite,
//! restartable sequence of batches that is re-iterated identically each
//! epoch. `Batches` is the in-memory implementation backed by validated,
//! contiguous row-major storage; shuffling-per-epoch is a data-source
//! concern and out of scope here.

use crate::{Error, Result};

/// One training batch: an input matrix and the matching integer labels.
///
/// Ephemeral: produced by the source once per training step and discarded
/// after use.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    inputs: &'a [f32],
    labels: &'a [usize],
    input_dim: usize,
}

impl<'a> Batch<'a> {
    /// Row-major input matrix, shape `(rows, input_dim)`.
    #[inline]
    pub fn inputs(&self) -> &'a [f32] {
        self.inputs
    }

    /// Integer class labels, one per row.
    #[inline]
    pub fn labels(&self) -> &'a [usize] {
        self.labels
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }
}

/// A finite, restartable sequence of batches.
///
/// `reset` rewinds to the start of an epoch; `next_batch` yields batches in
/// the source's order until the epoch is exhausted.
pub trait BatchSource {
    /// Per-sample input width.
    fn input_dim(&self) -> usize;

    /// Rewind to the first batch of an epoch.
    fn reset(&mut self);

    /// The next batch of the current epoch, or `None` when exhausted.
    fn next_batch(&mut self) -> Option<Batch<'_>>;
}

/// In-memory batch source over contiguous row-major storage.
///
/// Samples are yielded in insertion order, split into fixed-size batches
/// (the final batch may be smaller), identically on every epoch.
#[derive(Debug, Clone)]
pub struct Batches {
    inputs: Vec<f32>,
    labels: Vec<usize>,
    len: usize,
    input_dim: usize,
    batch_size: usize,
    cursor: usize,
}

impl Batches {
    /// Build from a flat input buffer with shape `(len, input_dim)` and one
    /// label per sample.
    pub fn from_flat(
        inputs: Vec<f32>,
        labels: Vec<usize>,
        input_dim: usize,
        batch_size: usize,
    ) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::Config("input_dim must be > 0".to_owned()));
        }
        if batch_size == 0 {
            return Err(Error::Config("batch_size must be > 0".to_owned()));
        }
        if inputs.len() % input_dim != 0 {
            return Err(Error::Shape(format!(
                "inputs length {} is not divisible by input_dim {}",
                inputs.len(),
                input_dim
            )));
        }

        let len = inputs.len() / input_dim;
        if len == 0 {
            return Err(Error::Value("batch source must not be empty".to_owned()));
        }
        if labels.len() != len {
            return Err(Error::Shape(format!(
                "labels length {} does not match sample count {len}",
                labels.len()
            )));
        }

        Ok(Self {
            inputs,
            labels,
            len,
            input_dim,
            batch_size,
            cursor: 0,
        })
    }

    /// Build from per-sample rows.
    ///
    /// This is a convenience constructor (it copies into contiguous storage).
    pub fn from_rows(inputs: &[Vec<f32>], labels: &[usize], batch_size: usize) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::Value("batch source must not be empty".to_owned()));
        }
        if inputs.len() != labels.len() {
            return Err(Error::Shape(format!(
                "inputs/labels length mismatch: {} vs {}",
                inputs.len(),
                labels.len()
            )));
        }

        let input_dim = inputs[0].len();
        for (i, row) in inputs.iter().enumerate() {
            if row.len() != input_dim {
                return Err(Error::Shape(format!(
                    "input row {i} has len {}, expected {input_dim}",
                    row.len()
                )));
            }
        }

        let mut flat = Vec::with_capacity(inputs.len() * input_dim);
        for row in inputs {
            flat.extend_from_slice(row);
        }

        Self::from_flat(flat, labels.to_vec(), input_dim, batch_size)
    }

    /// Returns the number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches per epoch.
    #[inline]
    pub fn num_batches(&self) -> usize {
        self.len.div_ceil(self.batch_size)
    }
}

impl BatchSource for Batches {
    #[inline]
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn next_batch(&mut self) -> Option<Batch<'_>> {
        if self.cursor >= self.len {
            return None;
        }

        let start = self.cursor;
        let end = (start + self.batch_size).min(self.len);
        self.cursor = end;

        Some(Batch {
            inputs: &self.inputs[start * self.input_dim..end * self.input_dim],
            labels: &self.labels[start..end],
            input_dim: self.input_dim,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flat_validates_shapes() {
        let ok = Batches::from_flat(vec![0.0; 8], vec![0, 1, 0, 1], 2, 2);
        assert!(ok.is_ok());

        assert!(matches!(
            Batches::from_flat(vec![0.0; 7], vec![0, 1, 0], 2, 2),
            Err(Error::Shape(_))
        ));
        assert!(matches!(
            Batches::from_flat(vec![0.0; 8], vec![0, 1], 2, 2),
            Err(Error::Shape(_))
        ));
        assert!(matches!(
            Batches::from_flat(vec![0.0; 8], vec![0; 4], 2, 0),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Batches::from_flat(vec![], vec![], 2, 2),
            Err(Error::Value(_))
        ));
    }

    #[test]
    fn yields_fixed_batches_with_smaller_tail() {
        let mut src = Batches::from_flat((0..10).map(|v| v as f32).collect(), vec![0; 5], 2, 2)
            .unwrap();
        assert_eq!(src.num_batches(), 3);

        let rows: Vec<usize> = std::iter::from_fn(|| src.next_batch().map(|b| b.rows())).collect();
        assert_eq!(rows, vec![2, 2, 1]);
        assert!(src.next_batch().is_none());
    }

    #[test]
    fn reset_restarts_the_identical_sequence() {
        let mut src =
            Batches::from_flat(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![0, 1, 2], 2, 2).unwrap();

        let first: Vec<Vec<f32>> =
            std::iter::from_fn(|| src.next_batch().map(|b| b.inputs().to_vec())).collect();
        src.reset();
        let second: Vec<Vec<f32>> =
            std::iter::from_fn(|| src.next_batch().map(|b| b.inputs().to_vec())).collect();

        assert_eq!(first, second);
    }
}
