//! Count-Min sketch for frequency estimation.
//!
//! A `depth x width` matrix of counters. Each row hashes an element to one
//! counter; the estimate is the minimum over the rows, so it never
//! underestimates. With `width = ceil(e / epsilon)` and
//! `depth = ceil(ln(1 / delta))` the overestimate stays within
//! `epsilon * total` with probability `1 - delta`.
use crate::error::{FilterError, Result};
use crate::hash::{HashAlgorithm, HashKernel};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct CountMinSketchConfig {
    /// Relative accuracy
    #[builder(default = "0.001")]
    pub epsilon: f64,

    /// Failure probability of the accuracy bound
    #[builder(default = "0.99")]
    pub delta: f64,

    #[builder(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl CountMinSketchConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0 && self.epsilon < 1.0) {
            return Err(FilterError::InvalidConfig(format!(
                "Epsilon must be between 0 and 1, got {}",
                self.epsilon
            )));
        }
        if !(self.delta > 0.0 && self.delta < 1.0) {
            return Err(FilterError::InvalidConfig(format!(
                "Delta must be between 0 and 1, got {}",
                self.delta
            )));
        }
        Ok(())
    }
}

/// Complete sketch state, for external encoders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountMinSketchState {
    pub width: usize,
    pub depth: usize,
    pub epsilon: f64,
    pub delta: f64,
    pub count: u64,
    pub hash_algorithm: String,
    pub matrix: Vec<Vec<u64>>,
}

#[derive(Clone, Debug)]
pub struct CountMinSketch {
    matrix: Vec<Vec<u64>>,
    width: usize,
    depth: usize,
    epsilon: f64,
    delta: f64,
    count: u64,
    hash_algorithm: HashAlgorithm,
}

impl CountMinSketch {
    pub fn new(config: CountMinSketchConfig) -> Result<Self> {
        config.validate()?;

        let width = (std::f64::consts::E / config.epsilon).ceil() as usize;
        let depth = (1.0 / config.delta).ln().ceil() as usize;

        Ok(Self {
            matrix: vec![vec![0; width]; depth],
            width,
            depth,
            epsilon: config.epsilon,
            delta: config.delta,
            count: 0,
            hash_algorithm: config.hash_algorithm,
        })
    }

    pub fn with_accuracy(epsilon: f64, delta: f64) -> Result<Self> {
        Self::new(CountMinSketchConfig {
            epsilon,
            delta,
            hash_algorithm: HashAlgorithm::default(),
        })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of additions, weighted.
    pub fn total_count(&self) -> u64 {
        self.count
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn set_hash_algorithm(&mut self, hash_algorithm: HashAlgorithm) {
        self.hash_algorithm = hash_algorithm;
    }

    pub fn add(&mut self, data: &[u8]) -> &mut Self {
        self.add_count(data, 1)
    }

    /// Adds `n` occurrences of `data`. Counters saturate at `u64::MAX`.
    pub fn add_count(&mut self, data: &[u8], n: u64) -> &mut Self {
        let kernel = HashKernel::new(data, &self.hash_algorithm);
        for (row, counters) in self.matrix.iter_mut().enumerate() {
            let counter = &mut counters[kernel.index(row, self.width)];
            *counter = counter.saturating_add(n);
        }
        self.count = self.count.saturating_add(n);
        self
    }

    /// Estimated frequency of `data`, never below the true frequency.
    pub fn count(&self, data: &[u8]) -> u64 {
        let kernel = HashKernel::new(data, &self.hash_algorithm);
        self.matrix
            .iter()
            .enumerate()
            .map(|(row, counters)| counters[kernel.index(row, self.width)])
            .min()
            .unwrap_or(0)
    }

    /// Adds `other`'s counters into this sketch. Both need the same depth and
    /// width.
    pub fn merge(&mut self, other: &CountMinSketch) -> Result<()> {
        if self.depth != other.depth {
            debug!(self.depth, other.depth, "Count-min depth mismatch");
            return Err(FilterError::DimensionMismatch {
                what: "matrix depth",
                expected: self.depth,
                actual: other.depth,
            });
        }
        if self.width != other.width {
            debug!(self.width, other.width, "Count-min width mismatch");
            return Err(FilterError::DimensionMismatch {
                what: "matrix width",
                expected: self.width,
                actual: other.width,
            });
        }

        for (row, other_row) in self.matrix.iter_mut().zip(&other.matrix) {
            for (counter, other_counter) in row.iter_mut().zip(other_row) {
                *counter = counter.saturating_add(*other_counter);
            }
        }
        self.count = self.count.saturating_add(other.count);
        Ok(())
    }

    pub fn reset(&mut self) -> &mut Self {
        trace!(self.depth, self.width, "Resetting count-min sketch");
        for row in &mut self.matrix {
            row.fill(0);
        }
        self.count = 0;
        self
    }

    pub fn state(&self) -> CountMinSketchState {
        CountMinSketchState {
            width: self.width,
            depth: self.depth,
            epsilon: self.epsilon,
            delta: self.delta,
            count: self.count,
            hash_algorithm: self.hash_algorithm.name().to_string(),
            matrix: self.matrix.clone(),
        }
    }

    /// Rebuilds a sketch from a snapshot. The hash algorithm must be one of
    /// the built-ins.
    pub fn from_state(state: CountMinSketchState) -> Result<Self> {
        let hash_algorithm = HashAlgorithm::from_name(&state.hash_algorithm)
            .ok_or_else(|| FilterError::UnknownHashAlgorithm(state.hash_algorithm.clone()))?;

        if state.matrix.len() != state.depth {
            return Err(FilterError::DimensionMismatch {
                what: "matrix depth",
                expected: state.depth,
                actual: state.matrix.len(),
            });
        }
        if let Some(row) = state.matrix.iter().find(|row| row.len() != state.width) {
            return Err(FilterError::DimensionMismatch {
                what: "matrix width",
                expected: state.width,
                actual: row.len(),
            });
        }

        Ok(Self {
            matrix: state.matrix,
            width: state.width,
            depth: state.depth,
            epsilon: state.epsilon,
            delta: state.delta,
            count: state.count,
            hash_algorithm,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(
            self.state(),
            bincode::config::standard(),
        )?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (state, _) = bincode::serde::decode_from_slice::<CountMinSketchState, _>(
            bytes,
            bincode::config::standard(),
        )?;
        Self::from_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let sketch = CountMinSketch::with_accuracy(0.001, 0.99).unwrap();
        assert_eq!(sketch.width(), 2719);
        assert_eq!(sketch.depth(), 1);

        let sketch = CountMinSketch::with_accuracy(0.1, 0.01).unwrap();
        assert_eq!(sketch.width(), 28);
        assert_eq!(sketch.depth(), 5);
        assert_eq!(sketch.epsilon(), 0.1);
        assert_eq!(sketch.delta(), 0.01);
    }

    #[test]
    fn test_invalid_config() {
        assert!(CountMinSketch::with_accuracy(0.0, 0.5).is_err());
        assert!(CountMinSketch::with_accuracy(0.1, 1.0).is_err());
    }

    #[test]
    fn test_add_and_count() {
        let mut sketch = CountMinSketch::with_accuracy(0.001, 0.01).unwrap();
        sketch.add(b"b").add(b"c").add(b"b").add(b"d");
        sketch.add_count(b"a", 3);

        assert_eq!(sketch.count(b"a"), 3);
        assert_eq!(sketch.count(b"b"), 2);
        assert_eq!(sketch.count(b"c"), 1);
        assert_eq!(sketch.count(b"d"), 1);
        assert_eq!(sketch.count(b"x"), 0);
        assert_eq!(sketch.total_count(), 7);
    }

    #[test]
    fn test_merge_sums() {
        let mut left = CountMinSketch::with_accuracy(0.001, 0.01).unwrap();
        let mut right = CountMinSketch::with_accuracy(0.001, 0.01).unwrap();
        left.add(b"a").add(b"b");
        right.add(b"a").add(b"c");

        left.merge(&right).unwrap();
        assert_eq!(left.count(b"a"), 2);
        assert_eq!(left.count(b"b"), 1);
        assert_eq!(left.count(b"c"), 1);
        assert_eq!(left.total_count(), 4);
    }

    #[test]
    fn test_merge_mismatch() {
        let mut left = CountMinSketch::with_accuracy(0.001, 0.01).unwrap();
        let deeper = CountMinSketch::with_accuracy(0.001, 0.001).unwrap();
        let wider = CountMinSketch::with_accuracy(0.0001, 0.01).unwrap();

        assert!(matches!(
            left.merge(&deeper),
            Err(FilterError::DimensionMismatch { what: "matrix depth", .. })
        ));
        assert!(matches!(
            left.merge(&wider),
            Err(FilterError::DimensionMismatch { what: "matrix width", .. })
        ));
    }

    #[test]
    fn test_reset() {
        let mut sketch = CountMinSketch::with_accuracy(0.001, 0.01).unwrap();
        sketch.add(b"a").add(b"a");
        sketch.reset();
        assert_eq!(sketch.count(b"a"), 0);
        assert_eq!(sketch.total_count(), 0);
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut sketch = CountMinSketch::with_accuracy(0.01, 0.1).unwrap();
        for i in 0..100 {
            sketch.add_count(format!("{i}").as_bytes(), i);
        }
        let bytes = sketch.to_bytes().unwrap();
        let decoded = CountMinSketch::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.state(), sketch.state());
        assert_eq!(decoded.count(b"42"), sketch.count(b"42"));
    }

    #[test]
    fn test_from_state_validation() {
        let sketch = CountMinSketch::with_accuracy(0.1, 0.1).unwrap();

        let mut state = sketch.state();
        state.hash_algorithm = "md5".into();
        assert_eq!(
            CountMinSketch::from_state(state).unwrap_err(),
            FilterError::UnknownHashAlgorithm("md5".into())
        );

        let mut state = sketch.state();
        state.matrix[0].pop();
        assert!(CountMinSketch::from_state(state).is_err());

        assert!(CountMinSketch::from_bytes(&[0xff, 0x01]).is_err());
    }
}
