//! MinHash estimate of the Jaccard similarity between two bags.
//!
//! For each of `k` hash functions the minimum over a bag is recorded; the
//! fraction of functions on which two bags agree estimates
//! `|A ∩ B| / |A ∪ B|`. Small bags give coarse estimates.
use crate::error::{FilterError, Result};
use crate::hash::{HashAlgorithm, HashKernel64};
use derive_builder::Builder;

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct MinHashConfig {
    /// Number of hash functions, `k`
    #[builder(default = "128")]
    pub num_hashes: usize,

    #[builder(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl MinHashConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_hashes == 0 {
            return Err(FilterError::InvalidConfig(
                "Number of hash functions must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct MinHash {
    num_hashes: usize,
    hash_algorithm: HashAlgorithm,
}

impl MinHash {
    pub fn new(config: MinHashConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            num_hashes: config.num_hashes,
            hash_algorithm: config.hash_algorithm,
        })
    }

    pub fn with_hashes(num_hashes: usize) -> Result<Self> {
        Self::new(MinHashConfig {
            num_hashes,
            hash_algorithm: HashAlgorithm::default(),
        })
    }

    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn set_hash_algorithm(&mut self, hash_algorithm: HashAlgorithm) {
        self.hash_algorithm = hash_algorithm;
    }

    /// Per-function minima over `bag`. An empty bag yields `u64::MAX`
    /// everywhere.
    pub fn signature<T: AsRef<[u8]>>(&self, bag: &[T]) -> Vec<u64> {
        let kernels: Vec<HashKernel64> = bag
            .iter()
            .map(|item| HashKernel64::new(item.as_ref(), &self.hash_algorithm))
            .collect();

        (0..self.num_hashes as u64)
            .map(|i| {
                kernels
                    .iter()
                    .map(|kernel| kernel.hash(i))
                    .min()
                    .unwrap_or(u64::MAX)
            })
            .collect()
    }

    /// Estimated Jaccard similarity in `[0, 1]`. Two empty bags are
    /// identical; an empty and a non-empty bag share nothing.
    pub fn similarity<T: AsRef<[u8]>>(&self, a: &[T], b: &[T]) -> f64 {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => return 1.0,
            (true, false) | (false, true) => return 0.0,
            (false, false) => {}
        }

        let matches = self
            .signature(a)
            .into_iter()
            .zip(self.signature(b))
            .filter(|(x, y)| x == y)
            .count();
        matches as f64 / self.num_hashes as f64
    }
}

/// Similarity of two bags using `|A| + |B|` hash functions.
pub fn min_hash<T: AsRef<[u8]>>(a: &[T], b: &[T]) -> f64 {
    let minhash = MinHash {
        num_hashes: (a.len() + b.len()).max(1),
        hash_algorithm: HashAlgorithm::default(),
    };
    minhash.similarity(a, b)
}
