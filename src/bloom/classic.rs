use super::config::BloomFilterConfig;
use crate::buckets::Buckets;
use crate::error::Result;
use crate::filter::Filter;
use crate::hash::{HashAlgorithm, HashKernel, HashKernel64, optimal_k, optimal_m};

/// Classic Bloom filter over a single bit array.
///
/// All `k` hash functions address the same `m` bits.
#[derive(Clone, Debug)]
pub struct BloomFilter {
    buckets: Buckets,
    hash_algorithm: HashAlgorithm,
    m: usize,
    k: usize,
    count: usize,
}

impl BloomFilter {
    pub fn new(config: BloomFilterConfig) -> Result<Self> {
        config.validate()?;

        let m = optimal_m(config.capacity, config.false_positive_rate);
        let k = optimal_k(config.false_positive_rate);

        Ok(Self {
            buckets: Buckets::new(m, 1)?,
            hash_algorithm: config.hash_algorithm,
            m,
            k,
            count: 0,
        })
    }

    /// Sized for `n` items at `fp_rate`, default hash.
    pub fn with_rate(n: usize, fp_rate: f64) -> Result<Self> {
        Self::new(BloomFilterConfig {
            capacity: n,
            false_positive_rate: fp_rate,
            hash_algorithm: HashAlgorithm::default(),
        })
    }

    /// Number of bits, `m`.
    pub fn capacity(&self) -> usize {
        self.m
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of items added.
    pub fn count(&self) -> usize {
        self.count
    }

    /// `1 - e^(-count * k / m)`
    pub fn estimated_fill_ratio(&self) -> f64 {
        1.0 - (-(self.count as f64) * self.k as f64 / self.m as f64).exp()
    }

    /// Observed fraction of set bits.
    pub fn fill_ratio(&self) -> f64 {
        self.buckets.count_nonzero() as f64 / self.m as f64
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    /// Stored bits stay as they are; reset after switching.
    pub fn set_hash_algorithm(&mut self, hash_algorithm: HashAlgorithm) {
        self.hash_algorithm = hash_algorithm;
    }

    fn indices(&self, data: &[u8]) -> Vec<usize> {
        if self.m > u32::MAX as usize {
            let kernel = HashKernel64::new(data, &self.hash_algorithm);
            (0..self.k).map(|i| kernel.index(i, self.m)).collect()
        } else {
            HashKernel::new(data, &self.hash_algorithm)
                .indices(self.k, self.m)
                .collect()
        }
    }
}

impl Filter for BloomFilter {
    fn add(&mut self, data: &[u8]) -> Result<()> {
        for idx in self.indices(data) {
            self.buckets.set(idx, 1)?;
        }
        self.count += 1;
        Ok(())
    }

    fn test(&self, data: &[u8]) -> Result<bool> {
        for idx in self.indices(data) {
            if self.buckets.get(idx)? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn test_and_add(&mut self, data: &[u8]) -> Result<bool> {
        let mut member = true;
        for idx in self.indices(data) {
            if self.buckets.get(idx)? == 0 {
                member = false;
            }
            self.buckets.set(idx, 1)?;
        }
        self.count += 1;
        Ok(member)
    }

    fn reset(&mut self) {
        self.buckets.reset();
        self.count = 0;
    }
}
