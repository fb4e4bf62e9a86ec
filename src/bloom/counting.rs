use super::config::CountingBloomFilterConfig;
use crate::buckets::Buckets;
use crate::error::Result;
use crate::filter::{Filter, RemovableFilter};
use crate::hash::{HashAlgorithm, HashKernel, optimal_k, optimal_m};

/// Bloom filter with multi-bit counters, so members can be removed.
///
/// Counters saturate at their maximum and removal of a saturated counter
/// can yield false negatives later on.
#[derive(Clone, Debug)]
pub struct CountingBloomFilter {
    buckets: Buckets,
    hash_algorithm: HashAlgorithm,
    m: usize,
    k: usize,
    count: usize,
}

impl CountingBloomFilter {
    pub fn new(config: CountingBloomFilterConfig) -> Result<Self> {
        config.validate()?;

        let m = optimal_m(config.capacity, config.false_positive_rate);
        let k = optimal_k(config.false_positive_rate);

        Ok(Self {
            buckets: Buckets::new(m, config.bucket_bits)?,
            hash_algorithm: config.hash_algorithm,
            m,
            k,
            count: 0,
        })
    }

    /// Sized for `n` items at `fp_rate` with 4-bit counters.
    pub fn with_rate(n: usize, fp_rate: f64) -> Result<Self> {
        Self::new(CountingBloomFilterConfig {
            capacity: n,
            false_positive_rate: fp_rate,
            bucket_bits: 4,
            hash_algorithm: HashAlgorithm::default(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.m
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn bucket_bits(&self) -> u8 {
        self.buckets.bucket_size()
    }

    pub fn estimated_fill_ratio(&self) -> f64 {
        1.0 - (-(self.count as f64) * self.k as f64 / self.m as f64).exp()
    }

    /// Fraction of non-zero counters.
    pub fn fill_ratio(&self) -> f64 {
        self.buckets.count_nonzero() as f64 / self.m as f64
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn set_hash_algorithm(&mut self, hash_algorithm: HashAlgorithm) {
        self.hash_algorithm = hash_algorithm;
    }

    fn indices(&self, data: &[u8]) -> Vec<usize> {
        HashKernel::new(data, &self.hash_algorithm)
            .indices(self.k, self.m)
            .collect()
    }
}

impl Filter for CountingBloomFilter {
    fn add(&mut self, data: &[u8]) -> Result<()> {
        for idx in self.indices(data) {
            self.buckets.increment(idx, 1)?;
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
            self.buckets.increment(idx, 1)?;
        }
        self.count += 1;
        Ok(member)
    }

    fn reset(&mut self) {
        self.buckets.reset();
        self.count = 0;
    }
}

impl RemovableFilter for CountingBloomFilter {
    fn test_and_remove(&mut self, data: &[u8]) -> Result<bool> {
        let indices = self.indices(data);
        for &idx in &indices {
            if self.buckets.get(idx)? == 0 {
                return Ok(false);
            }
        }
        for idx in indices {
            self.buckets.increment(idx, -1)?;
        }
        self.count = self.count.saturating_sub(1);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bloom::CountingBloomFilterConfigBuilder;

    #[test]
    fn test_defaults() {
        let filter = CountingBloomFilter::with_rate(100, 0.1).unwrap();
        assert_eq!(filter.capacity(), 480);
        assert_eq!(filter.k(), 4);
        assert_eq!(filter.bucket_bits(), 4);
    }

    #[test]
    fn test_add_and_remove() {
        let mut filter = CountingBloomFilter::with_rate(100, 0.01).unwrap();
        filter.add(b"a").unwrap();
        assert!(filter.test(b"a").unwrap());
        assert_eq!(filter.count(), 1);

        assert!(!filter.test_and_remove(b"b").unwrap());
        assert_eq!(filter.count(), 1);

        assert!(filter.test_and_remove(b"a").unwrap());
        assert!(!filter.test(b"a").unwrap());
        assert_eq!(filter.count(), 0);
        assert_eq!(filter.fill_ratio(), 0.0);
    }

    #[test]
    fn test_counts_repeat_adds() {
        let mut filter = CountingBloomFilter::with_rate(100, 0.01).unwrap();
        assert!(!filter.test_and_add(b"a").unwrap());
        assert!(filter.test_and_add(b"a").unwrap());

        assert!(filter.test_and_remove(b"a").unwrap());
        assert!(filter.test(b"a").unwrap());
        assert!(filter.test_and_remove(b"a").unwrap());
        assert!(!filter.test(b"a").unwrap());
    }

    #[test]
    fn test_saturating_counters() {
        let config = CountingBloomFilterConfigBuilder::default()
            .capacity(100)
            .bucket_bits(1)
            .build()
            .unwrap();
        let mut filter = CountingBloomFilter::new(config).unwrap();
        filter.add(b"a").unwrap();
        filter.add(b"a").unwrap();
        assert!(filter.test_and_remove(b"a").unwrap());
        // one-bit counters saturated at 1, so a single removal clears them
        assert!(!filter.test(b"a").unwrap());
    }

    #[test]
    fn test_reset() {
        let mut filter = CountingBloomFilter::with_rate(100, 0.1).unwrap();
        for i in 0..100 {
            filter.add(format!("{i}").as_bytes()).unwrap();
        }
        filter.reset();
        assert_eq!(filter.count(), 0);
        assert_eq!(filter.fill_ratio(), 0.0);
    }
}
