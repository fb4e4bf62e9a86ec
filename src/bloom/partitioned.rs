use super::config::BloomFilterConfig;
use crate::buckets::Buckets;
use crate::error::Result;
use crate::filter::Filter;
use crate::hash::{HashAlgorithm, HashKernel, optimal_k, optimal_m};

/// Bloom filter whose `m` bits are split into `k` partitions of `s` bits,
/// with hash function `i` addressing partition `i` only.
#[derive(Clone, Debug)]
pub struct PartitionedBloomFilter {
    partitions: Vec<Buckets>,
    hash_algorithm: HashAlgorithm,
    m: usize,
    k: usize,
    s: usize,
    count: usize,
}

impl PartitionedBloomFilter {
    pub fn new(config: BloomFilterConfig) -> Result<Self> {
        config.validate()?;

        let m = optimal_m(config.capacity, config.false_positive_rate);
        let k = optimal_k(config.false_positive_rate);
        let s = m.div_ceil(k);
        let partitions = (0..k)
            .map(|_| Buckets::new(s, 1))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            partitions,
            hash_algorithm: config.hash_algorithm,
            m,
            k,
            s,
            count: 0,
        })
    }

    pub fn with_rate(n: usize, fp_rate: f64) -> Result<Self> {
        Self::new(BloomFilterConfig {
            capacity: n,
            false_positive_rate: fp_rate,
            hash_algorithm: HashAlgorithm::default(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.m
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Bits per partition.
    pub fn partition_size(&self) -> usize {
        self.s
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// `1 - e^(-count / s)`
    pub fn estimated_fill_ratio(&self) -> f64 {
        1.0 - (-(self.count as f64) / self.s as f64).exp()
    }

    /// Mean of the per-partition fill ratios.
    pub fn fill_ratio(&self) -> f64 {
        let total: f64 = self
            .partitions
            .iter()
            .map(|partition| partition.count_nonzero() as f64 / self.s as f64)
            .sum();
        total / self.k as f64
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn set_hash_algorithm(&mut self, hash_algorithm: HashAlgorithm) {
        self.hash_algorithm = hash_algorithm;
    }
}

impl Filter for PartitionedBloomFilter {
    fn add(&mut self, data: &[u8]) -> Result<()> {
        let kernel = HashKernel::new(data, &self.hash_algorithm);
        for (i, partition) in self.partitions.iter_mut().enumerate() {
            partition.set(kernel.index(i, self.s), 1)?;
        }
        self.count += 1;
        Ok(())
    }

    fn test(&self, data: &[u8]) -> Result<bool> {
        let kernel = HashKernel::new(data, &self.hash_algorithm);
        for (i, partition) in self.partitions.iter().enumerate() {
            if partition.get(kernel.index(i, self.s))? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn test_and_add(&mut self, data: &[u8]) -> Result<bool> {
        let kernel = HashKernel::new(data, &self.hash_algorithm);
        let mut member = true;
        for (i, partition) in self.partitions.iter_mut().enumerate() {
            let idx = kernel.index(i, self.s);
            if partition.get(idx)? == 0 {
                member = false;
            }
            partition.set(idx, 1)?;
        }
        self.count += 1;
        Ok(member)
    }

    fn reset(&mut self) {
        for partition in &mut self.partitions {
            partition.reset();
        }
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizing() {
        let filter = PartitionedBloomFilter::with_rate(100, 0.1).unwrap();
        assert_eq!(filter.capacity(), 480);
        assert_eq!(filter.k(), 4);
        assert_eq!(filter.partition_size(), 120);
    }

    #[test]
    fn test_add_test_and_add() {
        let mut filter = PartitionedBloomFilter::with_rate(100, 0.01).unwrap();
        assert!(!filter.test(b"a").unwrap());
        filter.add(b"a").unwrap();
        assert!(filter.test(b"a").unwrap());

        assert!(!filter.test_and_add(b"b").unwrap());
        assert!(filter.test_and_add(b"b").unwrap());
        assert_eq!(filter.count(), 3);
    }

    #[test]
    fn test_one_bit_per_partition() {
        let mut filter = PartitionedBloomFilter::with_rate(100, 0.01).unwrap();
        filter.add(b"only").unwrap();
        // exactly one bit per partition
        let expected = 1.0 / filter.partition_size() as f64;
        assert!((filter.fill_ratio() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_fill_ratio_and_reset() {
        let mut filter = PartitionedBloomFilter::with_rate(100, 0.1).unwrap();
        for i in 0..100 {
            filter.add(format!("{i}").as_bytes()).unwrap();
        }
        let estimated = filter.estimated_fill_ratio();
        let observed = filter.fill_ratio();
        assert!((estimated - observed).abs() < 0.1, "{estimated} vs {observed}");

        filter.reset();
        assert_eq!(filter.fill_ratio(), 0.0);
        assert_eq!(filter.count(), 0);
        assert!(!filter.test(b"1").unwrap());
    }
}
