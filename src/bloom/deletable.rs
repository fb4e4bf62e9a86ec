use super::config::DeletableBloomFilterConfig;
use crate::buckets::Buckets;
use crate::error::{FilterError, Result};
use crate::filter::{Filter, RemovableFilter};
use crate::hash::{HashAlgorithm, HashKernel, optimal_k, optimal_m};

/// Bloom filter supporting removal without false negatives.
///
/// The bit array is divided into `r` regions. A region that ever saw two
/// elements set the same bit is marked as colliding and its bits are never
/// cleared; removal only clears bits in collision-free regions.
#[derive(Clone, Debug)]
pub struct DeletableBloomFilter {
    buckets: Buckets,
    collisions: Buckets,
    hash_algorithm: HashAlgorithm,
    m: usize,
    k: usize,
    regions: usize,
    region_size: usize,
    count: usize,
}

impl DeletableBloomFilter {
    pub fn new(config: DeletableBloomFilterConfig) -> Result<Self> {
        config.validate()?;

        let total = optimal_m(config.capacity, config.false_positive_rate);
        let k = optimal_k(config.false_positive_rate);
        let regions = config.regions;
        if regions >= total {
            return Err(FilterError::InvalidConfig(format!(
                "Regions ({regions}) must be fewer than the filter size ({total})"
            )));
        }

        // r bits of the optimal size are spent on the collision bitmap
        let m = total - regions;
        let region_size = (m / regions).max(1);
        let region_count = (m - 1) / region_size + 1;

        Ok(Self {
            buckets: Buckets::new(m, 1)?,
            collisions: Buckets::new(region_count, 1)?,
            hash_algorithm: config.hash_algorithm,
            m,
            k,
            regions,
            region_size,
            count: 0,
        })
    }

    /// Sized for `n` items at `fp_rate` with `r` regions.
    pub fn with_rate(n: usize, r: usize, fp_rate: f64) -> Result<Self> {
        Self::new(DeletableBloomFilterConfig {
            capacity: n,
            false_positive_rate: fp_rate,
            regions: r,
            hash_algorithm: HashAlgorithm::default(),
        })
    }

    /// Number of bits available to elements.
    pub fn capacity(&self) -> usize {
        self.m
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn regions(&self) -> usize {
        self.regions
    }

    pub fn region_size(&self) -> usize {
        self.region_size
    }

    /// Number of regions marked as colliding.
    pub fn collided_regions(&self) -> usize {
        self.collisions.count_nonzero()
    }

    pub fn fill_ratio(&self) -> f64 {
        self.buckets.count_nonzero() as f64 / self.m as f64
    }

    pub fn estimated_fill_ratio(&self) -> f64 {
        1.0 - (-(self.count as f64) * self.k as f64 / self.m as f64).exp()
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

    fn mark_or_set(&mut self, idx: usize) -> Result<()> {
        if self.buckets.get(idx)? == 1 {
            self.collisions.set(idx / self.region_size, 1)?;
        } else {
            self.buckets.set(idx, 1)?;
        }
        Ok(())
    }
}

impl Filter for DeletableBloomFilter {
    fn add(&mut self, data: &[u8]) -> Result<()> {
        for idx in self.indices(data) {
            self.mark_or_set(idx)?;
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
            self.mark_or_set(idx)?;
        }
        self.count += 1;
        Ok(member)
    }

    fn reset(&mut self) {
        self.buckets.reset();
        self.collisions.reset();
        self.count = 0;
    }
}

impl RemovableFilter for DeletableBloomFilter {
    fn test_and_remove(&mut self, data: &[u8]) -> Result<bool> {
        let indices = self.indices(data);
        for &idx in &indices {
            if self.buckets.get(idx)? == 0 {
                return Ok(false);
            }
        }
        for idx in indices {
            if self.collisions.get(idx / self.region_size)? == 0 {
                self.buckets.set(idx, 0)?;
            }
        }
        self.count = self.count.saturating_sub(1);
        Ok(true)
    }
}
