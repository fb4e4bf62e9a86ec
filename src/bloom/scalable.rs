use super::config::{BloomFilterConfig, ScalableBloomFilterConfig};
use super::partitioned::PartitionedBloomFilter;
use crate::error::Result;
use crate::filter::Filter;
use crate::hash::HashAlgorithm;
use tracing::{debug, trace};

/// Growable Bloom filter built from a series of partitioned filters.
///
/// Filter `i` targets `fp_rate * r^i`. A new filter is appended once the
/// newest one's estimated fill ratio reaches `P`; queries OR across the
/// whole series.
#[derive(Clone, Debug)]
pub struct ScalableBloomFilter {
    filters: Vec<PartitionedBloomFilter>,
    hash_algorithm: HashAlgorithm,
    r: f64,
    fp: f64,
    p: f64,
    hint: usize,
}

impl ScalableBloomFilter {
    pub fn new(config: ScalableBloomFilterConfig) -> Result<Self> {
        config.validate()?;

        let mut filter = Self {
            filters: Vec::with_capacity(1),
            hash_algorithm: config.hash_algorithm,
            r: config.tightening_ratio,
            fp: config.false_positive_rate,
            p: config.fill_ratio,
            hint: config.hint,
        };
        filter.add_filter()?;
        Ok(filter)
    }

    /// Hint of 10,000 items per filter and a tightening ratio of 0.8.
    pub fn with_rate(fp_rate: f64) -> Result<Self> {
        Self::new(ScalableBloomFilterConfig {
            hint: 10_000,
            false_positive_rate: fp_rate,
            tightening_ratio: 0.8,
            fill_ratio: 0.5,
            hash_algorithm: HashAlgorithm::default(),
        })
    }

    /// Total bits across the series.
    pub fn capacity(&self) -> usize {
        self.filters.iter().map(PartitionedBloomFilter::capacity).sum()
    }

    /// Hash functions of the first filter.
    pub fn k(&self) -> usize {
        self.filters.first().map_or(0, PartitionedBloomFilter::k)
    }

    pub fn count(&self) -> usize {
        self.filters.iter().map(PartitionedBloomFilter::count).sum()
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub fn tightening_ratio(&self) -> f64 {
        self.r
    }

    /// Mean fill ratio of the series.
    pub fn fill_ratio(&self) -> f64 {
        let sum: f64 = self.filters.iter().map(PartitionedBloomFilter::fill_ratio).sum();
        sum / self.filters.len() as f64
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn set_hash_algorithm(&mut self, hash_algorithm: HashAlgorithm) {
        self.hash_algorithm = hash_algorithm;
        for filter in &mut self.filters {
            filter.set_hash_algorithm(hash_algorithm);
        }
    }

    fn add_filter(&mut self) -> Result<()> {
        let index = self.filters.len();
        let fp_rate = self.fp * self.r.powi(index as i32);
        let filter = PartitionedBloomFilter::new(BloomFilterConfig {
            capacity: self.hint,
            false_positive_rate: fp_rate,
            hash_algorithm: self.hash_algorithm,
        })?;
        debug!(index, fp_rate, capacity = filter.capacity(), "Appending filter");
        self.filters.push(filter);
        Ok(())
    }

    /// Newest filter, the only one that takes adds. The series always holds
    /// at least one filter.
    fn tail(&self) -> &PartitionedBloomFilter {
        &self.filters[self.filters.len() - 1]
    }

    fn tail_mut(&mut self) -> &mut PartitionedBloomFilter {
        let last = self.filters.len() - 1;
        &mut self.filters[last]
    }
}

impl Filter for ScalableBloomFilter {
    fn add(&mut self, data: &[u8]) -> Result<()> {
        if self.tail().estimated_fill_ratio() >= self.p {
            self.add_filter()?;
        }
        self.tail_mut().add(data)
    }

    fn test(&self, data: &[u8]) -> Result<bool> {
        for filter in &self.filters {
            if filter.test(data)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn test_and_add(&mut self, data: &[u8]) -> Result<bool> {
        let member = self.test(data)?;
        self.add(data)?;
        Ok(member)
    }

    fn reset(&mut self) {
        trace!(filters = self.filters.len(), "Resetting scalable filter");
        // the head filter already has the parameters of a fresh first filter
        self.filters.truncate(1);
        if let Some(filter) = self.filters.first_mut() {
            filter.reset();
        }
    }
}
