use super::config::StableBloomFilterConfig;
use crate::buckets::Buckets;
use crate::error::Result;
use crate::filter::Filter;
use crate::hash::{HashAlgorithm, HashKernel, optimal_k};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Stable Bloom filter for unbounded streams.
///
/// Every add first decrements `p` cells, starting at a random cell and
/// walking contiguously, then sets the element's `k` cells to the maximum
/// cell value. Old elements fade out, so the fraction of zero cells settles
/// at the stable point and the false positive rate stays bounded. This
/// buys a bounded false negative rate.
///
/// [`StableBloomFilter::unstable`] sets `p = 0` with one-bit cells, which is
/// a classic Bloom filter.
#[derive(Clone, Debug)]
pub struct StableBloomFilter {
    cells: Buckets,
    hash_algorithm: HashAlgorithm,
    rng: StdRng,
    m: usize,
    k: usize,
    p: usize,
    max: u8,
    count: usize,
}

impl StableBloomFilter {
    pub fn new(config: StableBloomFilterConfig) -> Result<Self> {
        config.validate()?;

        let m = config.cells;
        let k = (optimal_k(config.false_positive_rate) / 2).clamp(1, m);
        let p = optimal_stable_p(m, k, config.bucket_bits, config.false_positive_rate);

        Self::build(m, k, p, config.bucket_bits, config.seed, config.hash_algorithm)
    }

    /// `m` one-bit cells tuned for `fp_rate`.
    pub fn with_rate(m: usize, fp_rate: f64) -> Result<Self> {
        Self::new(StableBloomFilterConfig {
            cells: m,
            bucket_bits: 1,
            false_positive_rate: fp_rate,
            seed: None,
            hash_algorithm: HashAlgorithm::default(),
        })
    }

    /// No eviction and one-bit cells: a classic Bloom filter of `m` bits.
    pub fn unstable(m: usize, fp_rate: f64) -> Result<Self> {
        let config = StableBloomFilterConfig {
            cells: m,
            bucket_bits: 1,
            false_positive_rate: fp_rate,
            seed: None,
            hash_algorithm: HashAlgorithm::default(),
        };
        config.validate()?;

        let k = optimal_k(fp_rate);
        Self::build(m, k, 0, 1, None, config.hash_algorithm)
    }

    fn build(
        m: usize,
        k: usize,
        p: usize,
        bucket_bits: u8,
        seed: Option<u64>,
        hash_algorithm: HashAlgorithm,
    ) -> Result<Self> {
        let cells = Buckets::new(m, bucket_bits)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            max: cells.max_bucket_value(),
            cells,
            hash_algorithm,
            rng,
            m,
            k,
            p,
            count: 0,
        })
    }

    /// Number of cells.
    pub fn capacity(&self) -> usize {
        self.m
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Cells decremented per add.
    pub fn p(&self) -> usize {
        self.p
    }

    pub fn max_cell_value(&self) -> u8 {
        self.max
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Fraction of non-zero cells.
    pub fn fill_ratio(&self) -> f64 {
        self.cells.count_nonzero() as f64 / self.m as f64
    }

    /// Limit of the expected fraction of zero cells as the stream grows.
    pub fn stable_point(&self) -> f64 {
        let sub_denom = self.p as f64 * (1.0 / self.k as f64 - 1.0 / self.m as f64);
        let denom = 1.0 + 1.0 / sub_denom;
        let base = 1.0 / denom;
        base.powi(self.max as i32)
    }

    /// False positive rate once the filter reached its stable point.
    pub fn false_positive_rate(&self) -> f64 {
        (1.0 - self.stable_point()).powi(self.k as i32)
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

    /// Decrements `p` contiguous cells from a random start, wrapping at `m`.
    fn decrement(&mut self) -> Result<()> {
        if self.p == 0 {
            return Ok(());
        }
        let start = self.rng.random_range(0..self.m);
        for i in 0..self.p {
            self.cells.increment((start + i) % self.m, -1)?;
        }
        Ok(())
    }
}

impl Filter for StableBloomFilter {
    fn add(&mut self, data: &[u8]) -> Result<()> {
        self.decrement()?;
        for idx in self.indices(data) {
            self.cells.set(idx, self.max)?;
        }
        self.count += 1;
        Ok(())
    }

    fn test(&self, data: &[u8]) -> Result<bool> {
        for idx in self.indices(data) {
            if self.cells.get(idx)? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn test_and_add(&mut self, data: &[u8]) -> Result<bool> {
        let indices = self.indices(data);
        let mut member = true;
        for &idx in &indices {
            if self.cells.get(idx)? == 0 {
                member = false;
            }
        }

        self.decrement()?;
        for idx in indices {
            self.cells.set(idx, self.max)?;
        }
        self.count += 1;
        Ok(member)
    }

    fn reset(&mut self) {
        self.cells.reset();
        self.count = 0;
    }
}

/// Cells to decrement per add so the stable false positive rate meets
/// `fp_rate`. Never less than one, never more than `m`.
pub fn optimal_stable_p(m: usize, k: usize, bucket_bits: u8, fp_rate: f64) -> usize {
    let max = ((1u16 << bucket_bits) - 1) as f64;
    let sub_denom = (1.0 - fp_rate.powf(1.0 / k as f64)).powf(1.0 / max);
    let denom = (1.0 / sub_denom - 1.0) * (1.0 / k as f64 - 1.0 / m as f64);
    let p = 1.0 / denom;
    if !p.is_finite() || p < 1.0 {
        return 1;
    }
    (p as usize).min(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bloom::StableBloomFilterConfigBuilder;

    fn seeded(cells: usize, bucket_bits: u8, fp_rate: f64) -> StableBloomFilter {
        let config = StableBloomFilterConfigBuilder::default()
            .cells(cells)
            .bucket_bits(bucket_bits)
            .false_positive_rate(fp_rate)
            .seed(Some(42))
            .build()
            .unwrap();
        StableBloomFilter::new(config).unwrap()
    }

    #[test]
    fn test_parameters() {
        let filter = seeded(10_000, 1, 0.01);
        assert_eq!(filter.k(), 3);
        assert_eq!(filter.p(), 10);
        assert_eq!(filter.max_cell_value(), 1);

        let filter = seeded(1000, 8, 0.01);
        assert_eq!(filter.max_cell_value(), 255);
        assert!(filter.p() >= 1);
    }

    #[test]
    fn test_stable_point_formula() {
        let filter = seeded(10_000, 1, 0.01);
        // 10 decrements vs 3 sets per add: zeros settle at 10/13
        let expected = 1.0 / (1.0 + 1.0 / (10.0 * (1.0 / 3.0 - 1.0 / 10_000.0)));
        assert!((filter.stable_point() - expected).abs() < 1e-12);
        let fp_rate = filter.false_positive_rate();
        assert!(fp_rate > 0.005 && fp_rate < 0.02, "{fp_rate}");
    }

    #[test]
    fn test_converges_to_stable_point() {
        let mut filter = seeded(10_000, 1, 0.01);
        for i in 0..50_000 {
            filter.add(format!("{i}").as_bytes()).unwrap();
        }
        let zeros = 1.0 - filter.fill_ratio();
        assert!(
            (zeros - filter.stable_point()).abs() < 0.05,
            "zero fraction {zeros} vs stable point {}",
            filter.stable_point()
        );
    }

    #[test]
    fn test_recent_adds_are_members() {
        let mut filter = seeded(10_000, 2, 0.01);
        for i in 0..100 {
            let item = format!("{i}");
            filter.add(item.as_bytes()).unwrap();
            assert!(filter.test(item.as_bytes()).unwrap());
        }
        filter.test_and_add(b"fresh").unwrap();
        assert!(filter.test(b"fresh").unwrap());
        assert!(filter.test_and_add(b"fresh").unwrap());
    }

    #[test]
    fn test_unstable_is_classic() {
        let mut filter = StableBloomFilter::unstable(1000, 0.01).unwrap();
        assert_eq!(filter.p(), 0);
        assert_eq!(filter.k(), 7);
        assert_eq!(filter.stable_point(), 0.0);
        assert_eq!(filter.false_positive_rate(), 1.0);

        for i in 0..50 {
            filter.add(format!("{i}").as_bytes()).unwrap();
        }
        // nothing is ever evicted
        for i in 0..50 {
            assert!(filter.test(format!("{i}").as_bytes()).unwrap());
        }
    }

    #[test]
    fn test_reset() {
        let mut filter = seeded(1000, 1, 0.01);
        for i in 0..100 {
            filter.add(format!("{i}").as_bytes()).unwrap();
        }
        filter.reset();
        assert_eq!(filter.fill_ratio(), 0.0);
        assert_eq!(filter.count(), 0);
    }

    #[test]
    fn test_optimal_stable_p_floor() {
        assert_eq!(optimal_stable_p(1, 1, 1, 0.5), 1);
        assert_eq!(optimal_stable_p(10_000, 3, 1, 0.01), 10);
    }
}
