use crate::error::{FilterError, Result};
use crate::hash::HashAlgorithm;
use derive_builder::Builder;

pub(crate) fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(FilterError::InvalidConfig("Capacity must be > 0".into()));
    }
    Ok(())
}

pub(crate) fn validate_fp_rate(fp_rate: f64) -> Result<()> {
    if !(fp_rate > 0.0 && fp_rate < 1.0) {
        return Err(FilterError::InvalidConfig(format!(
            "FPR must be between 0 and 1, got {fp_rate}"
        )));
    }
    Ok(())
}

fn validate_bucket_bits(bucket_bits: u8) -> Result<()> {
    if bucket_bits == 0 || bucket_bits > 8 {
        return Err(FilterError::InvalidConfig(format!(
            "Bucket bits must be between 1 and 8, got {bucket_bits}"
        )));
    }
    Ok(())
}

/// Configuration for the classic and partitioned Bloom filters.
#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct BloomFilterConfig {
    /// Expected number of elements
    #[builder(default = "1_000_000")]
    pub capacity: usize,

    /// Target false positive rate (0.0 to 1.0)
    #[builder(default = "0.01")]
    pub false_positive_rate: f64,

    #[builder(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl BloomFilterConfig {
    pub fn validate(&self) -> Result<()> {
        validate_capacity(self.capacity)?;
        validate_fp_rate(self.false_positive_rate)
    }
}

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct CountingBloomFilterConfig {
    #[builder(default = "1_000_000")]
    pub capacity: usize,

    #[builder(default = "0.01")]
    pub false_positive_rate: f64,

    /// Width of each counter in bits
    #[builder(default = "4")]
    pub bucket_bits: u8,

    #[builder(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl CountingBloomFilterConfig {
    pub fn validate(&self) -> Result<()> {
        validate_capacity(self.capacity)?;
        validate_fp_rate(self.false_positive_rate)?;
        validate_bucket_bits(self.bucket_bits)
    }
}

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct DeletableBloomFilterConfig {
    #[builder(default = "1_000_000")]
    pub capacity: usize,

    #[builder(default = "0.01")]
    pub false_positive_rate: f64,

    /// Number of collision regions the bit array is split into
    #[builder(default = "100")]
    pub regions: usize,

    #[builder(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl DeletableBloomFilterConfig {
    pub fn validate(&self) -> Result<()> {
        validate_capacity(self.capacity)?;
        validate_fp_rate(self.false_positive_rate)?;
        if self.regions == 0 {
            return Err(FilterError::InvalidConfig("Regions must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct StableBloomFilterConfig {
    /// Number of cells
    #[builder(default = "10_000")]
    pub cells: usize,

    /// Width of each cell in bits
    #[builder(default = "1")]
    pub bucket_bits: u8,

    #[builder(default = "0.01")]
    pub false_positive_rate: f64,

    /// Seed for the eviction generator, `None` seeds from the OS
    #[builder(default)]
    pub seed: Option<u64>,

    #[builder(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl StableBloomFilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cells == 0 {
            return Err(FilterError::InvalidConfig("Cells must be > 0".into()));
        }
        validate_fp_rate(self.false_positive_rate)?;
        validate_bucket_bits(self.bucket_bits)
    }
}

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct ScalableBloomFilterConfig {
    /// Expected number of elements for each filter in the series
    #[builder(default = "10_000")]
    pub hint: usize,

    /// False positive rate of the first filter
    #[builder(default = "0.01")]
    pub false_positive_rate: f64,

    /// Factor the false positive rate shrinks by for each appended filter
    #[builder(default = "0.8")]
    pub tightening_ratio: f64,

    /// Estimated fill ratio at which a new filter is appended
    #[builder(default = "0.5")]
    pub fill_ratio: f64,

    #[builder(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl ScalableBloomFilterConfig {
    pub fn validate(&self) -> Result<()> {
        validate_capacity(self.hint)?;
        validate_fp_rate(self.false_positive_rate)?;
        if !(self.tightening_ratio > 0.0 && self.tightening_ratio < 1.0) {
            return Err(FilterError::InvalidConfig(format!(
                "Tightening ratio must be between 0 and 1, got {}",
                self.tightening_ratio
            )));
        }
        if !(self.fill_ratio > 0.0 && self.fill_ratio <= 1.0) {
            return Err(FilterError::InvalidConfig(format!(
                "Fill ratio must be in (0, 1], got {}",
                self.fill_ratio
            )));
        }
        Ok(())
    }
}
