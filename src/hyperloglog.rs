//! HyperLogLog cardinality estimator.
//!
//! `m = 2^b` registers. The top `b` bits of a 32-bit hash select a register,
//! the position of the first set bit in the remaining `32 - b` bits is the
//! candidate value, and each register keeps the maximum it has seen.
use crate::error::{FilterError, Result};
use crate::hash::HashAlgorithm;
use derive_builder::Builder;
use tracing::{debug, trace};

const TWO_32: f64 = 4_294_967_296.0;

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct HyperLogLogConfig {
    /// Register count, a power of two
    #[builder(default = "1024")]
    pub registers: usize,

    #[builder(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl HyperLogLogConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.registers.is_power_of_two() || self.registers as u64 > 1u64 << 32 {
            return Err(FilterError::InvalidRegisterCount(self.registers));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct HyperLogLog {
    registers: Vec<u8>,
    hash_algorithm: HashAlgorithm,
    m: usize,
    b: u32,
    alpha: f64,
}

impl HyperLogLog {
    pub fn new(config: HyperLogLogConfig) -> Result<Self> {
        config.validate()?;

        let m = config.registers;
        Ok(Self {
            registers: vec![0; m],
            hash_algorithm: config.hash_algorithm,
            m,
            b: m.trailing_zeros(),
            alpha: alpha(m),
        })
    }

    pub fn with_registers(m: usize) -> Result<Self> {
        Self::new(HyperLogLogConfig {
            registers: m,
            hash_algorithm: HashAlgorithm::default(),
        })
    }

    /// Smallest register count whose standard error `1.04 / sqrt(m)` is at
    /// most `error_rate`.
    pub fn with_error_rate(error_rate: f64) -> Result<Self> {
        if !(error_rate > 0.0 && error_rate < 1.0) {
            return Err(FilterError::InvalidConfig(format!(
                "Error rate must be between 0 and 1, got {error_rate}"
            )));
        }
        let exponent = (1.04 / error_rate).powi(2).log2().ceil().max(0.0);
        let registers = if exponent <= 32.0 {
            1usize.checked_shl(exponent as u32)
        } else {
            None
        };
        match registers {
            Some(m) => Self::with_registers(m),
            None => Err(FilterError::InvalidConfig(format!(
                "Error rate {error_rate} needs more than 2^32 registers"
            ))),
        }
    }

    /// Register count, `m`.
    pub fn registers(&self) -> usize {
        self.m
    }

    /// Address bits, `b = log2(m)`.
    pub fn precision(&self) -> u32 {
        self.b
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn set_hash_algorithm(&mut self, hash_algorithm: HashAlgorithm) {
        self.hash_algorithm = hash_algorithm;
    }

    pub fn add(&mut self, data: &[u8]) -> &mut Self {
        let hash = self.hash_algorithm.hash32(data);
        let j = hash.checked_shr(32 - self.b).unwrap_or(0) as usize;
        let rho = rho(hash.checked_shl(self.b).unwrap_or(0), 32 - self.b);

        let register = &mut self.registers[j];
        if rho > *register {
            *register = rho;
        }
        self
    }

    /// Estimated number of distinct elements added.
    pub fn count(&self) -> u64 {
        let m = self.m as f64;
        let sum: f64 = self
            .registers
            .iter()
            .map(|&register| 2f64.powi(-i32::from(register)))
            .sum();
        let estimate = self.alpha * m * m / sum;

        if estimate <= 2.5 * m {
            let zeros = self.registers.iter().filter(|&&r| r == 0).count();
            if zeros > 0 {
                return (m * (m / zeros as f64).ln()) as u64;
            }
            return estimate as u64;
        }
        if estimate >= TWO_32 {
            // hash space exhausted, the correction diverges
            return u64::MAX;
        }
        if estimate > TWO_32 / 30.0 {
            return (-TWO_32 * (1.0 - estimate / TWO_32).ln()) as u64;
        }
        estimate as u64
    }

    /// Register-wise maximum with `other`, which must have the same register
    /// count.
    pub fn merge(&mut self, other: &HyperLogLog) -> Result<()> {
        if self.m != other.m {
            debug!(self.m, other.m, "HyperLogLog register count mismatch");
            return Err(FilterError::DimensionMismatch {
                what: "register count",
                expected: self.m,
                actual: other.m,
            });
        }
        for (register, &other_register) in self.registers.iter_mut().zip(&other.registers) {
            *register = (*register).max(other_register);
        }
        Ok(())
    }

    pub fn reset(&mut self) -> &mut Self {
        trace!(registers = self.m, "Resetting HyperLogLog");
        self.registers.fill(0);
        self
    }
}

fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / m as f64),
    }
}

/// One plus the leading zeros of `w`, capped at `width + 1` for the bits
/// actually available.
fn rho(w: u32, width: u32) -> u8 {
    (w.leading_zeros() + 1).min(width + 1) as u8
}
