//! Cuckoo filter: fingerprints in a power-of-two table of small buckets.
//!
//! Every element has two candidate buckets, `i1` from its hash and
//! `i2 = i1 ^ hash32(fingerprint)`. Because the relation is an XOR, the
//! alternate bucket of a stored fingerprint can be recomputed from the
//! fingerprint and its current bucket alone, which is what relocation relies
//! on.
use crate::bloom::config::{validate_capacity, validate_fp_rate};
use crate::error::{FilterError, Result};
use crate::filter::{Filter, RemovableFilter};
use crate::hash::HashAlgorithm;
use derive_builder::Builder;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, trace};

/// Fingerprint slots per bucket.
const BUCKET_ENTRIES: usize = 4;

/// Fingerprints are cut from digest bytes `[4, 16)`, past the index bytes.
const FINGERPRINT_OFFSET: usize = 4;
const MAX_FINGERPRINT_LEN: usize = 16 - FINGERPRINT_OFFSET;

type Fingerprint = Vec<u8>;

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct CuckooFilterConfig {
    /// Expected number of elements
    #[builder(default = "10_000")]
    pub capacity: usize,

    #[builder(default = "0.01")]
    pub false_positive_rate: f64,

    /// Relocation attempts before an insert gives up
    #[builder(default = "500")]
    pub max_kicks: usize,

    /// Seed for the relocation generator, `None` seeds from the OS
    #[builder(default)]
    pub seed: Option<u64>,

    #[builder(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl CuckooFilterConfig {
    pub fn validate(&self) -> Result<()> {
        validate_capacity(self.capacity)?;
        validate_fp_rate(self.false_positive_rate)?;
        if self.max_kicks == 0 {
            return Err(FilterError::InvalidConfig("Max kicks must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct CuckooFilter {
    buckets: Vec<Vec<Option<Fingerprint>>>,
    hash_algorithm: HashAlgorithm,
    rng: StdRng,
    m: usize,
    b: usize,
    f: usize,
    n: usize,
    max_kicks: usize,
    count: usize,
}

impl CuckooFilter {
    pub fn new(config: CuckooFilterConfig) -> Result<Self> {
        config.validate()?;

        let b = BUCKET_ENTRIES;
        let f = fingerprint_len(b, config.false_positive_rate);
        let m = (config.capacity / f * 8).max(1).next_power_of_two();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            buckets: vec![vec![None; b]; m],
            hash_algorithm: config.hash_algorithm,
            rng,
            m,
            b,
            f,
            n: config.capacity,
            max_kicks: config.max_kicks,
            count: 0,
        })
    }

    pub fn with_rate(n: usize, fp_rate: f64) -> Result<Self> {
        Self::new(CuckooFilterConfig {
            capacity: n,
            false_positive_rate: fp_rate,
            max_kicks: 500,
            seed: None,
            hash_algorithm: HashAlgorithm::default(),
        })
    }

    /// Number of buckets, `m`.
    pub fn bucket_count(&self) -> usize {
        self.m
    }

    /// Fingerprint slots per bucket, `b`.
    pub fn bucket_entries(&self) -> usize {
        self.b
    }

    /// Fingerprint length in bytes.
    pub fn fingerprint_len(&self) -> usize {
        self.f
    }

    /// Expected number of elements the filter was sized for.
    pub fn capacity(&self) -> usize {
        self.n
    }

    /// Number of stored fingerprints.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn load_factor(&self) -> f64 {
        self.count as f64 / (self.m * self.b) as f64
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn set_hash_algorithm(&mut self, hash_algorithm: HashAlgorithm) {
        self.hash_algorithm = hash_algorithm;
    }

    /// Primary index, alternate index and fingerprint of `data`.
    fn components(&self, data: &[u8]) -> (u32, u32, Fingerprint) {
        let digest = self.hash_algorithm.digest(data);
        let i1 = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
        let fingerprint = digest[FINGERPRINT_OFFSET..FINGERPRINT_OFFSET + self.f].to_vec();
        let i2 = i1 ^ self.hash_algorithm.hash32(&fingerprint);
        (i1, i2, fingerprint)
    }

    fn bucket_index(&self, i: u32) -> usize {
        i as usize % self.m
    }

    fn contains(&self, i: u32, fingerprint: &[u8]) -> bool {
        self.buckets[self.bucket_index(i)]
            .iter()
            .any(|slot| slot.as_deref() == Some(fingerprint))
    }

    fn insert(&mut self, i: u32, fingerprint: &[u8]) -> bool {
        let idx = self.bucket_index(i);
        match self.buckets[idx].iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(fingerprint.to_vec());
                self.count += 1;
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, i: u32, fingerprint: &[u8]) -> bool {
        let idx = self.bucket_index(i);
        match self.buckets[idx]
            .iter_mut()
            .find(|slot| slot.as_deref() == Some(fingerprint))
        {
            Some(slot) => {
                *slot = None;
                self.count -= 1;
                true
            }
            None => false,
        }
    }

    /// Random-walk relocation. On failure the last evicted fingerprint is
    /// dropped, so some earlier element stops testing positive.
    fn relocate(&mut self, i1: u32, i2: u32, fingerprint: Fingerprint) -> Result<()> {
        let mut i = if self.rng.random_bool(0.5) { i1 } else { i2 };
        let mut fingerprint = fingerprint;

        for kick in 0..self.max_kicks {
            let idx = self.bucket_index(i);
            let slot = self.rng.random_range(0..self.b);
            match self.buckets[idx][slot].replace(fingerprint) {
                Some(evicted) => fingerprint = evicted,
                None => {
                    self.count += 1;
                    return Ok(());
                }
            }

            i ^= self.hash_algorithm.hash32(&fingerprint);
            if self.insert(i, &fingerprint) {
                trace!(kicks = kick + 1, "Relocated fingerprint");
                return Ok(());
            }
        }

        debug!(
            kicks = self.max_kicks,
            count = self.count,
            buckets = self.m,
            "Cuckoo filter full"
        );
        Err(FilterError::FilterFull {
            kicks: self.max_kicks,
        })
    }
}

impl Filter for CuckooFilter {
    /// Fails with [`FilterError::FilterFull`] when relocation gives up.
    fn add(&mut self, data: &[u8]) -> Result<()> {
        let (i1, i2, fingerprint) = self.components(data);
        if self.insert(i1, &fingerprint) || self.insert(i2, &fingerprint) {
            return Ok(());
        }
        self.relocate(i1, i2, fingerprint)
    }

    fn test(&self, data: &[u8]) -> Result<bool> {
        let (i1, i2, fingerprint) = self.components(data);
        Ok(self.contains(i1, &fingerprint) || self.contains(i2, &fingerprint))
    }

    /// `Ok(true)` for members, which are not added again. For non-members the
    /// outcome of the insert decides between `Ok(false)` and `Err`.
    fn test_and_add(&mut self, data: &[u8]) -> Result<bool> {
        if self.test(data)? {
            return Ok(true);
        }
        self.add(data)?;
        Ok(false)
    }

    fn reset(&mut self) {
        for bucket in &mut self.buckets {
            bucket.fill(None);
        }
        self.count = 0;
    }
}

impl RemovableFilter for CuckooFilter {
    fn test_and_remove(&mut self, data: &[u8]) -> Result<bool> {
        let (i1, i2, fingerprint) = self.components(data);
        Ok(self.remove(i1, &fingerprint) || self.remove(i2, &fingerprint))
    }
}

/// `max(1, ceil(log2(2b / fp_rate)) / 8)` bytes.
fn fingerprint_len(b: usize, fp_rate: f64) -> usize {
    let bits = (2.0 * b as f64 / fp_rate).log2().ceil() as usize;
    (bits / 8).clamp(1, MAX_FINGERPRINT_LEN)
}
