use fnv::FnvHasher;
use murmur3::{murmur3_32, murmur3_x64_128};
use std::fmt;
use std::hash::Hasher;
use std::io::Cursor;

/// Target fill ratio the optimal sizing formulas assume.
const FILL_RATIO: f64 = 0.5;

/// A type alias for the digest function behind a [`HashAlgorithm`].
///
/// **Parameters:**
///
/// - `data: &[u8]`
///   - A byte slice representing the item to be hashed.
///
/// **Returns:**
///
/// - `[u8; 16]`
///   - A 128-bit digest. The 32-bit kernel reads bytes `[0, 8)`, the 64-bit
///     kernel reads all sixteen.
pub type DigestFunction = fn(&[u8]) -> [u8; 16];

/// A named, pluggable digest used by every filter and sketch in the crate.
///
/// The name travels with serialized sketch state so a decoder can pick the
/// same algorithm again.
#[derive(Clone, Copy)]
pub struct HashAlgorithm {
    name: &'static str,
    digest: DigestFunction,
}

impl HashAlgorithm {
    /// Murmur3 x64 128-bit, seed 0. The default everywhere.
    pub const MURMUR3_128: HashAlgorithm = HashAlgorithm {
        name: "murmur3-128",
        digest: murmur3_128_digest,
    };

    /// Murmur3 32-bit in the lower word, FNV-1a in the upper word; the classic
    /// double-hashing pair.
    pub const MURMUR_FNV: HashAlgorithm = HashAlgorithm {
        name: "murmur-fnv",
        digest: murmur_fnv_digest,
    };

    pub const fn new(name: &'static str, digest: DigestFunction) -> Self {
        Self { name, digest }
    }

    /// Resolves one of the built-in algorithms by name.
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::MURMUR3_128, Self::MURMUR_FNV]
            .into_iter()
            .find(|algorithm| algorithm.name == name)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn digest(&self, data: &[u8]) -> [u8; 16] {
        (self.digest)(data)
    }

    /// First four digest bytes, little-endian.
    pub fn hash32(&self, data: &[u8]) -> u32 {
        let digest = self.digest(data);
        u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
    }
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        Self::MURMUR3_128
    }
}

impl PartialEq for HashAlgorithm {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for HashAlgorithm {}

impl fmt::Debug for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashAlgorithm({})", self.name)
    }
}

pub(crate) fn hash_murmur32(key: &[u8]) -> u32 {
    let mut cursor = Cursor::new(key);
    // Reading from an in-memory slice cannot fail.
    murmur3_32(&mut cursor, 0).expect("Failed to compute Murmur3 hash")
}

pub(crate) fn hash_murmur128(key: &[u8]) -> u128 {
    let mut cursor = Cursor::new(key);
    murmur3_x64_128(&mut cursor, 0).expect("Failed to compute Murmur3 hash")
}

pub(crate) fn hash_fnv64(key: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(key);
    hasher.finish()
}

pub(crate) fn hash_fnv32(key: &[u8]) -> u32 {
    hash_fnv64(key) as u32
}

fn murmur3_128_digest(data: &[u8]) -> [u8; 16] {
    hash_murmur128(data).to_le_bytes()
}

fn murmur_fnv_digest(data: &[u8]) -> [u8; 16] {
    let mut digest = [0u8; 16];
    digest[0..4].copy_from_slice(&hash_murmur32(data).to_le_bytes());
    digest[4..8].copy_from_slice(&hash_fnv32(data).to_le_bytes());
    digest[8..16].copy_from_slice(&hash_fnv64(data).to_le_bytes());
    digest
}

/// Two 32-bit base hashes sliced from one digest.
///
/// The `i`-th effective hash function is `lower + upper * i`, so a filter
/// with `k` hash functions pays for a single digest per operation
/// (Kirsch-Mitzenmacher double hashing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashKernel {
    pub lower: u32,
    pub upper: u32,
}

impl HashKernel {
    pub fn new(data: &[u8], algorithm: &HashAlgorithm) -> Self {
        Self::from_digest(&algorithm.digest(data))
    }

    pub fn from_digest(digest: &[u8; 16]) -> Self {
        Self {
            lower: u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]),
            upper: u32::from_le_bytes([digest[4], digest[5], digest[6], digest[7]]),
        }
    }

    /// `(lower + upper * i) mod modulus`
    pub fn index(&self, i: usize, modulus: usize) -> usize {
        let h = (self.lower as u64).wrapping_add((self.upper as u64).wrapping_mul(i as u64));
        (h % modulus as u64) as usize
    }

    pub fn indices(&self, k: usize, modulus: usize) -> impl Iterator<Item = usize> + '_ {
        (0..k).map(move |i| self.index(i, modulus))
    }
}

/// 64-bit counterpart of [`HashKernel`] for index spaces past `u32::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashKernel64 {
    pub lower: u64,
    pub upper: u64,
}

impl HashKernel64 {
    pub fn new(data: &[u8], algorithm: &HashAlgorithm) -> Self {
        Self::from_digest(&algorithm.digest(data))
    }

    pub fn from_digest(digest: &[u8; 16]) -> Self {
        let mut lower = [0u8; 8];
        let mut upper = [0u8; 8];
        lower.copy_from_slice(&digest[0..8]);
        upper.copy_from_slice(&digest[8..16]);
        Self {
            lower: u64::from_le_bytes(lower),
            upper: u64::from_le_bytes(upper),
        }
    }

    /// The `i`-th hash, `lower + upper * i` with wrapping arithmetic.
    pub fn hash(&self, i: u64) -> u64 {
        self.lower.wrapping_add(self.upper.wrapping_mul(i))
    }

    pub fn index(&self, i: usize, modulus: usize) -> usize {
        (self.hash(i as u64) % modulus as u64) as usize
    }
}

/// Number of bits `m` for `n` items at the given false positive rate,
/// assuming the filter is filled to half.
pub fn optimal_m(n: usize, fp_rate: f64) -> usize {
    let ln_fill = FILL_RATIO.ln() * (1.0 - FILL_RATIO).ln();
    (n as f64 / (ln_fill / fp_rate.ln().abs())).ceil() as usize
}

/// Number of hash functions `k` for the given false positive rate.
pub fn optimal_k(fp_rate: f64) -> usize {
    (1.0 / fp_rate).log2().ceil() as usize
}
