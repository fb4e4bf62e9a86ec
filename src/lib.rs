//! Probabilistic set-membership and stream-summary structures over packed
//! counter arrays.
//!
//! Membership filters:
//!     * [`BloomFilter`], [`PartitionedBloomFilter`]: classic Bloom filters,
//!       one shared bit array or `k` disjoint partitions.
//!     * [`CountingBloomFilter`]: small counters instead of bits, supports
//!       removal.
//!     * [`DeletableBloomFilter`]: tracks collision-free regions so some
//!       elements can be removed without false negatives.
//!     * [`StableBloomFilter`]: random decay keeps the false positive rate
//!       bounded over an unbounded stream.
//!     * [`ScalableBloomFilter`]: grows by appending tighter filters.
//!     * [`CuckooFilter`]: fingerprints in relocatable buckets, supports
//!       removal.
//!     * [`InverseBloomFilter`]: no false positives, safe to share between
//!       threads.
//!
//! Stream summaries:
//!     * [`CountMinSketch`]: frequency estimates that never undercount.
//!     * [`TopK`]: the `k` most frequent elements.
//!     * [`HyperLogLog`]: distinct count.
//!     * [`MinHash`]: Jaccard similarity between two bags.
//!
//! Every structure hashes through a pluggable [`HashAlgorithm`] and derives
//! its `k` hash functions by double hashing (`lower + upper * i`, see
//! [`HashKernel`]). Nothing here is internally synchronized except the
//! inverse filter; wrap the rest in a lock to share them.
//!
//! ```
//! use boomsketch::{BloomFilter, Filter};
//!
//! let mut filter = BloomFilter::with_rate(1000, 0.01)?;
//! filter.add(b"alice")?;
//! assert!(filter.test(b"alice")?);
//! # Ok::<(), boomsketch::FilterError>(())
//! ```
pub mod bloom;
pub mod buckets;
pub mod countmin;
pub mod cuckoo;
mod error;
mod filter;
pub mod hash;
pub mod hyperloglog;
pub mod inverse;
pub mod minhash;
pub mod topk;

pub use bloom::{
    BloomFilter, BloomFilterConfig, BloomFilterConfigBuilder, CountingBloomFilter,
    CountingBloomFilterConfig, CountingBloomFilterConfigBuilder,
    DeletableBloomFilter, DeletableBloomFilterConfig,
    DeletableBloomFilterConfigBuilder, PartitionedBloomFilter,
    ScalableBloomFilter, ScalableBloomFilterConfig,
    ScalableBloomFilterConfigBuilder, StableBloomFilter, StableBloomFilterConfig,
    StableBloomFilterConfigBuilder,
};
pub use buckets::Buckets;
pub use countmin::{
    CountMinSketch, CountMinSketchConfig, CountMinSketchConfigBuilder,
    CountMinSketchState,
};
pub use cuckoo::{CuckooFilter, CuckooFilterConfig, CuckooFilterConfigBuilder};
pub use error::{FilterError, Result};
pub use filter::{Filter, RemovableFilter};
pub use hash::{HashAlgorithm, HashKernel, HashKernel64, optimal_k, optimal_m};
pub use hyperloglog::{HyperLogLog, HyperLogLogConfig, HyperLogLogConfigBuilder};
pub use inverse::{
    InverseBloomFilter, InverseBloomFilterConfig, InverseBloomFilterConfigBuilder,
};
pub use minhash::{MinHash, MinHashConfig, MinHashConfigBuilder, min_hash};
pub use topk::{Element, TopK, TopKConfig, TopKConfigBuilder};
