//! Bloom filter family built on [`Buckets`](crate::buckets::Buckets) and
//! double hashing.
pub mod classic;
pub mod config;
pub mod counting;
pub mod deletable;
pub mod partitioned;
pub mod scalable;
pub mod stable;

pub use classic::BloomFilter;
pub use config::{
    BloomFilterConfig, BloomFilterConfigBuilder, BloomFilterConfigBuilderError,
    CountingBloomFilterConfig, CountingBloomFilterConfigBuilder,
    CountingBloomFilterConfigBuilderError, DeletableBloomFilterConfig,
    DeletableBloomFilterConfigBuilder, DeletableBloomFilterConfigBuilderError,
    ScalableBloomFilterConfig, ScalableBloomFilterConfigBuilder,
    ScalableBloomFilterConfigBuilderError, StableBloomFilterConfig,
    StableBloomFilterConfigBuilder, StableBloomFilterConfigBuilderError,
};
pub use counting::CountingBloomFilter;
pub use deletable::DeletableBloomFilter;
pub use partitioned::PartitionedBloomFilter;
pub use scalable::ScalableBloomFilter;
pub use stable::{StableBloomFilter, optimal_stable_p};
