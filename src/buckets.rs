use crate::error::{FilterError, Result};
use bitvec::{bitvec, field::BitField, order::Lsb0, vec::BitVec};

/// Packed array of fixed-width counters.
///
/// Counters are `bucket_size` bits wide (1 to 8) and laid out back to back,
/// least significant bit first, within and across byte boundaries. A counter
/// straddling two bytes keeps its low bits in the lower byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Buckets {
    data: BitVec<u8, Lsb0>,
    count: usize,
    bucket_size: u8,
    max: u8,
}

impl Buckets {
    pub fn new(count: usize, bucket_size: u8) -> Result<Self> {
        if bucket_size == 0 || bucket_size > 8 {
            return Err(FilterError::InvalidConfig(format!(
                "Bucket size must be between 1 and 8 bits, got {bucket_size}"
            )));
        }
        let bits = count.checked_mul(bucket_size as usize).ok_or_else(|| {
            FilterError::InvalidConfig(format!(
                "{count} buckets of {bucket_size} bits overflow the address space"
            ))
        })?;

        Ok(Self {
            data: bitvec![u8, Lsb0; 0; bits],
            count,
            bucket_size,
            max: ((1u16 << bucket_size) - 1) as u8,
        })
    }

    /// Number of counters.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn bucket_size(&self) -> u8 {
        self.bucket_size
    }

    /// Largest value a counter can hold, `2^bucket_size - 1`.
    pub fn max_bucket_value(&self) -> u8 {
        self.max
    }

    pub fn get(&self, index: usize) -> Result<u8> {
        let range = self.span(index)?;
        Ok(self.data[range].load_le::<u8>())
    }

    /// Writes `value`, clamped to the maximum counter value.
    pub fn set(&mut self, index: usize, value: u8) -> Result<&mut Self> {
        let range = self.span(index)?;
        self.data[range].store_le::<u8>(value.min(self.max));
        Ok(self)
    }

    /// Adds a signed delta, clamping the result to `[0, max]`.
    pub fn increment(&mut self, index: usize, delta: i32) -> Result<&mut Self> {
        let range = self.span(index)?;
        let current = self.data[range.clone()].load_le::<u8>() as i32;
        let value = current.saturating_add(delta).clamp(0, self.max as i32);
        self.data[range].store_le::<u8>(value as u8);
        Ok(self)
    }

    /// Zeroes every counter, keeping the shape.
    pub fn reset(&mut self) -> &mut Self {
        self.data.fill(false);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.data
            .chunks_exact(self.bucket_size as usize)
            .map(|chunk| chunk.load_le::<u8>())
    }

    /// Number of counters holding a non-zero value.
    pub fn count_nonzero(&self) -> usize {
        if self.bucket_size == 1 {
            return self.data.count_ones();
        }
        self.iter().filter(|&value| value != 0).count()
    }

    /// Sum of all counter values.
    pub fn sum(&self) -> u64 {
        self.iter().map(u64::from).sum()
    }

    /// Raw backing bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_raw_slice()
    }

    fn span(&self, index: usize) -> Result<std::ops::Range<usize>> {
        if index >= self.count {
            return Err(FilterError::IndexOutOfBounds {
                index,
                capacity: self.count,
            });
        }
        let start = index * self.bucket_size as usize;
        Ok(start..start + self.bucket_size as usize)
    }
}
