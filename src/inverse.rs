//! Inverse Bloom filter: a lossy set with no false positives.
//!
//! Each element owns exactly one slot, `hash32(data) % capacity`, and the
//! slot remembers the last element written to it. A collision evicts the
//! previous occupant, so membership may be forgotten (false negatives) but
//! never invented.
//!
//! Slots are individually locked, so all operations take `&self` and the
//! filter can be shared between threads. [`InverseBloomFilter::test_and_add`]
//! swaps and compares under a single lock acquisition.
use crate::error::{FilterError, Result};
use crate::filter::Filter;
use crate::hash::HashAlgorithm;
use derive_builder::Builder;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct InverseBloomFilterConfig {
    /// Number of slots
    #[builder(default = "10_000")]
    pub capacity: usize,

    #[builder(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl InverseBloomFilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(FilterError::InvalidConfig("Capacity must be > 0".into()));
        }
        Ok(())
    }
}

type Slot = Mutex<Option<Vec<u8>>>;

#[derive(Debug)]
pub struct InverseBloomFilter {
    slots: Vec<Slot>,
    hash_algorithm: HashAlgorithm,
    capacity: usize,
}

impl InverseBloomFilter {
    pub fn new(config: InverseBloomFilterConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            slots: (0..config.capacity).map(|_| Mutex::new(None)).collect(),
            hash_algorithm: config.hash_algorithm,
            capacity: config.capacity,
        })
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::new(InverseBloomFilterConfig {
            capacity,
            hash_algorithm: HashAlgorithm::default(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn set_hash_algorithm(&mut self, hash_algorithm: HashAlgorithm) {
        self.hash_algorithm = hash_algorithm;
    }

    /// Slot owned by `data`.
    pub fn index(&self, data: &[u8]) -> usize {
        self.hash_algorithm.hash32(data) as usize % self.capacity
    }

    fn lock(&self, index: usize) -> Result<MutexGuard<'_, Option<Vec<u8>>>> {
        self.slots[index]
            .lock()
            .map_err(|_| FilterError::LockError(format!("Failed to lock slot {index}")))
    }

    /// Writes `data` into its slot and returns the previous occupant, which
    /// may be `data` itself, a colliding element, or nothing.
    pub fn add(&self, data: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut slot = self.lock(self.index(data))?;
        Ok(slot.replace(data.to_vec()))
    }

    /// True only if `data` is the current occupant of its slot.
    pub fn test(&self, data: &[u8]) -> Result<bool> {
        let slot = self.lock(self.index(data))?;
        Ok(slot.as_deref() == Some(data))
    }

    /// Swaps `data` in and reports whether it was already the occupant.
    pub fn test_and_add(&self, data: &[u8]) -> Result<bool> {
        Ok(self.add(data)?.as_deref() == Some(data))
    }

    pub fn reset(&self) -> Result<()> {
        trace!(capacity = self.capacity, "Resetting inverse filter");
        for index in 0..self.capacity {
            *self.lock(index)? = None;
        }
        Ok(())
    }
}

impl Filter for InverseBloomFilter {
    fn add(&mut self, data: &[u8]) -> Result<()> {
        InverseBloomFilter::add(self, data).map(|_| ())
    }

    fn test(&self, data: &[u8]) -> Result<bool> {
        InverseBloomFilter::test(self, data)
    }

    fn test_and_add(&mut self, data: &[u8]) -> Result<bool> {
        InverseBloomFilter::test_and_add(self, data)
    }

    /// Exclusive access needs no locking; a poisoned slot is cleared too.
    fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot.get_mut().unwrap_or_else(PoisonError::into_inner) = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    /// Two distinct single-byte keys that share a slot.
    fn colliding_pair(filter: &InverseBloomFilter) -> (Vec<u8>, Vec<u8>) {
        let keys: Vec<Vec<u8>> = (b'a'..=b'z').map(|c| vec![c]).collect();
        for (i, first) in keys.iter().enumerate() {
            for second in &keys[i + 1..] {
                if filter.index(first) == filter.index(second) {
                    return (first.clone(), second.clone());
                }
            }
        }
        panic!("no collision among 26 keys in 3 slots");
    }

    #[test]
    fn test_invalid_config() {
        assert!(InverseBloomFilter::with_capacity(0).is_err());
    }

    #[test]
    fn test_add_returns_previous() {
        let filter = InverseBloomFilter::with_capacity(3).unwrap();
        let (first, second) = colliding_pair(&filter);

        assert_eq!(filter.add(&first).unwrap(), None);
        assert_eq!(filter.add(&first).unwrap(), Some(first.clone()));
        assert_eq!(filter.add(&second).unwrap(), Some(first.clone()));
        assert!(!filter.test(&first).unwrap());
        assert!(filter.test(&second).unwrap());
    }

    #[test]
    fn test_test_and_add() {
        let filter = InverseBloomFilter::with_capacity(3).unwrap();
        let (first, second) = colliding_pair(&filter);

        assert!(!filter.test_and_add(&first).unwrap());
        assert!(filter.test_and_add(&first).unwrap());
        assert!(!filter.test_and_add(&second).unwrap());
        assert!(!filter.test_and_add(&first).unwrap());
        assert!(filter.test(&first).unwrap());
    }

    #[test]
    fn test_reset() {
        let mut filter = InverseBloomFilter::with_capacity(16).unwrap();
        filter.add(b"a").unwrap();
        filter.reset().unwrap();
        assert!(!filter.test(b"a").unwrap());

        filter.add(b"a").unwrap();
        Filter::reset(&mut filter);
        assert!(!filter.test(b"a").unwrap());
    }

    #[test]
    fn test_concurrent_test_and_add() {
        let filter = Arc::new(InverseBloomFilter::with_capacity(1024).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let filter = Arc::clone(&filter);
                thread::spawn(move || {
                    (0..256)
                        .filter(|i| {
                            filter
                                .test_and_add(format!("{i}").as_bytes())
                                .unwrap()
                        })
                        .count()
                })
            })
            .collect();
        let hits: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        // the first writer of any key never hits
        assert!(hits <= 3 * 256);

        // every occupied slot holds exactly one whole key
        let keys: Vec<String> = (0..256).map(|i| format!("{i}")).collect();
        let occupied: HashSet<usize> = keys.iter().map(|k| filter.index(k.as_bytes())).collect();
        let members = keys
            .iter()
            .filter(|k| filter.test(k.as_bytes()).unwrap())
            .count();
        assert_eq!(members, occupied.len());
    }
}
