mod common;

use boomsketch::{HashAlgorithm, InverseBloomFilter, InverseBloomFilterConfigBuilder};
use common::test_utils::{generate_test_items, init_tracing};
use std::sync::Arc;
use std::thread;

/// Digest carrying only the first byte, so slots are predictable: with three
/// slots 'a' and 'd' share slot 1, 'b' gets 2 and 'c' gets 0.
fn first_byte_digest(data: &[u8]) -> [u8; 16] {
    let mut digest = [0u8; 16];
    if let Some(&byte) = data.first() {
        digest[0] = byte;
    }
    digest
}

const FIRST_BYTE: HashAlgorithm = HashAlgorithm::new("first-byte", first_byte_digest);

fn three_slots() -> InverseBloomFilter {
    let config = InverseBloomFilterConfigBuilder::default()
        .capacity(3)
        .hash_algorithm(FIRST_BYTE)
        .build()
        .expect("Failed to build inverse filter config");
    InverseBloomFilter::new(config).expect("Failed to create inverse filter")
}

#[test]
fn test_collision_scenario() {
    init_tracing();
    let filter = three_slots();
    assert_eq!(filter.index(b"a"), filter.index(b"d"));
    assert_ne!(filter.index(b"a"), filter.index(b"b"));

    assert!(!filter.test_and_add(b"a").unwrap());
    assert!(filter.test(b"a").unwrap());

    // 'd' evicts 'a'
    assert!(!filter.test_and_add(b"d").unwrap());
    assert!(!filter.test(b"a").unwrap());
    assert!(filter.test(b"d").unwrap());

    // and 'a' evicts 'd' again
    assert!(!filter.test_and_add(b"a").unwrap());
    assert!(!filter.test(b"d").unwrap());

    assert!(!filter.test_and_add(b"b").unwrap());
    assert!(filter.test(b"a").unwrap());
    assert!(filter.test(b"b").unwrap());
    assert!(!filter.test(b"c").unwrap());

    assert!(!filter.test_and_add(b"c").unwrap());
    assert!(filter.test(b"c").unwrap());
    assert!(filter.test_and_add(b"c").unwrap());
}

#[test]
fn test_add_reports_evicted_occupant() {
    let filter = three_slots();
    assert_eq!(filter.add(b"a").unwrap(), None);
    assert_eq!(filter.add(b"d").unwrap(), Some(b"a".to_vec()));
    assert_eq!(filter.add(b"d").unwrap(), Some(b"d".to_vec()));
}

#[test]
fn test_never_false_positive() {
    let filter = InverseBloomFilter::with_capacity(64).unwrap();
    let items = generate_test_items(1000);
    for item in &items[..500] {
        filter.add(item).unwrap();
    }
    for item in &items[500..] {
        assert!(!filter.test(item).unwrap());
    }
}

#[test]
fn test_shared_between_threads() {
    let filter = Arc::new(InverseBloomFilter::with_capacity(128).unwrap());
    let items = Arc::new(generate_test_items(2000));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let filter = Arc::clone(&filter);
            let items = Arc::clone(&items);
            thread::spawn(move || {
                for item in items.iter().skip(t).step_by(4) {
                    filter.test_and_add(item).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // every slot ends up holding one complete item from the stream
    let members = items
        .iter()
        .filter(|item| filter.test(item).unwrap())
        .count();
    assert_eq!(members, 128);
}
