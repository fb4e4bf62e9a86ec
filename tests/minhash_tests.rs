mod common;

use boomsketch::{MinHash, MinHashConfigBuilder, min_hash};
use common::test_utils::generate_random_words;

fn vocabulary(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}-{i}")).collect()
}

#[test]
fn test_identical_bags() {
    let bag = generate_random_words(200, 3);
    assert_eq!(min_hash(&bag, &bag), 1.0);

    let single = vec!["only".to_string()];
    assert_eq!(min_hash(&single, &single), 1.0);
}

#[test]
fn test_disjoint_vocabularies() {
    let a = vocabulary("left", 2000);
    let b = vocabulary("right", 2000);
    assert!(min_hash(&a, &b) < 0.001);
}

#[test]
fn test_similarity_tracks_overlap() {
    let config = MinHashConfigBuilder::default().num_hashes(256).build().unwrap();
    let minhash = MinHash::new(config).unwrap();
    let base = vocabulary("w", 1000);

    let mostly_same: Vec<String> = base[..900]
        .iter()
        .cloned()
        .chain(vocabulary("x", 100))
        .collect();
    let half: Vec<String> = base[..500]
        .iter()
        .cloned()
        .chain(vocabulary("y", 500))
        .collect();

    let high = minhash.similarity(&base, &mostly_same);
    let low = minhash.similarity(&base, &half);
    assert!(high > low, "{high} <= {low}");
    assert!(high > 0.6, "{high}");
    assert!(low < 0.55, "{low}");
}

#[test]
fn test_repeats_do_not_matter() {
    let minhash = MinHash::with_hashes(64).unwrap();
    let bag = vocabulary("w", 50);
    let doubled: Vec<String> = bag.iter().chain(bag.iter()).cloned().collect();
    assert_eq!(minhash.signature(&bag), minhash.signature(&doubled));
    assert_eq!(minhash.similarity(&bag, &doubled), 1.0);
}
