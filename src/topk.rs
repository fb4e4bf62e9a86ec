//! Top-k heavy hitters over a stream.
//!
//! Frequencies come from a [`CountMinSketch`]; the `k` most frequent elements
//! seen so far are tracked in a bounded binary min-heap keyed by frequency.
//!
//! A resident element's frequency is refreshed in place when it is seen
//! again, without re-sifting, and admission compares against the root. Ties
//! between equal frequencies are broken by sequence number: the element
//! admitted or refreshed earlier counts as smaller, so it is evicted first.
use crate::countmin::{CountMinSketch, CountMinSketchConfig};
use crate::error::{FilterError, Result};
use crate::hash::HashAlgorithm;
use derive_builder::Builder;
use tracing::trace;

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct TopKConfig {
    /// Relative accuracy of the frequency sketch
    #[builder(default = "0.001")]
    pub epsilon: f64,

    /// Failure probability of the frequency sketch
    #[builder(default = "0.99")]
    pub delta: f64,

    /// Number of elements to track
    #[builder(default = "10")]
    pub k: usize,

    #[builder(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl TopKConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(FilterError::InvalidConfig("K must be > 0".into()));
        }
        self.sketch_config().validate()
    }

    fn sketch_config(&self) -> CountMinSketchConfig {
        CountMinSketchConfig {
            epsilon: self.epsilon,
            delta: self.delta,
            hash_algorithm: self.hash_algorithm,
        }
    }
}

/// A tracked element and its estimated frequency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub data: Vec<u8>,
    pub freq: u64,
}

#[derive(Clone, Debug)]
struct Entry {
    element: Element,
    seq: u64,
}

impl Entry {
    fn less(&self, other: &Entry) -> bool {
        (self.element.freq, self.seq) < (other.element.freq, other.seq)
    }
}

#[derive(Clone, Debug)]
pub struct TopK {
    sketch: CountMinSketch,
    heap: Vec<Entry>,
    k: usize,
    n: u64,
    seq: u64,
}

impl TopK {
    pub fn new(config: TopKConfig) -> Result<Self> {
        config.validate()?;
        let sketch = CountMinSketch::new(config.sketch_config())?;

        Ok(Self {
            sketch,
            heap: Vec::with_capacity(config.k),
            k: config.k,
            n: 0,
            seq: 0,
        })
    }

    pub fn with_accuracy(epsilon: f64, delta: f64, k: usize) -> Result<Self> {
        Self::new(TopKConfig {
            epsilon,
            delta,
            k,
            hash_algorithm: HashAlgorithm::default(),
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of adds since construction or the last reset.
    pub fn total(&self) -> u64 {
        self.n
    }

    /// Number of elements currently tracked, at most `k`.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.sketch.hash_algorithm()
    }

    pub fn set_hash_algorithm(&mut self, hash_algorithm: HashAlgorithm) {
        self.sketch.set_hash_algorithm(hash_algorithm);
    }

    pub fn add(&mut self, data: &[u8]) -> &mut Self {
        let freq = self.sketch.add(data).count(data);
        self.n += 1;

        if self.is_top(freq) {
            self.insert(data, freq);
        }
        self
    }

    /// Tracked elements, lowest frequency first.
    pub fn elements(&self) -> Vec<Element> {
        let mut entries = self.heap.clone();
        entries.sort_by_key(|entry| (entry.element.freq, entry.seq));
        entries.into_iter().map(|entry| entry.element).collect()
    }

    pub fn reset(&mut self) -> &mut Self {
        trace!(k = self.k, tracked = self.heap.len(), "Resetting top-k");
        self.sketch.reset();
        self.heap.clear();
        self.n = 0;
        self.seq = 0;
        self
    }

    fn is_top(&self, freq: u64) -> bool {
        match self.heap.first() {
            Some(min) if self.heap.len() >= self.k => freq >= min.element.freq,
            _ => true,
        }
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    fn insert(&mut self, data: &[u8], freq: u64) {
        let seq = self.next_seq();

        if let Some(entry) = self.heap.iter_mut().find(|entry| entry.element.data == data) {
            entry.element.freq = freq;
            entry.seq = seq;
            return;
        }

        if self.heap.len() >= self.k {
            self.pop();
        }
        self.heap.push(Entry {
            element: Element {
                data: data.to_vec(),
                freq,
            },
            seq,
        });
        self.sift_up(self.heap.len() - 1);
    }

    fn pop(&mut self) -> Option<Entry> {
        let last = self.heap.len().checked_sub(1)?;
        self.heap.swap(0, last);
        self.sift_down(0, last);
        self.heap.pop()
    }

    fn sift_up(&mut self, mut child: usize) {
        while child > 0 {
            let parent = (child - 1) / 2;
            if !self.heap[child].less(&self.heap[parent]) {
                break;
            }
            self.heap.swap(child, parent);
            child = parent;
        }
    }

    /// Restores the heap below `parent`, looking only at the first `len`
    /// entries.
    fn sift_down(&mut self, mut parent: usize, len: usize) {
        loop {
            let left = 2 * parent + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.heap[right].less(&self.heap[left]) {
                right
            } else {
                left
            };
            if !self.heap[child].less(&self.heap[parent]) {
                break;
            }
            self.heap.swap(parent, child);
            parent = child;
        }
    }
}
