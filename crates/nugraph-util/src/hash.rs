//! Deterministic hashing helpers.
//!
//! Every hash produced here is stable for identical inputs within a build:
//! element hashes use a fixed-key hasher, and unordered collections are
//! combined only after sorting their element hashes.

use std::hash::{DefaultHasher, Hash, Hasher};

use sha2::{Digest, Sha256};

const SEED: u64 = 0x1505;

/// Hash a single value with a fixed-key hasher.
pub fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hash a string so that values differing only in letter case collide.
pub fn hash_ignore_case(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    for ch in value.chars().flat_map(char::to_lowercase) {
        ch.hash(&mut hasher);
    }
    hasher.finish()
}

/// Order-sensitive hash combiner (`h = h * 33 ^ x`).
#[derive(Debug, Clone, Copy)]
pub struct HashCodeCombiner {
    combined: u64,
}

impl HashCodeCombiner {
    pub fn new() -> Self {
        Self { combined: SEED }
    }

    pub fn add_hash(&mut self, hash: u64) -> &mut Self {
        self.combined = (self.combined << 5).wrapping_add(self.combined) ^ hash;
        self
    }

    pub fn add<T: Hash + ?Sized>(&mut self, value: &T) -> &mut Self {
        self.add_hash(hash_of(value))
    }

    pub fn add_str_ignore_case(&mut self, value: &str) -> &mut Self {
        self.add_hash(hash_ignore_case(value))
    }

    /// Combine the hashes of an unordered collection.
    ///
    /// The element hashes are sorted first so the result does not depend on
    /// iteration order. The element count is mixed in as well.
    pub fn add_unordered<I>(&mut self, hashes: I) -> &mut Self
    where
        I: IntoIterator<Item = u64>,
    {
        let mut sorted: Vec<u64> = hashes.into_iter().collect();
        sorted.sort_unstable();
        self.add_hash(sorted.len() as u64);
        for hash in sorted {
            self.add_hash(hash);
        }
        self
    }

    pub fn finish(&self) -> u64 {
        self.combined
    }
}

impl Default for HashCodeCombiner {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the SHA-256 hash of a byte slice, returning a lowercase hex string.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 over a sequence of lines, each terminated by `\n`.
pub fn sha256_lines<'a, I>(lines: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
