//! Content-addressed hashing primitives
//!
//! Provides [`ContentHash`], a strongly-typed 32-byte hash used for section
//! ids and summary cache keys.

/// A 32-byte content hash (Blake3)
///
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Compute Blake3 hash of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Compute Blake3 hash over several parts, separated by a NUL byte
    ///
    /// `("ab", "c")` and `("a", "bc")` hash differently.
    #[must_use]
    pub fn compute_parts(parts: &[&str]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                hasher.update(&[0]);
            }
            hasher.update(part.as_bytes());
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// First `len` hex characters of the hash (at most 64)
    #[must_use]
    pub fn hex_prefix(&self, len: usize) -> String {
        let mut encoded = hex::encode(self.0);
        encoded.truncate(len.min(64));
        encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_data_identical_hash() {
        assert_eq!(ContentHash::compute(b"abc"), ContentHash::compute(b"abc"));
        assert_ne!(ContentHash::compute(b"abc"), ContentHash::compute(b"abd"));
    }

    #[test]
    fn parts_are_separated() {
        let a = ContentHash::compute_parts(&["ab", "c"]);
        let b = ContentHash::compute_parts(&["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn single_part_matches_plain_compute() {
        assert_eq!(
            ContentHash::compute_parts(&["section"]),
            ContentHash::compute(b"section")
        );
    }

    #[test]
    fn hex_prefix_lengths() {
        let hash = ContentHash::compute(b"section");
        assert_eq!(hash.hex_prefix(8).len(), 8);
        assert_eq!(hash.hex_prefix(100).len(), 64);
        assert!(hash.hex_prefix(100).starts_with(&hash.hex_prefix(8)));
        assert!(hash.hex_prefix(64).chars().all(|c| c.is_ascii_hexdigit()));
    }
}
