//! Content addressing for cache entries.
//!
//! Every cache entry is keyed by a 64-bit BLAKE3 truncation of the
//! normalized query text, so storing the same canonical query twice
//! overwrites the same record.

/// Normalizes a query for content addressing.
///
/// Only surrounding whitespace is stripped; casing and interior spacing are
/// preserved. Two casings of the same question are distinct exact entries
/// but still match each other through the vector search.
#[inline]
pub fn normalize_query(query: &str) -> &str {
    query.trim()
}

/// Computes the content-addressed id for a query.
///
/// The id is the first 8 bytes (little-endian) of the BLAKE3 hash of the
/// normalized text. 64 bits keeps collision probability negligible for
/// realistic cache sizes (`P ≈ n² / 2^65`), and a collision degrades to an
/// overwrite of an unrelated entry rather than corruption: the entry is
/// re-verified against its threshold on every search.
#[inline]
pub fn hash_query(query: &str) -> u64 {
    hash_to_u64(normalize_query(query).as_bytes())
}

/// Computes a 64-bit hash of arbitrary bytes using BLAKE3, truncated from
/// 256 bits.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hash_query_determinism() {
        let query = "What is the capital of France?";

        let hash1 = hash_query(query);
        let hash2 = hash_query(query);
        let hash3 = hash_query(query);

        assert_eq!(hash1, hash2);
        assert_eq!(hash2, hash3);
    }

    #[test]
    fn test_hash_query_uniqueness() {
        let queries = [
            "What is the capital of France?",
            "What is the capital of Germany?",
            "what is the capital of france?",
            "What's France's capital?",
        ];

        let hashes: Vec<_> = queries.iter().map(|q| hash_query(q)).collect();
        let unique_hashes: HashSet<_> = hashes.iter().collect();

        assert_eq!(unique_hashes.len(), queries.len());
    }

    #[test]
    fn test_hash_query_trims_surrounding_whitespace() {
        assert_eq!(hash_query("What is DNS?"), hash_query("  What is DNS?  \n"));
    }

    #[test]
    fn test_hash_query_preserves_case() {
        assert_ne!(hash_query("what is dns?"), hash_query("What is DNS?"));
    }

    #[test]
    fn test_hash_to_u64_determinism() {
        let data = b"cache-entry-12345";

        assert_eq!(hash_to_u64(data), hash_to_u64(data));
    }

    #[test]
    fn test_hash_to_u64_empty_input() {
        assert_eq!(hash_to_u64(b""), hash_to_u64(b""));
    }
}
