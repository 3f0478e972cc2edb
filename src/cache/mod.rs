//! Cache Module
//!
//! Provides in-memory response caching with TTL expiration and FIFO eviction.

mod entry;
mod fifo;
mod memory;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use fifo::InsertionOrder;
pub use memory::MemoryCache;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 2048;

// == Cache Key ==
/// Builds a cache key of the form `prefix:part1:part2:...`.
///
/// Parts are joined in the order given; callers must supply them in a
/// stable order for equal requests to share a key.
pub fn cache_key<I, S>(prefix: &str, parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut key = prefix.to_string();
    for part in parts {
        key.push(':');
        key.push_str(part.as_ref());
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_joins_parts() {
        assert_eq!(cache_key("GET", ["/x"]), "GET:/x");
        assert_eq!(
            cache_key("GET", ["/players", "filter[playerNames]=shroud"]),
            "GET:/players:filter[playerNames]=shroud"
        );
    }

    #[test]
    fn test_cache_key_without_parts() {
        assert_eq!(cache_key::<[&str; 0], &str>("status", []), "status");
    }

    #[test]
    fn test_cache_key_is_order_sensitive() {
        assert_ne!(cache_key("p", ["a", "b"]), cache_key("p", ["b", "a"]));
    }
}
