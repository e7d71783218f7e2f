//! Table identity
//!
//! The QR link carries `?table=<number>`. The last seen number is kept in
//! a local cache so a reload without the parameter still knows the table.

use crate::error::{ClientError, ClientResult};
use parking_lot::Mutex;

/// Local storage for the last resolved table number
pub trait TableCache: Send + Sync {
    fn load(&self) -> Option<String>;
    fn store(&self, value: &str);
}

/// Process-local cache
#[derive(Debug, Default)]
pub struct MemoryTableCache {
    value: Mutex<Option<String>>,
}

impl MemoryTableCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableCache for MemoryTableCache {
    fn load(&self) -> Option<String> {
        self.value.lock().clone()
    }

    fn store(&self, value: &str) {
        *self.value.lock() = Some(value.to_string());
    }
}

/// The diner's table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableContext {
    pub number: i32,
}

impl TableContext {
    /// Resolve from a page URL, falling back to the cache
    ///
    /// A `table` parameter in the URL wins and refreshes the cache.
    pub fn resolve(url: &str, cache: &dyn TableCache) -> ClientResult<Self> {
        if let Some(raw) = table_param(url) {
            let number = parse_number(&raw)?;
            cache.store(&raw);
            return Ok(Self { number });
        }

        match cache.load() {
            Some(raw) => Ok(Self {
                number: parse_number(&raw)?,
            }),
            None => Err(ClientError::Validation(
                "Table number is required; scan the QR code on your table".into(),
            )),
        }
    }
}

fn parse_number(raw: &str) -> ClientResult<i32> {
    match raw.trim().parse::<i32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ClientError::Validation(format!("Invalid table number: {}", raw))),
    }
}

/// Value of the `table` query parameter, if present and non-empty
fn table_param(url: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    let query = query.split('#').next().unwrap_or_default();
    query
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(key, _)| *key == "table")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_wins_and_refreshes_cache() {
        let cache = MemoryTableCache::new();
        cache.store("3");

        let ctx = TableContext::resolve("https://diner.test/menu?table=12", &cache).unwrap();
        assert_eq!(ctx.number, 12);
        assert_eq!(cache.load().as_deref(), Some("12"));
    }

    #[test]
    fn test_cache_fallback() {
        let cache = MemoryTableCache::new();
        cache.store("7");
        let ctx = TableContext::resolve("https://diner.test/menu", &cache).unwrap();
        assert_eq!(ctx.number, 7);

        let ctx = TableContext::resolve("https://diner.test/menu?table=", &cache).unwrap();
        assert_eq!(ctx.number, 7);
    }

    #[test]
    fn test_missing_everywhere() {
        let cache = MemoryTableCache::new();
        let err = TableContext::resolve("https://diner.test/menu?lang=en", &cache).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_invalid_numbers() {
        let cache = MemoryTableCache::new();
        for url in [
            "https://diner.test/menu?table=abc",
            "https://diner.test/menu?table=0",
            "https://diner.test/menu?table=-2",
        ] {
            assert!(matches!(
                TableContext::resolve(url, &cache),
                Err(ClientError::Validation(_))
            ));
        }
        // Rejected values never reach the cache
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn test_param_among_others() {
        let cache = MemoryTableCache::new();
        let ctx =
            TableContext::resolve("https://diner.test/menu?lang=en&table=4#top", &cache).unwrap();
        assert_eq!(ctx.number, 4);
    }
}
