//! Parsed response cache keyed by resource file.

use super::ResponseData;
use crate::error::RenderError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Response data cache, lives for one scenario
pub struct ResponseCache {
    data: RwLock<HashMap<PathBuf, Arc<ResponseData>>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Get cached data or parse the file with `load`. Failed loads are not cached.
    pub fn get_or_load<F>(&self, path: &Path, load: F) -> Result<Arc<ResponseData>, RenderError>
    where
        F: FnOnce(&Path) -> Result<ResponseData, RenderError>,
    {
        // Check cache first
        {
            let cache = self.data.read();
            if let Some(data) = cache.get(path) {
                return Ok(Arc::clone(data));
            }
        }

        let data = Arc::new(load(path)?);

        // Two racing loads keep whichever landed first
        let mut cache = self.data.write();
        let entry = cache
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::clone(&data));
        Ok(Arc::clone(entry))
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Clear cache
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn data(message: &str) -> ResponseData {
        ResponseData {
            sleep_millis: 0,
            script: None,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_loads_once_per_path() {
        let cache = ResponseCache::new();
        let loads = Cell::new(0);
        let load = |_: &Path| {
            loads.set(loads.get() + 1);
            Ok(data("PONG"))
        };

        let first = cache.get_or_load(Path::new("a/001"), load).unwrap();
        let second = cache.get_or_load(Path::new("a/001"), load).unwrap();
        assert_eq!(loads.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));

        cache.get_or_load(Path::new("a/002"), load).unwrap();
        assert_eq!(loads.get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_load_not_cached() {
        let cache = ResponseCache::new();
        let result = cache.get_or_load(Path::new("a/001"), |_| {
            Err(RenderError::UnterminatedScript(2))
        });
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::new();
        cache
            .get_or_load(Path::new("a/001"), |_| Ok(data("x")))
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
