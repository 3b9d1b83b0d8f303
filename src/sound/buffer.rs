// Sound buffers and the path-keyed buffer cache

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::types::BufferId;
use crate::resource::{LoaderError, ResourceLoader};

/// Encoded sound data, shared cheaply between the cache and playing handles
#[derive(Debug, Clone)]
pub struct SoundBuffer {
    id: BufferId,
    path: String,
    data: Arc<[u8]>,
}

impl SoundBuffer {
    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Path-keyed cache. Loading the same path twice returns the same buffer
/// until it is evicted.
#[derive(Debug)]
pub struct SoundCache {
    entries: LruCache<String, SoundBuffer>,
    next_id: u64,
}

impl SoundCache {
    /// `capacity == 0` means unbounded
    pub fn new(capacity: usize) -> Self {
        let entries = match NonZeroUsize::new(capacity) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self { entries, next_id: 1 }
    }

    pub fn load(&mut self, path: &str, loader: &dyn ResourceLoader) -> Result<SoundBuffer, LoaderError> {
        if let Some(buffer) = self.entries.get(path) {
            return Ok(buffer.clone());
        }
        let bytes = loader.load_audio(path)?;
        let buffer = SoundBuffer {
            id: BufferId(self.next_id),
            path: path.to_string(),
            data: Arc::from(bytes),
        };
        self.next_id += 1;
        log::debug!("cached sound '{}' ({} bytes)", path, buffer.data.len());
        self.entries.put(path.to_string(), buffer.clone());
        Ok(buffer)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::MemoryLoader;

    fn loader() -> MemoryLoader {
        let mut loader = MemoryLoader::new();
        loader.insert_audio("a.wav", vec![1, 2, 3]);
        loader.insert_audio("b.wav", vec![4]);
        loader.insert_audio("c.wav", vec![5]);
        loader
    }

    #[test]
    fn test_repeated_load_returns_same_buffer() {
        let loader = loader();
        let mut cache = SoundCache::new(0);
        let first = cache.load("a.wav", &loader).unwrap();
        let second = cache.load("a.wav", &loader).unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(second.data(), &[1, 2, 3]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_sound_propagates() {
        let loader = loader();
        let mut cache = SoundCache::new(0);
        assert!(matches!(
            cache.load("nope.wav", &loader),
            Err(LoaderError::NotFound(_))
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_bounded_cache_evicts_oldest() {
        let loader = loader();
        let mut cache = SoundCache::new(2);
        let a = cache.load("a.wav", &loader).unwrap();
        cache.load("b.wav", &loader).unwrap();
        cache.load("c.wav", &loader).unwrap();
        assert!(!cache.contains("a.wav"));
        let reloaded = cache.load("a.wav", &loader).unwrap();
        assert_ne!(a.id(), reloaded.id());
    }
}
