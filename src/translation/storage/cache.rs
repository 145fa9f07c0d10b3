//! 原文翻译缓存
//!
//! 以"目标语言 + 原文"为键记住已经见过的译文，避免不同节点中的相同文本重复提交。
//! 淘汰严格按插入顺序：读取不刷新位置，覆盖已有键也不改变其位置。

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::translation::config::constants;

/// 缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub target_lang: String,
    pub source_text: String,
}

impl CacheKey {
    pub fn new(target_lang: &str, source_text: &str) -> Self {
        Self {
            target_lang: target_lang.to_string(),
            source_text: source_text.to_string(),
        }
    }
}

/// 缓存统计信息
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// 命中率
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_requests as f64
        }
    }
}

/// 按插入顺序淘汰的有界缓存
///
/// 底层使用 `LruCache`，但只通过 `peek`/`peek_mut` 访问，因此链表顺序即插入顺序。
pub struct OriginCache {
    entries: LruCache<CacheKey, String>,
    stats: CacheStats,
}

impl OriginCache {
    /// 创建指定容量的缓存，容量为 0 时按 1 处理
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    /// 查找译文
    pub fn get(&mut self, target_lang: &str, source_text: &str) -> Option<String> {
        self.stats.total_requests += 1;

        let key = CacheKey::new(target_lang, source_text);
        match self.entries.peek(&key) {
            Some(value) => {
                self.stats.cache_hits += 1;
                Some(value.clone())
            }
            None => {
                self.stats.cache_misses += 1;
                None
            }
        }
    }

    /// 写入译文
    pub fn insert(&mut self, target_lang: &str, source_text: &str, translated: &str) {
        let key = CacheKey::new(target_lang, source_text);

        if let Some(existing) = self.entries.peek_mut(&key) {
            *existing = translated.to_string();
            return;
        }

        if let Some((evicted, _)) = self.entries.push(key, translated.to_string()) {
            tracing::trace!("缓存淘汰: {:?}", evicted.source_text);
            self.stats.evictions += 1;
        }
    }

    pub fn contains(&self, target_lang: &str, source_text: &str) -> bool {
        self.entries
            .contains(&CacheKey::new(target_lang, source_text))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl Default for OriginCache {
    fn default() -> Self {
        Self::new(constants::CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss() {
        let mut cache = OriginCache::new(10);
        cache.insert("fr", "Hello", "Bonjour");

        assert_eq!(cache.get("fr", "Hello").as_deref(), Some("Bonjour"));
        assert_eq!(cache.get("es", "Hello"), None);
        assert_eq!(cache.stats().cache_hits, 1);
        assert_eq!(cache.stats().cache_misses, 1);
    }

    #[test]
    fn test_evicts_oldest_insert_even_after_reads() {
        let mut cache = OriginCache::new(2);
        cache.insert("", "a", "A");
        cache.insert("", "b", "B");

        // 读取不刷新位置
        assert!(cache.get("", "a").is_some());

        cache.insert("", "c", "C");
        assert!(!cache.contains("", "a"));
        assert!(cache.contains("", "b"));
        assert!(cache.contains("", "c"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_keeps_insertion_position() {
        let mut cache = OriginCache::new(2);
        cache.insert("", "a", "A");
        cache.insert("", "b", "B");
        cache.insert("", "a", "A2");
        cache.insert("", "c", "C");

        assert!(!cache.contains("", "a"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_default_capacity() {
        let cache = OriginCache::default();
        assert_eq!(cache.capacity(), 5000);
        assert!(cache.is_empty());
    }
}
