use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// LLM answers keyed by the SHA-256 of the prompt that produced them.
#[derive(Clone)]
pub struct AnswerCache {
    answers: Arc<DashMap<String, String>>,
    max_entries: usize,
    enabled: bool,
}

impl AnswerCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            answers: Arc::new(DashMap::new()),
            max_entries,
            enabled: max_entries > 0,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(0)
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, prompt: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.answers.get(&hash_prompt(prompt)).map(|r| r.value().clone())
    }

    pub fn insert(&self, prompt: &str, answer: String) {
        if !self.enabled {
            return;
        }
        if self.answers.len() >= self.max_entries {
            // Drop a quarter of the entries when full
            let to_remove: Vec<_> = self
                .answers
                .iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.answers.remove(&key);
            }
        }
        self.answers.insert(hash_prompt(prompt), answer);
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn clear(&self) {
        self.answers.clear();
    }
}

pub fn hash_prompt(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss() {
        let cache = AnswerCache::new(10);
        assert!(cache.get("prompt").is_none());

        cache.insert("prompt", "answer".to_string());
        assert_eq!(cache.get("prompt").as_deref(), Some("answer"));
        assert!(cache.get("other prompt").is_none());
    }

    #[test]
    fn test_eviction_keeps_size_bounded() {
        let cache = AnswerCache::new(4);
        for i in 0..20 {
            cache.insert(&format!("prompt {}", i), i.to_string());
        }
        assert!(cache.len() <= 4);
        assert_eq!(cache.get("prompt 19").as_deref(), Some("19"));
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = AnswerCache::disabled();
        cache.insert("prompt", "answer".to_string());
        assert!(cache.is_empty());
        assert!(cache.get("prompt").is_none());
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = hash_prompt("abc");
        assert_eq!(hash, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }
}
