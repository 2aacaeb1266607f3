pub mod normalizer;
pub mod schema;

pub use normalizer::{find_candidates, normalize};
pub use schema::{Entity, EntitySet, Relation};

use ingest::Chunk;
use std::collections::{BTreeSet, HashMap};

pub const DEFAULT_MIN_FREQ: usize = 2;

/// Counts keyed by string, remembering first-seen order
#[derive(Default)]
struct OrderedCounter<K> {
    keys: Vec<K>,
    counts: HashMap<K, usize>,
}

impl<K: std::hash::Hash + Eq + Clone> OrderedCounter<K> {
    fn increment(&mut self, key: K) {
        match self.counts.get_mut(&key) {
            Some(count) => *count += 1,
            None => {
                self.keys.push(key.clone());
                self.counts.insert(key, 1);
            }
        }
    }

    fn into_entries(self) -> Vec<(K, usize)> {
        let OrderedCounter { keys, mut counts } = self;
        keys.into_iter()
            .map(|k| {
                let count = counts.remove(&k).unwrap_or(0);
                (k, count)
            })
            .collect()
    }
}

/// Extract entities by counting capitalized phrases across the corpus.
///
/// Labels seen fewer than `min_freq` times are dropped; `min_freq == 0`
/// keeps every candidate.
pub fn extract_entities(chunks: &[Chunk], min_freq: usize) -> EntitySet {
    let mut counter: OrderedCounter<String> = OrderedCounter::default();

    for chunk in chunks {
        for label in find_candidates(&chunk.text) {
            counter.increment(label.to_string());
        }
    }

    let mut entities = EntitySet::new();
    for (label, frequency) in counter.into_entries() {
        if frequency < min_freq {
            continue;
        }
        let entity_id = normalize(&label);
        if entities.contains(&entity_id) {
            tracing::warn!(entity_id = %entity_id, label = %label, "Entity id collision, keeping later label");
        }
        entities.insert(Entity {
            entity_id,
            label,
            frequency,
        });
    }

    tracing::info!(entities = entities.len(), min_freq, "Extracted entities");
    entities
}

/// Create co-occurrence relations between entities mentioned in the same chunk.
pub fn extract_relations(chunks: &[Chunk], entities: &EntitySet) -> Vec<Relation> {
    let label_index = entities.label_index();
    let mut counter: OrderedCounter<(String, String)> = OrderedCounter::default();

    for chunk in chunks {
        // Sorted and deduplicated so each pair is counted once per chunk
        let mentioned: BTreeSet<&str> = find_candidates(&chunk.text)
            .filter_map(|label| label_index.get(label).copied())
            .collect();
        let mentioned: Vec<&str> = mentioned.into_iter().collect();

        for (i, head) in mentioned.iter().enumerate() {
            for tail in &mentioned[i + 1..] {
                counter.increment((head.to_string(), tail.to_string()));
            }
        }
    }

    let relations: Vec<Relation> = counter
        .into_entries()
        .into_iter()
        .map(|((head_id, tail_id), weight)| {
            let tail_label = entities
                .get(&tail_id)
                .map(|e| e.label.as_str())
                .unwrap_or(tail_id.as_str());
            Relation {
                description: format!("Co-occurs with {}", tail_label),
                head_id,
                tail_id,
                weight: weight as f32,
            }
        })
        .collect();

    tracing::info!(relations = relations.len(), "Extracted relations");
    relations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new("doc", i, t.to_string()))
            .collect()
    }

    #[test]
    fn test_min_freq_threshold() {
        let corpus = chunks(&[
            "Alice went home.",
            "Alice called Bob.",
            "Alice slept.",
            "Bob waited.",
        ]);

        let entities = extract_entities(&corpus, 3);
        assert!(entities.contains("alice"));
        assert!(!entities.contains("bob"));
        assert_eq!(entities.get("alice").unwrap().frequency, 3);
    }

    #[test]
    fn test_zero_min_freq_keeps_everything() {
        let corpus = chunks(&["Alice met Bob in Paris."]);
        let entities = extract_entities(&corpus, 0);

        let ids: Vec<&str> = entities.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob", "paris"]);
    }

    #[test]
    fn test_multi_word_entity_id() {
        let corpus = chunks(&["we flew to New York today", "then New York again"]);
        let entities = extract_entities(&corpus, 2);

        let entity = entities.get("new_york").unwrap();
        assert_eq!(entity.label, "New York");
        assert_eq!(entity.frequency, 2);
    }

    #[test]
    fn test_relation_weight_counts_chunks() {
        let corpus = chunks(&[
            "Alice and Bob argued.",
            "later Bob and Alice agreed, Bob said.",
            "Alice saw Bob.",
            "Bob only.",
        ]);
        let entities = extract_entities(&corpus, 2);
        let relations = extract_relations(&corpus, &entities);

        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].head_id, "alice");
        assert_eq!(relations[0].tail_id, "bob");
        assert_eq!(relations[0].weight, 3.0);
        assert_eq!(relations[0].description, "Co-occurs with Bob");
    }

    #[test]
    fn test_no_relation_without_co_occurrence() {
        let corpus = chunks(&["Alice here.", "Alice again.", "Bob there.", "Bob again."]);
        let entities = extract_entities(&corpus, 2);
        let relations = extract_relations(&corpus, &entities);

        assert_eq!(entities.len(), 2);
        assert!(relations.is_empty());
    }

    #[test]
    fn test_empty_corpus() {
        let entities = extract_entities(&[], 2);
        assert!(entities.is_empty());
        assert!(extract_relations(&[], &entities).is_empty());
    }
}
