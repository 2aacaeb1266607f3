use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,
    pub label: String,
    pub frequency: usize,
}

/// Undirected co-occurrence between two entities; `head_id < tail_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub head_id: String,
    pub tail_id: String,
    pub weight: f32,
    pub description: String,
}

/// Entities in first-discovery order, addressable by id.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct EntitySet {
    entities: Vec<Entity>,
    #[serde(skip)]
    id_to_idx: HashMap<String, usize>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity. An entity with the same id is replaced in place,
    /// keeping its original position.
    pub fn insert(&mut self, entity: Entity) {
        if let Some(&idx) = self.id_to_idx.get(&entity.entity_id) {
            self.entities[idx] = entity;
            return;
        }

        self.id_to_idx.insert(entity.entity_id.clone(), self.entities.len());
        self.entities.push(entity);
    }

    pub fn get(&self, entity_id: &str) -> Option<&Entity> {
        self.id_to_idx.get(entity_id).map(|&idx| &self.entities[idx])
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.id_to_idx.contains_key(entity_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Surface label -> entity id
    pub fn label_index(&self) -> HashMap<&str, &str> {
        self.entities
            .iter()
            .map(|e| (e.label.as_str(), e.entity_id.as_str()))
            .collect()
    }
}

impl FromIterator<Entity> for EntitySet {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        let mut set = EntitySet::new();
        for entity in iter {
            set.insert(entity);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, label: &str, frequency: usize) -> Entity {
        Entity {
            entity_id: id.to_string(),
            label: label.to_string(),
            frequency,
        }
    }

    #[test]
    fn test_insert_keeps_order() {
        let set: EntitySet = vec![entity("bob", "Bob", 2), entity("paris", "Paris", 3)]
            .into_iter()
            .collect();

        let ids: Vec<&str> = set.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["bob", "paris"]);
        assert_eq!(set.get("paris").unwrap().frequency, 3);
        assert!(!set.contains("alice"));
    }

    #[test]
    fn test_duplicate_id_replaced_in_place() {
        let mut set = EntitySet::new();
        set.insert(entity("paris", "Paris", 2));
        set.insert(entity("bob", "Bob", 2));
        set.insert(entity("paris", "PARIS", 4));

        assert_eq!(set.len(), 2);
        let first = set.iter().next().unwrap();
        assert_eq!(first.label, "PARIS");
        assert_eq!(first.frequency, 4);
    }
}
