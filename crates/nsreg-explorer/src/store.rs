//! Configured registry instances.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a configured instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Generate a new unique instance ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registry endpoint the operator has registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    /// Display name.
    pub name: String,
    /// Base address of the registry API. Not validated until first use.
    pub url: String,
}

/// Ordered collection of instances, owned by the console shell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStore {
    #[serde(default)]
    instances: Vec<Instance>,
}

impl InstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new instance with a fresh ID.
    pub fn add(&mut self, name: impl Into<String>, url: impl Into<String>) -> Instance {
        let instance = Instance {
            id: InstanceId::generate(),
            name: name.into(),
            url: url.into(),
        };
        self.instances.push(instance.clone());
        instance
    }

    /// Replace the record with the same ID. Returns false if there is none.
    pub fn update(&mut self, instance: Instance) -> bool {
        match self.instances.iter_mut().find(|i| i.id == instance.id) {
            Some(slot) => {
                *slot = instance;
                true
            }
            None => false,
        }
    }

    /// Remove the record with `id`. Returns false if there is none.
    pub fn delete(&mut self, id: &InstanceId) -> bool {
        let before = self.instances.len();
        self.instances.retain(|i| &i.id != id);
        self.instances.len() != before
    }

    pub fn get(&self, id: &InstanceId) -> Option<&Instance> {
        self.instances.iter().find(|i| &i.id == id)
    }

    pub fn position(&self, id: &InstanceId) -> Option<usize> {
        self.instances.iter().position(|i| &i.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter()
    }

    pub fn as_slice(&self) -> &[Instance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_preserves_insertion_order_and_unique_ids() {
        let mut store = InstanceStore::new();
        let a = store.add("local", "http://localhost:19950");
        let b = store.add("staging", "http://staging:19950");
        assert_ne!(a.id, b.id);
        let names: Vec<_> = store.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["local", "staging"]);
        assert_eq!(store.position(&b.id), Some(1));
    }

    #[test]
    fn update_replaces_by_id_in_place() {
        let mut store = InstanceStore::new();
        let a = store.add("local", "http://localhost:19950");
        store.add("other", "http://other");

        let renamed = Instance {
            name: "dev".into(),
            ..a.clone()
        };
        assert!(store.update(renamed));
        assert_eq!(store.get(&a.id).map(|i| i.name.as_str()), Some("dev"));
        assert_eq!(store.position(&a.id), Some(0));
    }

    #[test]
    fn update_and_delete_of_unknown_id_are_noops() {
        let mut store = InstanceStore::new();
        store.add("local", "http://localhost:19950");
        let snapshot = store.clone();

        let ghost = Instance {
            id: InstanceId::new("ghost".into()),
            name: "ghost".into(),
            url: "http://ghost".into(),
        };
        assert!(!store.update(ghost.clone()));
        assert!(!store.delete(&ghost.id));
        assert_eq!(store, snapshot);
    }

    #[test]
    fn delete_removes_only_matching_record() {
        let mut store = InstanceStore::new();
        let a = store.add("a", "http://a");
        let b = store.add("b", "http://b");
        assert!(store.delete(&a.id));
        assert!(store.get(&a.id).is_none());
        assert_eq!(store.get(&b.id), Some(&b));
        assert_eq!(store.len(), 1);
    }
}
