use crate::entity::{Entity, EntityChange, EntityState, EntitySummary};
use crate::subscription::ChangeReceiver;
use crate::types::{Attributes, EntityId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;

/// Keyed entity storage
///
/// The driver keeps two independent stores: `available` entities it can
/// expose and `configured` entities the remote subscribed to. Entities are
/// shared by reference between both stores.
pub struct EntityStore {
    name: String,
    entities: RwLock<HashMap<EntityId, Arc<Entity>>>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<EntityChange>>>,
}

impl EntityStore {
    /// Create an empty store with the given identifier, used in log output
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: RwLock::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<EntityId, Arc<Entity>>> {
        self.entities.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<EntityId, Arc<Entity>>> {
        self.entities.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.read().contains_key(entity_id)
    }

    pub fn get(&self, entity_id: &str) -> Option<Arc<Entity>> {
        let entity = self.read().get(entity_id).cloned();
        if entity.is_none() {
            tracing::debug!("ENTITIES({}): entity does not exist: {}", self.name, entity_id);
        }
        entity
    }

    /// Add an entity. Returns `false` if the id is already present.
    pub fn add(&self, entity: impl Into<Arc<Entity>>) -> bool {
        let entity = entity.into();
        let mut entities = self.write();
        if entities.contains_key(entity.id()) {
            tracing::debug!("ENTITIES({}): entity already exists: {}", self.name, entity.id());
            return false;
        }
        tracing::debug!("ENTITIES({}): entity added: {}", self.name, entity.id());
        entities.insert(entity.id().to_string(), entity);
        true
    }

    /// Remove an entity. Removing an absent id is not an error.
    pub fn remove(&self, entity_id: &str) -> bool {
        if self.write().remove(entity_id).is_none() {
            tracing::debug!("ENTITIES({}): entity does not exist: {}", self.name, entity_id);
        } else {
            tracing::debug!("ENTITIES({}): entity deleted: {}", self.name, entity_id);
        }
        true
    }

    /// Merge attributes into an entity and notify change listeners.
    ///
    /// The change event carries exactly the given attributes. Returns
    /// `false` without emitting anything if the entity is absent.
    pub fn update_attributes(&self, entity_id: &str, attributes: Attributes) -> bool {
        let Some(entity) = self.read().get(entity_id).cloned() else {
            tracing::debug!("ENTITIES({}): entity does not exist: {}", self.name, entity_id);
            return false;
        };

        entity.merge_attributes(&attributes);
        let change = EntityChange {
            entity_id: entity_id.to_string(),
            entity_type: entity.entity_type(),
            attributes,
        };
        // dropped receivers are unregistered here
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(change.clone()).is_ok());

        tracing::debug!("ENTITIES({}): entity attributes updated: {}", self.name, entity_id);
        true
    }

    /// Summaries of all entities, without attributes
    pub fn get_all(&self) -> Vec<EntitySummary> {
        self.read().values().map(|e| e.summary()).collect()
    }

    /// Attribute states of all entities
    pub fn get_states(&self) -> Vec<EntityState> {
        self.read().values().map(|e| e.state()).collect()
    }

    /// Identifiers of all entities
    pub fn ids(&self) -> Vec<EntityId> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove all entities. No change events are emitted.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Register a change listener; drop the receiver to remove it
    pub fn subscribe_changes(&self) -> ChangeReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        ChangeReceiver::new(rx)
    }
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("name", &self.name)
            .field("entities", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use serde_json::json;

    fn light(id: &str) -> Entity {
        Entity::builder(id, "Lamp", EntityType::Light)
            .features(["on_off", "dim"])
            .attribute("state", "OFF")
            .attribute("brightness", 0)
            .build()
    }

    fn attrs(value: serde_json::Value) -> Attributes {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn add_and_get() {
        let store = EntityStore::new("available");
        assert!(store.add(light("l1")));
        assert!(store.contains("l1"));
        assert_eq!(store.get("l1").map(|e| e.id().to_string()), Some("l1".to_string()));
        assert!(store.get("l2").is_none());
    }

    #[test]
    fn duplicate_add_keeps_first() {
        let store = EntityStore::new("available");
        assert!(store.add(light("l1")));
        let second = Entity::builder("l1", "Other", EntityType::Switch).build();
        assert!(!store.add(second));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("l1").unwrap().entity_type(), EntityType::Light);
    }

    #[test]
    fn remove_is_idempotent() {
        let store = EntityStore::new("configured");
        store.add(light("l1"));
        assert!(store.remove("l1"));
        assert!(store.remove("l1"));
        assert!(store.is_empty());
    }

    #[test]
    fn update_absent_entity_emits_nothing() {
        let store = EntityStore::new("configured");
        let mut rx = store.subscribe_changes();
        assert!(!store.update_attributes("missing", attrs(json!({"state": "ON"}))));
        assert!(rx.try_recv().unwrap().is_none());
    }

    #[test]
    fn update_merges_and_emits_partial_map_once() {
        let store = EntityStore::new("configured");
        store.add(light("l1"));
        let mut rx = store.subscribe_changes();

        assert!(store.update_attributes("l1", attrs(json!({"state": "ON"}))));

        let change = rx.try_recv().unwrap().unwrap();
        assert_eq!(change.entity_id, "l1");
        assert_eq!(change.entity_type, EntityType::Light);
        assert_eq!(change.attributes, attrs(json!({"state": "ON"})));
        assert!(rx.try_recv().unwrap().is_none());

        let entity = store.get("l1").unwrap();
        assert_eq!(entity.attributes(), attrs(json!({"state": "ON", "brightness": 0})));
    }

    #[test]
    fn burst_of_updates_is_queued_in_full() {
        let store = EntityStore::new("configured");
        store.add(light("l1"));
        let mut rx = store.subscribe_changes();

        for n in 0..1000 {
            assert!(store.update_attributes("l1", attrs(json!({"brightness": n}))));
        }
        for n in 0..1000 {
            let change = rx.try_recv().unwrap().unwrap();
            assert_eq!(change.attributes["brightness"], json!(n));
        }
        assert!(rx.try_recv().unwrap().is_none());
    }

    #[test]
    fn dropped_receiver_is_unregistered() {
        let store = EntityStore::new("configured");
        store.add(light("l1"));
        drop(store.subscribe_changes());
        let mut rx = store.subscribe_changes();

        assert!(store.update_attributes("l1", attrs(json!({"state": "ON"}))));
        assert_eq!(store.listeners.lock().unwrap().len(), 1);
        assert!(rx.try_recv().unwrap().is_some());
    }

    #[test]
    fn shared_entities_see_updates_from_either_store() {
        let available = EntityStore::new("available");
        let configured = EntityStore::new("configured");
        available.add(light("l1"));
        configured.add(available.get("l1").unwrap());

        configured.update_attributes("l1", attrs(json!({"brightness": 80})));
        assert_eq!(available.get("l1").unwrap().attribute("brightness"), Some(json!(80)));

        configured.remove("l1");
        assert!(available.contains("l1"));
    }

    #[test]
    fn get_all_excludes_attributes_and_states_include_them() {
        let store = EntityStore::new("available");
        store.add(light("l1"));

        let all = serde_json::to_value(store.get_all()).unwrap();
        assert_eq!(all[0]["entity_id"], "l1");
        assert_eq!(all[0]["features"], json!(["on_off", "dim"]));
        assert!(all[0].get("attributes").is_none());

        let states = serde_json::to_value(store.get_states()).unwrap();
        assert_eq!(states[0]["attributes"], json!({"state": "OFF", "brightness": 0}));
    }

    #[test]
    fn clear_does_not_emit() {
        let store = EntityStore::new("configured");
        store.add(light("l1"));
        let mut rx = store.subscribe_changes();
        store.clear();
        assert!(store.is_empty());
        assert!(rx.try_recv().unwrap().is_none());
    }
}
