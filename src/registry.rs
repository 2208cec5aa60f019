//! Host registry snapshot
//!
//! The host owns the catalog of areas, devices and entities plus their live
//! state. The engine only ever reads it through the [`Registry`] trait, taking
//! one snapshot per resolution pass.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRecord {
    pub area_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_id: String,
    /// User-assigned registry name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Name suggested by the integration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_by: Option<String>,
}

impl EntityRecord {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            name: None,
            original_name: None,
            device_id: None,
            area_id: None,
            disabled_by: None,
            hidden_by: None,
        }
    }

    /// Domain part of the entity id (`light` for `light.kitchen`)
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(domain, _)| domain)
            .unwrap_or(&self.entity_id)
    }

    /// Object id part of the entity id (`kitchen` for `light.kitchen`)
    pub fn object_id(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(_, object_id)| object_id)
            .unwrap_or(&self.entity_id)
    }
}

/// Live state of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    pub fn friendly_name(&self) -> Option<&str> {
        self.attributes.get("friendly_name").and_then(Value::as_str)
    }
}

/// Read-only registry API provided by the host
pub trait Registry {
    fn list_areas(&self) -> Vec<AreaRecord>;
    fn list_devices(&self) -> Vec<DeviceRecord>;
    fn list_entities(&self) -> Vec<EntityRecord>;
    fn get_state(&self, entity_id: &str) -> Option<EntityState>;
}

/// Registry captured as plain data, loaded from a JSON dump of the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub areas: Vec<AreaRecord>,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
    #[serde(default)]
    pub states: Vec<EntityState>,
}

impl RegistrySnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry snapshot from {:?}", path))?;
        let snapshot: RegistrySnapshot = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse registry snapshot from {:?}", path))?;
        info!(
            areas = snapshot.areas.len(),
            devices = snapshot.devices.len(),
            entities = snapshot.entities.len(),
            "Loaded registry snapshot"
        );
        Ok(snapshot)
    }

    /// Capture any registry implementation into an owned snapshot
    pub fn capture(registry: &dyn Registry) -> Self {
        let entities = registry.list_entities();
        let states = entities
            .iter()
            .filter_map(|e| registry.get_state(&e.entity_id))
            .collect();
        Self {
            areas: registry.list_areas(),
            devices: registry.list_devices(),
            entities,
            states,
        }
    }
}

impl Registry for RegistrySnapshot {
    fn list_areas(&self) -> Vec<AreaRecord> {
        self.areas.clone()
    }

    fn list_devices(&self) -> Vec<DeviceRecord> {
        self.devices.clone()
    }

    fn list_entities(&self) -> Vec<EntityRecord> {
        self.entities.clone()
    }

    fn get_state(&self, entity_id: &str) -> Option<EntityState> {
        self.states.iter().find(|s| s.entity_id == entity_id).cloned()
    }
}

/// Indexed view over one registry snapshot, built once per resolution pass
pub struct RegistryView {
    pub areas: Vec<AreaRecord>,
    pub entities: Vec<EntityRecord>,
    devices: HashMap<String, DeviceRecord>,
    states: HashMap<String, EntityState>,
}

impl RegistryView {
    pub fn capture(registry: &dyn Registry) -> Self {
        let entities = registry.list_entities();
        let states = entities
            .iter()
            .filter_map(|e| registry.get_state(&e.entity_id))
            .map(|s| (s.entity_id.clone(), s))
            .collect();
        let devices = registry
            .list_devices()
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        Self {
            areas: registry.list_areas(),
            entities,
            devices,
            states,
        }
    }

    pub fn state(&self, entity_id: &str) -> Option<&EntityState> {
        self.states.get(entity_id)
    }

    pub fn device(&self, device_id: &str) -> Option<&DeviceRecord> {
        self.devices.get(device_id)
    }

    pub fn area(&self, area_id: &str) -> Option<&AreaRecord> {
        self.areas.iter().find(|a| a.area_id == area_id)
    }

    /// Area of the entity itself, falling back to the area of its device
    pub fn entity_area<'a>(&'a self, entity: &'a EntityRecord) -> Option<&'a str> {
        entity.area_id.as_deref().or_else(|| {
            entity
                .device_id
                .as_deref()
                .and_then(|id| self.devices.get(id))
                .and_then(|d| d.area_id.as_deref())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> RegistrySnapshot {
        serde_json::from_value(json!({
            "areas": [{"area_id": "kitchen", "name": "Kitchen"}],
            "devices": [{"id": "dev1", "name": "Ceiling", "area_id": "kitchen"}],
            "entities": [
                {"entity_id": "light.ceiling", "device_id": "dev1"},
                {"entity_id": "sensor.loose"}
            ],
            "states": [
                {"entity_id": "light.ceiling", "state": "on", "attributes": {"friendly_name": "Ceiling Light"}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_domain_and_object_id() {
        let entity = EntityRecord::new("light.kitchen");
        assert_eq!(entity.domain(), "light");
        assert_eq!(entity.object_id(), "kitchen");
    }

    #[test]
    fn test_entity_area_falls_back_to_device() {
        let view = RegistryView::capture(&snapshot());
        let entity = &view.entities[0];
        assert_eq!(view.entity_area(entity), Some("kitchen"));
        assert_eq!(view.entity_area(&view.entities[1]), None);
    }

    #[test]
    fn test_entity_area_prefers_own_assignment() {
        let mut snap = snapshot();
        snap.entities[0].area_id = Some("garage".to_string());
        let view = RegistryView::capture(&snap);
        assert_eq!(view.entity_area(&view.entities[0]), Some("garage"));
    }

    #[test]
    fn test_state_lookup_and_friendly_name() {
        let snap = snapshot();
        let state = snap.get_state("light.ceiling").unwrap();
        assert_eq!(state.friendly_name(), Some("Ceiling Light"));
        assert!(snap.get_state("sensor.loose").is_none());
    }

    #[test]
    fn test_capture_keeps_registry_order() {
        let snap = RegistrySnapshot::capture(&snapshot());
        let ids: Vec<_> = snap.entities.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["light.ceiling", "sensor.loose"]);
        assert_eq!(snap.states.len(), 1);
    }
}
