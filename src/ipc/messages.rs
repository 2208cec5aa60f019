//! Mutation channel message types for dashboard ↔ configuration store

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::blueprint::BlueprintDocument;
use crate::config::{ConfigurationDocument, HomepageHeader, SpanOverride};
use crate::reorder::{OrderAssignment, SortField};

/// Where a card document lives in the configuration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardTarget {
    /// Card of one entity
    Entity { entity_id: String },

    /// Popup of one entity
    EntityPopup { entity_id: String },

    /// Default card for every entity of a domain
    Domain { domain: String },

    /// Default popup for every entity of a domain
    DomainPopup { domain: String },

    /// User-added card on an area page
    Slot { area_id: String, card_id: String },

    /// Extra page in the navigation shell, created if it does not exist
    MorePage { name: String },
}

/// Overview buttons that can be edited and reordered
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    /// Area buttons on the area overview
    Area,
    /// Domain buttons on the device overview
    Device,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ButtonTarget {
    pub kind: ButtonKind,
    /// Area id or device domain
    pub id: String,
}

/// Button fields to change; unset fields are left alone
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Area buttons only; an empty string clears the floor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    /// Device buttons only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_in_navbar: Option<bool>,
    /// Area buttons only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

/// Entity fields to change; unset fields are left alone
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityFlags {
    /// An empty string clears the override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_card: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_popup: Option<bool>,
    #[serde(flatten)]
    pub spans: SpanOverride,
}

/// Requests sent from the dashboard to the configuration store
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ConfigRequest {
    /// Fetch the whole configuration document
    GetConfiguration,

    /// Add a slot card to an area page
    AddCard {
        area_id: String,
        card: Value,
        #[serde(default)]
        spans: SpanOverride,
    },

    /// Remove a slot card from an area page
    RemoveCard { area_id: String, card_id: String },

    /// Replace a card document; `None` reverts to the cascade default
    EditCard { target: CardTarget, card: Option<Value> },

    /// Update per-entity flags and spans
    EditEntity { entity_id: String, flags: EntityFlags },

    /// Update an area or device button
    EditButton { target: ButtonTarget, settings: ButtonSettings },

    /// Persist a reorder of area or device buttons
    SortButton {
        button: ButtonKind,
        field: SortField,
        assignments: Vec<OrderAssignment>,
    },

    /// Persist a reorder of entity cards
    SortEntity {
        field: SortField,
        assignments: Vec<OrderAssignment>,
    },

    InstallBlueprint { document: Box<BlueprintDocument> },

    /// Apply an installed blueprint to a target
    UseBlueprint {
        name: String,
        target: CardTarget,
        #[serde(default)]
        inputs: Map<String, Value>,
    },

    DeleteBlueprint { name: String },

    EditHomepageHeader { header: HomepageHeader },

    RemoveMorePage { name: String },
}

impl ConfigRequest {
    /// Short name used in logs
    pub fn verb(&self) -> &'static str {
        match self {
            ConfigRequest::GetConfiguration => "get_configuration",
            ConfigRequest::AddCard { .. } => "add_card",
            ConfigRequest::RemoveCard { .. } => "remove_card",
            ConfigRequest::EditCard { .. } => "edit_card",
            ConfigRequest::EditEntity { .. } => "edit_entity",
            ConfigRequest::EditButton { .. } => "edit_button",
            ConfigRequest::SortButton { .. } => "sort_button",
            ConfigRequest::SortEntity { .. } => "sort_entity",
            ConfigRequest::InstallBlueprint { .. } => "install_blueprint",
            ConfigRequest::UseBlueprint { .. } => "use_blueprint",
            ConfigRequest::DeleteBlueprint { .. } => "delete_blueprint",
            ConfigRequest::EditHomepageHeader { .. } => "edit_homepage_header",
            ConfigRequest::RemoveMorePage { .. } => "remove_more_page",
        }
    }
}

/// Responses sent from the configuration store to the dashboard
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ConfigResponse {
    /// Mutation applied and persisted
    Ok,

    /// Response to GetConfiguration
    Configuration(Box<ConfigurationDocument>),

    /// Mutation rejected or not persisted
    Error(String),
}
