//! Shared configuration document
//!
//! Holds every user edit the dashboard knows about: per-entity overrides,
//! per-domain defaults, per-area metadata, homepage settings, more pages and
//! the installed blueprint library. Entries are created lazily the first time
//! something is edited; an absent entry always means "defer to the next
//! cascade level".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::blueprint::BlueprintLibrary;
use crate::config::store::DocumentStore;
use crate::constants::{config as paths, spans};
use crate::reorder::SortField;

/// Which family of views an entity order belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortContext {
    /// Entity listings inside one area
    Area,
    /// Entity listings for one device domain
    Device,
}

/// Card content, optionally backed by an installed blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDocument {
    /// Card config, or for blueprint-backed cards a snapshot of the template
    /// taken when the blueprint was used
    pub card: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub inputs: Map<String, Value>,
}

impl CardDocument {
    pub fn plain(card: Value) -> Self {
        Self {
            card,
            blueprint: None,
            inputs: Map::new(),
        }
    }

    pub fn is_blueprint_backed(&self) -> bool {
        self.blueprint.is_some()
    }
}

/// Row/column spans at the three responsive breakpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanOverride {
    #[serde(default, deserialize_with = "deserialize_span", skip_serializing_if = "Option::is_none")]
    pub row_span: Option<u8>,
    #[serde(default, deserialize_with = "deserialize_span", skip_serializing_if = "Option::is_none")]
    pub row_span_lg: Option<u8>,
    #[serde(default, deserialize_with = "deserialize_span", skip_serializing_if = "Option::is_none")]
    pub row_span_xl: Option<u8>,
    #[serde(default, deserialize_with = "deserialize_span", skip_serializing_if = "Option::is_none")]
    pub col_span: Option<u8>,
    #[serde(default, deserialize_with = "deserialize_span", skip_serializing_if = "Option::is_none")]
    pub col_span_lg: Option<u8>,
    #[serde(default, deserialize_with = "deserialize_span", skip_serializing_if = "Option::is_none")]
    pub col_span_xl: Option<u8>,
}

/// Custom deserializer that saturates any JSON number into `u8`, so an
/// out-of-range span is clamped after load instead of rejecting the document
fn deserialize_span<'de, D>(deserializer: D) -> std::result::Result<Option<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrFloat {
        Int(i64),
        Float(f64),
    }

    Ok(Option::<IntOrFloat>::deserialize(deserializer)?.map(|span| match span {
        IntOrFloat::Int(i) => i.clamp(0, i64::from(u8::MAX)) as u8,
        // Float to int casts saturate
        IntOrFloat::Float(f) => f.round() as u8,
    }))
}

impl SpanOverride {
    fn fields_mut(&mut self) -> [(&'static str, &mut Option<u8>); 6] {
        [
            ("row_span", &mut self.row_span),
            ("row_span_lg", &mut self.row_span_lg),
            ("row_span_xl", &mut self.row_span_xl),
            ("col_span", &mut self.col_span),
            ("col_span_lg", &mut self.col_span_lg),
            ("col_span_xl", &mut self.col_span_xl),
        ]
    }

    /// Overlay every field that is set in `patch`
    pub fn merge(&mut self, patch: &SpanOverride) {
        let mut patch = *patch;
        for ((_, target), (_, source)) in self.fields_mut().into_iter().zip(patch.fields_mut()) {
            if source.is_some() {
                *target = *source;
            }
        }
    }

    /// Clamp every set span into the accepted range, returning true if anything changed
    pub(crate) fn clamp(&mut self, owner: &str) -> bool {
        let mut changed = false;
        for (field, span) in self.fields_mut() {
            if let Some(value) = *span {
                let clamped = value.clamp(spans::MIN_SPAN, spans::MAX_SPAN);
                if clamped != value {
                    warn!(owner = %owner, field, value, using = clamped, "span out of range, clamping");
                    *span = Some(clamped);
                    changed = true;
                }
            }
        }
        changed
    }
}

/// Per-entity overrides, created on first edit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityOverride {
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<CardDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup: Option<CardDocument>,
    #[serde(flatten)]
    pub spans: SpanOverride,

    // Area-context ordering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouped_sort_order: Option<u32>,

    // Device-context ordering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_sort_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_grouped_sort_order: Option<u32>,
}

impl EntityOverride {
    /// (flat, grouped) sort fields for the given view family
    pub fn sort_orders(&self, context: SortContext) -> (Option<u32>, Option<u32>) {
        match context {
            SortContext::Area => (self.sort_order, self.grouped_sort_order),
            SortContext::Device => (self.device_sort_order, self.device_grouped_sort_order),
        }
    }

    pub fn is_favorite(&self) -> bool {
        self.favorite.unwrap_or(false)
    }
}

/// Defaults shared by every entity of one device domain (`light`, `cover`, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_in_navbar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<CardDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup: Option<CardDocument>,
    /// Position of the domain's button on the device overview
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u32>,
}

/// A card the user placed on an area page that is not tied to an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotCard {
    pub id: String,
    pub card: CardDocument,
    #[serde(flatten)]
    pub spans: SpanOverride,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u32>,
    /// Order inside the custom-card group when the area view is grouped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouped_sort_order: Option<u32>,
}

impl SlotCard {
    /// Slot cards only live on area pages, so device fields do not apply
    pub fn sort_field_mut(&mut self, field: SortField) -> Option<&mut Option<u32>> {
        match field {
            SortField::SortOrder => Some(&mut self.sort_order),
            SortField::GroupedSortOrder => Some(&mut self.grouped_sort_order),
            SortField::DeviceSortOrder | SortField::DeviceGroupedSortOrder | SortField::FloorSortOrder => None,
        }
    }
}

/// Per-area metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u32>,
    /// Order of the area button inside its floor group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_sort_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<SlotCard>,
}

/// Homepage header settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomepageHeader {
    #[serde(default = "default_true")]
    pub show_clock: bool,
    #[serde(default = "default_true")]
    pub show_date: bool,
    #[serde(default)]
    pub show_weather: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_entity: Option<String>,
}

/// Extra page listed in the navigation shell, usually made from a page blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorePage {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub card: CardDocument,
}

/// Top-level shared configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationDocument {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub entities: HashMap<String, EntityOverride>,
    /// Keyed by device domain
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub devices: HashMap<String, DomainDefaults>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub areas: HashMap<String, AreaMeta>,
    #[serde(default)]
    pub homepage_header: HomepageHeader,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub more_pages: Vec<MorePage>,
    #[serde(default)]
    pub blueprints: BlueprintLibrary,
}

fn default_true() -> bool {
    true
}

impl Default for HomepageHeader {
    fn default() -> Self {
        Self {
            show_clock: default_true(),
            show_date: default_true(),
            show_weather: false,
            weather_entity: None,
        }
    }
}

/// Read access to the current configuration, provided by whoever owns it
pub trait ConfigSource {
    fn get_configuration(&self) -> ConfigurationDocument;
}

impl ConfigSource for ConfigurationDocument {
    fn get_configuration(&self) -> ConfigurationDocument {
        self.clone()
    }
}

impl ConfigurationDocument {
    pub fn entity(&self, entity_id: &str) -> Option<&EntityOverride> {
        self.entities.get(entity_id)
    }

    /// Override entry for an entity, created on first edit
    pub fn entity_mut(&mut self, entity_id: &str) -> &mut EntityOverride {
        self.entities.entry(entity_id.to_string()).or_default()
    }

    pub fn domain(&self, domain: &str) -> Option<&DomainDefaults> {
        self.devices.get(domain)
    }

    pub fn domain_mut(&mut self, domain: &str) -> &mut DomainDefaults {
        self.devices.entry(domain.to_string()).or_default()
    }

    pub fn area(&self, area_id: &str) -> Option<&AreaMeta> {
        self.areas.get(area_id)
    }

    pub fn area_mut(&mut self, area_id: &str) -> &mut AreaMeta {
        self.areas.entry(area_id.to_string()).or_default()
    }

    /// Load from the document store, falling back to an empty document
    pub fn load(store: &dyn DocumentStore) -> Result<Self> {
        let Some(value) = store
            .load(paths::CONFIG_KEY)
            .context("Failed to read configuration document")?
        else {
            info!("No configuration document found, starting from defaults");
            return Ok(Self::default());
        };

        let mut document: ConfigurationDocument = serde_json::from_value(value)
            .context("Failed to parse configuration document")?;
        document.validate_and_clamp();
        info!(
            entities = document.entities.len(),
            devices = document.devices.len(),
            areas = document.areas.len(),
            blueprints = document.blueprints.len(),
            "Loaded configuration document"
        );
        Ok(document)
    }

    pub fn save(&self, store: &dyn DocumentStore) -> Result<()> {
        let value = serde_json::to_value(self).context("Failed to serialize configuration document")?;
        store
            .save(paths::CONFIG_KEY, &value)
            .context("Failed to write configuration document")
    }

    /// Validate and clamp values to safe ranges
    /// Called after loading; every correction is logged
    pub fn validate_and_clamp(&mut self) {
        for (entity_id, entry) in &mut self.entities {
            entry.spans.clamp(entity_id);
            if entry.friendly_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
                warn!(entity = %entity_id, "empty friendly_name override, dropping");
                entry.friendly_name = None;
            }
        }

        for (area_id, meta) in &mut self.areas {
            for slot in &mut meta.cards {
                slot.spans.clamp(&format!("{area_id}/{}", slot.id));
            }
            if meta.floor.as_deref().is_some_and(|f| f.trim().is_empty()) {
                warn!(area = %area_id, "empty floor name, dropping");
                meta.floor = None;
            }
        }

        self.more_pages.retain(|page| {
            let keep = !page.name.trim().is_empty();
            if !keep {
                warn!("more page without a name, dropping");
            }
            keep
        });
    }
}
