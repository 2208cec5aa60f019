//! Card configuration resolution
//!
//! Turns registry records plus configuration into renderable card specs.
//! Card content cascades, first match wins:
//!
//! 1. the entity's own card document, when `custom_card` is set
//! 2. the default card of the entity's domain
//! 3. the built-in card of the domain capability
//!
//! Popups cascade the same way. Spans are resolved per field independently
//! of card content. Nothing here has side effects; turning a spec into an
//! element is the renderer's job.

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{error, warn};

use crate::blueprint::{BlueprintLibrary, TemplateContext, render, render_stored};
use crate::config::{
    AreaMeta, CardDocument, ConfigurationDocument, DomainDefaults, EntityOverride, MorePage,
    SlotCard, SortContext, SpanOverride,
};
use crate::constants::{cards, groups, sorting, spans, tokens};
use crate::domain::DomainCapability;
use crate::error::{EngineError, Result};
use crate::registry::{AreaRecord, EntityRecord, EntityState, RegistryView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    Default,
    Large,
    ExtraLarge,
}

/// Resolved row/column spans at every breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Spans {
    pub row_span: u8,
    pub row_span_lg: u8,
    pub row_span_xl: u8,
    pub col_span: u8,
    pub col_span_lg: u8,
    pub col_span_xl: u8,
}

impl Spans {
    pub fn uniform(span: u8) -> Self {
        Self {
            row_span: span,
            row_span_lg: span,
            row_span_xl: span,
            col_span: span,
            col_span_lg: span,
            col_span_xl: span,
        }
    }

    /// Explicit override per field, else `default`
    pub fn resolve(default: u8, overrides: Option<&SpanOverride>) -> Self {
        let o = overrides.copied().unwrap_or_default();
        Self {
            row_span: o.row_span.unwrap_or(default),
            row_span_lg: o.row_span_lg.unwrap_or(default),
            row_span_xl: o.row_span_xl.unwrap_or(default),
            col_span: o.col_span.unwrap_or(default),
            col_span_lg: o.col_span_lg.unwrap_or(default),
            col_span_xl: o.col_span_xl.unwrap_or(default),
        }
    }

    pub fn row(&self, breakpoint: Breakpoint) -> u8 {
        match breakpoint {
            Breakpoint::Default => self.row_span,
            Breakpoint::Large => self.row_span_lg,
            Breakpoint::ExtraLarge => self.row_span_xl,
        }
    }

    pub fn col(&self, breakpoint: Breakpoint) -> u8 {
        match breakpoint {
            Breakpoint::Default => self.col_span,
            Breakpoint::Large => self.col_span_lg,
            Breakpoint::ExtraLarge => self.col_span_xl,
        }
    }
}

/// One resolved, renderable card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedCardSpec {
    pub target_id: String,
    pub card_config: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup_config: Option<Value>,
    #[serde(flatten)]
    pub spans: Spans,
    pub sort_order: u32,
    pub grouped_sort_order: u32,
    pub is_favorite: bool,
    pub custom_card: bool,
    pub custom_popup: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardKind {
    Card,
    Popup,
}

impl CardKind {
    fn own<'a>(self, entry: &'a EntityOverride) -> (bool, Option<&'a CardDocument>) {
        match self {
            CardKind::Card => (entry.custom_card.unwrap_or(false), entry.card.as_ref()),
            CardKind::Popup => (entry.custom_popup.unwrap_or(false), entry.popup.as_ref()),
        }
    }

    fn domain_default(self, defaults: &DomainDefaults) -> Option<&CardDocument> {
        match self {
            CardKind::Card => defaults.card.as_ref(),
            CardKind::Popup => defaults.popup.as_ref(),
        }
    }
}

/// Target id of a slot card on an area page
pub fn slot_target_id(area_id: &str, card_id: &str) -> String {
    format!("{}{area_id}:{card_id}", groups::SLOT_TARGET_PREFIX)
}

/// Inverse of [`slot_target_id`]: `(area_id, card_id)`
pub fn parse_slot_target(target_id: &str) -> Option<(&str, &str)> {
    target_id
        .strip_prefix(groups::SLOT_TARGET_PREFIX)
        .and_then(|rest| rest.split_once(':'))
}

/// Display name: override > live state > registry name > integration name > object id
pub fn entity_name(entity: &EntityRecord, state: Option<&EntityState>, entry: Option<&EntityOverride>) -> String {
    entry
        .and_then(|e| e.friendly_name.as_deref())
        .or_else(|| state.and_then(EntityState::friendly_name))
        .or(entity.name.as_deref())
        .or(entity.original_name.as_deref())
        .unwrap_or_else(|| entity.object_id())
        .to_string()
}

pub struct CardConfigResolver<'a> {
    blueprints: &'a BlueprintLibrary,
}

impl<'a> CardConfigResolver<'a> {
    pub fn new(blueprints: &'a BlueprintLibrary) -> Self {
        Self { blueprints }
    }

    pub fn resolve_entity_card(
        &self,
        entity: &EntityRecord,
        name: &str,
        entry: Option<&EntityOverride>,
        defaults: Option<&DomainDefaults>,
    ) -> Value {
        self.cascade(CardKind::Card, entity, name, entry, defaults)
    }

    pub fn resolve_entity_popup(
        &self,
        entity: &EntityRecord,
        name: &str,
        entry: Option<&EntityOverride>,
        defaults: Option<&DomainDefaults>,
    ) -> Value {
        self.cascade(CardKind::Popup, entity, name, entry, defaults)
    }

    fn cascade(
        &self,
        kind: CardKind,
        entity: &EntityRecord,
        name: &str,
        entry: Option<&EntityOverride>,
        defaults: Option<&DomainDefaults>,
    ) -> Value {
        let context = TemplateContext {
            input_entity: &entity.entity_id,
            input_name: name,
        };

        if let Some(entry) = entry
            && let (true, Some(document)) = kind.own(entry)
        {
            return self.render_document(document, &context, &entity.entity_id);
        }

        if let Some(document) = defaults.and_then(|d| kind.domain_default(d)) {
            return self.render_document(document, &context, &entity.entity_id);
        }

        let capability = DomainCapability::from_domain(entity.domain());
        match kind {
            CardKind::Card => capability.default_card(&entity.entity_id, name),
            CardKind::Popup => capability.default_popup(&entity.entity_id, name),
        }
    }

    /// Render a card document, isolating failures to this one card
    pub fn render_document(&self, document: &CardDocument, context: &TemplateContext, target: &str) -> Value {
        match self.try_render(document, context, target) {
            Ok(card) => card,
            Err(e) => {
                error!(card = %target, error = %e, "Card failed to render, showing error placeholder");
                json!({
                    "type": cards::ERROR_CARD,
                    "error": e.to_string(),
                    "origin_config": document.card,
                })
            }
        }
    }

    fn try_render(&self, document: &CardDocument, context: &TemplateContext, target: &str) -> Result<Value> {
        let inputs = merged_inputs(&document.inputs, context);
        let Some(blueprint) = document.blueprint.as_deref() else {
            let card = parse_stored(&document.card, target)?;
            return Ok(render(&card, &inputs, context));
        };

        match self.blueprints.get(blueprint) {
            Some(installed) => render_stored(&installed.card, &inputs, context, target),
            None => {
                warn!(card = %target, blueprint = %blueprint, "Blueprint no longer installed, rendering stored template as-is");
                parse_stored(&document.card, target)
            }
        }
    }

    pub fn resolve_entity(
        &self,
        entity: &EntityRecord,
        registry: &RegistryView,
        document: &ConfigurationDocument,
        context: SortContext,
    ) -> ResolvedCardSpec {
        let entry = document.entity(&entity.entity_id);
        let defaults = document.domain(entity.domain());
        let name = entity_name(entity, registry.state(&entity.entity_id), entry);
        let capability = DomainCapability::from_domain(entity.domain());
        let (sort_order, grouped_sort_order) = entry.map(|e| e.sort_orders(context)).unwrap_or_default();

        ResolvedCardSpec {
            target_id: entity.entity_id.clone(),
            card_config: self.resolve_entity_card(entity, &name, entry, defaults),
            popup_config: Some(self.resolve_entity_popup(entity, &name, entry, defaults)),
            spans: Spans::resolve(capability.default_span(), entry.map(|e| &e.spans)),
            sort_order: sort_order.unwrap_or(sorting::DEFAULT_SORT_ORDER),
            grouped_sort_order: grouped_sort_order.unwrap_or(sorting::DEFAULT_SORT_ORDER),
            is_favorite: entry.is_some_and(EntityOverride::is_favorite),
            custom_card: entry.and_then(|e| e.custom_card).unwrap_or(false),
            custom_popup: entry.and_then(|e| e.custom_popup).unwrap_or(false),
            group_key: None,
        }
    }

    pub fn resolve_area_button(&self, area: &AreaRecord, meta: Option<&AreaMeta>, entity_count: usize) -> ResolvedCardSpec {
        let mut card = json!({
            "type": cards::AREA_BUTTON,
            "area": area.area_id,
            "name": area.name,
            "icon": meta.and_then(|m| m.icon.as_deref()).unwrap_or(cards::AREA_ICON),
            "entities": entity_count,
        });
        if let Some(picture) = &area.picture {
            card["picture"] = json!(picture);
        }

        ResolvedCardSpec {
            target_id: area.area_id.clone(),
            card_config: card,
            popup_config: None,
            spans: Spans::uniform(spans::DEFAULT_SPAN),
            sort_order: meta.and_then(|m| m.sort_order).unwrap_or(sorting::DEFAULT_SORT_ORDER),
            grouped_sort_order: meta
                .and_then(|m| m.floor_sort_order)
                .unwrap_or(sorting::DEFAULT_SORT_ORDER),
            is_favorite: false,
            custom_card: false,
            custom_popup: false,
            group_key: meta.and_then(|m| m.floor.clone()),
        }
    }

    pub fn resolve_domain_button(&self, domain: &str, defaults: Option<&DomainDefaults>, entity_count: usize) -> ResolvedCardSpec {
        let capability = DomainCapability::from_domain(domain);
        let sort_order = defaults
            .and_then(|d| d.sort_order)
            .unwrap_or(sorting::DEFAULT_SORT_ORDER);

        ResolvedCardSpec {
            target_id: domain.to_string(),
            card_config: json!({
                "type": cards::DEVICE_BUTTON,
                "domain": domain,
                "icon": defaults
                    .and_then(|d| d.icon.as_deref())
                    .unwrap_or(capability.icon_set().active),
                "entities": entity_count,
                "show_in_navbar": defaults.and_then(|d| d.show_in_navbar).unwrap_or(false),
            }),
            popup_config: None,
            spans: Spans::uniform(spans::DEFAULT_SPAN),
            sort_order,
            grouped_sort_order: sort_order,
            is_favorite: false,
            custom_card: defaults.is_some_and(|d| d.card.is_some()),
            custom_popup: defaults.is_some_and(|d| d.popup.is_some()),
            group_key: None,
        }
    }

    /// Slot cards see the area as their input entity
    pub fn resolve_slot_card(&self, area: &AreaRecord, slot: &SlotCard) -> ResolvedCardSpec {
        let target_id = slot_target_id(&area.area_id, &slot.id);
        let context = TemplateContext {
            input_entity: &area.area_id,
            input_name: &area.name,
        };
        ResolvedCardSpec {
            card_config: self.render_document(&slot.card, &context, &target_id),
            target_id,
            popup_config: None,
            spans: Spans::resolve(spans::DEFAULT_SPAN, Some(&slot.spans)),
            sort_order: slot.sort_order.unwrap_or(sorting::DEFAULT_SORT_ORDER),
            grouped_sort_order: slot.grouped_sort_order.unwrap_or(sorting::DEFAULT_SORT_ORDER),
            is_favorite: false,
            custom_card: true,
            custom_popup: false,
            group_key: Some(groups::CUSTOM_SLOTS.to_string()),
        }
    }

    pub fn resolve_more_page(&self, page: &MorePage) -> Value {
        let context = TemplateContext {
            input_entity: "",
            input_name: &page.name,
        };
        self.render_document(&page.card, &context, &page.name)
    }
}

/// Stored card content as-is; a JSON string holds card text
fn parse_stored(card: &Value, target: &str) -> Result<Value> {
    match card {
        Value::String(text) => serde_json::from_str(text).map_err(|e| EngineError::TemplateParse {
            target: target.to_string(),
            reason: e.to_string(),
        }),
        other => Ok(other.clone()),
    }
}

/// Blueprint inputs plus `input_entity` / `input_name`; explicit inputs win
fn merged_inputs(inputs: &Map<String, Value>, context: &TemplateContext) -> Map<String, Value> {
    let mut merged = inputs.clone();
    merged
        .entry(tokens::INPUT_ENTITY_KEY)
        .or_insert_with(|| json!(context.input_entity));
    merged
        .entry(tokens::INPUT_NAME_KEY)
        .or_insert_with(|| json!(context.input_name));
    merged
}
