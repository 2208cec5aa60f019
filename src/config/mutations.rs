//! Edits behind every mutation verb
//!
//! Each method changes the in-memory document only. Persisting and
//! broadcasting the reload signal is the request handler's job, so a failed
//! edit never reaches the store.

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::document::{
    CardDocument, ConfigurationDocument, EntityOverride, HomepageHeader, MorePage, SlotCard, SpanOverride,
};
use crate::blueprint::{BlueprintDocument, BlueprintType, InstallOutcome};
use crate::error::{EngineError, Result};
use crate::ipc::messages::{ButtonKind, ButtonSettings, ButtonTarget, CardTarget, EntityFlags};
use crate::reorder::{OrderAssignment, SortField};
use crate::resolver::parse_slot_target;

impl CardTarget {
    /// Blueprint type that may be used on this target
    pub fn accepted_blueprint(&self) -> BlueprintType {
        match self {
            CardTarget::Slot { .. } => BlueprintType::Card,
            CardTarget::MorePage { .. } => BlueprintType::Page,
            _ => BlueprintType::ReplaceCard,
        }
    }
}

impl ConfigurationDocument {
    /// Add a slot card to an area page, returning its generated id
    pub fn add_card(&mut self, area_id: &str, card: Value, spans: SpanOverride) -> String {
        let meta = self.area_mut(area_id);
        let id = (meta.cards.len() + 1..)
            .map(|n| format!("card_{n}"))
            .find(|id| meta.cards.iter().all(|slot| &slot.id != id))
            .unwrap_or_default();

        let mut slot = SlotCard {
            id: id.clone(),
            card: CardDocument::plain(card),
            spans,
            sort_order: None,
            grouped_sort_order: None,
        };
        slot.spans.clamp(&id);
        meta.cards.push(slot);
        info!(area = %area_id, card = %id, "Added slot card");
        id
    }

    pub fn remove_card(&mut self, area_id: &str, card_id: &str) -> Result<()> {
        let meta = self
            .areas
            .get_mut(area_id)
            .ok_or_else(|| EngineError::UnknownTarget(format!("area {area_id}")))?;
        let before = meta.cards.len();
        meta.cards.retain(|slot| slot.id != card_id);
        if meta.cards.len() == before {
            return Err(EngineError::UnknownTarget(format!("card {card_id} in area {area_id}")));
        }
        info!(area = %area_id, card = %card_id, "Removed slot card");
        Ok(())
    }

    /// Store a card document at `target`; `None` reverts to the cascade default
    pub fn set_card(&mut self, target: &CardTarget, document: Option<CardDocument>) -> Result<()> {
        let custom = document.is_some();
        match target {
            CardTarget::Entity { entity_id } => {
                let entry = self.entity_mut(entity_id);
                entry.card = document;
                entry.custom_card = Some(custom);
            }
            CardTarget::EntityPopup { entity_id } => {
                let entry = self.entity_mut(entity_id);
                entry.popup = document;
                entry.custom_popup = Some(custom);
            }
            CardTarget::Domain { domain } => self.domain_mut(domain).card = document,
            CardTarget::DomainPopup { domain } => self.domain_mut(domain).popup = document,
            CardTarget::Slot { area_id, card_id } => match document {
                Some(card) => {
                    let meta = self.area_mut(area_id);
                    match meta.cards.iter_mut().find(|slot| &slot.id == card_id) {
                        Some(slot) => slot.card = card,
                        None => meta.cards.push(SlotCard {
                            id: card_id.clone(),
                            card,
                            spans: SpanOverride::default(),
                            sort_order: None,
                            grouped_sort_order: None,
                        }),
                    }
                }
                None => self.remove_card(area_id, card_id)?,
            },
            CardTarget::MorePage { name } => match document {
                Some(card) => match self.more_pages.iter_mut().find(|page| &page.name == name) {
                    Some(page) => page.card = card,
                    None => self.more_pages.push(MorePage {
                        name: name.clone(),
                        icon: None,
                        card,
                    }),
                },
                None => self.remove_more_page(name)?,
            },
        }
        debug!(card_target = ?target, custom, "Card document updated");
        Ok(())
    }

    pub fn edit_entity(&mut self, entity_id: &str, flags: &EntityFlags) {
        let entry = self.entity_mut(entity_id);
        if let Some(name) = &flags.friendly_name {
            entry.friendly_name = (!name.trim().is_empty()).then(|| name.clone());
        }
        let toggles = [
            (&mut entry.hidden, flags.hidden),
            (&mut entry.disabled, flags.disabled),
            (&mut entry.favorite, flags.favorite),
            (&mut entry.custom_card, flags.custom_card),
            (&mut entry.custom_popup, flags.custom_popup),
        ];
        for (field, value) in toggles {
            if value.is_some() {
                *field = value;
            }
        }
        entry.spans.merge(&flags.spans);
        entry.spans.clamp(entity_id);
    }

    pub fn edit_button(&mut self, target: &ButtonTarget, settings: &ButtonSettings) {
        match target.kind {
            ButtonKind::Area => {
                let meta = self.area_mut(&target.id);
                if let Some(icon) = &settings.icon {
                    meta.icon = Some(icon.clone());
                }
                if let Some(floor) = &settings.floor {
                    meta.floor = (!floor.trim().is_empty()).then(|| floor.clone());
                }
                if settings.hidden.is_some() {
                    meta.hidden = settings.hidden;
                }
                if settings.show_in_navbar.is_some() {
                    debug!(area = %target.id, "show_in_navbar ignored for area buttons");
                }
            }
            ButtonKind::Device => {
                let defaults = self.domain_mut(&target.id);
                if let Some(icon) = &settings.icon {
                    defaults.icon = Some(icon.clone());
                }
                if settings.show_in_navbar.is_some() {
                    defaults.show_in_navbar = settings.show_in_navbar;
                }
                if settings.floor.is_some() || settings.hidden.is_some() {
                    debug!(domain = %target.id, "floor/hidden ignored for device buttons");
                }
            }
        }
    }

    /// Persist button order; assignments outside the list keep their value
    pub fn sort_buttons(&mut self, button: ButtonKind, field: SortField, assignments: &[OrderAssignment]) -> Result<()> {
        for assignment in assignments {
            let index = Some(assignment.new_index);
            match (button, field) {
                (ButtonKind::Area, SortField::SortOrder) => self.area_mut(&assignment.id).sort_order = index,
                (ButtonKind::Area, SortField::FloorSortOrder) => {
                    self.area_mut(&assignment.id).floor_sort_order = index
                }
                (ButtonKind::Device, SortField::SortOrder) => self.domain_mut(&assignment.id).sort_order = index,
                _ => {
                    return Err(EngineError::InvalidGesture(format!(
                        "{field:?} does not apply to {button:?} buttons"
                    )));
                }
            }
        }
        info!(button = ?button, field = ?field, count = assignments.len(), "Buttons reordered");
        Ok(())
    }

    /// Persist entity order; slot card ids (`slot:<area>:<card>`) update the slot
    pub fn sort_entities(&mut self, field: SortField, assignments: &[OrderAssignment]) -> Result<()> {
        let select: fn(&mut EntityOverride) -> &mut Option<u32> = match field {
            SortField::SortOrder => |entry| &mut entry.sort_order,
            SortField::GroupedSortOrder => |entry| &mut entry.grouped_sort_order,
            SortField::DeviceSortOrder => |entry| &mut entry.device_sort_order,
            SortField::DeviceGroupedSortOrder => |entry| &mut entry.device_grouped_sort_order,
            SortField::FloorSortOrder => {
                return Err(EngineError::InvalidGesture("floor order only applies to area buttons".into()));
            }
        };

        for assignment in assignments {
            let index = Some(assignment.new_index);
            if let Some((area_id, card_id)) = parse_slot_target(&assignment.id) {
                let slot = self
                    .areas
                    .get_mut(area_id)
                    .and_then(|meta| meta.cards.iter_mut().find(|slot| slot.id == card_id))
                    .ok_or_else(|| EngineError::UnknownTarget(assignment.id.clone()))?;
                let slot_field = slot
                    .sort_field_mut(field)
                    .ok_or_else(|| EngineError::InvalidGesture(format!("{field:?} does not apply to slot cards")))?;
                *slot_field = index;
                continue;
            }

            *select(self.entity_mut(&assignment.id)) = index;
        }
        info!(field = ?field, count = assignments.len(), "Entities reordered");
        Ok(())
    }

    pub fn install_blueprint(&mut self, document: BlueprintDocument) -> Result<InstallOutcome> {
        self.blueprints.install(document)
    }

    /// Store a snapshot of the blueprint template on `target`
    pub fn use_blueprint(&mut self, name: &str, target: &CardTarget, inputs: Map<String, Value>) -> Result<()> {
        let blueprint = self.blueprints.require(name, target.accepted_blueprint())?;
        let document = CardDocument {
            card: blueprint.card.clone(),
            blueprint: Some(name.to_string()),
            inputs,
        };
        self.set_card(target, Some(document))?;
        info!(blueprint = %name, card_target = ?target, "Blueprint applied");
        Ok(())
    }

    /// Remove a blueprint; cards made from it keep their stored snapshot
    pub fn delete_blueprint(&mut self, name: &str) -> Result<()> {
        self.blueprints.delete(name).map(|_| ())
    }

    pub fn set_homepage_header(&mut self, header: HomepageHeader) {
        self.homepage_header = header;
    }

    pub fn remove_more_page(&mut self, name: &str) -> Result<()> {
        let before = self.more_pages.len();
        self.more_pages.retain(|page| page.name != name);
        if self.more_pages.len() == before {
            return Err(EngineError::UnknownTarget(format!("more page {name}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::messages::ConfigRequest;
    use serde_json::json;

    fn blueprint(name: &str, kind: &str) -> BlueprintDocument {
        serde_json::from_value(json!({
            "blueprint": {"name": name, "version": "1", "type": kind},
            "card": {"type": "tile", "entity": "$replace_with_input_entity$"}
        }))
        .unwrap()
    }

    fn assignments(ids: &[&str]) -> Vec<OrderAssignment> {
        ids.iter()
            .zip(0u32..)
            .map(|(id, new_index)| OrderAssignment {
                id: id.to_string(),
                new_index,
            })
            .collect()
    }

    #[test]
    fn test_add_and_remove_card() {
        let mut doc = ConfigurationDocument::default();
        let first = doc.add_card("kitchen", json!({"type": "markdown"}), SpanOverride::default());
        let second = doc.add_card("kitchen", json!({"type": "markdown"}), SpanOverride::default());
        assert_ne!(first, second);

        doc.remove_card("kitchen", &first).unwrap();
        let third = doc.add_card("kitchen", json!({"type": "tile"}), SpanOverride::default());
        let ids: Vec<_> = doc.area("kitchen").unwrap().cards.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&second) && ids.contains(&third));

        assert!(matches!(doc.remove_card("kitchen", "nope"), Err(EngineError::UnknownTarget(_))));
        assert!(matches!(doc.remove_card("attic", &second), Err(EngineError::UnknownTarget(_))));
    }

    #[test]
    fn test_added_card_spans_clamped() {
        let mut doc = ConfigurationDocument::default();
        let spans = SpanOverride {
            col_span: Some(12),
            ..Default::default()
        };
        doc.add_card("kitchen", json!({}), spans);
        assert_eq!(doc.area("kitchen").unwrap().cards[0].spans.col_span, Some(4));
    }

    #[test]
    fn test_edit_card_sets_and_clears_custom_flag() {
        let mut doc = ConfigurationDocument::default();
        let target = CardTarget::Entity {
            entity_id: "light.kitchen".into(),
        };
        doc.set_card(&target, Some(CardDocument::plain(json!({"type": "tile"}))))
            .unwrap();
        let entry = doc.entity("light.kitchen").unwrap();
        assert_eq!(entry.custom_card, Some(true));
        assert!(entry.card.is_some());

        doc.set_card(&target, None).unwrap();
        let entry = doc.entity("light.kitchen").unwrap();
        assert_eq!(entry.custom_card, Some(false));
        assert!(entry.card.is_none());
    }

    #[test]
    fn test_edit_entity_flags() {
        let mut doc = ConfigurationDocument::default();
        let flags = EntityFlags {
            friendly_name: Some("Hob".into()),
            favorite: Some(true),
            spans: SpanOverride {
                row_span: Some(7),
                ..Default::default()
            },
            ..Default::default()
        };
        doc.edit_entity("light.hob", &flags);
        doc.edit_entity(
            "light.hob",
            &EntityFlags {
                hidden: Some(false),
                ..Default::default()
            },
        );

        let entry = doc.entity("light.hob").unwrap();
        assert_eq!(entry.friendly_name.as_deref(), Some("Hob"));
        assert_eq!(entry.favorite, Some(true));
        assert_eq!(entry.hidden, Some(false));
        assert_eq!(entry.spans.row_span, Some(4));

        doc.edit_entity(
            "light.hob",
            &EntityFlags {
                friendly_name: Some(String::new()),
                ..Default::default()
            },
        );
        assert_eq!(doc.entity("light.hob").unwrap().friendly_name, None);
    }

    #[test]
    fn test_edit_entity_request_with_wide_span_is_clamped() {
        let request: ConfigRequest = serde_json::from_value(json!({
            "EditEntity": {"entity_id": "light.hob", "flags": {"col_span": 1000, "favorite": true}}
        }))
        .unwrap();
        let ConfigRequest::EditEntity { entity_id, flags } = request else {
            panic!("unexpected request {request:?}");
        };

        let mut doc = ConfigurationDocument::default();
        doc.edit_entity(&entity_id, &flags);
        let entry = doc.entity("light.hob").unwrap();
        assert_eq!(entry.spans.col_span, Some(4));
        assert_eq!(entry.favorite, Some(true));
    }

    #[test]
    fn test_edit_button() {
        let mut doc = ConfigurationDocument::default();
        let area = ButtonTarget {
            kind: ButtonKind::Area,
            id: "kitchen".into(),
        };
        doc.edit_button(
            &area,
            &ButtonSettings {
                floor: Some("Ground".into()),
                icon: Some("mdi:fridge".into()),
                ..Default::default()
            },
        );
        assert_eq!(doc.area("kitchen").unwrap().floor.as_deref(), Some("Ground"));

        doc.edit_button(
            &area,
            &ButtonSettings {
                floor: Some(String::new()),
                ..Default::default()
            },
        );
        assert_eq!(doc.area("kitchen").unwrap().floor, None);
        assert_eq!(doc.area("kitchen").unwrap().icon.as_deref(), Some("mdi:fridge"));

        let device = ButtonTarget {
            kind: ButtonKind::Device,
            id: "light".into(),
        };
        doc.edit_button(
            &device,
            &ButtonSettings {
                show_in_navbar: Some(true),
                ..Default::default()
            },
        );
        assert_eq!(doc.domain("light").unwrap().show_in_navbar, Some(true));
    }

    #[test]
    fn test_sort_entities_writes_requested_field_only() {
        let mut doc = ConfigurationDocument::default();
        doc.sort_entities(SortField::DeviceSortOrder, &assignments(&["light.a", "light.b"]))
            .unwrap();
        let entry = doc.entity("light.b").unwrap();
        assert_eq!(entry.device_sort_order, Some(1));
        assert_eq!(entry.sort_order, None);

        assert!(doc.sort_entities(SortField::FloorSortOrder, &[]).is_err());
    }

    #[test]
    fn test_sort_entities_updates_slot_cards() {
        let mut doc = ConfigurationDocument::default();
        let id = doc.add_card("kitchen", json!({}), SpanOverride::default());
        let slot_id = format!("slot:kitchen:{id}");
        doc.sort_entities(SortField::SortOrder, &assignments(&["light.a", slot_id.as_str()]))
            .unwrap();
        assert_eq!(doc.area("kitchen").unwrap().cards[0].sort_order, Some(1));

        let missing = doc.sort_entities(SortField::SortOrder, &assignments(&["slot:kitchen:card_9"]));
        assert!(matches!(missing, Err(EngineError::UnknownTarget(_))));
    }

    #[test]
    fn test_grouped_slot_sort_leaves_flat_order() {
        let mut doc = ConfigurationDocument::default();
        let first = format!("slot:kitchen:{}", doc.add_card("kitchen", json!({}), SpanOverride::default()));
        let second = format!("slot:kitchen:{}", doc.add_card("kitchen", json!({}), SpanOverride::default()));
        doc.sort_entities(SortField::SortOrder, &assignments(&[first.as_str(), second.as_str()]))
            .unwrap();

        doc.sort_entities(SortField::GroupedSortOrder, &assignments(&[second.as_str(), first.as_str()]))
            .unwrap();
        let cards = &doc.area("kitchen").unwrap().cards;
        assert_eq!((cards[0].sort_order, cards[0].grouped_sort_order), (Some(0), Some(1)));
        assert_eq!((cards[1].sort_order, cards[1].grouped_sort_order), (Some(1), Some(0)));

        let device = doc.sort_entities(SortField::DeviceSortOrder, &assignments(&[first.as_str()]));
        assert!(matches!(device, Err(EngineError::InvalidGesture(_))));
    }

    #[test]
    fn test_sort_buttons() {
        let mut doc = ConfigurationDocument::default();
        doc.sort_buttons(ButtonKind::Area, SortField::FloorSortOrder, &assignments(&["b", "a"]))
            .unwrap();
        assert_eq!(doc.area("a").unwrap().floor_sort_order, Some(1));
        assert_eq!(doc.area("a").unwrap().sort_order, None);

        doc.sort_buttons(ButtonKind::Device, SortField::SortOrder, &assignments(&["cover", "light"]))
            .unwrap();
        assert_eq!(doc.domain("light").unwrap().sort_order, Some(1));

        let wrong = doc.sort_buttons(ButtonKind::Device, SortField::FloorSortOrder, &assignments(&["x"]));
        assert!(matches!(wrong, Err(EngineError::InvalidGesture(_))));
    }

    #[test]
    fn test_use_blueprint_snapshots_template() {
        let mut doc = ConfigurationDocument::default();
        doc.install_blueprint(blueprint("Fan", "replace-card")).unwrap();
        let target = CardTarget::Entity {
            entity_id: "switch.fan".into(),
        };
        let mut inputs = Map::new();
        inputs.insert("icon".into(), json!("mdi:fan"));
        doc.use_blueprint("Fan", &target, inputs).unwrap();

        let entry = doc.entity("switch.fan").unwrap();
        assert_eq!(entry.custom_card, Some(true));
        let card = entry.card.as_ref().unwrap();
        assert_eq!(card.blueprint.as_deref(), Some("Fan"));
        assert_eq!(card.card["entity"], "$replace_with_input_entity$");
        assert_eq!(card.inputs["icon"], "mdi:fan");

        doc.delete_blueprint("Fan").unwrap();
        assert!(doc.entity("switch.fan").unwrap().card.is_some());
    }

    #[test]
    fn test_use_blueprint_type_checked_against_target() {
        let mut doc = ConfigurationDocument::default();
        doc.install_blueprint(blueprint("Stack", "card")).unwrap();
        doc.install_blueprint(blueprint("Energy", "page")).unwrap();

        let entity = CardTarget::Entity {
            entity_id: "light.a".into(),
        };
        assert!(matches!(
            doc.use_blueprint("Stack", &entity, Map::new()),
            Err(EngineError::BlueprintTypeMismatch { .. })
        ));

        let slot = CardTarget::Slot {
            area_id: "kitchen".into(),
            card_id: "card_1".into(),
        };
        doc.use_blueprint("Stack", &slot, Map::new()).unwrap();
        assert_eq!(doc.area("kitchen").unwrap().cards.len(), 1);

        let page = CardTarget::MorePage { name: "Energy".into() };
        doc.use_blueprint("Energy", &page, Map::new()).unwrap();
        assert_eq!(doc.more_pages.len(), 1);
        doc.remove_more_page("Energy").unwrap();
        assert!(doc.more_pages.is_empty());

        assert!(matches!(
            doc.use_blueprint("Missing", &page, Map::new()),
            Err(EngineError::UnknownBlueprint(_))
        ));
    }
}
