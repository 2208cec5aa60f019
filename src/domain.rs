//! Built-in per-domain capabilities
//!
//! Every domain-specific default (card, popup, span, icons) lives in one
//! table indexed by [`DomainCapability`]. Domains without a dedicated entry
//! use [`DomainCapability::Generic`].

use serde_json::{Value, json};

use crate::constants::{cards, spans};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainCapability {
    Camera,
    Climate,
    Cover,
    Light,
    Generic,
}

/// Icons for the two coarse states of a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconSet {
    pub active: &'static str,
    pub inactive: &'static str,
}

impl DomainCapability {
    pub fn from_domain(domain: &str) -> Self {
        match domain {
            "camera" => DomainCapability::Camera,
            "climate" => DomainCapability::Climate,
            "cover" => DomainCapability::Cover,
            "light" => DomainCapability::Light,
            _ => DomainCapability::Generic,
        }
    }

    pub fn card_type(self) -> &'static str {
        match self {
            DomainCapability::Camera => cards::CAMERA_CARD,
            DomainCapability::Climate => cards::CLIMATE_CARD,
            DomainCapability::Cover => cards::COVER_CARD,
            DomainCapability::Light => cards::LIGHT_CARD,
            DomainCapability::Generic => cards::ENTITY_CARD,
        }
    }

    pub fn popup_type(self) -> &'static str {
        match self {
            DomainCapability::Camera => cards::CAMERA_POPUP,
            DomainCapability::Climate => cards::CLIMATE_POPUP,
            DomainCapability::Cover => cards::COVER_POPUP,
            DomainCapability::Light => cards::LIGHT_POPUP,
            DomainCapability::Generic => cards::ENTITY_POPUP,
        }
    }

    /// Built-in card for an entity of this domain
    pub fn default_card(self, entity_id: &str, friendly_name: &str) -> Value {
        let mut card = json!({
            "type": self.card_type(),
            "entity": entity_id,
            "friendly_name": friendly_name,
        });
        if self == DomainCapability::Camera {
            card["camera_view"] = json!(cards::CAMERA_VIEW_LIVE);
        }
        card
    }

    /// Built-in popup for an entity of this domain
    pub fn default_popup(self, entity_id: &str, friendly_name: &str) -> Value {
        json!({
            "type": self.popup_type(),
            "entity": entity_id,
            "friendly_name": friendly_name,
        })
    }

    /// Span applied at every breakpoint when the user set none
    pub fn default_span(self) -> u8 {
        match self {
            DomainCapability::Camera => spans::CAMERA_SPAN,
            _ => spans::DEFAULT_SPAN,
        }
    }

    pub fn icon_set(self) -> IconSet {
        match self {
            DomainCapability::Camera => IconSet {
                active: "mdi:cctv",
                inactive: "mdi:cctv-off",
            },
            DomainCapability::Climate => IconSet {
                active: "mdi:thermostat",
                inactive: "mdi:thermostat-off",
            },
            DomainCapability::Cover => IconSet {
                active: "mdi:window-shutter-open",
                inactive: "mdi:window-shutter",
            },
            DomainCapability::Light => IconSet {
                active: "mdi:lightbulb-on",
                inactive: "mdi:lightbulb",
            },
            DomainCapability::Generic => IconSet {
                active: "mdi:checkbox-marked-circle",
                inactive: "mdi:checkbox-blank-circle-outline",
            },
        }
    }

    /// Icon for a live state string
    pub fn icon_for_state(self, state: Option<&str>) -> &'static str {
        let icons = self.icon_set();
        match state {
            Some("on" | "open" | "opening" | "heat" | "cool" | "heat_cool" | "auto" | "streaming" | "recording") => {
                icons.active
            }
            _ => icons.inactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_domain() {
        assert_eq!(DomainCapability::from_domain("camera"), DomainCapability::Camera);
        assert_eq!(DomainCapability::from_domain("light"), DomainCapability::Light);
        assert_eq!(DomainCapability::from_domain("sensor"), DomainCapability::Generic);
        assert_eq!(DomainCapability::from_domain(""), DomainCapability::Generic);
    }

    #[test]
    fn test_camera_card_is_live_picture_entity() {
        let card = DomainCapability::Camera.default_card("camera.porch", "porch");
        assert_eq!(card["type"], "picture-entity");
        assert_eq!(card["camera_view"], "live");
        assert_eq!(card["entity"], "camera.porch");
    }

    #[test]
    fn test_light_card_shape() {
        let card = DomainCapability::Light.default_card("light.kitchen", "kitchen");
        assert_eq!(
            card,
            json!({"type": cards::LIGHT_CARD, "entity": "light.kitchen", "friendly_name": "kitchen"})
        );
    }

    #[test]
    fn test_default_spans() {
        assert_eq!(DomainCapability::Camera.default_span(), 2);
        assert_eq!(DomainCapability::Light.default_span(), 1);
        assert_eq!(DomainCapability::Generic.default_span(), 1);
    }

    #[test]
    fn test_icon_for_state() {
        assert_eq!(DomainCapability::Light.icon_for_state(Some("on")), "mdi:lightbulb-on");
        assert_eq!(DomainCapability::Light.icon_for_state(Some("off")), "mdi:lightbulb");
        assert_eq!(DomainCapability::Cover.icon_for_state(None), "mdi:window-shutter");
    }
}
