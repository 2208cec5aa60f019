//! Entity visibility classification
//!
//! Partitions entities into exactly one bucket each. Precedence is
//! Disabled > Hidden > NoState > Visible. Entities disabled in the registry
//! have no live state and still belong in the Disabled bucket. The favorite
//! flag is orthogonal and only carried by Visible entities.

use serde::Serialize;

use crate::config::{ConfigurationDocument, EntityOverride};
use crate::registry::{EntityRecord, EntityState, RegistryView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    NoState,
    Disabled,
    Hidden,
    Visible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub visibility: Visibility,
    pub favorite: bool,
}

pub fn classify(
    entity: &EntityRecord,
    state: Option<&EntityState>,
    entry: Option<&EntityOverride>,
) -> Classification {
    let disabled = entry.and_then(|e| e.disabled).unwrap_or(false) || entity.disabled_by.is_some();
    // An explicit dashboard override wins over the registry's hidden flag
    let hidden = entry
        .and_then(|e| e.hidden)
        .unwrap_or(entity.hidden_by.is_some());

    let visibility = if disabled {
        Visibility::Disabled
    } else if hidden {
        Visibility::Hidden
    } else if state.is_none() {
        Visibility::NoState
    } else {
        Visibility::Visible
    };

    Classification {
        visibility,
        favorite: visibility == Visibility::Visible && entry.is_some_and(EntityOverride::is_favorite),
    }
}

/// Entities split by classification, each list in registry order
#[derive(Debug, Default)]
pub struct Buckets<'a> {
    pub no_state: Vec<&'a EntityRecord>,
    pub disabled: Vec<&'a EntityRecord>,
    pub hidden: Vec<&'a EntityRecord>,
    pub visible: Vec<&'a EntityRecord>,
    /// Subset of `visible`
    pub favorites: Vec<&'a EntityRecord>,
}

pub fn entity_ids(list: &[&EntityRecord]) -> Vec<String> {
    list.iter().map(|e| e.entity_id.clone()).collect()
}

pub fn partition<'a>(
    entities: impl IntoIterator<Item = &'a EntityRecord>,
    registry: &RegistryView,
    document: &ConfigurationDocument,
) -> Buckets<'a> {
    let mut buckets = Buckets::default();
    for entity in entities {
        let class = classify(
            entity,
            registry.state(&entity.entity_id),
            document.entity(&entity.entity_id),
        );
        match class.visibility {
            Visibility::NoState => buckets.no_state.push(entity),
            Visibility::Disabled => buckets.disabled.push(entity),
            Visibility::Hidden => buckets.hidden.push(entity),
            Visibility::Visible => buckets.visible.push(entity),
        }
        if class.favorite {
            buckets.favorites.push(entity);
        }
    }
    buckets
}
