//! Resolution engine
//!
//! One pass takes a registry snapshot and a copy of the configuration
//! document, classifies every entity, resolves the cards of the requested
//! view and orders them. Passes are pure; publishing them goes through
//! [`Dashboard`], which drops any pass older than the one already shown.

use anyhow::{Result, bail};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{ConfigSource, ConfigurationDocument, GroupingAxis, SortContext, ViewPreferences};
use crate::ipc::{ButtonKind, ConfigRequest};
use crate::ordering::{self, GroupOrdering, GroupingMode, OrderedGroup};
use crate::registry::{EntityRecord, Registry, RegistryView};
use crate::reorder::{self, DragGesture, SortField};
use crate::resolver::{CardConfigResolver, ResolvedCardSpec};
use crate::visibility::{self, Buckets};

/// Dashboard views the engine can resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// One button per area
    AreaOverview,
    /// One button per device domain
    DeviceOverview,
    /// Entity cards of one area plus its slot cards
    Area(String),
    /// Entity cards of one device domain
    Device(String),
    Favorites,
}

impl FromStr for View {
    type Err = anyhow::Error;

    /// `areas`, `devices`, `favorites`, `area:<area_id>` or `device:<domain>`
    fn from_str(text: &str) -> Result<Self> {
        match text {
            "areas" => Ok(View::AreaOverview),
            "devices" => Ok(View::DeviceOverview),
            "favorites" => Ok(View::Favorites),
            _ => match text.split_once(':') {
                Some(("area", id)) if !id.is_empty() => Ok(View::Area(id.to_string())),
                Some(("device", domain)) if !domain.is_empty() => Ok(View::Device(domain.to_string())),
                _ => bail!("Unknown view '{text}' (expected areas, devices, favorites, area:<id> or device:<domain>)"),
            },
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::AreaOverview => write!(f, "areas"),
            View::DeviceOverview => write!(f, "devices"),
            View::Area(id) => write!(f, "area:{id}"),
            View::Device(domain) => write!(f, "device:{domain}"),
            View::Favorites => write!(f, "favorites"),
        }
    }
}

impl View {
    /// Grouping toggle that applies to this view, if it can be grouped at all
    pub fn grouping_axis(&self) -> Option<GroupingAxis> {
        match self {
            View::AreaOverview => Some(GroupingAxis::AreaOverview),
            View::Area(_) | View::Device(_) | View::Favorites => Some(GroupingAxis::EntityListing),
            View::DeviceOverview => None,
        }
    }

    pub fn grouping_mode(&self, preferences: &ViewPreferences) -> GroupingMode {
        self.grouping_axis()
            .map(|axis| GroupingMode::from_flag(preferences.grouped(axis)))
            .unwrap_or(GroupingMode::Flat)
    }

    fn sort_context(&self) -> SortContext {
        match self {
            View::Device(_) => SortContext::Device,
            _ => SortContext::Area,
        }
    }

    fn group_ordering(&self) -> GroupOrdering {
        match self {
            View::AreaOverview => GroupOrdering::Alphabetical,
            _ => GroupOrdering::Representative,
        }
    }

    /// Persisted field a drag in this view writes to
    pub fn sort_field(&self, mode: GroupingMode) -> SortField {
        match (self, mode) {
            (View::Device(_), GroupingMode::Flat) => SortField::DeviceSortOrder,
            (View::Device(_), GroupingMode::Grouped) => SortField::DeviceGroupedSortOrder,
            (View::AreaOverview, GroupingMode::Grouped) => SortField::FloorSortOrder,
            (View::DeviceOverview, _) | (_, GroupingMode::Flat) => SortField::SortOrder,
            (_, GroupingMode::Grouped) => SortField::GroupedSortOrder,
        }
    }

    /// Button family shown by overview views
    pub fn button_kind(&self) -> Option<ButtonKind> {
        match self {
            View::AreaOverview => Some(ButtonKind::Area),
            View::DeviceOverview => Some(ButtonKind::Device),
            _ => None,
        }
    }

    fn contains(&self, entity: &EntityRecord, registry: &RegistryView) -> bool {
        match self {
            View::Area(area_id) => registry.entity_area(entity) == Some(area_id.as_str()),
            View::Device(domain) => entity.domain() == domain,
            _ => true,
        }
    }
}

/// Entities of the view that are not shown, for the edit dialogs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub no_state: Vec<String>,
    pub disabled: Vec<String>,
    pub hidden: Vec<String>,
}

impl Diagnostics {
    fn from_buckets(buckets: &Buckets) -> Self {
        Self {
            no_state: visibility::entity_ids(&buckets.no_state),
            disabled: visibility::entity_ids(&buckets.disabled),
            hidden: visibility::entity_ids(&buckets.hidden),
        }
    }
}

/// Output of one resolution pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedView {
    pub view: String,
    pub mode: GroupingMode,
    pub groups: Vec<OrderedGroup>,
    pub diagnostics: Diagnostics,
}

impl ResolvedView {
    /// All specs in display order
    pub fn specs(&self) -> impl Iterator<Item = &ResolvedCardSpec> {
        self.groups.iter().flat_map(|g| g.specs.iter())
    }
}

/// Resolution entry point holding the injected collaborators
#[derive(Clone)]
pub struct Engine {
    registry: Arc<dyn Registry + Send + Sync>,
    config: Arc<dyn ConfigSource + Send + Sync>,
}

impl Engine {
    pub fn new(registry: Arc<dyn Registry + Send + Sync>, config: Arc<dyn ConfigSource + Send + Sync>) -> Self {
        Self { registry, config }
    }

    /// Snapshot both sources and run one pass
    pub fn resolve(&self, view: &View, preferences: &ViewPreferences) -> ResolvedView {
        let registry = RegistryView::capture(self.registry.as_ref());
        let document = self.config.get_configuration();
        resolve_view(&registry, &document, view, preferences)
    }

    /// Turn a drag in `view` into the request that persists it
    pub fn plan_reorder(&self, view: &View, preferences: &ViewPreferences, gesture: &DragGesture) -> Result<ConfigRequest> {
        let resolved = self.resolve(view, preferences);
        let plan = reorder::plan_gesture(&resolved.groups, gesture, view.sort_field(resolved.mode))?;
        info!(view = %view, field = ?plan.field, cards = plan.assignments.len(), "Planned reorder");
        Ok(plan.into_request(view.button_kind()))
    }
}

pub fn resolve_view(
    registry: &RegistryView,
    document: &ConfigurationDocument,
    view: &View,
    preferences: &ViewPreferences,
) -> ResolvedView {
    let in_view: Vec<&EntityRecord> = registry
        .entities
        .iter()
        .filter(|e| view.contains(e, registry))
        .collect();
    let buckets = visibility::partition(in_view.iter().copied(), registry, document);
    let resolver = CardConfigResolver::new(&document.blueprints);
    let mode = view.grouping_mode(preferences);

    let specs = match view {
        View::Area(area_id) => area_specs(&resolver, &buckets, registry, document, area_id),
        View::Device(_) => buckets
            .visible
            .iter()
            .map(|entity| {
                let mut spec = resolver.resolve_entity(entity, registry, document, SortContext::Device);
                spec.group_key = registry
                    .entity_area(entity)
                    .map(|id| registry.area(id).map_or(id, |a| a.name.as_str()).to_string());
                spec
            })
            .collect(),
        View::Favorites => buckets
            .favorites
            .iter()
            .map(|entity| entity_spec(&resolver, entity, registry, document, view.sort_context()))
            .collect(),
        View::AreaOverview => area_buttons(&resolver, &buckets, registry, document),
        View::DeviceOverview => device_buttons(&resolver, &buckets, document),
    };

    debug!(view = %view, mode = ?mode, cards = specs.len(), "Resolved view");
    ResolvedView {
        view: view.to_string(),
        mode,
        groups: ordering::order(specs, mode, view.group_ordering()),
        diagnostics: Diagnostics::from_buckets(&buckets),
    }
}

/// Entity card grouped by domain
fn entity_spec(
    resolver: &CardConfigResolver,
    entity: &EntityRecord,
    registry: &RegistryView,
    document: &ConfigurationDocument,
    context: SortContext,
) -> ResolvedCardSpec {
    let mut spec = resolver.resolve_entity(entity, registry, document, context);
    spec.group_key = Some(entity.domain().to_string());
    spec
}

fn area_specs(
    resolver: &CardConfigResolver,
    buckets: &Buckets,
    registry: &RegistryView,
    document: &ConfigurationDocument,
    area_id: &str,
) -> Vec<ResolvedCardSpec> {
    let mut specs: Vec<ResolvedCardSpec> = buckets
        .visible
        .iter()
        .map(|entity| entity_spec(resolver, entity, registry, document, SortContext::Area))
        .collect();

    match (registry.area(area_id), document.area(area_id)) {
        (Some(area), Some(meta)) => specs.extend(meta.cards.iter().map(|slot| resolver.resolve_slot_card(area, slot))),
        (None, _) => warn!(area = %area_id, "Area not in registry"),
        _ => (),
    }
    specs
}

fn area_buttons(
    resolver: &CardConfigResolver,
    buckets: &Buckets,
    registry: &RegistryView,
    document: &ConfigurationDocument,
) -> Vec<ResolvedCardSpec> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entity in &buckets.visible {
        if let Some(area_id) = registry.entity_area(entity) {
            *counts.entry(area_id).or_default() += 1;
        }
    }

    registry
        .areas
        .iter()
        .filter(|area| document.area(&area.area_id).and_then(|meta| meta.hidden) != Some(true))
        .map(|area| {
            let count = counts.get(area.area_id.as_str()).copied().unwrap_or(0);
            resolver.resolve_area_button(area, document.area(&area.area_id), count)
        })
        .collect()
}

/// One button per domain with visible entities, in order of first appearance
fn device_buttons(resolver: &CardConfigResolver, buckets: &Buckets, document: &ConfigurationDocument) -> Vec<ResolvedCardSpec> {
    let mut domains: Vec<(&str, usize)> = Vec::new();
    for entity in &buckets.visible {
        match domains.iter_mut().find(|(domain, _)| *domain == entity.domain()) {
            Some((_, count)) => *count += 1,
            None => domains.push((entity.domain(), 1)),
        }
    }

    domains
        .into_iter()
        .map(|(domain, count)| resolver.resolve_domain_button(domain, document.domain(domain), count))
        .collect()
}

/// Latest published pass; older passes finishing late are discarded
#[derive(Debug, Default)]
pub struct Dashboard {
    next_generation: u64,
    published: Option<(u64, ResolvedView)>,
}

impl Dashboard {
    /// Generation number for a pass about to start
    pub fn begin_pass(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Show `resolved` unless a newer pass is already shown
    pub fn publish(&mut self, generation: u64, resolved: ResolvedView) -> bool {
        if let Some((shown, _)) = &self.published
            && *shown >= generation
        {
            debug!(generation, shown = *shown, "Discarding stale resolution pass");
            return false;
        }
        self.published = Some((generation, resolved));
        true
    }

    pub fn current(&self) -> Option<&ResolvedView> {
        self.published.as_ref().map(|(_, resolved)| resolved)
    }
}
