//! Sort order resolution
//!
//! Flat views sort by `sort_order`. Grouped views bucket specs by their
//! `group_key`, sort inside each bucket by `grouped_sort_order`, then order
//! the buckets themselves. All sorts are stable so unsorted cards keep
//! registry order.

use serde::Serialize;

use crate::resolver::ResolvedCardSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    Flat,
    Grouped,
}

impl GroupingMode {
    pub fn from_flag(grouped: bool) -> Self {
        if grouped { GroupingMode::Grouped } else { GroupingMode::Flat }
    }
}

/// How groups are ordered relative to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOrdering {
    /// By the smallest `grouped_sort_order` inside the group, ties by first appearance
    Representative,
    /// By group key
    Alphabetical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderedGroup {
    /// `None` collects cards without a group, or the whole view when flat
    pub key: Option<String>,
    pub specs: Vec<ResolvedCardSpec>,
}

pub fn order(specs: Vec<ResolvedCardSpec>, mode: GroupingMode, ordering: GroupOrdering) -> Vec<OrderedGroup> {
    match mode {
        GroupingMode::Flat => vec![OrderedGroup {
            key: None,
            specs: order_flat(specs),
        }],
        GroupingMode::Grouped => order_grouped(specs, ordering),
    }
}

pub fn order_flat(mut specs: Vec<ResolvedCardSpec>) -> Vec<ResolvedCardSpec> {
    specs.sort_by_key(|s| s.sort_order);
    specs
}

fn order_grouped(specs: Vec<ResolvedCardSpec>, ordering: GroupOrdering) -> Vec<OrderedGroup> {
    // Groups in order of first appearance
    let mut groups: Vec<OrderedGroup> = Vec::new();
    for spec in specs {
        match groups.iter_mut().find(|g| g.key == spec.group_key) {
            Some(group) => group.specs.push(spec),
            None => groups.push(OrderedGroup {
                key: spec.group_key.clone(),
                specs: vec![spec],
            }),
        }
    }

    for group in &mut groups {
        group.specs.sort_by_key(|s| s.grouped_sort_order);
    }

    match ordering {
        GroupOrdering::Representative => groups.sort_by_key(|g| {
            (
                g.key.is_none(),
                g.specs.iter().map(|s| s.grouped_sort_order).min().unwrap_or(u32::MAX),
            )
        }),
        GroupOrdering::Alphabetical => groups.sort_by(|a, b| match (&a.key, &b.key) {
            (Some(a), Some(b)) => a.cmp(b),
            (a, b) => a.is_none().cmp(&b.is_none()),
        }),
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Spans;
    use serde_json::json;

    fn spec(id: &str, sort_order: u32, grouped_sort_order: u32, group: Option<&str>) -> ResolvedCardSpec {
        ResolvedCardSpec {
            target_id: id.to_string(),
            card_config: json!({"type": "tile", "entity": id}),
            popup_config: None,
            spans: Spans::uniform(1),
            sort_order,
            grouped_sort_order,
            is_favorite: false,
            custom_card: false,
            custom_popup: false,
            group_key: group.map(str::to_string),
        }
    }

    fn ids(specs: &[ResolvedCardSpec]) -> Vec<&str> {
        specs.iter().map(|s| s.target_id.as_str()).collect()
    }

    #[test]
    fn test_flat_sorts_ascending() {
        let specs = vec![spec("a", 3, 0, None), spec("b", 1, 0, None), spec("c", 2, 0, None)];
        let sorted = order_flat(specs);
        assert_eq!(ids(&sorted), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_flat_ties_keep_input_order() {
        let specs = vec![spec("1", 5, 99, None), spec("2", 5, 99, None), spec("3", 1, 99, None)];
        let sorted = order_flat(specs);
        assert_eq!(ids(&sorted), vec!["3", "1", "2"]);
    }

    #[test]
    fn test_flat_is_stable_for_defaults() {
        let specs = vec![
            spec("x", 99, 99, None),
            spec("y", 99, 99, None),
            spec("first", 0, 99, None),
            spec("z", 99, 99, None),
        ];
        let sorted = order_flat(specs);
        assert_eq!(ids(&sorted), vec!["first", "x", "y", "z"]);
    }

    #[test]
    fn test_flat_mode_single_group() {
        let groups = order(vec![spec("a", 1, 0, Some("g"))], GroupingMode::Flat, GroupOrdering::Representative);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, None);
    }

    #[test]
    fn test_grouped_uses_grouped_sort_order() {
        let specs = vec![
            spec("a", 0, 2, Some("kitchen")),
            spec("b", 1, 0, Some("kitchen")),
            spec("c", 2, 1, Some("kitchen")),
        ];
        let groups = order(specs, GroupingMode::Grouped, GroupOrdering::Representative);
        assert_eq!(ids(&groups[0].specs), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_representative_group_order() {
        let specs = vec![
            spec("a", 0, 5, Some("garage")),
            spec("b", 0, 99, Some("hall")),
            spec("c", 0, 1, Some("kitchen")),
            spec("d", 0, 99, None),
            spec("e", 0, 99, Some("attic")),
        ];
        let groups = order(specs, GroupingMode::Grouped, GroupOrdering::Representative);
        let keys: Vec<_> = groups.iter().map(|g| g.key.as_deref()).collect();
        assert_eq!(keys, vec![Some("kitchen"), Some("garage"), Some("hall"), Some("attic"), None]);
    }

    #[test]
    fn test_alphabetical_group_order() {
        let specs = vec![
            spec("a", 0, 0, Some("Upstairs")),
            spec("b", 0, 0, None),
            spec("c", 0, 1, Some("Ground")),
            spec("d", 0, 0, Some("Ground")),
        ];
        let groups = order(specs, GroupingMode::Grouped, GroupOrdering::Alphabetical);
        let keys: Vec<_> = groups.iter().map(|g| g.key.as_deref()).collect();
        assert_eq!(keys, vec![Some("Ground"), Some("Upstairs"), None]);
        assert_eq!(ids(&groups[0].specs), vec!["d", "c"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(order(Vec::new(), GroupingMode::Grouped, GroupOrdering::Alphabetical).is_empty());
        assert_eq!(order(Vec::new(), GroupingMode::Flat, GroupOrdering::Alphabetical)[0].specs.len(), 0);
    }
}
