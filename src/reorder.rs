//! Drag reorder mapping
//!
//! A drag gesture moves one card inside one group. The resulting id sequence
//! is turned into plain 0-based indices for a single sort field and sent to
//! the store as a fire-and-forget request. Local state is never touched; the
//! reload signal after the write re-runs resolution.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::ipc::messages::{ButtonKind, ConfigRequest};
use crate::ordering::OrderedGroup;

/// Persisted field a reorder writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    SortOrder,
    GroupedSortOrder,
    DeviceSortOrder,
    DeviceGroupedSortOrder,
    FloorSortOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAssignment {
    pub id: String,
    pub new_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    pub field: SortField,
    pub assignments: Vec<OrderAssignment>,
}

impl ReorderPlan {
    /// Request persisting this plan; `button` selects area/device buttons over entities
    pub fn into_request(self, button: Option<ButtonKind>) -> ConfigRequest {
        match button {
            Some(button) => ConfigRequest::SortButton {
                button,
                field: self.field,
                assignments: self.assignments,
            },
            None => ConfigRequest::SortEntity {
                field: self.field,
                assignments: self.assignments,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragGesture {
    /// Group the drag happened in; `None` for flat views
    pub group_key: Option<String>,
    pub old_index: usize,
    pub new_index: usize,
}

pub fn compute_new_order(ids: &[String], field: SortField) -> ReorderPlan {
    ReorderPlan {
        field,
        assignments: ids
            .iter()
            .zip(0u32..)
            .map(|(id, new_index)| OrderAssignment {
                id: id.clone(),
                new_index,
            })
            .collect(),
    }
}

/// Ids of the addressed group after moving one element; other groups are not included
pub fn apply_gesture(groups: &[OrderedGroup], gesture: &DragGesture) -> Result<Vec<String>> {
    let group = groups
        .iter()
        .find(|g| g.key == gesture.group_key)
        .ok_or_else(|| EngineError::InvalidGesture(format!("no group {:?} in this view", gesture.group_key)))?;

    let len = group.specs.len();
    if gesture.old_index >= len || gesture.new_index >= len {
        return Err(EngineError::InvalidGesture(format!(
            "move {} -> {} out of range for {len} cards",
            gesture.old_index, gesture.new_index
        )));
    }

    let mut ids: Vec<String> = group.specs.iter().map(|s| s.target_id.clone()).collect();
    let moved = ids.remove(gesture.old_index);
    ids.insert(gesture.new_index, moved);
    Ok(ids)
}

pub fn plan_gesture(groups: &[OrderedGroup], gesture: &DragGesture, field: SortField) -> Result<ReorderPlan> {
    let ids = apply_gesture(groups, gesture)?;
    Ok(compute_new_order(&ids, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ResolvedCardSpec, Spans};
    use serde_json::json;

    fn group(key: Option<&str>, ids: &[&str]) -> OrderedGroup {
        OrderedGroup {
            key: key.map(str::to_string),
            specs: ids
                .iter()
                .map(|id| ResolvedCardSpec {
                    target_id: id.to_string(),
                    card_config: json!({"type": "area"}),
                    popup_config: None,
                    spans: Spans::uniform(1),
                    sort_order: 99,
                    grouped_sort_order: 99,
                    is_favorite: false,
                    custom_card: false,
                    custom_popup: false,
                    group_key: key.map(str::to_string),
                })
                .collect(),
        }
    }

    #[test]
    fn test_compute_new_order_plain_indices() {
        let ids = vec!["b".to_string(), "c".to_string(), "a".to_string()];
        let plan = compute_new_order(&ids, SortField::SortOrder);
        assert_eq!(plan.field, SortField::SortOrder);
        let pairs: Vec<_> = plan.assignments.iter().map(|a| (a.id.as_str(), a.new_index)).collect();
        assert_eq!(pairs, vec![("b", 0), ("c", 1), ("a", 2)]);
    }

    #[test]
    fn test_grouped_reorder_only_touches_its_group() {
        let groups = vec![
            group(Some("Ground"), &["A", "B"]),
            group(Some("First"), &["C", "D"]),
        ];
        let gesture = DragGesture {
            group_key: Some("Ground".into()),
            old_index: 0,
            new_index: 1,
        };

        let plan = plan_gesture(&groups, &gesture, SortField::FloorSortOrder).unwrap();
        let pairs: Vec<_> = plan.assignments.iter().map(|a| (a.id.as_str(), a.new_index)).collect();
        assert_eq!(pairs, vec![("B", 0), ("A", 1)]);
        assert!(plan.assignments.iter().all(|a| a.id != "C" && a.id != "D"));
    }

    #[test]
    fn test_move_towards_front() {
        let groups = vec![group(None, &["a", "b", "c", "d"])];
        let gesture = DragGesture {
            group_key: None,
            old_index: 3,
            new_index: 1,
        };
        assert_eq!(apply_gesture(&groups, &gesture).unwrap(), vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn test_unknown_group_rejected() {
        let groups = vec![group(Some("Ground"), &["A"])];
        let gesture = DragGesture {
            group_key: Some("Attic".into()),
            old_index: 0,
            new_index: 0,
        };
        assert!(matches!(apply_gesture(&groups, &gesture), Err(EngineError::InvalidGesture(_))));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let groups = vec![group(None, &["a", "b"])];
        let gesture = DragGesture {
            group_key: None,
            old_index: 0,
            new_index: 2,
        };
        assert!(matches!(apply_gesture(&groups, &gesture), Err(EngineError::InvalidGesture(_))));
    }

    #[test]
    fn test_plan_into_request() {
        let plan = compute_new_order(&["x".to_string()], SortField::DeviceSortOrder);
        assert!(matches!(
            plan.clone().into_request(None),
            ConfigRequest::SortEntity { field: SortField::DeviceSortOrder, .. }
        ));
        assert!(matches!(
            plan.into_request(Some(ButtonKind::Area)),
            ConfigRequest::SortButton { button: ButtonKind::Area, .. }
        ));
    }
}
