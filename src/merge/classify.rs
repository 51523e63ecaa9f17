//! Classification (§4.3): diff `base` against `ours` and `theirs`, then sort
//! every logical key into `OursOnly`, `TheirsOnly`, or `Conflicts`.

use std::collections::BTreeMap;

use crate::canonical_json;
use crate::diff::diff_nodes;
use crate::error::MergeConflictInfo;
use crate::model::ids::NodeId;
use crate::model::node::{Node, PropertyValue};

use super::logical_key::{expand, Entry};

/// The outcome of classifying a three-way diff: changes safe to apply from
/// each side, and changes that conflict and require operator resolution.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    /// Changes present only on the `ours` side.
    pub ours_only: Vec<Entry>,
    /// Changes present only on the `theirs` side (or present identically on
    /// both — applied once, from this side, per the fixed apply order).
    pub theirs_only: Vec<Entry>,
    /// Logical keys touched by both sides in incompatible ways.
    pub conflicts: Vec<MergeConflictInfo>,
}

impl Resolution {
    /// `true` if there are no unresolved conflicts.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Classify a three-way diff into a [`Resolution`] (§4.3 Classification).
#[must_use]
pub fn classify(
    base: &BTreeMap<NodeId, Node>,
    ours: &BTreeMap<NodeId, Node>,
    theirs: &BTreeMap<NodeId, Node>,
) -> Resolution {
    let d1 = diff_nodes(base, ours);
    let d2 = diff_nodes(base, theirs);
    let ours_entries = expand(&d1, ours);
    let theirs_entries = expand(&d2, theirs);

    let mut by_key: BTreeMap<String, (Vec<Entry>, Vec<Entry>)> = BTreeMap::new();
    for entry in ours_entries {
        by_key.entry(entry.logical_key()).or_default().0.push(entry);
    }
    for entry in theirs_entries {
        by_key.entry(entry.logical_key()).or_default().1.push(entry);
    }

    let mut resolution = Resolution::default();
    for (key, (ours_entries, theirs_entries)) in by_key {
        match (ours_entries.is_empty(), theirs_entries.is_empty()) {
            (false, true) => resolution.ours_only.extend(ours_entries),
            (true, false) => resolution.theirs_only.extend(theirs_entries),
            (false, false) => {
                if let Some(description) = conflict_description(&ours_entries, &theirs_entries) {
                    resolution.conflicts.push(MergeConflictInfo::new(key, description));
                } else {
                    // Identical on both sides: apply once, from `theirs`,
                    // matching the fixed TheirsOnly-then-OursOnly apply order.
                    resolution.theirs_only.extend(theirs_entries);
                }
            }
            (true, true) => unreachable!("a key is only inserted alongside at least one entry"),
        }
    }
    resolution
}

/// `None` if both sides resolve to the same outcome (no conflict);
/// `Some(description)` otherwise.
fn conflict_description(ours: &[Entry], theirs: &[Entry]) -> Option<String> {
    if ours.len() != 1 || theirs.len() != 1 {
        return Some(format!(
            "{} change(s) on our side vs {} on theirs at the same key",
            ours.len(),
            theirs.len()
        ));
    }
    let (a, b) = (&ours[0], &theirs[0]);
    match (a, b) {
        (Entry::Rename { name_to: x, .. }, Entry::Rename { name_to: y, .. }) => {
            (x != y).then(|| format!("renamed to '{x}' vs '{y}'"))
        }
        (Entry::Move { parent_to: x, .. }, Entry::Move { parent_to: y, .. }) => {
            (x != y).then(|| format!("moved to parent {x} vs {y}"))
        }
        (Entry::Order { order_to: x, .. }, Entry::Order { order_to: y, .. }) => {
            (x != y).then(|| "reordered differently".to_owned())
        }
        (
            Entry::Property { kind: xk, value: xv, .. },
            Entry::Property { kind: yk, value: yv, .. },
        ) => (xk != yk || !property_values_equal(xv, yv)).then(|| "conflicting property edits".to_owned()),
        (Entry::Node { .. }, Entry::Node { .. }) => Some("both sides touched the same node".to_owned()),
        _ => Some("different kinds of changes at the same logical key".to_owned()),
    }
}

fn property_values_equal(a: &Option<PropertyValue>, b: &Option<PropertyValue>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.effective_type_hint() == b.effective_type_hint() && canonical_json::values_equal(&a.value, &b.value),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{Node, TypeHint};
    use chrono::{DateTime, Utc};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn node(name: &str) -> Node {
        Node::new(name.to_owned(), None, now())
    }

    #[test]
    fn non_overlapping_renames_are_ours_and_theirs_only() {
        let root_id = NodeId::new();
        let a_id = NodeId::new();
        let b_id = NodeId::new();

        let mut root = node("Root");
        root.id = root_id;
        root.children = vec![a_id, b_id];
        let mut a = node("A");
        a.id = a_id;
        let mut b = node("B");
        b.id = b_id;

        let base: BTreeMap<_, _> = [(root_id, root.clone()), (a_id, a.clone()), (b_id, b.clone())].into_iter().collect();

        let mut a_ours = a.clone();
        a_ours.name = "A-ours".to_owned();
        let ours: BTreeMap<_, _> = [(root_id, root.clone()), (a_id, a_ours), (b_id, b.clone())].into_iter().collect();

        let mut b_theirs = b.clone();
        b_theirs.name = "B-theirs".to_owned();
        let theirs: BTreeMap<_, _> = [(root_id, root), (a_id, a), (b_id, b_theirs)].into_iter().collect();

        let resolution = classify(&base, &ours, &theirs);
        assert!(resolution.is_clean());
        assert_eq!(resolution.ours_only.len(), 1);
        assert_eq!(resolution.theirs_only.len(), 1);
    }

    #[test]
    fn divergent_rename_is_a_conflict() {
        let id = NodeId::new();
        let mut base_node = node("Base");
        base_node.id = id;
        let base: BTreeMap<_, _> = [(id, base_node.clone())].into_iter().collect();

        let mut ours_node = base_node.clone();
        ours_node.name = "Ours".to_owned();
        let ours: BTreeMap<_, _> = [(id, ours_node)].into_iter().collect();

        let mut theirs_node = base_node;
        theirs_node.name = "Theirs".to_owned();
        let theirs: BTreeMap<_, _> = [(id, theirs_node)].into_iter().collect();

        let resolution = classify(&base, &ours, &theirs);
        assert_eq!(resolution.conflicts.len(), 1);
        assert!(resolution.conflicts[0].logical_key.ends_with("|name"));
    }

    #[test]
    fn identical_change_on_both_sides_is_not_a_conflict() {
        let id = NodeId::new();
        let mut base_node = node("Base");
        base_node.id = id;
        let base: BTreeMap<_, _> = [(id, base_node.clone())].into_iter().collect();

        let mut renamed = base_node;
        renamed.name = "Same".to_owned();
        let ours: BTreeMap<_, _> = [(id, renamed.clone())].into_iter().collect();
        let theirs: BTreeMap<_, _> = [(id, renamed)].into_iter().collect();

        let resolution = classify(&base, &ours, &theirs);
        assert!(resolution.is_clean());
        assert_eq!(resolution.theirs_only.len(), 1);
        assert_eq!(resolution.ours_only.len(), 0);
    }

    #[test]
    fn whole_node_touched_by_both_sides_always_conflicts() {
        let root_id = NodeId::new();
        let new_id = NodeId::new();
        let mut root = node("Root");
        root.id = root_id;
        let base: BTreeMap<_, _> = [(root_id, root.clone())].into_iter().collect();

        let mut new_node = node("New");
        new_node.id = new_id;
        let mut root_with_child = root.clone();
        root_with_child.children.push(new_id);

        let ours: BTreeMap<_, _> = [(root_id, root_with_child.clone()), (new_id, new_node.clone())].into_iter().collect();
        let theirs: BTreeMap<_, _> = [(root_id, root_with_child), (new_id, new_node)].into_iter().collect();

        let resolution = classify(&base, &ours, &theirs);
        assert_eq!(resolution.conflicts.len(), 1);
        assert!(resolution.conflicts[0].logical_key.ends_with("|node"));
    }

    #[test]
    fn property_conflict_uses_canonical_equality() {
        let id = NodeId::new();
        let mut base_node = node("Base");
        base_node.id = id;
        let base: BTreeMap<_, _> = [(id, base_node.clone())].into_iter().collect();

        let mut ours_node = base_node.clone();
        ours_node
            .properties
            .insert("count".to_owned(), PropertyValue::new(TypeHint::Number, serde_json::json!(2)));
        let mut theirs_node = base_node;
        theirs_node
            .properties
            .insert("count".to_owned(), PropertyValue::new(TypeHint::Number, serde_json::json!(2.0)));

        let ours: BTreeMap<_, _> = [(id, ours_node)].into_iter().collect();
        let theirs: BTreeMap<_, _> = [(id, theirs_node)].into_iter().collect();

        let resolution = classify(&base, &ours, &theirs);
        assert!(resolution.is_clean());
    }
}
