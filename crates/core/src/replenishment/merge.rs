//! Applying client-side segment edits to fetched segments.
//!
//! An edit always replaces the whole segment record for its SKU: targets are
//! never merged field by field and never added together.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::model::StoreDemandSegment;
use crate::types::Sku;

/// What to do with an edit whose SKU is not among the fetched segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMergePolicy {
    /// Edits may only modify SKUs already in scope; others are dropped.
    #[default]
    ReplaceOnly,
    /// Edits for unknown SKUs are appended as new segments.
    ReplaceOrInsert,
}

impl std::fmt::Display for EditMergePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReplaceOnly => write!(f, "replace_only"),
            Self::ReplaceOrInsert => write!(f, "replace_or_insert"),
        }
    }
}

impl FromStr for EditMergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace_only" => Ok(Self::ReplaceOnly),
            "replace_or_insert" => Ok(Self::ReplaceOrInsert),
            _ => Err(format!("invalid edit merge policy: {s}")),
        }
    }
}

/// Result of merging edits into fetched segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentMerge {
    /// Segments to plan with, fetched order first.
    pub segments: Vec<StoreDemandSegment>,
    /// SKUs whose edits were dropped under [`EditMergePolicy::ReplaceOnly`].
    pub dropped: Vec<Sku>,
}

/// Merge `edited` into `fetched`.
///
/// When several edits target the same SKU the last one wins. Every fetched
/// segment for an edited SKU is replaced, duplicates included. Inserted
/// segments keep the order their edits were given in.
#[must_use]
pub fn merge_edited_segments(
    fetched: Vec<StoreDemandSegment>,
    edited: Vec<StoreDemandSegment>,
    policy: EditMergePolicy,
) -> SegmentMerge {
    let mut order: Vec<Sku> = Vec::new();
    let mut edits: HashMap<Sku, StoreDemandSegment> = HashMap::new();
    for edit in edited {
        if !edits.contains_key(&edit.sku) {
            order.push(edit.sku.clone());
        }
        edits.insert(edit.sku.clone(), edit);
    }

    let mut matched: HashSet<Sku> = HashSet::new();
    let mut segments: Vec<StoreDemandSegment> = fetched
        .into_iter()
        .map(|segment| match edits.get(&segment.sku) {
            Some(edit) => {
                matched.insert(segment.sku);
                edit.clone()
            }
            None => segment,
        })
        .collect();

    let leftovers = order
        .into_iter()
        .filter(|sku| !matched.contains(sku))
        .filter_map(|sku| edits.remove(&sku));
    let mut dropped = Vec::new();
    match policy {
        EditMergePolicy::ReplaceOnly => dropped.extend(leftovers.map(|edit| edit.sku)),
        EditMergePolicy::ReplaceOrInsert => segments.extend(leftovers),
    }

    SegmentMerge { segments, dropped }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::replenishment::model::PlanningInputs;
    use crate::types::{Quantity, StoreCode};

    fn store1(segment: &StoreDemandSegment) -> Quantity {
        segment.target(&StoreCode::from("STORE1"))
    }

    #[test]
    fn test_edit_replaces_fetched_segment() {
        let fetched = vec![StoreDemandSegment::new("A", None).with_target("STORE1", 10)];
        let edited = vec![StoreDemandSegment::new("A", None).with_target("STORE1", 20)];

        let merged = merge_edited_segments(fetched, edited, EditMergePolicy::ReplaceOnly);

        assert_eq!(merged.segments.len(), 1);
        assert_eq!(store1(&merged.segments[0]), Quantity::from(20));
        assert!(merged.dropped.is_empty());
    }

    #[test]
    fn test_edit_replaces_whole_record() {
        let fetched = vec![
            StoreDemandSegment::new("A", Some("D1".into()))
                .with_target("STORE1", 10)
                .with_target("STORE2", 7),
        ];
        let edited = vec![StoreDemandSegment::new("A", None).with_target("STORE1", 20)];

        let merged = merge_edited_segments(fetched, edited, EditMergePolicy::ReplaceOnly);

        let segment = &merged.segments[0];
        assert_eq!(segment.target(&StoreCode::from("STORE2")), Quantity::ZERO);
        assert!(segment.delivery.is_none());
    }

    #[test]
    fn test_unedited_segments_pass_through_in_order() {
        let fetched = vec![
            StoreDemandSegment::new("A", None).with_target("STORE1", 1),
            StoreDemandSegment::new("B", None).with_target("STORE1", 2),
            StoreDemandSegment::new("C", None).with_target("STORE1", 3),
        ];
        let edited = vec![StoreDemandSegment::new("B", None).with_target("STORE1", 9)];

        let merged = merge_edited_segments(fetched, edited, EditMergePolicy::ReplaceOnly);

        let targets: Vec<Quantity> = merged.segments.iter().map(store1).collect();
        assert_eq!(
            targets,
            [Quantity::from(1), Quantity::from(9), Quantity::from(3)]
        );
    }

    #[test]
    fn test_replace_only_drops_unknown_skus() {
        let fetched = vec![StoreDemandSegment::new("A", None).with_target("STORE1", 1)];
        let edited = vec![StoreDemandSegment::new("Z", None).with_target("STORE1", 5)];

        let merged = merge_edited_segments(fetched, edited, EditMergePolicy::ReplaceOnly);

        assert_eq!(merged.segments.len(), 1);
        assert_eq!(merged.dropped, vec![Sku::from("Z")]);
    }

    #[test]
    fn test_replace_or_insert_appends_unknown_skus() {
        let fetched = vec![StoreDemandSegment::new("A", None).with_target("STORE1", 1)];
        let edited = vec![
            StoreDemandSegment::new("Z", None).with_target("STORE1", 5),
            StoreDemandSegment::new("Y", None).with_target("STORE1", 6),
        ];

        let merged = merge_edited_segments(fetched, edited, EditMergePolicy::ReplaceOrInsert);

        let skus: Vec<&str> = merged.segments.iter().map(|s| s.sku.as_str()).collect();
        assert_eq!(skus, ["A", "Z", "Y"]);
        assert!(merged.dropped.is_empty());
    }

    #[test]
    fn test_last_edit_wins() {
        let fetched = vec![StoreDemandSegment::new("A", None).with_target("STORE1", 1)];
        let edited = vec![
            StoreDemandSegment::new("A", None).with_target("STORE1", 5),
            StoreDemandSegment::new("A", None).with_target("STORE1", 8),
        ];

        let merged = merge_edited_segments(fetched, edited, EditMergePolicy::ReplaceOnly);

        assert_eq!(store1(&merged.segments[0]), Quantity::from(8));
    }

    #[test]
    fn test_edit_replaces_every_duplicate_of_its_sku() {
        let fetched = vec![
            StoreDemandSegment::new("S1", None).with_target("STORE1", 10),
            StoreDemandSegment::new("S1", None).with_target("STORE1", 5),
        ];
        let edited = vec![StoreDemandSegment::new("S1", None).with_target("STORE1", 20)];

        let merged = merge_edited_segments(fetched, edited, EditMergePolicy::ReplaceOrInsert);

        let targets: Vec<Quantity> = merged.segments.iter().map(store1).collect();
        assert_eq!(targets, [Quantity::from(20), Quantity::from(20)]);
        assert!(merged.dropped.is_empty());

        let inputs = PlanningInputs::from_parts(vec![], vec![], vec![], merged.segments);
        assert_eq!(
            inputs.segment_target(&Sku::from("S1"), &StoreCode::from("STORE1")),
            Quantity::from(20)
        );
    }

    #[test]
    fn test_policy_parses_from_config_strings() {
        assert_eq!(
            "replace_or_insert".parse::<EditMergePolicy>().unwrap(),
            EditMergePolicy::ReplaceOrInsert
        );
        assert_eq!(EditMergePolicy::ReplaceOnly.to_string(), "replace_only");
        assert!("merge".parse::<EditMergePolicy>().is_err());
    }
}
