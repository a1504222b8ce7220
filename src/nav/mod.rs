use crate::models::{NavEntry, NavTree};
use std::collections::{BTreeMap, HashSet};

pub(crate) const MIN_GROUPING_THRESHOLD: i64 = 1;
pub(crate) const MAX_GROUPING_THRESHOLD: i64 = 10;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ReorderError {
    #[error("no submenu named {0:?}")]
    UnknownLevel(String),
    #[error("no tool mounted at {0:?} in this menu")]
    UnknownEntry(String),
    #[error("tool {0:?} appears twice in the new order")]
    Duplicate(String),
    #[error("new order lists {got} of {expected} tools")]
    Incomplete { expected: usize, got: usize },
}

/// A new sibling order for one level of the nav bar.
///
/// `level` is `None` for the top bar, otherwise the key of the group entry
/// whose children were reordered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MountOrder {
    pub level: Option<String>,
    pub names: Vec<String>,
}

impl MountOrder {
    /// Position index -> mount point, as posted to `admin/mount_order`.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (i.to_string(), name.clone()))
            .collect()
    }
}

/// Accepted grouping threshold, always within `[1, 10]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct GroupingThreshold(i64);

impl GroupingThreshold {
    pub fn clamped(v: i64) -> Self {
        Self(v.clamp(MIN_GROUPING_THRESHOLD, MAX_GROUPING_THRESHOLD))
    }

    /// Parse raw input from the number field. Non-numeric input is refused.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<i64>().ok().map(Self::clamped)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

fn find_in<'a>(entries: &'a [NavEntry], key: &str) -> Option<&'a NavEntry> {
    for e in entries {
        if e.key() == key {
            return Some(e);
        }
        if let Some(found) = e.children.as_deref().and_then(|c| find_in(c, key)) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut<'a>(entries: &'a mut [NavEntry], key: &str) -> Option<&'a mut NavEntry> {
    for e in entries.iter_mut() {
        if e.key() == key {
            return Some(e);
        }
        if let Some(found) = e.children.as_deref_mut().and_then(|c| find_in_mut(c, key)) {
            return Some(found);
        }
    }
    None
}

impl NavTree {
    /// Depth-first lookup by entry key.
    pub fn find(&self, key: &str) -> Option<&NavEntry> {
        find_in(&self.children, key)
    }

    pub fn siblings(&self, level: Option<&str>) -> Option<&[NavEntry]> {
        match level {
            None => Some(&self.children),
            Some(key) => self.find(key)?.children.as_deref(),
        }
    }

    fn siblings_mut(&mut self, level: Option<&str>) -> Option<&mut Vec<NavEntry>> {
        match level {
            None => Some(&mut self.children),
            Some(key) => find_in_mut(&mut self.children, key)?.children.as_mut(),
        }
    }

    /// Every mount point in the tree, groups excluded.
    pub fn mount_points(&self) -> Vec<String> {
        fn walk(entries: &[NavEntry], out: &mut Vec<String>) {
            for e in entries {
                if let Some(mp) = &e.mount_point {
                    out.push(mp.clone());
                }
                if let Some(c) = &e.children {
                    walk(c, out);
                }
            }
        }
        let mut out = vec![];
        walk(&self.children, &mut out);
        out
    }

    /// Apply a new order to one sibling list in place.
    ///
    /// Each named entry gets its position in `names` as ordinal, then the list
    /// is re-sorted by ordinal. Nothing is modified when the order is rejected.
    pub fn reorder_siblings(
        &mut self,
        level: Option<&str>,
        names: &[String],
    ) -> Result<MountOrder, ReorderError> {
        let siblings = self
            .siblings_mut(level)
            .ok_or_else(|| ReorderError::UnknownLevel(level.unwrap_or_default().to_string()))?;

        if names.len() != siblings.len() {
            return Err(ReorderError::Incomplete {
                expected: siblings.len(),
                got: names.len(),
            });
        }

        let mut seen: HashSet<&str> = HashSet::with_capacity(names.len());
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(ReorderError::Duplicate(name.clone()));
            }
            if !siblings.iter().any(|e| e.key() == name) {
                return Err(ReorderError::UnknownEntry(name.clone()));
            }
        }

        for (i, name) in names.iter().enumerate() {
            if let Some(e) = siblings.iter_mut().find(|e| e.key() == name) {
                e.ordinal = i as i64;
            }
        }
        siblings.sort_by_key(|e| e.ordinal);

        Ok(MountOrder {
            level: level.map(str::to_string),
            names: names.to_vec(),
        })
    }

    pub fn set_grouping_threshold(&mut self, threshold: GroupingThreshold) {
        self.grouping_threshold = threshold.get();
    }
}

/// Compute the order of a sibling list after dropping `dragged` next to `target`.
///
/// Returns `None` when either key is missing or the drop would not change anything.
pub(crate) fn move_within(
    order: &[String],
    dragged: &str,
    target: &str,
    insert_after: bool,
) -> Option<Vec<String>> {
    if dragged == target {
        return None;
    }
    if !order.iter().any(|k| k == dragged) {
        return None;
    }

    let mut next: Vec<String> = order.iter().filter(|k| *k != dragged).cloned().collect();
    let tidx = next.iter().position(|k| k == target)?;
    let insert_idx = if insert_after { tidx + 1 } else { tidx };
    next.insert(insert_idx, dragged.to_string());

    if next == order {
        None
    } else {
        Some(next)
    }
}

pub(crate) fn sibling_keys(entries: &[NavEntry]) -> Vec<String> {
    entries.iter().map(|e| e.key().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mount_point: &str, ordinal: i64) -> NavEntry {
        NavEntry {
            name: mount_point.to_uppercase(),
            url: format!("/p/demo/{mount_point}/"),
            mount_point: Some(mount_point.to_string()),
            ordinal,
            is_anchored: false,
            tool_name: "wiki".to_string(),
            icon: Some("tool-wiki".to_string()),
            children: None,
        }
    }

    fn group(name: &str, children: Vec<NavEntry>) -> NavEntry {
        NavEntry {
            name: name.to_string(),
            url: format!("/p/demo/_list/{name}"),
            mount_point: None,
            ordinal: 9,
            is_anchored: false,
            tool_name: name.to_string(),
            icon: None,
            children: Some(children),
        }
    }

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn sample_tree() -> NavTree {
        NavTree {
            children: vec![
                entry("a", 0),
                entry("b", 1),
                group("git", vec![entry("code", 0), entry("docs", 5), entry("site", 7)]),
            ],
            grouping_threshold: 2,
        }
    }

    #[test]
    fn test_reorder_two_items_b_above_a() {
        let mut tree = NavTree {
            children: vec![entry("a", 0), entry("b", 1)],
            grouping_threshold: 1,
        };

        let order = tree
            .reorder_siblings(None, &names(&["b", "a"]))
            .expect("reorder should succeed");

        assert_eq!(tree.find("b").unwrap().ordinal, 0);
        assert_eq!(tree.find("a").unwrap().ordinal, 1);
        assert_eq!(sibling_keys(&tree.children), names(&["b", "a"]));

        let payload = serde_json::to_value(order.entries()).unwrap();
        assert_eq!(payload, serde_json::json!({"0": "b", "1": "a"}));
    }

    #[test]
    fn test_reorder_assigns_contiguous_ordinals_in_submitted_order() {
        let mut tree = sample_tree();
        let new_order = names(&["site", "code", "docs"]);
        tree.reorder_siblings(Some("git"), &new_order).unwrap();

        let kids = tree.siblings(Some("git")).unwrap();
        assert_eq!(sibling_keys(kids), new_order);
        let ordinals: Vec<i64> = kids.iter().map(|e| e.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);

        // Other levels are untouched.
        assert_eq!(tree.find("a").unwrap().ordinal, 0);
        assert_eq!(tree.find("git").unwrap().ordinal, 9);
    }

    #[test]
    fn test_reorder_top_level_with_group_keyed_by_name() {
        let mut tree = sample_tree();
        let order = tree
            .reorder_siblings(None, &names(&["git", "a", "b"]))
            .unwrap();
        assert_eq!(order.level, None);
        assert_eq!(sibling_keys(&tree.children), names(&["git", "a", "b"]));
    }

    #[test]
    fn test_reorder_rejects_unknown_entry_without_mutation() {
        let mut tree = sample_tree();
        let before = tree.clone();
        let err = tree
            .reorder_siblings(None, &names(&["a", "b", "nope"]))
            .unwrap_err();
        assert_eq!(err, ReorderError::UnknownEntry("nope".to_string()));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_reorder_rejects_duplicates_and_partial_orders() {
        let mut tree = sample_tree();
        assert_eq!(
            tree.reorder_siblings(None, &names(&["a", "a", "b"])),
            Err(ReorderError::Duplicate("a".to_string()))
        );
        assert_eq!(
            tree.reorder_siblings(None, &names(&["a", "b"])),
            Err(ReorderError::Incomplete { expected: 3, got: 2 })
        );
    }

    #[test]
    fn test_reorder_unknown_level() {
        let mut tree = sample_tree();
        assert_eq!(
            tree.reorder_siblings(Some("svn"), &names(&["x"])),
            Err(ReorderError::UnknownLevel("svn".to_string()))
        );
        // A leaf has no submenu.
        assert_eq!(
            tree.reorder_siblings(Some("a"), &names(&["x"])),
            Err(ReorderError::UnknownLevel("a".to_string()))
        );
    }

    #[test]
    fn test_find_is_depth_first_and_mount_points_skip_groups() {
        let tree = sample_tree();
        assert_eq!(tree.find("docs").unwrap().ordinal, 5);
        assert!(tree.find("missing").is_none());
        assert_eq!(tree.mount_points(), names(&["a", "b", "code", "docs", "site"]));
    }

    #[test]
    fn test_move_within_before_and_after() {
        let order = names(&["a", "b", "c"]);
        assert_eq!(move_within(&order, "c", "a", false), Some(names(&["c", "a", "b"])));
        assert_eq!(move_within(&order, "a", "c", true), Some(names(&["b", "c", "a"])));
        assert_eq!(move_within(&order, "a", "b", true), Some(names(&["b", "a", "c"])));
    }

    #[test]
    fn test_move_within_noop_and_unknown() {
        let order = names(&["a", "b", "c"]);
        assert_eq!(move_within(&order, "a", "a", true), None);
        assert_eq!(move_within(&order, "a", "b", false), None);
        assert_eq!(move_within(&order, "x", "b", false), None);
        assert_eq!(move_within(&order, "a", "x", false), None);
    }

    #[test]
    fn test_grouping_threshold_clamps_and_refuses_garbage() {
        assert_eq!(GroupingThreshold::clamped(0).get(), 1);
        assert_eq!(GroupingThreshold::clamped(-4).get(), 1);
        assert_eq!(GroupingThreshold::clamped(11).get(), 10);
        assert_eq!(GroupingThreshold::clamped(7).get(), 7);
        assert_eq!(GroupingThreshold::parse(" 3 ").map(GroupingThreshold::get), Some(3));
        assert_eq!(GroupingThreshold::parse("42").map(GroupingThreshold::get), Some(10));
        assert_eq!(GroupingThreshold::parse(""), None);
        assert_eq!(GroupingThreshold::parse("abc"), None);

        let mut tree = sample_tree();
        tree.set_grouping_threshold(GroupingThreshold::clamped(99));
        assert_eq!(tree.grouping_threshold, 10);
    }
}
