//! Generic diff machinery for the Differential Sync Engine (spec §4.4).
//!
//! Every `sync_*` module runs the same shape: fetch the store's rows for an
//! entity kind, compare against what CC currently holds, and turn the
//! difference into a batch of CC writer calls. `Change` is the comparator's
//! output; `diff` is the comparator itself, generic over any `K: Eq + Hash`.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeTag {
    Added,
    Updated,
    Removed,
}

#[derive(Debug, Clone)]
pub struct Change<K, T> {
    pub key: K,
    pub tag: ChangeTag,
    pub row: Option<T>,
}

/// Compare the freshly fetched `fresh` rows against `current` (CC's
/// present view, keyed the same way) and emit one `Change` per row that
/// differs. `current` is consumed because callers build it solely to feed
/// this comparison.
pub fn diff<K, T>(
    fresh: Vec<T>,
    mut current: HashMap<K, T>,
    key_of: impl Fn(&T) -> K,
) -> Vec<Change<K, T>>
where
    K: Eq + Hash + Clone,
    T: PartialEq,
{
    let mut changes = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for row in fresh {
        let key = key_of(&row);
        seen.insert(key.clone());
        match current.remove(&key) {
            None => changes.push(Change {
                key,
                tag: ChangeTag::Added,
                row: Some(row),
            }),
            Some(prev) if prev != row => changes.push(Change {
                key,
                tag: ChangeTag::Updated,
                row: Some(row),
            }),
            Some(_) => {}
        }
    }
    for (key, _) in current {
        changes.push(Change {
            key,
            tag: ChangeTag::Removed,
            row: None,
        });
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: u64,
        v: i64,
    }

    #[test]
    fn detects_add_update_remove() {
        let mut current = HashMap::new();
        current.insert(1u64, Row { id: 1, v: 10 });
        current.insert(2u64, Row { id: 2, v: 20 });

        let fresh = vec![Row { id: 1, v: 10 }, Row { id: 2, v: 99 }, Row { id: 3, v: 30 }];
        let mut changes = diff(fresh, current, |r| r.id);
        changes.sort_by_key(|c| c.key);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].key, 2);
        assert_eq!(changes[0].tag, ChangeTag::Updated);
        assert_eq!(changes[1].key, 3);
        assert_eq!(changes[1].tag, ChangeTag::Added);
    }

    #[test]
    fn unmatched_current_rows_become_removals() {
        let mut current = HashMap::new();
        current.insert(5u64, Row { id: 5, v: 1 });
        let changes = diff(Vec::<Row>::new(), current, |r| r.id);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].tag, ChangeTag::Removed);
    }
}
