//! Triggers, functions, dependency edges and tags (spec §4.4, §6).

use super::changeset::{ChangeTag, diff};
use crate::cc::ConfigCache;
use crate::cc::model::{Tag, TriggerDependency};
use crate::store::Store;
use anyhow::Result;
use std::sync::Arc;

pub fn sync(cc: &ConfigCache, store: &Store) -> Result<usize> {
    let mut applied = 0;

    let fresh_triggers = store.fetch_triggers()?;
    for change in diff(fresh_triggers, cc.snapshot_triggers(), |t| t.triggerid) {
        applied += 1;
        match change.tag {
            ChangeTag::Added | ChangeTag::Updated => cc.upsert_trigger(change.row.unwrap()),
            ChangeTag::Removed => cc.remove_trigger(change.key),
        }
    }

    let fresh_functions = store.fetch_functions()?;
    for change in diff(fresh_functions, cc.snapshot_functions(), |f| f.functionid) {
        applied += 1;
        match change.tag {
            ChangeTag::Added | ChangeTag::Updated => cc.upsert_function(change.row.unwrap()),
            ChangeTag::Removed => cc.remove_function(change.key),
        }
    }

    let fresh_deps: std::collections::HashSet<TriggerDependency> =
        store.fetch_trigger_dependencies()?.into_iter().collect();
    let current_deps = cc.snapshot_trigger_dependencies();
    for dep in fresh_deps.difference(&current_deps).copied().collect::<Vec<_>>() {
        applied += 1;
        cc.set_trigger_dependency(dep, true);
    }
    for dep in current_deps.difference(&fresh_deps).copied().collect::<Vec<_>>() {
        applied += 1;
        cc.set_trigger_dependency(dep, false);
    }

    let fresh_tags: std::collections::HashSet<(u64, Arc<str>, Arc<str>)> = store
        .fetch_trigger_tags()?
        .into_iter()
        .map(|t| (t.owner_id, t.tag, t.value))
        .collect();
    let current_tags = cc.snapshot_trigger_tags();
    for (owner_id, tag, value) in fresh_tags.difference(&current_tags).cloned().collect::<Vec<_>>() {
        applied += 1;
        cc.set_trigger_tag(Tag { owner_id, tag, value }, true);
    }
    for (owner_id, tag, value) in current_tags.difference(&fresh_tags).cloned().collect::<Vec<_>>() {
        applied += 1;
        cc.set_trigger_tag(Tag { owner_id, tag, value }, false);
    }

    Ok(applied)
}
