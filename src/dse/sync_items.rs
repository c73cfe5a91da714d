//! Items and their preprocessing steps (spec §4.4, §6). Item `delay` is
//! stored post-macro-expansion in CC (see `cc::model::Item`), so the row
//! pulled from the store is expanded against the host's macro scope before
//! comparison — otherwise a macro value edit would never be detected as an
//! item change.

use super::changeset::{ChangeTag, diff};
use crate::cc::ConfigCache;
use crate::store::Store;
use anyhow::Result;
use std::collections::HashMap;

pub fn sync(cc: &ConfigCache, store: &Store) -> Result<usize> {
    let mut applied = 0;

    let mut fresh_items = store.fetch_items()?;
    for item in &mut fresh_items {
        let expanded = cc.expand_user_macros(&item.delay, &[item.hostid]);
        item.delay = cc.intern(&expanded);
    }

    for change in diff(fresh_items, cc.snapshot_items(), |i| i.itemid) {
        applied += 1;
        match change.tag {
            ChangeTag::Added | ChangeTag::Updated => cc.upsert_item(change.row.unwrap()),
            ChangeTag::Removed => cc.remove_item(change.key),
        }
    }

    let preproc = store.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT itemid, item_preprocid, type, params, step FROM item_preproc ORDER BY itemid, step",
        )?;
        let rows: Vec<(u64, u64, i64, String, i64)> = stmt
            .query_map([], |r| {
                Ok((
                    r.get::<_, i64>(0)? as u64,
                    r.get::<_, i64>(1)? as u64,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(rows)
    })?;

    let mut by_item: HashMap<u64, Vec<crate::cc::model::ItemPreprocStep>> = HashMap::new();
    for (itemid, step_id, ty, params, step) in preproc {
        let step_type = match ty {
            0 => crate::cc::model::PreprocStepType::Multiplier,
            1 => crate::cc::model::PreprocStepType::Trim,
            2 => crate::cc::model::PreprocStepType::RegexSub,
            3 => crate::cc::model::PreprocStepType::JsonPath,
            _ => crate::cc::model::PreprocStepType::ValidateRange,
        };
        by_item.entry(itemid).or_default().push(crate::cc::model::ItemPreprocStep {
            step_id,
            itemid,
            step_type,
            params: cc.intern(&params),
            step_index: step as u16,
        });
    }
    for (itemid, steps) in by_item {
        applied += 1;
        cc.set_item_preproc(itemid, steps);
    }

    Ok(applied)
}
