//! Actions, their conditions, and the op-class bitmap folded from the
//! `operations` table (spec §4.4 "Action op-class bitmap").

use super::changeset::{ChangeTag, diff};
use crate::cc::ConfigCache;
use crate::store::Store;
use anyhow::Result;
use std::collections::HashMap;

const BIT_NORMAL: u8 = 1;
const BIT_RECOVERY: u8 = 2;

pub fn sync(cc: &ConfigCache, store: &Store) -> Result<usize> {
    let mut applied = 0;

    let fresh_actions = store.fetch_actions()?;
    for change in diff(fresh_actions, cc.snapshot_actions(), |a| a.actionid) {
        applied += 1;
        match change.tag {
            ChangeTag::Added | ChangeTag::Updated => cc.upsert_action(change.row.unwrap()),
            ChangeTag::Removed => cc.remove_action(change.key),
        }
    }

    let mut bitmaps: HashMap<u64, u8> = HashMap::new();
    for (actionid, recovery) in store.fetch_action_operation_flags()? {
        let bit = if recovery { BIT_RECOVERY } else { BIT_NORMAL };
        *bitmaps.entry(actionid).or_insert(0) |= bit;
    }
    for (actionid, bitmap) in bitmaps {
        applied += 1;
        cc.set_action_op_class_bitmap(actionid, bitmap);
    }

    let fresh_conditions = store.fetch_action_conditions()?;
    for change in diff(fresh_conditions, cc.snapshot_action_conditions(), |c| c.conditionid) {
        applied += 1;
        match change.tag {
            ChangeTag::Added | ChangeTag::Updated => cc.set_action_condition(change.row.unwrap(), true),
            ChangeTag::Removed => cc.remove_action_condition(change.key),
        }
    }

    Ok(applied)
}
