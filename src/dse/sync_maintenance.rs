//! Maintenance windows and host inventory (spec §4.4, §6). Maintenance's
//! host/group/tag/period relations are denormalized straight into the
//! `Maintenance` struct by `Store::fetch_maintenances`, so the whole row
//! diffs as one unit rather than as separate pair-aggregate sets — a
//! simplification documented in DESIGN.md.

use super::changeset::{ChangeTag, diff};
use crate::cc::ConfigCache;
use crate::cc::model::InventoryValue;
use crate::store::Store;
use anyhow::Result;

pub fn sync(cc: &ConfigCache, store: &Store) -> Result<usize> {
    let mut applied = 0;

    let fresh = store.fetch_maintenances()?;
    for change in diff(fresh, cc.snapshot_maintenances(), |m| m.maintenanceid) {
        applied += 1;
        match change.tag {
            ChangeTag::Added | ChangeTag::Updated => cc.upsert_maintenance(change.row.unwrap()),
            ChangeTag::Removed => cc.remove_maintenance(change.key),
        }
    }

    for inv in store.fetch_host_inventory()? {
        applied += 1;
        cc.set_host_inventory_mode(inv.hostid, inv.mode);
        for (field, value) in inv.fields {
            cc.apply_inventory_values(vec![InventoryValue {
                hostid: inv.hostid,
                field,
                value,
            }]);
        }
    }

    Ok(applied)
}
