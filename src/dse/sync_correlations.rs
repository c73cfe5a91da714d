//! Event correlation rules: conditions and operations (spec §4.4, §6).

use super::changeset::{ChangeTag, diff};
use crate::cc::ConfigCache;
use crate::store::Store;
use anyhow::Result;

pub fn sync(cc: &ConfigCache, store: &Store) -> Result<usize> {
    let mut applied = 0;

    let fresh = store.fetch_correlations()?;
    for change in diff(fresh, cc.snapshot_correlations(), |c| c.correlationid) {
        applied += 1;
        match change.tag {
            ChangeTag::Added | ChangeTag::Updated => cc.upsert_correlation(change.row.unwrap()),
            ChangeTag::Removed => cc.remove_correlation(change.key),
        }
    }

    for condition in store.fetch_corr_conditions()? {
        applied += 1;
        cc.set_corr_condition(condition, true);
    }

    for operation in store.fetch_corr_operations()? {
        applied += 1;
        cc.set_corr_operation(operation, true);
    }

    Ok(applied)
}
