//! Global and per-host user macros (spec §4.4, §6).

use super::changeset::{ChangeTag, diff};
use crate::cc::ConfigCache;
use crate::store::Store;
use anyhow::Result;

pub fn sync(cc: &ConfigCache, store: &Store) -> Result<usize> {
    let mut applied = 0;

    let fresh_global = store.fetch_global_macros()?;
    for change in diff(fresh_global, cc.snapshot_global_macros(), |m| m.globalmacroid) {
        applied += 1;
        match change.tag {
            ChangeTag::Added | ChangeTag::Updated => cc.set_global_macro(change.row.unwrap(), true),
            ChangeTag::Removed => {
                let stub = crate::cc::model::GlobalMacro {
                    globalmacroid: change.key,
                    name: "".into(),
                    context: None,
                    value: "".into(),
                };
                cc.set_global_macro(stub, false);
            }
        }
    }

    let fresh_host = store.fetch_host_macros()?;
    for change in diff(fresh_host, cc.snapshot_host_macros(), |m| m.hostmacroid) {
        applied += 1;
        match change.tag {
            ChangeTag::Added | ChangeTag::Updated => cc.set_host_macro(change.row.unwrap(), true),
            ChangeTag::Removed => {
                let stub = crate::cc::model::HostMacro {
                    hostmacroid: change.key,
                    hostid: 0,
                    name: "".into(),
                    context: None,
                    value: "".into(),
                };
                cc.set_host_macro(stub, false);
            }
        }
    }

    Ok(applied)
}
