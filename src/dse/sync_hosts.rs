//! Hosts, host groups, group membership and interfaces (spec §4.4, §6).

use super::changeset::{ChangeTag, diff};
use crate::cc::ConfigCache;
use crate::store::Store;
use anyhow::Result;

pub fn sync(cc: &ConfigCache, store: &Store) -> Result<usize> {
    let mut applied = 0;

    let fresh_groups = store.fetch_host_groups()?;
    for change in diff(fresh_groups, cc.snapshot_host_groups(), |g| g.groupid) {
        applied += 1;
        match change.tag {
            ChangeTag::Added | ChangeTag::Updated => cc.upsert_host_group(change.row.unwrap()),
            ChangeTag::Removed => cc.remove_host_group(change.key),
        }
    }

    let fresh_hosts = store.fetch_hosts()?;
    for change in diff(fresh_hosts, cc.snapshot_hosts(), |h| h.hostid) {
        applied += 1;
        match change.tag {
            ChangeTag::Added | ChangeTag::Updated => cc.upsert_host(change.row.unwrap()),
            ChangeTag::Removed => cc.remove_host(change.key),
        }
    }

    // `(groupid, hostid)` pairs, matching `snapshot_group_membership`'s order.
    let fresh_membership: std::collections::HashSet<(u64, u64)> = store
        .fetch_group_membership()?
        .into_iter()
        .map(|(hostid, groupid)| (groupid, hostid))
        .collect();
    let current_membership = cc.snapshot_group_membership();
    for (groupid, hostid) in fresh_membership.difference(&current_membership).cloned().collect::<Vec<_>>() {
        applied += 1;
        cc.set_group_membership(groupid, hostid, true);
    }
    for (groupid, hostid) in current_membership.difference(&fresh_membership).cloned().collect::<Vec<_>>() {
        applied += 1;
        cc.set_group_membership(groupid, hostid, false);
    }

    // `(hostid, templateid)` pairs, same add/remove-by-set-difference shape
    // as group membership above.
    let fresh_links: std::collections::HashSet<(u64, u64)> =
        store.fetch_host_template_links()?.into_iter().collect();
    let current_links = cc.snapshot_host_template_links();
    for (hostid, templateid) in fresh_links.difference(&current_links).cloned().collect::<Vec<_>>() {
        applied += 1;
        cc.set_template_link(crate::cc::model::HostTemplateLink { hostid, templateid }, true);
    }
    for (hostid, templateid) in current_links.difference(&fresh_links).cloned().collect::<Vec<_>>() {
        applied += 1;
        cc.set_template_link(crate::cc::model::HostTemplateLink { hostid, templateid }, false);
    }

    let fresh_interfaces = store.fetch_interfaces()?;
    for change in diff(fresh_interfaces, cc.snapshot_interfaces(), |i| i.interfaceid) {
        applied += 1;
        match change.tag {
            ChangeTag::Added | ChangeTag::Updated => cc.upsert_interface(change.row.unwrap()),
            ChangeTag::Removed => cc.remove_interface(change.key),
        }
    }

    Ok(applied)
}
