//! Configuration Cache (spec §4.3): the authoritative in-memory model of
//! every entity in spec §3. All mutation goes through DSE under a single
//! writer mutex; readers use the same mutex (spec is explicit there is no
//! lock-free read path). `ConfigCache` therefore wraps one `Mutex<Inner>` —
//! matching the teacher's `ConfigDb`, which protects its whole connection
//! the same way rather than pretending fine-grained locking helps when
//! every operation is already fast.

pub mod macros;
pub mod model;
pub mod trigger_lock;

use crate::ap::{StableMap, StringPool};
use model::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use trigger_lock::TriggerLocks;

#[derive(Default)]
struct Inner {
    hosts: StableMap<Id, Host>,
    host_groups: StableMap<Id, HostGroup>,
    group_hosts: HashMap<Id, HashSet<Id>>,
    host_template_links: HashSet<HostTemplateLink>,
    interfaces: StableMap<Id, Interface>,
    host_interfaces: HashMap<Id, Vec<Id>>,
    items: StableMap<Id, Item>,
    host_items: HashMap<Id, Vec<Id>>,
    item_preproc: HashMap<Id, Vec<ItemPreprocStep>>,
    triggers: StableMap<Id, Trigger>,
    functions: StableMap<Id, Function>,
    item_functions: HashMap<Id, Vec<Id>>,
    trigger_functions: HashMap<Id, Vec<Id>>,
    trigger_dependencies: HashSet<TriggerDependency>,
    trigger_tags: HashMap<Id, Vec<Tag>>,
    actions: StableMap<Id, Action>,
    action_conditions: HashMap<Id, Vec<ActionCondition>>,
    correlations: StableMap<Id, Correlation>,
    corr_conditions: HashMap<Id, Vec<CorrCondition>>,
    corr_operations: HashMap<Id, Vec<CorrOperation>>,
    global_macros: Vec<GlobalMacro>,
    host_macros: Vec<HostMacro>,
    maintenances: StableMap<Id, Maintenance>,
    host_inventory: HashMap<Id, HostInventory>,
    timer_next_check: HashMap<Id, i64>,
    strings: StringPool,
}

pub struct ConfigCache {
    inner: Mutex<Inner>,
    locks: TriggerLocks,
}

pub struct LockOutcome {
    pub locked: Vec<Id>,
    pub deferred: Vec<Id>,
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            locks: TriggerLocks::new(),
        }
    }

    /// Intern a string through CC's shared pool — the comparator-visible
    /// handle DSE's row comparisons rely on for pointer equality (spec §4.4).
    pub fn intern(&self, s: &str) -> Arc<str> {
        self.inner.lock().unwrap().strings.intern(s)
    }

    // ── bulk reads (spec §4.3) ──────────────────────────────────────────

    pub fn get_items_by_ids(&self, ids: &[Id]) -> Vec<(Id, Option<Item>)> {
        let inner = self.inner.lock().unwrap();
        ids.iter().map(|id| (*id, inner.items.get(id).cloned())).collect()
    }

    pub fn get_functions_by_ids(&self, ids: &[Id]) -> Vec<(Id, Option<Function>)> {
        let inner = self.inner.lock().unwrap();
        ids.iter()
            .map(|id| (*id, inner.functions.get(id).cloned()))
            .collect()
    }

    /// Triggers whose functions depend on any of `item_ids`. `_now` is kept
    /// in the signature per spec §4.3 but unused beyond documenting intent:
    /// the reference additionally restricts to triggers not already known
    /// problem-free with an unreachable recheck time, a refinement this
    /// rewrite does not model (see DESIGN.md).
    pub fn get_triggers_by_item_ids_and_timestamps(
        &self,
        item_ids: &[Id],
        _now: i64,
    ) -> Vec<Trigger> {
        let inner = self.inner.lock().unwrap();
        let mut trigger_ids: HashSet<Id> = HashSet::new();
        for itemid in item_ids {
            if let Some(fids) = inner.item_functions.get(itemid) {
                for fid in fids {
                    if let Some(f) = inner.functions.get(fid) {
                        trigger_ids.insert(f.triggerid);
                    }
                }
            }
        }
        trigger_ids
            .into_iter()
            .filter_map(|id| inner.triggers.get(&id).cloned())
            .collect()
    }

    pub fn get_triggers_by_ids(&self, ids: &[Id]) -> Vec<Trigger> {
        let inner = self.inner.lock().unwrap();
        ids.iter().filter_map(|id| inner.triggers.get(id).cloned()).collect()
    }

    pub fn get_hosts_by_item_ids(&self, item_ids: &[Id]) -> Vec<(Id, Option<Host>)> {
        let inner = self.inner.lock().unwrap();
        item_ids
            .iter()
            .map(|itemid| {
                let host = inner
                    .items
                    .get(itemid)
                    .and_then(|item| inner.hosts.get(&item.hostid).cloned());
                (*itemid, host)
            })
            .collect()
    }

    pub fn get_interface_for(&self, host_id: Id, item_id: Id) -> Option<Interface> {
        let inner = self.inner.lock().unwrap();
        let item = inner.items.get(&item_id)?;
        let interfaceid = item.interfaceid.or_else(|| {
            inner
                .host_interfaces
                .get(&host_id)
                .and_then(|ifaces| ifaces.first().copied())
        })?;
        inner.interfaces.get(&interfaceid).cloned()
    }

    /// Triggers whose timer-eval deadline is `<= now`, capped at `max`
    /// (spec §4.3). Timer-eligible triggers are ones referencing a
    /// `Calculated` item, since those need periodic re-evaluation
    /// independent of any history value arriving.
    pub fn get_timer_triggerids(&self, now: i64, max: usize) -> Vec<Id> {
        let inner = self.inner.lock().unwrap();
        let mut due: Vec<(i64, Id)> = inner
            .timer_next_check
            .iter()
            .filter(|(_, &next)| next <= now)
            .map(|(id, &next)| (next, *id))
            .collect();
        due.sort_unstable();
        due.truncate(max);
        due.into_iter().map(|(_, id)| id).collect()
    }

    pub fn schedule_timer_check(&self, triggerid: Id, next_check: i64) {
        self.inner
            .lock()
            .unwrap()
            .timer_next_check
            .insert(triggerid, next_check);
    }

    // ── trigger locking (spec §4.3, §4.5.4) ─────────────────────────────

    pub fn lock_triggers_by_history_items(&self, item_ids: Vec<Id>) -> LockOutcome {
        let inner = self.inner.lock().unwrap();
        let mut locked = Vec::with_capacity(item_ids.len());
        let mut deferred = Vec::new();
        for itemid in item_ids {
            let trigger_ids: Vec<Id> = inner
                .item_functions
                .get(&itemid)
                .map(|fids| {
                    fids.iter()
                        .filter_map(|fid| inner.functions.get(fid))
                        .map(|f| f.triggerid)
                        .collect()
                })
                .unwrap_or_default();
            if self.locks.try_lock_all(&trigger_ids) {
                locked.push(itemid);
            } else {
                deferred.push(itemid);
            }
        }
        LockOutcome { locked, deferred }
    }

    pub fn unlock_triggers(&self, trigger_ids: &[Id]) {
        self.locks.unlock(trigger_ids);
    }

    pub fn unlock_all_triggers(&self) {
        self.locks.unlock_all();
    }

    // ── write-back from HCS (spec §4.3) ─────────────────────────────────

    pub fn apply_item_diff(&self, diffs: Vec<ItemDiff>) {
        let mut inner = self.inner.lock().unwrap();
        for diff in diffs {
            if let Some(item) = inner.items.get_mut(&diff.itemid) {
                if let Some(v) = diff.lastclock {
                    item.lastclock = v;
                }
                if let Some(v) = diff.lastlogsize {
                    item.lastlogsize = v;
                }
                if let Some(v) = diff.mtime {
                    item.mtime = v;
                }
                if let Some(v) = diff.state {
                    item.state = v;
                }
                if let Some(v) = diff.error {
                    item.error = v;
                }
            }
        }
    }

    pub fn apply_trigger_diff(&self, diffs: Vec<TriggerDiff>) {
        let mut inner = self.inner.lock().unwrap();
        for diff in diffs {
            if let Some(t) = inner.triggers.get_mut(&diff.triggerid) {
                t.value = diff.value;
                t.last_change = diff.last_change;
                t.error = diff.error;
            }
        }
    }

    pub fn apply_inventory_values(&self, values: Vec<InventoryValue>) {
        let mut inner = self.inner.lock().unwrap();
        for v in values {
            let inv = inner
                .host_inventory
                .entry(v.hostid)
                .or_insert_with(|| HostInventory {
                    hostid: v.hostid,
                    mode: InventoryMode::Disabled,
                    fields: Default::default(),
                });
            inv.fields.insert(v.field, v.value);
        }
    }

    pub fn set_host_inventory_mode(&self, hostid: Id, mode: InventoryMode) {
        let mut inner = self.inner.lock().unwrap();
        let inv = inner.host_inventory.entry(hostid).or_insert_with(|| HostInventory {
            hostid,
            mode,
            fields: Default::default(),
        });
        inv.mode = mode;
    }

    // ── macro expansion (spec §4.3, §4.4) ───────────────────────────────

    pub fn expand_user_macros(&self, text: &str, host_ids: &[Id]) -> String {
        if !macros::MacroScope::has_macro(text) {
            return text.to_string();
        }
        let inner = self.inner.lock().unwrap();
        let scope = macros::MacroScope {
            host_ids,
            host_macros: &inner.host_macros,
            global_macros: &inner.global_macros,
        };
        scope.expand(text)
    }

    // ── DSE write surface ────────────────────────────────────────────────
    // Everything below is called only by `dse` while holding the writer
    // epoch; it is the applier half of spec §4.4's SELECT→compare→apply
    // cycle. Methods are idempotent upserts/removes so a retried cycle
    // after a transient failure cannot double-apply.

    pub fn upsert_host(&self, host: Host) {
        self.inner.lock().unwrap().hosts.insert(host.hostid, host);
    }

    pub fn remove_host(&self, hostid: Id) {
        let mut inner = self.inner.lock().unwrap();
        inner.hosts.remove(&hostid);
        inner.host_items.remove(&hostid);
        inner.host_interfaces.remove(&hostid);
        inner.host_inventory.remove(&hostid);
    }

    pub fn upsert_host_group(&self, group: HostGroup) {
        self.inner.lock().unwrap().host_groups.insert(group.groupid, group);
    }

    pub fn remove_host_group(&self, groupid: Id) {
        let mut inner = self.inner.lock().unwrap();
        inner.host_groups.remove(&groupid);
        inner.group_hosts.remove(&groupid);
    }

    pub fn set_group_membership(&self, groupid: Id, hostid: Id, present: bool) {
        let mut inner = self.inner.lock().unwrap();
        let set = inner.group_hosts.entry(groupid).or_default();
        if present {
            set.insert(hostid);
        } else {
            set.remove(&hostid);
        }
    }

    pub fn hosts_in_group(&self, groupid: Id) -> Vec<Id> {
        self.inner
            .lock()
            .unwrap()
            .group_hosts
            .get(&groupid)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn set_template_link(&self, link: HostTemplateLink, present: bool) {
        let mut inner = self.inner.lock().unwrap();
        if present {
            inner.host_template_links.insert(link);
        } else {
            inner.host_template_links.remove(&link);
        }
    }

    pub fn upsert_interface(&self, iface: Interface) {
        let mut inner = self.inner.lock().unwrap();
        let list = inner.host_interfaces.entry(iface.hostid).or_default();
        if !list.contains(&iface.interfaceid) {
            list.push(iface.interfaceid);
        }
        inner.interfaces.insert(iface.interfaceid, iface);
    }

    pub fn remove_interface(&self, interfaceid: Id) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(iface) = inner.interfaces.remove(&interfaceid) {
            if let Some(list) = inner.host_interfaces.get_mut(&iface.hostid) {
                list.retain(|id| *id != interfaceid);
            }
        }
    }

    pub fn upsert_item(&self, item: Item) {
        let mut inner = self.inner.lock().unwrap();
        let list = inner.host_items.entry(item.hostid).or_default();
        if !list.contains(&item.itemid) {
            list.push(item.itemid);
        }
        inner.items.insert(item.itemid, item);
    }

    pub fn remove_item(&self, itemid: Id) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(item) = inner.items.remove(&itemid) {
            if let Some(list) = inner.host_items.get_mut(&item.hostid) {
                list.retain(|id| *id != itemid);
            }
        }
        inner.item_preproc.remove(&itemid);
    }

    pub fn set_item_preproc(&self, itemid: Id, steps: Vec<ItemPreprocStep>) {
        self.inner.lock().unwrap().item_preproc.insert(itemid, steps);
    }

    pub fn upsert_trigger(&self, trigger: Trigger) {
        self.inner.lock().unwrap().triggers.insert(trigger.triggerid, trigger);
    }

    pub fn remove_trigger(&self, triggerid: Id) {
        let mut inner = self.inner.lock().unwrap();
        inner.triggers.remove(&triggerid);
        inner.trigger_functions.remove(&triggerid);
        inner.trigger_tags.remove(&triggerid);
        inner.timer_next_check.remove(&triggerid);
    }

    pub fn upsert_function(&self, function: Function) {
        let mut inner = self.inner.lock().unwrap();
        let by_item = inner.item_functions.entry(function.itemid).or_default();
        if !by_item.contains(&function.functionid) {
            by_item.push(function.functionid);
        }
        let by_trigger = inner.trigger_functions.entry(function.triggerid).or_default();
        if !by_trigger.contains(&function.functionid) {
            by_trigger.push(function.functionid);
        }
        inner.functions.insert(function.functionid, function);
    }

    pub fn remove_function(&self, functionid: Id) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(f) = inner.functions.remove(&functionid) {
            if let Some(list) = inner.item_functions.get_mut(&f.itemid) {
                list.retain(|id| *id != functionid);
            }
            if let Some(list) = inner.trigger_functions.get_mut(&f.triggerid) {
                list.retain(|id| *id != functionid);
            }
        }
    }

    pub fn set_trigger_dependency(&self, dep: TriggerDependency, present: bool) {
        let mut inner = self.inner.lock().unwrap();
        if present {
            inner.trigger_dependencies.insert(dep);
        } else {
            inner.trigger_dependencies.remove(&dep);
        }
    }

    pub fn upstream_dependencies(&self, triggerid: Id) -> Vec<Id> {
        self.inner
            .lock()
            .unwrap()
            .trigger_dependencies
            .iter()
            .filter(|d| d.triggerid_down == triggerid)
            .map(|d| d.triggerid_up)
            .collect()
    }

    pub fn set_trigger_tag(&self, tag: Tag, present: bool) {
        let mut inner = self.inner.lock().unwrap();
        let list = inner.trigger_tags.entry(tag.owner_id).or_default();
        if present {
            if !list.iter().any(|t| t.tag == tag.tag && t.value == tag.value) {
                list.push(tag);
            }
        } else {
            list.retain(|t| !(t.tag == tag.tag && t.value == tag.value));
        }
    }

    pub fn upsert_action(&self, action: Action) {
        self.inner.lock().unwrap().actions.insert(action.actionid, action);
    }

    pub fn remove_action(&self, actionid: Id) {
        let mut inner = self.inner.lock().unwrap();
        inner.actions.remove(&actionid);
        inner.action_conditions.remove(&actionid);
    }

    /// Fold in the per-(action,recovery-flag) bitmap computed by DSE (spec
    /// §4.4 "Action op-class bitmap"); a no-op update is skipped by the
    /// caller before this is even invoked, matching "emit an update only
    /// when the bitmap changed".
    pub fn set_action_op_class_bitmap(&self, actionid: Id, bitmap: u8) {
        if let Some(action) = self.inner.lock().unwrap().actions.get_mut(&actionid) {
            action.op_class_bitmap = bitmap;
        }
    }

    pub fn set_action_condition(&self, condition: ActionCondition, present: bool) {
        let mut inner = self.inner.lock().unwrap();
        let list = inner.action_conditions.entry(condition.actionid).or_default();
        if present {
            list.retain(|c| c.conditionid != condition.conditionid);
            list.push(condition);
        } else {
            list.retain(|c| c.conditionid != condition.conditionid);
        }
    }

    pub fn upsert_correlation(&self, corr: Correlation) {
        self.inner.lock().unwrap().correlations.insert(corr.correlationid, corr);
    }

    pub fn remove_correlation(&self, correlationid: Id) {
        let mut inner = self.inner.lock().unwrap();
        inner.correlations.remove(&correlationid);
        inner.corr_conditions.remove(&correlationid);
        inner.corr_operations.remove(&correlationid);
    }

    pub fn set_corr_condition(&self, condition: CorrCondition, present: bool) {
        let mut inner = self.inner.lock().unwrap();
        let list = inner.corr_conditions.entry(condition.correlationid).or_default();
        list.retain(|c| c.corr_conditionid != condition.corr_conditionid);
        if present {
            list.push(condition);
        }
    }

    pub fn set_corr_operation(&self, op: CorrOperation, present: bool) {
        let mut inner = self.inner.lock().unwrap();
        let list = inner.corr_operations.entry(op.correlationid).or_default();
        list.retain(|o| o.corr_operationid != op.corr_operationid);
        if present {
            list.push(op);
        }
    }

    pub fn set_global_macro(&self, macro_: GlobalMacro, present: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.global_macros.retain(|m| m.globalmacroid != macro_.globalmacroid);
        if present {
            inner.global_macros.push(macro_);
        }
    }

    pub fn set_host_macro(&self, macro_: HostMacro, present: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.host_macros.retain(|m| m.hostmacroid != macro_.hostmacroid);
        if present {
            inner.host_macros.push(macro_);
        }
    }

    pub fn upsert_maintenance(&self, maintenance: Maintenance) {
        self.inner
            .lock()
            .unwrap()
            .maintenances
            .insert(maintenance.maintenanceid, maintenance);
    }

    pub fn remove_maintenance(&self, maintenanceid: Id) {
        self.inner.lock().unwrap().maintenances.remove(&maintenanceid);
    }

    pub fn host_inventory(&self, hostid: Id) -> Option<HostInventory> {
        self.inner.lock().unwrap().host_inventory.get(&hostid).cloned()
    }

    /// Periodically release interned strings nothing references anymore
    /// (spec §3 invariant: "refcount reaching zero removes the string").
    pub fn gc_string_pool(&self) {
        self.inner.lock().unwrap().strings.gc();
    }

    // ── snapshots for DSE's comparator phase (spec §4.4) ────────────────
    // `diff` needs "what CC currently holds" as an owned `HashMap` to
    // compare the freshly selected rows against; these clone the relevant
    // store out from under the writer mutex and hand back ordinary owned
    // data so the comparison itself runs lock-free.

    pub fn snapshot_hosts(&self) -> HashMap<Id, Host> {
        let inner = self.inner.lock().unwrap();
        inner.hosts.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    pub fn snapshot_host_groups(&self) -> HashMap<Id, HostGroup> {
        let inner = self.inner.lock().unwrap();
        inner.host_groups.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    pub fn snapshot_interfaces(&self) -> HashMap<Id, Interface> {
        let inner = self.inner.lock().unwrap();
        inner.interfaces.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    pub fn snapshot_items(&self) -> HashMap<Id, Item> {
        let inner = self.inner.lock().unwrap();
        inner.items.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    pub fn snapshot_triggers(&self) -> HashMap<Id, Trigger> {
        let inner = self.inner.lock().unwrap();
        inner.triggers.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    pub fn snapshot_functions(&self) -> HashMap<Id, Function> {
        let inner = self.inner.lock().unwrap();
        inner.functions.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    pub fn snapshot_actions(&self) -> HashMap<Id, Action> {
        let inner = self.inner.lock().unwrap();
        inner.actions.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    pub fn snapshot_correlations(&self) -> HashMap<Id, Correlation> {
        let inner = self.inner.lock().unwrap();
        inner.correlations.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    pub fn snapshot_maintenances(&self) -> HashMap<Id, Maintenance> {
        let inner = self.inner.lock().unwrap();
        inner.maintenances.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    pub fn snapshot_group_membership(&self) -> HashSet<(Id, Id)> {
        let inner = self.inner.lock().unwrap();
        inner
            .group_hosts
            .iter()
            .flat_map(|(gid, hosts)| hosts.iter().map(move |hid| (*gid, *hid)))
            .collect()
    }

    pub fn snapshot_host_template_links(&self) -> HashSet<(Id, Id)> {
        let inner = self.inner.lock().unwrap();
        inner
            .host_template_links
            .iter()
            .map(|link| (link.hostid, link.templateid))
            .collect()
    }

    pub fn snapshot_trigger_dependencies(&self) -> HashSet<TriggerDependency> {
        self.inner.lock().unwrap().trigger_dependencies.clone()
    }

    pub fn snapshot_trigger_tags(&self) -> HashSet<(Id, Arc<str>, Arc<str>)> {
        let inner = self.inner.lock().unwrap();
        inner
            .trigger_tags
            .values()
            .flatten()
            .map(|t| (t.owner_id, t.tag.clone(), t.value.clone()))
            .collect()
    }

    pub fn snapshot_action_conditions(&self) -> HashMap<Id, ActionCondition> {
        let inner = self.inner.lock().unwrap();
        inner
            .action_conditions
            .values()
            .flatten()
            .map(|c| (c.conditionid, c.clone()))
            .collect()
    }

    pub fn remove_action_condition(&self, conditionid: Id) {
        let mut inner = self.inner.lock().unwrap();
        for list in inner.action_conditions.values_mut() {
            list.retain(|c| c.conditionid != conditionid);
        }
    }

    pub fn snapshot_global_macros(&self) -> HashMap<Id, GlobalMacro> {
        let inner = self.inner.lock().unwrap();
        inner
            .global_macros
            .iter()
            .map(|m| (m.globalmacroid, m.clone()))
            .collect()
    }

    pub fn snapshot_host_macros(&self) -> HashMap<Id, HostMacro> {
        let inner = self.inner.lock().unwrap();
        inner.host_macros.iter().map(|m| (m.hostmacroid, m.clone())).collect()
    }

    pub fn counts(&self) -> CacheCounts {
        let inner = self.inner.lock().unwrap();
        CacheCounts {
            hosts: inner.hosts.len(),
            host_groups: inner.host_groups.len(),
            items: inner.items.len(),
            triggers: inner.triggers.len(),
            functions: inner.functions.len(),
            maintenances: inner.maintenances.len(),
            interned_strings: inner.strings.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheCounts {
    pub hosts: usize,
    pub host_groups: usize,
    pub items: usize,
    pub triggers: usize,
    pub functions: usize,
    pub maintenances: usize,
    pub interned_strings: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn host(id: Id) -> Host {
        Host {
            hostid: id,
            host: Arc::from("h"),
            status: HostStatus::Monitored,
            proxy_hostid: None,
            maintenance_status: MaintenanceStatus::NotInMaintenance,
            maintenanceid: None,
            tls_connect: 1,
            tls_accept: 1,
            tls_psk_identity: None,
            ipmi_authtype: -1,
            ipmi_username: None,
            ipmi_password: None,
            availability: InterfaceAvailability::default(),
        }
    }

    fn item(id: Id, hostid: Id) -> Item {
        Item {
            itemid: id,
            hostid,
            value_type: ValueType::Float,
            status: ItemStatus::Active,
            item_type: ItemType::Trapper,
            key: Arc::from("k"),
            delay: Arc::from("30"),
            history_secs: 3600,
            trends_secs: 86400,
            interfaceid: None,
            valuemapid: None,
            units: Arc::from(""),
            inventory_link: None,
            type_params: ItemTypeParams::default(),
            lastclock: 0,
            lastlogsize: 0,
            mtime: 0,
            state: ItemStatus2::Normal,
            error: Arc::from(""),
        }
    }

    #[test]
    fn item_host_chain_resolves() {
        let cc = ConfigCache::new();
        cc.upsert_host(host(1));
        cc.upsert_item(item(100, 1));
        let hosts = cc.get_hosts_by_item_ids(&[100]);
        assert_eq!(hosts[0].1.as_ref().unwrap().hostid, 1);
    }

    #[test]
    fn removing_host_tears_down_item_index_first_avoids_dangling() {
        let cc = ConfigCache::new();
        cc.upsert_host(host(1));
        cc.upsert_item(item(100, 1));
        cc.remove_item(100);
        cc.remove_host(1);
        assert!(cc.get_items_by_ids(&[100])[0].1.is_none());
        assert!(cc.get_hosts_by_item_ids(&[100])[0].1.is_none());
    }

    #[test]
    fn lock_triggers_is_all_or_nothing_per_item() {
        let cc = ConfigCache::new();
        cc.upsert_function(Function {
            functionid: 1,
            itemid: 100,
            triggerid: 10,
            name: Arc::from("avg"),
            parameter: Arc::from("5m"),
        });
        let outcome = cc.lock_triggers_by_history_items(vec![100]);
        assert_eq!(outcome.locked, vec![100]);

        // A second attempt while still locked must defer, not partially lock.
        let outcome2 = cc.lock_triggers_by_history_items(vec![100]);
        assert!(outcome2.locked.is_empty());
        assert_eq!(outcome2.deferred, vec![100]);

        cc.unlock_triggers(&[10]);
        let outcome3 = cc.lock_triggers_by_history_items(vec![100]);
        assert_eq!(outcome3.locked, vec![100]);
    }
}
