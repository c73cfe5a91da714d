//! Configuration Cache entity model (spec §3). Every struct here is a
//! pointer-stable, cloneable snapshot: `ConfigCache::get_*` hands out clones,
//! never live references, so collector/syncer threads can read without
//! holding the writer mutex any longer than the copy takes.

use std::sync::Arc;

pub type Id = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    Monitored,
    NotMonitored,
    ProxyActive,
    ProxyPassive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaintenanceStatus {
    #[default]
    NotInMaintenance,
    InMaintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceType {
    Agent,
    Snmp,
    Ipmi,
    Jmx,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceAvailability {
    pub state_normal: bool,
    pub errors_from: i64,
    pub disable_until: i64,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Host {
    pub hostid: Id,
    pub host: Arc<str>,
    pub status: HostStatus,
    pub proxy_hostid: Option<Id>,
    pub maintenance_status: MaintenanceStatus,
    pub maintenanceid: Option<Id>,
    pub tls_connect: u8,
    pub tls_accept: u8,
    pub tls_psk_identity: Option<Arc<str>>,
    pub ipmi_authtype: i32,
    pub ipmi_username: Option<Arc<str>>,
    pub ipmi_password: Option<Arc<str>>,
    pub availability: InterfaceAvailability,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostGroup {
    pub groupid: Id,
    pub name: Arc<str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostTemplateLink {
    pub hostid: Id,
    pub templateid: Id,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    pub interfaceid: Id,
    pub hostid: Id,
    pub itype: InterfaceType,
    pub main: bool,
    pub useip: bool,
    pub ip: Arc<str>,
    pub dns: Arc<str>,
    pub port: Arc<str>,
    pub bulk: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Float,
    Unsigned,
    Str,
    Text,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Active,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Trapper,
    Simple,
    Snmp,
    Ipmi,
    Ssh,
    Telnet,
    Db,
    Jmx,
    HttpAgent,
    Calculated,
    Dependent,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemTypeParams {
    pub snmp_oid: Option<Arc<str>>,
    pub ipmi_sensor: Option<Arc<str>>,
    pub ssh_params: Option<Arc<str>>,
    pub db_params: Option<Arc<str>>,
    pub jmx_endpoint: Option<Arc<str>>,
    pub http_agent_url: Option<Arc<str>>,
    pub calculated_formula: Option<Arc<str>>,
    pub master_itemid: Option<Id>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub itemid: Id,
    pub hostid: Id,
    pub value_type: ValueType,
    pub status: ItemStatus,
    pub item_type: ItemType,
    pub key: Arc<str>,
    /// Post-macro-expansion delay, e.g. `"30"`. DSE's comparator uses this
    /// value, never the raw `{$MACRO}` text (spec §4.4).
    pub delay: Arc<str>,
    pub history_secs: i64,
    pub trends_secs: i64,
    pub interfaceid: Option<Id>,
    pub valuemapid: Option<Id>,
    pub units: Arc<str>,
    pub inventory_link: Option<u8>,
    pub type_params: ItemTypeParams,
    pub lastclock: i64,
    pub lastlogsize: i64,
    pub mtime: i64,
    pub state: ItemStatus2,
    pub error: Arc<str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus2 {
    Normal,
    NotSupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocStepType {
    Multiplier,
    Trim,
    RegexSub,
    JsonPath,
    ValidateRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemPreprocStep {
    pub step_id: Id,
    pub itemid: Id,
    pub step_type: PreprocStepType,
    pub params: Arc<str>,
    pub step_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMode {
    None,
    Expression,
    RecoveryExpression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerValueState {
    Ok,
    Problem,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerStatus {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub triggerid: Id,
    pub expression: Arc<str>,
    pub recovery_mode: RecoveryMode,
    pub recovery_expression: Arc<str>,
    pub correlation_mode: u8,
    pub correlation_tag: Arc<str>,
    pub severity: u8,
    pub status: TriggerStatus,
    pub value: TriggerValueState,
    pub last_change: i64,
    pub error: Arc<str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub functionid: Id,
    pub itemid: Id,
    pub triggerid: Id,
    pub name: Arc<str>,
    pub parameter: Arc<str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerDependency {
    pub triggerid_down: Id,
    pub triggerid_up: Id,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub owner_id: Id,
    pub tag: Arc<str>,
    pub value: Arc<str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalType {
    AndOr,
    And,
    Or,
    Custom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub actionid: Id,
    pub event_source: u8,
    pub eval_type: EvalType,
    pub formula: Arc<str>,
    /// Bitmask over {normal=1, recovery=2, acknowledge=4}, folded from the
    /// per-(action,recovery-flag) operation rows (spec §4.4).
    pub op_class_bitmap: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionCondition {
    pub conditionid: Id,
    pub actionid: Id,
    pub condition_type: u8,
    pub op: u8,
    pub value: Arc<str>,
    pub value2: Arc<str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub correlationid: Id,
    pub name: Arc<str>,
    pub eval_type: EvalType,
    pub formula: Arc<str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrCondition {
    pub corr_conditionid: Id,
    pub correlationid: Id,
    pub subtype: CorrConditionSubtype,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CorrConditionSubtype {
    Tag { tag: Arc<str> },
    TagValue { tag: Arc<str>, value: Arc<str> },
    Group { groupid: Id },
    TagPair { old_tag: Arc<str>, new_tag: Arc<str> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrOperation {
    pub corr_operationid: Id,
    pub correlationid: Id,
    pub op_type: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalMacro {
    pub globalmacroid: Id,
    pub name: Arc<str>,
    pub context: Option<Arc<str>>,
    pub value: Arc<str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostMacro {
    pub hostmacroid: Id,
    pub hostid: Id,
    pub name: Arc<str>,
    pub context: Option<Arc<str>>,
    pub value: Arc<str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceType {
    WithData,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagsEvalType {
    AndOr,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimePeriod {
    pub timeperiodid: Id,
    pub period_type: u8,
    pub every: i32,
    pub start_date: i64,
    pub period_secs: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Maintenance {
    pub maintenanceid: Id,
    pub name: Arc<str>,
    pub maintenance_type: MaintenanceType,
    pub active_since: i64,
    pub active_until: i64,
    pub tags_evaltype: TagsEvalType,
    pub host_ids: Vec<Id>,
    pub group_ids: Vec<Id>,
    pub tags: Vec<Tag>,
    pub periods: Vec<TimePeriod>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InventoryMode {
    #[default]
    Disabled,
    Manual,
    Automatic,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostInventory {
    pub hostid: Id,
    pub mode: InventoryMode,
    pub fields: std::collections::BTreeMap<Arc<str>, Arc<str>>,
}

/// A single "slot" from `apply_inventory_values` — one field write computed
/// by HCS for a host in automatic-inventory mode (spec §4.5.3 step 4).
#[derive(Debug, Clone)]
pub struct InventoryValue {
    pub hostid: Id,
    pub field: Arc<str>,
    pub value: Arc<str>,
}

/// Write-back of HCS-computed state onto an `Item` (spec §4.3
/// `apply_item_diff`).
#[derive(Debug, Clone, Default)]
pub struct ItemDiff {
    pub itemid: Id,
    pub lastclock: Option<i64>,
    pub lastlogsize: Option<i64>,
    pub mtime: Option<i64>,
    pub state: Option<ItemStatus2>,
    pub error: Option<Arc<str>>,
}

/// Write-back of a trigger re-evaluation (spec §4.3 `apply_trigger_diff`).
#[derive(Debug, Clone)]
pub struct TriggerDiff {
    pub triggerid: Id,
    pub value: TriggerValueState,
    pub last_change: i64,
    pub error: Arc<str>,
}
