//! The relational store (spec §6): a single SQLite connection behind a
//! mutex, mirroring the teacher's `ConfigDb` — one `Store` owns schema
//! migration and every query, callers never see the `Connection` directly.
//!
//! DSE uses the `fetch_*` methods as the "SELECT" half of its sync cycle;
//! HCS uses the `insert_*`/`flush_*` methods to commit history, trends and
//! derived events. `ids` issues primary keys for rows HCS originates
//! (events, alerts) through the same `IdAllocator` DSE would use for
//! anything it itself needs to insert.

pub mod schema;

use crate::cc::model::*;
use crate::error::CoreError;
use crate::ids::IdAllocator;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct Store {
    conn: Mutex<Connection>,
    pub ids: IdAllocator,
}

/// One history row queued for a batch commit. `table` names the per-type
/// server history table it belongs in; proxy-mode commits ignore it and
/// route every row to `proxy_history` instead, carrying `flags` along so
/// the upstream server can tell a real sample from a novalue/meta marker.
pub struct HistoryRow {
    pub table: &'static str,
    pub itemid: Id,
    pub clock: i64,
    pub ns: i64,
    pub flags: i32,
    pub value: HistoryRowValue,
}

pub enum HistoryRowValue {
    Scalar(String),
    Log {
        timestamp: i64,
        source: String,
        severity: i32,
        logeventid: i64,
        value: String,
    },
}

impl HistoryRowValue {
    fn as_text(&self) -> &str {
        match self {
            HistoryRowValue::Scalar(s) => s,
            HistoryRowValue::Log { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrendRow {
    pub table: &'static str,
    pub itemid: Id,
    pub clock: i64,
    pub num: i64,
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

const TRANSACTION_RETRIES: u32 = 3;

/// `SQLITE_BUSY`/`SQLITE_LOCKED` are the local stand-in for spec §7's
/// `DB_DOWN`: the store is momentarily unreachable, not broken.
fn is_db_down(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
    )
}

fn exec_insert_history_value(
    conn: &Connection,
    table: &str,
    itemid: Id,
    clock: i64,
    ns: i64,
    value: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        &format!("INSERT INTO {table} (itemid, clock, ns, value) VALUES (?1, ?2, ?3, ?4)"),
        params![itemid as i64, clock, ns, value],
    )?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn exec_insert_history_log(
    conn: &Connection,
    itemid: Id,
    clock: i64,
    ns: i64,
    timestamp: i64,
    source: &str,
    severity: i32,
    logeventid: i64,
    value: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO history_log (itemid, clock, ns, timestamp, source, severity, logeventid, value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![itemid as i64, clock, ns, timestamp, source, severity, logeventid, value],
    )?;
    Ok(())
}

fn exec_insert_proxy_history(
    conn: &Connection,
    itemid: Id,
    clock: i64,
    ns: i64,
    value: &str,
    flags: i32,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO proxy_history (itemid, clock, ns, value, flags) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![itemid as i64, clock, ns, value, flags],
    )?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn exec_upsert_trend(
    conn: &Connection,
    table: &str,
    itemid: Id,
    clock: i64,
    num: i64,
    min: f64,
    avg: f64,
    max: f64,
) -> rusqlite::Result<()> {
    let existing: Option<(i64, f64, f64, f64)> = conn
        .query_row(
            &format!(
                "SELECT num, value_min, value_avg, value_max FROM {table} WHERE itemid = ?1 AND clock = ?2"
            ),
            params![itemid as i64, clock],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?;
    match existing {
        None => {
            conn.execute(
                &format!(
                    "INSERT INTO {table} (itemid, clock, num, value_min, value_avg, value_max)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                ),
                params![itemid as i64, clock, num, min, avg, max],
            )?;
        }
        Some((prev_num, prev_min, prev_avg, prev_max)) => {
            let merged_num = prev_num + num;
            let merged_min = prev_min.min(min);
            let merged_max = prev_max.max(max);
            let merged_avg = (prev_avg * prev_num as f64 + avg * num as f64) / merged_num as f64;
            conn.execute(
                &format!(
                    "UPDATE {table} SET num = ?3, value_min = ?4, value_avg = ?5, value_max = ?6
                     WHERE itemid = ?1 AND clock = ?2"
                ),
                params![itemid as i64, clock, merged_num, merged_min, merged_avg, merged_max],
            )?;
        }
    }
    Ok(())
}

fn exec_insert_event(
    conn: &Connection,
    eventid: Id,
    source: u8,
    object: u8,
    objectid: Id,
    clock: i64,
    value: i32,
    severity: u8,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO events (eventid, source, object, objectid, clock, value, severity)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![eventid as i64, source, object, objectid as i64, clock, value, severity],
    )?;
    Ok(())
}

/// Persist an item's runtime state (`lastclock`/`lastlogsize`/`mtime`/
/// `state`/`error`, spec §4.5.3 step 5). Fields left `None` in `diff` keep
/// their current stored value rather than being clobbered.
fn exec_update_item(conn: &Connection, diff: &ItemDiff) -> rusqlite::Result<()> {
    let state = diff.state.map(|s| match s {
        ItemStatus2::Normal => 0i64,
        ItemStatus2::NotSupported => 1i64,
    });
    conn.execute(
        "UPDATE items SET
            lastclock = COALESCE(?2, lastclock),
            lastlogsize = COALESCE(?3, lastlogsize),
            mtime = COALESCE(?4, mtime),
            state = COALESCE(?5, state),
            error = COALESCE(?6, error)
         WHERE itemid = ?1",
        params![
            diff.itemid as i64,
            diff.lastclock,
            diff.lastlogsize,
            diff.mtime,
            state,
            diff.error.as_deref(),
        ],
    )?;
    Ok(())
}

impl Store {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(schema::DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            ids: IdAllocator::new(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(schema::DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            ids: IdAllocator::new(),
        })
    }

    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }

    /// Run `f` inside a transaction, retrying from `BEGIN` a handful of
    /// times when the store reports itself busy/locked (spec §4.5.3 step 5,
    /// §7 `DB_DOWN`). The cache is never touched here — callers apply their
    /// in-memory update only after this returns `Ok`.
    fn with_retried_transaction<T>(&self, mut f: impl FnMut(&Connection) -> Result<T>) -> Result<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;
            match f(&tx) {
                Ok(value) => {
                    tx.commit()?;
                    return Ok(value);
                }
                Err(e) => {
                    let retryable = e
                        .downcast_ref::<rusqlite::Error>()
                        .map(is_db_down)
                        .unwrap_or(false);
                    if retryable && attempt < TRANSACTION_RETRIES {
                        drop(tx);
                        drop(conn);
                        tracing::warn!("store: transaction failed ({e}), retrying (attempt {attempt})");
                        std::thread::sleep(Duration::from_millis(100 * attempt as u64));
                        continue;
                    }
                    return Err(CoreError::DbDown(e.to_string()).into());
                }
            }
        }
    }

    pub fn next_id(&self, table: &'static str, id_column: &str) -> Result<Id> {
        let conn = self.conn.lock().unwrap();
        self.ids.next_id(&conn, table, id_column)
    }

    // ── reads: configuration entities (spec §4.4 SELECT phase) ──────────

    pub fn fetch_host_groups(&self) -> Result<Vec<HostGroup>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT groupid, name FROM hstgrp")?;
        let rows = stmt
            .query_map([], |r| {
                Ok(HostGroup {
                    groupid: r.get::<_, i64>(0)? as Id,
                    name: Arc::from(r.get::<_, String>(1)?.as_str()),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_group_membership(&self) -> Result<Vec<(Id, Id)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT hostid, groupid FROM hosts_groups")?;
        let rows = stmt
            .query_map([], |r| {
                Ok((r.get::<_, i64>(0)? as Id, r.get::<_, i64>(1)? as Id))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_host_template_links(&self) -> Result<Vec<(Id, Id)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT hostid, templateid FROM hosts_templates")?;
        let rows = stmt
            .query_map([], |r| {
                Ok((r.get::<_, i64>(0)? as Id, r.get::<_, i64>(1)? as Id))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_hosts(&self) -> Result<Vec<Host>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT hostid, host, status, proxy_hostid, maintenance_status, maintenanceid,
                    tls_connect, tls_accept, tls_psk_identity, ipmi_authtype, ipmi_username,
                    ipmi_password, available, errors_from, disable_until, error
             FROM hosts",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(Host {
                    hostid: r.get::<_, i64>(0)? as Id,
                    host: Arc::from(r.get::<_, String>(1)?.as_str()),
                    status: match r.get::<_, i64>(2)? {
                        1 => HostStatus::NotMonitored,
                        5 => HostStatus::ProxyActive,
                        6 => HostStatus::ProxyPassive,
                        _ => HostStatus::Monitored,
                    },
                    proxy_hostid: r.get::<_, Option<i64>>(3)?.map(|v| v as Id),
                    maintenance_status: if r.get::<_, i64>(4)? == 1 {
                        MaintenanceStatus::InMaintenance
                    } else {
                        MaintenanceStatus::NotInMaintenance
                    },
                    maintenanceid: r.get::<_, Option<i64>>(5)?.map(|v| v as Id),
                    tls_connect: r.get::<_, i64>(6)? as u8,
                    tls_accept: r.get::<_, i64>(7)? as u8,
                    tls_psk_identity: r
                        .get::<_, Option<String>>(8)?
                        .map(|s| Arc::from(s.as_str())),
                    ipmi_authtype: r.get::<_, i64>(9)? as i32,
                    ipmi_username: r
                        .get::<_, Option<String>>(10)?
                        .map(|s| Arc::from(s.as_str())),
                    ipmi_password: r
                        .get::<_, Option<String>>(11)?
                        .map(|s| Arc::from(s.as_str())),
                    availability: InterfaceAvailability {
                        state_normal: r.get::<_, i64>(12)? == 1,
                        errors_from: r.get(13)?,
                        disable_until: r.get(14)?,
                        error: r.get(15)?,
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_interfaces(&self) -> Result<Vec<Interface>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT interfaceid, hostid, type, main, useip, ip, dns, port, bulk FROM interface",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(Interface {
                    interfaceid: r.get::<_, i64>(0)? as Id,
                    hostid: r.get::<_, i64>(1)? as Id,
                    itype: match r.get::<_, i64>(2)? {
                        2 => InterfaceType::Snmp,
                        3 => InterfaceType::Ipmi,
                        4 => InterfaceType::Jmx,
                        _ => InterfaceType::Agent,
                    },
                    main: r.get::<_, i64>(3)? == 1,
                    useip: r.get::<_, i64>(4)? == 1,
                    ip: Arc::from(r.get::<_, String>(5)?.as_str()),
                    dns: Arc::from(r.get::<_, String>(6)?.as_str()),
                    port: Arc::from(r.get::<_, String>(7)?.as_str()),
                    bulk: r.get::<_, i64>(8)? == 1,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_items(&self) -> Result<Vec<Item>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT itemid, hostid, value_type, status, type, key_, delay, history, trends,
                    interfaceid, valuemapid, units, inventory_link, snmp_oid, ipmi_sensor,
                    ssh_params, db_params, jmx_endpoint, http_agent_url, calculated_formula,
                    master_itemid, lastclock, lastlogsize, mtime, state, error
             FROM items",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(Item {
                    itemid: r.get::<_, i64>(0)? as Id,
                    hostid: r.get::<_, i64>(1)? as Id,
                    value_type: match r.get::<_, i64>(2)? {
                        1 => ValueType::Str,
                        2 => ValueType::Log,
                        3 => ValueType::Unsigned,
                        4 => ValueType::Text,
                        _ => ValueType::Float,
                    },
                    status: if r.get::<_, i64>(3)? == 1 {
                        ItemStatus::Disabled
                    } else {
                        ItemStatus::Active
                    },
                    item_type: match r.get::<_, i64>(4)? {
                        3 => ItemType::Simple,
                        1 => ItemType::Snmp,
                        12 => ItemType::Ipmi,
                        13 => ItemType::Ssh,
                        14 => ItemType::Telnet,
                        11 => ItemType::Db,
                        16 => ItemType::Jmx,
                        19 => ItemType::HttpAgent,
                        15 => ItemType::Calculated,
                        18 => ItemType::Dependent,
                        _ => ItemType::Trapper,
                    },
                    key: Arc::from(r.get::<_, String>(5)?.as_str()),
                    delay: Arc::from(r.get::<_, String>(6)?.as_str()),
                    history_secs: r.get(7)?,
                    trends_secs: r.get(8)?,
                    interfaceid: r.get::<_, Option<i64>>(9)?.map(|v| v as Id),
                    valuemapid: r.get::<_, Option<i64>>(10)?.map(|v| v as Id),
                    units: Arc::from(r.get::<_, String>(11)?.as_str()),
                    inventory_link: r.get::<_, Option<i64>>(12)?.map(|v| v as u8),
                    type_params: ItemTypeParams {
                        snmp_oid: r.get::<_, Option<String>>(13)?.map(|s| Arc::from(s.as_str())),
                        ipmi_sensor: r
                            .get::<_, Option<String>>(14)?
                            .map(|s| Arc::from(s.as_str())),
                        ssh_params: r
                            .get::<_, Option<String>>(15)?
                            .map(|s| Arc::from(s.as_str())),
                        db_params: r.get::<_, Option<String>>(16)?.map(|s| Arc::from(s.as_str())),
                        jmx_endpoint: r
                            .get::<_, Option<String>>(17)?
                            .map(|s| Arc::from(s.as_str())),
                        http_agent_url: r
                            .get::<_, Option<String>>(18)?
                            .map(|s| Arc::from(s.as_str())),
                        calculated_formula: r
                            .get::<_, Option<String>>(19)?
                            .map(|s| Arc::from(s.as_str())),
                        master_itemid: r.get::<_, Option<i64>>(20)?.map(|v| v as Id),
                    },
                    lastclock: r.get(21)?,
                    lastlogsize: r.get(22)?,
                    mtime: r.get(23)?,
                    state: if r.get::<_, i64>(24)? == 1 {
                        ItemStatus2::NotSupported
                    } else {
                        ItemStatus2::Normal
                    },
                    error: Arc::from(r.get::<_, String>(25)?.as_str()),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_triggers(&self) -> Result<Vec<Trigger>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT triggerid, expression, recovery_mode, recovery_expression, correlation_mode,
                    correlation_tag, priority, status, value, lastchange, error
             FROM triggers",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(Trigger {
                    triggerid: r.get::<_, i64>(0)? as Id,
                    expression: Arc::from(r.get::<_, String>(1)?.as_str()),
                    recovery_mode: match r.get::<_, i64>(2)? {
                        1 => RecoveryMode::RecoveryExpression,
                        2 => RecoveryMode::None,
                        _ => RecoveryMode::Expression,
                    },
                    recovery_expression: Arc::from(r.get::<_, String>(3)?.as_str()),
                    correlation_mode: r.get::<_, i64>(4)? as u8,
                    correlation_tag: Arc::from(r.get::<_, String>(5)?.as_str()),
                    severity: r.get::<_, i64>(6)? as u8,
                    status: if r.get::<_, i64>(7)? == 1 {
                        TriggerStatus::Disabled
                    } else {
                        TriggerStatus::Enabled
                    },
                    value: match r.get::<_, i64>(8)? {
                        1 => TriggerValueState::Problem,
                        2 => TriggerValueState::Unknown,
                        _ => TriggerValueState::Ok,
                    },
                    last_change: r.get(9)?,
                    error: Arc::from(r.get::<_, String>(10)?.as_str()),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_functions(&self) -> Result<Vec<Function>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT functionid, itemid, triggerid, name, parameter FROM functions")?;
        let rows = stmt
            .query_map([], |r| {
                Ok(Function {
                    functionid: r.get::<_, i64>(0)? as Id,
                    itemid: r.get::<_, i64>(1)? as Id,
                    triggerid: r.get::<_, i64>(2)? as Id,
                    name: Arc::from(r.get::<_, String>(3)?.as_str()),
                    parameter: Arc::from(r.get::<_, String>(4)?.as_str()),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_trigger_dependencies(&self) -> Result<Vec<TriggerDependency>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT triggerid_down, triggerid_up FROM trigger_depends")?;
        let rows = stmt
            .query_map([], |r| {
                Ok(TriggerDependency {
                    triggerid_down: r.get::<_, i64>(0)? as Id,
                    triggerid_up: r.get::<_, i64>(1)? as Id,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_trigger_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT triggerid, tag, value FROM trigger_tag")?;
        let rows = stmt
            .query_map([], |r| {
                Ok(Tag {
                    owner_id: r.get::<_, i64>(0)? as Id,
                    tag: Arc::from(r.get::<_, String>(1)?.as_str()),
                    value: Arc::from(r.get::<_, String>(2)?.as_str()),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_global_macros(&self) -> Result<Vec<GlobalMacro>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT globalmacroid, macro, context, value FROM globalmacro")?;
        let rows = stmt
            .query_map([], |r| {
                Ok(GlobalMacro {
                    globalmacroid: r.get::<_, i64>(0)? as Id,
                    name: Arc::from(r.get::<_, String>(1)?.as_str()),
                    context: r.get::<_, Option<String>>(2)?.map(|s| Arc::from(s.as_str())),
                    value: Arc::from(r.get::<_, String>(3)?.as_str()),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_host_macros(&self) -> Result<Vec<HostMacro>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT hostmacroid, hostid, macro, context, value FROM hostmacro")?;
        let rows = stmt
            .query_map([], |r| {
                Ok(HostMacro {
                    hostmacroid: r.get::<_, i64>(0)? as Id,
                    hostid: r.get::<_, i64>(1)? as Id,
                    name: Arc::from(r.get::<_, String>(2)?.as_str()),
                    context: r.get::<_, Option<String>>(3)?.map(|s| Arc::from(s.as_str())),
                    value: Arc::from(r.get::<_, String>(4)?.as_str()),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_actions(&self) -> Result<Vec<Action>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT actionid, event_source, evaltype, formula FROM actions")?;
        let rows = stmt
            .query_map([], |r| {
                Ok(Action {
                    actionid: r.get::<_, i64>(0)? as Id,
                    event_source: r.get::<_, i64>(1)? as u8,
                    eval_type: match r.get::<_, i64>(2)? {
                        1 => EvalType::And,
                        2 => EvalType::Or,
                        3 => EvalType::Custom,
                        _ => EvalType::AndOr,
                    },
                    formula: Arc::from(r.get::<_, String>(3)?.as_str()),
                    op_class_bitmap: 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_action_conditions(&self) -> Result<Vec<ActionCondition>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT conditionid, actionid, conditiontype, operator, value, value2 FROM conditions")?;
        let rows = stmt
            .query_map([], |r| {
                Ok(ActionCondition {
                    conditionid: r.get::<_, i64>(0)? as Id,
                    actionid: r.get::<_, i64>(1)? as Id,
                    condition_type: r.get::<_, i64>(2)? as u8,
                    op: r.get::<_, i64>(3)? as u8,
                    value: Arc::from(r.get::<_, String>(4)?.as_str()),
                    value2: Arc::from(r.get::<_, String>(5)?.as_str()),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// `(actionid, recovery_flag)` pairs — folded by DSE into each action's
    /// `op_class_bitmap` (spec §4.4).
    pub fn fetch_action_operation_flags(&self) -> Result<Vec<(Id, bool)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT actionid, recovery FROM operations")?;
        let rows = stmt
            .query_map([], |r| {
                Ok((r.get::<_, i64>(0)? as Id, r.get::<_, i64>(1)? == 1))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_correlations(&self) -> Result<Vec<Correlation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT correlationid, name, evaltype, formula FROM correlation")?;
        let rows = stmt
            .query_map([], |r| {
                Ok(Correlation {
                    correlationid: r.get::<_, i64>(0)? as Id,
                    name: Arc::from(r.get::<_, String>(1)?.as_str()),
                    eval_type: match r.get::<_, i64>(2)? {
                        1 => EvalType::And,
                        2 => EvalType::Or,
                        3 => EvalType::Custom,
                        _ => EvalType::AndOr,
                    },
                    formula: Arc::from(r.get::<_, String>(3)?.as_str()),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_corr_conditions(&self) -> Result<Vec<CorrCondition>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT corr_conditionid, correlationid, type FROM corr_condition")?;
        let base: Vec<(Id, Id, i64)> = stmt
            .query_map([], |r| {
                Ok((
                    r.get::<_, i64>(0)? as Id,
                    r.get::<_, i64>(1)? as Id,
                    r.get::<_, i64>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut out = Vec::with_capacity(base.len());
        for (corr_conditionid, correlationid, ty) in base {
            let subtype = match ty {
                0 => CorrConditionSubtype::Tag {
                    tag: Arc::from(
                        conn.query_row(
                            "SELECT tag FROM corr_condition_tag WHERE corr_conditionid = ?1",
                            params![corr_conditionid as i64],
                            |r| r.get::<_, String>(0),
                        )?
                        .as_str(),
                    ),
                },
                1 => {
                    let (tag, value): (String, String) = conn.query_row(
                        "SELECT tag, value FROM corr_condition_tagvalue WHERE corr_conditionid = ?1",
                        params![corr_conditionid as i64],
                        |r| Ok((r.get(0)?, r.get(1)?)),
                    )?;
                    CorrConditionSubtype::TagValue {
                        tag: Arc::from(tag.as_str()),
                        value: Arc::from(value.as_str()),
                    }
                }
                2 => CorrConditionSubtype::Group {
                    groupid: conn.query_row(
                        "SELECT groupid FROM corr_condition_group WHERE corr_conditionid = ?1",
                        params![corr_conditionid as i64],
                        |r| r.get::<_, i64>(0),
                    )? as Id,
                },
                _ => {
                    let (old_tag, new_tag): (String, String) = conn.query_row(
                        "SELECT old_tag, new_tag FROM corr_condition_tagpair WHERE corr_conditionid = ?1",
                        params![corr_conditionid as i64],
                        |r| Ok((r.get(0)?, r.get(1)?)),
                    )?;
                    CorrConditionSubtype::TagPair {
                        old_tag: Arc::from(old_tag.as_str()),
                        new_tag: Arc::from(new_tag.as_str()),
                    }
                }
            };
            out.push(CorrCondition {
                corr_conditionid,
                correlationid,
                subtype,
            });
        }
        Ok(out)
    }

    pub fn fetch_corr_operations(&self) -> Result<Vec<CorrOperation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT corr_operationid, correlationid, type FROM corr_operation")?;
        let rows = stmt
            .query_map([], |r| {
                Ok(CorrOperation {
                    corr_operationid: r.get::<_, i64>(0)? as Id,
                    correlationid: r.get::<_, i64>(1)? as Id,
                    op_type: r.get::<_, i64>(2)? as u8,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_maintenances(&self) -> Result<Vec<Maintenance>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT maintenanceid, name, maintenance_type, active_since, active_till, tags_evaltype
             FROM maintenances",
        )?;
        let base: Vec<Maintenance> = stmt
            .query_map([], |r| {
                Ok(Maintenance {
                    maintenanceid: r.get::<_, i64>(0)? as Id,
                    name: Arc::from(r.get::<_, String>(1)?.as_str()),
                    maintenance_type: if r.get::<_, i64>(2)? == 1 {
                        MaintenanceType::NoData
                    } else {
                        MaintenanceType::WithData
                    },
                    active_since: r.get(3)?,
                    active_until: r.get(4)?,
                    tags_evaltype: if r.get::<_, i64>(5)? == 2 {
                        TagsEvalType::Or
                    } else {
                        TagsEvalType::AndOr
                    },
                    host_ids: Vec::new(),
                    group_ids: Vec::new(),
                    tags: Vec::new(),
                    periods: Vec::new(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(base.len());
        for mut m in base {
            let id = m.maintenanceid as i64;
            let mut hstmt = conn.prepare("SELECT hostid FROM maintenances_hosts WHERE maintenanceid = ?1")?;
            m.host_ids = hstmt
                .query_map(params![id], |r| Ok(r.get::<_, i64>(0)? as Id))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let mut gstmt =
                conn.prepare("SELECT groupid FROM maintenances_groups WHERE maintenanceid = ?1")?;
            m.group_ids = gstmt
                .query_map(params![id], |r| Ok(r.get::<_, i64>(0)? as Id))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let mut tstmt =
                conn.prepare("SELECT tag, value FROM maintenance_tag WHERE maintenanceid = ?1")?;
            m.tags = tstmt
                .query_map(params![id], |r| {
                    Ok(Tag {
                        owner_id: m.maintenanceid,
                        tag: Arc::from(r.get::<_, String>(0)?.as_str()),
                        value: Arc::from(r.get::<_, String>(1)?.as_str()),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let mut pstmt = conn.prepare(
                "SELECT timeperiodid, timeperiod_type, every, start_date, period
                 FROM timeperiods WHERE maintenanceid = ?1",
            )?;
            m.periods = pstmt
                .query_map(params![id], |r| {
                    Ok(TimePeriod {
                        timeperiodid: r.get::<_, i64>(0)? as Id,
                        period_type: r.get::<_, i64>(1)? as u8,
                        every: r.get(2)?,
                        start_date: r.get(3)?,
                        period_secs: r.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            out.push(m);
        }
        Ok(out)
    }

    pub fn fetch_host_inventory(&self) -> Result<Vec<HostInventory>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT hostid, inventory_mode, fields FROM host_inventory")?;
        let rows = stmt
            .query_map([], |r| {
                let hostid = r.get::<_, i64>(0)? as Id;
                let mode: i64 = r.get(1)?;
                let raw: String = r.get(2)?;
                Ok((hostid, mode, raw))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .map(|(hostid, mode, raw)| {
                let fields: std::collections::BTreeMap<Arc<str>, Arc<str>> =
                    serde_json::from_str::<std::collections::BTreeMap<String, String>>(&raw)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|(k, v)| (Arc::from(k.as_str()), Arc::from(v.as_str())))
                        .collect();
                HostInventory {
                    hostid,
                    mode: match mode {
                        1 => InventoryMode::Automatic,
                        0 => InventoryMode::Manual,
                        _ => InventoryMode::Disabled,
                    },
                    fields,
                }
            })
            .collect())
    }

    // ── writes: HCS commit phase (spec §4.5.3 steps 6-8) ────────────────

    pub fn insert_history_value(
        &self,
        table: &'static str,
        itemid: Id,
        clock: i64,
        ns: i64,
        value: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        exec_insert_history_value(&conn, table, itemid, clock, ns, value)?;
        Ok(())
    }

    pub fn insert_history_log(
        &self,
        itemid: Id,
        clock: i64,
        ns: i64,
        timestamp: i64,
        source: &str,
        severity: i32,
        logeventid: i64,
        value: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        exec_insert_history_log(&conn, itemid, clock, ns, timestamp, source, severity, logeventid, value)?;
        Ok(())
    }

    /// Proxy-mode counterpart of `insert_history_value`/`insert_history_log`
    /// (spec §3, §4.5.3 step 5): one flat table for every value type,
    /// flags preserved so the upstream server can redo normalisation.
    pub fn insert_proxy_history(&self, itemid: Id, clock: i64, ns: i64, value: &str, flags: i32) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        exec_insert_proxy_history(&conn, itemid, clock, ns, value, flags)?;
        Ok(())
    }

    pub fn upsert_trend(
        &self,
        table: &'static str,
        itemid: Id,
        clock: i64,
        num: i64,
        min: f64,
        avg: f64,
        max: f64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        exec_upsert_trend(&conn, table, itemid, clock, num, min, avg, max)?;
        Ok(())
    }

    pub fn insert_event(
        &self,
        eventid: Id,
        source: u8,
        object: u8,
        objectid: Id,
        clock: i64,
        value: i32,
        severity: u8,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        exec_insert_event(&conn, eventid, source, object, objectid, clock, value, severity)?;
        Ok(())
    }

    /// Persist item-state fields on their own, outside a batch (used by
    /// callers that don't already hold a `commit_history_batch` diff set).
    pub fn update_item(&self, diff: &ItemDiff) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        exec_update_item(&conn, diff)?;
        Ok(())
    }

    /// First transaction of the batch pipeline (spec §4.5.3 step 5): history
    /// rows, item-state diffs and trend upserts committed together, retried
    /// from `BEGIN` on `DB_DOWN`. Server mode writes each row to its
    /// per-value-type table; proxy mode routes every row to `proxy_history`
    /// instead, preserving `flags`.
    pub fn commit_history_batch(
        &self,
        history_rows: &[HistoryRow],
        item_diffs: &[ItemDiff],
        trends: &[TrendRow],
        is_proxy: bool,
    ) -> Result<()> {
        self.with_retried_transaction(|conn| {
            for row in history_rows {
                if is_proxy {
                    exec_insert_proxy_history(
                        conn,
                        row.itemid,
                        row.clock,
                        row.ns,
                        row.value.as_text(),
                        row.flags,
                    )?;
                    continue;
                }
                match &row.value {
                    HistoryRowValue::Scalar(s) => {
                        exec_insert_history_value(conn, row.table, row.itemid, row.clock, row.ns, s)?;
                    }
                    HistoryRowValue::Log {
                        timestamp,
                        source,
                        severity,
                        logeventid,
                        value,
                    } => {
                        exec_insert_history_log(
                            conn, row.itemid, row.clock, row.ns, *timestamp, source, *severity, *logeventid, value,
                        )?;
                    }
                }
            }
            for diff in item_diffs {
                exec_update_item(conn, diff)?;
            }
            for trend in trends {
                exec_upsert_trend(conn, trend.table, trend.itemid, trend.clock, trend.num, trend.min, trend.avg, trend.max)?;
            }
            Ok(())
        })
    }

    /// Second transaction of the batch pipeline (spec §4.5.3 steps 6-7):
    /// one event row per trigger diff, retried the same way.
    pub fn commit_trigger_events(&self, rows: &[(Id, i64, i32)]) -> Result<()> {
        self.with_retried_transaction(|conn| {
            for (triggerid, last_change, value) in rows.iter().copied() {
                let eventid = self.ids.next_id(conn, "events", "eventid")?;
                exec_insert_event(conn, eventid, 0, 0, triggerid, last_change, value, 0)?;
            }
            Ok(())
        })
    }

    pub fn insert_autoreg_host(
        &self,
        autoreg_hostid: Id,
        host: &str,
        listen_ip: &str,
        listen_port: i32,
        tls_accepted: i32,
        host_metadata: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO autoreg_host (autoreg_hostid, host, listen_ip, listen_port, tls_accepted, host_metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![autoreg_hostid as i64, host, listen_ip, listen_port, tls_accepted, host_metadata],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_applies_and_round_trips_a_host() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO hosts (hostid, host) VALUES (1, 'web01')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        let hosts = store.fetch_hosts().unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(&*hosts[0].host, "web01");
        assert_eq!(hosts[0].status, HostStatus::Monitored);
    }

    #[test]
    fn trend_upsert_merges_min_avg_max() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_trend("trends", 100, 3600, 2, 1.0, 2.0, 3.0).unwrap();
        store.upsert_trend("trends", 100, 3600, 1, 0.5, 0.5, 0.5).unwrap();
        let row: (i64, f64, f64, f64) = store
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT num, value_min, value_avg, value_max FROM trends WHERE itemid=100 AND clock=3600",
                    [],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
                )?)
            })
            .unwrap();
        assert_eq!(row.0, 3);
        assert_eq!(row.1, 0.5);
        assert_eq!(row.3, 3.0);
    }
}
