//! DDL for the relational store backing both the Configuration Cache's
//! source-of-truth tables and the history/trends hot tables. Laid out the
//! way the teacher's `config_db.rs` lays out its own schema: one
//! `execute_batch` string, `CREATE TABLE IF NOT EXISTS`, explicit indexes
//! declared right after the table they cover.

pub const DDL: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS hstgrp (
    groupid    INTEGER PRIMARY KEY,
    name       TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS hosts (
    hostid              INTEGER PRIMARY KEY,
    host                TEXT NOT NULL,
    status              INTEGER NOT NULL DEFAULT 0,
    proxy_hostid        INTEGER,
    maintenance_status  INTEGER NOT NULL DEFAULT 0,
    maintenanceid       INTEGER,
    tls_connect         INTEGER NOT NULL DEFAULT 1,
    tls_accept          INTEGER NOT NULL DEFAULT 1,
    tls_psk_identity    TEXT,
    ipmi_authtype       INTEGER NOT NULL DEFAULT -1,
    ipmi_username       TEXT,
    ipmi_password       TEXT,
    available           INTEGER NOT NULL DEFAULT 0,
    errors_from         INTEGER NOT NULL DEFAULT 0,
    disable_until       INTEGER NOT NULL DEFAULT 0,
    error               TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS hosts_groups (
    hostgroupid INTEGER PRIMARY KEY,
    hostid      INTEGER NOT NULL REFERENCES hosts(hostid) ON DELETE CASCADE,
    groupid     INTEGER NOT NULL REFERENCES hstgrp(groupid) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_hosts_groups_host ON hosts_groups(hostid);
CREATE INDEX IF NOT EXISTS idx_hosts_groups_group ON hosts_groups(groupid);

CREATE TABLE IF NOT EXISTS hosts_templates (
    hosttemplateid INTEGER PRIMARY KEY,
    hostid         INTEGER NOT NULL REFERENCES hosts(hostid) ON DELETE CASCADE,
    templateid     INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_hosts_templates_host ON hosts_templates(hostid);

CREATE TABLE IF NOT EXISTS interface (
    interfaceid INTEGER PRIMARY KEY,
    hostid      INTEGER NOT NULL REFERENCES hosts(hostid) ON DELETE CASCADE,
    type        INTEGER NOT NULL DEFAULT 1,
    main        INTEGER NOT NULL DEFAULT 1,
    useip       INTEGER NOT NULL DEFAULT 1,
    ip          TEXT NOT NULL DEFAULT '127.0.0.1',
    dns         TEXT NOT NULL DEFAULT '',
    port        TEXT NOT NULL DEFAULT '10050',
    bulk        INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_interface_host ON interface(hostid);

CREATE TABLE IF NOT EXISTS items (
    itemid          INTEGER PRIMARY KEY,
    hostid          INTEGER NOT NULL REFERENCES hosts(hostid) ON DELETE CASCADE,
    value_type      INTEGER NOT NULL DEFAULT 0,
    status          INTEGER NOT NULL DEFAULT 0,
    type            INTEGER NOT NULL DEFAULT 0,
    key_            TEXT NOT NULL,
    delay           TEXT NOT NULL DEFAULT '1m',
    history         INTEGER NOT NULL DEFAULT 2592000,
    trends          INTEGER NOT NULL DEFAULT 31536000,
    interfaceid     INTEGER,
    valuemapid      INTEGER,
    units           TEXT NOT NULL DEFAULT '',
    inventory_link  INTEGER,
    snmp_oid        TEXT,
    ipmi_sensor     TEXT,
    ssh_params      TEXT,
    db_params       TEXT,
    jmx_endpoint    TEXT,
    http_agent_url  TEXT,
    calculated_formula TEXT,
    master_itemid   INTEGER,
    lastclock       INTEGER NOT NULL DEFAULT 0,
    lastlogsize     INTEGER NOT NULL DEFAULT 0,
    mtime           INTEGER NOT NULL DEFAULT 0,
    state           INTEGER NOT NULL DEFAULT 0,
    error           TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_items_host ON items(hostid);

CREATE TABLE IF NOT EXISTS item_preproc (
    item_preprocid INTEGER PRIMARY KEY,
    itemid         INTEGER NOT NULL REFERENCES items(itemid) ON DELETE CASCADE,
    type           INTEGER NOT NULL,
    params         TEXT NOT NULL DEFAULT '',
    step           INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_item_preproc_item ON item_preproc(itemid);

CREATE TABLE IF NOT EXISTS triggers (
    triggerid           INTEGER PRIMARY KEY,
    expression          TEXT NOT NULL,
    recovery_mode       INTEGER NOT NULL DEFAULT 0,
    recovery_expression TEXT NOT NULL DEFAULT '',
    correlation_mode    INTEGER NOT NULL DEFAULT 0,
    correlation_tag     TEXT NOT NULL DEFAULT '',
    priority            INTEGER NOT NULL DEFAULT 0,
    status              INTEGER NOT NULL DEFAULT 0,
    value               INTEGER NOT NULL DEFAULT 0,
    lastchange          INTEGER NOT NULL DEFAULT 0,
    error               TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS functions (
    functionid INTEGER PRIMARY KEY,
    itemid     INTEGER NOT NULL REFERENCES items(itemid) ON DELETE CASCADE,
    triggerid  INTEGER NOT NULL REFERENCES triggers(triggerid) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    parameter  TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_functions_item ON functions(itemid);
CREATE INDEX IF NOT EXISTS idx_functions_trigger ON functions(triggerid);

CREATE TABLE IF NOT EXISTS trigger_depends (
    triggerdepid    INTEGER PRIMARY KEY,
    triggerid_down  INTEGER NOT NULL REFERENCES triggers(triggerid) ON DELETE CASCADE,
    triggerid_up    INTEGER NOT NULL REFERENCES triggers(triggerid) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS trigger_tag (
    triggertagid INTEGER PRIMARY KEY,
    triggerid    INTEGER NOT NULL REFERENCES triggers(triggerid) ON DELETE CASCADE,
    tag          TEXT NOT NULL,
    value        TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_trigger_tag_trigger ON trigger_tag(triggerid);

CREATE TABLE IF NOT EXISTS actions (
    actionid       INTEGER PRIMARY KEY,
    event_source   INTEGER NOT NULL DEFAULT 0,
    evaltype       INTEGER NOT NULL DEFAULT 0,
    formula        TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS conditions (
    conditionid INTEGER PRIMARY KEY,
    actionid    INTEGER NOT NULL REFERENCES actions(actionid) ON DELETE CASCADE,
    conditiontype INTEGER NOT NULL,
    operator    INTEGER NOT NULL DEFAULT 0,
    value       TEXT NOT NULL DEFAULT '',
    value2      TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_conditions_action ON conditions(actionid);

CREATE TABLE IF NOT EXISTS operations (
    operationid INTEGER PRIMARY KEY,
    actionid    INTEGER NOT NULL REFERENCES actions(actionid) ON DELETE CASCADE,
    recovery    INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_operations_action ON operations(actionid);

CREATE TABLE IF NOT EXISTS correlation (
    correlationid INTEGER PRIMARY KEY,
    name          TEXT NOT NULL,
    evaltype      INTEGER NOT NULL DEFAULT 0,
    formula       TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS corr_condition (
    corr_conditionid INTEGER PRIMARY KEY,
    correlationid    INTEGER NOT NULL REFERENCES correlation(correlationid) ON DELETE CASCADE,
    type             INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_corr_condition_corr ON corr_condition(correlationid);

CREATE TABLE IF NOT EXISTS corr_condition_tag (
    corr_conditionid INTEGER PRIMARY KEY REFERENCES corr_condition(corr_conditionid) ON DELETE CASCADE,
    tag              TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS corr_condition_tagvalue (
    corr_conditionid INTEGER PRIMARY KEY REFERENCES corr_condition(corr_conditionid) ON DELETE CASCADE,
    tag              TEXT NOT NULL,
    value            TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS corr_condition_group (
    corr_conditionid INTEGER PRIMARY KEY REFERENCES corr_condition(corr_conditionid) ON DELETE CASCADE,
    groupid          INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS corr_condition_tagpair (
    corr_conditionid INTEGER PRIMARY KEY REFERENCES corr_condition(corr_conditionid) ON DELETE CASCADE,
    old_tag          TEXT NOT NULL,
    new_tag          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS corr_operation (
    corr_operationid INTEGER PRIMARY KEY,
    correlationid     INTEGER NOT NULL REFERENCES correlation(correlationid) ON DELETE CASCADE,
    type              INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_corr_operation_corr ON corr_operation(correlationid);

CREATE TABLE IF NOT EXISTS globalmacro (
    globalmacroid INTEGER PRIMARY KEY,
    macro         TEXT NOT NULL,
    context       TEXT,
    value         TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS hostmacro (
    hostmacroid INTEGER PRIMARY KEY,
    hostid      INTEGER NOT NULL REFERENCES hosts(hostid) ON DELETE CASCADE,
    macro       TEXT NOT NULL,
    context     TEXT,
    value       TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_hostmacro_host ON hostmacro(hostid);

CREATE TABLE IF NOT EXISTS maintenances (
    maintenanceid   INTEGER PRIMARY KEY,
    name            TEXT NOT NULL,
    maintenance_type INTEGER NOT NULL DEFAULT 0,
    active_since    INTEGER NOT NULL DEFAULT 0,
    active_till     INTEGER NOT NULL DEFAULT 0,
    tags_evaltype   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS maintenances_hosts (
    maintenance_hostid INTEGER PRIMARY KEY,
    maintenanceid       INTEGER NOT NULL REFERENCES maintenances(maintenanceid) ON DELETE CASCADE,
    hostid              INTEGER NOT NULL REFERENCES hosts(hostid) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_maint_hosts_maint ON maintenances_hosts(maintenanceid);

CREATE TABLE IF NOT EXISTS maintenances_groups (
    maintenance_groupid INTEGER PRIMARY KEY,
    maintenanceid        INTEGER NOT NULL REFERENCES maintenances(maintenanceid) ON DELETE CASCADE,
    groupid              INTEGER NOT NULL REFERENCES hstgrp(groupid) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_maint_groups_maint ON maintenances_groups(maintenanceid);

CREATE TABLE IF NOT EXISTS maintenance_tag (
    maintenancetagid INTEGER PRIMARY KEY,
    maintenanceid    INTEGER NOT NULL REFERENCES maintenances(maintenanceid) ON DELETE CASCADE,
    tag              TEXT NOT NULL,
    value            TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_maint_tag_maint ON maintenance_tag(maintenanceid);

CREATE TABLE IF NOT EXISTS timeperiods (
    timeperiodid INTEGER PRIMARY KEY,
    maintenanceid INTEGER NOT NULL REFERENCES maintenances(maintenanceid) ON DELETE CASCADE,
    timeperiod_type INTEGER NOT NULL DEFAULT 0,
    every        INTEGER NOT NULL DEFAULT 1,
    start_date   INTEGER NOT NULL DEFAULT 0,
    period       INTEGER NOT NULL DEFAULT 3600
);
CREATE INDEX IF NOT EXISTS idx_timeperiods_maint ON timeperiods(maintenanceid);

CREATE TABLE IF NOT EXISTS host_inventory (
    hostid INTEGER PRIMARY KEY REFERENCES hosts(hostid) ON DELETE CASCADE,
    inventory_mode INTEGER NOT NULL DEFAULT -1,
    fields TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS history (
    itemid INTEGER NOT NULL,
    clock  INTEGER NOT NULL,
    ns     INTEGER NOT NULL DEFAULT 0,
    value  REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_history_item_clock ON history(itemid, clock);

CREATE TABLE IF NOT EXISTS history_uint (
    itemid INTEGER NOT NULL,
    clock  INTEGER NOT NULL,
    ns     INTEGER NOT NULL DEFAULT 0,
    value  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_history_uint_item_clock ON history_uint(itemid, clock);

CREATE TABLE IF NOT EXISTS history_str (
    itemid INTEGER NOT NULL,
    clock  INTEGER NOT NULL,
    ns     INTEGER NOT NULL DEFAULT 0,
    value  TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_history_str_item_clock ON history_str(itemid, clock);

CREATE TABLE IF NOT EXISTS history_text (
    itemid INTEGER NOT NULL,
    clock  INTEGER NOT NULL,
    ns     INTEGER NOT NULL DEFAULT 0,
    value  TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_history_text_item_clock ON history_text(itemid, clock);

CREATE TABLE IF NOT EXISTS history_log (
    itemid   INTEGER NOT NULL,
    clock    INTEGER NOT NULL,
    ns       INTEGER NOT NULL DEFAULT 0,
    timestamp INTEGER NOT NULL DEFAULT 0,
    source   TEXT NOT NULL DEFAULT '',
    severity INTEGER NOT NULL DEFAULT 0,
    logeventid INTEGER NOT NULL DEFAULT 0,
    value    TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_history_log_item_clock ON history_log(itemid, clock);

CREATE TABLE IF NOT EXISTS trends (
    itemid    INTEGER NOT NULL,
    clock     INTEGER NOT NULL,
    num       INTEGER NOT NULL,
    value_min REAL NOT NULL,
    value_avg REAL NOT NULL,
    value_max REAL NOT NULL,
    PRIMARY KEY (itemid, clock)
);

CREATE TABLE IF NOT EXISTS trends_uint (
    itemid    INTEGER NOT NULL,
    clock     INTEGER NOT NULL,
    num       INTEGER NOT NULL,
    value_min INTEGER NOT NULL,
    value_avg INTEGER NOT NULL,
    value_max INTEGER NOT NULL,
    PRIMARY KEY (itemid, clock)
);

CREATE TABLE IF NOT EXISTS proxy_history (
    id       INTEGER PRIMARY KEY,
    itemid   INTEGER NOT NULL,
    clock    INTEGER NOT NULL,
    ns       INTEGER NOT NULL DEFAULT 0,
    value    TEXT NOT NULL DEFAULT '',
    flags    INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_proxy_history_clock ON proxy_history(clock);

CREATE TABLE IF NOT EXISTS events (
    eventid  INTEGER PRIMARY KEY,
    source   INTEGER NOT NULL DEFAULT 0,
    object   INTEGER NOT NULL DEFAULT 0,
    objectid INTEGER NOT NULL,
    clock    INTEGER NOT NULL,
    value    INTEGER NOT NULL DEFAULT 0,
    severity INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_events_object ON events(objectid, clock);

CREATE TABLE IF NOT EXISTS alerts (
    alertid  INTEGER PRIMARY KEY,
    actionid INTEGER NOT NULL REFERENCES actions(actionid) ON DELETE CASCADE,
    eventid  INTEGER NOT NULL REFERENCES events(eventid) ON DELETE CASCADE,
    clock    INTEGER NOT NULL,
    status   INTEGER NOT NULL DEFAULT 0,
    message  TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS acknowledges (
    acknowledgeid INTEGER PRIMARY KEY,
    eventid       INTEGER NOT NULL REFERENCES events(eventid) ON DELETE CASCADE,
    clock         INTEGER NOT NULL,
    message       TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS autoreg_host (
    autoreg_hostid INTEGER PRIMARY KEY,
    host           TEXT NOT NULL,
    listen_ip      TEXT NOT NULL DEFAULT '',
    listen_port    INTEGER NOT NULL DEFAULT 0,
    tls_accepted   INTEGER NOT NULL DEFAULT 1,
    host_metadata  TEXT NOT NULL DEFAULT '',
    flags          INTEGER NOT NULL DEFAULT 0
);
";
