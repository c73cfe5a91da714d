//! Value types ingested through HCS (spec §3 "History-cache entities",
//! §4.5.1). `HistoryValue` plays the role of the reference's tagged union
//! across float/uint/str/text/log; keeping it a sum type (rather than one
//! struct with unused fields) mirrors spec §9's "value-type polymorphism"
//! note.

use crate::cc::model::Id;

pub const STR_LEN: usize = 255;
pub const TEXT_LEN: usize = 65_535;
pub const LOG_LEN: usize = 65_535;
pub const SOURCE_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryValue {
    Float(f64),
    Unsigned(u64),
    Str(String),
    Text(String),
    Log {
        timestamp: i64,
        source: String,
        severity: i32,
        logeventid: i64,
        value: String,
    },
}

/// Proxy history flags (spec §4.5.1, §6): a value can carry metadata
/// without a sampled reading (`meta`), be explicitly valueless
/// (`novalue`), or be excluded from history/trends persistence while still
/// updating item state (`nohistory`/`notrends`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueFlags {
    pub meta: bool,
    pub novalue: bool,
    pub nohistory: bool,
    pub notrends: bool,
}

/// One `add()` call's worth of data (spec §4.5.1). `undef` marks a value
/// whose owning item could not be resolved in CC at flush time (spec §7
/// "CC lookup miss") — both history insert and trigger eval skip it.
#[derive(Debug, Clone)]
pub struct RawValue {
    pub itemid: Id,
    pub flags: ValueFlags,
    pub value: HistoryValue,
    pub ts_sec: i64,
    pub ts_ns: i64,
    pub lastlogsize: i64,
    pub mtime: i64,
    pub undef: bool,
}

impl RawValue {
    pub fn truncate_strings(&mut self) {
        match &mut self.value {
            HistoryValue::Str(s) => truncate_in_place(s, STR_LEN),
            HistoryValue::Text(s) => truncate_in_place(s, TEXT_LEN),
            HistoryValue::Log { source, value, .. } => {
                truncate_in_place(source, SOURCE_LEN);
                truncate_in_place(value, LOG_LEN);
            }
            HistoryValue::Float(_) | HistoryValue::Unsigned(_) => {}
        }
    }
}

fn truncate_in_place(s: &mut String, max_chars: usize) {
    if s.chars().count() > max_chars {
        *s = s.chars().take(max_chars).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_oversized_string_value() {
        let mut v = RawValue {
            itemid: 1,
            flags: ValueFlags::default(),
            value: HistoryValue::Str("x".repeat(300)),
            ts_sec: 0,
            ts_ns: 0,
            lastlogsize: 0,
            mtime: 0,
            undef: false,
        };
        v.truncate_strings();
        match v.value {
            HistoryValue::Str(s) => assert_eq!(s.len(), STR_LEN),
            _ => panic!("wrong variant"),
        }
    }
}
