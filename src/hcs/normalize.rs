//! Value normalization (spec §4.5.3 step 4, §7). Matches a raw ingested
//! value against its item's declared `value_type`, truncates oversized
//! strings, and rejects non-finite floats — mirroring the reference's
//! `dbcache.c` `DCsync_history` value-type checks.

use super::value::{HistoryValue, RawValue};
use crate::cc::model::{Item, ValueType};
use std::sync::Arc;

/// Which history table a value belongs in (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryTable {
    History,
    HistoryUint,
    HistoryStr,
    HistoryText,
    HistoryLog,
}

#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    pub value: RawValue,
    pub table: HistoryTable,
    /// Value-type mismatch or non-finite float: the value itself is
    /// dropped, but the item is still transitioned to `NotSupported` with
    /// `error` populated (spec §7).
    pub conversion_failed: bool,
    pub error: Option<Arc<str>>,
}

pub fn normalize(item: &Item, raw: RawValue) -> NormalizeOutcome {
    let mut raw = raw;
    raw.truncate_strings();

    let table = match item.value_type {
        ValueType::Float => HistoryTable::History,
        ValueType::Unsigned => HistoryTable::HistoryUint,
        ValueType::Str => HistoryTable::HistoryStr,
        ValueType::Text => HistoryTable::HistoryText,
        ValueType::Log => HistoryTable::HistoryLog,
    };

    if raw.flags.novalue || raw.flags.meta {
        return NormalizeOutcome {
            value: raw,
            table,
            conversion_failed: false,
            error: None,
        };
    }

    let mismatch = !matches!(
        (&item.value_type, &raw.value),
        (ValueType::Float, HistoryValue::Float(_))
            | (ValueType::Unsigned, HistoryValue::Unsigned(_))
            | (ValueType::Str, HistoryValue::Str(_))
            | (ValueType::Text, HistoryValue::Text(_))
            | (ValueType::Log, HistoryValue::Log { .. })
    );
    if mismatch {
        return NormalizeOutcome {
            value: raw,
            table,
            conversion_failed: true,
            error: Some(Arc::from(format!(
                "value type mismatch for item {} (expected {:?})",
                item.itemid, item.value_type
            ))),
        };
    }

    if let HistoryValue::Float(f) = raw.value {
        if !f.is_finite() {
            return NormalizeOutcome {
                value: raw,
                table,
                conversion_failed: true,
                error: Some(Arc::from(format!(
                    "non-finite float value for item {}",
                    item.itemid
                ))),
            };
        }
    }

    NormalizeOutcome {
        value: raw,
        table,
        conversion_failed: false,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cc::model::{ItemStatus, ItemStatus2, ItemType, ItemTypeParams};
    use crate::hcs::value::ValueFlags;

    fn item(value_type: ValueType) -> Item {
        Item {
            itemid: 1,
            hostid: 1,
            value_type,
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

    fn raw(value: HistoryValue) -> RawValue {
        RawValue {
            itemid: 1,
            flags: ValueFlags::default(),
            value,
            ts_sec: 100,
            ts_ns: 0,
            lastlogsize: 0,
            mtime: 0,
            undef: false,
        }
    }

    #[test]
    fn matching_type_passes_through() {
        let out = normalize(&item(ValueType::Float), raw(HistoryValue::Float(1.5)));
        assert!(!out.conversion_failed);
        assert_eq!(out.table, HistoryTable::History);
    }

    #[test]
    fn mismatched_type_fails_conversion() {
        let out = normalize(&item(ValueType::Unsigned), raw(HistoryValue::Str("x".into())));
        assert!(out.conversion_failed);
        assert!(out.error.is_some());
    }

    #[test]
    fn non_finite_float_fails_conversion() {
        let out = normalize(&item(ValueType::Float), raw(HistoryValue::Float(f64::NAN)));
        assert!(out.conversion_failed);
    }

    #[test]
    fn oversized_string_is_truncated_not_failed() {
        let out = normalize(&item(ValueType::Str), raw(HistoryValue::Str("x".repeat(500))));
        assert!(!out.conversion_failed);
        match out.value.value {
            HistoryValue::Str(s) => assert_eq!(s.len(), crate::hcs::value::STR_LEN),
            _ => panic!("wrong variant"),
        }
    }
}
