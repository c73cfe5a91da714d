//! Trends index (spec §4.5.5). At most one in-memory `Trend` per itemid:
//! adding a value updates min/max/avg in place; a rollover to a new hour
//! flushes the old trend immediately, and a periodic staggered sweep
//! catches items that stopped receiving values before their hour closed.

use crate::cc::model::Id;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum TrendAgg {
    /// Streaming mean, per spec §4.5.5 ("averages via streaming mean
    /// (floats)").
    Float { min: f64, max: f64, avg: f64 },
    /// 128-bit accumulator, per spec §9 "128-bit accumulators": truncating
    /// to 64 bits during accumulation breaks testable property 2.
    Uint { min: u64, max: u64, sum: i128 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trend {
    pub itemid: Id,
    pub clock: i64,
    pub num: i64,
    pub agg: TrendAgg,
}

impl Trend {
    fn new_float(itemid: Id, clock: i64, v: f64) -> Self {
        Self {
            itemid,
            clock,
            num: 1,
            agg: TrendAgg::Float { min: v, max: v, avg: v },
        }
    }

    fn new_uint(itemid: Id, clock: i64, v: u64) -> Self {
        Self {
            itemid,
            clock,
            num: 1,
            agg: TrendAgg::Uint { min: v, max: v, sum: v as i128 },
        }
    }

    fn add_float(&mut self, v: f64) {
        if let TrendAgg::Float { min, max, avg } = &mut self.agg {
            self.num += 1;
            *min = min.min(v);
            *max = max.max(v);
            *avg += (v - *avg) / self.num as f64;
        }
    }

    fn add_uint(&mut self, v: u64) {
        if let TrendAgg::Uint { min, max, sum } = &mut self.agg {
            self.num += 1;
            *min = (*min).min(v);
            *max = (*max).max(v);
            *sum += v as i128;
        }
    }

    pub fn min_avg_max(&self) -> (f64, f64, f64) {
        match &self.agg {
            TrendAgg::Float { min, max, avg } => (*min, *avg, *max),
            TrendAgg::Uint { min, max, sum } => {
                let avg = if self.num > 0 { *sum as f64 / self.num as f64 } else { 0.0 };
                (*min as f64, avg, *max as f64)
            }
        }
    }

    pub fn is_uint(&self) -> bool {
        matches!(self.agg, TrendAgg::Uint { .. })
    }
}

struct TrendInner {
    trends: HashMap<Id, Trend>,
    /// Preserved verbatim per spec §9 Open Question (i): gates cleanup on
    /// `last_cleanup_hour < hour` *and* `seconds_into_hour > cleanup_secs`,
    /// which means the first cleanup after boot is delayed until minute
    /// `cleanup_minute` even if the current hour has already rolled over
    /// several times. Not silently fixed.
    last_cleanup_hour: i64,
}

pub struct TrendIndex {
    inner: Mutex<TrendInner>,
}

impl Default for TrendIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendIndex {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TrendInner {
                trends: HashMap::new(),
                last_cleanup_hour: 0,
            }),
        }
    }

    /// Add a sampled value to the hour-aligned trend for `itemid`. Returns
    /// the previous hour's trend if this value rolled the trend over to a
    /// new hour, ready for immediate flush (spec §4.5.5).
    pub fn add_value(&self, itemid: Id, is_uint: bool, value: f64, ts_sec: i64) -> Option<Trend> {
        let hour = (ts_sec / 3600) * 3600;
        let mut inner = self.inner.lock().unwrap();
        match inner.trends.remove(&itemid) {
            Some(mut t) if t.clock == hour => {
                if is_uint {
                    t.add_uint(value as u64);
                } else {
                    t.add_float(value);
                }
                inner.trends.insert(itemid, t);
                None
            }
            Some(old) => {
                let new_trend = if is_uint {
                    Trend::new_uint(itemid, hour, value as u64)
                } else {
                    Trend::new_float(itemid, hour, value)
                };
                inner.trends.insert(itemid, new_trend);
                Some(old)
            }
            None => {
                let new_trend = if is_uint {
                    Trend::new_uint(itemid, hour, value as u64)
                } else {
                    Trend::new_float(itemid, hour, value)
                };
                inner.trends.insert(itemid, new_trend);
                None
            }
        }
    }

    /// Periodic staggered sweep (spec §4.5.5), reproducing the reference's
    /// exact (buggy) gating condition.
    pub fn sweep_due(&self, now: i64, cleanup_minute: u32) -> Vec<Trend> {
        let hour = now / 3600;
        let seconds_into_hour = now % 3600;
        let cleanup_secs = cleanup_minute as i64 * 60;
        let mut inner = self.inner.lock().unwrap();
        if !(inner.last_cleanup_hour < hour && seconds_into_hour > cleanup_secs) {
            return Vec::new();
        }
        inner.last_cleanup_hour = hour;
        let due: Vec<Id> = inner
            .trends
            .iter()
            .filter(|(_, t)| t.clock / 3600 < hour)
            .map(|(id, _)| *id)
            .collect();
        due.into_iter().filter_map(|id| inner.trends.remove(&id)).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().trends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_hour_updates_in_place() {
        let idx = TrendIndex::new();
        assert!(idx.add_value(1, false, 1.0, 1000).is_none());
        assert!(idx.add_value(1, false, 3.0, 1030).is_none());
        assert!(idx.add_value(1, false, 2.0, 1060).is_none());
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn hour_rollover_flushes_previous_trend_immediately() {
        let idx = TrendIndex::new();
        idx.add_value(1, false, 1.0, 100);
        idx.add_value(1, false, 3.0, 3000);
        let flushed = idx.add_value(1, false, 5.0, 3700);
        assert!(flushed.is_some());
        let t = flushed.unwrap();
        assert_eq!(t.num, 2);
        let (min, avg, max) = t.min_avg_max();
        assert_eq!(min, 1.0);
        assert_eq!(max, 3.0);
        assert_eq!(avg, 2.0);
    }

    #[test]
    fn uint_average_uses_wide_accumulator() {
        let idx = TrendIndex::new();
        idx.add_value(1, true, u64::MAX as f64, 100);
        idx.add_value(1, true, u64::MAX as f64, 200);
        let flushed = idx.add_value(1, true, 1.0, 3700).unwrap();
        let (_, avg, _) = flushed.min_avg_max();
        assert_eq!(avg, u64::MAX as f64);
    }

    #[test]
    fn sweep_respects_documented_cleanup_gate() {
        let idx = TrendIndex::new();
        idx.add_value(1, false, 1.0, 0);
        // Still within the first hour, before minute 55: no sweep.
        assert!(idx.sweep_due(1800, 55).is_empty());
        // Past minute 55 of hour 0: sweep fires, but nothing is due yet
        // because the trend's own clock (hour 0) is not < current hour (0).
        assert!(idx.sweep_due(3400, 55).is_empty());
        // Into hour 1, past minute 55 equivalent offset: now the hour-0
        // trend is stale and gets swept.
        let out = idx.sweep_due(3600 + 3400, 55);
        assert_eq!(out.len(), 1);
    }
}
