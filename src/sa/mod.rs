//! Shared Allocator (spec §4.1).
//!
//! The reference carves three `mmap`'d regions — `history-values`,
//! `history-index`, `trends` — at start-up because its workers are separate
//! OS processes. In a single-process, multi-threaded rewrite the regions
//! degenerate to admission-control counters: callers still allocate through
//! the normal Rust heap (`Box`, `Vec`), but every allocation is first checked
//! against a configured byte budget so the "out of memory is recoverable,
//! not fatal" contract and the operator-facing `stats` surface survive
//! (see DESIGN NOTES, spec §9).
//!
//! Mutation of a region's counters happens without its own lock: callers
//! already hold the owning subsystem's lock (`cache_lock`, `trends_lock`)
//! before calling `alloc`/`free`, exactly as spec §4.1 requires.

use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};

/// One of the three named regions from spec §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    HistoryValues,
    HistoryIndex,
    Trends,
}

impl RegionKind {
    pub fn name(self) -> &'static str {
        match self {
            RegionKind::HistoryValues => "history-values",
            RegionKind::HistoryIndex => "history-index",
            RegionKind::Trends => "trends",
        }
    }
}

/// A fixed-budget region. `used` can go negative transiently under
/// concurrent over-free bugs in test code; we keep it signed so such bugs
/// show up as an assertion rather than wrapping silently.
pub struct Region {
    kind: RegionKind,
    total: i64,
    used: AtomicI64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionStats {
    pub total: i64,
    pub free: i64,
    pub used: i64,
    pub used_pct: f64,
}

impl Region {
    pub fn new(kind: RegionKind, total_bytes: usize) -> Self {
        Self {
            kind,
            total: total_bytes as i64,
            used: AtomicI64::new(0),
        }
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    /// Admit an allocation of `size` bytes. Non-fatal: returns `false` (and
    /// does not record the allocation) when the budget would be exceeded —
    /// the caller is expected to back off and retry (spec §4.5.1, §7).
    pub fn alloc(&self, size: usize) -> bool {
        let size = size as i64;
        let mut current = self.used.load(Ordering::Relaxed);
        loop {
            if current + size > self.total {
                return false;
            }
            match self.used.compare_exchange_weak(
                current,
                current + size,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn free(&self, size: usize) {
        self.used.fetch_sub(size as i64, Ordering::AcqRel);
    }

    pub fn stats(&self) -> RegionStats {
        let used = self.used.load(Ordering::Relaxed);
        let free = (self.total - used).max(0);
        let used_pct = if self.total > 0 {
            used as f64 / self.total as f64 * 100.0
        } else {
            0.0
        };
        RegionStats {
            total: self.total,
            free,
            used,
            used_pct,
        }
    }

    pub fn is_low(&self, threshold_pct: f64) -> bool {
        self.stats().used_pct >= threshold_pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_until_budget_exhausted() {
        let r = Region::new(RegionKind::HistoryValues, 100);
        assert!(r.alloc(60));
        assert!(r.alloc(40));
        assert!(!r.alloc(1));
        let stats = r.stats();
        assert_eq!(stats.used, 100);
        assert_eq!(stats.free, 0);
        assert_eq!(stats.used_pct, 100.0);
    }

    #[test]
    fn free_reclaims_budget() {
        let r = Region::new(RegionKind::Trends, 10);
        assert!(r.alloc(10));
        assert!(!r.alloc(1));
        r.free(5);
        assert!(r.alloc(5));
        assert!(!r.alloc(1));
    }
}
