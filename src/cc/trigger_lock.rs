//! Per-trigger locking (spec §4.3, §4.5.4, §9 "Trigger locking"). Prevents
//! two syncers from racing to write the same trigger's value. Non-blocking
//! and fair by construction: a syncer that loses the race just doesn't get
//! the lock, and is expected to retry the item on a later pass — there is no
//! queueing or starvation because every attempt is O(1) and symmetric.

use crate::cc::model::Id;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Default)]
pub struct TriggerLocks {
    locked: Mutex<HashSet<Id>>,
}

impl TriggerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to lock every id in `trigger_ids` atomically: either all of them
    /// lock, or none do (a syncer must never partially own a history item's
    /// trigger set — spec §4.5.3 step 2).
    pub fn try_lock_all(&self, trigger_ids: &[Id]) -> bool {
        let mut guard = self.locked.lock().unwrap();
        if trigger_ids.iter().any(|id| guard.contains(id)) {
            return false;
        }
        for id in trigger_ids {
            guard.insert(*id);
        }
        true
    }

    pub fn unlock(&self, trigger_ids: &[Id]) {
        let mut guard = self.locked.lock().unwrap();
        for id in trigger_ids {
            guard.remove(id);
        }
    }

    pub fn unlock_all(&self) {
        self.locked.lock().unwrap().clear();
    }

    #[cfg(test)]
    pub fn is_locked(&self, id: Id) -> bool {
        self.locked.lock().unwrap().contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_or_nothing_locking() {
        let locks = TriggerLocks::new();
        assert!(locks.try_lock_all(&[1, 2, 3]));
        assert!(!locks.try_lock_all(&[3, 4]));
        assert!(locks.is_locked(1));
        assert!(!locks.is_locked(4));
        locks.unlock(&[1, 2, 3]);
        assert!(locks.try_lock_all(&[3, 4]));
    }

    #[test]
    fn unlock_all_clears_everything() {
        let locks = TriggerLocks::new();
        locks.try_lock_all(&[1, 2]);
        locks.unlock_all();
        assert!(!locks.is_locked(1));
        assert!(!locks.is_locked(2));
    }
}
