//! `ids_lock` (spec §4.5.4) — per-table monotonic id issuance.
//!
//! Mirrors dbcache.c's `DCget_nextid`: the allocator keeps an in-memory
//! high-water mark per table and only round-trips to the store
//! (`SELECT MAX(id)`) when its local reservation has run dry, rather than on
//! every id issued. Reservations are handed out in blocks so a burst of
//! inserts doesn't force a store round-trip per row.

use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::Mutex;

const RESERVATION_BLOCK: u64 = 1000;

struct Reservation {
    next: u64,
    remaining: u64,
}

pub struct IdAllocator {
    reservations: Mutex<HashMap<&'static str, Reservation>>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            reservations: Mutex::new(HashMap::new()),
        }
    }

    /// Issue the next id for `table`, refilling the in-memory reservation
    /// from `SELECT MAX(id)` against `id_column` only when exhausted.
    pub fn next_id(
        &self,
        conn: &Connection,
        table: &'static str,
        id_column: &str,
    ) -> anyhow::Result<u64> {
        let mut guard = self.reservations.lock().unwrap();
        let needs_refill = match guard.get(table) {
            Some(r) => r.remaining == 0,
            None => true,
        };
        if needs_refill {
            let max: Option<i64> = conn.query_row(
                &format!("SELECT MAX({id_column}) FROM {table}"),
                [],
                |row| row.get(0),
            )?;
            let start = max.unwrap_or(0) as u64 + 1;
            guard.insert(
                table,
                Reservation {
                    next: start,
                    remaining: RESERVATION_BLOCK,
                },
            );
        }
        let r = guard.get_mut(table).expect("just inserted or present");
        let id = r.next;
        r.next += 1;
        r.remaining -= 1;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE widgets (widgetid INTEGER PRIMARY KEY)")
            .unwrap();
        conn
    }

    #[test]
    fn issues_increasing_ids_without_repeated_select_max() {
        let conn = mem_conn();
        let alloc = IdAllocator::new();
        let a = alloc.next_id(&conn, "widgets", "widgetid").unwrap();
        let b = alloc.next_id(&conn, "widgets", "widgetid").unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn refills_from_select_max_when_table_has_rows() {
        let conn = mem_conn();
        conn.execute("INSERT INTO widgets (widgetid) VALUES (41)", [])
            .unwrap();
        let alloc = IdAllocator::new();
        let id = alloc.next_id(&conn, "widgets", "widgetid").unwrap();
        assert_eq!(id, 42);
    }
}
