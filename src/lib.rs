//! `zbx-core`: a server-side monitoring core (spec.md) — Shared Allocator,
//! Algorithmic Primitives, Configuration Cache, Differential Sync Engine,
//! and History Cache & Syncer.

pub mod ap;
pub mod cc;
pub mod collector;
pub mod config;
pub mod dse;
pub mod error;
pub mod events;
pub mod hcs;
pub mod ids;
pub mod sa;
pub mod stats;
pub mod store;
