//! matchmaker/crates/storage-adapters/src/lib.rs
//!
//! Implementations of the `domains` ports.
//!
//! - `memory`: dashmap-backed source of record, caches and event bus. Always
//!   compiled; used by the tests and by single-process deployments.
//! - `postgres` (feature `db-postgres`): source of record and candidate
//!   selector on sqlx.
//! - `redis` (feature `redis`): profile and deck caches plus the pub/sub
//!   notifier on deadpool-redis.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis;

use domains::DomainEvent;
use futures_util::stream::BoxStream;

/// Inbound side of the event channel: every event announced by any process.
pub type EventStream = BoxStream<'static, DomainEvent>;
