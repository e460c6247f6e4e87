//! In-process adapters.
//!
//! [`MemoryStore`] holds every source-of-record table; [`MemoryProfileStore`]
//! and [`MemoryDeckStore`] are the expiring caches; [`MemoryEventBus`] is a
//! broadcast channel that also keeps a history for assertions.

mod cache;
mod events;
mod store;

pub use cache::{MemoryDeckStore, MemoryProfileStore};
pub use events::MemoryEventBus;
pub use store::MemoryStore;
