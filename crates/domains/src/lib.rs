//! matchmaker/crates/domains/src/lib.rs
//!
//! The central domain logic and interface definitions for the matchmaker:
//! identities, the pair canonicalizer, swipe and match rules, and the ports
//! every adapter implements.

pub mod errors;
pub mod events;
pub mod matches;
pub mod models;
pub mod pair;
pub mod ports;
pub mod swipes;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use events::*;
pub use matches::*;
pub use models::*;
pub use pair::*;
pub use swipes::*;
