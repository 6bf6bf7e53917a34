//! In-memory roster state.
//!
//! # Responsibility
//! - Keep the ordered record list owned by the controlling application layer.
//!
//! # Invariants
//! - Mutation happens on one owner thread; other threads only see snapshots.

pub mod record_store;
