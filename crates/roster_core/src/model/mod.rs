//! Roster domain model.
//!
//! # Responsibility
//! - Define the student record shared by store, codec and service layers.
//!
//! # Invariants
//! - The model carries no identity; store keys live in `store`.

pub mod student;
