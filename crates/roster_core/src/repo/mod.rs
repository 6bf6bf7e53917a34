//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the load/save contract the service depends on.
//! - Isolate file I/O from service and UI orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`Codec`) in addition to I/O
//!   transport errors.

pub mod roster_repo;
