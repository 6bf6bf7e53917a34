//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store and repository calls into use-case level APIs.
//! - Keep UI layers decoupled from storage details.

pub mod roster_service;
