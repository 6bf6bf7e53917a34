//! Core domain logic for the student roster.
//! This crate is the single source of truth for record and file-format rules;
//! front ends only call into it and render its state.

pub mod codec;
pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use codec::line_codec::{CodecError, LineIssue, LineProblem, LoadPolicy};
pub use config::{ConfigError, Settings};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::student::{course_catalog, is_catalog_course, Student, DEFAULT_GRADE};
pub use repo::roster_repo::{
    CsvFileRepository, LoadSource, LoadedRoster, RepoError, RepoResult, RosterRepository,
    DEFAULT_DATA_FILE,
};
pub use service::roster_service::{RosterService, SaveOutcome, SaveTicket};
pub use store::record_store::{
    snapshot_equals, RecordKey, RecordStore, Snapshot, StoreError, StoreResult, StudentUpdate,
    UpdateOutcome,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
