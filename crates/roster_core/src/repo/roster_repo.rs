//! Roster repository contract and flat-file implementation.
//!
//! # Responsibility
//! - Provide the `load_all` / `save_all` persistence boundary.
//! - Keep file handling and codec details out of service/UI layers.
//!
//! # Invariants
//! - A missing file loads as an empty store, never as an error.
//! - Saves overwrite the file in place; a failed save may leave a truncated
//!   file behind.
//! - Load/save I/O failures are always returned, never swallowed.

use crate::codec::line_codec::{decode_str, write_snapshot, CodecError, LineIssue, LoadPolicy};
use crate::store::record_store::{RecordStore, Snapshot};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Default data file name, relative to the working directory.
pub const DEFAULT_DATA_FILE: &str = "students.csv";

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Io { path: PathBuf, source: io::Error },
    Codec(CodecError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "roster file `{}`: {source}", path.display()),
            Self::Codec(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Codec(err) => Some(err),
        }
    }
}

impl From<CodecError> for RepoError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

/// Where a load found its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// The file did not exist; the store starts empty.
    Missing,
    File,
}

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadedRoster {
    pub store: RecordStore,
    pub source: LoadSource,
    /// Malformed records tolerated by a lenient load policy.
    pub issues: Vec<LineIssue>,
}

/// Persistence boundary used by the roster service.
pub trait RosterRepository {
    fn load_all(&self) -> RepoResult<LoadedRoster>;
    fn save_all(&self, snapshot: &Snapshot) -> RepoResult<()>;
}

/// Repository over one flat comma-separated file.
#[derive(Debug, Clone)]
pub struct CsvFileRepository {
    path: PathBuf,
    policy: LoadPolicy,
}

impl CsvFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_policy(path, LoadPolicy::default())
    }

    pub fn with_policy(path: impl Into<PathBuf>, policy: LoadPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    fn io_error(&self, source: io::Error) -> RepoError {
        RepoError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RosterRepository for CsvFileRepository {
    fn load_all(&self) -> RepoResult<LoadedRoster> {
        let started_at = Instant::now();

        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    "event=roster_load module=repo status=ok source=missing records=0 duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                return Ok(LoadedRoster {
                    store: RecordStore::new(),
                    source: LoadSource::Missing,
                    issues: Vec::new(),
                });
            }
            Err(err) => {
                error!(
                    "event=roster_load module=repo status=error error_code=read_failed duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(self.io_error(err));
            }
        };

        let decoded = match decode_str(&text, self.policy) {
            Ok(decoded) => decoded,
            Err(err) => {
                error!(
                    "event=roster_load module=repo status=error error_code=malformed policy={} duration_ms={} error={}",
                    self.policy,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        info!(
            "event=roster_load module=repo status=ok source=file policy={} records={} issues={} duration_ms={}",
            self.policy,
            decoded.records.len(),
            decoded.issues.len(),
            started_at.elapsed().as_millis()
        );

        Ok(LoadedRoster {
            store: decoded.records.into_iter().collect(),
            source: LoadSource::File,
            issues: decoded.issues,
        })
    }

    fn save_all(&self, snapshot: &Snapshot) -> RepoResult<()> {
        let started_at = Instant::now();

        let result = File::create(&self.path).and_then(|file| {
            let mut writer = BufWriter::new(file);
            write_snapshot(&mut writer, snapshot)?;
            writer.flush()
        });

        match result {
            Ok(()) => {
                info!(
                    "event=roster_save module=repo status=ok records={} duration_ms={}",
                    snapshot.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=roster_save module=repo status=error error_code=write_failed records={} duration_ms={} error={}",
                    snapshot.len(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(self.io_error(err))
            }
        }
    }
}
