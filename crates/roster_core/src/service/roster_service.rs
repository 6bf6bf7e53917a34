//! Roster use-case service.
//!
//! # Responsibility
//! - Own the record store on behalf of the UI layer.
//! - Provide load/save entry points, background saving and the unsaved
//!   changes check.
//!
//! # Invariants
//! - The store is only mutated through `&mut self`, i.e. on the owner thread.
//! - Background saves write a snapshot taken synchronously at call time, so
//!   later mutations never race with serialization.
//! - Dirty state is derived by re-reading the file, never from a flag.

use crate::model::student::Student;
use crate::repo::roster_repo::{LoadedRoster, RepoError, RepoResult, RosterRepository};
use crate::store::record_store::{
    RecordKey, RecordStore, Snapshot, StoreResult, StudentUpdate, UpdateOutcome,
};
use log::{info, warn};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

const SAVE_THREAD_NAME: &str = "roster-save";

/// Completion signal of a background save.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved { records: usize },
    Failed(RepoError),
    /// The worker thread could not be started.
    NotStarted(std::io::Error),
    /// The worker ended without reporting (it panicked).
    Interrupted,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

/// Handle to an in-flight background save.
#[derive(Debug)]
pub struct SaveTicket {
    receiver: Receiver<SaveOutcome>,
}

impl SaveTicket {
    /// Blocks until the save finishes.
    pub fn wait(self) -> SaveOutcome {
        self.receiver.recv().unwrap_or(SaveOutcome::Interrupted)
    }

    /// Returns the outcome if the save already finished.
    ///
    /// Once an outcome has been returned, later calls report `Interrupted`.
    pub fn try_outcome(&self) -> Option<SaveOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(SaveOutcome::Interrupted),
        }
    }
}

/// Use-case facade over a record store and its repository.
pub struct RosterService<R: RosterRepository> {
    repo: R,
    store: RecordStore,
}

impl<R: RosterRepository> RosterService<R> {
    /// Loads the persisted roster synchronously and wraps it.
    ///
    /// Issues tolerated by a lenient load policy are returned alongside.
    pub fn open(repo: R) -> RepoResult<(Self, LoadedRoster)> {
        let mut loaded = repo.load_all()?;
        let store = std::mem::take(&mut loaded.store);
        Ok((Self { repo, store }, loaded))
    }

    /// Wraps an existing store without touching the repository.
    pub fn with_store(repo: R, store: RecordStore) -> Self {
        Self { repo, store }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    pub fn add(&mut self, student: Student) -> RecordKey {
        self.store.add(student)
    }

    pub fn update(&mut self, key: RecordKey, update: StudentUpdate) -> StoreResult<UpdateOutcome> {
        self.store.update(key, update)
    }

    pub fn delete(&mut self, key: RecordKey) -> Option<Student> {
        self.store.delete(key)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Reads the persisted roster without replacing the in-memory store.
    pub fn load_all(&self) -> RepoResult<LoadedRoster> {
        self.repo.load_all()
    }

    /// Writes an arbitrary snapshot through the repository.
    pub fn save_all(&self, snapshot: &Snapshot) -> RepoResult<()> {
        self.repo.save_all(snapshot)
    }

    /// Saves the current store on the calling thread.
    pub fn save(&self) -> RepoResult<()> {
        self.repo.save_all(&self.store.snapshot())
    }

    /// Returns whether the store differs from what is on disk.
    ///
    /// Read or parse failures count as unsaved changes.
    pub fn has_unsaved_changes(&self) -> bool {
        match self.repo.load_all() {
            Ok(loaded) => !self.store.equals(&loaded.store),
            Err(err) => {
                warn!(
                    "event=roster_dirty_check module=service status=error assume_dirty=true error={}",
                    err
                );
                true
            }
        }
    }
}

impl<R> RosterService<R>
where
    R: RosterRepository + Clone + Send + 'static,
{
    /// Snapshots the store and saves it on a worker thread.
    ///
    /// The caller may keep mutating the store; the file receives the records
    /// as they were when this method was called.
    pub fn save_in_background(&self) -> SaveTicket {
        let snapshot = self.store.snapshot();
        let repo = self.repo.clone();
        let (sender, receiver) = mpsc::channel();
        let fallback = sender.clone();

        info!(
            "event=roster_save_background module=service status=start records={}",
            snapshot.len()
        );

        let spawned = thread::Builder::new()
            .name(SAVE_THREAD_NAME.to_string())
            .spawn(move || {
                let outcome = match repo.save_all(&snapshot) {
                    Ok(()) => SaveOutcome::Saved {
                        records: snapshot.len(),
                    },
                    Err(err) => SaveOutcome::Failed(err),
                };
                // The ticket may have been dropped; nobody is left to notify.
                let _ = sender.send(outcome);
            });

        if let Err(err) = spawned {
            warn!(
                "event=roster_save_background module=service status=error error_code=spawn_failed error={}",
                err
            );
            let _ = fallback.send(SaveOutcome::NotStarted(err));
        }

        SaveTicket { receiver }
    }
}

#[cfg(test)]
mod tests {
    use super::{RosterService, SaveOutcome};
    use crate::model::student::Student;
    use crate::repo::roster_repo::{LoadSource, LoadedRoster, RepoResult, RosterRepository};
    use crate::store::record_store::{RecordStore, Snapshot};
    use std::sync::{Arc, Mutex};

    /// Keeps the "file" in memory so service behaviour can be checked alone.
    #[derive(Clone, Default)]
    struct MemoryRepo {
        saved: Arc<Mutex<Option<Snapshot>>>,
    }

    impl RosterRepository for MemoryRepo {
        fn load_all(&self) -> RepoResult<LoadedRoster> {
            let saved = self.saved.lock().unwrap().clone();
            Ok(match saved {
                Some(snapshot) => LoadedRoster {
                    store: RecordStore::from(&snapshot),
                    source: LoadSource::File,
                    issues: Vec::new(),
                },
                None => LoadedRoster {
                    store: RecordStore::new(),
                    source: LoadSource::Missing,
                    issues: Vec::new(),
                },
            })
        }

        fn save_all(&self, snapshot: &Snapshot) -> RepoResult<()> {
            *self.saved.lock().unwrap() = Some(snapshot.clone());
            Ok(())
        }
    }

    #[test]
    fn fresh_empty_roster_has_no_unsaved_changes() {
        let (service, loaded) = RosterService::open(MemoryRepo::default()).unwrap();
        assert_eq!(loaded.source, LoadSource::Missing);
        assert!(!service.has_unsaved_changes());
    }

    #[test]
    fn mutation_marks_dirty_until_saved() {
        let (mut service, _) = RosterService::open(MemoryRepo::default()).unwrap();
        service.add(Student::new("Ann", "S1", "Math"));
        assert!(service.has_unsaved_changes());

        service.save().unwrap();
        assert!(!service.has_unsaved_changes());
    }

    #[test]
    fn background_save_writes_snapshot_from_call_time() {
        let repo = MemoryRepo::default();
        let (mut service, _) = RosterService::open(repo.clone()).unwrap();
        let key = service.add(Student::with_grade("Ann", "S1", "Math", 10.0));

        let ticket = service.save_in_background();
        service.store_mut().get_mut(key).unwrap().grade = 99.0;
        service.add(Student::new("Late", "S9", "Math"));

        let outcome = ticket.wait();
        assert!(matches!(outcome, SaveOutcome::Saved { records: 1 }));

        let saved = repo.saved.lock().unwrap().clone().unwrap();
        assert_eq!(saved.records(), &[Student::with_grade("Ann", "S1", "Math", 10.0)]);
        assert!(service.has_unsaved_changes());
    }
}
