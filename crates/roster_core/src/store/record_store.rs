//! Ordered in-memory record store.
//!
//! # Responsibility
//! - Hold student records in insertion order.
//! - Address records by store-assigned keys for update/delete.
//! - Produce immutable snapshots for saving and comparison.
//!
//! # Invariants
//! - Order is insertion order; nothing sorts or deduplicates.
//! - Keys are unique within one store and never reused, even after delete.
//! - Keys are session-local and never persisted; equality ignores them.

use crate::model::student::Student;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type StoreResult<T> = Result<T, StoreError>;

/// Session-local handle for one stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(u64);

impl RecordKey {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(RecordKey),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "record not found: #{key}"),
        }
    }
}

impl Error for StoreError {}

/// Field replacement set for [`RecordStore::update`].
///
/// `grade_text` is raw user input; it only replaces the grade when it parses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentUpdate {
    pub name: String,
    pub id: String,
    pub course: String,
    pub grade_text: String,
}

/// Result of an accepted update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// `false` when the grade text did not parse and the old grade was kept.
    pub grade_applied: bool,
}

#[derive(Debug, Clone)]
struct Entry {
    key: RecordKey,
    student: Student,
}

/// Mutable, ordered collection of student records.
#[derive(Debug, Clone)]
pub struct RecordStore {
    entries: Vec<Entry>,
    next_key: u64,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    /// Creates an empty store. The first record added gets key `1`.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_key: 1,
        }
    }

    /// Appends a record and returns its key. Never fails.
    pub fn add(&mut self, student: Student) -> RecordKey {
        let key = RecordKey(self.next_key);
        self.next_key += 1;
        self.entries.push(Entry { key, student });
        key
    }

    /// Replaces name, ID and course, and the grade when `grade_text` parses.
    ///
    /// # Errors
    /// - `StoreError::NotFound` when `key` is not in this store.
    pub fn update(&mut self, key: RecordKey, update: StudentUpdate) -> StoreResult<UpdateOutcome> {
        let student = self.get_mut(key).ok_or(StoreError::NotFound(key))?;
        student.name = update.name;
        student.id = update.id;
        student.course = update.course;
        let grade_applied = student.apply_grade_text(&update.grade_text);
        Ok(UpdateOutcome { grade_applied })
    }

    /// Removes a record. Absent keys are a no-op returning `None`.
    pub fn delete(&mut self, key: RecordKey) -> Option<Student> {
        let index = self.entries.iter().position(|entry| entry.key == key)?;
        Some(self.entries.remove(index).student)
    }

    pub fn get(&self, key: RecordKey) -> Option<&Student> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.student)
    }

    pub fn get_mut(&mut self, key: RecordKey) -> Option<&mut Student> {
        self.entries
            .iter_mut()
            .find(|entry| entry.key == key)
            .map(|entry| &mut entry.student)
    }

    /// Returns the first record (in store order) carrying user-entered `id`.
    pub fn find_by_student_id(&self, id: &str) -> Option<(RecordKey, &Student)> {
        self.iter().find(|(_, student)| student.id == id)
    }

    /// Iterates `(key, record)` pairs in store order.
    pub fn iter(&self) -> impl Iterator<Item = (RecordKey, &Student)> + '_ {
        self.entries.iter().map(|entry| (entry.key, &entry.student))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies the current records into an immutable snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            records: self.entries.iter().map(|entry| entry.student.clone()).collect(),
        }
    }

    /// Field-wise, in-order comparison of records. Keys are ignored.
    pub fn equals(&self, other: &RecordStore) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(left, right)| left.student == right.student)
    }
}

impl PartialEq for RecordStore {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl FromIterator<Student> for RecordStore {
    fn from_iter<I: IntoIterator<Item = Student>>(iter: I) -> Self {
        let mut store = RecordStore::new();
        for student in iter {
            store.add(student);
        }
        store
    }
}

impl From<&Snapshot> for RecordStore {
    fn from(snapshot: &Snapshot) -> Self {
        snapshot.iter().cloned().collect()
    }
}

/// Immutable point-in-time copy of a store's records.
///
/// Cloning is cheap and the snapshot can cross threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    records: Arc<[Student]>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::from(Vec::new())
    }
}

impl Snapshot {
    pub fn records(&self) -> &[Student] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Student> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Student>> for Snapshot {
    fn from(records: Vec<Student>) -> Self {
        Self {
            records: records.into(),
        }
    }
}

/// Returns whether two snapshots hold the same records in the same order.
pub fn snapshot_equals(left: &Snapshot, right: &Snapshot) -> bool {
    left == right
}

#[cfg(test)]
mod tests {
    use super::{snapshot_equals, RecordKey, RecordStore, StoreError, StudentUpdate};
    use crate::model::student::Student;

    fn update(name: &str, id: &str, course: &str, grade_text: &str) -> StudentUpdate {
        StudentUpdate {
            name: name.to_string(),
            id: id.to_string(),
            course: course.to_string(),
            grade_text: grade_text.to_string(),
        }
    }

    #[test]
    fn add_appends_in_insertion_order_with_increasing_keys() {
        let mut store = RecordStore::new();
        let first = store.add(Student::new("Ann", "S1", "Math"));
        let second = store.add(Student::new("", "", ""));

        assert_eq!(first, RecordKey::new(1));
        assert_eq!(second, RecordKey::new(2));
        let names: Vec<_> = store.iter().map(|(_, s)| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ann", ""]);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut store = RecordStore::new();
        store.add(Student::new("Ann", "S1", "Math"));
        store.add(Student::new("Ann", "S1", "Math"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn update_with_bad_grade_keeps_grade_but_applies_other_fields() {
        let mut store = RecordStore::new();
        let key = store.add(Student::with_grade("Ann", "S1", "Math", 88.5));

        let outcome = store
            .update(key, update("Anna", "S9", "History", "A+"))
            .unwrap();

        assert!(!outcome.grade_applied);
        let student = store.get(key).unwrap();
        assert_eq!(student.name, "Anna");
        assert_eq!(student.id, "S9");
        assert_eq!(student.course, "History");
        assert_eq!(student.grade, 88.5);
    }

    #[test]
    fn update_unknown_key_is_not_found() {
        let mut store = RecordStore::new();
        let err = store
            .update(RecordKey::new(42), update("a", "b", "c", "1"))
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound(RecordKey::new(42)));
    }

    #[test]
    fn delete_is_noop_for_absent_key_and_keys_are_not_reused() {
        let mut store = RecordStore::new();
        let key = store.add(Student::new("Ann", "S1", "Math"));

        assert!(store.delete(key).is_some());
        assert!(store.delete(key).is_none());

        let next = store.add(Student::new("Bob", "S2", "Science"));
        assert_ne!(next, key);
    }

    #[test]
    fn equals_ignores_keys_but_respects_order() {
        let mut left = RecordStore::new();
        let doomed = left.add(Student::new("tmp", "", ""));
        left.delete(doomed);
        left.add(Student::new("Ann", "S1", "Math"));
        left.add(Student::new("Bob", "S2", "Science"));

        let right: RecordStore = vec![
            Student::new("Ann", "S1", "Math"),
            Student::new("Bob", "S2", "Science"),
        ]
        .into_iter()
        .collect();
        assert!(left.equals(&right));

        let reversed: RecordStore = vec![
            Student::new("Bob", "S2", "Science"),
            Student::new("Ann", "S1", "Math"),
        ]
        .into_iter()
        .collect();
        assert!(!left.equals(&reversed));
    }

    #[test]
    fn snapshot_is_detached_from_later_mutation() {
        let mut store = RecordStore::new();
        let key = store.add(Student::with_grade("Ann", "S1", "Math", 50.0));
        let before = store.snapshot();

        store.get_mut(key).unwrap().grade = 99.0;
        let after = store.snapshot();

        assert_eq!(before.records()[0].grade, 50.0);
        assert!(!snapshot_equals(&before, &after));
    }

    #[test]
    fn find_by_student_id_returns_first_match() {
        let mut store = RecordStore::new();
        store.add(Student::new("Ann", "S1", "Math"));
        let second = store.add(Student::new("Bob", "S2", "Math"));
        store.add(Student::new("Bobby", "S2", "Science"));

        let (key, student) = store.find_by_student_id("S2").unwrap();
        assert_eq!(key, second);
        assert_eq!(student.name, "Bob");
        assert!(store.find_by_student_id("S3").is_none());
    }
}
