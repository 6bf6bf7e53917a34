//! Student record domain model.
//!
//! # Responsibility
//! - Define the canonical record held by the store and written by the codec.
//! - Own the grade-text parsing policy used by interactive edits.
//!
//! # Invariants
//! - No field is validated: empty names/IDs and unknown courses are accepted.
//! - `grade` defaults to `0.0` and is only replaced by a successfully parsed
//!   value.

use serde::{Deserialize, Serialize};

/// Grade assigned to records that were never graded.
pub const DEFAULT_GRADE: f64 = 0.0;

const COURSE_CATALOG: &[&str] = &["Math", "Science", "History", "English"];

/// Returns the course names offered to users as choices.
///
/// The catalog is advisory; records may carry any course text.
pub fn course_catalog() -> &'static [&'static str] {
    COURSE_CATALOG
}

/// Returns whether `course` is one of the catalog entries (exact match).
pub fn is_catalog_course(course: &str) -> bool {
    COURSE_CATALOG.contains(&course)
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub name: String,
    /// Human-entered identifier. Not unique, not validated.
    pub id: String,
    pub course: String,
    pub grade: f64,
}

impl Student {
    /// Creates an ungraded record.
    pub fn new(name: impl Into<String>, id: impl Into<String>, course: impl Into<String>) -> Self {
        Self::with_grade(name, id, course, DEFAULT_GRADE)
    }

    pub fn with_grade(
        name: impl Into<String>,
        id: impl Into<String>,
        course: impl Into<String>,
        grade: f64,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            course: course.into(),
            grade,
        }
    }

    /// Applies user-entered grade text.
    ///
    /// Returns `true` when the text parsed and the grade was replaced. On parse
    /// failure the previous grade is kept and `false` is returned; this is not
    /// an error condition.
    pub fn apply_grade_text(&mut self, text: &str) -> bool {
        match parse_grade(text) {
            Some(grade) => {
                self.grade = grade;
                true
            }
            None => false,
        }
    }
}

/// Parses grade text, ignoring surrounding whitespace.
///
/// Non-finite values (`NaN`, `inf`) are rejected: a `NaN` grade would never
/// compare equal to itself after a save and reload.
pub fn parse_grade(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|grade| grade.is_finite())
}

#[cfg(test)]
mod tests {
    use super::{course_catalog, is_catalog_course, parse_grade, Student, DEFAULT_GRADE};

    #[test]
    fn new_student_starts_ungraded() {
        let student = Student::new("Ann", "S1", "Math");
        assert_eq!(student.grade, DEFAULT_GRADE);
    }

    #[test]
    fn apply_grade_text_keeps_previous_value_on_garbage() {
        let mut student = Student::with_grade("Ann", "S1", "Math", 71.0);
        assert!(!student.apply_grade_text("seventy"));
        assert_eq!(student.grade, 71.0);

        assert!(student.apply_grade_text(" 92.25 "));
        assert_eq!(student.grade, 92.25);
    }

    #[test]
    fn parse_grade_rejects_empty_text() {
        assert_eq!(parse_grade(""), None);
        assert_eq!(parse_grade("   "), None);
        assert_eq!(parse_grade("1e2"), Some(100.0));
    }

    #[test]
    fn parse_grade_rejects_non_finite_values() {
        assert_eq!(parse_grade("NaN"), None);
        assert_eq!(parse_grade("inf"), None);
        assert_eq!(parse_grade("-infinity"), None);

        let mut student = Student::with_grade("Ann", "S1", "Math", 88.5);
        assert!(!student.apply_grade_text("NaN"));
        assert_eq!(student.grade, 88.5);
    }

    #[test]
    fn catalog_lists_known_courses() {
        assert_eq!(course_catalog().len(), 4);
        assert!(is_catalog_course("History"));
        assert!(!is_catalog_course("history"));
    }
}
