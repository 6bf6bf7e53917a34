//! Flat-file line codec for roster records.
//!
//! # Responsibility
//! - Render snapshots as `name,id,course,grade` lines.
//! - Parse file text back into records under a configurable malformed-line
//!   policy.
//!
//! # Invariants
//! - Fields without `,`, `"`, CR or LF are written verbatim; others are wrapped
//!   in double quotes with inner quotes doubled.
//! - Every record line ends with `\n`; no header line is written.
//! - Grades are written in shortest round-trip form with a fractional part for
//!   integral values (`90.0`), so decode(encode(x)) restores `x` exactly.
//! - Line numbers in diagnostics are 1-based physical line numbers where the
//!   record starts.

use crate::model::student::{parse_grade, Student, DEFAULT_GRADE};
use crate::store::record_store::Snapshot;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};
use std::iter::Peekable;
use std::str::{Chars, FromStr};

/// Number of fields in one persisted record.
pub const FIELD_COUNT: usize = 4;

/// How the decoder treats a malformed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Abort the whole load on the first malformed record.
    #[default]
    FailFast,
    /// Drop the malformed record, log a warning and keep going.
    SkipAndWarn,
    /// Fill missing fields with empty text and bad grades with `0.0`.
    DefaultSubstitute,
}

impl LoadPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FailFast => "fail",
            Self::SkipAndWarn => "skip",
            Self::DefaultSubstitute => "default",
        }
    }
}

impl Display for LoadPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fail" | "fail-fast" | "fail_fast" => Ok(Self::FailFast),
            "skip" | "skip-and-warn" | "skip_and_warn" => Ok(Self::SkipAndWarn),
            "default" | "default-substitute" | "default_substitute" => {
                Ok(Self::DefaultSubstitute)
            }
            other => Err(format!(
                "unsupported malformed-line policy `{other}`; expected fail|skip|default"
            )),
        }
    }
}

/// What is wrong with one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineProblem {
    FieldCount { found: usize },
    InvalidGrade(String),
    UnterminatedQuote,
}

impl LineProblem {
    /// Stable, value-free identifier used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::FieldCount { .. } => "field_count",
            Self::InvalidGrade(_) => "invalid_grade",
            Self::UnterminatedQuote => "unterminated_quote",
        }
    }
}

impl Display for LineProblem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FieldCount { found } => {
                write!(f, "expected {FIELD_COUNT} fields, found {found}")
            }
            Self::InvalidGrade(text) => write!(f, "invalid grade `{text}`"),
            Self::UnterminatedQuote => write!(f, "unterminated quoted field"),
        }
    }
}

/// A malformed record and where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIssue {
    pub line: usize,
    pub problem: LineProblem,
}

impl Display for LineIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.problem)
    }
}

/// Decode failure under [`LoadPolicy::FailFast`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    Malformed(LineIssue),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(issue) => write!(f, "malformed roster file at {issue}"),
        }
    }
}

impl Error for CodecError {}

/// Records recovered by a decode, plus the issues tolerated on the way.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Decoded {
    pub records: Vec<Student>,
    /// Always empty under [`LoadPolicy::FailFast`].
    pub issues: Vec<LineIssue>,
}

/// Renders a whole snapshot in file form.
pub fn encode_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for student in snapshot.iter() {
        encode_record(student, &mut out);
    }
    out
}

/// Appends one record line, including its trailing newline.
pub fn encode_record(student: &Student, out: &mut String) {
    push_field(&student.name, out);
    out.push(',');
    push_field(&student.id, out);
    out.push(',');
    push_field(&student.course, out);
    out.push(',');
    out.push_str(&format_grade(student.grade));
    out.push('\n');
}

/// Streams a snapshot to `writer` one record at a time.
pub fn write_snapshot<W: Write>(writer: &mut W, snapshot: &Snapshot) -> io::Result<()> {
    let mut line = String::new();
    for student in snapshot.iter() {
        line.clear();
        encode_record(student, &mut line);
        writer.write_all(line.as_bytes())?;
    }
    Ok(())
}

/// Formats a grade the way it is persisted: `88.5`, `90.0`, `0.0`.
pub fn format_grade(grade: f64) -> String {
    // Debug keeps a fractional part for integral values and round-trips.
    format!("{grade:?}")
}

/// Parses file text into records.
///
/// # Errors
/// - `CodecError::Malformed` for the first bad record under
///   [`LoadPolicy::FailFast`]. Other policies never fail.
pub fn decode_str(text: &str, policy: LoadPolicy) -> Result<Decoded, CodecError> {
    let mut decoded = Decoded::default();

    for raw in RecordReader::new(text) {
        let raw = match raw {
            Ok(raw) => raw,
            Err(issue) => {
                tolerate(policy, issue, &mut decoded)?;
                continue;
            }
        };

        if raw.is_blank() {
            continue;
        }

        match build_student(&raw, policy) {
            Ok((student, recovered)) => {
                if let Some(issue) = recovered {
                    decoded.issues.push(issue);
                }
                decoded.records.push(student);
            }
            Err(issue) => tolerate(policy, issue, &mut decoded)?,
        }
    }

    Ok(decoded)
}

fn tolerate(policy: LoadPolicy, issue: LineIssue, decoded: &mut Decoded) -> Result<(), CodecError> {
    match policy {
        LoadPolicy::FailFast => Err(CodecError::Malformed(issue)),
        LoadPolicy::SkipAndWarn | LoadPolicy::DefaultSubstitute => {
            warn!(
                "event=roster_decode module=codec status=skipped policy={} line={} problem={}",
                policy,
                issue.line,
                issue.problem.code()
            );
            decoded.issues.push(issue);
            Ok(())
        }
    }
}

/// Builds a record from raw fields.
///
/// Returns the record plus the issue that was papered over, if any, or the
/// issue that makes the record unusable under `policy`.
fn build_student(raw: &RawRecord, policy: LoadPolicy) -> Result<(Student, Option<LineIssue>), LineIssue> {
    let mut recovered = None;

    if raw.fields.len() != FIELD_COUNT {
        let issue = LineIssue {
            line: raw.line,
            problem: LineProblem::FieldCount {
                found: raw.fields.len(),
            },
        };
        if policy != LoadPolicy::DefaultSubstitute {
            return Err(issue);
        }
        recovered = Some(issue);
    }

    let field = |index: usize| raw.fields.get(index).cloned().unwrap_or_default();
    let grade_text = field(3);
    let grade = match parse_grade(&grade_text) {
        Some(grade) => grade,
        None if policy == LoadPolicy::DefaultSubstitute => {
            // A record missing its grade column was already reported above.
            if recovered.is_none() {
                recovered = Some(LineIssue {
                    line: raw.line,
                    problem: LineProblem::InvalidGrade(grade_text),
                });
            }
            DEFAULT_GRADE
        }
        None => {
            return Err(LineIssue {
                line: raw.line,
                problem: LineProblem::InvalidGrade(grade_text),
            })
        }
    };

    if let Some(issue) = &recovered {
        warn!(
            "event=roster_decode module=codec status=substituted policy={} line={} problem={}",
            policy,
            issue.line,
            issue.problem.code()
        );
    }

    Ok((Student::with_grade(field(0), field(1), field(2), grade), recovered))
}

fn push_field(value: &str, out: &mut String) {
    if !needs_quoting(value) {
        out.push_str(value);
        return;
    }
    out.push('"');
    for ch in value.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}

fn needs_quoting(value: &str) -> bool {
    value.contains([',', '"', '\r', '\n'])
}

#[derive(Debug)]
struct RawRecord {
    line: usize,
    fields: Vec<String>,
    any_quoted: bool,
}

impl RawRecord {
    fn is_blank(&self) -> bool {
        !self.any_quoted && self.fields.len() == 1 && self.fields[0].trim().is_empty()
    }
}

/// Splits file text into raw field lists, one per logical record.
struct RecordReader<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    done: bool,
}

impl<'a> RecordReader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
            done: false,
        }
    }

    fn read_record(&mut self) -> Option<Result<RawRecord, LineIssue>> {
        self.chars.peek()?;

        let start_line = self.line;
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut field_quoted = false;
        let mut any_quoted = false;

        loop {
            let Some(ch) = self.chars.next() else {
                if in_quotes {
                    self.done = true;
                    return Some(Err(LineIssue {
                        line: start_line,
                        problem: LineProblem::UnterminatedQuote,
                    }));
                }
                break;
            };

            if in_quotes {
                match ch {
                    '"' if self.chars.peek() == Some(&'"') => {
                        self.chars.next();
                        current.push('"');
                    }
                    '"' => in_quotes = false,
                    '\n' => {
                        self.line += 1;
                        current.push('\n');
                    }
                    other => current.push(other),
                }
                continue;
            }

            match ch {
                ',' => {
                    fields.push(std::mem::take(&mut current));
                    field_quoted = false;
                }
                '"' if current.is_empty() && !field_quoted => {
                    in_quotes = true;
                    field_quoted = true;
                    any_quoted = true;
                }
                '\r' if self.chars.peek() == Some(&'\n') => {}
                '\n' => {
                    self.line += 1;
                    break;
                }
                other => current.push(other),
            }
        }

        fields.push(current);
        Some(Ok(RawRecord {
            line: start_line,
            fields,
            any_quoted,
        }))
    }
}

impl Iterator for RecordReader<'_> {
    type Item = Result<RawRecord, LineIssue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.read_record()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_str, encode_snapshot, format_grade, CodecError, LineIssue, LineProblem, LoadPolicy,
    };
    use crate::model::student::Student;
    use crate::store::record_store::Snapshot;

    fn snapshot(records: Vec<Student>) -> Snapshot {
        Snapshot::from(records)
    }

    #[test]
    fn encodes_plain_record_in_legacy_form() {
        let text = encode_snapshot(&snapshot(vec![Student::with_grade("Ann", "S1", "Math", 88.5)]));
        assert_eq!(text, "Ann,S1,Math,88.5\n");
    }

    #[test]
    fn empty_snapshot_encodes_to_empty_text() {
        assert_eq!(encode_snapshot(&Snapshot::default()), "");
    }

    #[test]
    fn grade_keeps_fractional_part() {
        assert_eq!(format_grade(90.0), "90.0");
        assert_eq!(format_grade(0.0), "0.0");
        assert_eq!(format_grade(72.125), "72.125");
    }

    #[test]
    fn fields_with_delimiters_are_quoted_and_round_trip() {
        let original = vec![
            Student::with_grade("Doe, Jane", "S\"7\"", "Art\nHistory", 61.0),
            Student::with_grade("Plain", "S8", "Math", 0.1 + 0.2),
        ];
        let text = encode_snapshot(&snapshot(original.clone()));
        assert!(text.starts_with("\"Doe, Jane\",\"S\"\"7\"\"\",\"Art\nHistory\",61.0\n"));

        let decoded = decode_str(&text, LoadPolicy::FailFast).unwrap();
        assert_eq!(decoded.records, original);
        assert!(decoded.issues.is_empty());
    }

    #[test]
    fn blank_lines_and_crlf_are_tolerated() {
        let decoded = decode_str("\nAnn,S1,Math,88.5\r\n   \nBob,S2,Science, 70 \n", LoadPolicy::FailFast)
            .unwrap();
        assert_eq!(
            decoded.records,
            vec![
                Student::with_grade("Ann", "S1", "Math", 88.5),
                Student::with_grade("Bob", "S2", "Science", 70.0),
            ]
        );
    }

    #[test]
    fn missing_trailing_newline_still_yields_last_record() {
        let decoded = decode_str("Ann,S1,Math,1.5", LoadPolicy::FailFast).unwrap();
        assert_eq!(decoded.records.len(), 1);
    }

    #[test]
    fn short_line_fails_fast_with_line_number() {
        let err = decode_str("Ann,S1,Math,88.5\nBob,S2,Science\n", LoadPolicy::FailFast).unwrap_err();
        assert_eq!(
            err,
            CodecError::Malformed(LineIssue {
                line: 2,
                problem: LineProblem::FieldCount { found: 3 },
            })
        );
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn extra_fields_are_malformed() {
        let err = decode_str("Ann,S1,Math,88.5,extra\n", LoadPolicy::FailFast).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Malformed(LineIssue {
                problem: LineProblem::FieldCount { found: 5 },
                ..
            })
        ));
    }

    #[test]
    fn bad_grade_fails_fast() {
        let err = decode_str("Ann,S1,Math,A+\n", LoadPolicy::FailFast).unwrap_err();
        assert_eq!(
            err,
            CodecError::Malformed(LineIssue {
                line: 1,
                problem: LineProblem::InvalidGrade("A+".to_string()),
            })
        );
    }

    #[test]
    fn skip_policy_drops_bad_lines_and_reports_them() {
        let decoded = decode_str(
            "Bob,S2,Science\nAnn,S1,Math,88.5\nCid,S3,Math,x\n",
            LoadPolicy::SkipAndWarn,
        )
        .unwrap();
        assert_eq!(decoded.records, vec![Student::with_grade("Ann", "S1", "Math", 88.5)]);
        let lines: Vec<_> = decoded.issues.iter().map(|issue| issue.line).collect();
        assert_eq!(lines, vec![1, 3]);
    }

    #[test]
    fn default_policy_substitutes_missing_values() {
        let decoded = decode_str(
            "Bob,S2,Science\nCid,S3,Math,x\nDee,S4,English,55,extra\n",
            LoadPolicy::DefaultSubstitute,
        )
        .unwrap();
        assert_eq!(
            decoded.records,
            vec![
                Student::with_grade("Bob", "S2", "Science", 0.0),
                Student::with_grade("Cid", "S3", "Math", 0.0),
                Student::with_grade("Dee", "S4", "English", 55.0),
            ]
        );
        assert_eq!(decoded.issues.len(), 3);
    }

    #[test]
    fn unterminated_quote_is_reported_at_record_start() {
        let text = "Ann,S1,Math,1.0\n\"Open,S2,Math,2.0\nmore\n";
        let err = decode_str(text, LoadPolicy::FailFast).unwrap_err();
        assert_eq!(
            err,
            CodecError::Malformed(LineIssue {
                line: 2,
                problem: LineProblem::UnterminatedQuote,
            })
        );

        let decoded = decode_str(text, LoadPolicy::SkipAndWarn).unwrap();
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.issues[0].problem, LineProblem::UnterminatedQuote);
    }

    #[test]
    fn multiline_quoted_field_advances_line_numbers() {
        let text = "\"A\nB\",S1,Math,1.0\nBob,S2\n";
        let err = decode_str(text, LoadPolicy::FailFast).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(LineIssue { line: 3, .. })));
    }

    #[test]
    fn policy_parses_from_config_text() {
        assert_eq!("skip".parse::<LoadPolicy>().unwrap(), LoadPolicy::SkipAndWarn);
        assert_eq!(" Fail-Fast ".parse::<LoadPolicy>().unwrap(), LoadPolicy::FailFast);
        assert_eq!("default".parse::<LoadPolicy>().unwrap(), LoadPolicy::DefaultSubstitute);
        assert!("lenient".parse::<LoadPolicy>().is_err());
    }
}
