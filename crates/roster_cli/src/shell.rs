//! Interactive roster session.
//!
//! # Responsibility
//! - Hold the session state (service plus any in-flight save) explicitly and
//!   pass it to every command handler.
//! - Save only on request, in the background, and report completion at the
//!   next prompt.
//! - Ask about unsaved changes before leaving.

use crate::render::{describe, write_courses, write_table};
use anyhow::bail;
use roster_core::codec::line_codec::format_grade;
use roster_core::{
    RecordKey, RosterRepository, RosterService, SaveOutcome, SaveTicket, Student, StudentUpdate,
};
use std::io::{BufRead, Write};

const PROMPT: &str = "roster> ";
const KEEP: &str = "-";

const HELP: &str = "\
commands:
  list                                   show all records
  add <name> <id> <course> [grade]       append a record
  update <key> <name> <id> <course> <grade>
                                         replace fields; `-` keeps a value
  delete <key>                           remove a record (asks first)
  find <id>                              show the first record with this ID
  courses                                list the course catalog
  save                                   write the roster in the background
  status                                 report unsaved changes
  help                                   show this text
  quit                                   leave (asks to save unsaved changes)
quote values containing spaces: add \"Ann Lee\" S1 Math";

enum Flow {
    Continue,
    Quit,
}

/// Session state for one interactive run.
pub struct Shell<R: RosterRepository> {
    service: RosterService<R>,
    pending_save: Option<SaveTicket>,
}

impl<R> Shell<R>
where
    R: RosterRepository + Clone + Send + 'static,
{
    pub fn new(service: RosterService<R>) -> Self {
        Self {
            service,
            pending_save: None,
        }
    }

    /// Reads commands until `quit` or end of input.
    pub fn run<I: BufRead, W: Write>(&mut self, input: &mut I, out: &mut W) -> anyhow::Result<()> {
        writeln!(
            out,
            "{} record(s) loaded. Type `help` for commands.",
            self.service.store().len()
        )?;

        loop {
            self.report_finished_save(out)?;
            write!(out, "{PROMPT}")?;
            out.flush()?;

            let Some(line) = read_line(input)? else {
                writeln!(out)?;
                return self.quit(input, out);
            };

            let words = match split_words(&line) {
                Ok(words) => words,
                Err(message) => {
                    writeln!(out, "{message}")?;
                    continue;
                }
            };

            match self.dispatch(&words, input, out) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => return self.quit(input, out),
                Err(err) => writeln!(out, "error: {err}")?,
            }
        }
    }

    fn dispatch<I: BufRead, W: Write>(
        &mut self,
        words: &[String],
        input: &mut I,
        out: &mut W,
    ) -> anyhow::Result<Flow> {
        let Some((command, args)) = words.split_first() else {
            return Ok(Flow::Continue);
        };

        match (command.as_str(), args) {
            ("list" | "ls", []) => write_table(out, self.service.store())?,
            ("add", [name, id, course, rest @ ..]) if rest.len() <= 1 => {
                let mut student = Student::new(name.as_str(), id.as_str(), course.as_str());
                if let Some(text) = rest.first() {
                    if !student.apply_grade_text(text) {
                        writeln!(
                            out,
                            "grade `{text}` is not a number; using {}",
                            format_grade(student.grade)
                        )?;
                    }
                }
                let key = self.service.add(student);
                writeln!(out, "added #{key}")?;
            }
            ("update", [key, name, id, course, grade]) => {
                let key = parse_key(key)?;
                self.update(key, [name, id, course, grade], out)?;
            }
            ("delete" | "rm", [key]) => {
                let key = parse_key(key)?;
                self.delete(key, input, out)?;
            }
            ("find", [id]) => match self.service.store().find_by_student_id(id) {
                Some((key, student)) => writeln!(
                    out,
                    "{} {} {}",
                    describe(key, student),
                    student.course,
                    format_grade(student.grade)
                )?,
                None => writeln!(out, "no record with ID `{id}`")?,
            },
            ("courses", []) => write_courses(out)?,
            ("save", []) => self.start_save(out)?,
            ("status", []) => {
                if let Some(ticket) = self.pending_save.take() {
                    report_outcome(ticket.wait(), out)?;
                }
                if self.service.has_unsaved_changes() {
                    writeln!(out, "unsaved changes")?;
                } else {
                    writeln!(out, "all changes saved")?;
                }
            }
            ("help" | "?", []) => writeln!(out, "{HELP}")?,
            ("quit" | "exit" | "q", []) => return Ok(Flow::Quit),
            (other, _) => bail!("unknown command or wrong arguments: `{other}` (try `help`)"),
        }
        Ok(Flow::Continue)
    }

    fn update<W: Write>(
        &mut self,
        key: RecordKey,
        [name, id, course, grade]: [&String; 4],
        out: &mut W,
    ) -> anyhow::Result<()> {
        let Some(current) = self.service.store().get(key) else {
            bail!("no record #{key}");
        };
        let keep = |value: &String, existing: &str| {
            if value == KEEP {
                existing.to_string()
            } else {
                value.clone()
            }
        };
        let update = StudentUpdate {
            name: keep(name, &current.name),
            id: keep(id, &current.id),
            course: keep(course, &current.course),
            grade_text: keep(grade, &format_grade(current.grade)),
        };

        let outcome = self.service.update(key, update)?;
        if !outcome.grade_applied {
            writeln!(out, "grade `{grade}` is not a number; grade left unchanged")?;
        }
        writeln!(out, "updated #{key}")?;
        Ok(())
    }

    fn delete<I: BufRead, W: Write>(
        &mut self,
        key: RecordKey,
        input: &mut I,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let Some(student) = self.service.store().get(key) else {
            writeln!(out, "no record #{key}; nothing deleted")?;
            return Ok(());
        };
        let question = format!("Delete {} from record?", describe(key, student));
        if confirm(&question, input, out)? {
            self.service.delete(key);
            writeln!(out, "deleted #{key}")?;
        }
        Ok(())
    }

    fn start_save<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        if let Some(ticket) = self.pending_save.take() {
            writeln!(out, "waiting for the previous save...")?;
            report_outcome(ticket.wait(), out)?;
        }
        self.pending_save = Some(self.service.save_in_background());
        writeln!(out, "saving...")?;
        Ok(())
    }

    fn report_finished_save<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        let Some(ticket) = &self.pending_save else {
            return Ok(());
        };
        if let Some(outcome) = ticket.try_outcome() {
            self.pending_save = None;
            report_outcome(outcome, out)?;
        }
        Ok(())
    }

    fn quit<I: BufRead, W: Write>(&mut self, input: &mut I, out: &mut W) -> anyhow::Result<()> {
        if let Some(ticket) = self.pending_save.take() {
            report_outcome(ticket.wait(), out)?;
        }

        if self.service.has_unsaved_changes()
            && confirm("Would you like to save your last update?", input, out)?
        {
            match self.service.save() {
                Ok(()) => writeln!(out, "saved {} record(s)", self.service.store().len())?,
                Err(err) => writeln!(out, "save failed: {err}")?,
            }
        }
        Ok(())
    }
}

fn report_outcome<W: Write>(outcome: SaveOutcome, out: &mut W) -> anyhow::Result<()> {
    match outcome {
        SaveOutcome::Saved { records } => writeln!(out, "saved {records} record(s)")?,
        SaveOutcome::Failed(err) => writeln!(out, "save failed: {err}")?,
        SaveOutcome::NotStarted(err) => {
            writeln!(out, "save failed: could not start worker: {err}")?
        }
        SaveOutcome::Interrupted => writeln!(out, "save failed: worker stopped unexpectedly")?,
    }
    Ok(())
}

fn confirm<I: BufRead, W: Write>(question: &str, input: &mut I, out: &mut W) -> anyhow::Result<bool> {
    write!(out, "{question} [y/N] ")?;
    out.flush()?;
    let answer = read_line(input)?.unwrap_or_default();
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn read_line<I: BufRead>(input: &mut I) -> anyhow::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn parse_key(text: &str) -> anyhow::Result<RecordKey> {
    let digits = text.strip_prefix('#').unwrap_or(text);
    match digits.parse::<u64>() {
        Ok(value) => Ok(RecordKey::new(value)),
        Err(_) => bail!("`{text}` is not a record key"),
    }
}

/// Splits a command line on whitespace; double quotes group words.
fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_word = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_word = true;
            }
            ch if ch.is_whitespace() && !in_quotes => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
            }
            ch => {
                current.push(ch);
                has_word = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quote".to_string());
    }
    if has_word {
        words.push(current);
    }
    Ok(words)
}
