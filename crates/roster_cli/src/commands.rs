//! One-shot subcommands: load, apply one change, save.

use crate::cli::Command;
use crate::render::{describe, write_courses, write_table};
use anyhow::{bail, Context};
use log::info;
use roster_core::codec::line_codec::format_grade;
use roster_core::{RecordKey, RosterRepository, RosterService, Student, StudentUpdate};
use std::io::Write;

/// Runs a non-interactive command against an opened service.
pub fn run_command<R, W>(
    command: Command,
    service: &mut RosterService<R>,
    out: &mut W,
) -> anyhow::Result<()>
where
    R: RosterRepository,
    W: Write,
{
    match command {
        Command::List => write_table(out, service.store())?,
        Command::Courses => write_courses(out)?,
        Command::Add {
            name,
            id,
            course,
            grade,
        } => {
            let mut student = Student::new(name, id, course);
            if let Some(text) = grade {
                if !student.apply_grade_text(&text) {
                    writeln!(
                        out,
                        "grade `{text}` is not a number; using {}",
                        format_grade(student.grade)
                    )?;
                }
            }
            let key = service.add(student);
            save(service)?;
            writeln!(out, "added #{key}")?;
        }
        Command::Update {
            key,
            name,
            id,
            course,
            grade,
        } => {
            let key = RecordKey::new(key);
            let Some(current) = service.store().get(key) else {
                bail!("no record #{key}");
            };
            let grade_given = grade.is_some();
            let update = StudentUpdate {
                name: name.unwrap_or_else(|| current.name.clone()),
                id: id.unwrap_or_else(|| current.id.clone()),
                course: course.unwrap_or_else(|| current.course.clone()),
                grade_text: grade.unwrap_or_else(|| format_grade(current.grade)),
            };
            let grade_text = update.grade_text.clone();
            let outcome = service.update(key, update)?;
            if grade_given && !outcome.grade_applied {
                writeln!(out, "grade `{grade_text}` is not a number; grade left unchanged")?;
            }
            save(service)?;
            writeln!(out, "updated #{key}")?;
        }
        Command::Delete { key } => {
            let key = RecordKey::new(key);
            match service.delete(key) {
                Some(removed) => {
                    save(service)?;
                    writeln!(out, "deleted {}", describe(key, &removed))?;
                }
                None => writeln!(out, "no record #{key}; nothing deleted")?,
            }
        }
        Command::Shell => bail!("the shell is not a one-shot command"),
    }
    Ok(())
}

fn save<R: RosterRepository>(service: &RosterService<R>) -> anyhow::Result<()> {
    service.save().context("failed to save roster")?;
    info!(
        "event=cli_command module=cli status=saved records={}",
        service.store().len()
    );
    Ok(())
}
