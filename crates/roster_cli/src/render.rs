//! Plain-text table rendering.

use roster_core::codec::line_codec::format_grade;
use roster_core::{course_catalog, RecordKey, RecordStore, Student};
use std::io::{self, Write};

const HEADERS: [&str; 5] = ["#", "Name", "ID", "Course", "Grade"];

/// Writes the roster as an aligned table, or a hint when it is empty.
pub fn write_table<W: Write>(out: &mut W, store: &RecordStore) -> io::Result<()> {
    if store.is_empty() {
        return writeln!(out, "(no records)");
    }

    let rows: Vec<[String; 5]> = store.iter().map(|(key, student)| row(key, student)).collect();
    let mut widths = HEADERS.map(|header| header.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    write_row(out, &HEADERS.map(str::to_string), &widths)?;
    for row in &rows {
        write_row(out, row, &widths)?;
    }
    Ok(())
}

pub fn write_courses<W: Write>(out: &mut W) -> io::Result<()> {
    for course in course_catalog() {
        writeln!(out, "{course}")?;
    }
    Ok(())
}

/// One-line description used in confirmations and notices.
pub fn describe(key: RecordKey, student: &Student) -> String {
    format!("#{key} {} ({})", flatten(&student.name), flatten(&student.id))
}

fn row(key: RecordKey, student: &Student) -> [String; 5] {
    [
        key.to_string(),
        flatten(&student.name),
        flatten(&student.id),
        flatten(&student.course),
        format_grade(student.grade),
    ]
}

fn write_row<W: Write>(out: &mut W, cells: &[String; 5], widths: &[usize; 5]) -> io::Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(out, "{}", line.trim_end())
}

fn flatten(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
