//! Output formatting for the command line.

use std::io;

use serde_json::Value as Json;
use yansi::Paint;

use crate::ast::ParsedScript;
use crate::datum::Datum;
use crate::result::OpResult;

/// Write JSON with one top-level element per line and colored scalars.
pub fn write_json_highlighted<W: io::Write>(w: &mut W, value: &Json, use_color: bool) -> io::Result<()> {
    match value {
        Json::Array(items) if !items.is_empty() => {
            write!(w, "[")?;
            for (i, item) in items.iter().enumerate() {
                write!(w, "\n  ")?;
                write_compact(w, item, use_color)?;
                if i < items.len() - 1 {
                    write!(w, ",")?;
                }
            }
            write!(w, "\n]")
        }
        _ => write_compact(w, value, use_color),
    }
}

fn write_compact<W: io::Write>(w: &mut W, value: &Json, use_color: bool) -> io::Result<()> {
    if !use_color {
        return write!(w, "{}", value);
    }
    match value {
        Json::String(_) => write!(w, "{}", value.to_string().green()),
        Json::Number(n) => write!(w, "{}", n.cyan()),
        Json::Bool(b) => write!(w, "{}", b.yellow()),
        Json::Null => write!(w, "{}", "null".dim()),
        Json::Array(items) => {
            write!(w, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(w, ",")?;
                }
                write_compact(w, item, use_color)?;
            }
            write!(w, "]")
        }
        Json::Object(map) => {
            write!(w, "{{")?;
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    write!(w, ",")?;
                }
                write!(w, "{}:", Json::String(key.clone()).to_string().bold())?;
                write_compact(w, item, use_color)?;
            }
            write!(w, "}}")
        }
    }
}

/// Write a result as plain text.
pub fn write_result<W: io::Write>(w: &mut W, result: &OpResult) -> io::Result<()> {
    match result {
        OpResult::Scalar(s) => match &s.group {
            Some(group) => writeln!(w, "{} ({}) = {}", s.label, group, s.value),
            None => writeln!(w, "{} = {}", s.label, s.value),
        },
        OpResult::Boolean(b) => writeln!(w, "{}: {}", b.description, b.value),
        OpResult::Interval(i) => {
            writeln!(w, "{}: {} .. {}", i.field, i.min, i.max)?;
            writeln!(w, "  min at {}", labels(&i.min_rows))?;
            writeln!(w, "  max at {}", labels(&i.max_rows))
        }
        OpResult::Rows(rows) if rows.is_empty() => writeln!(w, "(no rows)"),
        OpResult::Rows(rows) => write_rows(w, rows),
        OpResult::Null => writeln!(w, "(no result)"),
    }
}

/// Rows as aligned `category  series  value` columns.
fn write_rows<W: io::Write>(w: &mut W, rows: &[Datum]) -> io::Result<()> {
    let cells: Vec<[String; 3]> = rows
        .iter()
        .map(|d| [d.target.clone(), d.group.clone().unwrap_or_default(), d.value.to_string()])
        .collect();
    let width = |col: usize| cells.iter().map(|c| c[col].chars().count()).max().unwrap_or(0);
    let (w0, w1) = (width(0), width(1));
    for [target, group, value] in &cells {
        if w1 == 0 {
            writeln!(w, "{:<w0$}  {}", target, value)?;
        } else {
            writeln!(w, "{:<w0$}  {:<w1$}  {}", target, group, value)?;
        }
    }
    Ok(())
}

fn labels(rows: &[Datum]) -> String {
    rows.iter()
        .map(|d| match &d.group {
            Some(group) => format!("{}/{}", d.target, group),
            None => d.target.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Write a parsed script as an indented stage tree.
pub fn write_script<W: io::Write>(w: &mut W, script: &ParsedScript) -> io::Result<()> {
    write!(w, "{}", script)
}
