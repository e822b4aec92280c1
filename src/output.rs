//! Human and JSON rendering for todos commands.
//!
//! With `--json` every command prints exactly one [`Envelope`] on stdout,
//! success or error. Otherwise commands print a sectioned [`HumanOutput`]
//! report and errors go to stderr.

use std::fmt;

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};
use crate::todo::TodoItem;

pub const SCHEMA_VERSION: &str = "todos.v1";

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
}

/// The single JSON document a command writes in `--json` mode
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub schema_version: &'static str,
    pub command: &'a str,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn from_error(err: &Error) -> Self {
        let code = err.exit_code();
        Self {
            message: err.to_string(),
            code,
            kind: if code == exit_codes::USER_ERROR {
                "user_error"
            } else {
                "operation_failed"
            },
            details: err.details(),
        }
    }
}

/// Plain-text report: a header line followed by optional sections
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    /// One detail line per todo, in the order given
    pub fn push_todos<'a>(&mut self, todos: impl IntoIterator<Item = &'a TodoItem>) {
        self.details.extend(todos.into_iter().map(todo_line));
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn next_steps(&self) -> &[String] {
        &self.next_steps
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;

        if !self.summary.is_empty() {
            f.write_str("\n\nSummary:")?;
            for (key, value) in &self.summary {
                if value.is_empty() {
                    write!(f, "\n- {key}")?;
                } else {
                    write!(f, "\n- {key}: {value}")?;
                }
            }
        }

        for (title, items) in [
            ("Details", &self.details),
            ("Warnings", &self.warnings),
            ("Next steps", &self.next_steps),
        ] {
            if items.is_empty() {
                continue;
            }
            write!(f, "\n\n{title}:")?;
            for item in items {
                write!(f, "\n- {item}")?;
            }
        }
        Ok(())
    }
}

/// `[x][High] 2025-04-01 <id> <text>`; undated todos show `ASAP`
pub fn todo_line(todo: &TodoItem) -> String {
    let mark = if todo.completed { "x" } else { " " };
    format!(
        "[{mark}][{}] {} {} {}",
        todo.priority,
        todo.due_label(),
        todo.id,
        todo.text
    )
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: &HumanOutput,
) -> Result<()> {
    if options.json {
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: Status::Success,
            data: Some(data),
            error: None,
            warnings: human.warnings().to_vec(),
            next_steps: human.next_steps().to_vec(),
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else if !options.quiet {
        println!("{human}");
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);

    if json {
        let envelope: Envelope<'_, ()> = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: Status::Error,
            data: None,
            error: Some(ErrorBody::from_error(err)),
            warnings: Vec::new(),
            next_steps,
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// First non-flag argument, used to label error output before clap parses
pub fn infer_command_name_from_args() -> String {
    command_name(std::env::args().skip(1))
}

fn command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--dir" {
            args.next();
            continue;
        }
        if !arg.starts_with('-') {
            return arg;
        }
    }
    "todos".to_string()
}

fn error_next_steps(err: &Error) -> Vec<String> {
    let step = match err {
        Error::AmbiguousId { .. } => "todos list",
        Error::InvalidConfig(_) => "fix config.toml in the data directory then retry",
        Error::LockFailed(_) => "another todos command is running; retry shortly",
        Error::StorageWrite { .. } => "check the data directory is writable, then retry",
        _ => return Vec::new(),
    };
    vec![step.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::Priority;
    use chrono::NaiveDate;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn command_name_skips_flags_and_dir_value() {
        assert_eq!(command_name(args(&["--json", "list"])), "list");
        assert_eq!(command_name(args(&["--dir", "/tmp/x", "toggle", "01"])), "toggle");
        assert_eq!(command_name(args(&["-q"])), "todos");
        assert_eq!(command_name(args(&[])), "todos");
    }

    #[test]
    fn todo_line_shows_mark_priority_and_due() {
        let mut todo = TodoItem::new(
            "01abc",
            "Pay rent",
            NaiveDate::from_ymd_opt(2025, 4, 1),
            Priority::High,
        );
        assert_eq!(todo_line(&todo), "[ ][High] 2025-04-01 01abc Pay rent");

        todo.completed = true;
        todo.date = None;
        assert_eq!(todo_line(&todo), "[x][High] ASAP 01abc Pay rent");
    }

    #[test]
    fn error_body_classifies_exit_codes() {
        let body = ErrorBody::from_error(&Error::InvalidArgument("bad date".to_string()));
        assert_eq!(body.kind, "user_error");
        assert_eq!(body.code, exit_codes::USER_ERROR);

        let body = ErrorBody::from_error(&Error::LockFailed("/tmp/.lock".into()));
        assert_eq!(body.kind, "operation_failed");
        assert!(body.details.is_some());
    }

    #[test]
    fn error_envelope_omits_data() {
        let err = Error::AmbiguousId {
            id: "01".to_string(),
            matches: 2,
        };
        let envelope: Envelope<'_, ()> = Envelope {
            schema_version: SCHEMA_VERSION,
            command: "delete",
            status: Status::Error,
            data: None,
            error: Some(ErrorBody::from_error(&err)),
            warnings: Vec::new(),
            next_steps: error_next_steps(&err),
        };
        let value = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(value["status"], "error");
        assert!(value.get("data").is_none());
        assert_eq!(value["next_steps"][0], "todos list");
    }
}
