//! todos command implementations.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock::FileLock;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::progress::{Celebration, CelebrationMonitor, CelebrationState, Phase, Progress, SystemClock};
use crate::storage::{FileStore, KeyValueStore};
use crate::todo::{parse_due_date, LoadOutcome, Priority, TodoItem, TodoStore, CORRUPT_KEY};
use crate::view;

/// Storage key of the persisted celebration monitor state
pub const CELEBRATION_KEY: &str = "celebration";

const CELEBRATION_BANNER: &str = "Congratulations! Every todo for this month is done.";

pub struct AddOptions {
    pub text: String,
    pub date: Option<String>,
    pub priority: Option<String>,
    pub dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct IdOptions {
    pub id: String,
    pub dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct ViewOptions {
    pub dir: Option<PathBuf>,
    pub output: OutputOptions,
}

struct TodoContext {
    store: TodoStore<FileStore, CelebrationMonitor>,
    config: Config,
    load: LoadOutcome,
    _lock: FileLock,
}

/// What a command leaves behind once the store is closed
struct Finished {
    celebration: Option<Celebration>,
    phase: Phase,
    warning: Option<String>,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    if options.text.trim().is_empty() {
        tracing::debug!("blank todo text; nothing added");
        let output = TodoAddOutput {
            todo: None,
            celebrate: false,
        };
        let mut human = HumanOutput::new("Nothing added");
        human.push_detail("todo text is blank");
        return emit_success(options.output, "add", &output, &human);
    }
    let date = options.date.as_deref().map(parse_due_date).transpose()?;

    let mut ctx = load_context(options.dir)?;
    let priority = match options.priority.as_deref() {
        Some(value) => value.parse::<Priority>()?,
        None => ctx.config.todos.priority()?,
    };

    let added = ctx.store.add(&options.text, date, priority)?;
    let load = ctx.load.clone();
    let finished = finish(ctx);

    let mut human = HumanOutput::new(if added.is_some() {
        "Todo added"
    } else {
        "Nothing added"
    });
    push_load_warning(&mut human, &load);
    if let Some(todo) = &added {
        human.push_summary("ID", todo.id.clone());
        human.push_summary("Text", todo.text.clone());
        human.push_summary("Due", todo.due_label());
        human.push_summary("Priority", todo.priority.to_string());
    }
    push_finished(&mut human, &finished);

    let output = TodoAddOutput {
        todo: added,
        celebrate: finished.celebration.is_some(),
    };

    emit_success(options.output, "add", &output, &human)
}

pub fn run_list(options: ViewOptions) -> Result<()> {
    let ctx = load_context(options.dir)?;
    let todos = view::sorted(ctx.store.current_list());
    let load = ctx.load.clone();
    let finished = finish(ctx);

    let mut human = HumanOutput::new("Todos");
    push_load_warning(&mut human, &load);
    human.push_summary("Total", todos.len().to_string());
    human.push_todos(&todos);
    if todos.is_empty() {
        human.push_next_step("todos add \"<text>\"");
    }
    push_finished(&mut human, &finished);

    let output = TodoListOutput {
        total: todos.len(),
        todos,
    };

    emit_success(options.output, "list", &output, &human)
}

pub fn run_completed(options: ViewOptions) -> Result<()> {
    let ctx = load_context(options.dir)?;
    let todos = view::completed(ctx.store.current_list());
    let load = ctx.load.clone();
    let finished = finish(ctx);

    let mut human = HumanOutput::new("Completed todos");
    push_load_warning(&mut human, &load);
    human.push_summary("Total", todos.len().to_string());
    if todos.is_empty() {
        human.push_detail("no completed todos");
    }
    human.push_todos(&todos);
    push_finished(&mut human, &finished);

    let output = TodoListOutput {
        total: todos.len(),
        todos,
    };

    emit_success(options.output, "completed", &output, &human)
}

pub fn run_toggle(options: IdOptions) -> Result<()> {
    let mut ctx = load_context(options.dir)?;
    let toggled = match ctx.store.resolve_id(&options.id)? {
        Some(id) => ctx.store.toggle(&id)?.map(|completed| (id, completed)),
        None => None,
    };
    let load = ctx.load.clone();
    let finished = finish(ctx);

    let mut human = HumanOutput::new(match toggled {
        Some((_, true)) => "Todo completed",
        Some((_, false)) => "Todo reopened",
        None => "No matching todo",
    });
    push_load_warning(&mut human, &load);
    let output = match toggled {
        Some((id, completed)) => {
            human.push_summary("ID", id.clone());
            TodoToggleOutput {
                id,
                changed: true,
                completed: Some(completed),
                celebrate: finished.celebration.is_some(),
            }
        }
        None => {
            human.push_summary("ID", options.id.trim());
            human.push_next_step("todos list");
            TodoToggleOutput {
                id: options.id.trim().to_string(),
                changed: false,
                completed: None,
                celebrate: false,
            }
        }
    };
    push_finished(&mut human, &finished);

    emit_success(options.output, "toggle", &output, &human)
}

pub fn run_delete(options: IdOptions) -> Result<()> {
    let mut ctx = load_context(options.dir)?;
    let removed = match ctx.store.resolve_id(&options.id)? {
        Some(id) => ctx.store.delete(&id)?,
        None => None,
    };
    let load = ctx.load.clone();
    let finished = finish(ctx);

    let mut human = HumanOutput::new(if removed.is_some() {
        "Todo deleted"
    } else {
        "No matching todo"
    });
    push_load_warning(&mut human, &load);
    let output = match removed {
        Some(todo) => {
            human.push_summary("ID", todo.id.clone());
            human.push_summary("Text", todo.text.clone());
            TodoDeleteOutput {
                id: todo.id,
                deleted: true,
                text: Some(todo.text),
                celebrate: finished.celebration.is_some(),
            }
        }
        None => {
            human.push_summary("ID", options.id.trim());
            human.push_next_step("todos list");
            TodoDeleteOutput {
                id: options.id.trim().to_string(),
                deleted: false,
                text: None,
                celebrate: false,
            }
        }
    };
    push_finished(&mut human, &finished);

    emit_success(options.output, "delete", &output, &human)
}

pub fn run_progress(options: ViewOptions) -> Result<()> {
    let ctx = load_context(options.dir)?;
    let progress = ctx
        .store
        .hook()
        .progress()
        .unwrap_or_else(|| Progress::of(ctx.store.current_list(), chrono::Local::now().date_naive()));
    let load = ctx.load.clone();
    let finished = finish(ctx);

    let output = ProgressOutput {
        completed: progress.completed,
        total: progress.total,
        ratio: progress.ratio,
        phase: finished.phase,
        celebrating: finished.phase == Phase::Celebrating,
    };

    let mut human = HumanOutput::new("This month");
    push_load_warning(&mut human, &load);
    human.push_summary("Done", progress.label());
    human.push_summary("Progress", format!("{}%", progress.percent()));
    push_finished(&mut human, &finished);
    if finished.celebration.is_none() && finished.phase == Phase::Celebrating {
        human.push_detail(CELEBRATION_BANNER);
        human.push_next_step("todos dismiss");
    }

    emit_success(options.output, "progress", &output, &human)
}

pub fn run_dismiss(options: ViewOptions) -> Result<()> {
    let mut ctx = load_context(options.dir)?;
    let dismissed = ctx.store.hook_mut().dismiss();
    let finished = finish(ctx);

    let output = DismissOutput { dismissed };

    let mut human = HumanOutput::new(if dismissed {
        "Celebration dismissed"
    } else {
        "Nothing to dismiss"
    });
    if let Some(warning) = finished.warning {
        human.push_warning(warning);
    }

    emit_success(options.output, "dismiss", &output, &human)
}

/// Rewrite the stored list as loaded: dates in `YYYY-MM-DD`, defaults
/// filled in, unusable items dropped.
pub fn run_sync(options: ViewOptions) -> Result<()> {
    let mut ctx = load_context(options.dir)?;
    ctx.store.retry_sync()?;
    let count = ctx.store.current_list().len();
    let load = ctx.load.clone();
    let finished = finish(ctx);

    let dropped = match &load {
        LoadOutcome::Salvaged { skipped, .. } => skipped.len(),
        _ => 0,
    };
    let output = SyncOutput {
        todos: count,
        dropped,
    };

    let mut human = HumanOutput::new("Todos rewritten");
    push_load_warning(&mut human, &load);
    human.push_summary("Todos", count.to_string());
    if dropped > 0 {
        human.push_summary("Dropped", dropped.to_string());
    }
    push_finished(&mut human, &finished);

    emit_success(options.output, "sync", &output, &human)
}

/// Data directory: explicit flag/env first, then the platform data dir
pub fn resolve_data_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = dir {
        return Ok(dir);
    }
    ProjectDirs::from("", "", "todos")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidConfig("cannot determine a data directory; pass --dir".to_string())
        })
}

fn load_context(dir: Option<PathBuf>) -> Result<TodoContext> {
    let dir = resolve_data_dir(dir)?;
    let backend = FileStore::new(dir.clone());
    backend.init()?;

    let config = Config::load_from_dir(&dir);
    let policy = config.storage.policy()?;
    let lock = backend.session_lock(config.storage.lock_timeout_ms)?;

    let state = load_celebration_state(&backend);
    let monitor = CelebrationMonitor::from_state(SystemClock, state);
    let (store, load) = TodoStore::open(backend, monitor, policy);
    tracing::debug!(dir = %dir.display(), outcome = ?load, "opened todo store");

    Ok(TodoContext {
        store,
        config,
        load,
        _lock: lock,
    })
}

fn load_celebration_state(backend: &FileStore) -> CelebrationState {
    let raw = match backend.get(CELEBRATION_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return CelebrationState::default(),
        Err(err) => {
            tracing::warn!(error = %err, "celebration state unreadable; starting idle");
            return CelebrationState::default();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "celebration state malformed; starting idle");
        CelebrationState::default()
    })
}

/// Close the store and persist the monitor state while still locked
fn finish(ctx: TodoContext) -> Finished {
    let TodoContext { store, _lock, .. } = ctx;
    let (mut backend, mut monitor) = store.close();
    let celebration = monitor.take_celebration();
    let phase = monitor.phase();

    let warning = serde_json::to_string(&monitor.state())
        .map_err(Error::from)
        .and_then(|json| backend.set(CELEBRATION_KEY, &json))
        .err()
        .map(|err| {
            tracing::warn!(error = %err, "failed to persist celebration state");
            format!("celebration state not saved: {err}")
        });

    Finished {
        celebration,
        phase,
        warning,
    }
}

fn push_load_warning(human: &mut HumanOutput, load: &LoadOutcome) {
    match load {
        LoadOutcome::Unreadable(reason) => {
            human.push_warning(format!("stored todos unreadable, started empty: {reason}"));
        }
        LoadOutcome::Malformed(reason) => {
            human.push_warning(format!(
                "stored todos malformed, started empty (raw copy kept as {CORRUPT_KEY}.json): {reason}"
            ));
        }
        LoadOutcome::Salvaged { skipped, .. } => {
            human.push_warning(format!(
                "skipped {} unusable stored todo(s) (raw copy kept as {CORRUPT_KEY}.json)",
                skipped.len()
            ));
            for reason in skipped {
                human.push_warning(format!("skipped {reason}"));
            }
        }
        LoadOutcome::Loaded(_) | LoadOutcome::Missing => {}
    }
}

fn push_finished(human: &mut HumanOutput, finished: &Finished) {
    if let Some(celebration) = finished.celebration {
        human.push_detail(format!(
            "{CELEBRATION_BANNER} ({})",
            celebration.progress.label()
        ));
        human.push_next_step("todos dismiss");
    }
    if let Some(warning) = finished.warning.as_ref() {
        human.push_warning(warning.clone());
    }
}

#[derive(Serialize)]
struct TodoAddOutput {
    /// `None` when the text was blank
    todo: Option<TodoItem>,
    celebrate: bool,
}

#[derive(Serialize)]
struct TodoListOutput {
    total: usize,
    todos: Vec<TodoItem>,
}

#[derive(Serialize)]
struct TodoToggleOutput {
    id: String,
    changed: bool,
    completed: Option<bool>,
    celebrate: bool,
}

#[derive(Serialize)]
struct TodoDeleteOutput {
    id: String,
    deleted: bool,
    text: Option<String>,
    celebrate: bool,
}

#[derive(Serialize)]
struct ProgressOutput {
    completed: usize,
    total: usize,
    ratio: f64,
    phase: Phase,
    celebrating: bool,
}

#[derive(Serialize)]
struct DismissOutput {
    dismissed: bool,
}

#[derive(Serialize)]
struct SyncOutput {
    todos: usize,
    dropped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let dir = PathBuf::from("/tmp/explicit");
        assert_eq!(resolve_data_dir(Some(dir.clone())).expect("dir"), dir);
    }

    #[test]
    fn celebration_state_falls_back_when_malformed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut backend = FileStore::new(temp.path());
        assert_eq!(load_celebration_state(&backend), CelebrationState::default());

        backend.set(CELEBRATION_KEY, "{broken").expect("write");
        assert_eq!(load_celebration_state(&backend), CelebrationState::default());

        backend
            .set(CELEBRATION_KEY, r#"{"phase":"celebrating","last_complete":true,"fired":3}"#)
            .expect("write");
        let state = load_celebration_state(&backend);
        assert_eq!(state.phase, Phase::Celebrating);
        assert_eq!(state.fired, 3);
    }
}
