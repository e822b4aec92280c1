//! Todo model and the canonical todo store.
//!
//! The whole list is stored as one JSON array under [`TODOS_KEY`]. Every
//! mutation goes through [`TodoStore::replace_all`], which writes the full
//! list in a single `set` and then notifies the store's [`MutationHook`].

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::storage::KeyValueStore;

/// Storage key of the canonical todo list
pub const TODOS_KEY: &str = "todos";

/// Storage key receiving the raw blob of a snapshot that lost data on load
pub const CORRUPT_KEY: &str = "todos.corrupt";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[default]
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Position in display order; High sorts first
    pub fn rank(self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown priority '{trimmed}' (expected High, Medium or Low)"
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    #[serde(default, with = "due_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
}

impl TodoItem {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        date: Option<NaiveDate>,
        priority: Priority,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            date,
            priority,
            completed: false,
        }
    }

    /// Due date label; undated todos read as "as soon as possible"
    pub fn due_label(&self) -> String {
        match self.date {
            Some(date) => date.format(DATE_FORMAT).to_string(),
            None => "ASAP".to_string(),
        }
    }
}

/// Parse a due date from `YYYY-MM-DD` or a full RFC 3339 timestamp.
///
/// Timestamps are converted to the local calendar date.
pub fn parse_due_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|ts| ts.with_timezone(&Local).date_naive())
        .map_err(|err| Error::InvalidArgument(format!("invalid date '{trimmed}': {err}")))
}

mod due_date {
    use super::*;

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.format(DATE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_due_date(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Check the list is well formed: non-empty unique ids, non-empty text
pub fn validate_todos(todos: &[TodoItem]) -> Result<()> {
    let mut seen = HashSet::new();
    for todo in todos {
        validate_item(todo)?;
        if !seen.insert(todo.id.as_str()) {
            return Err(Error::InvalidArgument(format!(
                "duplicate todo id '{}'",
                todo.id
            )));
        }
    }
    Ok(())
}

fn validate_item(todo: &TodoItem) -> Result<()> {
    if todo.id.trim().is_empty() {
        return Err(Error::InvalidArgument("todo id cannot be empty".to_string()));
    }
    if todo.text.trim().is_empty() {
        return Err(Error::InvalidArgument(format!(
            "todo '{}' has empty text",
            todo.id
        )));
    }
    Ok(())
}

/// Usable todos decoded from a persisted snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub todos: Vec<TodoItem>,
    /// One reason per dropped item
    pub skipped: Vec<String>,
}

/// Parse a persisted snapshot item by item.
///
/// `null` and blank input mean "no todos"; anything other than a JSON
/// array is malformed. Items that fail to decode, have an empty id or
/// text, or repeat an earlier id are dropped and listed in `skipped`.
pub fn parse_snapshot(raw: &str) -> Result<Snapshot> {
    if raw.trim().is_empty() {
        return Ok(Snapshot::default());
    }
    let items: Option<Vec<serde_json::Value>> =
        serde_json::from_str(raw).map_err(|err| Error::MalformedSnapshot {
            key: TODOS_KEY.to_string(),
            reason: err.to_string(),
        })?;

    let mut snapshot = Snapshot::default();
    let mut seen = HashSet::new();
    for (index, item) in items.unwrap_or_default().into_iter().enumerate() {
        let todo = match serde_json::from_value::<TodoItem>(item) {
            Ok(todo) => todo,
            Err(err) => {
                snapshot.skipped.push(format!("item {index}: {err}"));
                continue;
            }
        };
        if let Err(err) = validate_item(&todo) {
            snapshot.skipped.push(format!("item {index}: {err}"));
            continue;
        }
        if !seen.insert(todo.id.clone()) {
            snapshot
                .skipped
                .push(format!("item {index}: duplicate todo id '{}'", todo.id));
            continue;
        }
        snapshot.todos.push(todo);
    }
    Ok(snapshot)
}

/// Generate a fresh time-ordered id not present in `existing`
pub fn generate_todo_id(existing: &[TodoItem]) -> String {
    loop {
        let id = Ulid::new().to_string().to_ascii_lowercase();
        if !existing.iter().any(|todo| todo.id == id) {
            return id;
        }
    }
}

/// What happens to the in-memory list when a write fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Commit in memory only after the write succeeded
    #[default]
    Strict,
    /// Commit in memory first; a failed write leaves the store unsynced
    Optimistic,
}

/// Observer run after every committed change of the canonical list
pub trait MutationHook {
    fn observe(&mut self, todos: &[TodoItem]);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoHook;

impl MutationHook for NoHook {
    fn observe(&mut self, _todos: &[TodoItem]) {}
}

/// How the initial snapshot was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    /// Some items were unusable and dropped; the rest loaded
    Salvaged { loaded: usize, skipped: Vec<String> },
    Missing,
    Unreadable(String),
    Malformed(String),
}

impl LoadOutcome {
    /// True when some or all persisted todos could not be used
    pub fn degraded(&self) -> bool {
        !matches!(self, LoadOutcome::Loaded(_) | LoadOutcome::Missing)
    }
}

/// The single owner of the canonical todo list
#[derive(Debug)]
pub struct TodoStore<S, H = NoHook> {
    backend: S,
    hook: H,
    policy: SyncPolicy,
    todos: Vec<TodoItem>,
    synced: bool,
}

impl<S: KeyValueStore> TodoStore<S, NoHook> {
    pub fn new(backend: S) -> Self {
        Self::with_hook(backend, NoHook)
    }
}

impl<S: KeyValueStore, H: MutationHook> TodoStore<S, H> {
    /// Create an empty, not yet loaded store
    pub fn with_hook(backend: S, hook: H) -> Self {
        Self {
            backend,
            hook,
            policy: SyncPolicy::default(),
            todos: Vec::new(),
            synced: true,
        }
    }

    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create a store and load the persisted snapshot
    pub fn open(backend: S, hook: H, policy: SyncPolicy) -> (Self, LoadOutcome) {
        let mut store = Self::with_hook(backend, hook).with_policy(policy);
        let outcome = store.load();
        (store, outcome)
    }

    /// Tear the store down, handing back its backend and hook
    pub fn close(self) -> (S, H) {
        if !self.synced {
            tracing::warn!(todos = self.todos.len(), "closing store with unsynced changes");
        }
        (self.backend, self.hook)
    }

    /// Read the persisted snapshot, degrading to an empty list on failure
    pub fn load(&mut self) -> LoadOutcome {
        let outcome = match self.backend.get(TODOS_KEY) {
            Ok(None) => {
                tracing::debug!("no persisted todos; starting empty");
                self.todos = Vec::new();
                LoadOutcome::Missing
            }
            Ok(Some(raw)) => match parse_snapshot(&raw) {
                Ok(Snapshot { todos, skipped }) if skipped.is_empty() => {
                    tracing::debug!(count = todos.len(), "loaded todos");
                    let count = todos.len();
                    self.todos = todos;
                    LoadOutcome::Loaded(count)
                }
                Ok(Snapshot { todos, skipped }) => {
                    for reason in &skipped {
                        tracing::warn!(reason = %reason, "dropping unusable todo");
                    }
                    self.preserve_raw(&raw);
                    let loaded = todos.len();
                    self.todos = todos;
                    LoadOutcome::Salvaged { loaded, skipped }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "malformed todo snapshot; starting empty");
                    self.preserve_raw(&raw);
                    self.todos = Vec::new();
                    LoadOutcome::Malformed(err.to_string())
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "todo snapshot unreadable; starting empty");
                self.todos = Vec::new();
                LoadOutcome::Unreadable(err.to_string())
            }
        };
        self.synced = true;
        self.hook.observe(&self.todos);
        outcome
    }

    /// Copy a snapshot that lost data to [`CORRUPT_KEY`] so the next
    /// write does not destroy the only copy
    fn preserve_raw(&mut self, raw: &str) {
        if let Err(err) = self.backend.set(CORRUPT_KEY, raw) {
            tracing::warn!(error = %err, "could not preserve raw snapshot");
        }
    }

    /// The canonical list in insertion order
    pub fn current_list(&self) -> &[TodoItem] {
        &self.todos
    }

    pub fn get(&self, id: &str) -> Option<&TodoItem> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// False after an optimistic commit whose write failed
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }

    pub fn hook_mut(&mut self) -> &mut H {
        &mut self.hook
    }

    /// Replace the canonical list and persist it with one write.
    ///
    /// Under [`SyncPolicy::Strict`] a failed write leaves the previous
    /// list in place. Under [`SyncPolicy::Optimistic`] the new list stays
    /// committed in memory and the store is marked unsynced. The write
    /// error is returned either way.
    pub fn replace_all(&mut self, todos: Vec<TodoItem>) -> Result<()> {
        validate_todos(&todos)?;
        let serialized = serde_json::to_string(&todos)?;

        match self.policy {
            SyncPolicy::Strict => {
                self.persist(&serialized)?;
                self.todos = todos;
                self.synced = true;
                self.hook.observe(&self.todos);
                Ok(())
            }
            SyncPolicy::Optimistic => {
                self.todos = todos;
                self.hook.observe(&self.todos);
                let result = self.persist(&serialized);
                self.synced = result.is_ok();
                result
            }
        }
    }

    /// Write the current list again, e.g. after an optimistic failure
    pub fn retry_sync(&mut self) -> Result<()> {
        let serialized = serde_json::to_string(&self.todos)?;
        self.persist(&serialized)?;
        self.synced = true;
        Ok(())
    }

    fn persist(&mut self, serialized: &str) -> Result<()> {
        match self.backend.set(TODOS_KEY, serialized) {
            Ok(()) => {
                tracing::debug!(bytes = serialized.len(), "persisted todos");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, policy = ?self.policy, "failed to persist todos");
                Err(err)
            }
        }
    }

    /// Append a new todo. Blank text is a silent no-op (`Ok(None)`).
    pub fn add(
        &mut self,
        text: &str,
        date: Option<NaiveDate>,
        priority: Priority,
    ) -> Result<Option<TodoItem>> {
        if text.trim().is_empty() {
            tracing::debug!("ignoring todo with blank text");
            return Ok(None);
        }

        let todo = TodoItem::new(generate_todo_id(&self.todos), text, date, priority);
        let mut next = self.todos.clone();
        next.push(todo.clone());
        self.replace_all(next)?;
        Ok(Some(todo))
    }

    /// Flip `completed` on the matching todo; returns the new state.
    ///
    /// An unknown id is a no-op and performs no write.
    pub fn toggle(&mut self, id: &str) -> Result<Option<bool>> {
        let Some(index) = self.todos.iter().position(|todo| todo.id == id) else {
            return Ok(None);
        };

        let mut next = self.todos.clone();
        next[index].completed = !next[index].completed;
        let completed = next[index].completed;
        self.replace_all(next)?;
        Ok(Some(completed))
    }

    /// Remove the matching todo; an unknown id is a no-op.
    pub fn delete(&mut self, id: &str) -> Result<Option<TodoItem>> {
        let Some(index) = self.todos.iter().position(|todo| todo.id == id) else {
            return Ok(None);
        };

        let mut next = self.todos.clone();
        let removed = next.remove(index);
        self.replace_all(next)?;
        Ok(Some(removed))
    }

    /// Resolve a full id or unique case-insensitive prefix.
    ///
    /// `Ok(None)` when nothing matches; an ambiguous prefix is an error.
    pub fn resolve_id(&self, input: &str) -> Result<Option<String>> {
        let needle = input.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Err(Error::InvalidArgument("todo id cannot be empty".to_string()));
        }
        if let Some(todo) = self.todos.iter().find(|todo| todo.id.to_ascii_lowercase() == needle) {
            return Ok(Some(todo.id.clone()));
        }

        let matches: Vec<&TodoItem> = self
            .todos
            .iter()
            .filter(|todo| todo.id.to_ascii_lowercase().starts_with(&needle))
            .collect();
        match matches.as_slice() {
            [] => Ok(None),
            [todo] => Ok(Some(todo.id.clone())),
            many => Err(Error::AmbiguousId {
                id: input.trim().to_string(),
                matches: many.len(),
            }),
        }
    }
}
