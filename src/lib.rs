//! todos - Monthly todo list library
//!
//! The persistence-and-derivation core behind the `todos` CLI.
//!
//! # Core Concepts
//!
//! - **Canonical list**: the one authoritative `Vec<TodoItem>`, owned by
//!   [`todo::TodoStore`] and persisted as a whole on every mutation
//! - **Derived views**: sorted and filtered copies computed on demand
//! - **Monthly goal**: completion ratio of this month's todos, with a
//!   one-shot celebration when it reaches 100%
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `config.toml`
//! - `error`: Error types and result aliases
//! - `lock`: File locking and atomic writes
//! - `output`: Human and JSON command output
//! - `progress`: Monthly progress and the celebration state machine
//! - `storage`: Key/value persistence contract and backends
//! - `todo`: Todo model and the canonical store
//! - `view`: Sorted and filtered projections

pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod output;
pub mod progress;
pub mod storage;
pub mod todo;
pub mod view;

pub use error::{Error, Result};
pub use progress::{CelebrationMonitor, Phase, Progress};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use todo::{Priority, SyncPolicy, TodoItem, TodoStore};
