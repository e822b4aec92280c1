//! Command-line interface for todos
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in `todo`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::output::OutputOptions;

mod todo;

/// todos - Monthly todo list
///
/// Keeps a persisted todo list, shows it sorted by due date and priority,
/// and celebrates when every todo for the current month is done.
#[derive(Parser, Debug)]
#[command(name = "todos")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "TODOS_DIR")]
    pub dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a todo
    Add {
        /// Todo text
        text: String,

        /// Due date (YYYY-MM-DD); omit for "as soon as possible"
        #[arg(short, long)]
        date: Option<String>,

        /// Priority: high, medium, low (defaults to config)
        #[arg(short, long)]
        priority: Option<String>,
    },

    /// List todos by due date, then priority
    List,

    /// List completed todos
    Completed,

    /// Flip a todo between done and not done
    Toggle {
        /// Todo ID or unique prefix
        id: String,
    },

    /// Delete a todo
    Delete {
        /// Todo ID or unique prefix
        id: String,
    },

    /// Show this month's completion progress
    Progress,

    /// Acknowledge the monthly goal celebration
    Dismiss,

    /// Rewrite the stored list in normalized form
    Sync,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let dir = self.dir;
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Add { text, date, priority } => todo::run_add(todo::AddOptions {
                text,
                date,
                priority,
                dir,
                output,
            }),
            Commands::List => todo::run_list(todo::ViewOptions { dir, output }),
            Commands::Completed => todo::run_completed(todo::ViewOptions { dir, output }),
            Commands::Toggle { id } => todo::run_toggle(todo::IdOptions {
                id,
                dir,
                output,
            }),
            Commands::Delete { id } => todo::run_delete(todo::IdOptions {
                id,
                dir,
                output,
            }),
            Commands::Progress => todo::run_progress(todo::ViewOptions { dir, output }),
            Commands::Dismiss => todo::run_dismiss(todo::ViewOptions { dir, output }),
            Commands::Sync => todo::run_sync(todo::ViewOptions { dir, output }),
        }
    }
}
