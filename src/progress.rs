//! Monthly completion progress and the celebration state machine.
//!
//! A todo counts toward this month's goal when it has no date or its date
//! falls in the clock's calendar month. Only the month is compared, so a
//! todo dated March of any year counts in March. When every counted todo is complete the monitor moves
//! Idle -> Celebrating, once per crossing. Only [`CelebrationMonitor::dismiss`]
//! moves it back to Idle, and the trigger re-arms as soon as the goal is
//! observed incomplete again.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::todo::{MutationHook, TodoItem};

/// Source of "today" for month scoping
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Whether a todo counts toward the month containing `today`
pub fn is_relevant(todo: &TodoItem, today: NaiveDate) -> bool {
    match todo.date {
        None => true,
        Some(date) => date.month() == today.month(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    /// `completed / total`, or 0 when nothing counts
    pub ratio: f64,
}

impl Progress {
    pub fn of(todos: &[TodoItem], today: NaiveDate) -> Self {
        let (completed, total) = todos
            .iter()
            .filter(|todo| is_relevant(todo, today))
            .fold((0, 0), |(completed, total), todo| {
                (completed + usize::from(todo.completed), total + 1)
            });
        let ratio = if total > 0 {
            completed as f64 / total as f64
        } else {
            0.0
        };
        Self {
            completed,
            total,
            ratio,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }

    /// "completed/total"
    pub fn label(&self) -> String {
        format!("{}/{}", self.completed, self.total)
    }

    pub fn percent(&self) -> u32 {
        (self.ratio * 100.0).round() as u32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Celebrating,
}

/// Persistable monitor state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CelebrationState {
    #[serde(default)]
    pub phase: Phase,
    /// Whether the previous observation met the goal
    #[serde(default)]
    pub last_complete: bool,
    /// Number of Idle/Celebrating crossings so far
    #[serde(default)]
    pub fired: u64,
}

/// Emitted when an observation crosses into a fully completed month
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Celebration {
    pub progress: Progress,
}

#[derive(Debug)]
pub struct CelebrationMonitor<C = SystemClock> {
    clock: C,
    state: CelebrationState,
    last: Option<Progress>,
    pending: Option<Celebration>,
}

impl Default for CelebrationMonitor<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> CelebrationMonitor<C> {
    pub fn new(clock: C) -> Self {
        Self::from_state(clock, CelebrationState::default())
    }

    /// Resume from previously persisted state
    pub fn from_state(clock: C, state: CelebrationState) -> Self {
        Self {
            clock,
            state,
            last: None,
            pending: None,
        }
    }

    pub fn state(&self) -> CelebrationState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_celebrating(&self) -> bool {
        self.state.phase == Phase::Celebrating
    }

    pub fn fired_count(&self) -> u64 {
        self.state.fired
    }

    /// Progress seen by the latest observation
    pub fn progress(&self) -> Option<Progress> {
        self.last
    }

    /// Evaluate the list; returns the celebration if this observation
    /// crossed into a fully completed month.
    pub fn observe_list(&mut self, todos: &[TodoItem]) -> Option<Celebration> {
        let progress = Progress::of(todos, self.clock.today());
        let complete = progress.is_complete();
        let crossed = complete && !self.state.last_complete;

        self.state.last_complete = complete;
        self.last = Some(progress);

        if !crossed {
            return None;
        }

        self.state.phase = Phase::Celebrating;
        self.state.fired += 1;
        tracing::info!(progress = %progress.label(), fired = self.state.fired, "monthly goal completed");
        let celebration = Celebration { progress };
        self.pending = Some(celebration);
        Some(celebration)
    }

    /// Take the celebration raised since the last call, if any
    pub fn take_celebration(&mut self) -> Option<Celebration> {
        self.pending.take()
    }

    /// Acknowledge the celebration. Returns false when already Idle.
    pub fn dismiss(&mut self) -> bool {
        if self.state.phase != Phase::Celebrating {
            return false;
        }
        self.state.phase = Phase::Idle;
        self.pending = None;
        tracing::debug!("celebration dismissed");
        true
    }
}

impl<C: Clock> MutationHook for CelebrationMonitor<C> {
    fn observe(&mut self, todos: &[TodoItem]) {
        self.observe_list(todos);
    }
}
