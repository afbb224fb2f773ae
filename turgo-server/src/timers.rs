use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::Config;

/// Delays used by a session's scheduled work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Pause between a solved item and the next one
    pub round_advance_delay: Duration,
    /// Period of the puzzle reveal countdown
    pub countdown_tick: Duration,
}

impl SessionTimings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            round_advance_delay: config.round_advance_delay(),
            countdown_tick: config.countdown_tick(),
        }
    }
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            round_advance_delay: Duration::from_secs(2),
            countdown_tick: Duration::from_secs(1),
        }
    }
}

/// Outstanding tasks scheduled against one session.
///
/// Lives next to the session behind the same lock, so scheduling and cancelling
/// are serialized with every other mutation. Dropping it aborts whatever is left.
#[derive(Debug, Default)]
pub struct SessionTimers {
    countdown: Option<JoinHandle<()>>,
    pending_advance: Option<JoinHandle<()>>,
}

impl SessionTimers {
    pub fn start_countdown(&mut self, task: JoinHandle<()>) {
        self.cancel_countdown();
        self.countdown = Some(task);
    }

    pub fn cancel_countdown(&mut self) {
        if let Some(task) = self.countdown.take() {
            task.abort();
        }
    }

    /// Forget the countdown handle without aborting; used by the countdown task itself.
    pub fn release_countdown(&mut self) {
        self.countdown = None;
    }

    pub fn schedule_advance(&mut self, task: JoinHandle<()>) {
        self.cancel_advance();
        self.pending_advance = Some(task);
    }

    pub fn cancel_advance(&mut self) {
        if let Some(task) = self.pending_advance.take() {
            task.abort();
        }
    }

    /// Forget the advance handle without aborting; used by the advance task itself.
    pub fn release_advance(&mut self) {
        self.pending_advance = None;
    }

    pub fn cancel_all(&mut self) {
        self.cancel_countdown();
        self.cancel_advance();
    }

    pub fn has_countdown(&self) -> bool {
        self.countdown.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn has_pending_advance(&self) -> bool {
        self.pending_advance
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
