//! Screen activity timer
//!
//! A restartable polling loop: every tick samples the screen, counts
//! consecutive unlocked samples and reports when the threshold is hit.
//!
//! At most one tick source is ever armed. Arming always cancels the previous
//! source first and every armed source carries its own generation, so a tick
//! that was already queued when its source was cancelled is ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::coordinator::ReminderRequest;
use crate::domain::ScreenState;
use crate::sources::ScreenStateQuery;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerState {
    #[default]
    Idle,
    Running,
    /// Threshold reached; cleared by the following `stop()`
    Firing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Stale,
    Counted(u32),
    /// Screen was locked: count cleared and tick source restarted
    Reset,
    Fire,
}

pub struct ScreenActivityTimer {
    state: TimerState,
    elapsed_ticks: u32,
    threshold: u32,
    period: Duration,
    generation: u64,
    tick_task: Option<JoinHandle<()>>,
}

impl ScreenActivityTimer {
    pub fn new(threshold: u32, period: Duration) -> Self {
        debug!(threshold, ?period, "ScreenActivityTimer::new: called");
        Self {
            state: TimerState::Idle,
            elapsed_ticks: 0,
            threshold: threshold.max(1),
            period,
            generation: 0,
            tick_task: None,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != TimerState::Idle
    }

    pub fn elapsed_ticks(&self) -> u32 {
        self.elapsed_ticks
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// True while a tick source is armed
    pub fn is_armed(&self) -> bool {
        self.tick_task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Idle -> Running; no-op when already running
    pub fn start(&mut self, tx: &mpsc::Sender<ReminderRequest>) -> bool {
        if self.state == TimerState::Running {
            debug!("ScreenActivityTimer::start: already running");
            return false;
        }
        info!("Starting screen status tracking");
        self.elapsed_ticks = 0;
        self.arm(tx);
        self.state = TimerState::Running;
        true
    }

    /// Back to Idle from any state; idempotent
    pub fn stop(&mut self) -> bool {
        let was_active = self.is_active();
        if was_active {
            info!(elapsed_ticks = self.elapsed_ticks, "Stopping screen status tracking");
        }
        self.cancel();
        self.elapsed_ticks = 0;
        self.state = TimerState::Idle;
        was_active
    }

    /// Handle one tick from the armed source
    pub fn on_tick(
        &mut self,
        generation: u64,
        screen: &dyn ScreenStateQuery,
        tx: &mpsc::Sender<ReminderRequest>,
    ) -> TickOutcome {
        if self.state != TimerState::Running || generation != self.generation {
            debug!(generation, current = self.generation, "ScreenActivityTimer::on_tick: stale");
            return TickOutcome::Stale;
        }

        match screen.sample() {
            ScreenState::Locked => {
                debug!(discarded = self.elapsed_ticks, "Screen locked, resetting screen status tracker");
                self.elapsed_ticks = 0;
                // Fresh full-length window after every lock
                self.arm(tx);
                TickOutcome::Reset
            }
            ScreenState::Unlocked => {
                self.elapsed_ticks += 1;
                debug!(elapsed_ticks = self.elapsed_ticks, "Elapsed time");
                if self.elapsed_ticks == self.threshold {
                    self.state = TimerState::Firing;
                    TickOutcome::Fire
                } else {
                    TickOutcome::Counted(self.elapsed_ticks)
                }
            }
        }
    }

    fn arm(&mut self, tx: &mpsc::Sender<ReminderRequest>) {
        self.cancel();
        let generation = self.generation;
        let period = self.period;
        let tx = tx.clone();
        debug!(generation, "ScreenActivityTimer::arm: called");

        self.tick_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(ReminderRequest::Tick { generation }).await.is_err() {
                    break;
                }
            }
        }));
    }

    fn cancel(&mut self) {
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
        // Ticks already queued by the cancelled source no longer match
        self.generation += 1;
    }
}

impl Drop for ScreenActivityTimer {
    fn drop(&mut self) {
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
    }
}
