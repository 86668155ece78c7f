//! The polling loop, as an explicit state machine.
//!
//! Each pass runs the update pipeline once. Depending on the mode and the
//! outcome the poller then stops or sleeps until the next poll, paced by the
//! broadcast schedule. Time and sleeping are injected so the loop can be
//! driven without a real clock.

use crate::error::{CatalogError, Result};
use crate::schedule::BroadcastSchedule;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::time::Duration;

/// What a single pipeline pass produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// At least one update was accepted.
    pub updated: bool,
    /// Air date of the latest episode published on the site.
    pub latest_air: NaiveDate,
}

/// Runs one pass of the update pipeline.
#[async_trait]
pub trait Pipeline: Send {
    async fn run_once(&mut self) -> Result<Outcome>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, d: Duration);
}

/// The wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, d: Duration) {
        tokio::time::sleep(d).await;
    }
}

/// When to stop polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PollMode {
    /// One pass; report whether it found anything.
    #[default]
    Once,
    /// One pass, whatever the outcome.
    Single,
    /// Poll until a pass produces an update.
    UntilUpdate,
    /// Poll forever.
    Continuous,
}

/// How a finished run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    NoUpdate,
}

impl ExitStatus {
    /// Process exit code: 0 on success, 3 when there was nothing to do.
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::NoUpdate => 3,
        }
    }
}

#[derive(Debug)]
pub enum PollState {
    Polling,
    Sleeping(Duration),
    Done(ExitStatus),
    Failed(CatalogError),
}

pub struct Poller<C, S> {
    mode: PollMode,
    schedule: BroadcastSchedule,
    clock: C,
    sleeper: S,
}

impl<C: Clock, S: Sleeper> Poller<C, S> {
    pub fn new(mode: PollMode, schedule: BroadcastSchedule, clock: C, sleeper: S) -> Self {
        Self {
            mode,
            schedule,
            clock,
            sleeper,
        }
    }

    /// Drives `pipeline` until the mode says to stop or a pass fails.
    pub async fn run<P: Pipeline>(&self, pipeline: &mut P) -> Result<ExitStatus> {
        let mut state = PollState::Polling;
        let result = loop {
            state = match state {
                PollState::Done(status) => break Ok(status),
                PollState::Failed(err) => break Err(err),
                other => self.step(other, pipeline).await,
            };
        };
        match &result {
            Ok(status) => log::info!("Polling finished: {:?}", status),
            Err(e) => log::error!("Polling failed: {}", e),
        }
        result
    }

    /// Advances the machine by one transition. Terminal states are returned
    /// unchanged.
    pub async fn step<P: Pipeline>(&self, state: PollState, pipeline: &mut P) -> PollState {
        match state {
            PollState::Polling => match pipeline.run_once().await {
                Ok(outcome) => self.after_pass(outcome),
                Err(e) => PollState::Failed(e),
            },
            PollState::Sleeping(d) => {
                self.sleeper.sleep(d).await;
                PollState::Polling
            }
            terminal => terminal,
        }
    }

    fn after_pass(&self, outcome: Outcome) -> PollState {
        match (self.mode, outcome.updated) {
            (PollMode::Once, true) | (PollMode::Single, _) | (PollMode::UntilUpdate, true) => {
                PollState::Done(ExitStatus::Success)
            }
            (PollMode::Once, false) => PollState::Done(ExitStatus::NoUpdate),
            (PollMode::UntilUpdate, false) | (PollMode::Continuous, _) => {
                PollState::Sleeping(self.next_wait(outcome.latest_air))
            }
        }
    }

    fn next_wait(&self, latest_air: NaiveDate) -> Duration {
        let now = self.clock.now();
        let start = self.schedule.upcoming(now, latest_air);
        let wait = self.schedule.poll_interval(now, start);

        let wake = now + chrono::Duration::from_std(wait).unwrap_or_else(|_| chrono::Duration::zero());
        match start {
            Some(start) => log::info!(
                "Next episode is on {} (in {}m); sleeping for {}m (until {})",
                start.format("%Y-%m-%d"),
                (start - now).num_minutes(),
                wait.as_secs() / 60,
                wake.with_timezone(&Local).format("%-I:%M%p")
            ),
            None => log::warn!(
                "No upcoming broadcast found; sleeping for {}m",
                wait.as_secs() / 60
            ),
        }
        wait
    }
}
