//! Autoplay scheduler
//!
//! Autoplay repeatedly reveals a uniformly random unrevealed slot until the
//! session resolves, the caller stops it, or a hit target is reached. It is the
//! only writer of its session while enabled.
//!
//! Two drivers share the same step logic in `Table`:
//! - `Table::advance_autoplay`: fixed-interval accumulator fed by the caller's frame loop
//! - `run_autoplay`: explicit loop with a `Pacer` and a `StopToken`

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::rng::SessionRng;
use super::session::{Session, SessionId};
use super::table::{RevealResult, SessionHandle, Table};
use crate::error::EngineResult;

/// When autoplay should end on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StopCondition {
    /// Stop once the session has this many safe reveals
    pub hit_target: Option<u32>,
}

impl StopCondition {
    pub fn hits(target: u32) -> Self {
        Self {
            hit_target: Some(target),
        }
    }

    pub fn reached(&self, hits: u32) -> bool {
        self.hit_target.is_some_and(|target| hits >= target)
    }
}

/// Autoplay bookkeeping held by the table while enabled
pub(crate) struct AutoplayState {
    pub(crate) session: SessionId,
    pub(crate) interval: Duration,
    pub(crate) elapsed: Duration,
    pub(crate) stop: StopCondition,
    rng: SessionRng,
}

impl AutoplayState {
    pub(crate) fn new(
        session: SessionId,
        interval: Duration,
        stop: StopCondition,
        rng: SessionRng,
    ) -> Self {
        Self {
            session,
            interval,
            elapsed: Duration::ZERO,
            stop,
            rng,
        }
    }

    /// Uniform pick among unrevealed grid slots; shafts just step
    pub(crate) fn pick_slot(&mut self, session: &Session) -> Option<u32> {
        let slots = session.unrevealed_slots();
        if slots.is_empty() {
            return None;
        }
        Some(slots[self.rng.random_range(0..slots.len())])
    }
}

/// Cancellation token shared between the autoplay loop and whoever stops it.
///
/// `stop` waits for an in-flight reveal to finish, so once it returns no
/// further reveal is issued.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<Mutex<bool>>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent
    pub fn stop(&self) {
        *self.lock() = true;
    }

    pub fn is_stopped(&self) -> bool {
        *self.lock()
    }

    /// Run `f` while holding the token, unless it has been stopped
    pub fn run_unless_stopped<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        let guard = self.lock();
        if *guard {
            return None;
        }
        let out = f();
        drop(guard);
        Some(out)
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Waits between autoplay reveals
pub trait Pacer {
    fn pause(&mut self, interval: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

impl<F: FnMut(Duration)> Pacer for F {
    fn pause(&mut self, interval: Duration) {
        self(interval)
    }
}

/// What a finished autoplay run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoplayReport {
    pub results: Vec<RevealResult>,
    /// Ended because the token was stopped
    pub stopped_by_caller: bool,
}

impl AutoplayReport {
    pub fn reveals(&self) -> usize {
        self.results.len()
    }
}

/// Drive a session with autoplay until it resolves, hits `stop`, or `token` is stopped.
///
/// Autoplay is disabled again before this returns, whatever the reason.
pub fn run_autoplay<P: Pacer>(
    table: &mut Table,
    handle: SessionHandle,
    interval: Duration,
    stop: StopCondition,
    token: &StopToken,
    pacer: &mut P,
) -> EngineResult<AutoplayReport> {
    table.start_autoplay(handle, interval, stop)?;
    let mut report = AutoplayReport::default();

    let result = loop {
        if !table.is_autoplaying(handle) {
            break Ok(());
        }
        if token.is_stopped() {
            report.stopped_by_caller = true;
            break Ok(());
        }
        pacer.pause(interval);
        match token.run_unless_stopped(|| table.autoplay_step(handle)) {
            None => {
                report.stopped_by_caller = true;
                break Ok(());
            }
            Some(Ok(Some(step))) => report.results.push(step),
            Some(Ok(None)) => break Ok(()),
            Some(Err(e)) => break Err(e),
        }
    };

    table.stop_autoplay(handle);
    log::info!(
        "Autoplay finished after {} reveals (stopped by caller: {})",
        report.reveals(),
        report.stopped_by_caller
    );
    result.map(|_| report)
}
