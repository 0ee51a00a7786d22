//! Per-player table
//!
//! The surface a presentation layer talks to. A table owns one player's ledger
//! and at most one session, and hands out `SessionHandle`s instead of
//! references. Tables for different players share nothing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::autoplay::{AutoplayState, StopCondition};
use super::outcome::HazardReveal;
use super::rng::{EntropySource, autoplay_stream, hazard_stream};
use super::session::{Outcome, Payout, RevealOutcome, Session, SessionId, SessionPhase};
use super::variant::VariantConfig;
use crate::consts::MAX_AUTOPLAY_STEPS;
use crate::error::{EngineError, EngineResult};
use crate::ledger::Ledger;
use crate::persistence::SaveData;

/// Opaque reference to a session on a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(SessionId);

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.0
    }
}

/// What a reveal did, as reported to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RevealResult {
    Safe { multiplier: f64, hits: u32 },
    /// Stake lost; the full hazard layout is now visible
    Hazard { layout: HazardReveal },
    /// Last safe slot on the board found; the session cashed out by itself
    Cleared { multiplier: f64, payout: Payout },
}

/// Read-only snapshot of a session and the player's balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub outcome: Outcome,
    pub stake: f64,
    pub multiplier: f64,
    pub hits: u32,
    pub balance: f64,
    pub risk_density: u32,
    /// Risk bar for shaft variants
    pub hazard_probability: Option<f64>,
    pub next_multiplier: (f64, f64),
    pub autoplay: bool,
    pub payout: Option<Payout>,
}

pub struct Table {
    ledger: Ledger,
    session: Option<Session>,
    autoplay: Option<AutoplayState>,
    entropy: Box<dyn EntropySource>,
    next_id: SessionId,
    last_played: Option<String>,
}

impl Table {
    pub fn new(ledger: Ledger, entropy: impl EntropySource + 'static) -> Self {
        Self {
            ledger,
            session: None,
            autoplay: None,
            entropy: Box::new(entropy),
            next_id: 1,
            last_played: None,
        }
    }

    /// Restore a table from persisted data
    pub fn from_save(save: &SaveData, entropy: impl EntropySource + 'static) -> EngineResult<Self> {
        let mut table = Self::new(Ledger::new(save.balance)?, entropy);
        table.last_played = save.last_played.clone();
        Ok(table)
    }

    /// Data worth persisting across restarts
    pub fn to_save(&self) -> SaveData {
        SaveData {
            balance: self.ledger.balance(),
            last_played: self.last_played.clone(),
        }
    }

    pub fn balance(&self) -> f64 {
        self.ledger.balance()
    }

    /// Opaque marker kept for the presentation layer's reward cooldowns
    pub fn last_played(&self) -> Option<&str> {
        self.last_played.as_deref()
    }

    pub fn set_last_played(&mut self, marker: impl Into<String>) {
        self.last_played = Some(marker.into());
    }

    /// Phase of the current session, `Idle` when there is none
    pub fn phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map(Session::phase)
            .unwrap_or(SessionPhase::Idle)
    }

    pub fn session(&self, handle: SessionHandle) -> EngineResult<&Session> {
        self.session
            .as_ref()
            .filter(|s| s.id() == handle.0)
            .ok_or(EngineError::InvalidState)
    }

    /// Place a bet and start a new session
    pub fn open_session(
        &mut self,
        stake: f64,
        risk_density: u32,
        config: &VariantConfig,
    ) -> EngineResult<SessionHandle> {
        if self.session.as_ref().is_some_and(Session::is_active) {
            return Err(EngineError::SessionAlreadyActive);
        }
        let id = self.next_id;
        let rng = self.entropy.stream(hazard_stream(id));
        let session = Session::open(&mut self.ledger, id, stake, risk_density, config, rng)?;
        self.next_id += 1;
        self.session = Some(session);
        Ok(SessionHandle(id))
    }

    /// Manual reveal. Rejected while autoplay drives the session.
    pub fn reveal(&mut self, handle: SessionHandle, slot: Option<u32>) -> EngineResult<RevealResult> {
        self.check_manual(handle)?;
        self.reveal_inner(handle, slot)
    }

    /// Manual cash-out. Rejected while autoplay drives the session.
    pub fn cash_out(&mut self, handle: SessionHandle) -> EngineResult<Payout> {
        self.check_manual(handle)?;
        let session = self
            .session
            .as_mut()
            .filter(|s| s.id() == handle.0)
            .ok_or(EngineError::InvalidState)?;
        session.cash_out(&mut self.ledger)
    }

    pub fn current_state(&self, handle: SessionHandle) -> EngineResult<SessionView> {
        let session = self.session(handle)?;
        Ok(SessionView {
            phase: session.phase(),
            outcome: session.outcome(),
            stake: session.stake(),
            multiplier: session.multiplier(),
            hits: session.hits(),
            balance: self.ledger.balance(),
            risk_density: session.displayed_risk_density(),
            hazard_probability: session.hazard_probability(),
            next_multiplier: session.next_multiplier_range(),
            autoplay: self.is_autoplaying(handle),
            payout: session.payout(),
        })
    }

    fn check_manual(&self, handle: SessionHandle) -> EngineResult<()> {
        self.session(handle)?;
        if self.is_autoplaying(handle) {
            return Err(EngineError::AutoplayActive);
        }
        Ok(())
    }

    fn reveal_inner(&mut self, handle: SessionHandle, slot: Option<u32>) -> EngineResult<RevealResult> {
        let session = self
            .session
            .as_mut()
            .filter(|s| s.id() == handle.0)
            .ok_or(EngineError::InvalidState)?;
        let result = match session.reveal(slot)? {
            RevealOutcome::Hazard(layout) => RevealResult::Hazard { layout },
            RevealOutcome::Safe { multiplier, hits } => {
                if session.safe_slots_remaining() == Some(0) {
                    let payout = session.cash_out(&mut self.ledger)?;
                    RevealResult::Cleared { multiplier, payout }
                } else {
                    RevealResult::Safe { multiplier, hits }
                }
            }
        };
        if !session.is_active() && self.autoplay.take().is_some() {
            log::debug!("Autoplay released: session {} resolved", handle.0);
        }
        Ok(result)
    }

    pub fn is_autoplaying(&self, handle: SessionHandle) -> bool {
        self.autoplay.as_ref().is_some_and(|a| a.session == handle.0)
    }

    /// Hand the session to autoplay. Manual reveal/cash-out fail until it stops.
    pub fn start_autoplay(
        &mut self,
        handle: SessionHandle,
        interval: Duration,
        stop: StopCondition,
    ) -> EngineResult<()> {
        if !self.session(handle)?.is_active() {
            return Err(EngineError::InvalidState);
        }
        if self.autoplay.is_some() {
            return Err(EngineError::AutoplayActive);
        }
        if interval.is_zero() {
            return Err(EngineError::InvalidConfig("autoplay interval must be positive"));
        }
        let rng = self.entropy.stream(autoplay_stream(handle.0));
        self.autoplay = Some(AutoplayState::new(handle.0, interval, stop, rng));
        log::info!(
            "Autoplay started on session {} every {:?} (target {:?})",
            handle.0,
            interval,
            stop.hit_target
        );
        Ok(())
    }

    /// Stop autoplay. Stopping when it is not running is a no-op.
    pub fn stop_autoplay(&mut self, handle: SessionHandle) {
        if self.is_autoplaying(handle) {
            self.autoplay = None;
            log::info!("Autoplay stopped on session {}", handle.0);
        }
    }

    /// One autoplay reveal. `None` once autoplay is off or its stop condition holds.
    pub fn autoplay_step(&mut self, handle: SessionHandle) -> EngineResult<Option<RevealResult>> {
        let session = self.session(handle)?;
        let hits = session.hits();
        let active = session.is_active();
        let Some(state) = self.autoplay.as_mut().filter(|a| a.session == handle.0) else {
            return Ok(None);
        };
        if !active || state.stop.reached(hits) {
            self.autoplay = None;
            return Ok(None);
        }

        let slot = match self.session.as_ref() {
            Some(session) => state.pick_slot(session),
            None => None,
        };
        let result = match self.reveal_inner(handle, slot) {
            Ok(result) => result,
            Err(e) => {
                self.autoplay = None;
                return Err(e);
            }
        };

        let done = self
            .session
            .as_ref()
            .is_none_or(|s| !s.is_active());
        let reached = self
            .autoplay
            .as_ref()
            .zip(self.session.as_ref())
            .is_some_and(|(a, s)| a.stop.reached(s.hits()));
        if done || reached {
            self.autoplay = None;
        }
        Ok(Some(result))
    }

    /// Feed elapsed time to autoplay; one reveal per whole interval, capped per call
    pub fn advance_autoplay(
        &mut self,
        handle: SessionHandle,
        elapsed: Duration,
    ) -> EngineResult<Vec<RevealResult>> {
        self.session(handle)?;
        let Some(state) = self.autoplay.as_mut().filter(|a| a.session == handle.0) else {
            return Ok(Vec::new());
        };
        let cap = state.interval.saturating_mul(MAX_AUTOPLAY_STEPS);
        state.elapsed = state.elapsed.saturating_add(elapsed).min(cap);

        let mut results = Vec::new();
        loop {
            let Some(state) = self.autoplay.as_mut() else {
                break;
            };
            if state.elapsed < state.interval {
                break;
            }
            state.elapsed -= state.interval;
            match self.autoplay_step(handle)? {
                Some(result) => results.push(result),
                None => break,
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::outcome::EscalationParams;
    use crate::game::payout::PayoutCurve;
    use crate::game::rng::SeededEntropy;

    fn mines() -> VariantConfig {
        VariantConfig::grid("mines", 25, PayoutCurve::standard_exponential())
    }

    fn table() -> Table {
        Table::new(Ledger::new(100.0).unwrap(), SeededEntropy::new(99))
    }

    #[test]
    fn test_idle_until_first_bet() {
        let mut table = table();
        assert_eq!(table.phase(), SessionPhase::Idle);
        table.open_session(10.0, 3, &mines()).unwrap();
        assert_eq!(table.phase(), SessionPhase::Active);
        assert_eq!(table.balance(), 90.0);
    }

    #[test]
    fn test_single_active_session() {
        let mut table = table();
        let first = table.open_session(10.0, 3, &mines()).unwrap();
        assert_eq!(
            table.open_session(10.0, 3, &mines()),
            Err(EngineError::SessionAlreadyActive)
        );
        assert_eq!(table.balance(), 90.0);

        table.cash_out(first).unwrap();
        let second = table.open_session(10.0, 3, &mines()).unwrap();
        assert_ne!(first, second);
        // The old handle no longer addresses anything
        assert_eq!(table.reveal(first, Some(0)), Err(EngineError::InvalidState));
    }

    #[test]
    fn test_failed_open_changes_nothing() {
        let mut table = Table::new(Ledger::new(30.0).unwrap(), SeededEntropy::new(1));
        assert!(matches!(
            table.open_session(50.0, 3, &mines()),
            Err(EngineError::InsufficientBalance { .. })
        ));
        assert_eq!(table.balance(), 30.0);
        assert_eq!(table.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_manual_calls_blocked_during_autoplay() {
        let mut table = table();
        let handle = table.open_session(10.0, 3, &mines()).unwrap();
        table
            .start_autoplay(handle, Duration::from_millis(100), StopCondition::default())
            .unwrap();
        assert_eq!(table.reveal(handle, Some(0)), Err(EngineError::AutoplayActive));
        assert_eq!(table.cash_out(handle), Err(EngineError::AutoplayActive));
        assert_eq!(
            table.start_autoplay(handle, Duration::from_millis(100), StopCondition::default()),
            Err(EngineError::AutoplayActive)
        );

        table.stop_autoplay(handle);
        table.stop_autoplay(handle);
        assert!(!table.is_autoplaying(handle));
        assert!(table.cash_out(handle).is_ok());
    }

    #[test]
    fn test_autoplay_requires_active_session_and_interval() {
        let mut table = table();
        let handle = table.open_session(10.0, 3, &mines()).unwrap();
        assert!(matches!(
            table.start_autoplay(handle, Duration::ZERO, StopCondition::default()),
            Err(EngineError::InvalidConfig(_))
        ));
        table.cash_out(handle).unwrap();
        assert_eq!(
            table.start_autoplay(handle, Duration::from_millis(10), StopCondition::default()),
            Err(EngineError::InvalidState)
        );
    }

    #[test]
    fn test_advance_autoplay_paces_by_interval() {
        let mut table = Table::new(Ledger::new(100.0).unwrap(), SeededEntropy::new(4));
        let wide = VariantConfig::grid("wide", 1000, PayoutCurve::standard_exponential());
        let handle = table.open_session(10.0, 1, &wide).unwrap();
        table
            .start_autoplay(handle, Duration::from_millis(100), StopCondition::hits(3))
            .unwrap();

        assert!(table.advance_autoplay(handle, Duration::from_millis(99)).unwrap().is_empty());
        let steps = table.advance_autoplay(handle, Duration::from_millis(1)).unwrap();
        assert_eq!(steps.len(), 1);

        let steps = table.advance_autoplay(handle, Duration::from_secs(5)).unwrap();
        let view = table.current_state(handle).unwrap();
        assert!(!view.autoplay);
        if view.phase == SessionPhase::Active {
            assert_eq!(steps.len(), 2);
            assert_eq!(view.hits, 3);
        }
    }

    #[test]
    fn test_advance_autoplay_caps_steps_per_call() {
        let mut table = Table::new(Ledger::new(100.0).unwrap(), SeededEntropy::new(6));
        let wide = VariantConfig::grid("wide", 10_000, PayoutCurve::standard_exponential());
        let handle = table.open_session(10.0, 1, &wide).unwrap();
        table
            .start_autoplay(handle, Duration::from_millis(100), StopCondition::default())
            .unwrap();
        let steps = table.advance_autoplay(handle, Duration::from_secs(1)).unwrap();
        if table.phase() == SessionPhase::Active {
            assert_eq!(steps.len(), MAX_AUTOPLAY_STEPS as usize);
            // Backlog beyond the cap is dropped, not carried into the next call
            let next = table.advance_autoplay(handle, Duration::ZERO).unwrap();
            assert!(next.is_empty());
        }
    }

    #[test]
    fn test_advance_autoplay_huge_elapsed_saturates() {
        let mut table = Table::new(Ledger::new(100.0).unwrap(), SeededEntropy::new(4));
        let wide = VariantConfig::grid("wide", 1000, PayoutCurve::standard_exponential());
        let handle = table.open_session(10.0, 1, &wide).unwrap();
        table
            .start_autoplay(handle, Duration::from_millis(100), StopCondition::default())
            .unwrap();
        // Leave part of an interval banked, then overflow the accumulator
        assert!(table.advance_autoplay(handle, Duration::from_millis(50)).unwrap().is_empty());
        let steps = table.advance_autoplay(handle, Duration::MAX).unwrap();
        assert!(!steps.is_empty());
        assert!(steps.len() <= MAX_AUTOPLAY_STEPS as usize);
    }

    #[test]
    fn test_autoplay_reveals_distinct_slots() {
        let mut table = Table::new(Ledger::new(100.0).unwrap(), SeededEntropy::new(8));
        let board = VariantConfig::grid("board", 400, PayoutCurve::standard_exponential());
        let handle = table.open_session(10.0, 1, &board).unwrap();
        table
            .start_autoplay(handle, Duration::from_millis(1), StopCondition::hits(50))
            .unwrap();
        table.advance_autoplay(handle, Duration::from_millis(50)).unwrap();
        let session = table.session(handle).unwrap();
        let mut revealed = session.revealed().to_vec();
        let count = revealed.len();
        revealed.sort_unstable();
        revealed.dedup();
        assert_eq!(revealed.len(), count);
    }

    #[test]
    fn test_clearing_the_board_cashes_out() {
        let mut table = table();
        let tiny = VariantConfig::grid("tiny", 2, PayoutCurve::standard_exponential());
        let handle = table.open_session(10.0, 1, &tiny).unwrap();
        // One of the two slots is safe; find it without peeking
        let result = match table.reveal(handle, Some(0)).unwrap() {
            RevealResult::Hazard { .. } => {
                assert_eq!(table.balance(), 90.0);
                return;
            }
            other => other,
        };
        let RevealResult::Cleared { multiplier, payout } = result else {
            panic!("expected the board to clear, got {result:?}");
        };
        assert_eq!(payout.amount, 10.0 * multiplier);
        assert!((table.balance() - (90.0 + payout.amount)).abs() < 1e-9);
        assert_eq!(table.current_state(handle).unwrap().outcome, Outcome::Won);
    }

    #[test]
    fn test_view_reports_shaft_risk() {
        let mut table = table();
        let dig = VariantConfig::shaft(
            "dig",
            EscalationParams::default(),
            PayoutCurve::standard_additive(),
        );
        let handle = table.open_session(10.0, 0, &dig).unwrap();
        let view = table.current_state(handle).unwrap();
        assert_eq!(view.hazard_probability, Some(0.0));
        assert!((view.next_multiplier.0 - 1.2).abs() < 1e-12);
        assert!((view.next_multiplier.1 - 1.5).abs() < 1e-12);
        table.reveal(handle, None).unwrap();
        let view = table.current_state(handle).unwrap();
        assert!(view.hazard_probability.unwrap() >= 5.0);
        assert!(view.multiplier >= 1.2);
    }

    #[test]
    fn test_save_round_trip_through_table() {
        let mut table = table();
        table.set_last_played("2026-10-19");
        let handle = table.open_session(10.0, 3, &mines()).unwrap();
        table.cash_out(handle).unwrap();
        let save = table.to_save();
        let restored = Table::from_save(&save, SeededEntropy::new(1)).unwrap();
        assert_eq!(restored.balance(), 100.0);
        assert_eq!(restored.last_played(), Some("2026-10-19"));
        assert_eq!(restored.phase(), SessionPhase::Idle);

        let corrupt = SaveData {
            balance: f64::NAN,
            last_played: None,
        };
        assert!(matches!(
            Table::from_save(&corrupt, SeededEntropy::new(1)),
            Err(EngineError::InvalidBalance(_))
        ));
    }
}
