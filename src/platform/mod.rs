//! Browser bindings
//!
//! A thin `wasm_bindgen` wrapper around `Table` for a JS front end. Balances
//! persist to LocalStorage; the page drives autoplay by calling `tick` from its
//! animation frame.

use std::time::Duration;

use wasm_bindgen::prelude::*;

use crate::game::{OsEntropy, SessionHandle, StopCondition, Table};
use crate::ledger::Ledger;
use crate::persistence;
use crate::settings::VariantPreset;

fn to_js<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// One player's table, exposed to JS
#[wasm_bindgen]
pub struct WebTable {
    table: Table,
    handle: Option<SessionHandle>,
}

#[wasm_bindgen]
impl WebTable {
    /// Restore the player from LocalStorage
    #[wasm_bindgen(constructor)]
    pub fn new() -> WebTable {
        let save = persistence::load_local();
        let table = Table::from_save(&save, OsEntropy).unwrap_or_else(|e| {
            log::warn!("Discarding saved balance: {}", e);
            Table::new(Ledger::default(), OsEntropy)
        });
        WebTable {
            table,
            handle: None,
        }
    }

    pub fn balance(&self) -> f64 {
        self.table.balance()
    }

    /// Place a bet on a named preset
    pub fn open(&mut self, preset: &str, stake: f64, risk_density: u32) -> Result<(), JsValue> {
        let preset = VariantPreset::from_str(preset)
            .ok_or_else(|| JsValue::from_str(&format!("unknown variant '{}'", preset)))?;
        let handle = self
            .table
            .open_session(stake, risk_density, &preset.config())
            .map_err(err)?;
        self.handle = Some(handle);
        self.persist();
        Ok(())
    }

    /// Reveal a grid slot, or dig one step when `slot` is undefined. Returns JSON.
    pub fn reveal(&mut self, slot: Option<u32>) -> Result<String, JsValue> {
        let handle = self.current()?;
        let result = self.table.reveal(handle, slot).map_err(err)?;
        self.persist();
        to_js(&result)
    }

    pub fn cash_out(&mut self) -> Result<String, JsValue> {
        let handle = self.current()?;
        let payout = self.table.cash_out(handle).map_err(err)?;
        self.persist();
        to_js(&payout)
    }

    /// `hit_target` of 0 means run until the session resolves
    pub fn start_autoplay(&mut self, interval_ms: u32, hit_target: u32) -> Result<(), JsValue> {
        let handle = self.current()?;
        let stop = match hit_target {
            0 => StopCondition::default(),
            n => StopCondition::hits(n),
        };
        self.table
            .start_autoplay(handle, Duration::from_millis(interval_ms as u64), stop)
            .map_err(err)
    }

    pub fn stop_autoplay(&mut self) {
        if let Some(handle) = self.handle {
            self.table.stop_autoplay(handle);
        }
    }

    /// Feed frame time to autoplay. Returns the reveals it made as JSON.
    pub fn tick(&mut self, elapsed_ms: f64) -> Result<String, JsValue> {
        let Some(handle) = self.handle else {
            return Ok("[]".to_string());
        };
        if !elapsed_ms.is_finite() {
            return Err(JsValue::from_str("elapsed time must be finite"));
        }
        let elapsed = Duration::try_from_secs_f64(elapsed_ms.max(0.0) / 1000.0).unwrap_or(Duration::MAX);
        let results = self.table.advance_autoplay(handle, elapsed).map_err(err)?;
        if !results.is_empty() {
            self.persist();
        }
        to_js(&results)
    }

    /// Current `SessionView` as JSON
    pub fn state(&self) -> Result<String, JsValue> {
        let handle = self.current()?;
        to_js(&self.table.current_state(handle).map_err(err)?)
    }

    pub fn last_played(&self) -> Option<String> {
        self.table.last_played().map(str::to_string)
    }

    pub fn set_last_played(&mut self, marker: String) {
        self.table.set_last_played(marker);
        self.persist();
    }

    fn current(&self) -> Result<SessionHandle, JsValue> {
        self.handle.ok_or_else(|| JsValue::from_str("no session"))
    }

    fn persist(&self) {
        persistence::save_local(&self.table.to_save());
    }
}

impl Default for WebTable {
    fn default() -> Self {
        Self::new()
    }
}
