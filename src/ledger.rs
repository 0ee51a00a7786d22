//! Player balance ledger
//!
//! The ledger is the only place a balance changes. Sessions debit it once when
//! they open and credit it once when they are cashed out.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A single player's balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    balance: f64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            balance: crate::consts::STARTING_BALANCE,
        }
    }
}

impl Ledger {
    /// Create a ledger with an opening balance. Negative or non-finite balances are rejected.
    pub fn new(balance: f64) -> EngineResult<Self> {
        if !balance.is_finite() || balance < 0.0 {
            return Err(EngineError::InvalidBalance(balance));
        }
        Ok(Self { balance })
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Whether `amount` could be debited right now
    pub fn can_cover(&self, amount: f64) -> bool {
        amount <= self.balance
    }

    /// Remove `amount` from the balance, failing without side effects if it is not covered
    pub fn debit(&mut self, amount: f64) -> EngineResult<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(EngineError::InvalidStake(amount));
        }
        if !self.can_cover(amount) {
            return Err(EngineError::InsufficientBalance {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Add `amount` to the balance. There is no upper bound.
    pub fn credit(&mut self, amount: f64) -> EngineResult<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(EngineError::InvalidStake(amount));
        }
        self.balance += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_within_balance() {
        let mut ledger = Ledger::new(100.0).unwrap();
        ledger.debit(40.0).unwrap();
        assert_eq!(ledger.balance(), 60.0);
    }

    #[test]
    fn test_debit_over_balance_leaves_balance_untouched() {
        let mut ledger = Ledger::new(30.0).unwrap();
        let err = ledger.debit(50.0).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientBalance {
                requested: 50.0,
                available: 30.0
            }
        );
        assert_eq!(ledger.balance(), 30.0);
    }

    #[test]
    fn test_debit_exact_balance() {
        let mut ledger = Ledger::new(25.0).unwrap();
        ledger.debit(25.0).unwrap();
        assert_eq!(ledger.balance(), 0.0);
        assert!(ledger.debit(0.01).is_err());
    }

    #[test]
    fn test_credit_has_no_cap() {
        let mut ledger = Ledger::new(0.0).unwrap();
        ledger.credit(1e12).unwrap();
        ledger.credit(1e12).unwrap();
        assert_eq!(ledger.balance(), 2e12);
    }

    #[test]
    fn test_rejects_bad_amounts() {
        let mut ledger = Ledger::new(10.0).unwrap();
        assert!(matches!(ledger.debit(-1.0), Err(EngineError::InvalidStake(_))));
        assert!(matches!(ledger.credit(f64::NAN), Err(EngineError::InvalidStake(_))));
        assert!(matches!(ledger.credit(f64::INFINITY), Err(EngineError::InvalidStake(_))));
        assert_eq!(ledger.balance(), 10.0);
    }

    #[test]
    fn test_invalid_opening_balance_rejected() {
        for balance in [-5.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Ledger::new(balance),
                Err(EngineError::InvalidBalance(_))
            ));
        }
        assert_eq!(Ledger::new(0.0).unwrap().balance(), 0.0);
        assert_eq!(Ledger::default().balance(), 1000.0);
    }
}
