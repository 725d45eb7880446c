//! A validated token move between two accounts.
//!
//! Transfers are not persisted: only the resulting balances are. A `Transfer`
//! lives for the duration of one atomic debit/credit pair.

use crate::{EngineError, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: i64,
}

impl Transfer {
    /// Checks the stateless preconditions, in order: a positive amount, then
    /// two distinct accounts.
    pub fn new(from: &str, to: &str, amount: i64) -> ResultEngine<Self> {
        if amount <= 0 {
            return Err(EngineError::InvalidAmount(format!(
                "transfer amount must be > 0, got {amount}"
            )));
        }
        if from == to {
            return Err(EngineError::SelfTransfer(from.to_string()));
        }
        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        })
    }

    /// Both account ids in the global lock order (ascending), whichever side
    /// pays.
    pub fn lock_order(&self) -> [&str; 2] {
        if self.from <= self.to {
            [self.from.as_str(), self.to.as_str()]
        } else {
            [self.to.as_str(), self.from.as_str()]
        }
    }
}
