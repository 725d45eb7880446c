use sea_orm::{ConnectionTrait, TransactionTrait};

use crate::{EngineError, ResultEngine, Transfer};

use super::{
    Engine,
    ledger::{apply_delta_in, require_account},
    with_tx,
};

/// Debit and credit of a checked transfer on `db`.
///
/// The conditional debit re-checks the balance, in case another process wrote
/// to the same database since [`Engine::check_transfer`].
pub(super) async fn transfer_in<C: ConnectionTrait>(
    db: &C,
    transfer: &Transfer,
) -> ResultEngine<()> {
    apply_delta_in(db, &transfer.from, -transfer.amount).await?;
    apply_delta_in(db, &transfer.to, transfer.amount).await?;
    Ok(())
}

impl Engine {
    /// Moves `amount` tokens from one account to another.
    ///
    /// Preconditions are checked in order, each with its own error:
    /// `InvalidAmount`, `SelfTransfer`, `AccountNotFound` (payer first),
    /// `InsufficientFunds`. Both account locks are taken in ascending id order
    /// and the debit and credit commit in one DB transaction, so readers see
    /// either both sides or neither. Never retries.
    pub async fn transfer(&self, from: &str, to: &str, amount: i64) -> ResultEngine<()> {
        let transfer = Transfer::new(from, to, amount)?;
        let _guards = self
            .account_locks
            .lock_all(&transfer.lock_order(), self.op_timeout)
            .await?;

        self.check_transfer(&transfer).await?;
        with_tx!(self, |db_tx| {
            transfer_in(&db_tx, &transfer).await
        })?;

        tracing::info!(
            from = %transfer.from,
            to = %transfer.to,
            amount = transfer.amount,
            "transfer committed"
        );
        Ok(())
    }

    /// Existence and funds checks, run outside any DB transaction.
    ///
    /// Callers hold both account locks.
    pub(super) async fn check_transfer(&self, transfer: &Transfer) -> ResultEngine<()> {
        let payer = require_account(&self.database, &transfer.from).await?;
        require_account(&self.database, &transfer.to).await?;
        if payer.balance < transfer.amount {
            return Err(EngineError::InsufficientFunds(format!(
                "account \"{}\" holds {}, needs {}",
                transfer.from, payer.balance, transfer.amount
            )));
        }
        Ok(())
    }
}
