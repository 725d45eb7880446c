use chrono::Utc;
use sea_orm::{
    ConnectionTrait, QueryFilter, SqlErr, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{Account, EngineError, ResultEngine, accounts};

use super::{Engine, with_tx};

/// Looks an account up, failing with `AccountNotFound`.
pub(super) async fn require_account<C: ConnectionTrait>(
    db: &C,
    account_id: &str,
) -> ResultEngine<accounts::Model> {
    accounts::Entity::find_by_id(account_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::AccountNotFound(account_id.to_string()))
}

/// Adds `delta` to a balance with a single conditional update.
///
/// A debit only matches the row while `balance >= -delta` and a credit only
/// while `balance <= i64::MAX - delta`, so the check and the write cannot be
/// split by a concurrent writer. Zero matched rows means the account is
/// missing, the debit would overdraw it, or the credit would overflow it.
pub(super) async fn apply_delta_in<C: ConnectionTrait>(
    db: &C,
    account_id: &str,
    delta: i64,
) -> ResultEngine<i64> {
    let debit = delta
        .checked_neg()
        .ok_or_else(|| EngineError::InvalidAmount(format!("delta out of range: {delta}")))?;

    let mut update = accounts::Entity::update_many()
        .col_expr(
            accounts::Column::Balance,
            Expr::col(accounts::Column::Balance).add(delta),
        )
        .filter(accounts::Column::Id.eq(account_id.to_string()));
    if delta < 0 {
        update = update.filter(Expr::col(accounts::Column::Balance).gte(debit));
    } else {
        update = update.filter(Expr::col(accounts::Column::Balance).lte(i64::MAX - delta));
    }

    let result = update.exec(db).await?;
    let model = require_account(db, account_id).await?;
    if result.rows_affected == 0 {
        if delta > 0 {
            return Err(EngineError::InvalidAmount(format!(
                "crediting {delta} to account \"{account_id}\" overflows its balance of {}",
                model.balance
            )));
        }
        return Err(EngineError::InsufficientFunds(format!(
            "account \"{account_id}\" holds {}, needs {debit}",
            model.balance
        )));
    }
    Ok(model.balance)
}

impl Engine {
    /// Opens an account with its starting grant.
    ///
    /// Not idempotent: a second call for the same id fails with
    /// `AccountAlreadyExists`.
    pub async fn create_account(
        &self,
        account_id: &str,
        starting_balance: i64,
    ) -> ResultEngine<Account> {
        if starting_balance < 0 {
            return Err(EngineError::InvalidAmount(format!(
                "starting balance must be >= 0, got {starting_balance}"
            )));
        }

        let account = Account::new(account_id.to_string(), starting_balance, Utc::now());
        match accounts::ActiveModel::from(&account)
            .insert(&self.database)
            .await
        {
            Ok(_) => {}
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(EngineError::AccountAlreadyExists(account_id.to_string()));
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(account_id, starting_balance, "account created");
        Ok(account)
    }

    pub async fn account(&self, account_id: &str) -> ResultEngine<Account> {
        let model = require_account(&self.database, account_id).await?;
        Ok(model.into())
    }

    /// Current balance of an account.
    pub async fn balance(&self, account_id: &str) -> ResultEngine<i64> {
        Ok(require_account(&self.database, account_id).await?.balance)
    }

    /// Low-level balance mutation returning the new balance.
    ///
    /// A negative `delta` that would overdraw the account fails with
    /// `InsufficientFunds` and changes nothing. Tokens only change hands
    /// through [`Engine::transfer`]; this primitive is what it is built on.
    pub async fn apply_delta(&self, account_id: &str, delta: i64) -> ResultEngine<i64> {
        let _guard = self.account_locks.lock(account_id, self.op_timeout).await?;
        let balance = with_tx!(self, |db_tx| {
            apply_delta_in(&db_tx, account_id, delta).await
        })?;
        tracing::debug!(account_id, delta, balance, "balance updated");
        Ok(balance)
    }

    /// Sum of every balance in the ledger.
    ///
    /// Transfers never change it; only grants at account creation and direct
    /// `apply_delta` calls do.
    pub async fn total_supply(&self) -> ResultEngine<i64> {
        let models = accounts::Entity::find().all(&self.database).await?;
        models
            .iter()
            .try_fold(0i64, |total, model| total.checked_add(model.balance))
            .ok_or_else(|| EngineError::InvalidAmount("total supply overflows i64".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use migration::MigratorTrait;
    use sea_orm::Database;

    use super::*;

    async fn engine() -> Engine {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        Engine::builder().database(db).build().await.unwrap()
    }

    #[tokio::test]
    async fn debit_to_exactly_zero_is_allowed() {
        let engine = engine().await;
        engine.create_account("alice", 3).await.unwrap();

        assert_eq!(engine.apply_delta("alice", -3).await.unwrap(), 0);
        assert_eq!(engine.balance("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn overdraw_changes_nothing() {
        let engine = engine().await;
        engine.create_account("alice", 2).await.unwrap();

        let err = engine.apply_delta("alice", -3).await.unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds(_)));
        assert_eq!(engine.balance("alice").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delta_on_missing_account() {
        let engine = engine().await;
        assert_eq!(
            engine.apply_delta("ghost", 1).await.unwrap_err(),
            EngineError::AccountNotFound("ghost".to_string())
        );
    }

    #[tokio::test]
    async fn overflowing_credit_is_an_invalid_amount() {
        let engine = engine().await;
        engine.create_account("alice", i64::MAX - 1).await.unwrap();

        let err = engine.apply_delta("alice", 2).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
        assert_eq!(engine.balance("alice").await.unwrap(), i64::MAX - 1);

        assert_eq!(engine.apply_delta("alice", 1).await.unwrap(), i64::MAX);
    }

    #[tokio::test]
    async fn supply_overflow_is_reported() {
        let engine = engine().await;
        engine.create_account("alice", i64::MAX).await.unwrap();
        engine.create_account("bob", 1).await.unwrap();

        let err = engine.total_supply().await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_debits_never_overdraw() {
        const N: i64 = 10;

        let engine = std::sync::Arc::new(engine().await);
        engine.create_account("alice", N - 1).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..N {
            let engine = std::sync::Arc::clone(&engine);
            tasks.spawn(async move { engine.apply_delta("alice", -1).await });
        }

        let mut applied = 0;
        let mut rejected = 0;
        while let Some(result) = tasks.join_next().await {
            match result.unwrap() {
                Ok(balance) => {
                    assert!(balance >= 0);
                    applied += 1;
                }
                Err(EngineError::InsufficientFunds(_)) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(applied, N - 1);
        assert_eq!(rejected, 1);
        assert_eq!(engine.balance("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn credit_grows_supply() {
        let engine = engine().await;
        engine.create_account("alice", 5).await.unwrap();
        engine.create_account("bob", 5).await.unwrap();

        engine.apply_delta("bob", 4).await.unwrap();
        assert_eq!(engine.total_supply().await.unwrap(), 14);
    }
}
