use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::{
    DEFAULT_COMPLETION_AMOUNT, DEFAULT_OP_TIMEOUT, EngineError, ResultEngine, locks::KeyedLocks,
};

mod ledger;
mod requests;
mod transfer;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    /// Tokens the requester pays the provider when a request completes.
    completion_amount: i64,
    /// Upper bound on waiting for an account or request lock.
    op_timeout: Duration,
    account_locks: KeyedLocks,
    request_locks: KeyedLocks,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn completion_amount(&self) -> i64 {
        self.completion_amount
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    completion_amount: i64,
    op_timeout: Duration,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            completion_amount: DEFAULT_COMPLETION_AMOUNT,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Tokens moved from requester to provider on completion.
    pub fn completion_amount(mut self, amount: i64) -> EngineBuilder {
        self.completion_amount = amount;
        self
    }

    pub fn op_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.op_timeout = timeout;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if self.completion_amount <= 0 {
            return Err(EngineError::InvalidAmount(format!(
                "completion amount must be > 0, got {}",
                self.completion_amount
            )));
        }
        Ok(Engine {
            database: self.database,
            completion_amount: self.completion_amount,
            op_timeout: self.op_timeout,
            account_locks: KeyedLocks::default(),
            request_locks: KeyedLocks::default(),
        })
    }
}
