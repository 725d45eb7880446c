//! Token ledger and exchange-request lifecycle.
//!
//! The [`Engine`] owns three concerns on top of one database:
//!
//! - the ledger: integer balances per account, never negative;
//! - transfers: atomic two-party moves, the only way tokens change hands;
//! - requests: the `pending -> accepted -> completed` / `pending -> declined`
//!   state machine, which pays the provider when a request completes.

use std::time::Duration;

pub use accounts::Account;
pub use commands::CreateRequestCmd;
pub use error::EngineError;
pub use ops::{Engine, EngineBuilder};
pub use requests::{ExchangeRequest, RequestStatus};
pub use transfers::Transfer;

mod accounts;
mod commands;
mod error;
mod locks;
mod ops;
mod requests;
mod transfers;
mod util;

type ResultEngine<T> = Result<T, EngineError>;

/// Tokens granted to every new account.
pub const DEFAULT_STARTING_GRANT: i64 = 5;
/// Tokens paid by the requester when a request completes.
pub const DEFAULT_COMPLETION_AMOUNT: i64 = 1;
/// How long an operation waits for a contended account or request.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);
