//! Transfers API endpoints.

use api_types::{account::Balance, transfer::TransferNew};
use axum::{Extension, Json, extract::State};

use crate::{ServerError, server::{ActingUser, ServerState}};

/// Sends tokens from the acting user to `to`; answers with the payer's new
/// balance.
pub async fn transfer_new(
    Extension(ActingUser(user_id)): Extension<ActingUser>,
    State(state): State<ServerState>,
    Json(payload): Json<TransferNew>,
) -> Result<Json<Balance>, ServerError> {
    let to = payload.to.trim();
    if to.is_empty() {
        return Err(ServerError::Generic("to is required".to_string()));
    }
    state
        .engine
        .transfer(&user_id, to, payload.amount)
        .await?;
    let balance = state.engine.balance(&user_id).await?;

    Ok(Json(Balance {
        account_id: user_id,
        balance,
    }))
}
