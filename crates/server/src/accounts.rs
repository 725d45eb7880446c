//! Accounts API endpoints.

use api_types::account::AccountView;
use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{ServerError, server::{ActingUser, ServerState}};

fn view(account: engine::Account) -> AccountView {
    AccountView {
        account_id: account.id,
        balance: account.balance,
        created_at: account.created_at,
    }
}

/// Opens the acting user's account with the configured starting grant.
pub async fn account_new(
    Extension(ActingUser(user_id)): Extension<ActingUser>,
    State(state): State<ServerState>,
) -> Result<(StatusCode, Json<AccountView>), ServerError> {
    let account = state
        .engine
        .create_account(&user_id, state.starting_grant)
        .await?;

    Ok((StatusCode::CREATED, Json(view(account))))
}

pub async fn me(
    Extension(ActingUser(user_id)): Extension<ActingUser>,
    State(state): State<ServerState>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state.engine.account(&user_id).await?;
    Ok(Json(view(account)))
}
