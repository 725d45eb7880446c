use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    CreateRequestCmd, EngineError, ExchangeRequest, RequestStatus, ResultEngine, Transfer,
    requests,
};

use super::{Engine, ledger::require_account, transfer::transfer_in};

impl Engine {
    /// Creates a `pending` request from `requester_id` to `provider_id`.
    pub async fn create_request(&self, cmd: CreateRequestCmd) -> ResultEngine<ExchangeRequest> {
        let CreateRequestCmd {
            requester_id,
            provider_id,
            skill,
            message,
        } = cmd;
        let request = ExchangeRequest::new(
            requester_id,
            provider_id,
            &skill,
            message.as_deref(),
            Utc::now(),
        )?;

        for user_id in [&request.requester_id, &request.provider_id] {
            match require_account(&self.database, user_id).await {
                Ok(_) => {}
                Err(EngineError::AccountNotFound(id)) => return Err(EngineError::UnknownUser(id)),
                Err(err) => return Err(err),
            }
        }

        requests::ActiveModel::from(&request)
            .insert(&self.database)
            .await?;

        tracing::info!(
            request_id = %request.id,
            requester_id = %request.requester_id,
            provider_id = %request.provider_id,
            skill = %request.skill,
            "request created"
        );
        Ok(request)
    }

    pub async fn request(&self, request_id: Uuid) -> ResultEngine<ExchangeRequest> {
        find_request(&self.database, request_id).await
    }

    /// Requests addressed to `user_id` as provider, newest first.
    pub async fn list_incoming(&self, user_id: &str) -> ResultEngine<Vec<ExchangeRequest>> {
        self.list_requests(requests::Column::ProviderId, user_id)
            .await
    }

    /// Requests made by `user_id`, newest first.
    pub async fn list_outgoing(&self, user_id: &str) -> ResultEngine<Vec<ExchangeRequest>> {
        self.list_requests(requests::Column::RequesterId, user_id)
            .await
    }

    async fn list_requests(
        &self,
        column: requests::Column,
        user_id: &str,
    ) -> ResultEngine<Vec<ExchangeRequest>> {
        requests::Entity::find()
            .filter(column.eq(user_id.to_string()))
            .order_by_desc(requests::Column::CreatedAt)
            .order_by_desc(requests::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(ExchangeRequest::try_from)
            .collect()
    }

    /// Moves a request along its status graph on behalf of `acting_user_id`.
    ///
    /// Only the provider may act. Checks run in order: `RequestNotFound`,
    /// `Unauthorized`, `AlreadyTerminal`, `InvalidTransition`.
    ///
    /// Completing a request moves the completion amount from the requester to
    /// the provider and writes `completed` in the same DB transaction. If the
    /// payment is rejected the call fails with `CompletionFailed`; if the
    /// status write fails nothing is committed. A commit that fails with an
    /// unknown outcome is reported as `InconsistentCompletion` and logged on
    /// the `reconcile` target.
    pub async fn update_status(
        &self,
        request_id: Uuid,
        new_status: RequestStatus,
        acting_user_id: &str,
    ) -> ResultEngine<ExchangeRequest> {
        let _guard = self
            .request_locks
            .lock(&request_id.to_string(), self.op_timeout)
            .await?;

        let current = self.request(request_id).await?;
        if current.provider_id != acting_user_id {
            return Err(EngineError::Unauthorized(format!(
                "only the provider can update request {request_id}"
            )));
        }
        current.status.check_transition(new_status)?;

        // Keep updated_at >= created_at even if the wall clock steps back.
        let now = Utc::now().max(current.updated_at);

        if new_status != RequestStatus::Completed {
            let updated = write_status_in(&self.database, &current, new_status, now).await?;
            tracing::info!(%request_id, status = %new_status, "request status updated");
            return Ok(updated);
        }

        self.complete(current, now).await
    }

    async fn complete(
        &self,
        current: ExchangeRequest,
        now: DateTime<Utc>,
    ) -> ResultEngine<ExchangeRequest> {
        let request_id = current.id;
        let amount = self.completion_amount;
        let rejected = |err: EngineError| {
            tracing::warn!(%request_id, error = %err, "completion transfer rejected");
            EngineError::CompletionFailed(Box::new(err))
        };

        let transfer = Transfer::new(&current.requester_id, &current.provider_id, amount)
            .map_err(rejected)?;
        let _guards = self
            .account_locks
            .lock_all(&transfer.lock_order(), self.op_timeout)
            .await
            .map_err(rejected)?;
        self.check_transfer(&transfer).await.map_err(rejected)?;

        let db_tx = self.database.begin().await?;
        transfer_in(&db_tx, &transfer).await.map_err(rejected)?;
        let updated = write_status_in(&db_tx, &current, RequestStatus::Completed, now).await?;

        if let Err(err) = db_tx.commit().await {
            tracing::error!(
                target: "reconcile",
                %request_id,
                requester_id = %current.requester_id,
                provider_id = %current.provider_id,
                amount,
                error = %err,
                "completion commit failed, outcome unknown"
            );
            return Err(EngineError::InconsistentCompletion {
                request_id,
                requester_id: current.requester_id,
                provider_id: current.provider_id,
                amount,
                reason: err.to_string(),
            });
        }

        tracing::info!(
            %request_id,
            from = %transfer.from,
            to = %transfer.to,
            amount,
            "request completed"
        );
        Ok(updated)
    }
}

async fn find_request<C: ConnectionTrait>(
    db: &C,
    request_id: Uuid,
) -> ResultEngine<ExchangeRequest> {
    let model = requests::Entity::find_by_id(request_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::RequestNotFound(request_id.to_string()))?;
    ExchangeRequest::try_from(model)
}

/// Writes `next` only if the stored status is still the one we validated.
async fn write_status_in<C: ConnectionTrait>(
    db: &C,
    current: &ExchangeRequest,
    next: RequestStatus,
    now: DateTime<Utc>,
) -> ResultEngine<ExchangeRequest> {
    let changes = requests::ActiveModel {
        status: ActiveValue::Set(next.as_str().to_string()),
        updated_at: ActiveValue::Set(now),
        ..Default::default()
    };
    let result = requests::Entity::update_many()
        .set(changes)
        .filter(requests::Column::Id.eq(current.id.to_string()))
        .filter(requests::Column::Status.eq(current.status.as_str()))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        // Someone else moved the request first.
        let latest = find_request(db, current.id).await?;
        latest.status.check_transition(next)?;
        return Err(EngineError::InvalidTransition {
            from: latest.status,
            to: next,
        });
    }

    Ok(ExchangeRequest {
        status: next,
        updated_at: now,
        ..current.clone()
    })
}
