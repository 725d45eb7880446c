//! Exchange requests and their status graph.
//!
//! A request is created `pending` by the requester. Only the provider moves it
//! forward:
//!
//! ```text
//! pending --accept--> accepted --complete--> completed
//!    |
//!    +--decline--> declined
//! ```
//!
//! `declined` and `completed` are terminal.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    util::{normalize_optional_text, normalize_required_text},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
    Completed,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Completed => "completed",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Declined | Self::Completed)
    }

    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted)
                | (Self::Pending, Self::Declined)
                | (Self::Accepted, Self::Completed)
        )
    }

    /// Validates the edge `self -> next`.
    ///
    /// Terminal sources fail with `AlreadyTerminal`, every other edge outside
    /// the graph with `InvalidTransition`.
    pub fn check_transition(self, next: RequestStatus) -> ResultEngine<()> {
        if self.is_terminal() {
            return Err(EngineError::AlreadyTerminal(self));
        }
        if !self.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                from: self,
                to: next,
            });
        }
        Ok(())
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "completed" => Ok(Self::Completed),
            _ => Err(EngineError::InvalidStatus(value.to_string())),
        }
    }
}

impl TryFrom<&str> for RequestStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One user asking another to teach a skill.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub id: Uuid,
    pub requester_id: String,
    pub provider_id: String,
    pub skill: String,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRequest {
    /// Builds a new `pending` request.
    ///
    /// Fails with `SelfRequest` when both parties are the same user and with
    /// `InvalidSkill` when the skill is blank. Whether the users exist is
    /// checked by the engine against the ledger.
    pub fn new(
        requester_id: String,
        provider_id: String,
        skill: &str,
        message: Option<&str>,
        now: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if requester_id == provider_id {
            return Err(EngineError::SelfRequest);
        }
        let skill = normalize_required_text(skill)
            .ok_or_else(|| EngineError::InvalidSkill("skill must not be empty".to_string()))?;

        Ok(Self {
            id: Uuid::new_v4(),
            requester_id,
            provider_id,
            skill,
            message: normalize_optional_text(message),
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.requester_id == user_id || self.provider_id == user_id
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub requester_id: String,
    pub provider_id: String,
    pub skill: String,
    pub message: Option<String>,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::RequesterId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Requester,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::ProviderId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Provider,
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ExchangeRequest> for ActiveModel {
    fn from(request: &ExchangeRequest) -> Self {
        Self {
            id: ActiveValue::Set(request.id.to_string()),
            requester_id: ActiveValue::Set(request.requester_id.clone()),
            provider_id: ActiveValue::Set(request.provider_id.clone()),
            skill: ActiveValue::Set(request.skill.clone()),
            message: ActiveValue::Set(request.message.clone()),
            status: ActiveValue::Set(request.status.as_str().to_string()),
            created_at: ActiveValue::Set(request.created_at),
            updated_at: ActiveValue::Set(request.updated_at),
        }
    }
}

impl TryFrom<Model> for ExchangeRequest {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::RequestNotFound(model.id.clone()))?,
            requester_id: model.requester_id,
            provider_id: model.provider_id,
            skill: model.skill,
            message: model.message,
            status: RequestStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
