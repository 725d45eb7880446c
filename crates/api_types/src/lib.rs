use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Balance {
        pub account_id: String,
        pub balance: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub account_id: String,
        pub balance: i64,
        pub created_at: DateTime<Utc>,
    }
}

pub mod transfer {
    use super::*;

    /// Body of `POST /transfers`. The payer is the acting user.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferNew {
        pub to: String,
        pub amount: i64,
    }
}

pub mod request {
    use super::*;

    /// Status of an exchange request on the wire.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum RequestStatus {
        Pending,
        Accepted,
        Declined,
        Completed,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RequestNew {
        pub provider_id: String,
        pub skill: String,
        pub message: Option<String>,
    }

    /// Body of `PUT /requests/{id}`.
    ///
    /// The status is a plain string so clients may send any casing
    /// (`"Completed"`, `"accepted"`).
    #[derive(Debug, Serialize, Deserialize)]
    pub struct StatusUpdate {
        pub status: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RequestView {
        pub id: Uuid,
        pub requester_id: String,
        pub provider_id: String,
        pub skill: String,
        pub message: Option<String>,
        pub status: RequestStatus,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RequestList {
        pub requests: Vec<RequestView>,
    }
}
