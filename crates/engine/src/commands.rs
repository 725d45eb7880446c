//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists.

/// Create an exchange request.
#[derive(Clone, Debug)]
pub struct CreateRequestCmd {
    pub requester_id: String,
    pub provider_id: String,
    pub skill: String,
    pub message: Option<String>,
}

impl CreateRequestCmd {
    #[must_use]
    pub fn new(
        requester_id: impl Into<String>,
        provider_id: impl Into<String>,
        skill: impl Into<String>,
    ) -> Self {
        Self {
            requester_id: requester_id.into(),
            provider_id: provider_id.into(),
            skill: skill.into(),
            message: None,
        }
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
