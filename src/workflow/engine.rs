//! Request orchestration: validate, confirm, apply.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::store::{UnsubscribeLogEntry, UnsubscribeStore};
use crate::token::codec::token_prefix;
use crate::token::TokenCodec;
use crate::workflow::outcome::{Confirmation, Outcome, StorageOperation, WorkflowError};

/// One inbound unsubscribe request.
#[derive(Debug, Clone, Default)]
pub struct UnsubscribeRequest {
    pub token: Option<String>,
    pub confirm: Confirmation,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl UnsubscribeRequest {
    pub fn new(token: impl Into<String>, confirm: Confirmation) -> Self {
        Self {
            token: Some(token.into()),
            confirm,
            ..Default::default()
        }
    }
}

/// Drives a request through token verification, user lookup and the
/// confirmed state change.
#[derive(Clone)]
pub struct UnsubscribeWorkflow {
    codec: TokenCodec,
    store: Arc<dyn UnsubscribeStore>,
}

impl UnsubscribeWorkflow {
    pub fn new(codec: TokenCodec, store: Arc<dyn UnsubscribeStore>) -> Self {
        Self { codec, store }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Handle a request against the current time.
    pub async fn handle(&self, request: &UnsubscribeRequest) -> Result<Outcome, WorkflowError> {
        self.handle_at(request, Utc::now()).await
    }

    /// Handle a request as if it arrived at `now`.
    pub async fn handle_at(
        &self,
        request: &UnsubscribeRequest,
        now: DateTime<Utc>,
    ) -> Result<Outcome, WorkflowError> {
        // Links and audit records carry the token exactly as it was verified.
        let Some(token) = request.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(Outcome::NoToken);
        };

        let verified = match self.codec.verify_at(token, now) {
            Ok(verified) => verified,
            Err(err) => {
                tracing::debug!(
                    token_prefix = %token_prefix(token),
                    reason = err.kind(),
                    "Token rejected"
                );
                return Ok(Outcome::from(err));
            }
        };
        let user_id = verified.user_id;
        let email = verified.email;

        let user = self
            .store
            .find_user(user_id, &email)
            .await
            .map_err(|source| WorkflowError::Storage {
                operation: StorageOperation::FindUser,
                user_id,
                source,
            })?;

        let Some(user) = user else {
            tracing::info!(user_id, "No user matches token");
            return Ok(Outcome::UserNotFound);
        };

        if user.unsubscribed {
            return Ok(Outcome::AlreadyUnsubscribed { email });
        }

        match request.confirm {
            Confirmation::No => return Ok(Outcome::Declined { email }),
            Confirmation::Absent => {
                return Ok(Outcome::AwaitingConfirmation {
                    email,
                    token: token.to_string(),
                })
            }
            Confirmation::Yes => {}
        }

        let entry = UnsubscribeLogEntry {
            id: Uuid::new_v4(),
            user_id,
            email: email.clone(),
            token: token.to_string(),
            ip_address: request.ip_address.clone(),
            user_agent: request.user_agent.clone(),
            timestamp: now,
        };
        self.store
            .apply_unsubscribe(user_id, now, entry)
            .await
            .map_err(|source| WorkflowError::Storage {
                operation: StorageOperation::ApplyUnsubscribe,
                user_id,
                source,
            })?;

        // The user is already unsubscribed; a failure here only loses the audit flag.
        if let Err(e) = self.store.mark_token_used(user_id, token, now).await {
            tracing::warn!(
                user_id,
                token_prefix = %token_prefix(token),
                error = %e,
                "Failed to mark token used"
            );
        }

        tracing::info!(user_id, "User unsubscribed");
        Ok(Outcome::Confirmed { email })
    }
}
