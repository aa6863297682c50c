//! Shared association record and the status view derived from it.

use lockbank_core::association::AssociationPolicy;
use lockbank_core::types::{AssociationMode, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// The single `association_state` row.
#[derive(Debug, Clone, FromRow)]
pub struct AssociationRecord {
    #[sqlx(try_from = "String")]
    pub mode: AssociationMode,
    pub email: Option<String>,
    pub card_id: Option<String>,
    pub message: Option<String>,
    pub issued_at: Option<Timestamp>,
}

impl AssociationRecord {
    /// Email of a request still waiting for its scan at `now`.
    pub fn pending_email(&self, policy: &AssociationPolicy, now: Timestamp) -> Option<&str> {
        match (self.mode, self.issued_at) {
            (AssociationMode::Association, Some(issued_at)) if !policy.is_expired(issued_at, now) => {
                self.email.as_deref()
            }
            _ => None,
        }
    }

    /// Whether the record is an ASSOCIATION request past its deadline.
    pub fn is_expired_request(&self, policy: &AssociationPolicy, now: Timestamp) -> bool {
        self.mode == AssociationMode::Association
            && self
                .issued_at
                .is_none_or(|issued_at| policy.is_expired(issued_at, now))
    }

    pub fn status(&self, policy: &AssociationPolicy, now: Timestamp) -> AssociationStatus {
        let kind = match self.mode {
            AssociationMode::Normal => AssociationStatusKind::Idle,
            AssociationMode::Success => AssociationStatusKind::Success,
            AssociationMode::Error => AssociationStatusKind::Error,
            AssociationMode::Association if self.is_expired_request(policy, now) => {
                AssociationStatusKind::Timeout
            }
            AssociationMode::Association => AssociationStatusKind::Waiting,
        };

        let expires_at = match kind {
            AssociationStatusKind::Waiting | AssociationStatusKind::Timeout => {
                self.issued_at.map(|t| policy.expires_at(t))
            }
            _ => None,
        };

        AssociationStatus {
            status: kind,
            email: match kind {
                AssociationStatusKind::Idle => None,
                _ => self.email.clone(),
            },
            card_id: match kind {
                AssociationStatusKind::Success => self.card_id.clone(),
                _ => None,
            },
            message: match kind {
                AssociationStatusKind::Error => self.message.clone(),
                _ => None,
            },
            expires_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationStatusKind {
    Idle,
    Waiting,
    Success,
    Error,
    Timeout,
}

/// What the registration page shows while it polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssociationStatus {
    pub status: AssociationStatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}
