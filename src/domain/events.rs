//! Subscription transition events.
//!
//! Emitted by the scanner on the broadcast bus; consumed by notifiers
//! outside this crate.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::UserId;

/// A detected change in a user's subscription-active state between scans.
///
/// The scanner only reports lapses; renewals update its internal state
/// silently. New variants can be added without breaking subscribers because
/// the serialized form is tagged.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum TransitionEvent {
    BecameExpired {
        user_id: UserId,
        username: String,
        subscription_end_date: NaiveDate,
    },
}

impl TransitionEvent {
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::BecameExpired { user_id, .. } => *user_id,
        }
    }
}
