//! Domain event boundary: the session record the scheduler consumes.
//!
//! The session store itself is an external collaborator; only the shape the
//! scheduler needs crosses this boundary.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a session participant, used to select which notification types
/// fan out to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Mentor,
    Mentee,
}

/// One addressable recipient on a session event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecipient {
    pub email: String,
    pub name: String,
    pub role: ParticipantRole,
}

/// A session event with a known future start, as handed over by the domain
/// store. `starts_at` is UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub session_id: Uuid,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: i64,
    pub recipients: Vec<SessionRecipient>,
}

impl SessionEvent {
    pub fn ends_at(&self) -> NaiveDateTime {
        self.starts_at + chrono::Duration::minutes(self.duration_minutes)
    }
}
