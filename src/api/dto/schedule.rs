//! Scheduling request DTOs.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{ParticipantRole, SessionEvent, SessionRecipient};

/// One recipient on a session event.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecipientRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    pub role: ParticipantRole,
}

/// A session event as handed over by the domain store.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SessionEventRequest {
    pub session_id: Uuid,
    /// Session start, UTC.
    #[schema(value_type = String, format = DateTime)]
    pub starts_at: NaiveDateTime,
    #[validate(range(min = 1, max = 1440, message = "Duration must be between 1 and 1440 minutes"))]
    pub duration_minutes: i64,
    #[validate(nested)]
    pub recipients: Vec<RecipientRequest>,
}

impl SessionEventRequest {
    pub fn into_event(self) -> SessionEvent {
        SessionEvent {
            session_id: self.session_id,
            starts_at: self.starts_at,
            duration_minutes: self.duration_minutes,
            recipients: self
                .recipients
                .into_iter()
                .map(|r| SessionRecipient {
                    email: r.email,
                    name: r.name,
                    role: r.role,
                })
                .collect(),
        }
    }
}

/// POST /api/schedule request body.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ScheduleSessionRequest {
    #[validate(nested)]
    #[serde(flatten)]
    pub event: SessionEventRequest,
    /// Delete-then-recreate when active batches already exist for the
    /// session.
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// POST /api/schedule/bulk request body.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkScheduleRequest {
    #[validate(nested, length(min = 1, message = "At least one event is required"))]
    pub events: Vec<SessionEventRequest>,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request_json() -> serde_json::Value {
        serde_json::json!({
            "session_id": Uuid::new_v4(),
            "starts_at": "2026-09-10T15:00:00",
            "duration_minutes": 60,
            "recipients": [
                {"email": "mentor@example.com", "name": "Mentor", "role": "mentor"},
                {"email": "mentee@example.com", "name": "Mentee", "role": "mentee"}
            ],
            "force": true,
            "created_by": "ops@example.com"
        })
    }

    #[test]
    fn test_valid_request_deserializes_and_validates() {
        let request: ScheduleSessionRequest =
            serde_json::from_value(valid_request_json()).unwrap();
        assert!(request.validate().is_ok());
        assert!(request.force);

        let event = request.event.into_event();
        assert_eq!(event.recipients.len(), 2);
        assert_eq!(event.duration_minutes, 60);
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut json = valid_request_json();
        json["recipients"][0]["email"] = serde_json::json!("not-an-email");
        let request: ScheduleSessionRequest = serde_json::from_value(json).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut json = valid_request_json();
        json["duration_minutes"] = serde_json::json!(0);
        let request: ScheduleSessionRequest = serde_json::from_value(json).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_force_defaults_to_false() {
        let mut json = valid_request_json();
        json.as_object_mut().unwrap().remove("force");
        let request: ScheduleSessionRequest = serde_json::from_value(json).unwrap();
        assert!(!request.force);
    }

    #[test]
    fn test_bulk_request_requires_events() {
        let request: BulkScheduleRequest = serde_json::from_value(serde_json::json!({
            "events": []
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }
}
