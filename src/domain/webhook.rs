use serde::Serialize;

/// A verified vendor notification. Lives for one `handle_webhook` call.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub event_type: String,
    pub event_id: Option<String>,
    pub data_object: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookStage {
    Received,
    Verified,
    Dispatched,
    Acknowledged,
    Rejected,
}

/// What a known event type contributes to its audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Succeeded,
    Failed,
}
