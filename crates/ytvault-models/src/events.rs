//! Events pushed to connected subscribers.
//!
//! Event names match what the web client listens for: `message` carries a
//! full job record, `status_update` a progress snapshot and `notify` a toast.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::job::Job;
use crate::progress::ProgressSnapshot;

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Warn,
    Error,
}

/// Generic user-facing notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    /// Free-form payload
    #[serde(default)]
    pub extra_data: Map<String, Value>,
}

impl Notification {
    pub fn new(severity: Severity, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: detail.into(),
            extra_data: Map::new(),
        }
    }

    pub fn success(detail: impl Into<String>) -> Self {
        Self::new(Severity::Success, "Success", detail)
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self::new(Severity::Error, "Error", detail)
    }

    /// Attach an extra key/value pair.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_data.insert(key.into(), value.into());
        self
    }
}

/// Envelope for everything the event bus publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full job record after a persisted change
    Message(Job),
    /// Live progress for a downloading job
    StatusUpdate(ProgressSnapshot),
    Notify(Notification),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Message(_) => "message",
            ServerEvent::StatusUpdate(_) => "status_update",
            ServerEvent::Notify(_) => "notify",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobId;

    #[test]
    fn test_event_envelope_shape() {
        let event = ServerEvent::StatusUpdate(ProgressSnapshot::empty(JobId::from("j1")));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "status_update");
        assert_eq!(value["data"]["id"], "j1");
        assert_eq!(value["data"]["totalSize"], "0");
        assert_eq!(event.name(), "status_update");
    }

    #[test]
    fn test_notification_extra_data() {
        let note = Notification::error("engine exited").with_extra("jobId", "j1");
        let value = serde_json::to_value(ServerEvent::Notify(note)).unwrap();
        assert_eq!(value["event"], "notify");
        assert_eq!(value["data"]["severity"], "error");
        assert_eq!(value["data"]["extraData"]["jobId"], "j1");
    }
}
