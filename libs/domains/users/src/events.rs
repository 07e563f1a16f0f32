//! Best-effort change notifications.
//!
//! Create and delete publish a [`UserEvent`]; update publishes nothing.
//! Each publish runs on its own task, so callers never wait on the channel.
//! Publishing failures are logged and counted, never returned.

use async_trait::async_trait;
use observability::DirectoryMetrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info_span};

use crate::models::User;

pub const DEFAULT_TOPIC: &str = "user-events";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserEventType {
    UserCreated,
    UserDeleted,
}

impl UserEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserEventType::UserCreated => "USER_CREATED",
            UserEventType::UserDeleted => "USER_DELETED",
        }
    }
}

/// Payload published to the user events topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEvent {
    pub event_type: UserEventType,
    pub user_id: i64,
    pub email: String,
    pub name: String,
}

impl UserEvent {
    pub fn new(event_type: UserEventType, user: &User) -> Self {
        Self {
            event_type,
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Error)]
#[error("publish to '{topic}' failed: {reason}")]
pub struct PublishError {
    pub topic: String,
    pub reason: String,
}

/// A message channel that accepts raw payloads on a named topic
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;
}

/// Sends user change events through an optional [`EventPublisher`].
#[derive(Clone)]
pub struct ChangeNotifier {
    publisher: Option<Arc<dyn EventPublisher>>,
    topic: String,
}

impl ChangeNotifier {
    pub fn new(publisher: Arc<dyn EventPublisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher: Some(publisher),
            topic: topic.into(),
        }
    }

    /// A notifier that only logs
    pub fn disabled() -> Self {
        Self {
            publisher: None,
            topic: DEFAULT_TOPIC.to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.publisher.is_some()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Requires a Tokio runtime when enabled.
    pub fn notify_created(&self, user: &User) -> Option<JoinHandle<()>> {
        self.notify(UserEvent::new(UserEventType::UserCreated, user))
    }

    pub fn notify_deleted(&self, user: &User) -> Option<JoinHandle<()>> {
        self.notify(UserEvent::new(UserEventType::UserDeleted, user))
    }

    /// Serializes `event` and hands the publish to a background task.
    /// Returns the task handle, or `None` when nothing was sent.
    fn notify(&self, event: UserEvent) -> Option<JoinHandle<()>> {
        let event_type = event.event_type.as_str();
        let span = info_span!(
            "notify",
            topic = %self.topic,
            event_type,
            user_id = event.user_id
        );

        let Some(publisher) = self.publisher.clone() else {
            span.in_scope(|| debug!("Notifications disabled, dropping event"));
            return None;
        };

        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                span.in_scope(|| error!(error = %e, "Failed to serialize user event"));
                DirectoryMetrics::record_notification_failed(event_type);
                return None;
            }
        };

        let topic = self.topic.clone();
        let task = async move {
            match publisher.publish(&topic, payload).await {
                Ok(()) => {
                    debug!("User event published");
                    DirectoryMetrics::record_notification_sent(event_type);
                }
                Err(e) => {
                    error!(error = %e, "Failed to publish user event");
                    DirectoryMetrics::record_notification_failed(event_type);
                }
            }
        };
        Some(tokio::spawn(task.instrument(span)))
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl EventPublisher for Recorder {
        async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
            self.sent.lock().unwrap().push((topic.to_string(), payload));
            Ok(())
        }
    }

    fn user() -> User {
        User {
            id: 3,
            name: "Ivan Petrov".to_string(),
            email: "ivan@mail.com".to_string(),
            age: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(UserEvent::new(UserEventType::UserDeleted, &user())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "eventType": "USER_DELETED",
                "userId": 3,
                "email": "ivan@mail.com",
                "name": "Ivan Petrov"
            })
        );
    }

    #[tokio::test]
    async fn test_notify_created_publishes_to_topic() {
        let recorder = Arc::new(Recorder::default());
        let notifier = ChangeNotifier::new(recorder.clone(), "directory.users");

        notifier
            .notify_created(&user())
            .expect("enabled notifier spawns a publish")
            .await
            .unwrap();

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "directory.users");
        let event: UserEvent = serde_json::from_slice(&sent[0].1).unwrap();
        assert_eq!(event.event_type, UserEventType::UserCreated);
        assert_eq!(event.user_id, 3);
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_a_no_op() {
        let notifier = ChangeNotifier::disabled();
        assert!(!notifier.is_enabled());
        assert!(notifier.notify_deleted(&user()).is_none());
    }

    struct Stalled;

    #[async_trait]
    impl EventPublisher for Stalled {
        async fn publish(&self, _topic: &str, _payload: Vec<u8>) -> Result<(), PublishError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_notify_does_not_wait_for_the_publisher() {
        let notifier = ChangeNotifier::new(Arc::new(Stalled), DEFAULT_TOPIC);

        let handle = notifier.notify_created(&user()).unwrap();
        assert!(!handle.is_finished());
        handle.abort();
    }
}
