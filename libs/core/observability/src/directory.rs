//! Domain counters for the user directory.

use metrics::counter;

/// Static recorder for user directory events
pub struct DirectoryMetrics;

impl DirectoryMetrics {
    pub fn record_created() {
        counter!("user_operations_total", "operation" => "create").increment(1);
    }

    pub fn record_updated() {
        counter!("user_operations_total", "operation" => "update").increment(1);
    }

    pub fn record_deleted() {
        counter!("user_operations_total", "operation" => "delete").increment(1);
    }

    /// `field` is the first invalid field reported by validation
    pub fn record_validation_failure(field: &'static str) {
        counter!("user_rejections_total", "reason" => "validation", "field" => field).increment(1);
    }

    pub fn record_duplicate_email() {
        counter!("user_rejections_total", "reason" => "duplicate_email").increment(1);
    }

    pub fn record_notification_sent(event_type: &'static str) {
        counter!("user_notifications_total", "event_type" => event_type).increment(1);
    }

    pub fn record_notification_failed(event_type: &'static str) {
        counter!("user_notification_failures_total", "event_type" => event_type).increment(1);

        tracing::debug!(event_type, "Notification failure recorded");
    }
}
