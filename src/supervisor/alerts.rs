//! Operator alert channel.
//!
//! Routes alerts by severity: everything is emitted through `tracing`, and
//! subscribers (notifier integrations, dashboards) receive a copy over a
//! broadcast channel. Reconciliation-critical events from the execution
//! engine arrive here with enough identifying detail to manually reconcile.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertLevel {
    /// Informational - log only
    Info,
    /// Warning - degraded but recoverable
    Warning,
    /// Error - an operation failed
    Error,
    /// Critical - operator action required
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Error => "error",
            AlertLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alert payload
#[derive(Debug, Clone)]
pub struct Alert {
    pub level: AlertLevel,
    pub component: String,
    pub title: String,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Create a new alert
    pub fn new(level: AlertLevel, component: &str, title: &str, message: &str) -> Self {
        Self {
            level,
            component: component.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            metadata: None,
            timestamp: Utc::now(),
        }
    }

    /// Add metadata to the alert
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Fans alerts out to log output and channel subscribers
pub struct AlertManager {
    event_tx: tokio::sync::broadcast::Sender<Alert>,
}

impl AlertManager {
    pub fn new() -> Self {
        let (event_tx, _) = tokio::sync::broadcast::channel(64);
        Self { event_tx }
    }

    /// Subscribe to the alert stream (notifiers, dashboards)
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Alert> {
        self.event_tx.subscribe()
    }

    /// Emit an alert. Never fails; a missing subscriber only means the log
    /// output is the sole consumer.
    pub fn raise(&self, alert: Alert) {
        match alert.level {
            AlertLevel::Critical | AlertLevel::Error => error!(
                component = %alert.component,
                severity = %alert.level,
                metadata = ?alert.metadata,
                "{}: {}",
                alert.title,
                alert.message
            ),
            AlertLevel::Warning => warn!(
                component = %alert.component,
                metadata = ?alert.metadata,
                "{}: {}",
                alert.title,
                alert.message
            ),
            AlertLevel::Info => info!(
                component = %alert.component,
                "{}: {}",
                alert.title,
                alert.message
            ),
        }
        let _ = self.event_tx.send(alert);
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_raised_alerts() {
        let manager = AlertManager::new();
        let mut rx = manager.subscribe();

        let alert = Alert::new(
            AlertLevel::Critical,
            "execution-engine",
            "persistence failed after venue submission",
            "venue order V-1 has no local row",
        )
        .with_metadata(serde_json::json!({ "venue_order_ids": ["V-1"] }));
        manager.raise(alert);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.level, AlertLevel::Critical);
        assert_eq!(received.component, "execution-engine");
        assert!(received.metadata.is_some());
    }

    #[test]
    fn test_raise_without_subscribers_does_not_panic() {
        let manager = AlertManager::new();
        manager.raise(Alert::new(AlertLevel::Info, "test", "t", "m"));
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(AlertLevel::Critical > AlertLevel::Error);
        assert!(AlertLevel::Error > AlertLevel::Warning);
        assert!(AlertLevel::Warning > AlertLevel::Info);
    }
}
