// ── Device domain types ──

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A managed device hosting traffic classes.
///
/// At most one record exists per `host`. Ports are recorded on first
/// contact and left alone afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub host: String,
    pub lan_port: String,
    pub wan_port: String,
    /// Most recent (re)connection.
    pub uptime: DateTime<Utc>,
    /// Most recent liveness signal.
    pub heartbeat_timestamp: Option<DateTime<Utc>>,
}

impl Device {
    /// Whether the last heartbeat is older than `threshold` at `now`.
    ///
    /// A device that never sent a heartbeat is stale.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.heartbeat_timestamp
            .is_none_or(|last| now.signed_duration_since(last) > threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(heartbeat: Option<DateTime<Utc>>) -> Device {
        Device {
            id: Uuid::new_v4(),
            host: "edge-1".into(),
            lan_port: "enp1s0f0".into(),
            wan_port: "enp1s0f1".into(),
            uptime: Utc::now(),
            heartbeat_timestamp: heartbeat,
        }
    }

    #[test]
    fn fresh_heartbeat_is_not_stale() {
        let now = Utc::now();
        let d = device(Some(now - Duration::seconds(5)));
        assert!(!d.is_stale(now, Duration::seconds(30)));
    }

    #[test]
    fn old_or_missing_heartbeat_is_stale() {
        let now = Utc::now();
        assert!(device(Some(now - Duration::seconds(31))).is_stale(now, Duration::seconds(30)));
        assert!(device(None).is_stale(now, Duration::seconds(30)));
    }
}
