use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every externally visible state change produces an event.
/// The presentation layer subscribes through
/// [`TrackingController::subscribe_events`](crate::TrackingController::subscribe_events)
/// and relays events over its own bridge.
///
/// Field names are camelCase on the wire to match the bridge contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrackingEvent {
    /// Tracking was switched on or off.
    #[serde(rename_all = "camelCase")]
    TrackingStateChanged {
        is_tracking: bool,
        at: DateTime<Utc>,
    },
    /// A fix was applied while tracking.
    #[serde(rename_all = "camelCase")]
    LocationUpdated {
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    },
}
