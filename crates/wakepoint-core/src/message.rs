//! Wire contract between the scheduler, the delivery receiver and the
//! target surface.
//!
//! The broadcast -> execution-unit hand-off is an internal channel, not a
//! public API, but its shape is part of the correctness contract: the
//! receiver forwards `alarm_id`/`alarm_type` untouched, and the surface
//! consumes the payload under fixed extras keys.

use serde::{Deserialize, Serialize};

/// Action identifier carried by every alarm broadcast.
///
/// Messages with any other action are ignored by the receiver.
pub const ALARM_ACTION: &str = "wakepoint.ALARM_ACTION";

/// Fixed extras key for the alarm identifier.
pub const EXTRA_ALARM_ID: &str = "ALARM_ID";
/// Fixed extras key for the host-defined alarm category.
pub const EXTRA_ALARM_TYPE: &str = "ALARM_TYPE";
/// Fixed extras key for the data-provider payload.
pub const EXTRA_ALARM_DATA: &str = "ALARM_DATA";

/// Arbitrary key/value payload produced by the host data provider.
pub type AlarmPayload = serde_json::Map<String, serde_json::Value>;

/// The message handed from the alarm driver to the delivery receiver when
/// an alarm fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmMessage {
    pub action: String,
    pub alarm_id: i32,
    pub alarm_type: String,
}

impl AlarmMessage {
    /// Build a message carrying [`ALARM_ACTION`].
    pub fn alarm(alarm_id: i32, alarm_type: impl Into<String>) -> Self {
        Self {
            action: ALARM_ACTION.to_string(),
            alarm_id,
            alarm_type: alarm_type.into(),
        }
    }

    pub fn is_alarm(&self) -> bool {
        self.action == ALARM_ACTION
    }
}

/// Launch request handed to the target surface when a delivery completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub alarm_id: i32,
    pub alarm_type: String,
    pub payload: AlarmPayload,
}

impl LaunchRequest {
    /// The extras map the surface consumes, under the fixed keys
    /// `ALARM_ID`, `ALARM_TYPE` and `ALARM_DATA`.
    pub fn extras(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut extras = serde_json::Map::new();
        extras.insert(EXTRA_ALARM_ID.into(), self.alarm_id.into());
        extras.insert(EXTRA_ALARM_TYPE.into(), self.alarm_type.clone().into());
        extras.insert(
            EXTRA_ALARM_DATA.into(),
            serde_json::Value::Object(self.payload.clone()),
        );
        extras
    }
}
