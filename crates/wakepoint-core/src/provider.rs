//! Host data-provider contract.
//!
//! The host implements [`AlarmDataProvider`] so the delivery unit can fetch
//! the latest, type-specific data just before the alarm surface is shown,
//! even after process death. Implementations must tolerate being invoked
//! after arbitrary restarts and must return an empty payload (never fail
//! loudly) when no data matches.

use async_trait::async_trait;

use crate::message::AlarmPayload;

/// Fetches the key/value payload for a fired alarm.
///
/// Invoked by the delivery unit under a bounded timeout; implementations
/// are expected to return quickly so the surface can appear without delay.
#[async_trait]
pub trait AlarmDataProvider: Send + Sync {
    /// Fetch (or build) the data to display when the alarm fires.
    ///
    /// `alarm_id` is the id the host passed at schedule time; `alarm_type`
    /// is the host-defined category (e.g. "MEETING"). Return an empty
    /// payload if nothing is available.
    async fn provide_data(&self, alarm_id: i32, alarm_type: &str) -> AlarmPayload;
}

/// Default provider: always returns an empty payload.
#[derive(Debug, Default)]
pub struct NullProvider;

#[async_trait]
impl AlarmDataProvider for NullProvider {
    async fn provide_data(&self, _alarm_id: i32, _alarm_type: &str) -> AlarmPayload {
        AlarmPayload::new()
    }
}
