//! Exact-alarm scheduling and cancellation.
//!
//! Failure policy: nothing here crosses the public API as an error. A
//! missing capability or a driver fault becomes `false` plus a log line —
//! the caller is typically a UI click-handler and must not crash.

use std::sync::Arc;

use tracing::{error, info};

use crate::message::AlarmMessage;
use crate::permission::{PermissionOracle, PermissionType};
use crate::platform::AlarmDriver;
use crate::store::PreferenceStore;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One alarm to schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRequest {
    /// Unique within the host's alarm namespace; doubles as the driver's
    /// de-duplication key, so a later schedule under the same id replaces
    /// the earlier one.
    pub alarm_id: i32,
    /// Absolute trigger time, epoch milliseconds.
    pub trigger_at_ms: i64,
    /// Host-defined category, forwarded untouched to the surface.
    pub alarm_type: String,
}

impl AlarmRequest {
    /// Request with the default id, derived from the current time truncated
    /// to i32. Rapid successive calls can collide and silently replace each
    /// other; hosts scheduling more than one simultaneous alarm must supply
    /// distinct ids via [`AlarmRequest::with_id`].
    pub fn new(trigger_at_ms: i64) -> Self {
        Self {
            alarm_id: (now_ms() % i32::MAX as i64) as i32,
            trigger_at_ms,
            alarm_type: String::new(),
        }
    }

    pub fn with_id(mut self, alarm_id: i32) -> Self {
        self.alarm_id = alarm_id;
        self
    }

    pub fn with_type(mut self, alarm_type: impl Into<String>) -> Self {
        self.alarm_type = alarm_type.into();
        self
    }
}

/// Public scheduling contract against the alarm driver.
pub struct AlarmScheduler {
    driver: Arc<dyn AlarmDriver>,
    oracle: Arc<dyn PermissionOracle>,
    store: Arc<PreferenceStore>,
}

impl AlarmScheduler {
    pub fn new(
        driver: Arc<dyn AlarmDriver>,
        oracle: Arc<dyn PermissionOracle>,
        store: Arc<PreferenceStore>,
    ) -> Self {
        Self {
            driver,
            oracle,
            store,
        }
    }

    /// Schedule an exact alarm, waking the device even if idle.
    ///
    /// Fails closed when the exact-alarm capability is not currently
    /// granted — checked live, never cached. Returns `true` only when the
    /// driver accepted the registration; any driver fault is logged and
    /// converted to `false`.
    pub fn schedule_alarm(&self, request: &AlarmRequest) -> bool {
        if !self.oracle.is_granted(PermissionType::Alarm) {
            error!(
                alarm_id = request.alarm_id,
                "cannot schedule exact alarms, permission not granted"
            );
            return false;
        }

        let message = AlarmMessage::alarm(request.alarm_id, request.alarm_type.clone());
        match self
            .driver
            .register(request.alarm_id, request.trigger_at_ms, message)
        {
            Ok(()) => {
                info!(
                    alarm_id = request.alarm_id,
                    trigger_at_ms = request.trigger_at_ms,
                    "alarm scheduled"
                );
                if let Err(e) = self.store.save_alarm_id(request.alarm_id) {
                    error!(alarm_id = request.alarm_id, error = %e,
                        "failed to record alarm id in ledger");
                }
                true
            }
            Err(fault) => {
                error!(alarm_id = request.alarm_id, %fault, "failed to schedule alarm");
                false
            }
        }
    }

    /// Schedule one alarm per `(alarm_id, trigger_at_ms)` pair. Alarms are
    /// independent: one failure does not abort or roll back the rest.
    pub fn schedule_multiple_alarms(
        &self,
        alarm_type: &str,
        events: &[(i32, i64)],
    ) -> Vec<bool> {
        events
            .iter()
            .map(|&(alarm_id, trigger_at_ms)| {
                self.schedule_alarm(
                    &AlarmRequest::new(trigger_at_ms)
                        .with_id(alarm_id)
                        .with_type(alarm_type),
                )
            })
            .collect()
    }

    /// Like [`Self::schedule_multiple_alarms`] with an empty type, returning
    /// the ids of the successfully scheduled subset.
    pub fn schedule_alarms(&self, events: &[(i32, i64)]) -> Vec<i32> {
        self.schedule_multiple_alarms("", events)
            .into_iter()
            .zip(events)
            .filter_map(|(ok, &(alarm_id, _))| ok.then_some(alarm_id))
            .collect()
    }

    /// Cancel a previously scheduled alarm. Canceling an already-fired or
    /// never-scheduled id is a safe no-op.
    pub fn cancel_alarm(&self, alarm_id: i32) {
        if self.driver.cancel(alarm_id) {
            info!(alarm_id, "alarm cancelled");
        } else {
            info!(alarm_id, "alarm not found to cancel");
        }
        if let Err(e) = self.store.remove_alarm_id(alarm_id) {
            error!(alarm_id, error = %e, "failed to remove alarm id from ledger");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{DeviceOracle, DeviceProfile, Oem};
    use crate::platform::local::LocalDriver;

    fn profile() -> DeviceProfile {
        DeviceProfile::new(34, Oem::Generic, "com.example")
    }

    fn scheduler(oracle: DeviceOracle) -> (AlarmScheduler, Arc<LocalDriver>) {
        let driver = Arc::new(LocalDriver::new());
        let store = Arc::new(PreferenceStore::open_in_memory().unwrap());
        (
            AlarmScheduler::new(driver.clone(), Arc::new(oracle), store),
            driver,
        )
    }

    #[tokio::test]
    async fn schedule_fails_closed_without_permission() {
        let (scheduler, driver) = scheduler(DeviceOracle::new(profile()));
        let request = AlarmRequest::new(now_ms() + 10_000).with_id(1);
        assert!(!scheduler.schedule_alarm(&request));
        assert!(!driver.is_pending(1));
    }

    #[tokio::test]
    async fn schedule_succeeds_with_live_grant() {
        let (scheduler, driver) = scheduler(DeviceOracle::unrestricted(profile()));
        let request = AlarmRequest::new(now_ms() + 10_000).with_id(1);
        assert!(scheduler.schedule_alarm(&request));
        assert!(driver.is_pending(1));
    }

    #[tokio::test]
    async fn permission_is_checked_live_not_cached() {
        let oracle = DeviceOracle::unrestricted(profile());
        let driver = Arc::new(LocalDriver::new());
        let store = Arc::new(PreferenceStore::open_in_memory().unwrap());
        let oracle = Arc::new(oracle);
        let scheduler = AlarmScheduler::new(driver.clone(), oracle.clone(), store);

        assert!(scheduler.schedule_alarm(&AlarmRequest::new(now_ms() + 10_000).with_id(1)));
        oracle.revoke(PermissionType::Alarm);
        assert!(!scheduler.schedule_alarm(&AlarmRequest::new(now_ms() + 10_000).with_id(2)));
    }

    #[tokio::test]
    async fn batch_scheduling_is_independent_per_event() {
        let (scheduler, _driver) = scheduler(DeviceOracle::unrestricted(profile()));
        let results = scheduler
            .schedule_multiple_alarms("MEETING", &[(1, now_ms() + 10_000), (2, now_ms() + 20_000)]);
        assert_eq!(results, vec![true, true]);
    }

    #[tokio::test]
    async fn schedule_alarms_returns_scheduled_ids() {
        let (scheduler, _driver) = scheduler(DeviceOracle::unrestricted(profile()));
        let ids = scheduler.schedule_alarms(&[(7, now_ms() + 10_000), (8, now_ms() + 20_000)]);
        assert_eq!(ids, vec![7, 8]);
    }

    #[tokio::test]
    async fn cancel_unknown_id_is_a_noop() {
        let (scheduler, _driver) = scheduler(DeviceOracle::unrestricted(profile()));
        scheduler.cancel_alarm(404);
    }

    #[tokio::test]
    async fn cancel_removes_pending_alarm() {
        let (scheduler, driver) = scheduler(DeviceOracle::unrestricted(profile()));
        assert!(scheduler.schedule_alarm(&AlarmRequest::new(now_ms() + 10_000).with_id(9)));
        scheduler.cancel_alarm(9);
        assert!(!driver.is_pending(9));
    }

    #[test]
    fn default_id_derives_from_current_time() {
        let before = (now_ms() % i32::MAX as i64) as i32;
        let request = AlarmRequest::new(0);
        let after = (now_ms() % i32::MAX as i64) as i32;
        assert!(request.alarm_id >= before && request.alarm_id <= after);
    }
}
