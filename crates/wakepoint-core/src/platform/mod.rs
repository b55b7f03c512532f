//! Platform service seams.
//!
//! Every OS-mediated capability the pipeline touches sits behind one of
//! these traits, passed explicitly to the components that need it. Hosts on
//! a real platform implement them against the actual system services; tests
//! and demo hosts use the in-process implementations in [`local`].

pub mod local;

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::DriverError;
use crate::message::{AlarmMessage, LaunchRequest};
use crate::permission::PermissionOracle;
use crate::surface::{AlarmSurface, WindowFlags};

/// Receives fired alarms from a driver. Implemented by the delivery
/// receiver.
pub trait AlarmSink: Send + Sync {
    fn alarm_fired(&self, message: AlarmMessage);
}

/// The exact-alarm service.
///
/// The driver is the sole source of truth for which alarms are pending; the
/// library keeps no pending-alarm record of its own.
pub trait AlarmDriver: Send + Sync {
    /// Register `message` for delivery at `trigger_at_ms` (epoch millis),
    /// waking the device even if idle. `alarm_id` is the de-duplication
    /// key: a later registration under the same id replaces the earlier
    /// one (update semantics, not additive).
    fn register(
        &self,
        alarm_id: i32,
        trigger_at_ms: i64,
        message: AlarmMessage,
    ) -> Result<(), DriverError>;

    /// Revoke a pending registration. Returns `false` when nothing was
    /// pending under `alarm_id`; that is a no-op, not an error.
    fn cancel(&self, alarm_id: i32) -> bool;

    /// Whether an alarm is currently pending under `alarm_id`.
    fn is_pending(&self, alarm_id: i32) -> bool;
}

/// Wake-lock provider.
pub trait WakeSource: Send + Sync {
    /// Acquire a wake-lock with a hard ceiling. The ceiling is a safety
    /// bound, not the expected duration; normal completion drops the guard
    /// far earlier.
    fn acquire(&self, tag: &str, ceiling: Duration) -> WakeGuard;
}

/// Scoped wake-lock. Released exactly once, on drop, on every exit path
/// including faults.
pub struct WakeGuard {
    tag: String,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl WakeGuard {
    pub fn new(tag: impl Into<String>, on_release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            tag: tag.into(),
            on_release: Some(Box::new(on_release)),
        }
    }
}

impl Drop for WakeGuard {
    fn drop(&mut self) {
        if let Some(release) = self.on_release.take() {
            release();
            debug!(tag = %self.tag, "wake-lock released");
        }
    }
}

/// Posts the transient foreground notification.
pub trait Notifier: Send + Sync {
    /// Create or update the notification channel.
    fn ensure_channel(&self, channel_id: &str, channel_name: &str);
    /// Post an ongoing, non-dismissible notification.
    fn post_ongoing(&self, notification_id: u32, title: &str, message: &str);
    /// Remove a previously posted notification.
    fn clear(&self, notification_id: u32);
}

/// Interactive-state queries backing the launch gating booleans.
pub trait DeviceState: Send + Sync {
    /// Whether the device is currently interactive (screen on, unlocked or
    /// in use).
    fn is_interactive(&self) -> bool;
    /// Whether the host app is currently in the foreground.
    fn host_in_foreground(&self) -> bool;
}

/// Presents an alarm surface.
pub trait SurfaceHost: Send + Sync {
    /// Present `surface` with `flags` applied before its content renders.
    /// Clear-top semantics: a stale presented instance is replaced, never
    /// stacked.
    fn present(&self, surface: Box<dyn AlarmSurface>, flags: WindowFlags, launch: LaunchRequest);
}

/// The full set of platform handles the runtime wires into the pipeline.
#[derive(Clone)]
pub struct Platform {
    pub driver: Arc<dyn AlarmDriver>,
    pub wake: Arc<dyn WakeSource>,
    pub notifier: Arc<dyn Notifier>,
    pub device: Arc<dyn DeviceState>,
    pub host: Arc<dyn SurfaceHost>,
    pub oracle: Arc<dyn PermissionOracle>,
}
