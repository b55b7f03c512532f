//! In-process platform implementations.
//!
//! `LocalDriver` arms one tokio timer per pending alarm and feeds fired
//! alarms to a connected [`AlarmSink`], with the same replace-on-same-id and
//! cancel semantics the real alarm service has. The rest are small
//! observable stand-ins used by the demo host and the integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::{info, warn};

use super::{AlarmDriver, AlarmSink, DeviceState, Notifier, SurfaceHost, WakeGuard, WakeSource};
use crate::error::DriverError;
use crate::message::{AlarmMessage, LaunchRequest};
use crate::surface::{AlarmSurface, WindowFlags};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

struct PendingAlarm {
    seq: u64,
    abort: AbortHandle,
}

/// Tokio-timer alarm driver.
pub struct LocalDriver {
    sink: Arc<Mutex<Option<Arc<dyn AlarmSink>>>>,
    pending: Arc<Mutex<HashMap<i32, PendingAlarm>>>,
    seq: AtomicU64,
}

impl LocalDriver {
    pub fn new() -> Self {
        Self {
            sink: Arc::new(Mutex::new(None)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            seq: AtomicU64::new(0),
        }
    }

    /// Connect the sink that fired alarms are delivered to. Alarms firing
    /// before a sink is connected are dropped with a warning.
    pub fn connect(&self, sink: Arc<dyn AlarmSink>) {
        let mut slot = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(sink);
    }

    pub fn pending_count(&self) -> usize {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.len()
    }
}

impl Default for LocalDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmDriver for LocalDriver {
    fn register(
        &self,
        alarm_id: i32,
        trigger_at_ms: i64,
        message: AlarmMessage,
    ) -> Result<(), DriverError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| DriverError::NoRuntime(e.to_string()))?;

        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let delay = Duration::from_millis(trigger_at_ms.saturating_sub(now_ms()).max(0) as u64);
        let pending = Arc::clone(&self.pending);
        let sink_slot = Arc::clone(&self.sink);

        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // Only the registration that is still current may fire; a
            // replaced or canceled one was aborted, but guard against the
            // race where the abort lands after the sleep.
            let current = {
                let mut map = pending.lock().unwrap_or_else(|e| e.into_inner());
                match map.get(&alarm_id) {
                    Some(entry) if entry.seq == seq => {
                        map.remove(&alarm_id);
                        true
                    }
                    _ => false,
                }
            };
            if !current {
                return;
            }
            let sink = {
                let slot = sink_slot.lock().unwrap_or_else(|e| e.into_inner());
                slot.clone()
            };
            match sink {
                Some(sink) => sink.alarm_fired(message),
                None => warn!(alarm_id, "alarm fired with no sink connected, dropped"),
            }
        });

        let mut map = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = map.insert(
            alarm_id,
            PendingAlarm {
                seq,
                abort: task.abort_handle(),
            },
        ) {
            // Update semantics: same id replaces the earlier registration.
            previous.abort.abort();
        }
        Ok(())
    }

    fn cancel(&self, alarm_id: i32) -> bool {
        let mut map = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        match map.remove(&alarm_id) {
            Some(entry) => {
                entry.abort.abort();
                true
            }
            None => false,
        }
    }

    fn is_pending(&self, alarm_id: i32) -> bool {
        let map = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        map.contains_key(&alarm_id)
    }
}

/// Wake source that counts acquisitions and releases.
#[derive(Default)]
pub struct LocalWakeSource {
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl LocalWakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquired_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Acquisitions currently unreleased. Zero after every delivery.
    pub fn held_count(&self) -> usize {
        self.acquired_count().saturating_sub(self.released_count())
    }
}

impl WakeSource for LocalWakeSource {
    fn acquire(&self, tag: &str, ceiling: Duration) -> WakeGuard {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        info!(tag, ceiling_ms = ceiling.as_millis() as u64, "wake-lock acquired");
        let released = Arc::clone(&self.released);
        WakeGuard::new(tag, move || {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// Notifier that logs and keeps the last posted notification observable.
#[derive(Default)]
pub struct LogNotifier {
    channels: AtomicUsize,
    posted: AtomicUsize,
    cleared: AtomicUsize,
    last: Mutex<Option<(String, String)>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.load(Ordering::SeqCst)
    }

    pub fn posted_count(&self) -> usize {
        self.posted.load(Ordering::SeqCst)
    }

    pub fn cleared_count(&self) -> usize {
        self.cleared.load(Ordering::SeqCst)
    }

    pub fn last_posted(&self) -> Option<(String, String)> {
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.clone()
    }
}

impl Notifier for LogNotifier {
    fn ensure_channel(&self, channel_id: &str, channel_name: &str) {
        self.channels.fetch_add(1, Ordering::SeqCst);
        info!(channel_id, channel_name, "notification channel ensured");
    }

    fn post_ongoing(&self, notification_id: u32, title: &str, message: &str) {
        self.posted.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some((title.to_string(), message.to_string()));
        info!(notification_id, title, message, "ongoing notification posted");
    }

    fn clear(&self, notification_id: u32) {
        self.cleared.fetch_add(1, Ordering::SeqCst);
        info!(notification_id, "notification cleared");
    }
}

/// Settable device state.
pub struct StaticDeviceState {
    interactive: AtomicBool,
    foreground: AtomicBool,
}

impl StaticDeviceState {
    pub fn new(interactive: bool, foreground: bool) -> Self {
        Self {
            interactive: AtomicBool::new(interactive),
            foreground: AtomicBool::new(foreground),
        }
    }

    pub fn set_interactive(&self, interactive: bool) {
        self.interactive.store(interactive, Ordering::SeqCst);
    }

    pub fn set_foreground(&self, foreground: bool) {
        self.foreground.store(foreground, Ordering::SeqCst);
    }
}

impl DeviceState for StaticDeviceState {
    fn is_interactive(&self) -> bool {
        self.interactive.load(Ordering::SeqCst)
    }

    fn host_in_foreground(&self) -> bool {
        self.foreground.load(Ordering::SeqCst)
    }
}

/// Surface host that renders in place and records the last presentation.
///
/// Clear-top semantics: presenting replaces whatever was presented before.
#[derive(Default)]
pub struct HeadlessHost {
    presented: Mutex<Option<(WindowFlags, LaunchRequest)>>,
    present_count: AtomicUsize,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn present_count(&self) -> usize {
        self.present_count.load(Ordering::SeqCst)
    }

    /// The currently presented launch, if any. At most one at a time.
    pub fn presented(&self) -> Option<(WindowFlags, LaunchRequest)> {
        let presented = self.presented.lock().unwrap_or_else(|e| e.into_inner());
        presented.clone()
    }
}

impl SurfaceHost for HeadlessHost {
    fn present(&self, surface: Box<dyn AlarmSurface>, flags: WindowFlags, launch: LaunchRequest) {
        self.present_count.fetch_add(1, Ordering::SeqCst);
        surface.render(&launch);
        let mut presented = self.presented.lock().unwrap_or_else(|e| e.into_inner());
        *presented = Some((flags, launch));
    }
}
