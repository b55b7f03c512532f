//! Delivery execution context.
//!
//! The foreground unit that turns a fired alarm into a visible surface. The
//! pipeline order is mandatory: the notification announces foreground status
//! before any other work, the wake-lock protects everything after it, and
//! the launch comes last. Each step is recorded in the returned outcome so
//! callers (and tests) can assert postconditions instead of relying on call
//! order inside one function body.
//!
//! Nothing here is retried: one fired alarm gets one best-effort delivery.
//! Faults during data-fetch are caught and degrade to an empty payload; the
//! wake-lock is a scoped guard released exactly once on every exit path.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::RuntimeConfig;
use crate::message::{AlarmMessage, AlarmPayload, LaunchRequest};
use crate::platform::Platform;
use crate::store::PreferenceStore;
use crate::surface::{SurfaceRegistry, WindowFlags, DEFAULT_SURFACE};

/// Notification id of the transient foreground notification.
pub const NOTIFICATION_ID: u32 = 1001;

/// Hard ceiling on the wake-lock. A safety bound, not the expected
/// duration; normal completion releases far earlier.
pub const WAKE_LOCK_CEILING: Duration = Duration::from_secs(60);

/// Bound on the host data-provider call. A timed-out fetch degrades to an
/// empty payload; it never aborts the launch.
pub const DATA_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

const WAKE_TAG: &str = "wakepoint::AlarmWakeLock";

/// Pipeline steps, in the order they are allowed to occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStep {
    NotificationPosted,
    WakeAcquired,
    /// Payload obtained (possibly empty after a fault or timeout).
    DataFetched,
    SurfaceLaunched,
    /// Launch suppressed by a gating boolean; no side effects past here.
    LaunchSuppressed,
    /// Message action did not match; terminated without side effects.
    Ignored,
    NotificationCleared,
}

/// What one delivery attempt did.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub steps: Vec<DeliveryStep>,
    pub launched: bool,
}

/// Everything a delivery needs, passed explicitly.
#[derive(Clone)]
pub struct DeliveryEnv {
    pub config: Arc<RuntimeConfig>,
    pub store: Arc<PreferenceStore>,
    pub registry: Arc<SurfaceRegistry>,
    pub platform: Platform,
}

/// Run one delivery to completion.
pub async fn deliver(env: &DeliveryEnv, message: AlarmMessage) -> DeliveryOutcome {
    let mut steps = Vec::new();
    let mut launched = false;

    // 1. Announce foreground status before any further work.
    env.platform.notifier.post_ongoing(
        NOTIFICATION_ID,
        &env.config.notification_title,
        &env.config.notification_message,
    );
    steps.push(DeliveryStep::NotificationPosted);

    // 2. Wake-lock for the rest of the unit. Released on drop, on every
    //    exit path.
    let _wake = env.platform.wake.acquire(WAKE_TAG, WAKE_LOCK_CEILING);
    steps.push(DeliveryStep::WakeAcquired);

    // 3. Branch on the action.
    if message.is_alarm() {
        if suppressed_by_gating(env) {
            steps.push(DeliveryStep::LaunchSuppressed);
        } else {
            let payload = fetch_payload(env, message.alarm_id, message.alarm_type.clone()).await;
            steps.push(DeliveryStep::DataFetched);

            let surface_name = resolve_surface_name(env);
            let surface = env.registry.resolve(&surface_name);
            let launch = LaunchRequest {
                alarm_id: message.alarm_id,
                alarm_type: message.alarm_type.clone(),
                payload,
            };
            env.platform
                .host
                .present(surface, WindowFlags::alarm(), launch);
            info!(alarm_id = message.alarm_id, surface = %surface_name, "alarm surface launched");
            steps.push(DeliveryStep::SurfaceLaunched);
            launched = true;
        }
    } else {
        warn!(action = %message.action, "received message with unknown action");
        steps.push(DeliveryStep::Ignored);
    }

    // 4. Tear down the transient notification; the wake guard drops when
    //    this frame unwinds.
    env.platform.notifier.clear(NOTIFICATION_ID);
    steps.push(DeliveryStep::NotificationCleared);

    DeliveryOutcome { steps, launched }
}

fn suppressed_by_gating(env: &DeliveryEnv) -> bool {
    if !env.config.show_when_device_active && env.platform.device.is_interactive() {
        info!("device is interactive and show_when_device_active is off, suppressing launch");
        return true;
    }
    if !env.config.show_when_app_active && env.platform.device.host_in_foreground() {
        info!("host is foregrounded and show_when_app_active is off, suppressing launch");
        return true;
    }
    false
}

/// Call the host data provider under the delivery timeout. Provider panics
/// and timeouts are caught here and degrade to an empty payload; a delivery
/// failure must never take the host process down.
async fn fetch_payload(env: &DeliveryEnv, alarm_id: i32, alarm_type: String) -> AlarmPayload {
    let provider = Arc::clone(&env.config.provider);
    let fetch = tokio::spawn(async move { provider.provide_data(alarm_id, &alarm_type).await });
    match tokio::time::timeout(DATA_PROVIDER_TIMEOUT, fetch).await {
        Ok(Ok(payload)) => payload,
        Ok(Err(fault)) => {
            error!(alarm_id, %fault, "data provider fault, continuing with empty payload");
            AlarmPayload::new()
        }
        Err(_) => {
            error!(
                alarm_id,
                timeout_ms = DATA_PROVIDER_TIMEOUT.as_millis() as u64,
                "data provider timed out, continuing with empty payload"
            );
            AlarmPayload::new()
        }
    }
}

/// Resolution order: in-memory config, else the durable mirror, else the
/// library default. Unresolvable stored names are logged and skipped, never
/// fatal.
fn resolve_surface_name(env: &DeliveryEnv) -> String {
    if env.registry.contains(&env.config.surface_class) {
        return env.config.surface_class.clone();
    }
    match env.store.load_config() {
        Ok(Some(durable)) if env.registry.contains(&durable.surface_class) => {
            debug!(surface = %durable.surface_class, "surface resolved from durable mirror");
            durable.surface_class
        }
        Ok(_) => {
            error!(
                surface = %env.config.surface_class,
                "configured surface unresolvable, using default"
            );
            DEFAULT_SURFACE.to_string()
        }
        Err(e) => {
            error!(error = %e, "durable mirror unreadable, using default surface");
            DEFAULT_SURFACE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WakeOptions;
    use crate::message::ALARM_ACTION;
    use crate::permission::{DeviceOracle, DeviceProfile, Oem};
    use crate::platform::local::{
        HeadlessHost, LocalDriver, LocalWakeSource, LogNotifier, StaticDeviceState,
    };

    fn env_with(options: WakeOptions, interactive: bool, foreground: bool) -> DeliveryEnv {
        let (config, _) = options.into_parts();
        DeliveryEnv {
            config: Arc::new(config),
            store: Arc::new(PreferenceStore::open_in_memory().unwrap()),
            registry: Arc::new(SurfaceRegistry::new()),
            platform: Platform {
                driver: Arc::new(LocalDriver::new()),
                wake: Arc::new(LocalWakeSource::new()),
                notifier: Arc::new(LogNotifier::new()),
                device: Arc::new(StaticDeviceState::new(interactive, foreground)),
                host: Arc::new(HeadlessHost::new()),
                oracle: Arc::new(DeviceOracle::new(DeviceProfile::new(
                    34,
                    Oem::Generic,
                    "com.example",
                ))),
            },
        }
    }

    #[tokio::test]
    async fn pipeline_order_notification_wake_launch() {
        let env = env_with(WakeOptions::new(), false, false);
        let outcome = deliver(&env, AlarmMessage::alarm(1, "")).await;
        assert_eq!(
            outcome.steps,
            vec![
                DeliveryStep::NotificationPosted,
                DeliveryStep::WakeAcquired,
                DeliveryStep::DataFetched,
                DeliveryStep::SurfaceLaunched,
                DeliveryStep::NotificationCleared,
            ]
        );
        assert!(outcome.launched);
    }

    #[tokio::test]
    async fn unknown_action_terminates_without_side_effects() {
        let env = env_with(WakeOptions::new(), false, false);
        let message = AlarmMessage {
            action: "not.the.alarm.ACTION".into(),
            alarm_id: 1,
            alarm_type: String::new(),
        };
        let outcome = deliver(&env, message).await;
        assert!(!outcome.launched);
        assert!(outcome.steps.contains(&DeliveryStep::Ignored));
        assert!(!outcome.steps.contains(&DeliveryStep::SurfaceLaunched));
    }

    #[tokio::test]
    async fn interactive_device_suppresses_launch_when_configured() {
        let env = env_with(
            WakeOptions::new().show_when_device_active(false),
            true,
            false,
        );
        let outcome = deliver(&env, AlarmMessage::alarm(1, "")).await;
        assert!(!outcome.launched);
        assert!(outcome.steps.contains(&DeliveryStep::LaunchSuppressed));
    }

    #[tokio::test]
    async fn foregrounded_host_suppresses_launch_when_configured() {
        let env = env_with(WakeOptions::new().show_when_app_active(false), false, true);
        let outcome = deliver(&env, AlarmMessage::alarm(1, "")).await;
        assert!(!outcome.launched);
        assert!(outcome.steps.contains(&DeliveryStep::LaunchSuppressed));
    }

    #[tokio::test]
    async fn gating_defaults_allow_launch_on_active_device() {
        let env = env_with(WakeOptions::new(), true, true);
        let outcome = deliver(&env, AlarmMessage::alarm(1, "")).await;
        assert!(outcome.launched);
    }

    #[test]
    fn action_constant_matches_wire_contract() {
        assert_eq!(AlarmMessage::alarm(1, "").action, ALARM_ACTION);
    }
}
