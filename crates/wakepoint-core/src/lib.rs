//! # Wakepoint Core Library
//!
//! Reliable exact-time alarm delivery: schedule a wall-clock trigger that
//! surfaces a host-supplied screen at (or very near) the scheduled instant,
//! surviving process death, doze power management and a locked device.
//!
//! The library owns the delivery chain, not the screen content:
//!
//! - **Scheduler**: exact-alarm schedule/cancel/batch contract against an
//!   [`platform::AlarmDriver`], failing closed without the live capability
//! - **Receiver + delivery unit**: broadcast-triggered wake-and-dispatch —
//!   foreground notification first, bounded wake-lock second, data fetch
//!   and surface launch last, with the wake-lock released on every exit
//!   path
//! - **Permission machinery**: a capability oracle with per-OEM strategies
//!   and an ordered request flow that walks settings round-trips and
//!   manual guidance dialogs
//! - **Durable store**: a SQLite mirror of the configuration subset needed
//!   to deliver after a cold start
//!
//! Hosts on a real platform implement the seams in [`platform`]; the
//! in-process implementations in [`platform::local`] back tests and demo
//! hosts.

pub mod config;
pub mod delivery;
pub mod error;
pub mod message;
pub mod permission;
pub mod platform;
pub mod provider;
pub mod receiver;
pub mod runtime;
pub mod scheduler;
pub mod store;
pub mod surface;

pub use config::{RuntimeConfig, WakeOptions, CHANNEL_ID};
pub use delivery::{deliver, DeliveryEnv, DeliveryOutcome, DeliveryStep};
pub use error::{ConfigError, CoreError, DriverError, StoreError};
pub use message::{AlarmMessage, AlarmPayload, LaunchRequest, ALARM_ACTION};
pub use permission::{
    required_permissions, DeviceOracle, DeviceProfile, FlowDirective, FlowEnv, FlowPhase, Oem,
    PermissionFlow, PermissionOracle, PermissionType, SettingsIntent,
};
pub use platform::{AlarmDriver, AlarmSink, Platform, WakeGuard, WakeSource};
pub use provider::{AlarmDataProvider, NullProvider};
pub use receiver::{AlarmReceiver, Disposition};
pub use runtime::Wakepoint;
pub use scheduler::{AlarmRequest, AlarmScheduler};
pub use store::{DurableConfig, PreferenceStore};
pub use surface::{AlarmSurface, SurfaceRegistry, WindowFlags, DEFAULT_SURFACE};
