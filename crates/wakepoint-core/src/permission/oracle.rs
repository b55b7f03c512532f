//! Capability queries and settings-intent construction.
//!
//! One query predicate and (for settings-mediated permissions) one intent
//! target per [`PermissionType`]. Pre-gating platform generations report
//! granted unconditionally: absence of a gate means no restriction.

use std::collections::HashSet;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Capability grants needed for reliable alarm delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionType {
    /// Schedule exact alarms (gated from API 31).
    Alarm,
    /// Draw overlays on top of other applications.
    Overlay,
    /// Exemption from battery optimizations.
    BatteryOptimization,
    /// Show on the lock screen; OEM-specific, best-effort.
    LockScreen,
    /// Post notifications (gated from API 33).
    Notification,
    /// OEM background pop-up guidance; manual, acknowledged in-app only.
    OverlayWhileBackground,
}

impl PermissionType {
    /// Manual permissions cannot be granted via a settings intent; the
    /// caller shows in-app guidance and records acknowledgment instead.
    pub fn is_manual(self) -> bool {
        matches!(self, PermissionType::OverlayWhileBackground)
    }

    /// Stable name, used as the durable acknowledgment key.
    pub fn name(self) -> &'static str {
        match self {
            PermissionType::Alarm => "ALARM",
            PermissionType::Overlay => "OVERLAY",
            PermissionType::BatteryOptimization => "BATTERY_OPTIMIZATION",
            PermissionType::LockScreen => "LOCK_SCREEN",
            PermissionType::Notification => "NOTIFICATION",
            PermissionType::OverlayWhileBackground => "OVERLAY_WHILE_BACKGROUND",
        }
    }
}

/// Descriptor of the system-settings screen to open for a permission,
/// scoped to the host's own package identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsIntent {
    pub action: String,
    pub package: String,
}

/// Queries whether a capability currently holds, and builds the settings
/// request that lets the user grant it.
///
/// Implementations must be side-effect-free: the flow state machine calls
/// `is_granted` repeatedly and concurrently.
pub trait PermissionOracle: Send + Sync {
    /// Whether the capability currently holds. Manual-type permissions are
    /// not queryable from the platform; oracles report them as not granted
    /// and the flow consults the durable acknowledgment flag instead.
    fn is_granted(&self, permission: PermissionType) -> bool;

    /// Settings screen to open for this permission, or `None` when no
    /// system screen exists (manual types, pre-gating generations,
    /// unresolvable OEM screens).
    fn settings_intent(&self, permission: PermissionType) -> Option<SettingsIntent>;
}

/// Device vendor variants that change permission behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Oem {
    Generic,
    Miui,
}

/// The platform/OEM facts the per-variant strategies branch on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub api_level: u32,
    pub oem: Oem,
    /// Host package identity, embedded in settings intents.
    pub package: String,
}

impl DeviceProfile {
    pub fn new(api_level: u32, oem: Oem, package: impl Into<String>) -> Self {
        Self {
            api_level,
            oem,
            package: package.into(),
        }
    }
}

/// Probe for the OEM lock-screen capability. The underlying mechanism is a
/// hidden API that differs or is absent across devices, so the probe is
/// allowed to fail; any failure degrades to "not granted".
pub type LockScreenProbe = Box<dyn Fn(&DeviceProfile) -> Result<bool, String> + Send + Sync>;

/// Oracle over a [`DeviceProfile`] plus a mutable grant table.
///
/// The grant table stands in for the platform's live permission state; on a
/// real platform the host supplies its own [`PermissionOracle`] backed by
/// actual system queries.
pub struct DeviceOracle {
    profile: DeviceProfile,
    granted: Mutex<HashSet<PermissionType>>,
    lock_screen_probe: LockScreenProbe,
}

impl DeviceOracle {
    pub fn new(profile: DeviceProfile) -> Self {
        Self {
            profile,
            granted: Mutex::new(HashSet::new()),
            lock_screen_probe: Box::new(|_| Err("lock-screen probe unavailable".into())),
        }
    }

    /// Oracle that reports every queryable capability as granted.
    pub fn unrestricted(profile: DeviceProfile) -> Self {
        let oracle = Self::new(profile);
        {
            let mut granted = oracle.granted.lock().unwrap_or_else(|e| e.into_inner());
            granted.extend([
                PermissionType::Alarm,
                PermissionType::Overlay,
                PermissionType::BatteryOptimization,
                PermissionType::Notification,
            ]);
        }
        oracle
    }

    /// Replace the lock-screen probe. Probe errors degrade to not-granted.
    pub fn with_lock_screen_probe(mut self, probe: LockScreenProbe) -> Self {
        self.lock_screen_probe = probe;
        self
    }

    /// Mark a capability granted, as if the user flipped it in settings.
    pub fn grant(&self, permission: PermissionType) {
        let mut granted = self.granted.lock().unwrap_or_else(|e| e.into_inner());
        granted.insert(permission);
    }

    pub fn revoke(&self, permission: PermissionType) {
        let mut granted = self.granted.lock().unwrap_or_else(|e| e.into_inner());
        granted.remove(&permission);
    }

    fn holds(&self, permission: PermissionType) -> bool {
        let granted = self.granted.lock().unwrap_or_else(|e| e.into_inner());
        granted.contains(&permission)
    }
}

impl PermissionOracle for DeviceOracle {
    fn is_granted(&self, permission: PermissionType) -> bool {
        match permission {
            // Exact alarms existed ungated before API 31.
            PermissionType::Alarm => self.profile.api_level < 31 || self.holds(permission),
            PermissionType::Overlay => self.holds(permission),
            PermissionType::BatteryOptimization => self.holds(permission),
            // Notifications needed no explicit grant before API 33.
            PermissionType::Notification => self.profile.api_level < 33 || self.holds(permission),
            PermissionType::LockScreen => match (self.lock_screen_probe)(&self.profile) {
                Ok(enabled) => enabled,
                Err(reason) => {
                    debug!(%reason, "lock-screen probe failed, treating as not granted");
                    false
                }
            },
            PermissionType::OverlayWhileBackground => false,
        }
    }

    fn settings_intent(&self, permission: PermissionType) -> Option<SettingsIntent> {
        let package = self.profile.package.clone();
        match permission {
            PermissionType::Alarm => (self.profile.api_level >= 31).then(|| SettingsIntent {
                action: "settings.REQUEST_SCHEDULE_EXACT_ALARM".into(),
                package,
            }),
            PermissionType::Overlay => Some(SettingsIntent {
                action: "settings.MANAGE_OVERLAY_PERMISSION".into(),
                package,
            }),
            PermissionType::BatteryOptimization => Some(SettingsIntent {
                action: "settings.REQUEST_IGNORE_BATTERY_OPTIMIZATIONS".into(),
                package,
            }),
            // Only the MIUI permission editor exposes this screen.
            PermissionType::LockScreen => (self.profile.oem == Oem::Miui).then(|| SettingsIntent {
                action: "miui.APP_PERM_EDITOR".into(),
                package,
            }),
            PermissionType::Notification => (self.profile.api_level >= 33).then(|| SettingsIntent {
                action: "settings.APP_NOTIFICATION_SETTINGS".into(),
                package,
            }),
            PermissionType::OverlayWhileBackground => None,
        }
    }
}
