pub mod alarm;
pub mod config;
pub mod demo;
pub mod permissions;

use std::sync::Arc;

use wakepoint_core::platform::local::{
    HeadlessHost, LocalDriver, LocalWakeSource, LogNotifier, StaticDeviceState,
};
use wakepoint_core::{DeviceOracle, DeviceProfile, Oem, Platform};

pub(crate) const CLI_PACKAGE: &str = "dev.wakepoint.cli";

/// In-process platform with every capability granted, used by the commands
/// that exercise the full scheduling and delivery path.
pub(crate) fn local_platform() -> (Platform, Arc<LocalDriver>, Arc<HeadlessHost>) {
    let driver = Arc::new(LocalDriver::new());
    let host = Arc::new(HeadlessHost::new());
    let platform = Platform {
        driver: driver.clone(),
        wake: Arc::new(LocalWakeSource::new()),
        notifier: Arc::new(LogNotifier::new()),
        device: Arc::new(StaticDeviceState::new(false, false)),
        host: host.clone(),
        oracle: Arc::new(DeviceOracle::unrestricted(DeviceProfile::new(
            34,
            Oem::Generic,
            CLI_PACKAGE,
        ))),
    };
    (platform, driver, host)
}

pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
