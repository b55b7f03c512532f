//! Permission machinery: capability oracle and request flow.

pub mod flow;
pub mod oracle;

pub use flow::{FlowDirective, FlowEnv, FlowPhase, PermissionFlow};
pub use oracle::{
    DeviceOracle, DeviceProfile, Oem, PermissionOracle, PermissionType, SettingsIntent,
};

/// The default requirement list: platform permissions first, OEM-conditional
/// entries appended last. Hosts on MIUI-like devices get the lock-screen and
/// background-overlay entries; everyone else gets the base four.
pub fn required_permissions(oem: Oem) -> Vec<PermissionType> {
    let mut required = vec![
        PermissionType::Alarm,
        PermissionType::Overlay,
        PermissionType::BatteryOptimization,
        PermissionType::Notification,
    ];
    if oem == Oem::Miui {
        required.push(PermissionType::LockScreen);
        required.push(PermissionType::OverlayWhileBackground);
    }
    required
}
