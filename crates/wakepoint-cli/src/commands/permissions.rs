use clap::{Subcommand, ValueEnum};
use wakepoint_core::{
    required_permissions, DeviceOracle, DeviceProfile, FlowDirective, FlowEnv, Oem,
    PermissionFlow, PermissionOracle, PermissionType, PreferenceStore,
};

use super::CLI_PACKAGE;

#[derive(Clone, Copy, ValueEnum)]
pub enum OemArg {
    Generic,
    Miui,
}

impl From<OemArg> for Oem {
    fn from(arg: OemArg) -> Self {
        match arg {
            OemArg::Generic => Oem::Generic,
            OemArg::Miui => Oem::Miui,
        }
    }
}

#[derive(Subcommand)]
pub enum PermissionsAction {
    /// Print the grant status of every required permission
    Status {
        #[arg(long, default_value = "34")]
        api_level: u32,
        #[arg(long, value_enum, default_value = "generic")]
        oem: OemArg,
        /// Permissions the simulated device has already granted, by name
        /// (e.g. ALARM, OVERLAY)
        #[arg(long = "grant")]
        granted: Vec<String>,
    },
    /// Walk the ordered request flow, simulating a user who grants the
    /// named permissions when their settings screen opens
    Flow {
        #[arg(long, default_value = "34")]
        api_level: u32,
        #[arg(long, value_enum, default_value = "generic")]
        oem: OemArg,
        #[arg(long = "grant")]
        granted: Vec<String>,
    },
}

fn parse_permission(name: &str) -> Result<PermissionType, String> {
    let all = [
        PermissionType::Alarm,
        PermissionType::Overlay,
        PermissionType::BatteryOptimization,
        PermissionType::LockScreen,
        PermissionType::Notification,
        PermissionType::OverlayWhileBackground,
    ];
    all.into_iter()
        .find(|p| p.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| format!("unknown permission: {name}"))
}

fn oracle_with(
    api_level: u32,
    oem: Oem,
    granted: &[String],
) -> Result<DeviceOracle, Box<dyn std::error::Error>> {
    let oracle = DeviceOracle::new(DeviceProfile::new(api_level, oem, CLI_PACKAGE));
    for name in granted {
        oracle.grant(parse_permission(name)?);
    }
    Ok(oracle)
}

pub fn run(action: PermissionsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PermissionsAction::Status {
            api_level,
            oem,
            granted,
        } => status(api_level, oem.into(), &granted),
        PermissionsAction::Flow {
            api_level,
            oem,
            granted,
        } => flow(api_level, oem.into(), &granted),
    }
}

fn status(api_level: u32, oem: Oem, granted: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let oracle = oracle_with(api_level, oem, granted)?;
    let store = PreferenceStore::open_default()?;
    let env = FlowEnv::new(&oracle, &store);

    let mut report = serde_json::Map::new();
    for permission in required_permissions(oem) {
        let held = if permission.is_manual() {
            store.manual_ack(permission)?
        } else {
            oracle.is_granted(permission)
        };
        report.insert(permission.name().to_string(), held.into());
    }
    let flow = PermissionFlow::new(required_permissions(oem));
    report.insert(
        "all_required_granted".into(),
        flow.all_required_granted(&env).into(),
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn flow(api_level: u32, oem: Oem, granted: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let user_grants: Vec<PermissionType> = granted
        .iter()
        .map(|name| parse_permission(name))
        .collect::<Result<_, _>>()?;
    let oracle = DeviceOracle::new(DeviceProfile::new(api_level, oem, CLI_PACKAGE));
    let store = PreferenceStore::open_default()?;
    let env = FlowEnv::new(&oracle, &store);

    let mut flow = PermissionFlow::new(required_permissions(oem));
    let mut directive = flow.request_next(&env);
    loop {
        match directive {
            FlowDirective::Completed => {
                println!("flow complete");
                break;
            }
            FlowDirective::OpenSettings(intent) => {
                println!("open settings: {} ({})", intent.action, intent.package);
                if let Some(current) = flow.current() {
                    if user_grants.contains(&current) {
                        println!("  user grants {}", current.name());
                        oracle.grant(current);
                    } else {
                        println!("  user returns without granting {}", current.name());
                    }
                }
                directive = flow.on_settings_result(&env);
            }
            FlowDirective::ShowGuidance(permission) => {
                println!("show guidance dialog: {}", permission.name());
                println!("  user acknowledges");
                directive = flow.acknowledge_guidance(&env);
            }
            FlowDirective::ShowRationale(permission) => {
                println!("show rationale: {} still denied, stopping", permission.name());
                break;
            }
        }
    }
    println!("all required granted: {}", flow.all_required_granted(&env));
    Ok(())
}
