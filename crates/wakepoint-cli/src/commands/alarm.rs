use std::time::Duration;

use clap::Subcommand;
use wakepoint_core::{AlarmRequest, PreferenceStore, SurfaceRegistry, WakeOptions, Wakepoint};

use super::{local_platform, now_ms};

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Schedule an alarm and wait in the foreground until it delivers
    Schedule {
        /// Alarm id (defaults to a time-derived id)
        #[arg(long)]
        id: Option<i32>,
        /// Delay until the trigger, in milliseconds
        #[arg(long, default_value = "3000")]
        in_ms: u64,
        /// Host-defined alarm type, forwarded untouched to the surface
        #[arg(long, default_value = "")]
        alarm_type: String,
    },
    /// Remove an alarm id from the durable ledger
    Cancel {
        #[arg(long)]
        id: i32,
    },
    /// List alarm ids recorded in the durable ledger
    List,
    /// Clear the durable ledger
    Clear,
}

pub fn run(action: AlarmAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AlarmAction::Schedule {
            id,
            in_ms,
            alarm_type,
        } => schedule(id, in_ms, alarm_type),
        AlarmAction::Cancel { id } => {
            let store = PreferenceStore::open_default()?;
            store.remove_alarm_id(id)?;
            println!("{}", serde_json::json!({ "cancelled": id }));
            Ok(())
        }
        AlarmAction::List => {
            let store = PreferenceStore::open_default()?;
            println!("{}", serde_json::to_string_pretty(&store.alarm_ids()?)?);
            Ok(())
        }
        AlarmAction::Clear => {
            let store = PreferenceStore::open_default()?;
            store.clear_alarm_ids()?;
            println!("{}", serde_json::json!({ "cleared": true }));
            Ok(())
        }
    }
}

fn schedule(
    id: Option<i32>,
    in_ms: u64,
    alarm_type: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let (platform, driver, host) = local_platform();
        let wakepoint = Wakepoint::init(
            platform,
            PreferenceStore::open_default()?,
            SurfaceRegistry::new(),
            WakeOptions::new(),
        )?;
        driver.connect(wakepoint.receiver());

        let mut request = AlarmRequest::new(now_ms() + in_ms as i64).with_type(alarm_type);
        if let Some(id) = id {
            request = request.with_id(id);
        }
        if !wakepoint.scheduler().schedule_alarm(&request) {
            println!("{}", serde_json::json!({ "scheduled": false }));
            return Ok(());
        }
        println!(
            "{}",
            serde_json::json!({
                "scheduled": true,
                "alarm_id": request.alarm_id,
                "trigger_at_ms": request.trigger_at_ms,
            })
        );

        // Single-shot process: stay alive until the delivery lands.
        loop {
            if let Some((flags, launch)) = host.presented() {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "delivered": launch.extras(),
                        "window_flags": flags,
                    }))?
                );
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
}
