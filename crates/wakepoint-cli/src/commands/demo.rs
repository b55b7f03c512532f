use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Args;
use wakepoint_core::{
    AlarmDataProvider, AlarmPayload, AlarmRequest, AlarmSurface, LaunchRequest, PreferenceStore,
    SurfaceRegistry, WakeOptions, Wakepoint,
};

use super::{local_platform, now_ms};

const DEMO_SURFACE: &str = "demo.Banner";

#[derive(Args)]
pub struct DemoArgs {
    /// Delay until the demo alarm fires, in milliseconds
    #[arg(long, default_value = "1500")]
    in_ms: u64,
    /// Alarm type forwarded to the surface
    #[arg(long, default_value = "DEMO")]
    alarm_type: String,
}

struct DemoProvider;

#[async_trait]
impl AlarmDataProvider for DemoProvider {
    async fn provide_data(&self, alarm_id: i32, alarm_type: &str) -> AlarmPayload {
        let mut payload = AlarmPayload::new();
        payload.insert("alarm_id".into(), alarm_id.into());
        payload.insert("alarm_type".into(), alarm_type.into());
        payload.insert("fetched_at_ms".into(), now_ms().into());
        payload
    }
}

struct Banner;

impl AlarmSurface for Banner {
    fn render(&self, request: &LaunchRequest) {
        println!("=== WAKEPOINT! alarm {} ===", request.alarm_id);
    }
}

pub fn run(args: DemoArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let (platform, driver, host) = local_platform();
        let registry = SurfaceRegistry::new();
        registry.register(DEMO_SURFACE, || Box::new(Banner));

        let wakepoint = Wakepoint::init(
            platform,
            PreferenceStore::open_in_memory()?,
            registry,
            WakeOptions::new()
                .surface(DEMO_SURFACE)
                .notification("Demo alarm", "The demo alarm is ringing", "Wakepoint Demo")
                .data_provider(Arc::new(DemoProvider)),
        )?;
        driver.connect(wakepoint.receiver());

        let request = AlarmRequest::new(now_ms() + args.in_ms as i64).with_type(args.alarm_type);
        if !wakepoint.scheduler().schedule_alarm(&request) {
            return Err("demo alarm was not accepted".into());
        }
        println!(
            "scheduled alarm {} to fire in {}ms",
            request.alarm_id, args.in_ms
        );

        loop {
            if let Some((_, launch)) = host.presented() {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::Value::Object(launch.extras()))?
                );
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
}
