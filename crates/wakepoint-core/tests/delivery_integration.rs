//! End-to-end delivery scenarios on the in-process platform.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use wakepoint_core::platform::local::{
    HeadlessHost, LocalDriver, LocalWakeSource, LogNotifier, StaticDeviceState,
};
use wakepoint_core::{
    AlarmDataProvider, AlarmDriver, AlarmPayload, AlarmRequest, DeviceOracle, DeviceProfile,
    LaunchRequest, Oem, Platform, PreferenceStore, SurfaceRegistry, WakeOptions, Wakepoint,
};

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

struct MeetingProvider;

#[async_trait]
impl AlarmDataProvider for MeetingProvider {
    async fn provide_data(&self, _alarm_id: i32, alarm_type: &str) -> AlarmPayload {
        let mut payload = AlarmPayload::new();
        if alarm_type == "MEETING" {
            payload.insert("title".into(), "X".into());
        }
        payload
    }
}

struct PanickingProvider;

#[async_trait]
impl AlarmDataProvider for PanickingProvider {
    async fn provide_data(&self, _alarm_id: i32, _alarm_type: &str) -> AlarmPayload {
        panic!("host data source unavailable");
    }
}

struct Fixture {
    driver: Arc<LocalDriver>,
    wake: Arc<LocalWakeSource>,
    notifier: Arc<LogNotifier>,
    host: Arc<HeadlessHost>,
    oracle: Arc<DeviceOracle>,
    wakepoint: Wakepoint,
}

fn fixture(options: WakeOptions, granted: bool) -> Fixture {
    let driver = Arc::new(LocalDriver::new());
    let wake = Arc::new(LocalWakeSource::new());
    let notifier = Arc::new(LogNotifier::new());
    let host = Arc::new(HeadlessHost::new());
    let profile = DeviceProfile::new(34, Oem::Generic, "com.example.host");
    let oracle = Arc::new(if granted {
        DeviceOracle::unrestricted(profile)
    } else {
        DeviceOracle::new(profile)
    });

    let platform = Platform {
        driver: driver.clone(),
        wake: wake.clone(),
        notifier: notifier.clone(),
        device: Arc::new(StaticDeviceState::new(false, false)),
        host: host.clone(),
        oracle: oracle.clone(),
    };
    let wakepoint = Wakepoint::init(
        platform,
        PreferenceStore::open_in_memory().unwrap(),
        SurfaceRegistry::new(),
        options,
    )
    .unwrap();
    driver.connect(wakepoint.receiver());

    Fixture {
        driver,
        wake,
        notifier,
        host,
        oracle,
        wakepoint,
    }
}

async fn wait_for_present(host: &HeadlessHost) -> LaunchRequest {
    for _ in 0..100 {
        if let Some((_, launch)) = host.presented() {
            return launch;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("surface was never presented");
}

#[tokio::test]
async fn scenario_fire_delivers_id_type_and_payload() {
    let fx = fixture(
        WakeOptions::new().data_provider(Arc::new(MeetingProvider)),
        true,
    );

    let request = AlarmRequest::new(now_ms() + 50)
        .with_id(1)
        .with_type("MEETING");
    assert!(fx.wakepoint.scheduler().schedule_alarm(&request));

    let launch = wait_for_present(&fx.host).await;
    let extras = launch.extras();
    assert_eq!(extras["ALARM_ID"], 1);
    assert_eq!(extras["ALARM_TYPE"], "MEETING");
    assert_eq!(extras["ALARM_DATA"]["title"], "X");
}

#[tokio::test]
async fn scenario_denied_capability_schedules_nothing() {
    let fx = fixture(WakeOptions::new(), false);

    let request = AlarmRequest::new(now_ms() + 50).with_id(1);
    assert!(!fx.wakepoint.scheduler().schedule_alarm(&request));
    assert!(!fx.driver.is_pending(1));
    assert_eq!(fx.driver.pending_count(), 0);
}

#[tokio::test]
async fn scenario_data_fetch_fault_releases_wake_lock_once() {
    let fx = fixture(
        WakeOptions::new().data_provider(Arc::new(PanickingProvider)),
        true,
    );

    let request = AlarmRequest::new(now_ms() + 50)
        .with_id(2)
        .with_type("MEETING");
    assert!(fx.wakepoint.scheduler().schedule_alarm(&request));

    // The fault degrades to an empty payload; the launch still happens.
    let launch = wait_for_present(&fx.host).await;
    assert!(launch.payload.is_empty());

    // One acquisition, one release, nothing held, no retry.
    assert_eq!(fx.wake.acquired_count(), 1);
    assert_eq!(fx.wake.released_count(), 1);
    assert_eq!(fx.wake.held_count(), 0);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fx.host.present_count(), 1);
}

#[tokio::test]
async fn rescheduling_same_id_replaces_not_accumulates() {
    let fx = fixture(
        WakeOptions::new().data_provider(Arc::new(MeetingProvider)),
        true,
    );
    let scheduler = fx.wakepoint.scheduler();

    assert!(scheduler.schedule_alarm(
        &AlarmRequest::new(now_ms() + 5_000)
            .with_id(3)
            .with_type("FIRST")
    ));
    assert!(scheduler.schedule_alarm(
        &AlarmRequest::new(now_ms() + 50)
            .with_id(3)
            .with_type("SECOND")
    ));
    assert_eq!(fx.driver.pending_count(), 1);

    let launch = wait_for_present(&fx.host).await;
    assert_eq!(launch.alarm_type, "SECOND");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fx.host.present_count(), 1, "exactly one delivery per id");
}

#[tokio::test]
async fn cancelled_alarm_never_reaches_the_receiver() {
    let fx = fixture(WakeOptions::new(), true);
    let scheduler = fx.wakepoint.scheduler();

    assert!(scheduler.schedule_alarm(&AlarmRequest::new(now_ms() + 60).with_id(4)));
    scheduler.cancel_alarm(4);
    assert!(!fx.driver.is_pending(4));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fx.notifier.posted_count(), 0);
    assert_eq!(fx.host.present_count(), 0);
}

#[tokio::test]
async fn notification_posted_and_cleared_around_every_delivery() {
    let fx = fixture(WakeOptions::new(), true);
    assert!(fx
        .wakepoint
        .scheduler()
        .schedule_alarm(&AlarmRequest::new(now_ms() + 50).with_id(5)));

    wait_for_present(&fx.host).await;
    for _ in 0..100 {
        if fx.notifier.cleared_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(fx.notifier.posted_count(), 1);
    assert_eq!(fx.notifier.cleared_count(), 1);
    assert_eq!(
        fx.notifier.last_posted(),
        Some(("Alarm".to_string(), "Alarm is ringing".to_string()))
    );
}

#[tokio::test]
async fn concurrent_alarms_deliver_independently() {
    let fx = fixture(
        WakeOptions::new().data_provider(Arc::new(MeetingProvider)),
        true,
    );
    let results = fx.wakepoint.scheduler().schedule_multiple_alarms(
        "MEETING",
        &[(10, now_ms() + 40), (11, now_ms() + 45)],
    );
    assert_eq!(results, vec![true, true]);

    for _ in 0..100 {
        if fx.host.present_count() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(fx.host.present_count(), 2);
    // Each delivery acquired and released its own wake-lock.
    assert_eq!(fx.wake.acquired_count(), 2);
    assert_eq!(fx.wake.released_count(), 2);
}

#[tokio::test]
async fn revoking_grant_after_init_fails_subsequent_schedules() {
    let fx = fixture(WakeOptions::new(), true);
    assert!(fx
        .wakepoint
        .scheduler()
        .schedule_alarm(&AlarmRequest::new(now_ms() + 10_000).with_id(20)));

    fx.oracle.revoke(wakepoint_core::PermissionType::Alarm);
    assert!(!fx
        .wakepoint
        .scheduler()
        .schedule_alarm(&AlarmRequest::new(now_ms() + 10_000).with_id(21)));
}
