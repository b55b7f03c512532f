//! Alarm delivery receiver.
//!
//! The entry point invoked when an alarm fires. Its execution window is a
//! short platform-enforced budget, so it does no blocking work itself: it
//! checks the action, hands the message to a freshly spawned delivery
//! execution context, and returns immediately. Concurrent fires each get
//! their own delivery task; no cross-alarm ordering is imposed.

use tracing::{debug, error, warn};

use crate::delivery::{deliver, DeliveryEnv};
use crate::message::AlarmMessage;
use crate::platform::AlarmSink;

/// Outcome of one received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Matching action; delivery execution context started.
    Dispatched,
    /// Any other action; dropped.
    Ignored,
}

pub struct AlarmReceiver {
    env: DeliveryEnv,
}

impl AlarmReceiver {
    pub fn new(env: DeliveryEnv) -> Self {
        Self { env }
    }

    /// Handle one incoming message. Never blocks, never panics: a failure
    /// to start the execution context is logged and the delivery is lost.
    pub fn on_receive(&self, message: AlarmMessage) -> Disposition {
        debug!(alarm_id = message.alarm_id, "alarm received");

        if !message.is_alarm() {
            warn!(action = %message.action, "received message with unknown action");
            return Disposition::Ignored;
        }

        let env = self.env.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    deliver(&env, message).await;
                });
            }
            Err(e) => {
                error!(alarm_id = message.alarm_id, error = %e,
                    "failed to start delivery execution context");
            }
        }
        Disposition::Dispatched
    }
}

impl AlarmSink for AlarmReceiver {
    fn alarm_fired(&self, message: AlarmMessage) {
        self.on_receive(message);
    }
}
