//! Runtime composition root.
//!
//! [`Wakepoint::init`] is the one-time entry point: it installs the logger,
//! mirrors the durable configuration subset to the store, ensures the
//! notification channel, and wires the platform handles into the scheduler
//! and the delivery receiver. Configuration is written here once and
//! read-only afterwards; every component receives its dependencies
//! explicitly.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{RuntimeConfig, WakeOptions, CHANNEL_ID};
use crate::delivery::DeliveryEnv;
use crate::error::CoreError;
use crate::permission::{FlowEnv, PermissionFlow, PermissionType};
use crate::platform::Platform;
use crate::receiver::AlarmReceiver;
use crate::scheduler::AlarmScheduler;
use crate::store::PreferenceStore;
use crate::surface::SurfaceRegistry;

/// Initialized library handle.
pub struct Wakepoint {
    config: Arc<RuntimeConfig>,
    store: Arc<PreferenceStore>,
    registry: Arc<SurfaceRegistry>,
    platform: Platform,
    scheduler: AlarmScheduler,
    receiver: Arc<AlarmReceiver>,
}

impl Wakepoint {
    /// One-time init. Surfaces must be registered on `registry` before the
    /// first alarm can resolve them; registering after init is allowed and
    /// takes effect on the next delivery.
    pub fn init(
        platform: Platform,
        store: PreferenceStore,
        registry: SurfaceRegistry,
        options: WakeOptions,
    ) -> Result<Self, CoreError> {
        let (config, logger) = options.into_parts();

        if let Some(dispatch) = logger {
            // A subscriber may already be installed by the host; that is
            // not an error.
            if tracing::dispatcher::set_global_default(dispatch).is_err() {
                debug!("global logger already installed, keeping it");
            }
        }
        info!(
            notification_title = %config.notification_title,
            "wakepoint initialized"
        );

        store.save_config(&config.durable())?;
        platform
            .notifier
            .ensure_channel(CHANNEL_ID, &config.notification_channel_name);

        let config = Arc::new(config);
        let store = Arc::new(store);
        let registry = Arc::new(registry);

        let scheduler = AlarmScheduler::new(
            Arc::clone(&platform.driver),
            Arc::clone(&platform.oracle),
            Arc::clone(&store),
        );
        let receiver = Arc::new(AlarmReceiver::new(DeliveryEnv {
            config: Arc::clone(&config),
            store: Arc::clone(&store),
            registry: Arc::clone(&registry),
            platform: platform.clone(),
        }));

        Ok(Self {
            config,
            store,
            registry,
            platform,
            scheduler,
            receiver,
        })
    }

    pub fn scheduler(&self) -> &AlarmScheduler {
        &self.scheduler
    }

    /// The delivery receiver, to be connected as the driver's sink.
    pub fn receiver(&self) -> Arc<AlarmReceiver> {
        Arc::clone(&self.receiver)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    /// Build a permission flow over `required`, attempted in exactly that
    /// order.
    pub fn permission_flow(&self, required: Vec<PermissionType>) -> PermissionFlow {
        PermissionFlow::new(required)
    }

    /// Environment for driving a permission flow.
    pub fn flow_env(&self) -> FlowEnv<'_> {
        FlowEnv::new(self.platform.oracle.as_ref(), &self.store)
    }
}
