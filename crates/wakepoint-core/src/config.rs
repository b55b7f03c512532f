//! Init-time configuration.
//!
//! The host builds a [`WakeOptions`] once and hands it to
//! [`crate::Wakepoint::init`]. There is no global configuration singleton:
//! init produces an [`RuntimeConfig`] that is passed explicitly into every
//! component that needs it, and the durable subset is mirrored to the store
//! so cold-started deliveries can reload it.

use std::sync::Arc;

use crate::provider::{AlarmDataProvider, NullProvider};
use crate::store::DurableConfig;
use crate::surface::DEFAULT_SURFACE;

/// Channel id used for the foreground notification.
pub const CHANNEL_ID: &str = "wakepoint_channel";

const DEFAULT_CHANNEL_NAME: &str = "Wakepoint Alarms";

/// Builder-style init options.
pub struct WakeOptions {
    notification_title: Option<String>,
    notification_message: Option<String>,
    notification_channel_name: String,
    surface_class: String,
    provider: Arc<dyn AlarmDataProvider>,
    logger: Option<tracing::Dispatch>,
    show_when_device_active: bool,
    show_when_app_active: bool,
}

impl WakeOptions {
    pub fn new() -> Self {
        Self {
            notification_title: None,
            notification_message: None,
            notification_channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            surface_class: DEFAULT_SURFACE.to_string(),
            provider: Arc::new(NullProvider),
            logger: None,
            show_when_device_active: true,
            show_when_app_active: true,
        }
    }

    /// Title, message and channel name for the foreground notification.
    pub fn notification(
        mut self,
        title: impl Into<String>,
        message: impl Into<String>,
        channel_name: impl Into<String>,
    ) -> Self {
        self.notification_title = Some(title.into());
        self.notification_message = Some(message.into());
        self.notification_channel_name = channel_name.into();
        self
    }

    /// Registered name of the surface to launch when an alarm fires.
    pub fn surface(mut self, name: impl Into<String>) -> Self {
        self.surface_class = name.into();
        self
    }

    /// Host data provider, called just before the surface launches.
    pub fn data_provider(mut self, provider: Arc<dyn AlarmDataProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Logger to install as the global tracing dispatcher at init.
    pub fn logger(mut self, dispatch: tracing::Dispatch) -> Self {
        self.logger = Some(dispatch);
        self
    }

    /// Whether to launch the surface while the device is interactive.
    pub fn show_when_device_active(mut self, show: bool) -> Self {
        self.show_when_device_active = show;
        self
    }

    /// Whether to launch the surface while the host app is foregrounded.
    pub fn show_when_app_active(mut self, show: bool) -> Self {
        self.show_when_app_active = show;
        self
    }

    pub(crate) fn into_parts(self) -> (RuntimeConfig, Option<tracing::Dispatch>) {
        let defaults = DurableConfig::default();
        let config = RuntimeConfig {
            notification_title: self
                .notification_title
                .unwrap_or(defaults.notification_title),
            notification_message: self
                .notification_message
                .unwrap_or(defaults.notification_message),
            notification_channel_name: self.notification_channel_name,
            surface_class: self.surface_class,
            provider: self.provider,
            show_when_device_active: self.show_when_device_active,
            show_when_app_active: self.show_when_app_active,
        };
        (config, self.logger)
    }
}

impl Default for WakeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Effective configuration. Written once at init, read-only afterwards.
pub struct RuntimeConfig {
    pub notification_title: String,
    pub notification_message: String,
    pub notification_channel_name: String,
    pub surface_class: String,
    pub provider: Arc<dyn AlarmDataProvider>,
    pub show_when_device_active: bool,
    pub show_when_app_active: bool,
}

impl RuntimeConfig {
    /// The subset mirrored to the durable store on every init.
    pub fn durable(&self) -> DurableConfig {
        DurableConfig {
            surface_class: self.surface_class.clone(),
            notification_title: self.notification_title.clone(),
            notification_message: self.notification_message.clone(),
            show_when_device_active: self.show_when_device_active,
            show_when_app_active: self.show_when_app_active,
        }
    }

    /// Rebuild a runtime view from the durable mirror, for contexts started
    /// after process death. Host capabilities that cannot be persisted (the
    /// data provider) reset to their defaults.
    pub fn from_durable(durable: DurableConfig) -> Self {
        Self {
            notification_title: durable.notification_title,
            notification_message: durable.notification_message,
            notification_channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            surface_class: durable.surface_class,
            provider: Arc::new(NullProvider),
            show_when_device_active: durable.show_when_device_active,
            show_when_app_active: durable.show_when_app_active,
        }
    }
}
