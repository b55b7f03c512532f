//! Target surface contract and resolution.
//!
//! The host registers surface types by name; the delivery unit resolves the
//! configured name back to a factory when an alarm fires. Resolution must
//! always succeed: an unknown or stale name falls back to the library
//! default surface instead of failing the delivery.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::message::LaunchRequest;

/// Name under which the library default surface is registered.
pub const DEFAULT_SURFACE: &str = "wakepoint.DefaultSurface";

/// Window flags guaranteed by the base surface before host content renders.
///
/// The delivery unit always presents with all three set so the surface is
/// visible over the lock screen with the display forced on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowFlags {
    pub show_when_locked: bool,
    pub turn_screen_on: bool,
    pub keep_screen_on: bool,
}

impl WindowFlags {
    /// Flags applied to every alarm surface launch.
    pub fn alarm() -> Self {
        Self {
            show_when_locked: true,
            turn_screen_on: true,
            keep_screen_on: true,
        }
    }
}

/// A launchable alarm surface. The host supplies the content; the
/// surrounding window discipline (lock-screen visibility, screen-on) is
/// applied by the presenting host before `render` runs.
pub trait AlarmSurface: Send + Sync {
    fn render(&self, request: &LaunchRequest);
}

type SurfaceFactory = Box<dyn Fn() -> Box<dyn AlarmSurface> + Send + Sync>;

/// Registry mapping surface names to factories.
///
/// The durable store persists a surface *name*; this registry is what turns
/// the name back into something launchable after process death.
pub struct SurfaceRegistry {
    factories: Mutex<HashMap<String, SurfaceFactory>>,
}

impl SurfaceRegistry {
    /// New registry with the library default surface pre-registered.
    pub fn new() -> Self {
        let registry = Self {
            factories: Mutex::new(HashMap::new()),
        };
        registry.register(DEFAULT_SURFACE, || Box::new(DefaultSurface));
        registry
    }

    /// Register a surface factory under `name`. Re-registering a name
    /// replaces the previous factory.
    pub fn register<F>(&self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn AlarmSurface> + Send + Sync + 'static,
    {
        let mut factories = self.factories.lock().unwrap_or_else(|e| e.into_inner());
        factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        let factories = self.factories.lock().unwrap_or_else(|e| e.into_inner());
        factories.contains_key(name)
    }

    /// Resolve `name` to a surface instance.
    ///
    /// Unknown names fall back to the default surface with an error log;
    /// a stale stored name must never fail a delivery.
    pub fn resolve(&self, name: &str) -> Box<dyn AlarmSurface> {
        let factories = self.factories.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(factory) = factories.get(name) {
            return factory();
        }
        error!(surface = name, "surface not registered, falling back to default");
        match factories.get(DEFAULT_SURFACE) {
            Some(factory) => factory(),
            // The default is registered in new(); reaching here means the
            // host removed it, so synthesize one.
            None => Box::new(DefaultSurface),
        }
    }
}

impl Default for SurfaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Library-supplied fallback surface.
pub struct DefaultSurface;

impl AlarmSurface for DefaultSurface {
    fn render(&self, request: &LaunchRequest) {
        tracing::info!(
            alarm_id = request.alarm_id,
            alarm_type = %request.alarm_type,
            "WAKEPOINT!"
        );
    }
}
