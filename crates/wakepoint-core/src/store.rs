//! Durable key/value store.
//!
//! SQLite-backed persistence for everything that must survive process
//! death: the configuration mirror, the manual-permission acknowledgment
//! flags, and the host-facing alarm-id ledger. Three independent namespaces
//! share one `prefs` table; writes are serialized by the connection, reads
//! are safe from multiple contexts.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::permission::PermissionType;
use crate::surface::DEFAULT_SURFACE;

const NS_CONFIG: &str = "config";
const NS_PERMISSION_STATUS: &str = "permission_status";
const NS_ALARM_IDS: &str = "alarm_ids";

const KEY_SURFACE_CLASS: &str = "activity_class";
const KEY_NOTIFICATION_TITLE: &str = "notification_title";
const KEY_NOTIFICATION_MESSAGE: &str = "notification_message";
const KEY_SHOW_WHEN_DEVICE_ACTIVE: &str = "show_when_device_active";
const KEY_SHOW_WHEN_APP_ACTIVE: &str = "show_when_app_active";

/// The configuration subset mirrored to disk on every init, so a cold-started
/// delivery can still resolve its surface and notification text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableConfig {
    /// Registered surface name. May fail to resolve after a host rename;
    /// resolution then falls back to the library default surface.
    pub surface_class: String,
    pub notification_title: String,
    pub notification_message: String,
    pub show_when_device_active: bool,
    pub show_when_app_active: bool,
}

impl Default for DurableConfig {
    fn default() -> Self {
        Self {
            surface_class: DEFAULT_SURFACE.to_string(),
            notification_title: "Alarm".to_string(),
            notification_message: "Alarm is ringing".to_string(),
            show_when_device_active: true,
            show_when_app_active: true,
        }
    }
}

/// SQLite-backed preference store.
pub struct PreferenceStore {
    conn: Mutex<Connection>,
}

impl PreferenceStore {
    /// Open the store at `path`, creating the schema if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open the store at the default location,
    /// `~/.config/wakepoint/wakepoint.db`.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(data_dir()?.join("wakepoint.db"))
    }

    /// Open an in-memory store. Useful for tests and ephemeral demo hosts.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS prefs (
                namespace TEXT NOT NULL,
                key       TEXT NOT NULL,
                value     TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            );",
        )?;
        Ok(())
    }

    fn put(&self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT INTO prefs (namespace, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (namespace, key) DO UPDATE SET value = excluded.value",
            params![namespace, key, value],
        )?;
        Ok(())
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let value = conn
            .query_row(
                "SELECT value FROM prefs WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let affected = conn.execute(
            "DELETE FROM prefs WHERE namespace = ?1 AND key = ?2",
            params![namespace, key],
        )?;
        Ok(affected > 0)
    }

    // ── Configuration mirror ─────────────────────────────────────────

    /// Persist the durable configuration subset. Runs in one transaction so
    /// a concurrent cold-start read never sees a half-written mirror.
    pub fn save_config(&self, config: &DurableConfig) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.transaction()?;
        for (key, value) in [
            (KEY_SURFACE_CLASS, config.surface_class.clone()),
            (KEY_NOTIFICATION_TITLE, config.notification_title.clone()),
            (
                KEY_NOTIFICATION_MESSAGE,
                config.notification_message.clone(),
            ),
            (
                KEY_SHOW_WHEN_DEVICE_ACTIVE,
                config.show_when_device_active.to_string(),
            ),
            (
                KEY_SHOW_WHEN_APP_ACTIVE,
                config.show_when_app_active.to_string(),
            ),
        ] {
            tx.execute(
                "INSERT INTO prefs (namespace, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (namespace, key) DO UPDATE SET value = excluded.value",
                params![NS_CONFIG, key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Load the configuration mirror. Returns `None` when no init has ever
    /// persisted one (no `activity_class` key); missing optional fields fall
    /// back to the documented defaults.
    pub fn load_config(&self) -> Result<Option<DurableConfig>, StoreError> {
        let surface_class = match self.get(NS_CONFIG, KEY_SURFACE_CLASS)? {
            Some(name) => name,
            None => return Ok(None),
        };
        let defaults = DurableConfig::default();
        Ok(Some(DurableConfig {
            surface_class,
            notification_title: self
                .get(NS_CONFIG, KEY_NOTIFICATION_TITLE)?
                .unwrap_or(defaults.notification_title),
            notification_message: self
                .get(NS_CONFIG, KEY_NOTIFICATION_MESSAGE)?
                .unwrap_or(defaults.notification_message),
            show_when_device_active: self
                .get(NS_CONFIG, KEY_SHOW_WHEN_DEVICE_ACTIVE)?
                .map(|v| v == "true")
                .unwrap_or(true),
            show_when_app_active: self
                .get(NS_CONFIG, KEY_SHOW_WHEN_APP_ACTIVE)?
                .map(|v| v == "true")
                .unwrap_or(true),
        }))
    }

    // ── Manual-permission acknowledgments ────────────────────────────

    /// Record whether the user acknowledged the guidance dialog for a
    /// manual-type permission. Independent of the underlying capability,
    /// which manual types cannot query.
    pub fn set_manual_ack(
        &self,
        permission: PermissionType,
        acknowledged: bool,
    ) -> Result<(), StoreError> {
        self.put(
            NS_PERMISSION_STATUS,
            &ack_key(permission),
            if acknowledged { "true" } else { "false" },
        )
    }

    /// Whether the guidance dialog for `permission` was acknowledged.
    /// Never recorded means not acknowledged.
    pub fn manual_ack(&self, permission: PermissionType) -> Result<bool, StoreError> {
        Ok(self
            .get(NS_PERMISSION_STATUS, &ack_key(permission))?
            .map(|v| v == "true")
            .unwrap_or(false))
    }

    // ── Alarm-id ledger ──────────────────────────────────────────────
    //
    // Host bookkeeping only. The alarm driver remains the sole source of
    // truth for whether an id is still pending.

    pub fn save_alarm_id(&self, alarm_id: i32) -> Result<(), StoreError> {
        self.put(NS_ALARM_IDS, &alarm_id.to_string(), "1")
    }

    pub fn remove_alarm_id(&self, alarm_id: i32) -> Result<(), StoreError> {
        self.delete(NS_ALARM_IDS, &alarm_id.to_string())?;
        Ok(())
    }

    pub fn alarm_ids(&self) -> Result<Vec<i32>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare("SELECT key FROM prefs WHERE namespace = ?1")?;
        let rows = stmt.query_map(params![NS_ALARM_IDS], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            if let Ok(id) = row?.parse::<i32>() {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    pub fn clear_alarm_ids(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "DELETE FROM prefs WHERE namespace = ?1",
            params![NS_ALARM_IDS],
        )?;
        Ok(())
    }
}

fn ack_key(permission: PermissionType) -> String {
    format!("permission_dialog_shown_{}", permission.name())
}

/// Returns `~/.config/wakepoint/`, creating it if needed.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("wakepoint");
    std::fs::create_dir_all(&dir).map_err(|e| StoreError::DataDir(e.to_string()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_mirror_round_trips() {
        let store = PreferenceStore::open_in_memory().unwrap();
        assert!(store.load_config().unwrap().is_none());

        let config = DurableConfig {
            surface_class: "app.MeetingSurface".into(),
            notification_title: "Meeting".into(),
            notification_message: "Starting now".into(),
            show_when_device_active: false,
            show_when_app_active: true,
        };
        store.save_config(&config).unwrap();
        assert_eq!(store.load_config().unwrap(), Some(config));
    }

    #[test]
    fn save_config_overwrites_previous_mirror() {
        let store = PreferenceStore::open_in_memory().unwrap();
        store.save_config(&DurableConfig::default()).unwrap();

        let updated = DurableConfig {
            notification_title: "Updated".into(),
            ..DurableConfig::default()
        };
        store.save_config(&updated).unwrap();
        assert_eq!(store.load_config().unwrap(), Some(updated));
    }

    #[test]
    fn manual_ack_defaults_to_false() {
        let store = PreferenceStore::open_in_memory().unwrap();
        assert!(!store
            .manual_ack(PermissionType::OverlayWhileBackground)
            .unwrap());

        store
            .set_manual_ack(PermissionType::OverlayWhileBackground, true)
            .unwrap();
        assert!(store
            .manual_ack(PermissionType::OverlayWhileBackground)
            .unwrap());
    }

    #[test]
    fn alarm_id_ledger() {
        let store = PreferenceStore::open_in_memory().unwrap();
        store.save_alarm_id(3).unwrap();
        store.save_alarm_id(1).unwrap();
        store.save_alarm_id(3).unwrap(); // idempotent
        assert_eq!(store.alarm_ids().unwrap(), vec![1, 3]);

        store.remove_alarm_id(1).unwrap();
        assert_eq!(store.alarm_ids().unwrap(), vec![3]);

        store.clear_alarm_ids().unwrap();
        assert!(store.alarm_ids().unwrap().is_empty());
    }
}
