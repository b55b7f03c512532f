//! Permission request flow.
//!
//! Walks a fixed, ordered list of required permissions one at a time,
//! coordinating system-settings round-trips and the manual guidance dialog.
//! The flow never reorders or skips entries except by removal from the
//! front: the pending queue is always a suffix of the original requirement
//! list.
//!
//! The flow owns no platform handles. Every operation takes a [`FlowEnv`]
//! so a flow outliving its originating UI scope holds nothing alive.

use std::collections::VecDeque;

use tracing::{error, warn};

use super::oracle::{PermissionOracle, PermissionType, SettingsIntent};
use crate::store::PreferenceStore;

/// The capabilities a flow needs to make progress, passed at each call site.
pub struct FlowEnv<'a> {
    pub oracle: &'a dyn PermissionOracle,
    pub store: &'a PreferenceStore,
}

impl<'a> FlowEnv<'a> {
    pub fn new(oracle: &'a dyn PermissionOracle, store: &'a PreferenceStore) -> Self {
        Self { oracle, store }
    }

    /// Grant check for one permission. Manual types are resolved from the
    /// durable acknowledgment flag; everything else from the oracle. A
    /// store read failure degrades to not-acknowledged.
    fn is_granted(&self, permission: PermissionType) -> bool {
        if permission.is_manual() {
            match self.store.manual_ack(permission) {
                Ok(acknowledged) => acknowledged,
                Err(e) => {
                    warn!(permission = permission.name(), error = %e,
                        "acknowledgment read failed, treating as not acknowledged");
                    false
                }
            }
        } else {
            self.oracle.is_granted(permission)
        }
    }
}

/// What the host must do next to keep the flow moving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowDirective {
    /// Queue exhausted; every pending permission resolved.
    Completed,
    /// Open this settings screen, then report back via
    /// [`PermissionFlow::on_settings_result`].
    OpenSettings(SettingsIntent),
    /// Show the in-app guidance dialog for a manual permission, then call
    /// [`PermissionFlow::acknowledge_guidance`].
    ShowGuidance(PermissionType),
    /// The user denied the permission in settings; show a rationale, then
    /// re-trigger [`PermissionFlow::request_next`] on confirmation.
    ShowRationale(PermissionType),
}

/// Observable phase of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    /// No permission in flight.
    Idle,
    /// A settings intent was launched or the guidance dialog is showing.
    AwaitingResult,
}

/// Per-UI-session permission flow state machine.
pub struct PermissionFlow {
    required: Vec<PermissionType>,
    pending: VecDeque<PermissionType>,
    current: Option<PermissionType>,
    phase: FlowPhase,
    /// The user denied the current permission in settings; the host should
    /// show a rationale and re-trigger [`PermissionFlow::request_next`].
    pub show_rationale: bool,
    /// The manual guidance dialog should be visible.
    pub show_guidance: bool,
    /// Set by the host when it sends the user to system settings outside a
    /// result callback; consumed by [`PermissionFlow::on_app_resumed`].
    pub resumed_from_settings: bool,
}

impl PermissionFlow {
    /// Build a flow over a fixed requirement list. OEM-conditional entries
    /// are appended by the caller; the attempt order is exactly this order.
    pub fn new(required: Vec<PermissionType>) -> Self {
        Self {
            pending: required.iter().copied().collect(),
            required,
            current: None,
            phase: FlowPhase::Idle,
            show_rationale: false,
            show_guidance: false,
            resumed_from_settings: false,
        }
    }

    pub fn phase(&self) -> FlowPhase {
        self.phase
    }

    pub fn current(&self) -> Option<PermissionType> {
        self.current
    }

    /// Remaining entries, front first. Always a suffix of the construction
    /// list.
    pub fn pending(&self) -> impl Iterator<Item = PermissionType> + '_ {
        self.pending.iter().copied()
    }

    /// Start or continue the flow: resolve already-granted entries without
    /// UI, then surface the first entry that needs the user.
    pub fn request_next(&mut self, env: &FlowEnv) -> FlowDirective {
        self.show_rationale = false;
        loop {
            let Some(&head) = self.pending.front() else {
                self.current = None;
                self.phase = FlowPhase::Idle;
                self.show_guidance = false;
                return FlowDirective::Completed;
            };
            self.current = Some(head);

            if env.is_granted(head) {
                self.pending.pop_front();
                continue;
            }

            if head.is_manual() {
                self.show_guidance = true;
                self.phase = FlowPhase::AwaitingResult;
                return FlowDirective::ShowGuidance(head);
            }

            match env.oracle.settings_intent(head) {
                Some(intent) => {
                    self.phase = FlowPhase::AwaitingResult;
                    return FlowDirective::OpenSettings(intent);
                }
                None => {
                    // Denied but no settings screen exists on this device;
                    // nothing the user can do, so move on.
                    error!(
                        permission = head.name(),
                        "no settings intent for denied permission, skipping"
                    );
                    self.pending.pop_front();
                }
            }
        }
    }

    /// Handle the result of a settings round-trip for the current
    /// permission: advance when it is now granted, otherwise halt with the
    /// rationale flag set until the host re-triggers the flow.
    pub fn on_settings_result(&mut self, env: &FlowEnv) -> FlowDirective {
        let Some(current) = self.current else {
            return self.request_next(env);
        };
        if env.is_granted(current) {
            self.pending.pop_front();
            self.request_next(env)
        } else {
            // Halt here; the host re-triggers request_next once the user
            // confirms the rationale.
            self.show_rationale = true;
            self.phase = FlowPhase::AwaitingResult;
            FlowDirective::ShowRationale(current)
        }
    }

    /// Record the guidance acknowledgment for the current manual permission
    /// and advance.
    pub fn acknowledge_guidance(&mut self, env: &FlowEnv) -> FlowDirective {
        self.show_guidance = false;
        if let Some(current) = self.current.filter(|p| p.is_manual()) {
            if let Err(e) = env.store.set_manual_ack(current, true) {
                error!(permission = current.name(), error = %e,
                    "failed to persist guidance acknowledgment");
            }
        }
        self.request_next(env)
    }

    /// React to the host app becoming active again. Only acts when the
    /// host flagged `resumed_from_settings`; this is how grants changed
    /// while the user was away in system settings are picked up.
    pub fn on_app_resumed(&mut self, env: &FlowEnv) -> Option<FlowDirective> {
        if !self.resumed_from_settings {
            return None;
        }
        self.resumed_from_settings = false;
        Some(self.request_next(env))
    }

    /// Whether every entry in the full fixed requirement list (not just the
    /// pending suffix) currently holds. Does not mutate the queue.
    pub fn all_required_granted(&self, env: &FlowEnv) -> bool {
        self.required.iter().all(|&p| env.is_granted(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::oracle::{DeviceOracle, DeviceProfile, Oem};
    use crate::store::PreferenceStore;

    fn oracle(api_level: u32) -> DeviceOracle {
        DeviceOracle::new(DeviceProfile::new(api_level, Oem::Generic, "com.example"))
    }

    fn required() -> Vec<PermissionType> {
        vec![
            PermissionType::Alarm,
            PermissionType::Overlay,
            PermissionType::BatteryOptimization,
            PermissionType::Notification,
        ]
    }

    #[test]
    fn granted_entries_resolve_without_ui() {
        let oracle = DeviceOracle::unrestricted(DeviceProfile::new(
            34,
            Oem::Generic,
            "com.example",
        ));
        let store = PreferenceStore::open_in_memory().unwrap();
        let env = FlowEnv::new(&oracle, &store);

        let mut flow = PermissionFlow::new(required());
        assert_eq!(flow.request_next(&env), FlowDirective::Completed);
        assert_eq!(flow.phase(), FlowPhase::Idle);
        assert!(flow.all_required_granted(&env));
    }

    #[test]
    fn denied_entry_opens_settings_in_order() {
        let oracle = oracle(34);
        let store = PreferenceStore::open_in_memory().unwrap();
        let env = FlowEnv::new(&oracle, &store);

        let mut flow = PermissionFlow::new(required());
        let directive = flow.request_next(&env);
        match directive {
            FlowDirective::OpenSettings(intent) => {
                assert_eq!(intent.action, "settings.REQUEST_SCHEDULE_EXACT_ALARM");
            }
            other => panic!("expected OpenSettings, got {other:?}"),
        }
        assert_eq!(flow.current(), Some(PermissionType::Alarm));
        assert_eq!(flow.phase(), FlowPhase::AwaitingResult);
    }

    #[test]
    fn settings_result_advances_when_granted() {
        let oracle = oracle(34);
        let store = PreferenceStore::open_in_memory().unwrap();
        let env = FlowEnv::new(&oracle, &store);

        let mut flow = PermissionFlow::new(required());
        flow.request_next(&env);

        oracle.grant(PermissionType::Alarm);
        let directive = flow.on_settings_result(&env);
        // Next denied entry is Overlay.
        assert_eq!(flow.current(), Some(PermissionType::Overlay));
        assert!(matches!(directive, FlowDirective::OpenSettings(_)));
        assert!(!flow.show_rationale);
    }

    #[test]
    fn settings_result_halts_with_rationale_when_still_denied() {
        let oracle = oracle(34);
        let store = PreferenceStore::open_in_memory().unwrap();
        let env = FlowEnv::new(&oracle, &store);

        let mut flow = PermissionFlow::new(required());
        flow.request_next(&env);
        let directive = flow.on_settings_result(&env);

        assert_eq!(
            directive,
            FlowDirective::ShowRationale(PermissionType::Alarm)
        );
        assert!(flow.show_rationale);
        assert_eq!(flow.current(), Some(PermissionType::Alarm));
        assert_eq!(flow.phase(), FlowPhase::AwaitingResult);
    }

    #[test]
    fn resume_from_settings_retriggers_once() {
        let oracle = oracle(34);
        let store = PreferenceStore::open_in_memory().unwrap();
        let env = FlowEnv::new(&oracle, &store);

        let mut flow = PermissionFlow::new(vec![PermissionType::Alarm]);
        flow.request_next(&env);

        assert!(flow.on_app_resumed(&env).is_none());

        flow.resumed_from_settings = true;
        oracle.grant(PermissionType::Alarm);
        assert_eq!(flow.on_app_resumed(&env), Some(FlowDirective::Completed));
        assert!(!flow.resumed_from_settings);
        assert!(flow.on_app_resumed(&env).is_none());
    }

    #[test]
    fn manual_permission_halts_until_acknowledged() {
        let oracle = oracle(30);
        let store = PreferenceStore::open_in_memory().unwrap();
        let env = FlowEnv::new(&oracle, &store);

        let mut flow = PermissionFlow::new(vec![
            PermissionType::Alarm,
            PermissionType::OverlayWhileBackground,
        ]);
        let directive = flow.request_next(&env);
        assert_eq!(
            directive,
            FlowDirective::ShowGuidance(PermissionType::OverlayWhileBackground)
        );
        assert!(flow.show_guidance);
        assert!(!flow.all_required_granted(&env));

        let directive = flow.acknowledge_guidance(&env);
        assert_eq!(directive, FlowDirective::Completed);
        assert!(!flow.show_guidance);
        assert!(flow.all_required_granted(&env));
    }

    #[test]
    fn pending_is_monotonic_suffix() {
        let oracle = oracle(34);
        let store = PreferenceStore::open_in_memory().unwrap();
        let env = FlowEnv::new(&oracle, &store);

        let required = required();
        let mut flow = PermissionFlow::new(required.clone());

        let mut last_len = flow.pending().count();
        for permission in required.iter().copied() {
            flow.request_next(&env);
            oracle.grant(permission);
            flow.on_settings_result(&env);

            let remaining: Vec<_> = flow.pending().collect();
            assert!(remaining.len() <= last_len);
            assert_eq!(remaining.as_slice(), &required[required.len() - remaining.len()..]);
            last_len = remaining.len();
        }
        assert_eq!(flow.pending().count(), 0);
    }
}
