//! Mission instances and the state their scripts mutate.
//!
//! A [`Mission`] owns its scripting environment. The fields the script API
//! writes (title, timers, cargo links, ...) live in a [`MissionState`]
//! shared between the instance and the closures registered in its VM, so a
//! script can update them while the lifecycle manager is in the middle of a
//! call. Effects that reach outside the instance (hooks, the OSD list and
//! finishing) are queued as [`ScriptRequest`]s and applied by the manager
//! once the call returns.

use std::cell::{Ref, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::cargo::{CargoId, SharedHold};
use crate::catalog::TemplateId;
use crate::error::ScriptError;
use crate::osd::OsdId;
use crate::script::{CallReturn, ScriptEnv, ScriptValue};

/// Process-unique mission id. `0` marks an empty slot.
pub type MissionId = u32;

/// Number of timer slots per mission.
pub const TIMER_SLOTS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timer {
    /// Seconds left before the callback fires.
    pub remaining: f64,
    /// Name of the global function to call.
    pub callback: Option<String>,
}

/// A countdown that can be armed: positive and finite.
fn valid_duration(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.0
}

impl Timer {
    pub fn is_armed(&self) -> bool {
        self.callback.is_some()
    }

    fn arm(&mut self, callback: &str, seconds: f64) {
        self.remaining = seconds;
        self.callback = Some(callback.to_string());
    }

    fn clear(&mut self) {
        self.remaining = 0.0;
        self.callback = None;
    }

    /// Count down by `dt`. When the timer runs out the slot is cleared and
    /// the callback handed back for the caller to invoke.
    pub(crate) fn advance(&mut self, dt: f64) -> Option<String> {
        if self.remaining <= 0.0 {
            return None;
        }
        self.remaining -= dt;
        if self.remaining > 0.0 {
            return None;
        }
        let callback = self.callback.take();
        self.clear();
        callback
    }
}

/// How a marked system is highlighted on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Misc,
    Rush,
    Cargo,
    Plot,
}

impl MarkerKind {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "misc" => Some(MarkerKind::Misc),
            "rush" => Some(MarkerKind::Rush),
            "cargo" => Some(MarkerKind::Cargo),
            "plot" => Some(MarkerKind::Plot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub system: String,
    pub kind: MarkerKind,
}

/// Effects a script asked for that the lifecycle manager carries out after
/// the script call returns.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptRequest {
    Hook { event: String, callback: String },
    OsdCreate { title: String, items: Vec<String> },
    OsdActive(usize),
    OsdDestroy,
    Finish { completed: bool },
}

#[derive(Debug, Default)]
pub struct MissionState {
    pub title: Option<String>,
    pub description: Option<String>,
    pub reward: Option<String>,
    pub npc: Option<String>,
    pub portrait: Option<String>,
    pub marker: Option<Marker>,
    pub cargo: Vec<CargoId>,
    pub timers: [Timer; TIMER_SLOTS],
    pub osd: Option<OsdId>,
    pub accepted: bool,
    /// Whether `misn.accept()` may claim a slot during the current call.
    pub(crate) can_accept: bool,
    pub(crate) requests: Vec<ScriptRequest>,
}

pub type SharedState = Rc<RefCell<MissionState>>;

impl MissionState {
    pub fn shared() -> SharedState {
        Rc::new(RefCell::new(MissionState::default()))
    }

    /// Arm the first free timer slot. Returns the slot used.
    pub fn start_timer(&mut self, callback: &str, seconds: f64) -> Option<usize> {
        if callback.is_empty() || !valid_duration(seconds) {
            return None;
        }
        let slot = self.timers.iter().position(|t| !t.is_armed())?;
        self.timers[slot].arm(callback, seconds);
        Some(slot)
    }

    pub fn stop_timer(&mut self, slot: usize) -> bool {
        match self.timers.get_mut(slot) {
            Some(timer) if timer.is_armed() => {
                timer.clear();
                true
            }
            _ => false,
        }
    }

    /// Restore a timer exactly as saved.
    pub(crate) fn set_timer(&mut self, slot: usize, callback: &str, seconds: f64) -> bool {
        match self.timers.get_mut(slot) {
            Some(timer) if !callback.is_empty() && valid_duration(seconds) => {
                timer.arm(callback, seconds);
                true
            }
            _ => false,
        }
    }

    pub fn link_cargo(&mut self, cargo: CargoId) -> bool {
        if self.cargo.contains(&cargo) {
            return false;
        }
        self.cargo.push(cargo);
        true
    }

    /// Drop a cargo link. Unlinking an id that is not linked is a no-op.
    pub fn unlink_cargo(&mut self, cargo: CargoId) -> bool {
        match self.cargo.iter().position(|&c| c == cargo) {
            Some(pos) => {
                self.cargo.remove(pos);
                true
            }
            None => {
                log::debug!(
                    "Mission '{}' attempting to unlink nonexistent cargo {}",
                    self.title.as_deref().unwrap_or("<untitled>"),
                    cargo
                );
                false
            }
        }
    }

    pub(crate) fn request(&mut self, request: ScriptRequest) {
        self.requests.push(request);
    }

    pub(crate) fn take_requests(&mut self) -> Vec<ScriptRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn armed_timers(&self) -> impl Iterator<Item = (usize, &Timer)> {
        self.timers.iter().enumerate().filter(|(_, t)| t.is_armed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionStatus {
    /// Instantiated and listed, not counted against capacity.
    Candidate,
    /// Claimed a slot during the current script call.
    Accepted,
    /// Holds a slot; hooks and timers are live.
    Running,
    /// Torn down. Terminal.
    Cleaned,
}

pub struct Mission {
    pub(crate) id: MissionId,
    pub(crate) template: TemplateId,
    pub(crate) status: MissionStatus,
    pub(crate) state: SharedState,
    pub(crate) env: Option<Box<dyn ScriptEnv>>,
    /// Hook and OSD requests made while still a candidate. Applied once the
    /// mission is accepted, dropped with it otherwise.
    pub(crate) pending: Vec<ScriptRequest>,
    hold: SharedHold,
}

impl Mission {
    pub(crate) fn new(
        id: MissionId,
        template: TemplateId,
        state: SharedState,
        env: Box<dyn ScriptEnv>,
        hold: SharedHold,
    ) -> Self {
        Self {
            id,
            template,
            status: MissionStatus::Candidate,
            state,
            env: Some(env),
            pending: Vec::new(),
            hold,
        }
    }

    pub fn id(&self) -> MissionId {
        self.id
    }

    pub fn template(&self) -> TemplateId {
        self.template
    }

    pub fn status(&self) -> MissionStatus {
        self.status
    }

    pub fn is_cleaned(&self) -> bool {
        self.status == MissionStatus::Cleaned
    }

    pub fn accepted(&self) -> bool {
        self.state.borrow().accepted
    }

    /// Borrow the script-maintained fields for display.
    pub fn state(&self) -> Ref<'_, MissionState> {
        self.state.borrow()
    }

    pub fn title(&self) -> Option<String> {
        self.state.borrow().title.clone()
    }

    pub fn description(&self) -> Option<String> {
        self.state.borrow().description.clone()
    }

    pub fn reward(&self) -> Option<String> {
        self.state.borrow().reward.clone()
    }

    pub fn npc(&self) -> Option<String> {
        self.state.borrow().npc.clone()
    }

    pub fn portrait(&self) -> Option<String> {
        self.state.borrow().portrait.clone()
    }

    pub fn marker(&self) -> Option<Marker> {
        self.state.borrow().marker.clone()
    }

    pub fn cargo(&self) -> Vec<CargoId> {
        self.state.borrow().cargo.clone()
    }

    pub fn osd(&self) -> Option<OsdId> {
        self.state.borrow().osd
    }

    /// Read a global out of the mission's environment.
    pub fn global(&self, name: &str) -> Result<ScriptValue, ScriptError> {
        match &self.env {
            Some(env) => env.get_global(name),
            None => Err(ScriptError::Closed),
        }
    }

    pub(crate) fn has_entry(&self, name: &str) -> bool {
        self.env.as_ref().is_some_and(|env| env.has_entry(name))
    }

    pub(crate) fn call(
        &mut self,
        entry: &str,
        args: &[ScriptValue],
    ) -> Result<CallReturn, ScriptError> {
        match self.env.as_mut() {
            Some(env) => env.call(entry, args),
            None => Err(ScriptError::Closed),
        }
    }
}

/// A candidate dropped without [`crate::lifecycle::Missions::discard`] still
/// gives back the cargo its `create` put in the hold.
impl Drop for Mission {
    fn drop(&mut self) {
        if self.status != MissionStatus::Candidate {
            return;
        }
        let cargo = match self.state.try_borrow_mut() {
            Ok(mut state) => std::mem::take(&mut state.cargo),
            Err(_) => return,
        };
        if let Ok(mut hold) = self.hold.try_borrow_mut() {
            for c in cargo {
                hold.remove_mission_cargo(c);
            }
        }
    }
}

impl fmt::Debug for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mission")
            .field("id", &self.id)
            .field("template", &self.template)
            .field("status", &self.status)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Templates the player has completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionLog {
    done: BTreeSet<String>,
}

impl MissionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_done(&mut self, template: &str) -> bool {
        self.done.insert(template.to_string())
    }

    pub fn is_done(&self, template: &str) -> bool {
        self.done.contains(template)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.done.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    pub fn clear(&mut self) {
        self.done.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_fires_once_and_clears() {
        let mut timer = Timer::default();
        timer.arm("tick", 1.0);
        assert_eq!(timer.advance(0.4), None);
        assert!(timer.is_armed());
        assert_eq!(timer.advance(0.7), Some("tick".to_string()));
        assert!(!timer.is_armed());
        assert_eq!(timer.remaining, 0.0);
        assert_eq!(timer.advance(5.0), None);
    }

    #[test]
    fn start_timer_uses_first_free_slot() {
        let mut state = MissionState::default();
        assert_eq!(state.start_timer("a", 1.0), Some(0));
        assert_eq!(state.start_timer("b", 1.0), Some(1));
        assert!(state.stop_timer(0));
        assert_eq!(state.start_timer("c", 2.0), Some(0));
        assert_eq!(state.timers[0].callback.as_deref(), Some("c"));
    }

    #[test]
    fn start_timer_rejects_inert_arguments() {
        let mut state = MissionState::default();
        assert_eq!(state.start_timer("", 1.0), None);
        assert_eq!(state.start_timer("tick", 0.0), None);
        assert_eq!(state.start_timer("tick", f64::NAN), None);
        assert_eq!(state.start_timer("tick", f64::INFINITY), None);
        assert!(!state.set_timer(0, "tick", f64::INFINITY));
        assert_eq!(state.armed_timers().count(), 0);
    }

    #[test]
    fn timer_slots_run_out() {
        let mut state = MissionState::default();
        for i in 0..TIMER_SLOTS {
            assert_eq!(state.start_timer("t", 1.0), Some(i));
        }
        assert_eq!(state.start_timer("t", 1.0), None);
    }

    #[test]
    fn unlink_cargo_is_idempotent() {
        let mut state = MissionState::default();
        assert!(state.link_cargo(7));
        assert!(!state.link_cargo(7));
        assert!(state.unlink_cargo(7));
        assert!(!state.unlink_cargo(7));
        assert!(state.cargo.is_empty());
    }

    #[test]
    fn marker_labels() {
        assert_eq!(MarkerKind::from_label("rush"), Some(MarkerKind::Rush));
        assert_eq!(MarkerKind::from_label("bogus"), None);
    }
}
