//! Lifecycle manager - owns the active mission table
//!
//! Missions move `Candidate -> Accepted -> Running -> Cleaned`. Candidates
//! are owned by whoever holds the generated list; only accepted missions
//! occupy one of the fixed slots, receive hook events and tick timers.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::rc::Rc;

use crate::availability::{self, Ineligible, LocationContext, MatchContext};
use crate::cargo::{CargoId, SharedHold};
use crate::catalog::{Catalog, MissionTemplate, TemplateId};
use crate::config::MissionConfig;
use crate::error::{MissionError, SaveError};
use crate::hooks::{HookDispatcher, HookRegistry};
use crate::mission::{
    Marker, Mission, MissionId, MissionLog, MissionState, MissionStatus, ScriptRequest,
    TIMER_SLOTS,
};
use crate::osd::OsdList;
use crate::persistence::{
    persist_globals, unpersist_nodes, MissionsSave, SaveFormat, SavedHook, SavedMission, SavedOsd,
    SavedTimer, SAVE_MARKER, SAVE_VERSION,
};
use crate::script::{CallReturn, ScriptBinding, ScriptHost, ScriptValue};
use crate::universe::Universe;

/// How a script call ended, from the manager's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Continue,
    /// The entry point returned `misn.DEFER`.
    Deferred,
    /// The script called `misn.finish`.
    Finished { completed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortOutcome {
    Cleaned,
    /// The `abort` entry point took over its own teardown.
    Deferred,
}

/// A failed [`Missions::accept`]. The candidate comes back when it is still
/// usable (no free slot, or the script declined).
#[derive(Debug)]
pub struct Rejected {
    pub error: MissionError,
    pub candidate: Option<Mission>,
}

pub struct Missions {
    catalog: Rc<Catalog>,
    universe: Rc<Universe>,
    host: Box<dyn ScriptHost>,
    hooks: Box<dyn HookDispatcher>,
    hold: SharedHold,
    osd: OsdList,
    log: MissionLog,
    slots: Vec<Option<Mission>>,
    last_id: MissionId,
    config: MissionConfig,
}

impl Missions {
    pub fn new(
        catalog: Rc<Catalog>,
        universe: Rc<Universe>,
        host: Box<dyn ScriptHost>,
        hold: SharedHold,
        config: MissionConfig,
    ) -> Self {
        let slots = (0..config.max_active).map(|_| None).collect();
        Self {
            catalog,
            universe,
            host,
            hooks: Box::new(HookRegistry::new()),
            hold,
            osd: OsdList::new(),
            log: MissionLog::new(),
            slots,
            last_id: 0,
            config,
        }
    }

    /// Use the game's own hook dispatcher instead of the built-in registry.
    pub fn with_hooks(mut self, hooks: Box<dyn HookDispatcher>) -> Self {
        self.hooks = hooks;
        self
    }

    // ── Accessors ──

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn log(&self) -> &MissionLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut MissionLog {
        &mut self.log
    }

    pub fn osd(&self) -> &OsdList {
        &self.osd
    }

    pub fn hooks(&self) -> &dyn HookDispatcher {
        self.hooks.as_ref()
    }

    pub(crate) fn host(&self) -> &dyn ScriptHost {
        self.host.as_ref()
    }

    pub fn template_of(&self, mission: &Mission) -> Option<&MissionTemplate> {
        self.catalog.get(mission.template)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Active missions with their slot index.
    pub fn active(&self) -> impl Iterator<Item = (usize, &Mission)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.as_ref().map(|m| (i, m)))
    }

    pub fn slot(&self, slot: usize) -> Option<&Mission> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Id of the mission in `slot`, `0` when empty.
    pub fn slot_id(&self, slot: usize) -> MissionId {
        self.slot(slot).map_or(0, Mission::id)
    }

    pub fn by_id(&self, id: MissionId) -> Option<&Mission> {
        self.active().map(|(_, m)| m).find(|m| m.id == id)
    }

    /// First active mission instantiated from the template `name`.
    pub fn by_name(&self, name: &str) -> Option<&Mission> {
        let tid = self.catalog.lookup(name)?;
        self.active().map(|(_, m)| m).find(|m| m.template == tid)
    }

    fn slot_of(&self, id: MissionId) -> Option<usize> {
        self.active().find(|(_, m)| m.id == id).map(|(i, _)| i)
    }

    fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    pub fn is_running(&self, template: TemplateId) -> bool {
        self.active().any(|(_, m)| m.template == template)
    }

    pub fn running_templates(&self) -> HashSet<TemplateId> {
        self.active().map(|(_, m)| m.template).collect()
    }

    /// Run the availability matcher for one template at `loc`.
    pub fn eligibility(
        &self,
        template: TemplateId,
        loc: &LocationContext<'_>,
    ) -> Result<(), Ineligible> {
        let Some(t) = self.catalog.get(template) else {
            return Err(Ineligible::UnknownTemplate);
        };
        let running = self.running_templates();
        let ctx = MatchContext {
            running: &running,
            log: &self.log,
            host: self.host(),
        };
        availability::check(template, t, loc, &ctx)
    }

    /// Map markers of every active mission.
    pub fn system_markers(&self) -> Vec<(MissionId, Marker)> {
        self.active()
            .filter_map(|(_, m)| m.marker().map(|marker| (m.id, marker)))
            .collect()
    }

    // ── Instantiation ──

    fn gen_id(&mut self) -> MissionId {
        loop {
            self.last_id = self.last_id.wrapping_add(1);
            let id = self.last_id;
            if id != 0 && self.slot_of(id).is_none() {
                return id;
            }
        }
    }

    fn unique_blocked(&self, mission: &Mission) -> bool {
        let Some(template) = self.catalog.get(mission.template) else {
            return false;
        };
        template.unique
            && (self.log.is_done(&template.name)
                || self
                    .active()
                    .any(|(_, m)| m.template == mission.template && m.id != mission.id))
    }

    fn template_name(&self, template: TemplateId) -> String {
        self.catalog
            .get(template)
            .map_or_else(|| format!("#{}", template.0), |t| t.name.clone())
    }

    /// Create a mission from a template, optionally running its `create`
    /// entry point. A mission that finishes or fails during `create` is
    /// cleaned up and reported as an error.
    pub fn instantiate(&mut self, template: TemplateId, create: bool) -> Result<Mission, MissionError> {
        let script = match self.catalog.get(template) {
            Some(t) => t.script.clone(),
            None => return Err(MissionError::UnknownTemplate(format!("#{}", template.0))),
        };

        let id = self.gen_id();
        let state = MissionState::shared();
        let binding = ScriptBinding {
            mission: id,
            state: state.clone(),
            hold: self.hold.clone(),
        };
        let env = self.host.load(&script, binding)?;
        let mut mission = Mission::new(id, template, state, env, self.hold.clone());

        if create {
            match self.run_entry(&mut mission, "create", &[]) {
                Ok(RunOutcome::Finished { .. }) => {
                    let name = self.template_name(template);
                    self.cleanup(&mut mission);
                    return Err(MissionError::Rejected(name));
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!(
                        "Mission '{}' failed in create: {}",
                        self.template_name(template),
                        e
                    );
                    self.cleanup(&mut mission);
                    return Err(e);
                }
            }
        }
        Ok(mission)
    }

    /// Run an entry point and apply everything the script asked for.
    fn run_entry(
        &mut self,
        mission: &mut Mission,
        entry: &str,
        args: &[ScriptValue],
    ) -> Result<RunOutcome, MissionError> {
        let may_accept = self.free_slot().is_some() && !self.unique_blocked(mission);
        {
            let mut state = mission.state.borrow_mut();
            state.can_accept = state.accepted || may_accept;
        }

        let result = mission.call(entry, args);

        let accepted = {
            let mut state = mission.state.borrow_mut();
            state.can_accept = false;
            state.accepted
        };
        if accepted && mission.status == MissionStatus::Candidate {
            mission.status = MissionStatus::Accepted;
        }

        let finish = self.apply_requests(mission);
        if let Some(completed) = finish {
            if completed {
                let name = self.template_name(mission.template);
                if self.log.mark_done(&name) {
                    log::info!("Mission '{}' completed", name);
                }
            }
            return Ok(RunOutcome::Finished { completed });
        }

        match result? {
            CallReturn::Deferred => Ok(RunOutcome::Deferred),
            CallReturn::Value(_) => Ok(RunOutcome::Continue),
        }
    }

    /// Carry out queued script requests. Returns the finish flag if the
    /// script ended the mission. A candidate only gets to finish; its other
    /// requests wait until it is accepted.
    fn apply_requests(&mut self, mission: &mut Mission) -> Option<bool> {
        let mut requests = mission.state.borrow_mut().take_requests();
        if mission.status == MissionStatus::Candidate {
            let mut finish = None;
            for request in requests {
                match request {
                    ScriptRequest::Finish { completed } => finish = Some(completed),
                    other => mission.pending.push(other),
                }
            }
            return finish;
        }
        if !mission.pending.is_empty() {
            let mut queued = std::mem::take(&mut mission.pending);
            queued.append(&mut requests);
            requests = queued;
        }
        let priority = self
            .catalog
            .get(mission.template)
            .map_or(crate::catalog::DEFAULT_PRIORITY, |t| t.availability.priority);

        let mut finish = None;
        for request in requests {
            match request {
                ScriptRequest::Hook { event, callback } => {
                    self.hooks.register(mission.id, &event, &callback);
                }
                ScriptRequest::OsdCreate { title, items } => {
                    let old = mission.state.borrow_mut().osd.take();
                    if let Some(old) = old {
                        self.osd.destroy(old);
                    }
                    let id = self.osd.create(&title, items, priority);
                    mission.state.borrow_mut().osd = Some(id);
                }
                ScriptRequest::OsdActive(item) => {
                    let osd = mission.state.borrow().osd;
                    match osd {
                        Some(id) => {
                            self.osd.set_active(id, item);
                        }
                        None => log::warn!("Mission {} has no OSD to update", mission.id),
                    }
                }
                ScriptRequest::OsdDestroy => {
                    let osd = mission.state.borrow_mut().osd.take();
                    if let Some(id) = osd {
                        self.osd.destroy(id);
                    }
                }
                ScriptRequest::Finish { completed } => finish = Some(completed),
            }
        }
        finish
    }

    fn activate(&mut self, mut mission: Mission) -> Result<MissionId, MissionError> {
        if self.unique_blocked(&mission) {
            let name = self.template_name(mission.template);
            self.cleanup(&mut mission);
            return Err(MissionError::AlreadyActive(name));
        }
        let Some(slot) = self.free_slot() else {
            self.cleanup(&mut mission);
            return Err(MissionError::TooManyActive);
        };
        mission.status = MissionStatus::Running;
        let id = mission.id;
        log::debug!(
            "Mission '{}' ({}) running in slot {}",
            self.template_name(mission.template),
            id,
            slot
        );
        self.slots[slot] = Some(mission);
        Ok(id)
    }

    /// Keep a mission that accepted itself outside of [`Missions::accept`]
    /// (from `create`), otherwise clean it up.
    pub(crate) fn keep_if_accepted(&mut self, mut mission: Mission) -> Option<MissionId> {
        if !mission.accepted() {
            self.cleanup(&mut mission);
            return None;
        }
        match self.activate(mission) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("Self-accepted mission dropped: {}", e);
                None
            }
        }
    }

    // ── Player actions ──

    /// Offer a candidate to the player. The template's `accept` entry point
    /// decides; calling `misn.accept()` claims a slot.
    pub fn accept(&mut self, mut candidate: Mission) -> Result<MissionId, Rejected> {
        if self.free_slot().is_none() {
            return Err(Rejected {
                error: MissionError::TooManyActive,
                candidate: Some(candidate),
            });
        }
        if self.unique_blocked(&candidate) {
            let name = self.template_name(candidate.template);
            return Err(Rejected {
                error: MissionError::AlreadyActive(name),
                candidate: Some(candidate),
            });
        }

        match self.run_entry(&mut candidate, "accept", &[]) {
            Err(error) => {
                log::warn!("Mission accept failed: {}", error);
                self.cleanup(&mut candidate);
                Err(Rejected {
                    error,
                    candidate: None,
                })
            }
            Ok(RunOutcome::Finished { .. }) => {
                let name = self.template_name(candidate.template);
                self.cleanup(&mut candidate);
                Err(Rejected {
                    error: MissionError::Rejected(name),
                    candidate: None,
                })
            }
            Ok(_) if !candidate.accepted() => {
                let name = self.template_name(candidate.template);
                Err(Rejected {
                    error: MissionError::Declined(name),
                    candidate: Some(candidate),
                })
            }
            Ok(_) => self.activate(candidate).map_err(|error| Rejected {
                error,
                candidate: None,
            }),
        }
    }

    /// Throw away a candidate that was never accepted.
    pub fn discard(&mut self, mut candidate: Mission) {
        self.cleanup(&mut candidate);
    }

    /// Abort the mission in `slot`. Its `abort` entry point runs first when
    /// defined; returning `misn.DEFER` keeps the mission alive.
    pub fn abort(&mut self, slot: usize) -> Result<AbortOutcome, MissionError> {
        let mut mission = self
            .slots
            .get_mut(slot)
            .and_then(Option::take)
            .ok_or(MissionError::EmptySlot(slot))?;

        let outcome = if mission.has_entry("abort") {
            self.run_entry(&mut mission, "abort", &[])
                .unwrap_or_else(|e| {
                    log::warn!("Mission {} abort failed: {}", mission.id, e);
                    RunOutcome::Continue
                })
        } else {
            RunOutcome::Continue
        };

        if outcome == RunOutcome::Deferred {
            self.slots[slot] = Some(mission);
            return Ok(AbortOutcome::Deferred);
        }
        self.cleanup(&mut mission);
        Ok(AbortOutcome::Cleaned)
    }

    pub fn abort_by_id(&mut self, id: MissionId) -> Result<AbortOutcome, MissionError> {
        let slot = self.slot_of(id).ok_or(MissionError::UnknownMission(id))?;
        self.abort(slot)
    }

    /// Abort whichever active mission owns `cargo` (it was jettisoned).
    pub fn abort_cargo_owner(&mut self, cargo: CargoId) -> Option<AbortOutcome> {
        let slot = self
            .active()
            .find(|(_, m)| m.state.borrow().cargo.contains(&cargo))
            .map(|(i, _)| i)?;
        self.abort(slot).ok()
    }

    // ── Cargo ──

    pub fn link_cargo(&mut self, id: MissionId, cargo: CargoId) -> Result<bool, MissionError> {
        let slot = self.slot_of(id).ok_or(MissionError::UnknownMission(id))?;
        let linked = self.slots[slot]
            .as_ref()
            .is_some_and(|m| m.state.borrow_mut().link_cargo(cargo));
        Ok(linked)
    }

    /// Unlink cargo from a mission. Unlinking twice is a no-op.
    pub fn unlink_cargo(&mut self, id: MissionId, cargo: CargoId) -> Result<bool, MissionError> {
        let slot = self.slot_of(id).ok_or(MissionError::UnknownMission(id))?;
        let unlinked = self.slots[slot]
            .as_ref()
            .is_some_and(|m| m.state.borrow_mut().unlink_cargo(cargo));
        Ok(unlinked)
    }

    // ── Cleanup ──

    /// Tear a mission down. Safe to call more than once.
    pub fn cleanup(&mut self, mission: &mut Mission) {
        if mission.is_cleaned() {
            return;
        }

        let hooks = self.hooks.unregister_owner(mission.id);
        let (cargo, osd) = {
            let mut state = mission.state.borrow_mut();
            (std::mem::take(&mut state.cargo), state.osd.take())
        };
        for c in cargo {
            if !self.hold.borrow_mut().remove_mission_cargo(c) {
                log::debug!("Cargo {} of mission {} already gone", c, mission.id);
            }
        }
        if let Some(osd) = osd {
            self.osd.destroy(osd);
        }
        log::debug!(
            "Mission {} cleaned up ({} hooks released)",
            mission.id,
            hooks
        );

        mission.env = None;
        *mission.state.borrow_mut() = MissionState::default();
        mission.id = 0;
        mission.status = MissionStatus::Cleaned;
    }

    pub fn cleanup_slot(&mut self, slot: usize) -> bool {
        match self.slots.get_mut(slot).and_then(Option::take) {
            Some(mut mission) => {
                self.cleanup(&mut mission);
                true
            }
            None => false,
        }
    }

    /// Clean up every active mission (new game, failed load).
    pub fn cleanup_all(&mut self) {
        for slot in 0..self.slots.len() {
            self.cleanup_slot(slot);
        }
    }

    // ── Running ──

    /// Run `entry` on the mission in `slot`. A mission that finishes is
    /// cleaned up and its slot freed.
    fn run_slot(
        &mut self,
        slot: usize,
        entry: &str,
        args: &[ScriptValue],
    ) -> Result<RunOutcome, MissionError> {
        let mut mission = self
            .slots
            .get_mut(slot)
            .and_then(Option::take)
            .ok_or(MissionError::EmptySlot(slot))?;

        let result = self.run_entry(&mut mission, entry, args);
        if matches!(result, Ok(RunOutcome::Finished { .. })) {
            self.cleanup(&mut mission);
        } else {
            self.slots[slot] = Some(mission);
        }
        result
    }

    /// Advance every timer of every active mission by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        for slot in 0..self.slots.len() {
            for timer in 0..TIMER_SLOTS {
                let fired = match &self.slots[slot] {
                    Some(m) => m.state.borrow_mut().timers[timer].advance(dt),
                    None => break,
                };
                if let Some(callback) = fired {
                    if let Err(e) = self.run_slot(slot, &callback, &[]) {
                        log::warn!("Timer '{}' in slot {} failed: {}", callback, slot, e);
                    }
                }
            }
        }
    }

    /// Dispatch a game event to every running mission hooked to it.
    /// Returns how many callbacks ran.
    pub fn fire_hook(&mut self, event: &str, args: &[ScriptValue]) -> usize {
        let mut ran = 0;
        for (owner, callback) in self.hooks.listeners(event) {
            let Some(slot) = self.slot_of(owner) else {
                continue;
            };
            ran += 1;
            if let Err(e) = self.run_slot(slot, &callback, args) {
                log::warn!("Hook '{}' -> {} failed: {}", event, callback, e);
            }
        }
        ran
    }

    // ── Save/Load ──

    fn save_mission(&self, mission: &Mission) -> Option<SavedMission> {
        let template = self.catalog.get(mission.template)?;
        let limit = self.config.persist_depth_limit;

        let lua = match &mission.env {
            Some(env) => match env.snapshot_globals(SAVE_MARKER, limit) {
                Ok(globals) => persist_globals(&globals, limit),
                Err(e) => {
                    log::warn!("Mission '{}' script state not saved: {}", template.name, e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let state = mission.state.borrow();
        let timers = state
            .armed_timers()
            .filter_map(|(slot, t)| {
                t.callback.clone().map(|callback| SavedTimer {
                    slot,
                    callback,
                    remaining: t.remaining,
                })
            })
            .collect();
        let osd = state.osd.and_then(|id| self.osd.get(id)).map(|o| SavedOsd {
            title: o.title.clone(),
            items: o.items.clone(),
            active: o.active,
        });
        let hooks = self
            .hooks
            .owned_by(mission.id)
            .into_iter()
            .map(|(event, callback)| SavedHook { event, callback })
            .collect();

        Some(SavedMission {
            template: template.name.clone(),
            id: mission.id,
            title: state.title.clone(),
            description: state.description.clone(),
            reward: state.reward.clone(),
            npc: state.npc.clone(),
            portrait: state.portrait.clone(),
            marker: state.marker.clone(),
            cargo: state.cargo.clone(),
            timers,
            osd,
            hooks,
            lua,
        })
    }

    /// Snapshot the completion log and every active mission.
    pub fn save_active(&self) -> MissionsSave {
        MissionsSave {
            version: SAVE_VERSION,
            completed: self.log.iter().map(String::from).collect(),
            missions: self
                .active()
                .filter_map(|(_, m)| self.save_mission(m))
                .collect(),
        }
    }

    fn restore(&mut self, template: TemplateId, saved: &SavedMission) -> Result<Mission, MissionError> {
        let (script, priority) = match self.catalog.get(template) {
            Some(t) => (t.script.clone(), t.availability.priority),
            None => return Err(MissionError::UnknownTemplate(saved.template.clone())),
        };

        let id = if saved.id == 0 || self.slot_of(saved.id).is_some() {
            log::warn!("Saved mission '{}' has a clashing id {}", saved.template, saved.id);
            self.gen_id()
        } else {
            saved.id
        };

        let state = MissionState::shared();
        let binding = ScriptBinding {
            mission: id,
            state: state.clone(),
            hold: self.hold.clone(),
        };
        let mut env = self.host.load(&script, binding)?;

        let limit = self.config.persist_depth_limit;
        for (key, value) in unpersist_nodes(&saved.lua, &self.universe, limit) {
            if let Err(e) = env.set_global(&key, &value) {
                log::warn!("Mission '{}' global not restored: {}", saved.template, e);
            }
        }

        {
            let mut s = state.borrow_mut();
            s.title = saved.title.clone();
            s.description = saved.description.clone();
            s.reward = saved.reward.clone();
            s.npc = saved.npc.clone();
            s.portrait = saved.portrait.clone();
            s.marker = saved.marker.clone();
            s.cargo = saved.cargo.clone();
            s.accepted = true;
            for t in &saved.timers {
                if !s.set_timer(t.slot, &t.callback, t.remaining) {
                    log::warn!(
                        "Mission '{}' timer {} ('{}') not restored",
                        saved.template,
                        t.slot,
                        t.callback
                    );
                }
            }
        }

        if let Some(osd) = &saved.osd {
            let osd_id = self.osd.create(&osd.title, osd.items.clone(), priority);
            if osd.active > 0 {
                self.osd.set_active(osd_id, osd.active);
            }
            state.borrow_mut().osd = Some(osd_id);
        }
        for hook in &saved.hooks {
            self.hooks.register(id, &hook.event, &hook.callback);
        }

        self.last_id = self.last_id.max(id);
        let mut mission = Mission::new(id, template, state, env, self.hold.clone());
        mission.status = MissionStatus::Running;
        Ok(mission)
    }

    /// Replace every active mission with the ones in `save`. Returns how
    /// many were restored.
    pub fn load_active(&mut self, save: &MissionsSave) -> usize {
        self.cleanup_all();
        self.log.clear();
        for name in &save.completed {
            self.log.mark_done(name);
        }

        let mut restored = 0;
        for saved in &save.missions {
            let Some(template) = self.catalog.lookup(&saved.template) else {
                log::warn!("Mission '{}' from saved game not found in catalog - skipping", saved.template);
                continue;
            };
            let Some(slot) = self.free_slot() else {
                log::warn!("Too many saved missions - dropping '{}'", saved.template);
                break;
            };
            match self.restore(template, saved) {
                Ok(mission) => {
                    self.slots[slot] = Some(mission);
                    restored += 1;
                }
                Err(e) => log::warn!("Mission '{}' not restored: {}", saved.template, e),
            }
        }
        log::info!("Restored {} missions", restored);
        restored
    }

    /// Write the mission section of a save.
    pub fn save<W: Write>(&self, writer: W, format: SaveFormat) -> Result<(), SaveError> {
        format.encode(writer, &self.save_active())
    }

    /// Read the mission section of a save. A section that cannot be decoded
    /// leaves no active missions behind.
    pub fn load<R: Read>(&mut self, reader: R, format: SaveFormat) -> Result<usize, SaveError> {
        match format.decode(reader) {
            Ok(save) => Ok(self.load_active(&save)),
            Err(e) => {
                log::warn!("Mission save unreadable: {}", e);
                self.cleanup_all();
                Err(e)
            }
        }
    }
}
