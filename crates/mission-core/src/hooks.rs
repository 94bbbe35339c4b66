//! Hook registry - binds game events to mission script callbacks
//!
//! Missions subscribe to named game events (`land`, `jump`, `enter`, ...)
//! with `hook.add`. When the game fires an event, every registered callback
//! is run in registration order.

use serde::{Deserialize, Serialize};

use crate::mission::MissionId;

/// Unique hook handle
pub type HookId = u32;

/// The contract the lifecycle manager uses to talk to the game's hook system.
pub trait HookDispatcher {
    /// Bind `callback` of mission `owner` to `event`.
    fn register(&mut self, owner: MissionId, event: &str, callback: &str) -> HookId;

    /// Drop every hook owned by `owner`. Returns how many were removed.
    fn unregister_owner(&mut self, owner: MissionId) -> usize;

    /// Missions and callbacks listening to `event`, in registration order.
    fn listeners(&self, event: &str) -> Vec<(MissionId, String)>;

    /// `(event, callback)` pairs registered by `owner`.
    fn owned_by(&self, owner: MissionId) -> Vec<(String, String)>;
}

/// A single event subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    /// Unique hook ID
    pub id: HookId,
    /// Mission that owns this hook
    pub owner: MissionId,
    /// Event name
    pub event: String,
    /// Global function to call in the owner's environment
    pub callback: String,
}

/// In-process hook store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookRegistry {
    hooks: Vec<Hook>,
    next_id: HookId,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn get(&self, id: HookId) -> Option<&Hook> {
        self.hooks.iter().find(|h| h.id == id)
    }

    pub fn remove(&mut self, id: HookId) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|h| h.id != id);
        self.hooks.len() != before
    }
}

impl HookDispatcher for HookRegistry {
    fn register(&mut self, owner: MissionId, event: &str, callback: &str) -> HookId {
        self.next_id = self.next_id.wrapping_add(1).max(1);
        let id = self.next_id;
        self.hooks.push(Hook {
            id,
            owner,
            event: event.to_string(),
            callback: callback.to_string(),
        });
        log::debug!("Hook {} registered: mission {} on '{}' -> {}", id, owner, event, callback);
        id
    }

    fn unregister_owner(&mut self, owner: MissionId) -> usize {
        let before = self.hooks.len();
        self.hooks.retain(|h| h.owner != owner);
        before - self.hooks.len()
    }

    fn listeners(&self, event: &str) -> Vec<(MissionId, String)> {
        self.hooks
            .iter()
            .filter(|h| h.event == event)
            .map(|h| (h.owner, h.callback.clone()))
            .collect()
    }

    fn owned_by(&self, owner: MissionId) -> Vec<(String, String)> {
        self.hooks
            .iter()
            .filter(|h| h.owner == owner)
            .map(|h| (h.event.clone(), h.callback.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listeners_in_registration_order() {
        let mut hooks = HookRegistry::new();
        hooks.register(1, "land", "on_land");
        hooks.register(2, "jump", "on_jump");
        hooks.register(3, "land", "arrived");

        let land = hooks.listeners("land");
        assert_eq!(land, vec![(1, "on_land".to_string()), (3, "arrived".to_string())]);
        assert!(hooks.listeners("takeoff").is_empty());
    }

    #[test]
    fn test_unregister_owner() {
        let mut hooks = HookRegistry::new();
        hooks.register(1, "land", "a");
        hooks.register(1, "jump", "b");
        hooks.register(2, "land", "c");

        assert_eq!(hooks.unregister_owner(1), 2);
        assert_eq!(hooks.unregister_owner(1), 0);
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks.owned_by(2), vec![("land".to_string(), "c".to_string())]);
    }

    #[test]
    fn test_hook_ids_are_unique() {
        let mut hooks = HookRegistry::new();
        let a = hooks.register(1, "land", "a");
        let b = hooks.register(1, "land", "a");
        assert_ne!(a, b);
        assert!(hooks.remove(a));
        assert!(!hooks.remove(a));
        assert!(hooks.get(b).is_some());
    }
}
