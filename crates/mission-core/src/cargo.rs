//! Mission cargo in the player's hold.
//!
//! The mission core only tracks which cargo ids a mission has linked; the
//! cargo itself lives in the player's hold behind [`CargoHold`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

pub type CargoId = u32;

pub trait CargoHold {
    /// Load mission cargo, returning its id.
    fn add_mission_cargo(&mut self, commodity: &str, tonnes: u32) -> CargoId;

    /// Remove a mission cargo from the hold. Returns false if it was not there.
    fn remove_mission_cargo(&mut self, cargo: CargoId) -> bool;
}

/// The hold is shared between the game, the lifecycle manager and the
/// script API of every mission.
pub type SharedHold = Rc<RefCell<dyn CargoHold>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CargoItem {
    pub commodity: String,
    pub tonnes: u32,
}

/// Simple hold used by the harness and the tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerHold {
    items: BTreeMap<CargoId, CargoItem>,
    next_id: CargoId,
}

impl PlayerHold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, cargo: CargoId) -> bool {
        self.items.contains_key(&cargo)
    }

    pub fn get(&self, cargo: CargoId) -> Option<&CargoItem> {
        self.items.get(&cargo)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CargoHold for PlayerHold {
    fn add_mission_cargo(&mut self, commodity: &str, tonnes: u32) -> CargoId {
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.items.insert(
            self.next_id,
            CargoItem {
                commodity: commodity.to_string(),
                tonnes,
            },
        );
        self.next_id
    }

    fn remove_mission_cargo(&mut self, cargo: CargoId) -> bool {
        match self.items.remove(&cargo) {
            Some(item) => {
                log::debug!("Removed {} t of {} (cargo {})", item.tonnes, item.commodity, cargo);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_happens_once() {
        let mut hold = PlayerHold::new();
        let id = hold.add_mission_cargo("Food", 10);
        assert_eq!(hold.get(id).map(|c| c.tonnes), Some(10));
        assert!(hold.remove_mission_cargo(id));
        assert!(!hold.remove_mission_cargo(id));
        assert!(hold.is_empty());
    }
}
