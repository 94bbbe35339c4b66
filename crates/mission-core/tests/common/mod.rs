//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use mission_core::availability::LocationContext;
use mission_core::cargo::PlayerHold;
use mission_core::catalog::Catalog;
use mission_core::config::MissionConfig;
use mission_core::lifecycle::Missions;
use mission_core::lua::LuaHost;
use mission_core::script::{ScriptTable, ScriptValue};
use mission_core::universe::Universe;
use rand::rngs::mock::StepRng;

pub const UNIVERSE: &str = r#"{
    "factions": ["Empire", "Pirate"],
    "systems": ["SysY", "SysZ"],
    "planets": [
        { "name": "PlanetX", "system": "SysY", "faction": "Empire" },
        { "name": "Haven", "system": "SysZ", "faction": "Pirate" }
    ],
    "ships": ["Llama", "Hyena"]
}"#;

pub struct Fixture {
    pub missions: Missions,
    pub hold: Rc<RefCell<PlayerHold>>,
    pub universe: Rc<Universe>,
}

pub fn universe() -> Rc<Universe> {
    Rc::new(Universe::from_json(UNIVERSE).unwrap())
}

pub fn fixture_with(
    universe: Rc<Universe>,
    catalog_json: &str,
    scripts: &[(&str, &str)],
    max_active: usize,
) -> Fixture {
    let catalog = Catalog::from_json(catalog_json, &universe).unwrap();
    let host = LuaHost::in_memory(scripts.iter().copied(), Rc::clone(&universe)).unwrap();
    let hold = Rc::new(RefCell::new(PlayerHold::new()));
    let config = MissionConfig {
        max_active,
        ..Default::default()
    };
    let missions = Missions::new(
        Rc::new(catalog),
        Rc::clone(&universe),
        Box::new(host),
        hold.clone(),
        config,
    );
    Fixture {
        missions,
        hold,
        universe,
    }
}

pub fn fixture(catalog_json: &str, scripts: &[(&str, &str)], max_active: usize) -> Fixture {
    fixture_with(universe(), catalog_json, scripts, max_active)
}

/// Empire-owned PlanetX in SysY.
pub fn here(universe: &Universe) -> LocationContext<'static> {
    LocationContext {
        faction: universe.faction_id("Empire").unwrap(),
        planet: "PlanetX",
        system: "SysY",
    }
}

/// Every trial hits.
pub fn always() -> StepRng {
    StepRng::new(0, 0)
}

/// Every trial below 100% misses.
pub fn never() -> StepRng {
    StepRng::new(u64::MAX, 0)
}

/// Compare two tables ignoring iteration order.
pub fn assert_same_table(a: &ScriptTable, b: &ScriptTable) {
    assert_eq!(a.len(), b.len(), "table sizes differ: {:?} vs {:?}", a, b);
    for (key, value) in &a.entries {
        let other = b
            .get(key)
            .unwrap_or_else(|| panic!("missing key {:?} in {:?}", key, b));
        match (value, other) {
            (ScriptValue::Table(x), ScriptValue::Table(y)) => assert_same_table(x, y),
            _ => assert_eq!(value, other, "value of {:?} differs", key),
        }
    }
}
