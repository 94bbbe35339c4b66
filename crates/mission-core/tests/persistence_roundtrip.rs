//! Save/load round trips of active missions, including their Lua state.

mod common;

use std::rc::Rc;

use common::{always, assert_same_table, fixture, fixture_with, here, universe};
use mission_core::catalog::MissionLocation;
use mission_core::mission::MarkerKind;
use mission_core::persistence::{NodeData, SaveFormat, SAVE_VERSION};
use mission_core::script::{ScriptKey, ScriptValue};
use mission_core::universe::{DomainRef, RefKind, Universe};

const CATALOG: &str = r#"{ "missions": [ {
    "name": "Courier",
    "lua": "courier",
    "flags": { "unique": true },
    "avail": { "location": "Computer", "chance": 100 }
} ] }"#;

const COURIER: &str = r#"
    mem = { __save = true }
    helper = { x = 1 }
    counter = 0

    function create()
        misn.setTitle("Courier")
        misn.setDesc("Bring the parcel to PlanetX.")
        misn.setReward("5000 credits")
        mem[1] = "number key"
        mem["1"] = "string key"
        mem.flag = true
        mem.off = false
        mem.count = 7
        mem.ratio = 2.0
        mem.half = 0.5
        mem.name = "parcel"
        mem.dest = planet.get("PlanetX")
        mem.sys = system.get("SysY")
        mem.owner = faction.get("Empire")
        mem.escort = ship.get("Llama")
        mem.nested = { a = { b = { c = "deep" } }, list = { 10, 20, 30 } }
        helper.x = 5
        counter = 3
    end

    function accept()
        if misn.accept() then
            misn.setMarker("SysY", "cargo")
            misn.osdCreate("Courier", { "Fly to SysY", "Land on PlanetX" })
            misn.osdActive(2)
            misn.timerStart("late", 30.0)
            hook.add("land", "landed")
        end
    end

    function late()
        counter = counter + 100
    end

    function landed()
        counter = counter + 1
    end
"#;

fn accepted_courier(universe: Rc<Universe>) -> common::Fixture {
    let mut fx = fixture_with(universe, CATALOG, &[("courier", COURIER)], 12);
    let loc = here(&fx.universe);
    let mut offers = fx
        .missions
        .gen_list(MissionLocation::Computer, &loc, &mut always());
    assert_eq!(offers.len(), 1);
    fx.missions.accept(offers.remove(0)).unwrap();
    fx
}

fn mem_of(fx: &common::Fixture) -> mission_core::script::ScriptTable {
    let mission = fx.missions.by_name("Courier").unwrap();
    match mission.global("mem").unwrap() {
        ScriptValue::Table(t) => t,
        other => panic!("mem is not a table: {:?}", other),
    }
}

fn roundtrip(format: SaveFormat) {
    let mut fx = accepted_courier(universe());
    fx.missions.update(10.0);
    let before = mem_of(&fx);
    let id = fx.missions.by_name("Courier").unwrap().id();

    let mut buf = Vec::new();
    fx.missions.save(&mut buf, format).unwrap();

    let mut fresh = fixture(CATALOG, &[("courier", COURIER)], 12);
    assert_eq!(fresh.missions.load(buf.as_slice(), format).unwrap(), 1);

    let after = mem_of(&fresh);
    assert_same_table(&before, &after);

    let mission = fresh.missions.by_name("Courier").unwrap();
    assert_eq!(mission.id(), id);
    assert!(mission.accepted());
    assert_eq!(mission.title().as_deref(), Some("Courier"));
    assert_eq!(mission.description().as_deref(), Some("Bring the parcel to PlanetX."));
    assert_eq!(mission.reward().as_deref(), Some("5000 credits"));
    let marker = mission.marker().unwrap();
    assert_eq!(marker.system, "SysY");
    assert_eq!(marker.kind, MarkerKind::Cargo);

    // Plain globals come back, unmarked tables keep their script defaults.
    assert_eq!(mission.global("counter").unwrap(), ScriptValue::Integer(3));
    let helper = mission.global("helper").unwrap();
    assert_eq!(
        helper.as_table().and_then(|t| t.get_str("x")),
        Some(&ScriptValue::Integer(1))
    );

    // Timer keeps its remaining time.
    let timers: Vec<(usize, f64, Option<String>)> = mission
        .state()
        .armed_timers()
        .map(|(slot, t)| (slot, t.remaining, t.callback.clone()))
        .collect();
    assert_eq!(timers, vec![(0, 20.0, Some("late".to_string()))]);

    let osd = mission.osd().unwrap();
    assert_eq!(fresh.missions.osd().title(osd), Some("Courier"));
    assert_eq!(
        fresh.missions.osd().items(osd).map(<[String]>::to_vec),
        Some(vec!["Fly to SysY".to_string(), "Land on PlanetX".to_string()])
    );
    assert_eq!(fresh.missions.osd().active(osd), Some(1));

    // Hooks are live again.
    assert_eq!(fresh.missions.fire_hook("land", &[]), 1);
    let mission = fresh.missions.by_name("Courier").unwrap();
    assert_eq!(mission.global("counter").unwrap(), ScriptValue::Integer(4));

    fresh.missions.update(20.0);
    let mission = fresh.missions.by_name("Courier").unwrap();
    assert_eq!(mission.global("counter").unwrap(), ScriptValue::Integer(104));
}

#[test]
fn json_roundtrip_restores_everything() {
    roundtrip(SaveFormat::Json);
}

#[test]
fn binary_roundtrip_restores_everything() {
    roundtrip(SaveFormat::Binary);
}

#[test]
fn saved_tree_keeps_value_kinds() {
    let fx = accepted_courier(universe());
    let save = fx.missions.save_active();
    assert_eq!(save.version, SAVE_VERSION);
    assert_eq!(save.missions.len(), 1);

    let lua = &save.missions[0].lua;
    let mem = lua.iter().find(|n| n.name == "mem").unwrap();
    let NodeData::Table(children) = &mem.data else {
        panic!("mem saved as {:?}", mem.data);
    };
    let find = |name: &str, keynum: bool| {
        children
            .iter()
            .find(|n| n.name == name && n.keynum == keynum)
            .map(|n| n.data.clone())
    };

    assert_eq!(find("1", true), Some(NodeData::Str("number key".into())));
    assert_eq!(find("1", false), Some(NodeData::Str("string key".into())));
    assert_eq!(find("flag", false), Some(NodeData::Bool('1')));
    assert_eq!(find("off", false), Some(NodeData::Bool('0')));
    assert_eq!(find("count", false), Some(NodeData::Number("7".into())));
    assert_eq!(find("ratio", false), Some(NodeData::Number("2.0".into())));
    assert_eq!(find("dest", false), Some(NodeData::Planet("PlanetX".into())));
    assert_eq!(find("sys", false), Some(NodeData::System("SysY".into())));
    assert_eq!(find("owner", false), Some(NodeData::Faction("Empire".into())));
    assert_eq!(find("escort", false), Some(NodeData::Ship("Llama".into())));

    // Only the marked table and plain values are written.
    assert!(lua.iter().any(|n| n.name == "counter"));
    assert!(!lua.iter().any(|n| n.name == "helper"));
    assert!(!lua.iter().any(|n| n.name == "misn"));
    assert!(!lua.iter().any(|n| n.name == "create"));
}

#[test]
fn number_and_string_keys_stay_apart() {
    let fx = accepted_courier(universe());
    let mut buf = Vec::new();
    fx.missions.save(&mut buf, SaveFormat::Json).unwrap();

    let mut fresh = fixture(CATALOG, &[("courier", COURIER)], 12);
    fresh.missions.load(buf.as_slice(), SaveFormat::Json).unwrap();
    let mem = mem_of(&fresh);
    assert_eq!(
        mem.get(&ScriptKey::Int(1)),
        Some(&ScriptValue::Str("number key".into()))
    );
    assert_eq!(
        mem.get(&ScriptKey::Str("1".into())),
        Some(&ScriptValue::Str("string key".into()))
    );
    assert_eq!(mem.get_str("ratio"), Some(&ScriptValue::Number(2.0)));
    assert_eq!(mem.get_str("count"), Some(&ScriptValue::Integer(7)));
    assert_eq!(
        mem.get_str("dest"),
        Some(&ScriptValue::Ref(DomainRef {
            kind: RefKind::Planet,
            name: "PlanetX".into()
        }))
    );
}

#[test]
fn vanished_reference_is_dropped_on_load() {
    let fx = accepted_courier(universe());
    let mut buf = Vec::new();
    fx.missions.save(&mut buf, SaveFormat::Json).unwrap();

    let smaller = Rc::new(
        Universe::from_json(
            r#"{
                "factions": ["Empire"],
                "systems": ["SysY"],
                "planets": [ { "name": "PlanetX", "system": "SysY", "faction": "Empire" } ],
                "ships": []
            }"#,
        )
        .unwrap(),
    );
    let mut fresh = fixture_with(smaller, CATALOG, &[("courier", COURIER)], 12);
    assert_eq!(fresh.missions.load(buf.as_slice(), SaveFormat::Json).unwrap(), 1);

    let mem = mem_of(&fresh);
    assert_eq!(mem.get_str("escort"), None);
    assert_eq!(mem.get_str("name"), Some(&ScriptValue::Str("parcel".into())));
}

#[test]
fn completion_log_is_saved() {
    let mut fx = accepted_courier(universe());
    fx.missions.log_mut().mark_done("Intro");
    let mut buf = Vec::new();
    fx.missions.save(&mut buf, SaveFormat::Binary).unwrap();

    let mut fresh = fixture(CATALOG, &[("courier", COURIER)], 12);
    fresh.missions.load(buf.as_slice(), SaveFormat::Binary).unwrap();
    assert!(fresh.missions.log().is_done("Intro"));
    assert_eq!(fresh.missions.log().len(), 1);
}

#[test]
fn unknown_template_is_skipped() {
    let fx = accepted_courier(universe());
    let mut buf = Vec::new();
    fx.missions.save(&mut buf, SaveFormat::Json).unwrap();

    let other = r#"{ "missions": [
        { "name": "Other", "lua": "other", "avail": { "location": "Bar", "chance": 10 } }
    ] }"#;
    let mut fresh = fixture(other, &[("other", "function create() end")], 12);
    assert_eq!(fresh.missions.load(buf.as_slice(), SaveFormat::Json).unwrap(), 0);
    assert_eq!(fresh.missions.active_count(), 0);
}

#[test]
fn corrupt_save_leaves_no_missions() {
    let mut fx = accepted_courier(universe());
    assert_eq!(fx.missions.active_count(), 1);

    assert!(fx
        .missions
        .load(&b"{ not a save"[..], SaveFormat::Json)
        .is_err());
    assert_eq!(fx.missions.active_count(), 0);
    assert!(fx.missions.osd().is_empty());
    assert!(fx.missions.hooks().listeners("land").is_empty());
}

#[test]
fn version_mismatch_is_rejected() {
    let mut fx = fixture(CATALOG, &[("courier", COURIER)], 12);
    let text = r#"{ "version": 99, "completed": [], "missions": [] }"#;
    assert!(fx
        .missions
        .load(text.as_bytes(), SaveFormat::Json)
        .is_err());
}

#[test]
fn endless_timer_does_not_spoil_the_save() {
    let catalog = r#"{ "missions": [
        { "name": "Steady", "lua": "steady", "avail": { "location": "Computer", "chance": 100 } },
        { "name": "Forever", "lua": "forever", "avail": { "location": "Computer", "chance": 100 } }
    ] }"#;
    let scripts = [
        (
            "steady",
            r#"function accept() if misn.accept() then misn.timerStart("t", 5.0) end end
               function t() end"#,
        ),
        (
            "forever",
            r#"function accept()
                   if misn.accept() then armed = misn.timerStart("t", math.huge) end
               end
               function t() end"#,
        ),
    ];
    let mut fx = fixture(catalog, &scripts, 12);
    let loc = here(&fx.universe);
    let offers = fx
        .missions
        .gen_list(MissionLocation::Computer, &loc, &mut always());
    assert_eq!(offers.len(), 2);
    for offer in offers {
        fx.missions.accept(offer).unwrap();
    }
    let forever = fx.missions.by_name("Forever").unwrap();
    assert_eq!(forever.global("armed").unwrap(), ScriptValue::Nil);
    assert_eq!(forever.state().armed_timers().count(), 0);

    let mut buf = Vec::new();
    fx.missions.save(&mut buf, SaveFormat::Json).unwrap();

    let mut fresh = fixture(catalog, &scripts, 12);
    assert_eq!(fresh.missions.load(buf.as_slice(), SaveFormat::Json).unwrap(), 2);
    let steady = fresh.missions.by_name("Steady").unwrap();
    assert_eq!(steady.state().armed_timers().count(), 1);
}
