//! Mission Headless Simulation Harness
//!
//! Validates the bundled mission data and drives the mission lifecycle
//! without a game client. Runs entirely in-process with scripts compiled
//! into the binary.
//!
//! Usage:
//!   cargo run -p mission-simtest
//!   cargo run -p mission-simtest -- --verbose

use std::cell::RefCell;
use std::rc::Rc;

use mission_core::availability::LocationContext;
use mission_core::cargo::PlayerHold;
use mission_core::catalog::{Catalog, MissionLocation};
use mission_core::config::MissionConfig;
use mission_core::lifecycle::{AbortOutcome, Missions};
use mission_core::lua::LuaHost;
use mission_core::mission::MissionStatus;
use mission_core::news::NewsFeed;
use mission_core::persistence::SaveFormat;
use mission_core::script::ScriptValue;
use mission_core::universe::Universe;
use rand::rngs::mock::StepRng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

// ── Bundled data (same files the game loads) ────────────────────────────
const UNIVERSE_JSON: &str = include_str!("../../../data/universe.json");
const CATALOG_JSON: &str = include_str!("../../../data/missions.json");
const CONFIG_JSON: &str = include_str!("../../../data/config.json");
const NEWS_LUA: &str = include_str!("../../../data/news.lua");

const SCRIPTS: &[(&str, &str)] = &[
    ("tutorial", include_str!("../../../data/missions/tutorial.lua")),
    ("cargo", include_str!("../../../data/missions/cargo.lua")),
    ("escort", include_str!("../../../data/missions/escort.lua")),
    ("bounty", include_str!("../../../data/missions/bounty.lua")),
];

/// Only the names, to cross-check the catalog independently of the parser.
#[derive(Debug, Deserialize)]
struct CatalogNames {
    missions: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    lua: String,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn check(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

struct World {
    missions: Missions,
    hold: Rc<RefCell<PlayerHold>>,
    universe: Rc<Universe>,
}

fn world(max_active: usize) -> Result<World, String> {
    let universe = Rc::new(Universe::from_json(UNIVERSE_JSON).map_err(|e| e.to_string())?);
    let catalog = Catalog::from_json(CATALOG_JSON, &universe).map_err(|e| e.to_string())?;
    let host = LuaHost::in_memory(SCRIPTS.iter().copied(), Rc::clone(&universe))
        .map_err(|e| e.to_string())?;
    let hold = Rc::new(RefCell::new(PlayerHold::new()));
    let config = MissionConfig {
        max_active,
        ..MissionConfig::from_json(CONFIG_JSON).map_err(|e| e.to_string())?
    };
    let missions = Missions::new(
        Rc::new(catalog),
        Rc::clone(&universe),
        Box::new(host),
        hold.clone(),
        config,
    );
    Ok(World {
        missions,
        hold,
        universe,
    })
}

fn place<'a>(universe: &'a Universe, planet: &str) -> Option<LocationContext<'a>> {
    let p = universe.planet(planet)?;
    let faction = universe.faction_id(p.faction.as_deref()?)?;
    Some(LocationContext {
        faction,
        planet: &p.name,
        system: &p.system,
    })
}

fn always() -> StepRng {
    StepRng::new(0, 0)
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    env_logger::Builder::from_default_env()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();
    println!("=== Mission Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Bundled data validation
    results.extend(validate_data(verbose));

    // 2. Mission list generation
    results.extend(validate_generation(verbose));

    // 3. Accept, deliver and complete
    results.extend(validate_cargo_run(verbose));

    // 4. One-shot missions and prerequisites
    results.extend(validate_tutorial_chain(verbose));

    // 5. Timers, hooks and deferred abort
    results.extend(validate_escort(verbose));

    // 6. Save and load
    results.extend(validate_save_load(verbose));

    // 7. News feed
    results.extend(validate_news(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Data ─────────────────────────────────────────────────────────────

fn validate_data(verbose: bool) -> Vec<TestResult> {
    println!("--- Bundled Data ---");
    let mut results = Vec::new();

    let config = MissionConfig::from_json(CONFIG_JSON);
    results.push(TestResult::check(
        "config_valid",
        config.as_ref().is_ok_and(|c| c.validate().is_ok()),
        match &config {
            Ok(c) => format!("{} slots, depth limit {}", c.max_active, c.persist_depth_limit),
            Err(e) => format!("config error: {}", e),
        },
    ));

    let universe = match Universe::from_json(UNIVERSE_JSON) {
        Ok(u) => u,
        Err(e) => {
            results.push(TestResult::check(
                "universe_parse",
                false,
                format!("JSON parse error: {}", e),
            ));
            return results;
        }
    };
    results.push(TestResult::check(
        "universe_parse",
        universe.planet_count() > 0 && universe.faction_count() > 0,
        format!(
            "{} planets, {} factions",
            universe.planet_count(),
            universe.faction_count()
        ),
    ));

    let catalog = match Catalog::from_json(CATALOG_JSON, &universe) {
        Ok(c) => c,
        Err(e) => {
            results.push(TestResult::check("catalog_parse", false, e.to_string()));
            return results;
        }
    };
    let names: CatalogNames = match serde_json::from_str(CATALOG_JSON) {
        Ok(n) => n,
        Err(e) => {
            results.push(TestResult::check("catalog_names", false, e.to_string()));
            return results;
        }
    };
    results.push(TestResult::check(
        "catalog_complete",
        catalog.len() == names.missions.len(),
        format!("{}/{} templates parsed", catalog.len(), names.missions.len()),
    ));

    let missing: Vec<&str> = names
        .missions
        .iter()
        .filter(|m| !SCRIPTS.iter().any(|(s, _)| *s == m.lua))
        .map(|m| m.name.as_str())
        .collect();
    results.push(TestResult::check(
        "catalog_scripts_present",
        missing.is_empty(),
        if missing.is_empty() {
            "every template has a script".to_string()
        } else {
            format!("missing scripts for: {}", missing.join(", "))
        },
    ));

    let bad_places: Vec<&str> = catalog
        .iter()
        .filter(|(_, t)| {
            t.availability
                .planet
                .as_deref()
                .is_some_and(|p| universe.planet(p).is_none())
                || t.availability
                    .system
                    .as_deref()
                    .is_some_and(|s| !universe.has_system(s))
        })
        .map(|(_, t)| t.name.as_str())
        .collect();
    results.push(TestResult::check(
        "catalog_places_exist",
        bad_places.is_empty(),
        format!("{} templates with unknown places", bad_places.len()),
    ));

    if verbose {
        for (_, t) in catalog.iter() {
            println!(
                "  {} [{:?}, chance {}, priority {}]",
                t.name, t.availability.location, t.availability.chance, t.availability.priority
            );
        }
    }

    results
}

// ── 2. Generation ───────────────────────────────────────────────────────

fn validate_generation(verbose: bool) -> Vec<TestResult> {
    println!("--- Mission Generation ---");
    let mut results = Vec::new();
    let mut w = match world(12) {
        Ok(w) => w,
        Err(e) => {
            results.push(TestResult::check("generation_world", false, e));
            return results;
        }
    };
    let Some(halir) = place(&w.universe, "Halir") else {
        results.push(TestResult::check("generation_place", false, "Halir not found"));
        return results;
    };

    let list = w
        .missions
        .gen_list(MissionLocation::Computer, &halir, &mut always());
    results.push(TestResult::check(
        "generation_trials",
        list.len() == 3,
        format!("chance 360 gave {} candidates with a certain roll", list.len()),
    ));
    results.push(TestResult::check(
        "generation_untracked",
        w.missions.active_count() == 0
            && list.iter().all(|m| m.status() == MissionStatus::Candidate),
        "candidates do not occupy slots",
    ));
    for m in list {
        w.missions.discard(m);
    }

    // Average over many seeded rolls: 3 trials at 60%.
    let mut rng = StdRng::seed_from_u64(42);
    let rounds = 500;
    let mut total = 0;
    for _ in 0..rounds {
        let list = w
            .missions
            .gen_list(MissionLocation::Computer, &halir, &mut rng);
        total += list.len();
        for m in list {
            w.missions.discard(m);
        }
    }
    let mean = total as f64 / rounds as f64;
    if verbose {
        println!("  mean cargo offers per visit: {:.2}", mean);
    }
    results.push(TestResult::check(
        "generation_mean",
        (1.6..=2.0).contains(&mean),
        format!("mean {:.2} offers (expected ~1.8)", mean),
    ));

    // Pirate space gets no Empire work.
    if let Some(haven) = place(&w.universe, "New Haven") {
        let list = w
            .missions
            .gen_list(MissionLocation::Computer, &haven, &mut always());
        results.push(TestResult::check(
            "generation_faction_filter",
            list.is_empty(),
            format!("{} cargo offers on a pirate world", list.len()),
        ));
        let bar = w.missions.gen_list(MissionLocation::Bar, &haven, &mut always());
        results.push(TestResult::check(
            "generation_system_filter",
            bar.len() == 1 && bar[0].npc().as_deref() == Some("Shady Figure"),
            format!("{} bar offers in Qex", bar.len()),
        ));
        for m in bar {
            w.missions.discard(m);
        }
    }

    results
}

// ── 3. Cargo run ────────────────────────────────────────────────────────

fn validate_cargo_run(_verbose: bool) -> Vec<TestResult> {
    println!("--- Cargo Run ---");
    let mut results = Vec::new();
    let mut w = match world(12) {
        Ok(w) => w,
        Err(e) => {
            results.push(TestResult::check("cargo_world", false, e));
            return results;
        }
    };
    let Some(halir) = place(&w.universe, "Halir") else {
        return results;
    };

    let mut list = w
        .missions
        .gen_list(MissionLocation::Computer, &halir, &mut always());
    let Some(candidate) = list.pop() else {
        results.push(TestResult::check("cargo_offered", false, "no cargo offers"));
        return results;
    };
    for m in list {
        w.missions.discard(m);
    }

    let id = match w.missions.accept(candidate) {
        Ok(id) => id,
        Err(rejected) => {
            results.push(TestResult::check(
                "cargo_accept",
                false,
                rejected.error.to_string(),
            ));
            return results;
        }
    };
    results.push(TestResult::check(
        "cargo_accept",
        w.missions.active_count() == 1 && w.hold.borrow().len() == 1,
        format!("mission {} accepted, {} items in hold", id, w.hold.borrow().len()),
    ));

    let dest = w
        .missions
        .by_id(id)
        .and_then(|m| m.global("mem").ok())
        .and_then(|mem| match mem.as_table().and_then(|t| t.get_str("dest")) {
            Some(ScriptValue::Ref(r)) => Some(r.name.clone()),
            _ => None,
        });
    let Some(dest) = dest else {
        results.push(TestResult::check("cargo_destination", false, "no destination saved"));
        return results;
    };

    // Landing elsewhere does nothing.
    w.missions
        .fire_hook("land", &[ScriptValue::from("Caladan-not-a-destination")]);
    results.push(TestResult::check(
        "cargo_wrong_planet",
        w.missions.by_id(id).is_some(),
        "mission survives landing elsewhere",
    ));

    w.missions.fire_hook("land", &[ScriptValue::Str(dest.clone())]);
    results.push(TestResult::check(
        "cargo_delivered",
        w.missions.active_count() == 0
            && w.hold.borrow().is_empty()
            && w.missions.log().is_done("Cargo"),
        format!("delivered to {}", dest),
    ));
    results.push(TestResult::check(
        "cargo_osd_cleared",
        w.missions.osd().is_empty(),
        format!("{} OSD windows left", w.missions.osd().len()),
    ));

    results
}

// ── 4. Tutorial chain ───────────────────────────────────────────────────

fn validate_tutorial_chain(_verbose: bool) -> Vec<TestResult> {
    println!("--- Tutorial Chain ---");
    let mut results = Vec::new();
    let mut w = match world(12) {
        Ok(w) => w,
        Err(e) => {
            results.push(TestResult::check("tutorial_world", false, e));
            return results;
        }
    };
    let (Some(fist), Some(halir)) = (
        place(&w.universe, "Emperor's Fist"),
        place(&w.universe, "Halir"),
    ) else {
        return results;
    };

    let escort_before = w.missions.gen_list(MissionLocation::Bar, &halir, &mut always());
    results.push(TestResult::check(
        "escort_needs_tutorial",
        escort_before.is_empty(),
        format!("{} escort offers before the tutorial", escort_before.len()),
    ));

    let kept = w
        .missions
        .run_one_shot(MissionLocation::Land, &halir, &mut always());
    results.push(TestResult::check(
        "tutorial_planet_only",
        kept.is_empty(),
        "tutorial does not start on Halir",
    ));

    let kept = w
        .missions
        .run_one_shot(MissionLocation::Land, &fist, &mut always());
    results.push(TestResult::check(
        "tutorial_self_accepts",
        kept.len() == 1 && w.missions.osd().len() == 1,
        format!("{} one-shot missions kept", kept.len()),
    ));

    let again = w
        .missions
        .run_one_shot(MissionLocation::Land, &fist, &mut always());
    results.push(TestResult::check(
        "tutorial_unique",
        again.is_empty() && w.missions.active_count() == 1,
        "second landing does not duplicate it",
    ));

    w.missions.fire_hook("takeoff", &[]);
    results.push(TestResult::check(
        "tutorial_done",
        w.missions.log().is_done("Tutorial") && w.missions.active_count() == 0,
        "takeoff completes the tutorial",
    ));

    let escort = w.missions.gen_list(MissionLocation::Bar, &halir, &mut always());
    results.push(TestResult::check(
        "escort_unlocked",
        escort.len() == 1,
        format!("{} escort offers after the tutorial", escort.len()),
    ));

    results
}

// ── 5. Escort ───────────────────────────────────────────────────────────

fn escort_world() -> Result<(World, u32), String> {
    let mut w = world(12)?;
    w.missions.log_mut().mark_done("Tutorial");
    let halir = place(&w.universe, "Halir").ok_or("Halir not found")?;
    let mut list = w.missions.gen_list(MissionLocation::Bar, &halir, &mut always());
    let candidate = list.pop().ok_or("no escort offer")?;
    let id = w
        .missions
        .accept(candidate)
        .map_err(|r| r.error.to_string())?;
    Ok((w, id))
}

fn validate_escort(verbose: bool) -> Vec<TestResult> {
    println!("--- Escort ---");
    let mut results = Vec::new();

    // Running out of time fails the mission without logging it.
    match escort_world() {
        Ok((mut w, id)) => {
            for _ in 0..599 {
                w.missions.update(1.0);
            }
            let alive = w.missions.by_id(id).is_some();
            w.missions.update(1.0);
            results.push(TestResult::check(
                "escort_timeout",
                alive && w.missions.active_count() == 0 && !w.missions.log().is_done("Empire Escort"),
                "timer fires after 600s",
            ));
        }
        Err(e) => results.push(TestResult::check("escort_timeout", false, e)),
    }

    // Jump then land completes it.
    match escort_world() {
        Ok((mut w, id)) => {
            w.missions.fire_hook("jump", &[ScriptValue::from("Arcturus")]);
            let osd_step = w
                .missions
                .by_id(id)
                .and_then(|m| m.osd())
                .and_then(|o| w.missions.osd().active(o));
            w.missions.fire_hook("land", &[]);
            results.push(TestResult::check(
                "escort_complete",
                osd_step == Some(1) && w.missions.log().is_done("Empire Escort"),
                format!("OSD step {:?} before landing", osd_step),
            ));
        }
        Err(e) => results.push(TestResult::check("escort_complete", false, e)),
    }

    // Aborting mid-route defers until the next landing.
    match escort_world() {
        Ok((mut w, id)) => {
            w.missions.fire_hook("jump", &[ScriptValue::from("Arcturus")]);
            let outcome = w.missions.abort_by_id(id);
            if verbose {
                println!("  abort outcome: {:?}", outcome);
            }
            let deferred = matches!(outcome, Ok(AbortOutcome::Deferred));
            w.missions.fire_hook("land", &[]);
            results.push(TestResult::check(
                "escort_deferred_abort",
                deferred
                    && w.missions.active_count() == 0
                    && !w.missions.log().is_done("Empire Escort"),
                "abort defers, landing fails the mission",
            ));
        }
        Err(e) => results.push(TestResult::check("escort_deferred_abort", false, e)),
    }

    // Aborting before the jump is immediate.
    match escort_world() {
        Ok((mut w, id)) => {
            let outcome = w.missions.abort_by_id(id);
            results.push(TestResult::check(
                "escort_abort",
                matches!(outcome, Ok(AbortOutcome::Cleaned)) && w.missions.hooks().listeners("land").is_empty(),
                "abort before the jump cleans up",
            ));
        }
        Err(e) => results.push(TestResult::check("escort_abort", false, e)),
    }

    results
}

// ── 6. Save/Load ────────────────────────────────────────────────────────

fn validate_save_load(verbose: bool) -> Vec<TestResult> {
    println!("--- Save/Load ---");
    let mut results = Vec::new();

    for format in [SaveFormat::Json, SaveFormat::Binary] {
        let label = format!("{:?}", format).to_lowercase();
        let (mut w, id) = match escort_world() {
            Ok(v) => v,
            Err(e) => {
                results.push(TestResult::check(&format!("save_{}_setup", label), false, e));
                continue;
            }
        };
        w.missions.update(100.0);
        w.missions.fire_hook("jump", &[ScriptValue::from("Arcturus")]);

        let mut buf = Vec::new();
        if let Err(e) = w.missions.save(&mut buf, format) {
            results.push(TestResult::check(&format!("save_{}", label), false, e.to_string()));
            continue;
        }
        if verbose {
            println!("  {} save: {} bytes", label, buf.len());
        }

        let mut fresh = match world(12) {
            Ok(w) => w,
            Err(e) => {
                results.push(TestResult::check(&format!("load_{}", label), false, e));
                continue;
            }
        };
        let loaded = fresh.missions.load(buf.as_slice(), format);
        let restored = fresh.missions.by_id(id);
        let stage = restored
            .and_then(|m| m.global("mem").ok())
            .and_then(|mem| mem.as_table().and_then(|t| t.get_str("stage")).cloned());
        let remaining = restored.and_then(|m| {
            m.state()
                .armed_timers()
                .next()
                .map(|(_, t)| t.remaining)
        });
        results.push(TestResult::check(
            &format!("load_{}", label),
            matches!(loaded, Ok(1))
                && stage == Some(ScriptValue::Integer(2))
                && remaining == Some(500.0)
                && fresh.missions.log().is_done("Tutorial"),
            format!("stage {:?}, timer {:?}", stage, remaining),
        ));

        fresh.missions.fire_hook("land", &[]);
        results.push(TestResult::check(
            &format!("resume_{}", label),
            fresh.missions.log().is_done("Empire Escort"),
            "restored hooks finish the mission",
        ));
    }

    // A corrupt save leaves nothing half-loaded.
    match escort_world() {
        Ok((mut w, _)) => {
            let loaded = w.missions.load(&b"\x00\x01garbage"[..], SaveFormat::Binary);
            results.push(TestResult::check(
                "load_corrupt",
                loaded.is_err() && w.missions.active_count() == 0,
                "corrupt save clears active missions",
            ));
        }
        Err(e) => results.push(TestResult::check("load_corrupt", false, e)),
    }

    results
}

// ── 7. News ─────────────────────────────────────────────────────────────

fn validate_news(verbose: bool) -> Vec<TestResult> {
    println!("--- News ---");
    let mut results = Vec::new();
    let universe = match Universe::from_json(UNIVERSE_JSON) {
        Ok(u) => Rc::new(u),
        Err(e) => {
            results.push(TestResult::check("news_universe", false, e.to_string()));
            return results;
        }
    };

    match NewsFeed::new(NEWS_LUA, &universe).and_then(|feed| feed.generate(3)) {
        Ok(articles) => {
            if verbose {
                for a in &articles {
                    println!("  {}: {}", a.title, a.desc);
                }
            }
            results.push(TestResult::check(
                "news_generate",
                articles.len() == 4 && articles[0].title == mission_core::news::HEADLINE_TITLE,
                format!("{} articles", articles.len()),
            ));
        }
        Err(e) => results.push(TestResult::check("news_generate", false, e.to_string())),
    }

    results
}
