//! Availability matcher - decides whether a template may be offered here.
//!
//! Checks run in a fixed order and stop at the first failure: planet,
//! system, faction, uniqueness, scripted condition, prerequisite.

use std::collections::HashSet;

use crate::catalog::{MissionTemplate, TemplateId};
use crate::mission::MissionLog;
use crate::script::ScriptHost;
use crate::universe::FactionId;

/// Where the player currently is.
#[derive(Debug, Clone, Copy)]
pub struct LocationContext<'a> {
    /// Faction owning the current planet
    pub faction: FactionId,
    pub planet: &'a str,
    pub system: &'a str,
}

/// Player state the matcher reads.
pub struct MatchContext<'a> {
    /// Templates with a mission currently in an active slot
    pub running: &'a HashSet<TemplateId>,
    pub log: &'a MissionLog,
    pub host: &'a dyn ScriptHost,
}

/// The first check a template failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    Planet,
    System,
    Faction,
    Unique,
    Condition,
    Prerequisite,
    /// The id does not name a catalog template.
    UnknownTemplate,
}

pub fn check(
    id: TemplateId,
    template: &MissionTemplate,
    loc: &LocationContext<'_>,
    ctx: &MatchContext<'_>,
) -> Result<(), Ineligible> {
    let avail = &template.availability;

    if avail.planet.as_deref().is_some_and(|p| p != loc.planet) {
        return Err(Ineligible::Planet);
    }
    if avail.system.as_deref().is_some_and(|s| s != loc.system) {
        return Err(Ineligible::System);
    }
    if avail
        .factions
        .as_ref()
        .is_some_and(|f| !f.contains(&loc.faction))
    {
        return Err(Ineligible::Faction);
    }
    if template.unique && (ctx.running.contains(&id) || ctx.log.is_done(&template.name)) {
        return Err(Ineligible::Unique);
    }
    if let Some(cond) = &avail.condition {
        match ctx.host.check_condition(cond, ctx.log) {
            Ok(true) => {}
            Ok(false) => return Err(Ineligible::Condition),
            Err(e) => {
                log::warn!("Mission '{}' condition failed: {}", template.name, e);
                return Err(Ineligible::Condition);
            }
        }
    }
    if let Some(done) = &avail.prerequisite {
        if !ctx.log.is_done(done) {
            return Err(Ineligible::Prerequisite);
        }
    }
    Ok(())
}

pub fn matches(
    id: TemplateId,
    template: &MissionTemplate,
    loc: &LocationContext<'_>,
    ctx: &MatchContext<'_>,
) -> bool {
    check(id, template, loc, ctx).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Availability, MissionLocation, DEFAULT_PRIORITY};
    use crate::error::ScriptError;
    use crate::script::{ScriptBinding, ScriptEnv};
    use std::cell::Cell;

    /// Condition host that answers from a table and counts evaluations.
    struct FakeHost {
        calls: Cell<usize>,
    }

    impl ScriptHost for FakeHost {
        fn load(&self, script: &str, _: ScriptBinding) -> Result<Box<dyn ScriptEnv>, ScriptError> {
            Err(ScriptError::NotFound(script.to_string()))
        }

        fn check_condition(&self, condition: &str, _: &MissionLog) -> Result<bool, ScriptError> {
            self.calls.set(self.calls.get() + 1);
            match condition {
                "yes" => Ok(true),
                "no" => Ok(false),
                _ => Err(ScriptError::Runtime {
                    entry: "condition".into(),
                    message: "boom".into(),
                }),
            }
        }
    }

    fn template(unique: bool) -> MissionTemplate {
        MissionTemplate {
            name: "Patrol".into(),
            script: "patrol".into(),
            unique,
            availability: Availability {
                location: MissionLocation::Computer,
                chance: 100,
                planet: None,
                system: None,
                factions: None,
                condition: None,
                prerequisite: None,
                priority: DEFAULT_PRIORITY,
            },
        }
    }

    const HERE: LocationContext<'static> = LocationContext {
        faction: FactionId(0),
        planet: "PlanetX",
        system: "SysY",
    };

    #[test]
    fn test_filters_in_order() {
        let host = FakeHost { calls: Cell::new(0) };
        let running = HashSet::new();
        let log = MissionLog::new();
        let ctx = MatchContext { running: &running, log: &log, host: &host };

        let mut t = template(false);
        t.availability.planet = Some("Elsewhere".into());
        t.availability.condition = Some("yes".into());
        assert_eq!(check(TemplateId(0), &t, &HERE, &ctx), Err(Ineligible::Planet));
        // Short-circuit: the condition never ran.
        assert_eq!(host.calls.get(), 0);

        t.availability.planet = Some("PlanetX".into());
        t.availability.system = Some("Other".into());
        assert_eq!(check(TemplateId(0), &t, &HERE, &ctx), Err(Ineligible::System));

        t.availability.system = None;
        t.availability.factions = Some(vec![FactionId(1)]);
        assert_eq!(check(TemplateId(0), &t, &HERE, &ctx), Err(Ineligible::Faction));

        t.availability.factions = Some(vec![FactionId(1), FactionId(0)]);
        assert!(matches(TemplateId(0), &t, &HERE, &ctx));

        // A filter whose names all failed to resolve matches nowhere.
        t.availability.factions = Some(vec![]);
        assert_eq!(check(TemplateId(0), &t, &HERE, &ctx), Err(Ineligible::Faction));
    }

    #[test]
    fn test_unique_blocks_running_and_done() {
        let host = FakeHost { calls: Cell::new(0) };
        let t = template(true);
        let mut running = HashSet::new();
        let mut log = MissionLog::new();

        running.insert(TemplateId(0));
        let ctx = MatchContext { running: &running, log: &log, host: &host };
        assert_eq!(check(TemplateId(0), &t, &HERE, &ctx), Err(Ineligible::Unique));

        running.clear();
        log.mark_done("Patrol");
        let ctx = MatchContext { running: &running, log: &log, host: &host };
        assert_eq!(check(TemplateId(0), &t, &HERE, &ctx), Err(Ineligible::Unique));

        // Non-unique templates ignore both.
        assert!(matches(TemplateId(0), &template(false), &HERE, &ctx));
    }

    #[test]
    fn test_condition_error_counts_as_unmet() {
        let host = FakeHost { calls: Cell::new(0) };
        let running = HashSet::new();
        let log = MissionLog::new();
        let ctx = MatchContext { running: &running, log: &log, host: &host };

        let mut t = template(false);
        t.availability.condition = Some("no".into());
        assert_eq!(check(TemplateId(0), &t, &HERE, &ctx), Err(Ineligible::Condition));
        t.availability.condition = Some("syntax error".into());
        assert_eq!(check(TemplateId(0), &t, &HERE, &ctx), Err(Ineligible::Condition));
        t.availability.condition = Some("yes".into());
        assert!(matches(TemplateId(0), &t, &HERE, &ctx));
    }

    #[test]
    fn test_prerequisite_must_be_done() {
        let host = FakeHost { calls: Cell::new(0) };
        let running = HashSet::new();
        let mut log = MissionLog::new();
        let mut t = template(false);
        t.availability.prerequisite = Some("Tutorial".into());

        let ctx = MatchContext { running: &running, log: &log, host: &host };
        assert_eq!(check(TemplateId(0), &t, &HERE, &ctx), Err(Ineligible::Prerequisite));

        log.mark_done("Tutorial");
        let ctx = MatchContext { running: &running, log: &log, host: &host };
        assert!(matches(TemplateId(0), &t, &HERE, &ctx));
    }
}
