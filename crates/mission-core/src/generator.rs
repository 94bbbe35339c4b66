//! Mission list generator - rolls the templates offered at a place.

use std::cmp::Ordering;

use rand::Rng;

use crate::availability::LocationContext;
use crate::catalog::{MissionLocation, MissionTemplate, TemplateId};
use crate::error::MissionError;
use crate::lifecycle::Missions;
use crate::mission::{Mission, MissionId};

/// Probability of one trial. Only the last two digits count; `0` means
/// certain.
pub fn chance_fraction(chance: u32) -> f64 {
    let fraction = f64::from(chance % 100) / 100.0;
    if fraction == 0.0 {
        1.0
    } else {
        fraction
    }
}

/// Number of independent trials: one per full hundred, at least one.
pub fn trial_count(chance: u32) -> u32 {
    (chance / 100).max(1)
}

fn none_last(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Display ordering of a generated list.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateKey {
    pub priority: i32,
    pub npc: Option<String>,
    pub title: Option<String>,
}

impl CandidateKey {
    fn of(mission: &Mission, template: Option<&MissionTemplate>) -> Self {
        Self {
            priority: template.map_or(crate::catalog::DEFAULT_PRIORITY, |t| t.availability.priority),
            npc: mission.npc(),
            title: mission.title(),
        }
    }
}

/// Priority ascending, then NPC name, then title; missing names sort last.
pub fn compare_candidates(a: &CandidateKey, b: &CandidateKey) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| none_last(&a.npc, &b.npc))
        .then_with(|| none_last(&a.title, &b.title))
}

/// Result of one pass over the templates offered at a place.
#[derive(Debug, Default)]
struct Rolled {
    /// Hits still waiting for the player
    candidates: Vec<Mission>,
    /// Hits that accepted themselves in `create` and now hold a slot
    kept: Vec<MissionId>,
}

impl Missions {
    /// Run every trial for the templates offered at `place`, in catalog
    /// order, and call `create` on each hit. Each template is matched when
    /// it is reached, so missions started by earlier templates count.
    /// Self-accepted hits take their slot at once.
    fn roll<R: Rng>(
        &mut self,
        place: MissionLocation,
        loc: &LocationContext<'_>,
        rng: &mut R,
    ) -> Rolled {
        let offered: Vec<(TemplateId, u32, bool)> = self
            .catalog()
            .iter()
            .filter(|(_, t)| t.availability.location == place)
            .map(|(id, t)| (id, t.availability.chance, t.unique))
            .collect();

        let mut rolled = Rolled::default();
        for (template, chance, unique) in offered {
            if let Err(reason) = self.eligibility(template, loc) {
                log::debug!("Template #{} not available: {:?}", template.0, reason);
                continue;
            }

            let fraction = chance_fraction(chance);
            for _ in 0..trial_count(chance) {
                if rng.gen::<f64>() >= fraction {
                    continue;
                }
                let mission = match self.instantiate(template, true) {
                    Ok(mission) => mission,
                    Err(e) => {
                        log::debug!("Generated mission discarded: {}", e);
                        continue;
                    }
                };
                if mission.accepted() {
                    rolled.kept.extend(self.keep_if_accepted(mission));
                } else {
                    rolled.candidates.push(mission);
                }
                if unique && self.is_running(template) {
                    break;
                }
            }
        }
        rolled
    }

    /// Build the list of candidate missions shown at `place`, sorted for
    /// display. Missions that accepted themselves in `create` go straight
    /// into a slot instead.
    pub fn gen_list<R: Rng>(
        &mut self,
        place: MissionLocation,
        loc: &LocationContext<'_>,
        rng: &mut R,
    ) -> Vec<Mission> {
        let mut keyed: Vec<(CandidateKey, Mission)> = self
            .roll(place, loc, rng)
            .candidates
            .into_iter()
            .map(|m| (CandidateKey::of(&m, self.template_of(&m)), m))
            .collect();
        keyed.sort_by(|a, b| compare_candidates(&a.0, &b.0));
        keyed.into_iter().map(|(_, m)| m).collect()
    }

    /// Passive triggers (landing and the like): every hit runs `create` and
    /// is dropped again unless its script accepted itself. Returns the ids
    /// that stayed.
    pub fn run_one_shot<R: Rng>(
        &mut self,
        place: MissionLocation,
        loc: &LocationContext<'_>,
        rng: &mut R,
    ) -> Vec<MissionId> {
        let rolled = self.roll(place, loc, rng);
        for mut mission in rolled.candidates {
            self.cleanup(&mut mission);
        }
        rolled.kept
    }

    /// Start a template by name outside of any list. The mission survives
    /// only if `create` accepted it.
    pub fn start(&mut self, name: &str) -> Result<Option<MissionId>, MissionError> {
        let template = self
            .catalog()
            .lookup(name)
            .ok_or_else(|| MissionError::UnknownTemplate(name.to_string()))?;
        let mission = self.instantiate(template, true)?;
        Ok(self.keep_if_accepted(mission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(priority: i32, npc: Option<&str>, title: Option<&str>) -> CandidateKey {
        CandidateKey {
            priority,
            npc: npc.map(String::from),
            title: title.map(String::from),
        }
    }

    #[test]
    fn chance_formula() {
        assert_eq!(chance_fraction(100), 1.0);
        assert_eq!(chance_fraction(0), 1.0);
        assert_eq!(chance_fraction(30), 0.3);
        assert_eq!(chance_fraction(250), 0.5);
        assert_eq!(trial_count(30), 1);
        assert_eq!(trial_count(100), 1);
        assert_eq!(trial_count(250), 2);
        assert_eq!(trial_count(300), 3);
    }

    #[test]
    fn sort_order_priority_npc_title() {
        let mut keys = vec![
            key(5, None, Some("B")),
            key(5, Some("Zed"), None),
            key(1, None, None),
            key(5, Some("Amy"), Some("Z")),
            key(5, None, Some("A")),
        ];
        keys.sort_by(compare_candidates);
        assert_eq!(
            keys,
            vec![
                key(1, None, None),
                key(5, Some("Amy"), Some("Z")),
                key(5, Some("Zed"), None),
                key(5, None, Some("A")),
                key(5, None, Some("B")),
            ]
        );
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut keys = vec![
            (0, key(5, None, Some("Same"))),
            (1, key(5, None, Some("Same"))),
            (2, key(4, None, Some("Same"))),
        ];
        keys.sort_by(|a, b| compare_candidates(&a.1, &b.1));
        let order: Vec<i32> = keys.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![2, 0, 1]);
    }
}
