//! Live catalogs of the things missions can point at.
//!
//! Scripts hold planets, systems, factions and ship classes as references.
//! Those references are always stored by unique name so they can be
//! re-resolved here after a load.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Index of a faction in the universe's faction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactionId(pub u32);

/// The four kinds of domain reference a script value may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefKind {
    Planet,
    System,
    Faction,
    Ship,
}

impl RefKind {
    pub fn label(&self) -> &'static str {
        match self {
            RefKind::Planet => "planet",
            RefKind::System => "system",
            RefKind::Faction => "faction",
            RefKind::Ship => "ship",
        }
    }
}

/// A resolved reference to a named domain object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainRef {
    pub kind: RefKind,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub name: String,
    pub system: String,
    pub faction: Option<String>,
}

/// On-disk shape of the universe document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseData {
    pub factions: Vec<String>,
    pub systems: Vec<String>,
    pub planets: Vec<Planet>,
    pub ships: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Universe {
    factions: Vec<String>,
    systems: BTreeSet<String>,
    planets: BTreeMap<String, Planet>,
    ships: BTreeSet<String>,
}

impl Universe {
    pub fn new(data: UniverseData) -> Self {
        let mut factions: Vec<String> = Vec::with_capacity(data.factions.len());
        for name in data.factions {
            if factions.contains(&name) {
                log::warn!("Duplicate faction '{}' in universe data - ignoring", name);
                continue;
            }
            factions.push(name);
        }

        let mut systems: BTreeSet<String> = data.systems.into_iter().collect();
        let mut planets = BTreeMap::new();
        for planet in data.planets {
            // A planet always implies its system exists.
            systems.insert(planet.system.clone());
            planets.insert(planet.name.clone(), planet);
        }

        Self {
            factions,
            systems,
            planets,
            ships: data.ships.into_iter().collect(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let data: UniverseData = serde_json::from_str(text)?;
        Ok(Self::new(data))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn faction_id(&self, name: &str) -> Option<FactionId> {
        self.factions
            .iter()
            .position(|f| f == name)
            .map(|idx| FactionId(idx as u32))
    }

    pub fn faction_name(&self, id: FactionId) -> Option<&str> {
        self.factions.get(id.0 as usize).map(String::as_str)
    }

    pub fn planet(&self, name: &str) -> Option<&Planet> {
        self.planets.get(name)
    }

    pub fn has_system(&self, name: &str) -> bool {
        self.systems.contains(name)
    }

    pub fn has_ship(&self, name: &str) -> bool {
        self.ships.contains(name)
    }

    /// Look a name up against the live catalog of the given kind.
    pub fn resolve(&self, kind: RefKind, name: &str) -> Option<DomainRef> {
        let exists = match kind {
            RefKind::Planet => self.planets.contains_key(name),
            RefKind::System => self.systems.contains(name),
            RefKind::Faction => self.faction_id(name).is_some(),
            RefKind::Ship => self.ships.contains(name),
        };
        exists.then(|| DomainRef {
            kind,
            name: name.to_string(),
        })
    }

    pub fn faction_count(&self) -> usize {
        self.factions.len()
    }

    pub fn planet_count(&self) -> usize {
        self.planets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe() -> Universe {
        Universe::new(UniverseData {
            factions: vec!["Empire".into(), "Pirate".into()],
            systems: vec!["Gamma Polaris".into()],
            planets: vec![Planet {
                name: "Emperor's Fist".into(),
                system: "Gamma Polaris".into(),
                faction: Some("Empire".into()),
            }],
            ships: vec!["Llama".into()],
        })
    }

    #[test]
    fn faction_ids_follow_declaration_order() {
        let u = universe();
        assert_eq!(u.faction_id("Empire"), Some(FactionId(0)));
        assert_eq!(u.faction_id("Pirate"), Some(FactionId(1)));
        assert_eq!(u.faction_name(FactionId(1)), Some("Pirate"));
        assert_eq!(u.faction_id("Collective"), None);
    }

    #[test]
    fn resolve_checks_the_right_catalog() {
        let u = universe();
        assert!(u.resolve(RefKind::Planet, "Emperor's Fist").is_some());
        assert!(u.resolve(RefKind::System, "Gamma Polaris").is_some());
        assert!(u.resolve(RefKind::Ship, "Llama").is_some());
        assert!(u.resolve(RefKind::Ship, "Emperor's Fist").is_none());
        assert!(u.resolve(RefKind::Faction, "Llama").is_none());
    }

    #[test]
    fn planet_registers_its_system() {
        let u = Universe::new(UniverseData {
            planets: vec![Planet {
                name: "Caladan".into(),
                system: "Delta Pavonis".into(),
                faction: None,
            }],
            ..Default::default()
        });
        assert!(u.has_system("Delta Pavonis"));
    }
}
