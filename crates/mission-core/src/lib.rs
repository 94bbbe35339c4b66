//! Mission Core - scripted mission subsystem for a space trading game
//!
//! Missions are declared in a data catalog and implemented as Lua scripts.
//! Each live mission owns a private Lua state; its whole global namespace
//! can be written into a save and restored later.
//!
//! # Architecture
//!
//! - **Catalog** (`catalog`): immutable templates loaded once from JSON
//! - **Matcher** (`availability`): can a template be offered here and now?
//! - **Generator** (`generator`): rolls chances and builds candidate lists
//! - **Lifecycle** (`lifecycle`): the fixed table of active missions, timers,
//!   hooks, cargo links and the OSD
//! - **Persistor** (`persistence`): script globals to a tagged tree and back
//!
//! # Example
//!
//! ```rust,no_run
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use mission_core::prelude::*;
//!
//! let config = MissionConfig::default();
//! let universe = Rc::new(Universe::load(&config.universe_path).unwrap());
//! let catalog = Rc::new(Catalog::load(&config.catalog_path, &universe).unwrap());
//! let host = LuaHost::from_dir(&config.script_dir, Rc::clone(&universe)).unwrap();
//! let hold = Rc::new(RefCell::new(PlayerHold::new()));
//! let mut missions = Missions::new(catalog, universe.clone(), Box::new(host), hold, config);
//!
//! let here = LocationContext {
//!     faction: universe.faction_id("Empire").unwrap(),
//!     planet: "Halir",
//!     system: "Gamma Polaris",
//! };
//! let mut rng = rand::thread_rng();
//! let mut offers = missions.gen_list(MissionLocation::Computer, &here, &mut rng);
//! if let Some(candidate) = offers.pop() {
//!     let _ = missions.accept(candidate);
//! }
//! missions.update(1.0 / 60.0);
//! ```

pub mod availability;
pub mod cargo;
pub mod catalog;
pub mod config;
pub mod error;
pub mod generator;
pub mod hooks;
pub mod lifecycle;
pub mod lua;
pub mod mission;
pub mod news;
pub mod osd;
pub mod persistence;
pub mod script;
pub mod universe;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::availability::{Ineligible, LocationContext};
    pub use crate::cargo::{CargoHold, CargoId, PlayerHold, SharedHold};
    pub use crate::catalog::{Catalog, MissionLocation, MissionTemplate, TemplateId};
    pub use crate::config::MissionConfig;
    pub use crate::error::{MissionError, SaveError, ScriptError};
    pub use crate::hooks::{HookDispatcher, HookRegistry};
    pub use crate::lifecycle::{AbortOutcome, Missions, Rejected};
    pub use crate::lua::{LuaHost, ScriptSource};
    pub use crate::mission::{Marker, MarkerKind, Mission, MissionId, MissionLog, MissionStatus};
    pub use crate::news::NewsFeed;
    pub use crate::persistence::{MissionsSave, SaveFormat};
    pub use crate::universe::{FactionId, Universe};
}
