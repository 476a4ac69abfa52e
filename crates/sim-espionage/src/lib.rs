#![deny(warnings)]

//! Corporate-espionage subsystem for Shadow Tycoon.
//!
//! Three registries own the mutable state: [`AgentRegistry`] (operatives),
//! [`MissionRegistry`] (operations and their odds) and
//! [`CounterIntelRegistry`] (per-company defensive posture). The
//! [`EspionageCoordinator`] wires them together, owns the authoritative game
//! day, and is the only surface external callers invoke. Mission outcomes
//! carry a generic effect list that the adapters in [`effects`] translate
//! into calls on the economic and production engines.

pub mod agents;
pub mod counterintel;
pub mod coordinator;
pub mod effects;
pub mod missions;

pub use agents::AgentRegistry;
pub use coordinator::{EspionageCoordinator, Scheduler, TickReport};
pub use counterintel::CounterIntelRegistry;
pub use missions::MissionRegistry;
