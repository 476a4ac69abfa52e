//! The espionage façade: owns the registries, the authoritative game day,
//! and the seeded random source. External callers (UI, other game systems)
//! go through this type only.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{
    Agent, AgentId, AgentState, CompanyId, CounterEspionageDepartment, EconomyOps, Mission,
    MissionId, MissionKind, MissionOutcome, NotificationSink, ProductionOps, TechId,
};
use tracing::{info, warn};

use crate::agents::AgentRegistry;
use crate::counterintel::CounterIntelRegistry;
use crate::effects;
use crate::missions::MissionRegistry;

/// What one `advance_day` call did, for logging and UI badges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Agents whose recovery counter moved.
    pub agents_recovered: usize,
    /// Missions that changed state.
    pub missions_advanced: usize,
    /// Departments that accrued spend.
    pub departments_ticked: usize,
}

/// Explicitly owned day clock. Replaces the global real-time scheduler of
/// earlier designs: whoever drives the simulation owns one and feeds its
/// days to [`EspionageCoordinator::advance_day`].
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Scheduler {
    day: u32,
}

impl Scheduler {
    /// Scheduler positioned at day zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current day.
    pub fn current_day(&self) -> u32 {
        self.day
    }

    /// Move to the next day and return it.
    pub fn next_day(&mut self) -> u32 {
        self.day += 1;
        self.day
    }
}

/// Single entry point for the espionage subsystem.
#[derive(Clone, Debug)]
pub struct EspionageCoordinator {
    agents: AgentRegistry,
    missions: MissionRegistry,
    counterintel: CounterIntelRegistry,
    current_day: u32,
    rng: ChaCha8Rng,
}

impl EspionageCoordinator {
    /// Coordinator for a game where `player` is the human-controlled
    /// company. `seed` makes every run reproducible.
    pub fn new(player: CompanyId, seed: u64) -> Self {
        Self {
            agents: AgentRegistry::new(),
            missions: MissionRegistry::new(),
            counterintel: CounterIntelRegistry::new(player),
            current_day: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Advance the subsystem to `day`. Ordering is fixed: agent recovery is
    /// applied first so recovered agents are visible before missions move,
    /// then mission progression, then counter-espionage bookkeeping. Callers
    /// must not interleave manual mutations between these steps.
    pub fn advance_day(&mut self, day: u32) -> TickReport {
        self.current_day = day;
        let report = TickReport {
            agents_recovered: self.agents.tick(),
            missions_advanced: self.missions.update(day),
            departments_ticked: self.counterintel.tick(),
        };
        info!(day, ?report, "espionage tick");
        report
    }

    /// Refill the recruitment pool.
    pub fn recruit_pool(&mut self, count: usize, player_level: u32) -> Vec<AgentId> {
        self.agents.generate_pool(count, player_level, &mut self.rng)
    }

    /// Hire an agent from the pool.
    pub fn hire_agent(&mut self, id: AgentId) -> Option<&Agent> {
        self.agents.hire(id)
    }

    /// Dismiss a hired agent; false when unknown or on a mission.
    pub fn dismiss_agent(&mut self, id: AgentId) -> bool {
        self.agents.dismiss(id)
    }

    /// Create or reconfigure a company's counter-espionage department.
    pub fn configure_counter_intel(
        &mut self,
        company: CompanyId,
        security_level: u8,
        monthly_budget: Decimal,
        staff: u32,
        technologies: Vec<TechId>,
    ) -> &CounterEspionageDepartment {
        self.counterintel
            .configure(company, security_level, monthly_budget, staff, technologies)
    }

    /// Plan a mission for an available agent. Creating the mission and
    /// marking the agent busy happen as one unit; no caller can observe a
    /// mission whose agent is still `Available`. Returns `None` when the
    /// agent is unknown or not available.
    pub fn create_mission(
        &mut self,
        kind: MissionKind,
        target: CompanyId,
        detail: impl Into<String>,
        agent: AgentId,
    ) -> Option<MissionId> {
        match self.agents.agent(agent) {
            Some(a) if a.state == AgentState::Available => {}
            _ => {
                warn!(agent = %agent, "mission rejected: agent not available");
                return None;
            }
        }
        let id = self
            .missions
            .create(kind, target, detail, agent, self.current_day);
        let assigned = self.agents.assign_to_mission(agent, id);
        debug_assert!(assigned);
        Some(id)
    }

    /// Launch a planned mission.
    pub fn start_mission(&mut self, id: MissionId) -> bool {
        self.missions.start(id)
    }

    /// Whether a mission has reached its resolution point.
    pub fn mission_resolvable(&self, id: MissionId) -> bool {
        self.missions.is_resolvable(id, self.current_day)
    }

    /// Resolve a mission that has run its course: roll detection against the
    /// target's counter-espionage, roll the success check, apply the agent
    /// consequences, and route the effect list through both adapters.
    /// `None` when the mission is unknown, terminal, or not yet resolvable;
    /// a missing agent skips the agent-side update but not the resolution.
    pub fn resolve_mission(
        &mut self,
        id: MissionId,
        econ: &mut dyn EconomyOps,
        prod: &mut dyn ProductionOps,
        sink: &mut dyn NotificationSink,
    ) -> Option<MissionOutcome> {
        if !self.missions.is_resolvable(id, self.current_day) {
            return None;
        }
        let mission = self.missions.mission(id)?.clone();
        // Agent id is looked up on the mission record, never cached.
        let (skill, loyalty) = self
            .agents
            .agent(mission.agent)
            .map(|a| (a.skill, a.loyalty))
            .unwrap_or((1, 1));
        let defense_level = self
            .counterintel
            .department(mission.target)
            .map(|d| d.security_level)
            .unwrap_or(0);

        let detected = self
            .counterintel
            .attempt_detection(&mission, &mut self.rng, sink);
        let outcome = self.missions.resolve(
            id,
            self.current_day,
            skill,
            loyalty,
            defense_level,
            detected,
            &mut self.rng,
        )?;

        if self.agents.apply_outcome(mission.agent, &outcome.agent).is_none() {
            warn!(mission = %id, agent = %mission.agent, "agent update skipped");
        }
        let econ_applied = effects::apply_economic_effects(&outcome.effects, econ);
        let prod_applied = effects::apply_production_effects(&outcome.effects, prod);
        info!(
            mission = %id,
            success = outcome.success,
            detected = outcome.detected,
            econ_applied,
            prod_applied,
            "mission resolved"
        );
        Some(outcome)
    }

    /// Estimated daily loss a sabotage with the given penalties inflicts on
    /// `company`. Analytics only.
    pub fn sabotage_loss(
        &self,
        company: CompanyId,
        prod: &dyn ProductionOps,
        efficiency_penalty: f64,
        quality_penalty: f64,
    ) -> Option<f64> {
        effects::estimate_sabotage_loss(company, prod, efficiency_penalty, quality_penalty)
    }

    /// Return on the espionage program over `days`, in percent.
    pub fn roi(&self, days: u32) -> f64 {
        effects::espionage_roi(days, &self.agents, &self.missions, &self.counterintel)
    }

    /// The authoritative game day.
    pub fn current_day(&self) -> u32 {
        self.current_day
    }

    /// Read access to the agent registry.
    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    /// Read access to the mission registry.
    pub fn missions(&self) -> &MissionRegistry {
        &self.missions
    }

    /// Read access to the counter-espionage registry.
    pub fn counterintel(&self) -> &CounterIntelRegistry {
        &self.counterintel
    }

    /// A mission by id.
    pub fn mission(&self, id: MissionId) -> Option<&Mission> {
        self.missions.mission(id)
    }
}
