//! Agent lifecycle: recruit → hire → assign → resolve → recover/retire.

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{Agent, AgentConsequences, AgentId, AgentSpecialty, AgentState, MissionId};
use std::collections::BTreeMap;
use tracing::{debug, info};

const CODENAMES: [&str; 12] = [
    "Viper", "Mirage", "Cobalt", "Sparrow", "Onyx", "Drift", "Halcyon", "Vesper", "Lynx",
    "Cipher", "Marlin", "Sable",
];

/// Owns the recruitment pool and the hired-agent map. All mutations are
/// confined to these maps; the registry never calls out.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AgentRegistry {
    pool: BTreeMap<AgentId, Agent>,
    hired: BTreeMap<AgentId, Agent>,
    next_id: u64,
    monthly_cost_total: Decimal,
}

impl AgentRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the recruitment pool with `count` freshly generated agents
    /// scaled to the player's level. Returns the new pool's ids.
    pub fn generate_pool(
        &mut self,
        count: usize,
        player_level: u32,
        rng: &mut impl Rng,
    ) -> Vec<AgentId> {
        self.pool.clear();
        let base_skill = (player_level / 5).clamp(1, 5) as i32;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            self.next_id += 1;
            let id = AgentId(self.next_id);
            let specialty = AgentSpecialty::ALL[rng.gen_range(0..AgentSpecialty::ALL.len())];
            let skill = (base_skill + rng.gen_range(-1i32..=1)).clamp(1, 5) as u8;
            let rate = if specialty == AgentSpecialty::Generalist {
                0.8
            } else {
                1.2
            };
            let monthly_cost = Decimal::from((5000.0 * skill as f64 * rate).floor() as i64);
            let codename = format!(
                "{}-{}",
                CODENAMES[rng.gen_range(0..CODENAMES.len())],
                self.next_id
            );
            self.pool.insert(
                id,
                Agent {
                    id,
                    codename,
                    specialty,
                    skill,
                    loyalty: rng.gen_range(1..=5),
                    monthly_cost,
                    experience: 0,
                    notoriety: rng.gen_range(0.0..=20.0),
                    state: AgentState::Available,
                    current_mission: None,
                    recovery_days_left: None,
                },
            );
            ids.push(id);
        }
        debug!(count, player_level, "recruitment pool regenerated");
        ids
    }

    /// Move an agent from the pool onto the payroll. `None` when the id is
    /// not in the pool.
    pub fn hire(&mut self, id: AgentId) -> Option<&Agent> {
        let agent = self.pool.remove(&id)?;
        self.monthly_cost_total += agent.monthly_cost;
        info!(agent = %id, codename = %agent.codename, "agent hired");
        self.hired.insert(id, agent);
        self.hired.get(&id)
    }

    /// Remove a hired agent from the payroll. Returns false when the agent
    /// is unknown or currently on a mission; the registry is unchanged in
    /// that case.
    pub fn dismiss(&mut self, id: AgentId) -> bool {
        match self.hired.get(&id) {
            Some(a) if a.state != AgentState::OnMission => {
                self.monthly_cost_total -= a.monthly_cost;
                self.hired.remove(&id);
                info!(agent = %id, "agent dismissed");
                true
            }
            _ => false,
        }
    }

    /// Mark an available agent as executing `mission`. Returns false unless
    /// the agent exists and is `Available`.
    pub fn assign_to_mission(&mut self, id: AgentId, mission: MissionId) -> bool {
        match self.hired.get_mut(&id) {
            Some(a) if a.state == AgentState::Available => {
                a.state = AgentState::OnMission;
                a.current_mission = Some(mission);
                true
            }
            _ => false,
        }
    }

    /// Apply a mission outcome's consequences to the assigned agent.
    /// A no-op (`None`) unless the agent exists and is `OnMission`.
    /// Consequences may not send the agent back to `OnMission`: the mission
    /// reference is cleared here, so that state is only reachable through
    /// [`AgentRegistry::assign_to_mission`].
    pub fn apply_outcome(
        &mut self,
        id: AgentId,
        consequences: &AgentConsequences,
    ) -> Option<&Agent> {
        if consequences.new_state == AgentState::OnMission {
            return None;
        }
        let a = self.hired.get_mut(&id)?;
        if a.state != AgentState::OnMission {
            return None;
        }
        a.state = consequences.new_state;
        a.experience += consequences.experience_delta;
        a.notoriety = sim_core::clamp_pct(a.notoriety + consequences.notoriety_delta);
        a.current_mission = None;
        a.recovery_days_left = if consequences.new_state == AgentState::Recovering {
            Some(consequences.recovery_days.unwrap_or(1))
        } else {
            None
        };
        debug!(agent = %id, state = ?a.state, "outcome applied to agent");
        Some(a)
    }

    /// Advance recovery counters by one day. Agents reaching zero become
    /// available again. Returns the number of agents whose counter moved.
    pub fn tick(&mut self) -> usize {
        let mut advanced = 0;
        for a in self.hired.values_mut() {
            if a.state != AgentState::Recovering {
                continue;
            }
            if let Some(days) = a.recovery_days_left {
                if days > 1 {
                    a.recovery_days_left = Some(days - 1);
                } else {
                    a.recovery_days_left = None;
                    a.state = AgentState::Available;
                    debug!(agent = %a.id, "agent recovered");
                }
                advanced += 1;
            }
        }
        advanced
    }

    /// A hired agent by id.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.hired.get(&id)
    }

    /// A recruitable agent by id.
    pub fn pool_agent(&self, id: AgentId) -> Option<&Agent> {
        self.pool.get(&id)
    }

    /// All hired agents, in id order.
    pub fn hired_agents(&self) -> impl Iterator<Item = &Agent> {
        self.hired.values()
    }

    /// The current recruitment pool, in id order.
    pub fn pool(&self) -> impl Iterator<Item = &Agent> {
        self.pool.values()
    }

    /// Hired agents currently assignable.
    pub fn available_agents(&self) -> impl Iterator<Item = &Agent> {
        self.hired
            .values()
            .filter(|a| a.state == AgentState::Available)
    }

    /// Sum of hired agents' monthly salaries.
    pub fn monthly_cost_total(&self) -> Decimal {
        self.monthly_cost_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::validate_agent;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(11)
    }

    fn registry_with_hired(rng: &mut ChaCha8Rng) -> (AgentRegistry, AgentId) {
        let mut reg = AgentRegistry::new();
        let ids = reg.generate_pool(1, 10, rng);
        let id = ids[0];
        reg.hire(id).unwrap();
        (reg, id)
    }

    #[test]
    fn pool_generation_at_level_25() {
        let mut r = rng();
        let mut reg = AgentRegistry::new();
        for id in reg.generate_pool(50, 25, &mut r) {
            let a = reg.pool_agent(id).unwrap();
            validate_agent(a).unwrap();
            // base skill 5, ±1, clamped to [1,5]
            assert!(a.skill == 4 || a.skill == 5, "skill {}", a.skill);
            let rate = if a.specialty == AgentSpecialty::Generalist {
                0.8
            } else {
                1.2
            };
            let expected = Decimal::from((5000.0 * a.skill as f64 * rate).floor() as i64);
            assert_eq!(a.monthly_cost, expected);
            assert!((0.0..=20.0).contains(&a.notoriety));
            assert_eq!(a.state, AgentState::Available);
        }
    }

    #[test]
    fn pool_generation_at_level_1_clamps_low() {
        let mut r = rng();
        let mut reg = AgentRegistry::new();
        for id in reg.generate_pool(50, 1, &mut r) {
            let a = reg.pool_agent(id).unwrap();
            assert!(a.skill == 1 || a.skill == 2, "skill {}", a.skill);
        }
    }

    #[test]
    fn hire_moves_agent_and_accrues_cost() {
        let mut r = rng();
        let mut reg = AgentRegistry::new();
        let ids = reg.generate_pool(2, 10, &mut r);
        let cost = reg.pool_agent(ids[0]).unwrap().monthly_cost;
        assert_eq!(reg.monthly_cost_total(), Decimal::ZERO);
        reg.hire(ids[0]).unwrap();
        assert_eq!(reg.monthly_cost_total(), cost);
        assert!(reg.pool_agent(ids[0]).is_none());
        assert!(reg.hire(AgentId(999)).is_none());
    }

    #[test]
    fn dismiss_busy_agent_is_rejected() {
        let mut r = rng();
        let (mut reg, id) = registry_with_hired(&mut r);
        assert!(reg.assign_to_mission(id, MissionId(1)));
        let before = reg.agent(id).unwrap().clone();
        let cost_before = reg.monthly_cost_total();

        assert!(!reg.dismiss(id));
        assert_eq!(reg.monthly_cost_total(), cost_before);
        let after = reg.agent(id).unwrap();
        assert_eq!(after.state, before.state);
        assert_eq!(after.current_mission, before.current_mission);
    }

    #[test]
    fn dismiss_idle_agent_refunds_cost() {
        let mut r = rng();
        let (mut reg, id) = registry_with_hired(&mut r);
        assert!(reg.dismiss(id));
        assert_eq!(reg.monthly_cost_total(), Decimal::ZERO);
        assert!(!reg.dismiss(id));
    }

    #[test]
    fn assign_requires_available_state() {
        let mut r = rng();
        let (mut reg, id) = registry_with_hired(&mut r);
        assert!(reg.assign_to_mission(id, MissionId(1)));
        assert!(!reg.assign_to_mission(id, MissionId(2)));
        assert!(!reg.assign_to_mission(AgentId(999), MissionId(3)));
        validate_agent(reg.agent(id).unwrap()).unwrap();
    }

    #[test]
    fn outcome_only_applies_to_busy_agents() {
        let mut r = rng();
        let (mut reg, id) = registry_with_hired(&mut r);
        let cons = AgentConsequences {
            new_state: AgentState::Recovering,
            experience_delta: 10,
            notoriety_delta: 120.0,
            recovery_days: Some(4),
        };
        // not on a mission yet
        assert!(reg.apply_outcome(id, &cons).is_none());

        reg.assign_to_mission(id, MissionId(1));
        let a = reg.apply_outcome(id, &cons).unwrap();
        assert_eq!(a.state, AgentState::Recovering);
        assert_eq!(a.recovery_days_left, Some(4));
        assert_eq!(a.experience, 10);
        assert_eq!(a.notoriety, 100.0); // clamped
        assert!(a.current_mission.is_none());
        validate_agent(reg.agent(id).unwrap()).unwrap();
    }

    #[test]
    fn outcome_cannot_send_agent_back_on_mission() {
        let mut r = rng();
        let (mut reg, id) = registry_with_hired(&mut r);
        reg.assign_to_mission(id, MissionId(1));
        let rejected = reg.apply_outcome(
            id,
            &AgentConsequences {
                new_state: AgentState::OnMission,
                experience_delta: 10,
                notoriety_delta: 0.0,
                recovery_days: None,
            },
        );
        assert!(rejected.is_none());
        let a = reg.agent(id).unwrap();
        assert_eq!(a.state, AgentState::OnMission);
        assert_eq!(a.current_mission, Some(MissionId(1)));
        validate_agent(a).unwrap();
    }

    #[test]
    fn recovery_ticks_down_to_available() {
        let mut r = rng();
        let (mut reg, id) = registry_with_hired(&mut r);
        reg.assign_to_mission(id, MissionId(1));
        reg.apply_outcome(
            id,
            &AgentConsequences {
                new_state: AgentState::Recovering,
                experience_delta: 0,
                notoriety_delta: 0.0,
                recovery_days: Some(2),
            },
        );
        assert_eq!(reg.tick(), 1);
        assert_eq!(reg.agent(id).unwrap().recovery_days_left, Some(1));
        assert_eq!(reg.tick(), 1);
        let a = reg.agent(id).unwrap();
        assert_eq!(a.state, AgentState::Available);
        assert!(a.recovery_days_left.is_none());
        assert_eq!(reg.tick(), 0);
        validate_agent(reg.agent(id).unwrap()).unwrap();
    }

    #[test]
    fn captured_agents_stay_on_the_books() {
        let mut r = rng();
        let (mut reg, id) = registry_with_hired(&mut r);
        reg.assign_to_mission(id, MissionId(1));
        reg.apply_outcome(
            id,
            &AgentConsequences {
                new_state: AgentState::Captured,
                experience_delta: 5,
                notoriety_delta: 20.0,
                recovery_days: None,
            },
        );
        assert_eq!(reg.agent(id).unwrap().state, AgentState::Captured);
        // captured agents are not on a mission, so dismissal is legal
        assert!(reg.dismiss(id));
    }

    proptest! {
        /// The state/reference invariants hold after any sequence of
        /// registry operations.
        #[test]
        fn invariants_hold_under_op_sequences(ops in prop::collection::vec(0u8..6, 1..40), seed in 0u64..500) {
            let mut r = ChaCha8Rng::seed_from_u64(seed);
            let mut reg = AgentRegistry::new();
            let ids = reg.generate_pool(3, 12, &mut r);
            for id in &ids {
                reg.hire(*id);
            }
            let mut mission = 0u64;
            for op in ops {
                let id = ids[(op as usize) % ids.len()];
                match op % 5 {
                    0 => {
                        mission += 1;
                        let _ = reg.assign_to_mission(id, MissionId(mission));
                    }
                    1 => {
                        let _ = reg.apply_outcome(id, &AgentConsequences {
                            new_state: AgentState::Recovering,
                            experience_delta: 3,
                            notoriety_delta: 7.5,
                            recovery_days: Some(2),
                        });
                    }
                    2 => {
                        let _ = reg.apply_outcome(id, &AgentConsequences {
                            new_state: AgentState::Available,
                            experience_delta: 8,
                            notoriety_delta: -4.0,
                            recovery_days: None,
                        });
                    }
                    3 => {
                        let _ = reg.tick();
                    }
                    _ => {
                        let _ = reg.dismiss(id);
                    }
                }
                for a in reg.hired_agents() {
                    prop_assert!(validate_agent(a).is_ok(), "agent {:?} broke invariants", a.id);
                }
            }
        }
    }
}
