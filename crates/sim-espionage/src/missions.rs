//! Mission lifecycle: plan → start → resolve → archive, plus the odds model.
//!
//! Detection is *not* rolled here; the coordinator delegates that to the
//! counter-espionage registry and passes the verdict into
//! [`MissionRegistry::resolve`], so no registry reaches into another's state.

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{
    AgentConsequences, AgentId, AgentState, CompanyId, Effect, EffectKind, Mission, MissionId,
    MissionKind, MissionOutcome, MissionState, TechId,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Per-kind tuning: base detection probability (percent), scheduled length
/// in days, and up-front operating cost.
struct KindParams {
    base_detection: f64,
    duration_days: u32,
    operating_cost: Decimal,
}

fn kind_params(kind: MissionKind) -> KindParams {
    match kind {
        MissionKind::InfoGathering => KindParams {
            base_detection: 20.0,
            duration_days: 5,
            operating_cost: Decimal::new(8_000, 0),
        },
        MissionKind::TechTheft => KindParams {
            base_detection: 35.0,
            duration_days: 10,
            operating_cost: Decimal::new(25_000, 0),
        },
        MissionKind::Sabotage => KindParams {
            base_detection: 45.0,
            duration_days: 7,
            operating_cost: Decimal::new(15_000, 0),
        },
        MissionKind::MarketManipulation => KindParams {
            base_detection: 30.0,
            duration_days: 8,
            operating_cost: Decimal::new(12_000, 0),
        },
    }
}

/// Chance in [10, 90] that an undetected mission achieves its objective.
fn success_chance(skill: u8, loyalty: u8, defense_level: u8) -> f64 {
    (40.0 + skill as f64 * 9.0 + loyalty as f64 * 2.0 - defense_level as f64 * 8.0)
        .clamp(10.0, 90.0)
}

/// Owns the mission map. Terminal missions stay archived in place.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MissionRegistry {
    missions: BTreeMap<MissionId, Mission>,
    next_id: u64,
}

impl MissionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a planning-state mission. Agent availability is the
    /// coordinator's check; the registry records whatever it is given.
    pub fn create(
        &mut self,
        kind: MissionKind,
        target: CompanyId,
        detail: impl Into<String>,
        agent: AgentId,
        day: u32,
    ) -> MissionId {
        self.next_id += 1;
        let id = MissionId(self.next_id);
        let p = kind_params(kind);
        self.missions.insert(
            id,
            Mission {
                id,
                kind,
                target,
                detail: detail.into(),
                agent,
                base_detection: p.base_detection,
                state: MissionState::Planning,
                operating_cost: p.operating_cost,
                duration_days: p.duration_days,
                created_day: day,
                resolved_day: None,
            },
        );
        info!(mission = %id, ?kind, company = %target, "mission planned");
        id
    }

    /// Launch a planned mission. Returns false for any state other than
    /// `Planning`.
    pub fn start(&mut self, id: MissionId) -> bool {
        match self.missions.get_mut(&id) {
            Some(m) if m.state == MissionState::Planning => {
                m.state = MissionState::Started;
                info!(mission = %id, "mission started");
                true
            }
            _ => false,
        }
    }

    /// Advance running missions as of `day`. Started missions move to
    /// `InProgress` once a day has passed since launch. Returns the number
    /// of missions that changed state.
    pub fn update(&mut self, day: u32) -> usize {
        let mut advanced = 0;
        for m in self.missions.values_mut() {
            if m.state == MissionState::Started && day > m.created_day {
                m.state = MissionState::InProgress;
                advanced += 1;
            }
        }
        advanced
    }

    /// Whether the mission has run its scheduled duration and can be
    /// resolved.
    pub fn is_resolvable(&self, id: MissionId, day: u32) -> bool {
        self.missions.get(&id).is_some_and(|m| {
            matches!(m.state, MissionState::Started | MissionState::InProgress)
                && day >= m.created_day + m.duration_days
        })
    }

    /// Resolve a mission that has reached its resolution point, producing
    /// the archival outcome. `detected` is the counter-espionage verdict the
    /// coordinator already obtained. Returns `None` (with no side effects)
    /// when the mission is unknown, terminal, or not yet resolvable —
    /// resolution must only happen once per mission.
    pub fn resolve(
        &mut self,
        id: MissionId,
        day: u32,
        agent_skill: u8,
        agent_loyalty: u8,
        defense_level: u8,
        detected: bool,
        rng: &mut impl Rng,
    ) -> Option<MissionOutcome> {
        if !self.is_resolvable(id, day) {
            return None;
        }
        let m = self.missions.get_mut(&id)?;

        let chance = success_chance(agent_skill, agent_loyalty, defense_level);
        let success = rng.gen_range(0.0..100.0) < chance;

        m.state = if detected {
            MissionState::Discovered
        } else if success {
            MissionState::Completed
        } else {
            MissionState::Failed
        };
        m.resolved_day = Some(day);

        // Payloads and effects only materialize for clean successes; a
        // discovered operation yields nothing but still burns the agent.
        let mut stolen_technology = None;
        let mut sabotage_impact = None;
        let mut intelligence = None;
        let mut effects = Vec::new();
        if success && !detected {
            match m.kind {
                MissionKind::InfoGathering => {
                    intelligence = Some(format!(
                        "Internal briefing on {}: {}",
                        m.target, m.detail
                    ));
                }
                MissionKind::TechTheft => {
                    stolen_technology = Some(TechId(m.detail.clone()));
                }
                MissionKind::Sabotage => {
                    let impact = rng.gen_range(10.0..=30.0);
                    sabotage_impact = Some(impact);
                    effects.push(Effect {
                        kind: EffectKind::Efficiency,
                        target: m.target,
                        magnitude: -impact,
                        duration_days: Some(30),
                    });
                    effects.push(Effect {
                        kind: EffectKind::Quality,
                        target: m.target,
                        magnitude: -impact / 2.0,
                        duration_days: Some(30),
                    });
                    effects.push(Effect {
                        kind: EffectKind::StockValue,
                        target: m.target,
                        magnitude: -impact / 3.0,
                        duration_days: None,
                    });
                }
                MissionKind::MarketManipulation => {
                    let magnitude = rng.gen_range(5.0..=15.0);
                    effects.push(Effect {
                        kind: EffectKind::MarketPrice,
                        target: m.target,
                        magnitude: -magnitude,
                        duration_days: Some(15),
                    });
                    effects.push(Effect {
                        kind: EffectKind::Demand,
                        target: m.target,
                        magnitude: -magnitude / 2.0,
                        duration_days: Some(15),
                    });
                    effects.push(Effect {
                        kind: EffectKind::StockValue,
                        target: m.target,
                        magnitude: -magnitude / 2.0,
                        duration_days: None,
                    });
                }
            }
        }

        let agent = if detected {
            let captured = rng.gen_range(0.0..100.0) < 40.0;
            AgentConsequences {
                new_state: if captured {
                    AgentState::Captured
                } else {
                    AgentState::Recovering
                },
                experience_delta: 5,
                notoriety_delta: rng.gen_range(15.0..=25.0),
                recovery_days: if captured {
                    None
                } else {
                    Some(rng.gen_range(5..=10))
                },
            }
        } else if success {
            AgentConsequences {
                new_state: AgentState::Available,
                experience_delta: 20,
                notoriety_delta: 2.0,
                recovery_days: None,
            }
        } else {
            AgentConsequences {
                new_state: AgentState::Recovering,
                experience_delta: 8,
                notoriety_delta: 5.0,
                recovery_days: Some(rng.gen_range(2..=5)),
            }
        };

        debug!(mission = %id, state = ?m.state, success, detected, "mission resolved");
        Some(MissionOutcome {
            mission: id,
            success,
            detected,
            stolen_technology,
            sabotage_impact,
            intelligence,
            agent,
            effects,
        })
    }

    /// A mission by id.
    pub fn mission(&self, id: MissionId) -> Option<&Mission> {
        self.missions.get(&id)
    }

    /// Non-terminal missions, in id order.
    pub fn active(&self) -> impl Iterator<Item = &Mission> {
        self.missions.values().filter(|m| !m.state.is_terminal())
    }

    /// Archived (terminal) missions, in id order.
    pub fn archived(&self) -> impl Iterator<Item = &Mission> {
        self.missions.values().filter(|m| m.state.is_terminal())
    }

    /// All missions ever created against one company.
    pub fn missions_against(&self, company: CompanyId) -> impl Iterator<Item = &Mission> {
        self.missions.values().filter(move |m| m.target == company)
    }

    /// Sum of active missions' operating costs, for the ROI analytics.
    pub fn active_operating_cost(&self) -> Decimal {
        self.active().map(|m| m.operating_cost).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::validate_mission;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(3)
    }

    fn planned(reg: &mut MissionRegistry, kind: MissionKind) -> MissionId {
        reg.create(kind, CompanyId(2), "fab line 3", AgentId(1), 0)
    }

    #[test]
    fn create_sets_kind_tuning() {
        let mut reg = MissionRegistry::new();
        let id = planned(&mut reg, MissionKind::TechTheft);
        let m = reg.mission(id).unwrap();
        validate_mission(m).unwrap();
        assert_eq!(m.state, MissionState::Planning);
        assert_eq!(m.base_detection, 35.0);
        assert_eq!(m.duration_days, 10);
        assert_eq!(m.operating_cost, Decimal::new(25_000, 0));
        assert!(m.resolved_day.is_none());
    }

    #[test]
    fn start_only_from_planning() {
        let mut reg = MissionRegistry::new();
        let id = planned(&mut reg, MissionKind::Sabotage);
        assert!(reg.start(id));
        assert!(!reg.start(id));
        assert!(!reg.start(MissionId(99)));
    }

    #[test]
    fn update_moves_started_to_in_progress() {
        let mut reg = MissionRegistry::new();
        let id = planned(&mut reg, MissionKind::Sabotage);
        reg.start(id);
        assert_eq!(reg.update(0), 0); // same day as creation
        assert_eq!(reg.update(1), 1);
        assert_eq!(reg.mission(id).unwrap().state, MissionState::InProgress);
        assert_eq!(reg.update(2), 0);
    }

    #[test]
    fn resolution_requires_elapsed_duration() {
        let mut reg = MissionRegistry::new();
        let mut r = rng();
        let id = planned(&mut reg, MissionKind::Sabotage); // 7 days
        reg.start(id);
        reg.update(1);
        assert!(!reg.is_resolvable(id, 6));
        assert!(reg.resolve(id, 6, 3, 3, 2, false, &mut r).is_none());
        assert!(reg.is_resolvable(id, 7));
    }

    #[test]
    fn resolving_twice_returns_none_second_time() {
        let mut reg = MissionRegistry::new();
        let mut r = rng();
        let id = planned(&mut reg, MissionKind::InfoGathering); // 5 days
        reg.start(id);
        reg.update(1);
        let first = reg.resolve(id, 5, 4, 4, 1, false, &mut r);
        assert!(first.is_some());
        let archived: Mission = reg.mission(id).unwrap().clone();
        assert!(archived.state.is_terminal());
        assert_eq!(archived.resolved_day, Some(5));

        let second = reg.resolve(id, 6, 4, 4, 1, false, &mut r);
        assert!(second.is_none());
        assert_eq!(reg.mission(id).unwrap().state, archived.state);
    }

    #[test]
    fn detected_missions_are_discovered_and_burn_the_agent() {
        let mut reg = MissionRegistry::new();
        let mut r = rng();
        let id = planned(&mut reg, MissionKind::TechTheft);
        reg.start(id);
        let o = reg.resolve(id, 10, 5, 5, 1, true, &mut r).unwrap();
        assert!(o.detected);
        assert_eq!(reg.mission(id).unwrap().state, MissionState::Discovered);
        assert!(o.effects.is_empty());
        assert!(o.stolen_technology.is_none());
        assert!(o.agent.notoriety_delta >= 15.0);
        assert!(matches!(
            o.agent.new_state,
            AgentState::Captured | AgentState::Recovering
        ));
        if o.agent.new_state == AgentState::Recovering {
            assert!(o.agent.recovery_days.is_some());
        } else {
            assert!(o.agent.recovery_days.is_none());
        }
    }

    #[test]
    fn successful_sabotage_produces_production_effects() {
        // strong agent, weak defense: retry seeds until the roll succeeds
        for seed in 0..50u64 {
            let mut reg = MissionRegistry::new();
            let mut seeded = ChaCha8Rng::seed_from_u64(seed);
            let id = planned(&mut reg, MissionKind::Sabotage);
            reg.start(id);
            if let Some(o) = reg.resolve(id, 7, 5, 5, 1, false, &mut seeded) {
                if o.success {
                    let impact = o.sabotage_impact.unwrap();
                    assert!((10.0..=30.0).contains(&impact));
                    assert_eq!(o.effects.len(), 3);
                    assert!(o
                        .effects
                        .iter()
                        .any(|e| e.kind == EffectKind::Efficiency && e.magnitude == -impact));
                    assert_eq!(o.agent.new_state, AgentState::Available);
                    return;
                }
            }
        }
        panic!("no successful sabotage in 50 seeds");
    }

    #[test]
    fn success_chance_weights_skill_against_defense() {
        assert_eq!(success_chance(5, 5, 1), 40.0 + 45.0 + 10.0 - 8.0);
        assert_eq!(success_chance(1, 1, 5), 40.0 + 9.0 + 2.0 - 40.0);
        assert_eq!(success_chance(1, 1, 0), 51.0);
        // clamped at the edges
        assert_eq!(success_chance(5, 5, 0), 90.0);
    }

    #[test]
    fn active_cost_excludes_archived() {
        let mut reg = MissionRegistry::new();
        let mut r = rng();
        let a = planned(&mut reg, MissionKind::InfoGathering);
        let _b = planned(&mut reg, MissionKind::Sabotage);
        reg.start(a);
        reg.resolve(a, 5, 3, 3, 1, false, &mut r).unwrap();
        assert_eq!(reg.active_operating_cost(), Decimal::new(15_000, 0));
        assert_eq!(reg.archived().count(), 1);
        assert_eq!(reg.active().count(), 1);
    }
}
