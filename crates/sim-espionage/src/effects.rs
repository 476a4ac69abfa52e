//! Adapters translating mission effects into engine calls, plus the
//! cost/ROI analytics over historical missions.
//!
//! Engine failures never abort an effect list: each failed mutator is logged
//! and counted as not-applied, and the remaining effects still run.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sim_core::{
    CompanyId, EconomyOps, Effect, EffectKind, MissionKind, MissionState, ProductionOps,
};
use tracing::{debug, warn};

use crate::{AgentRegistry, CounterIntelRegistry, MissionRegistry};

/// Apply the economic effects in `effects` to the economy engine. Production
/// kinds are skipped. Returns the number of effects actually applied.
pub fn apply_economic_effects(effects: &[Effect], econ: &mut dyn EconomyOps) -> usize {
    let mut applied = 0;
    for e in effects {
        let result = match e.kind {
            EffectKind::MarketPrice => {
                econ.adjust_market_price(e.target, e.magnitude, e.duration_days)
            }
            EffectKind::StockValue => econ.adjust_stock_value(e.target, e.magnitude),
            EffectKind::Demand => econ.adjust_demand(e.target, e.magnitude, e.duration_days),
            EffectKind::InterestRate => econ.adjust_interest_rate(e.magnitude),
            EffectKind::Taxes => econ.adjust_taxes(e.magnitude),
            EffectKind::Cash => match Decimal::from_f64(e.magnitude) {
                Some(amount) => econ.adjust_cash(e.target, amount),
                None => {
                    warn!(company = %e.target, magnitude = e.magnitude, "non-finite cash effect");
                    continue;
                }
            },
            EffectKind::Efficiency
            | EffectKind::Quality
            | EffectKind::Speed
            | EffectKind::Costs
            | EffectKind::MaterialAvailability => {
                debug!(kind = ?e.kind, "production effect skipped by economic adapter");
                continue;
            }
        };
        match result {
            Ok(()) => applied += 1,
            Err(err) => {
                warn!(kind = ?e.kind, company = %e.target, %err, "economic effect not applied")
            }
        }
    }
    applied
}

/// Apply the production effects in `effects` to the production engine.
/// Economic kinds are skipped. Returns the number of effects applied.
pub fn apply_production_effects(effects: &[Effect], prod: &mut dyn ProductionOps) -> usize {
    let mut applied = 0;
    for e in effects {
        let result = match e.kind {
            EffectKind::Efficiency => prod.adjust_efficiency(e.target, e.magnitude, e.duration_days),
            EffectKind::Quality => prod.adjust_quality(e.target, e.magnitude, e.duration_days),
            EffectKind::Speed => prod.adjust_speed(e.target, e.magnitude),
            EffectKind::Costs => prod.adjust_costs(e.target, e.magnitude),
            EffectKind::MaterialAvailability => {
                prod.adjust_material_availability(e.target, e.magnitude)
            }
            EffectKind::MarketPrice
            | EffectKind::StockValue
            | EffectKind::Demand
            | EffectKind::InterestRate
            | EffectKind::Taxes
            | EffectKind::Cash => {
                debug!(kind = ?e.kind, "economic effect skipped by production adapter");
                continue;
            }
        };
        match result {
            Ok(()) => applied += 1,
            Err(err) => {
                warn!(kind = ?e.kind, company = %e.target, %err, "production effect not applied")
            }
        }
    }
    applied
}

/// Model the daily economic loss a sabotage inflicts on a company:
/// lost output valued at full price, plus quality-degraded output valued at
/// half price. An estimate for analytics, not measured truth. `None` when
/// the company runs no factory.
pub fn estimate_sabotage_loss(
    company: CompanyId,
    prod: &dyn ProductionOps,
    efficiency_penalty: f64,
    quality_penalty: f64,
) -> Option<f64> {
    let report = prod.production_report(company)?;
    let lost_output = report.daily_output * (efficiency_penalty / 100.0) * report.unit_value;
    let degraded = report.daily_output * (quality_penalty / 100.0) * report.unit_value * 0.5;
    Some(lost_output + degraded)
}

fn benefit_for(kind: MissionKind) -> Decimal {
    match kind {
        MissionKind::Sabotage => Decimal::new(50_000, 0),
        MissionKind::TechTheft => Decimal::new(200_000, 0),
        MissionKind::InfoGathering => Decimal::new(30_000, 0),
        // manipulation pays through its market effects, not a fixed bonus
        MissionKind::MarketManipulation => Decimal::ZERO,
    }
}

/// Return on the espionage program over `days`, in percent.
///
/// Cost: agent salaries and the player's counter-espionage budget pro-rated
/// to `days / 30`, plus active missions' operating costs. Benefit: a fixed
/// bonus per completed mission kind. Returns 0 when the cost is 0.
pub fn espionage_roi(
    days: u32,
    agents: &AgentRegistry,
    missions: &MissionRegistry,
    counterintel: &CounterIntelRegistry,
) -> f64 {
    let months = Decimal::from(days) / Decimal::from(30u32);
    let cost = agents.monthly_cost_total() * months
        + missions.active_operating_cost()
        + counterintel.player_monthly_budget() * months;
    if cost <= Decimal::ZERO {
        return 0.0;
    }
    let benefit: Decimal = missions
        .archived()
        .filter(|m| m.state == MissionState::Completed)
        .map(|m| benefit_for(m.kind))
        .sum();
    ((benefit - cost) / cost * Decimal::new(100, 0))
        .to_f64()
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rust_decimal::Decimal;
    use sim_core::{EngineError, ProductionReport, TechId};
    use sim_econ::{CompanyMarket, EconomyEngine};
    use sim_production::{FactoryState, ProductionEngine};
    use std::collections::BTreeSet;

    const TARGET: CompanyId = CompanyId(2);

    fn econ() -> EconomyEngine {
        let mut e = EconomyEngine::new(5.0, 20.0);
        e.register_company(
            TARGET,
            CompanyMarket {
                market_price: 100.0,
                demand: 50.0,
                stock_value: 100.0,
                cash: Decimal::new(1_000_000, 0),
            },
        );
        e
    }

    fn prod() -> ProductionEngine {
        let mut p = ProductionEngine::new();
        p.register_factory(
            TARGET,
            FactoryState {
                efficiency: 100.0,
                quality: 80.0,
                speed_modifier: 1.0,
                cost_modifier: 1.0,
                material_availability: 100.0,
                technologies: BTreeSet::new(),
                tech_level: 3,
                base_daily_output: 1000.0,
                unit_value: 50.0,
            },
        );
        p
    }

    fn effect(kind: EffectKind, magnitude: f64) -> Effect {
        Effect {
            kind,
            target: TARGET,
            magnitude,
            duration_days: None,
        }
    }

    #[test]
    fn economic_adapter_applies_and_skips() {
        let mut e = econ();
        let effects = vec![
            effect(EffectKind::StockValue, -10.0),
            effect(EffectKind::Efficiency, -20.0), // production kind, skipped
            effect(EffectKind::Cash, -50_000.0),
        ];
        assert_eq!(apply_economic_effects(&effects, &mut e), 2);
        assert!((e.market(TARGET).unwrap().stock_value - 90.0).abs() < 1e-9);
        assert_eq!(
            e.market(TARGET).unwrap().cash,
            Decimal::new(950_000, 0)
        );
    }

    #[test]
    fn production_adapter_applies_and_skips() {
        let mut p = prod();
        let effects = vec![
            effect(EffectKind::Efficiency, -25.0),
            effect(EffectKind::StockValue, -10.0), // economic kind, skipped
            effect(EffectKind::Quality, -10.0),
        ];
        assert_eq!(apply_production_effects(&effects, &mut p), 2);
        assert!((p.factory(TARGET).unwrap().efficiency - 75.0).abs() < 1e-9);
        assert!((p.factory(TARGET).unwrap().quality - 70.0).abs() < 1e-9);
    }

    #[test]
    fn engine_failure_does_not_abort_the_list() {
        let mut e = econ();
        let effects = vec![
            Effect {
                kind: EffectKind::StockValue,
                target: CompanyId(42), // unregistered
                magnitude: -10.0,
                duration_days: None,
            },
            effect(EffectKind::StockValue, -10.0),
        ];
        assert_eq!(apply_economic_effects(&effects, &mut e), 1);
        assert!((e.market(TARGET).unwrap().stock_value - 90.0).abs() < 1e-9);
    }

    #[test]
    fn failing_ops_surface_as_engine_errors() {
        let mut p = prod();
        assert_eq!(
            p.adjust_efficiency(CompanyId(42), -10.0, None),
            Err(EngineError::UnknownCompany(CompanyId(42)))
        );
    }

    #[test]
    fn sabotage_loss_model() {
        let p = prod();
        // 1000 × 20% × 50 + 1000 × 10% × 50 × 0.5 = 10 000 + 2 500
        let loss = estimate_sabotage_loss(TARGET, &p, 20.0, 10.0).unwrap();
        assert!((loss - 12_500.0).abs() < 1e-9);
        assert!(estimate_sabotage_loss(CompanyId(42), &p, 20.0, 10.0).is_none());
    }

    #[test]
    fn sabotage_loss_uses_effective_output() {
        let mut p = prod();
        p.adjust_efficiency(TARGET, -50.0, None).unwrap();
        let report: ProductionReport = p.production_report(TARGET).unwrap();
        assert!((report.daily_output - 500.0).abs() < 1e-9);
        let loss = estimate_sabotage_loss(TARGET, &p, 20.0, 0.0).unwrap();
        assert!((loss - 5_000.0).abs() < 1e-9);
    }

    #[test]
    fn roi_zero_cost_guard() {
        let agents = AgentRegistry::new();
        let missions = MissionRegistry::new();
        let counterintel = CounterIntelRegistry::new(CompanyId(1));
        assert_eq!(espionage_roi(30, &agents, &missions, &counterintel), 0.0);
    }

    #[test]
    fn roi_counts_completed_missions_only() {
        let mut r = ChaCha8Rng::seed_from_u64(0);
        let mut agents = AgentRegistry::new();
        let ids = agents.generate_pool(1, 15, &mut r);
        agents.hire(ids[0]);
        let salary = agents.monthly_cost_total();

        let mut missions = MissionRegistry::new();
        // drive one tech theft to Completed
        let mut done = false;
        for seed in 0..100u64 {
            let mut seeded = ChaCha8Rng::seed_from_u64(seed);
            let id = missions.create(
                MissionKind::TechTheft,
                TARGET,
                "quantum-litho",
                ids[0],
                0,
            );
            missions.start(id);
            if let Some(o) = missions.resolve(id, 10, 5, 5, 0, false, &mut seeded) {
                if o.success {
                    assert_eq!(o.stolen_technology, Some(TechId("quantum-litho".into())));
                    done = true;
                    break;
                }
            }
        }
        assert!(done);

        let counterintel = CounterIntelRegistry::new(CompanyId(1));
        let roi = espionage_roi(30, &agents, &missions, &counterintel);
        // benefit is 200k per completed theft; at one month of salary the
        // program is deep in the black
        assert!(roi > 0.0, "roi {roi}, salary {salary}");
    }
}
