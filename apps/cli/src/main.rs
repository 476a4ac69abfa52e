#![deny(warnings)]

//! Headless scenario driver: seeds a two-company world, runs an espionage
//! campaign for N game days, and prints KPI lines.

use anyhow::Result;
use rust_decimal::Decimal;
use sim_core::{CompanyId, MemorySink, MissionKind, ProductionOps, TechId};
use sim_econ::{CompanyMarket, EconomyEngine};
use sim_espionage::{EspionageCoordinator, Scheduler};
use sim_production::{FactoryState, ProductionEngine};
use std::collections::BTreeSet;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

const PLAYER: CompanyId = CompanyId(1);
const RIVAL: CompanyId = CompanyId(2);

fn parse_args() -> (u32, u64) {
    let mut days = 30u32;
    let mut seed = 42u64;
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--days" => days = it.next().and_then(|s| s.parse().ok()).unwrap_or(days),
            "--seed" => seed = it.next().and_then(|s| s.parse().ok()).unwrap_or(seed),
            _ => {}
        }
    }
    (days, seed)
}

fn seed_engines() -> (EconomyEngine, ProductionEngine) {
    let mut econ = EconomyEngine::new(5.0, 20.0);
    for id in [PLAYER, RIVAL] {
        econ.register_company(
            id,
            CompanyMarket {
                market_price: 120.0,
                demand: 55.0,
                stock_value: 100.0,
                cash: Decimal::new(2_000_000, 0),
            },
        );
    }

    let mut prod = ProductionEngine::new();
    prod.register_factory(
        RIVAL,
        FactoryState {
            efficiency: 85.0,
            quality: 75.0,
            speed_modifier: 1.0,
            cost_modifier: 1.0,
            material_availability: 100.0,
            technologies: BTreeSet::from([TechId("quantum-litho".into())]),
            tech_level: 3,
            base_daily_output: 1200.0,
            unit_value: 95.0,
        },
    );
    (econ, prod)
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let (days, seed) = parse_args();
    info!(days, seed, "starting espionage scenario");

    let (mut econ, mut prod) = seed_engines();
    let mut sink = MemorySink::default();
    let mut coord = EspionageCoordinator::new(PLAYER, seed);
    let mut scheduler = Scheduler::new();

    coord.configure_counter_intel(
        PLAYER,
        3,
        Decimal::new(120_000, 0),
        25,
        vec![TechId("biometric-vault".into())],
    );

    let pool = coord.recruit_pool(6, 20);
    let agent = pool[0];
    coord
        .hire_agent(agent)
        .ok_or_else(|| anyhow::anyhow!("recruit vanished from the pool"))?;

    let mission = coord
        .create_mission(MissionKind::TechTheft, RIVAL, "quantum-litho", agent)
        .ok_or_else(|| anyhow::anyhow!("agent unavailable for mission"))?;
    coord.start_mission(mission);

    let mut outcomes = 0u32;
    for _ in 0..days {
        let day = scheduler.next_day();
        coord.advance_day(day);
        econ.tick(day);
        prod.tick(day);
        if coord.mission_resolvable(mission) {
            if let Some(outcome) = coord.resolve_mission(mission, &mut econ, &mut prod, &mut sink)
            {
                outcomes += 1;
                info!(
                    success = outcome.success,
                    detected = outcome.detected,
                    stolen = ?outcome.stolen_technology,
                    "campaign mission resolved"
                );
            }
        }
    }

    let roi = coord.roi(days);
    let payroll = coord.agents().monthly_cost_total();
    println!(
        "Campaign over {} days | agents: {} | missions resolved: {} | payroll: ${}/mo",
        days,
        coord.agents().hired_agents().count(),
        outcomes,
        payroll
    );
    println!(
        "KPI | roi: {:.1}% | incidents vs player: {} | notifications: {} | alerts: {}",
        roi,
        coord.counterintel().incident_history(PLAYER).len(),
        sink.notifications.len(),
        sink.alerts.len()
    );
    if let Some(report) = prod.production_report(RIVAL) {
        println!(
            "Rival factory | output: {:.0}/day | efficiency: {:.0}% | quality: {:.0}%",
            report.daily_output, report.efficiency, report.quality
        );
    }

    Ok(())
}
