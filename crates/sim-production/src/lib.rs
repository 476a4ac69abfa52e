#![deny(warnings)]

//! Production and recipe models for Shadow Tycoon.
//!
//! This crate provides:
//! - the recipe tuning curves (`production_time`, `production_quality`,
//!   `production_cost`)
//! - the pure progress projection over [`sim_core::ProductionProcess`]
//! - [`ProductionEngine`], the stateful per-company factory ledger
//!   implementing [`sim_core::ProductionOps`] for the production effects
//!   adapter

use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{
    clamp_pct, CompanyId, EngineError, ProcessStatus, ProductionOps, ProductionProcess,
    ProductionRecipe, ProductionReport, TechId,
};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

/// Errors produced by the recipe curves.
#[derive(Debug, Error, PartialEq)]
pub enum ProductionError {
    /// Operator skill must lie in [1, 5].
    #[error("operator skill out of range [1,5]: {0}")]
    SkillOutOfRange(u8),
    /// Numeric conversion to Decimal failed.
    #[error("non-finite numeric conversion")]
    NonFinite,
}

// Curve weights: how strongly each input bends the base value.
const TIME_EFFICIENCY_WEIGHT: f64 = 0.3;
const TIME_SKILL_WEIGHT: f64 = 0.04;
const TIME_TECH_WEIGHT: f64 = 0.05;
const QUALITY_EFFICIENCY_WEIGHT: f64 = 0.25;
const QUALITY_SKILL_WEIGHT: f64 = 0.03;
const QUALITY_TECH_WEIGHT: f64 = 0.05;
const COST_INEFFICIENCY_WEIGHT: f64 = 0.25;

fn tech_surplus(company_level: u8, recipe: &ProductionRecipe) -> f64 {
    company_level.saturating_sub(recipe.tech_level).min(2) as f64
}

/// Estimate the run length in days for one recipe execution.
///
/// Higher factory efficiency, operator skill and surplus tech level each
/// shorten the run; ±5% noise is applied last. The result never drops below
/// a quarter of the recipe's base time.
pub fn production_time(
    recipe: &ProductionRecipe,
    efficiency: f64,
    operator_skill: u8,
    company_tech_level: u8,
    rng: &mut impl Rng,
) -> Result<f64, ProductionError> {
    if !(1..=5).contains(&operator_skill) {
        return Err(ProductionError::SkillOutOfRange(operator_skill));
    }
    let eff = clamp_pct(efficiency) / 100.0;
    let factor = (1.0 - TIME_EFFICIENCY_WEIGHT * eff)
        * (1.0 - TIME_SKILL_WEIGHT * operator_skill as f64)
        * (1.0 - TIME_TECH_WEIGHT * tech_surplus(company_tech_level, recipe));
    let noise = 1.0 + rng.gen_range(-0.05..=0.05);
    Ok((recipe.base_time_days * factor * noise).max(recipe.base_time_days * 0.25))
}

/// Estimate the output quality in [0, 100] for one recipe execution.
///
/// Blends a fixed floor with efficiency, skill and tech contributions,
/// then applies ±10% noise.
pub fn production_quality(
    recipe: &ProductionRecipe,
    efficiency: f64,
    operator_skill: u8,
    company_tech_level: u8,
    rng: &mut impl Rng,
) -> Result<f64, ProductionError> {
    if !(1..=5).contains(&operator_skill) {
        return Err(ProductionError::SkillOutOfRange(operator_skill));
    }
    let eff = clamp_pct(efficiency) / 100.0;
    let factor = 0.6
        + QUALITY_EFFICIENCY_WEIGHT * eff
        + QUALITY_SKILL_WEIGHT * operator_skill as f64
        + QUALITY_TECH_WEIGHT * tech_surplus(company_tech_level, recipe);
    let noise = 1.0 + rng.gen_range(-0.10..=0.10);
    Ok(clamp_pct(recipe.base_quality * factor * noise))
}

/// Estimate the run cost for one recipe execution.
///
/// Inefficiency raises costs up to 25%; ±5% noise is applied last.
pub fn production_cost(
    recipe: &ProductionRecipe,
    efficiency: f64,
    cost_modifier: f64,
    rng: &mut impl Rng,
) -> Result<Decimal, ProductionError> {
    let eff = clamp_pct(efficiency) / 100.0;
    let factor = (1.0 + COST_INEFFICIENCY_WEIGHT * (1.0 - eff)) * cost_modifier.max(0.0);
    let noise = 1.0 + rng.gen_range(-0.05..=0.05);
    let f = Decimal::from_f64(factor * noise).ok_or(ProductionError::NonFinite)?;
    Ok(recipe.base_cost * f)
}

/// Progress of a process at query time `now`, in [0, 100].
///
/// A pure projection of elapsed time against `[start_time, end_time]`;
/// nothing is stored or recomputed for queued/terminal processes.
pub fn process_progress(p: &ProductionProcess, now: f64) -> f64 {
    match p.status {
        ProcessStatus::Queued => 0.0,
        ProcessStatus::Completed => 100.0,
        ProcessStatus::Failed => clamp_pct(raw_progress(p, now)),
        ProcessStatus::InProgress => clamp_pct(raw_progress(p, now)),
    }
}

fn raw_progress(p: &ProductionProcess, now: f64) -> f64 {
    let span = p.end_time - p.start_time;
    if span <= 0.0 {
        return 100.0;
    }
    (now - p.start_time) / span * 100.0
}

/// Advance a process's status as of `now`. Status is monotonic: only
/// `InProgress` can move (to `Completed`, once progress reaches 100);
/// `Queued`, `Completed` and `Failed` are returned unchanged.
pub fn advance_process(p: &mut ProductionProcess, now: f64) -> ProcessStatus {
    if p.status == ProcessStatus::InProgress && process_progress(p, now) >= 100.0 {
        p.status = ProcessStatus::Completed;
    }
    p.status
}

/// Per-company factory state tracked by the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FactoryState {
    /// Factory efficiency in [0, 100].
    pub efficiency: f64,
    /// Output quality in [0, 100].
    pub quality: f64,
    /// Speed multiplier (baseline 1.0).
    pub speed_modifier: f64,
    /// Cost multiplier (baseline 1.0).
    pub cost_modifier: f64,
    /// Raw-material availability in [0, 100].
    pub material_availability: f64,
    /// Technologies the company owns.
    pub technologies: BTreeSet<TechId>,
    /// Company technology level in [1, 5].
    pub tech_level: u8,
    /// Base units produced per day at 100% efficiency.
    pub base_daily_output: f64,
    /// Market value of one output unit.
    pub unit_value: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum FactoryField {
    Efficiency,
    Quality,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TimedDelta {
    company: CompanyId,
    field: FactoryField,
    /// The delta actually applied after clamping, so expiry restores the
    /// pre-effect value even when the effect hit a bound.
    applied: f64,
    expires_day: u32,
}

/// Stateful factory ledger: one [`FactoryState`] per registered company plus
/// the running production processes. Implements [`ProductionOps`] so the
/// espionage effects adapter can mutate it through a checked interface.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProductionEngine {
    factories: BTreeMap<CompanyId, FactoryState>,
    processes: BTreeMap<u64, ProductionProcess>,
    timed: Vec<TimedDelta>,
    next_process: u64,
    day: u32,
}

impl ProductionEngine {
    /// Empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a company's factory.
    pub fn register_factory(&mut self, id: CompanyId, factory: FactoryState) {
        self.factories.insert(id, factory);
    }

    /// Factory state for one company.
    pub fn factory(&self, id: CompanyId) -> Option<&FactoryState> {
        self.factories.get(&id)
    }

    /// Queue a production run of `recipe` for `company`, scheduled over
    /// `[start, start + duration]`.
    pub fn queue_process(
        &mut self,
        company: CompanyId,
        recipe: &ProductionRecipe,
        start: f64,
        duration_days: f64,
    ) -> u64 {
        self.next_process += 1;
        let id = self.next_process;
        self.processes.insert(
            id,
            ProductionProcess {
                id,
                recipe_id: recipe.id.clone(),
                company,
                start_time: start,
                end_time: start + duration_days.max(0.25),
                status: ProcessStatus::Queued,
            },
        );
        id
    }

    /// Move a queued process into `InProgress`. Returns false when the
    /// process is unknown or not queued.
    pub fn start_process(&mut self, id: u64) -> bool {
        match self.processes.get_mut(&id) {
            Some(p) if p.status == ProcessStatus::Queued => {
                p.status = ProcessStatus::InProgress;
                true
            }
            _ => false,
        }
    }

    /// A process by id.
    pub fn process(&self, id: u64) -> Option<&ProductionProcess> {
        self.processes.get(&id)
    }

    /// Advance processes and revert expired timed deltas as of `day`.
    /// Returns the number of processes that completed this tick.
    pub fn tick(&mut self, day: u32) -> usize {
        self.day = day;
        let now = day as f64;
        let mut completed = 0;
        for p in self.processes.values_mut() {
            let before = p.status;
            if advance_process(p, now) == ProcessStatus::Completed
                && before == ProcessStatus::InProgress
            {
                completed += 1;
            }
        }

        let mut remaining = Vec::with_capacity(self.timed.len());
        for t in self.timed.drain(..) {
            if day >= t.expires_day {
                if let Some(f) = self.factories.get_mut(&t.company) {
                    match t.field {
                        FactoryField::Efficiency => {
                            f.efficiency = clamp_pct(f.efficiency - t.applied)
                        }
                        FactoryField::Quality => f.quality = clamp_pct(f.quality - t.applied),
                    }
                }
                debug!(company = %t.company, ?t.field, "production modifier expired");
            } else {
                remaining.push(t);
            }
        }
        self.timed = remaining;
        completed
    }

    fn factory_mut(&mut self, id: CompanyId) -> Result<&mut FactoryState, EngineError> {
        self.factories
            .get_mut(&id)
            .ok_or(EngineError::UnknownCompany(id))
    }

    fn check_delta(delta: f64) -> Result<(), EngineError> {
        if delta.is_finite() {
            Ok(())
        } else {
            Err(EngineError::InvalidMagnitude(delta))
        }
    }
}

impl ProductionOps for ProductionEngine {
    fn adjust_efficiency(
        &mut self,
        target: CompanyId,
        delta: f64,
        duration_days: Option<u32>,
    ) -> Result<(), EngineError> {
        Self::check_delta(delta)?;
        let day = self.day;
        let f = self.factory_mut(target)?;
        let before = f.efficiency;
        f.efficiency = clamp_pct(before + delta);
        let applied = f.efficiency - before;
        if let Some(days) = duration_days {
            self.timed.push(TimedDelta {
                company: target,
                field: FactoryField::Efficiency,
                applied,
                expires_day: day.saturating_add(days),
            });
        }
        Ok(())
    }

    fn adjust_quality(
        &mut self,
        target: CompanyId,
        delta: f64,
        duration_days: Option<u32>,
    ) -> Result<(), EngineError> {
        Self::check_delta(delta)?;
        let day = self.day;
        let f = self.factory_mut(target)?;
        let before = f.quality;
        f.quality = clamp_pct(before + delta);
        let applied = f.quality - before;
        if let Some(days) = duration_days {
            self.timed.push(TimedDelta {
                company: target,
                field: FactoryField::Quality,
                applied,
                expires_day: day.saturating_add(days),
            });
        }
        Ok(())
    }

    fn adjust_speed(&mut self, target: CompanyId, delta: f64) -> Result<(), EngineError> {
        Self::check_delta(delta)?;
        let f = self.factory_mut(target)?;
        f.speed_modifier = (f.speed_modifier * (1.0 + delta / 100.0)).max(0.1);
        Ok(())
    }

    fn adjust_costs(&mut self, target: CompanyId, delta: f64) -> Result<(), EngineError> {
        Self::check_delta(delta)?;
        let f = self.factory_mut(target)?;
        f.cost_modifier = (f.cost_modifier * (1.0 + delta / 100.0)).max(0.1);
        Ok(())
    }

    fn adjust_material_availability(
        &mut self,
        target: CompanyId,
        delta: f64,
    ) -> Result<(), EngineError> {
        Self::check_delta(delta)?;
        let f = self.factory_mut(target)?;
        f.material_availability = clamp_pct(f.material_availability + delta);
        Ok(())
    }

    fn has_technology(&self, target: CompanyId, tech: &TechId) -> bool {
        self.factories
            .get(&target)
            .is_some_and(|f| f.technologies.contains(tech))
    }

    fn install_technology(&mut self, target: CompanyId, tech: TechId) -> Result<(), EngineError> {
        let f = self.factory_mut(target)?;
        f.technologies.insert(tech);
        Ok(())
    }

    fn production_report(&self, target: CompanyId) -> Option<ProductionReport> {
        let f = self.factories.get(&target)?;
        Some(ProductionReport {
            daily_output: f.base_daily_output * (f.efficiency / 100.0) * f.speed_modifier,
            efficiency: f.efficiency,
            quality: f.quality,
            unit_value: f.unit_value,
        })
    }
}
