#![deny(warnings)]

//! Economic models: pricing and demand for Shadow Tycoon.
//!
//! This crate provides:
//! - `calculate_price` / `calculate_demand`, the pure market curves used by
//!   the wider game and by the espionage effects layer
//! - [`EconomyEngine`], the stateful per-company market ledger implementing
//!   [`sim_core::EconomyOps`] for the economic effects adapter

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{clamp_pct, CompanyId, EconomyOps, EngineError};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Errors produced by the pure market curves.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Base price must be strictly positive and finite.
    #[error("invalid base price: {0}")]
    InvalidPrice(f64),
    /// Weighting factors must be strictly positive and finite.
    #[error("invalid factor: {0}")]
    InvalidFactor(f64),
    /// Inflation must be finite and > -1.
    #[error("invalid inflation: {0}")]
    InvalidInflation(f64),
}

/// Compute a market price from demand/supply pressure.
///
/// Demand and supply are clamped into [0, 100]. The demand/supply ratio is
/// damped asymmetrically (excess demand moves prices 10% per ratio unit,
/// excess supply only 5%), the resulting factor is clamped into [0.5, 2.0],
/// inflation is applied, and up to ±5% noise is added. The result is rounded
/// to 2 decimals.
pub fn calculate_price(
    base: f64,
    demand: f64,
    supply: f64,
    demand_factor: f64,
    supply_factor: f64,
    inflation: f64,
    rng: &mut impl Rng,
) -> Result<f64, EconError> {
    if !(base.is_finite() && base > 0.0) {
        return Err(EconError::InvalidPrice(base));
    }
    for f in [demand_factor, supply_factor] {
        if !(f.is_finite() && f > 0.0) {
            return Err(EconError::InvalidFactor(f));
        }
    }
    if !(inflation.is_finite() && inflation > -1.0) {
        return Err(EconError::InvalidInflation(inflation));
    }

    let demand = clamp_pct(demand);
    let supply = clamp_pct(supply);
    let denom = supply * supply_factor;
    let denom = if denom == 0.0 { 1.0 } else { denom };
    let ratio = (demand * demand_factor) / denom;

    let price_factor = if ratio > 1.0 {
        1.0 + (ratio - 1.0) * 0.1
    } else if ratio < 1.0 {
        1.0 - (1.0 - ratio) * 0.05
    } else {
        1.0
    };
    let price_factor = price_factor.clamp(0.5, 2.0);

    let noise = 1.0 + rng.gen_range(-0.05..=0.05);
    let raw = base * price_factor * (1.0 + inflation) * noise;
    Ok((raw * 100.0).round() / 100.0)
}

/// Compute demand in [0, 100] for a good.
///
/// Blends a relative-price factor (cheaper than the reference price raises
/// demand) with a quality factor, weighted by buyer wealth: wealthy buyers
/// weigh quality, price-sensitive buyers weigh price. The blend is scaled by
/// a log-population factor and ±10% noise.
pub fn calculate_demand(
    base_demand: f64,
    price: f64,
    reference_price: f64,
    quality: f64,
    wealth: f64,
    population: u64,
    rng: &mut impl Rng,
) -> Result<f64, EconError> {
    if !(price.is_finite() && price > 0.0) {
        return Err(EconError::InvalidPrice(price));
    }
    if !(reference_price.is_finite() && reference_price > 0.0) {
        return Err(EconError::InvalidPrice(reference_price));
    }

    let price_factor = (reference_price / price).clamp(0.25, 2.0);
    let quality_factor = 0.5 + clamp_pct(quality) / 100.0;
    let wealth = clamp_pct(wealth) / 100.0;
    let mix = wealth * quality_factor + (1.0 - wealth) * price_factor;

    // Reference population of one million maps to a scale of 1.0.
    let pop_factor = ((population as f64 + 1.0).ln() / 1_000_000f64.ln()).clamp(0.1, 1.5);

    let noise = 1.0 + rng.gen_range(-0.10..=0.10);
    Ok(clamp_pct(clamp_pct(base_demand) * mix * pop_factor * noise))
}

/// Per-company market state tracked by the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompanyMarket {
    /// Current unit price of the company's flagship good.
    pub market_price: f64,
    /// Demand for the good in [0, 100].
    pub demand: f64,
    /// Stock value index (baseline 100).
    pub stock_value: f64,
    /// Cash reserves.
    pub cash: Decimal,
}

/// A reverting modifier installed by a timed effect.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct TimedModifier {
    company: CompanyId,
    field: ModifiedField,
    /// The multiplicative factor actually applied, after any clamping, so
    /// expiry divides out exactly what was multiplied in.
    factor: f64,
    expires_day: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum ModifiedField {
    MarketPrice,
    Demand,
}

/// Stateful market ledger: one [`CompanyMarket`] per registered company plus
/// the global interest and tax rates. Implements [`EconomyOps`] so the
/// espionage effects adapter can mutate it through a checked interface.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EconomyEngine {
    markets: BTreeMap<CompanyId, CompanyMarket>,
    timed: Vec<TimedModifier>,
    /// Last day passed to [`EconomyEngine::tick`]; anchors timed modifiers.
    day: u32,
    /// Global interest rate in percent.
    pub interest_rate: f64,
    /// Global tax rate in percent.
    pub tax_rate: f64,
}

impl EconomyEngine {
    /// Engine with the given global rates and no companies.
    pub fn new(interest_rate: f64, tax_rate: f64) -> Self {
        Self {
            markets: BTreeMap::new(),
            timed: Vec::new(),
            day: 0,
            interest_rate,
            tax_rate,
        }
    }

    /// Register (or replace) a company's market state.
    pub fn register_company(&mut self, id: CompanyId, market: CompanyMarket) {
        self.markets.insert(id, market);
    }

    /// Market state for one company.
    pub fn market(&self, id: CompanyId) -> Option<&CompanyMarket> {
        self.markets.get(&id)
    }

    /// Revert timed modifiers that have expired as of `day`.
    /// Returns the number reverted.
    pub fn tick(&mut self, day: u32) -> usize {
        self.day = day;
        let mut reverted = 0;
        let mut remaining = Vec::with_capacity(self.timed.len());
        for m in self.timed.drain(..) {
            if day >= m.expires_day {
                if let Some(market) = self.markets.get_mut(&m.company) {
                    match m.field {
                        ModifiedField::MarketPrice => market.market_price /= m.factor,
                        ModifiedField::Demand => {
                            market.demand = clamp_pct(market.demand / m.factor)
                        }
                    }
                }
                debug!(company = %m.company, ?m.field, "economic modifier expired");
                reverted += 1;
            } else {
                remaining.push(m);
            }
        }
        self.timed = remaining;
        reverted
    }

    fn install_timed(&mut self, company: CompanyId, field: ModifiedField, factor: f64, days: u32) {
        self.timed.push(TimedModifier {
            company,
            field,
            factor,
            expires_day: self.day.saturating_add(days),
        });
    }

    fn pct_factor(pct: f64) -> Result<f64, EngineError> {
        if !pct.is_finite() || pct <= -100.0 {
            return Err(EngineError::InvalidMagnitude(pct));
        }
        Ok(1.0 + pct / 100.0)
    }

    fn market_mut(&mut self, id: CompanyId) -> Result<&mut CompanyMarket, EngineError> {
        self.markets
            .get_mut(&id)
            .ok_or(EngineError::UnknownCompany(id))
    }
}

impl EconomyOps for EconomyEngine {
    fn adjust_market_price(
        &mut self,
        target: CompanyId,
        pct: f64,
        duration_days: Option<u32>,
    ) -> Result<(), EngineError> {
        let factor = Self::pct_factor(pct)?;
        let m = self.market_mut(target)?;
        m.market_price *= factor;
        if let Some(days) = duration_days {
            self.install_timed(target, ModifiedField::MarketPrice, factor, days);
        }
        Ok(())
    }

    fn adjust_stock_value(&mut self, target: CompanyId, pct: f64) -> Result<(), EngineError> {
        let factor = Self::pct_factor(pct)?;
        let m = self.market_mut(target)?;
        m.stock_value = (m.stock_value * factor).max(0.0);
        Ok(())
    }

    fn adjust_demand(
        &mut self,
        target: CompanyId,
        pct: f64,
        duration_days: Option<u32>,
    ) -> Result<(), EngineError> {
        let factor = Self::pct_factor(pct)?;
        let m = self.market_mut(target)?;
        let before = m.demand;
        m.demand = clamp_pct(before * factor);
        let applied = if before > 0.0 { m.demand / before } else { 1.0 };
        if let Some(days) = duration_days {
            self.install_timed(target, ModifiedField::Demand, applied, days);
        }
        Ok(())
    }

    fn adjust_interest_rate(&mut self, delta: f64) -> Result<(), EngineError> {
        if !delta.is_finite() {
            return Err(EngineError::InvalidMagnitude(delta));
        }
        self.interest_rate = (self.interest_rate + delta).max(0.0);
        Ok(())
    }

    fn adjust_taxes(&mut self, delta: f64) -> Result<(), EngineError> {
        if !delta.is_finite() {
            return Err(EngineError::InvalidMagnitude(delta));
        }
        self.tax_rate = (self.tax_rate + delta).clamp(0.0, 100.0);
        Ok(())
    }

    fn adjust_cash(&mut self, target: CompanyId, amount: Decimal) -> Result<(), EngineError> {
        let m = self.market_mut(target)?;
        m.cash += amount;
        Ok(())
    }
}
