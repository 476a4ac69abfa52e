//! Per-company counter-espionage posture and the detection roll.

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{
    CompanyId, CounterEspionageDepartment, Mission, MissionId, MissionKind, Notification,
    NotificationKind, NotificationSink, TechId,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Detection efficiency in [0, 100] derived from a department's
/// configuration. Each contribution is capped so no single input dominates:
/// level×10, budget up to 30 points (1 point per 10 000), staff up to 20
/// points (0.5 per head), technologies up to 25 points (5 each).
pub fn detection_efficiency(
    security_level: u8,
    monthly_budget: Decimal,
    staff: u32,
    technology_count: usize,
) -> f64 {
    let budget = monthly_budget.to_f64().unwrap_or(0.0).max(0.0);
    let score = security_level as f64 * 10.0
        + (budget / 10_000.0).min(30.0)
        + (staff as f64 * 0.5).min(20.0)
        + (technology_count as f64 * 5.0).min(25.0);
    score.clamp(0.0, 100.0)
}

fn kind_modifier(kind: MissionKind) -> f64 {
    match kind {
        MissionKind::InfoGathering => 0.8,
        MissionKind::Sabotage => 1.2,
        MissionKind::TechTheft | MissionKind::MarketManipulation => 1.0,
    }
}

/// Owns every company's defensive department. One department per company;
/// reconfiguration replaces the posture but never touches incident history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CounterIntelRegistry {
    departments: BTreeMap<CompanyId, CounterEspionageDepartment>,
    player: CompanyId,
}

impl CounterIntelRegistry {
    /// Registry that notifies when missions against `player` are caught.
    pub fn new(player: CompanyId) -> Self {
        Self {
            departments: BTreeMap::new(),
            player,
        }
    }

    /// Create or reconfigure a company's department. The derived detection
    /// efficiency is recomputed; history and accrued spend carry over.
    pub fn configure(
        &mut self,
        company: CompanyId,
        security_level: u8,
        monthly_budget: Decimal,
        staff: u32,
        technologies: Vec<TechId>,
    ) -> &CounterEspionageDepartment {
        let security_level = security_level.clamp(1, 5);
        let efficiency =
            detection_efficiency(security_level, monthly_budget, staff, technologies.len());
        let dept = self
            .departments
            .entry(company)
            .or_insert_with(|| CounterEspionageDepartment {
                company,
                security_level,
                monthly_budget,
                staff,
                technologies: Vec::new(),
                detection_efficiency: efficiency,
                incidents: Vec::new(),
                spend_accrued: Decimal::ZERO,
            });
        dept.security_level = security_level;
        dept.monthly_budget = monthly_budget;
        dept.staff = staff;
        dept.technologies = technologies;
        dept.detection_efficiency = efficiency;
        info!(company = %company, efficiency, "counter-espionage configured");
        dept
    }

    /// Roll detection for a mission targeting one of our companies.
    ///
    /// One-shot Bernoulli trial: the caller must invoke this exactly once
    /// per mission, at resolution time. Without a department the raw base
    /// probability applies and nothing is recorded; with one, the final
    /// probability is `clamp(5, 95, base × efficiency/50 × kind_modifier)`
    /// and a detection is appended to the incident history. Detections
    /// against the player raise a notification, escalated to an alert for
    /// sabotage and tech theft.
    pub fn attempt_detection(
        &mut self,
        mission: &Mission,
        rng: &mut impl Rng,
        sink: &mut dyn NotificationSink,
    ) -> bool {
        let probability = match self.departments.get(&mission.target) {
            None => mission.base_detection,
            Some(d) => (mission.base_detection * (d.detection_efficiency / 50.0)
                * kind_modifier(mission.kind))
            .clamp(5.0, 95.0),
        };
        let detected = rng.gen_range(0.0..100.0) < probability;
        debug!(mission = %mission.id, probability, detected, "detection roll");
        if !detected {
            return false;
        }

        if let Some(d) = self.departments.get_mut(&mission.target) {
            d.incidents.push(mission.id);
        }
        if mission.target == self.player {
            sink.notify(Notification {
                title: "Espionage detected".into(),
                message: format!(
                    "Security intercepted a hostile operation against {}",
                    mission.target
                ),
                kind: NotificationKind::Warning,
                icon: "shield".into(),
            });
            if matches!(mission.kind, MissionKind::Sabotage | MissionKind::TechTheft) {
                sink.notify_alert(Notification {
                    title: "Critical intrusion stopped".into(),
                    message: format!(
                        "A {} attempt against your company was neutralized",
                        match mission.kind {
                            MissionKind::Sabotage => "sabotage",
                            _ => "technology theft",
                        }
                    ),
                    kind: NotificationKind::Danger,
                    icon: "siren".into(),
                });
            }
        }
        true
    }

    /// Accrue one day of budget spend for every department. Returns the
    /// number of departments ticked.
    pub fn tick(&mut self) -> usize {
        let daily = Decimal::new(30, 0);
        for d in self.departments.values_mut() {
            d.spend_accrued += d.monthly_budget / daily;
        }
        self.departments.len()
    }

    /// A company's department, if configured.
    pub fn department(&self, company: CompanyId) -> Option<&CounterEspionageDepartment> {
        self.departments.get(&company)
    }

    /// Missions detected against a company, oldest first. Empty when the
    /// company has no department.
    pub fn incident_history(&self, company: CompanyId) -> &[MissionId] {
        self.departments
            .get(&company)
            .map(|d| d.incidents.as_slice())
            .unwrap_or(&[])
    }

    /// The player's monthly defensive budget, for the ROI analytics.
    pub fn player_monthly_budget(&self) -> Decimal {
        self.departments
            .get(&self.player)
            .map(|d| d.monthly_budget)
            .unwrap_or(Decimal::ZERO)
    }
}
