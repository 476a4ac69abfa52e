#![deny(warnings)]

//! Core domain models and invariants for Shadow Tycoon.
//!
//! This crate defines the serializable types shared by the espionage
//! subsystem and the economic/production engines, together with validation
//! helpers that guarantee basic invariants and the capability traits the
//! effects adapters are compiled against.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a hired or recruitable agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

/// Unique identifier for an espionage mission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MissionId(pub u64);

/// Unique identifier for a company participating in the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub u64);

/// Identifier for a technology, e.g. "quantum-litho", "ai-routing".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TechId(pub String);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

impl std::fmt::Display for MissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mission#{}", self.0)
    }
}

impl std::fmt::Display for CompanyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "company#{}", self.0)
    }
}

/// Field of expertise an agent brings to a mission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentSpecialty {
    /// Intelligence gathering and infiltration.
    Information,
    /// Technology theft and reverse engineering.
    Technology,
    /// Industrial sabotage.
    Sabotage,
    /// Market and media manipulation.
    Manipulation,
    /// Cheaper, unspecialized operative.
    Generalist,
}

impl AgentSpecialty {
    /// All specialties, in a fixed order usable for uniform sampling.
    pub const ALL: [AgentSpecialty; 5] = [
        AgentSpecialty::Information,
        AgentSpecialty::Technology,
        AgentSpecialty::Sabotage,
        AgentSpecialty::Manipulation,
        AgentSpecialty::Generalist,
    ];
}

/// Lifecycle state of an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    /// Idle and assignable.
    Available,
    /// Currently executing a mission.
    OnMission,
    /// Laying low after a mission; unavailable for a number of days.
    Recovering,
    /// Caught by the target's counter-espionage; permanently lost.
    Captured,
    /// Left the trade; kept on the books for history.
    Retired,
}

/// A hireable operative that executes espionage missions.
///
/// Invariants: `current_mission` is set iff `state == OnMission`, and
/// `recovery_days_left` is set iff `state == Recovering`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agent {
    /// Registry-assigned identifier.
    pub id: AgentId,
    /// Cover name used in reports.
    pub codename: String,
    /// Field of expertise.
    pub specialty: AgentSpecialty,
    /// Skill level in [1, 5].
    pub skill: u8,
    /// Loyalty in [1, 5]; low loyalty worsens mission odds.
    pub loyalty: u8,
    /// Salary accrued per 30-day month.
    pub monthly_cost: Decimal,
    /// Monotonic experience counter.
    pub experience: u32,
    /// Public exposure in [0, 100]; clamped on every update.
    pub notoriety: f64,
    /// Lifecycle state.
    pub state: AgentState,
    /// Mission the agent is executing, when on one.
    pub current_mission: Option<MissionId>,
    /// Days left before a recovering agent becomes available again.
    pub recovery_days_left: Option<u32>,
}

/// Kind of espionage operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionKind {
    /// Gather intelligence on the target's plans.
    InfoGathering,
    /// Steal a named technology.
    TechTheft,
    /// Damage the target's production capability.
    Sabotage,
    /// Distort the target's market position.
    MarketManipulation,
}

/// Lifecycle state of a mission. `Completed`, `Failed` and `Discovered`
/// are terminal; terminal missions stay archived in the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionState {
    Planning,
    Started,
    InProgress,
    Completed,
    Failed,
    Discovered,
}

impl MissionState {
    /// Whether the state is terminal (archived).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MissionState::Completed | MissionState::Failed | MissionState::Discovered
        )
    }
}

/// A time-boxed espionage operation against a company.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mission {
    /// Registry-assigned identifier.
    pub id: MissionId,
    /// Kind of operation.
    pub kind: MissionKind,
    /// Company being targeted.
    pub target: CompanyId,
    /// Kind-specific detail, e.g. the technology to steal.
    pub detail: String,
    /// Agent assigned at creation; exactly one per mission.
    pub agent: AgentId,
    /// Base detection probability in [0, 100], before the target's
    /// counter-espionage posture is applied.
    pub base_detection: f64,
    /// Lifecycle state.
    pub state: MissionState,
    /// Up-front operating cost.
    pub operating_cost: Decimal,
    /// Scheduled length in game days.
    pub duration_days: u32,
    /// Game day the mission was created.
    pub created_day: u32,
    /// Game day the mission was resolved, once terminal.
    pub resolved_day: Option<u32>,
}

/// Consequences a mission outcome imposes on its agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConsequences {
    /// State the agent transitions to.
    pub new_state: AgentState,
    /// Experience gained.
    pub experience_delta: u32,
    /// Notoriety change, clamped into [0, 100] on application.
    pub notoriety_delta: f64,
    /// Recovery period; must be set iff `new_state == Recovering`.
    pub recovery_days: Option<u32>,
}

/// Kinds of generic effect a mission outcome can impose. Economic kinds are
/// handled by the economic adapter, production kinds by the production
/// adapter; each adapter skips the other's kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    MarketPrice,
    StockValue,
    Demand,
    InterestRate,
    Taxes,
    Cash,
    Efficiency,
    Quality,
    Speed,
    Costs,
    MaterialAvailability,
}

/// A generic (kind, target, magnitude, duration) consequence produced by a
/// mission outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Effect {
    /// What the effect changes.
    pub kind: EffectKind,
    /// Company whose state is affected.
    pub target: CompanyId,
    /// Signed magnitude; percent points for rates, currency for `Cash`.
    pub magnitude: f64,
    /// Days the effect lasts; `None` means permanent.
    pub duration_days: Option<u32>,
}

/// Archival record of a resolved mission. Produced once, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MissionOutcome {
    /// Mission this outcome belongs to.
    pub mission: MissionId,
    /// Whether the operation achieved its objective.
    pub success: bool,
    /// Whether the target's counter-espionage discovered the operation.
    pub detected: bool,
    /// Stolen technology, for successful tech-theft missions.
    pub stolen_technology: Option<TechId>,
    /// Impact magnitude in percent points, for successful sabotage.
    pub sabotage_impact: Option<f64>,
    /// Gathered intelligence payload, for successful info missions.
    pub intelligence: Option<String>,
    /// What happens to the assigned agent.
    pub agent: AgentConsequences,
    /// Economic/production consequences to apply.
    pub effects: Vec<Effect>,
}

/// A company's defensive posture against espionage. One per company;
/// reconfiguration replaces the posture but preserves `incidents`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CounterEspionageDepartment {
    /// Owning company.
    pub company: CompanyId,
    /// Security level in [1, 5].
    pub security_level: u8,
    /// Monthly budget.
    pub monthly_budget: Decimal,
    /// Security staff headcount.
    pub staff: u32,
    /// Installed security technologies.
    pub technologies: Vec<TechId>,
    /// Derived detection efficiency in [0, 100]; recomputed on every
    /// configuration change.
    pub detection_efficiency: f64,
    /// Append-only history of missions detected against this company.
    pub incidents: Vec<MissionId>,
    /// Cumulative spend accrued by daily ticks.
    pub spend_accrued: Decimal,
}

/// One input line of a production recipe.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipeInput {
    /// Material name.
    pub material: String,
    /// Units consumed per run.
    pub quantity: u32,
}

/// Immutable reference data describing how a product is made.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductionRecipe {
    /// Recipe identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Materials consumed per run.
    pub inputs: Vec<RecipeInput>,
    /// Base run length in days.
    pub base_time_days: f64,
    /// Base run cost.
    pub base_cost: Decimal,
    /// Base output quality in [0, 100].
    pub base_quality: f64,
    /// Technology level required to run the recipe.
    pub tech_level: u8,
}

/// Status of a production run. Advances monotonically; `Completed` and
/// `Failed` are never left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

/// A mutable production run instance. Progress is a pure projection of the
/// query time against `[start_time, end_time]`; the struct itself stores no
/// progress counter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductionProcess {
    /// Run identifier.
    pub id: u64,
    /// Recipe being executed.
    pub recipe_id: String,
    /// Company running the process.
    pub company: CompanyId,
    /// Day the run started.
    pub start_time: f64,
    /// Day the run is scheduled to finish.
    pub end_time: f64,
    /// Current status.
    pub status: ProcessStatus,
}

/// Severity of a notification shown to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Info,
    Warning,
    Danger,
}

/// A player-facing notification emitted by the simulation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub icon: String,
}

/// Sink for player-facing notifications. The UI layer supplies the real
/// implementation; tests use [`MemorySink`].
pub trait NotificationSink {
    /// Queue a standard notification.
    fn notify(&mut self, n: Notification);
    /// Raise a high-severity notification that interrupts the player.
    fn notify_alert(&mut self, n: Notification);
}

/// In-memory sink collecting notifications, for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Standard notifications, in emission order.
    pub notifications: Vec<Notification>,
    /// High-severity notifications, in emission order.
    pub alerts: Vec<Notification>,
}

impl NotificationSink for MemorySink {
    fn notify(&mut self, n: Notification) {
        self.notifications.push(n);
    }

    fn notify_alert(&mut self, n: Notification) {
        self.alerts.push(n);
    }
}

/// Errors surfaced by the economic/production engines. Absorbed at the
/// effects-adapter boundary and never propagated past it.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// No state tracked for the named company.
    #[error("unknown company: {0}")]
    UnknownCompany(CompanyId),
    /// Magnitude outside the range the mutator accepts.
    #[error("invalid magnitude: {0}")]
    InvalidMagnitude(f64),
    /// Numeric conversion to/from Decimal failed.
    #[error("non-finite numeric conversion")]
    NonFinite,
}

/// Aggregate production figures for one company, used by sabotage analytics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionReport {
    /// Units produced per day.
    pub daily_output: f64,
    /// Factory efficiency in [0, 100].
    pub efficiency: f64,
    /// Output quality in [0, 100].
    pub quality: f64,
    /// Market value of one output unit.
    pub unit_value: f64,
}

/// Narrow capability surface the economic effects adapter mutates.
/// Rates and percentages are percent points; `Cash` is a currency amount.
pub trait EconomyOps {
    /// Shift the target's market price by `pct` percent for an optional
    /// number of days.
    fn adjust_market_price(
        &mut self,
        target: CompanyId,
        pct: f64,
        duration_days: Option<u32>,
    ) -> Result<(), EngineError>;
    /// Shift the target's stock value by `pct` percent.
    fn adjust_stock_value(&mut self, target: CompanyId, pct: f64) -> Result<(), EngineError>;
    /// Shift demand for the target's goods by `pct` percent.
    fn adjust_demand(
        &mut self,
        target: CompanyId,
        pct: f64,
        duration_days: Option<u32>,
    ) -> Result<(), EngineError>;
    /// Move the global interest rate by `delta` percent points.
    fn adjust_interest_rate(&mut self, delta: f64) -> Result<(), EngineError>;
    /// Move the global tax rate by `delta` percent points.
    fn adjust_taxes(&mut self, delta: f64) -> Result<(), EngineError>;
    /// Credit (or debit, when negative) the target's cash.
    fn adjust_cash(&mut self, target: CompanyId, amount: Decimal) -> Result<(), EngineError>;
}

/// Narrow capability surface the production effects adapter mutates.
pub trait ProductionOps {
    /// Shift factory efficiency by `delta` percent points, optionally
    /// reverting after a number of days.
    fn adjust_efficiency(
        &mut self,
        target: CompanyId,
        delta: f64,
        duration_days: Option<u32>,
    ) -> Result<(), EngineError>;
    /// Shift output quality by `delta` percent points.
    fn adjust_quality(
        &mut self,
        target: CompanyId,
        delta: f64,
        duration_days: Option<u32>,
    ) -> Result<(), EngineError>;
    /// Shift production speed by `delta` percent.
    fn adjust_speed(&mut self, target: CompanyId, delta: f64) -> Result<(), EngineError>;
    /// Shift production costs by `delta` percent.
    fn adjust_costs(&mut self, target: CompanyId, delta: f64) -> Result<(), EngineError>;
    /// Shift raw-material availability by `delta` percent points.
    fn adjust_material_availability(
        &mut self,
        target: CompanyId,
        delta: f64,
    ) -> Result<(), EngineError>;
    /// Whether the company already owns the technology.
    fn has_technology(&self, target: CompanyId, tech: &TechId) -> bool;
    /// Grant the company a technology (stolen or researched).
    fn install_technology(&mut self, target: CompanyId, tech: TechId) -> Result<(), EngineError>;
    /// Aggregate production figures, if the company runs a factory.
    fn production_report(&self, target: CompanyId) -> Option<ProductionReport>;
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Skill and loyalty must lie in [1, 5].
    #[error("attribute out of range [1,5]: {0}")]
    AttributeOutOfRange(u8),
    /// Percentages must lie in [0, 100] and be finite.
    #[error("percentage out of range [0,100]")]
    PercentOutOfRange,
    /// Monetary values must be non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Mission reference present without `OnMission` state, or vice versa.
    #[error("agent mission reference inconsistent with state")]
    MissionRefMismatch,
    /// Recovery counter present without `Recovering` state, or vice versa.
    #[error("agent recovery counter inconsistent with state")]
    RecoveryMismatch,
    /// Duration must be strictly positive.
    #[error("duration must be > 0")]
    NonPositiveDuration,
}

/// Clamp a percentage into [0, 100], mapping non-finite input to 0.
pub fn clamp_pct(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn check_pct(v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && (0.0..=100.0).contains(&v) {
        Ok(())
    } else {
        Err(ValidationError::PercentOutOfRange)
    }
}

/// Validate an agent record, including the state/reference invariants.
pub fn validate_agent(a: &Agent) -> Result<(), ValidationError> {
    if !(1..=5).contains(&a.skill) {
        return Err(ValidationError::AttributeOutOfRange(a.skill));
    }
    if !(1..=5).contains(&a.loyalty) {
        return Err(ValidationError::AttributeOutOfRange(a.loyalty));
    }
    if a.monthly_cost < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    check_pct(a.notoriety)?;
    if a.current_mission.is_some() != (a.state == AgentState::OnMission) {
        return Err(ValidationError::MissionRefMismatch);
    }
    if a.recovery_days_left.is_some() != (a.state == AgentState::Recovering) {
        return Err(ValidationError::RecoveryMismatch);
    }
    Ok(())
}

/// Validate a mission record.
pub fn validate_mission(m: &Mission) -> Result<(), ValidationError> {
    check_pct(m.base_detection)?;
    if m.operating_cost < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    if m.duration_days == 0 {
        return Err(ValidationError::NonPositiveDuration);
    }
    Ok(())
}

/// Validate a counter-espionage department.
pub fn validate_department(d: &CounterEspionageDepartment) -> Result<(), ValidationError> {
    if !(1..=5).contains(&d.security_level) {
        return Err(ValidationError::AttributeOutOfRange(d.security_level));
    }
    if d.monthly_budget < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    check_pct(d.detection_efficiency)
}

/// Validate a production recipe.
pub fn validate_recipe(r: &ProductionRecipe) -> Result<(), ValidationError> {
    if !(r.base_time_days.is_finite() && r.base_time_days > 0.0) {
        return Err(ValidationError::NonPositiveDuration);
    }
    if r.base_cost < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    check_pct(r.base_quality)
}
