/// Battery telemetry
///
/// Handlers only see the [`TelemetrySimulator`] trait, so the random
/// generator can later be replaced by a real measurement pipeline.

mod simulator;

pub use simulator::{
    sample_cell_balance, sample_charge_history, sample_voltage, RandomTelemetry,
    BASE_CELL_VOLTAGE, BASE_VOLTAGE, CELL_COUNT, CELL_JITTER, VOLTAGE_JITTER,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source of live battery readings
pub trait TelemetrySimulator: Send + Sync {
    fn voltage(&self) -> VoltageReading;

    fn cell_balance(&self) -> CellBalance;

    /// Hourly charge/discharge history ending at `now`
    fn charge_history(&self, now: DateTime<Utc>) -> ChargeHistory;
}

/// Pack voltage snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoltageReading {
    pub voltage: f64,
    pub nominal_voltage: f64,
    pub state_of_charge: f64,
    /// km
    pub estimated_range: i64,
    pub temperature: f64,
    pub temperature_status: TemperatureStatus,
    /// Percent, one decimal
    pub efficiency: String,
    /// Watts, one decimal
    pub power_output: String,
    pub cell_health: f64,
    pub predicted_lifetime: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureStatus {
    Normal,
    Warning,
}

/// Per-cell voltages and spread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellBalance {
    pub cell_voltages: Vec<f64>,
    /// Max minus min, three decimals
    pub max_imbalance: String,
    pub balance_status: BalanceStatus,
    pub statistics: CellStatistics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceStatus {
    Good,
    #[serde(rename = "Needs Balancing")]
    NeedsBalancing,
}

/// Summary statistics, each formatted to three decimals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellStatistics {
    pub max: String,
    pub min: String,
    pub average: String,
    pub standard_deviation: String,
}

/// One hourly sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeSample {
    pub timestamp: DateTime<Utc>,
    /// kWh
    pub charge: f64,
    /// kWh
    pub discharge: f64,
    pub efficiency: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeAnalytics {
    pub average_efficiency: f64,
    pub peak_power: u32,
    pub total_energy_today: f64,
    pub predicted_cycles: u32,
}

/// Rolling 24-hour history, oldest sample first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeHistory {
    pub cycle_count: u32,
    pub last_charged: DateTime<Utc>,
    pub charge_history: Vec<ChargeSample>,
    pub analytics: ChargeAnalytics,
}
