/// Random telemetry: fixed baselines plus uniform jitter, fresh on every call
use super::{
    BalanceStatus, CellBalance, CellStatistics, ChargeAnalytics, ChargeHistory, ChargeSample,
    TelemetrySimulator, TemperatureStatus, VoltageReading,
};
use chrono::{DateTime, Duration, Timelike, Utc};
use rand::Rng;

pub const BASE_VOLTAGE: f64 = 48.2;
pub const VOLTAGE_JITTER: f64 = 0.2;
pub const NOMINAL_VOLTAGE: f64 = 48.0;

pub const BASE_CELL_VOLTAGE: f64 = 3.95;
pub const CELL_JITTER: f64 = 0.02;
pub const CELL_COUNT: usize = 8;
/// Spread at or above this needs balancing
const IMBALANCE_LIMIT: f64 = 0.05;

const HISTORY_HOURS: i64 = 24;
const DAY_START_HOUR: u32 = 8;
const DAY_END_HOUR: u32 = 20;

/// [`TelemetrySimulator`] backed by the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTelemetry;

impl TelemetrySimulator for RandomTelemetry {
    fn voltage(&self) -> VoltageReading {
        sample_voltage(&mut rand::thread_rng())
    }

    fn cell_balance(&self) -> CellBalance {
        sample_cell_balance(&mut rand::thread_rng())
    }

    fn charge_history(&self, now: DateTime<Utc>) -> ChargeHistory {
        sample_charge_history(&mut rand::thread_rng(), now)
    }
}

/// Uniform draw in `[base - spread, base + spread)`
fn jitter<R: Rng + ?Sized>(rng: &mut R, base: f64, spread: f64) -> f64 {
    base + rng.gen_range(-spread..spread)
}

pub fn sample_voltage<R: Rng + ?Sized>(rng: &mut R) -> VoltageReading {
    let voltage = jitter(rng, BASE_VOLTAGE, VOLTAGE_JITTER);
    let temperature = jitter(rng, 25.0, 1.0);
    let efficiency = jitter(rng, 94.8, 0.5);

    VoltageReading {
        voltage,
        nominal_voltage: NOMINAL_VOLTAGE,
        state_of_charge: jitter(rng, 85.0, 1.0),
        estimated_range: 150 + rng.gen_range(-5.0..5.0_f64).floor() as i64,
        temperature,
        temperature_status: if temperature < 30.0 {
            TemperatureStatus::Normal
        } else {
            TemperatureStatus::Warning
        },
        efficiency: format!("{:.1}", efficiency),
        power_output: format!("{:.1}", BASE_VOLTAGE * 10.0),
        cell_health: 97.2,
        predicted_lifetime: "2.3 years".to_string(),
    }
}

pub fn sample_cell_balance<R: Rng + ?Sized>(rng: &mut R) -> CellBalance {
    let cell_voltages: Vec<f64> = (0..CELL_COUNT)
        .map(|_| jitter(rng, BASE_CELL_VOLTAGE, CELL_JITTER))
        .collect();

    let max = cell_voltages.iter().copied().fold(f64::MIN, f64::max);
    let min = cell_voltages.iter().copied().fold(f64::MAX, f64::min);
    let count = cell_voltages.len() as f64;
    let average = cell_voltages.iter().sum::<f64>() / count;
    let variance = cell_voltages
        .iter()
        .map(|v| (v - average).powi(2))
        .sum::<f64>()
        / count;
    let spread = max - min;

    CellBalance {
        max_imbalance: format!("{:.3}", spread),
        balance_status: if spread < IMBALANCE_LIMIT {
            BalanceStatus::Good
        } else {
            BalanceStatus::NeedsBalancing
        },
        statistics: CellStatistics {
            max: format!("{:.3}", max),
            min: format!("{:.3}", min),
            average: format!("{:.3}", average),
            standard_deviation: format!("{:.3}", variance.sqrt()),
        },
        cell_voltages,
    }
}

/// Whether the given UTC hour counts as daytime usage
///
/// Callers pass each sample's UTC clock hour, not its position in the
/// 24-sample series, so the day window tracks wall-clock time.
pub fn is_daytime(hour: u32) -> bool {
    (DAY_START_HOUR..=DAY_END_HOUR).contains(&hour)
}

pub fn sample_charge_history<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> ChargeHistory {
    let mut samples: Vec<ChargeSample> = (0..HISTORY_HOURS)
        .map(|hours_ago| {
            let timestamp = now - Duration::hours(hours_ago);
            let (base_charge, base_discharge) = if is_daytime(timestamp.hour()) {
                (2.0, 3.0)
            } else {
                (1.0, 0.5)
            };

            ChargeSample {
                timestamp,
                charge: base_charge + rng.gen_range(0.0..1.5),
                discharge: base_discharge + rng.gen_range(0.0..1.0),
                efficiency: 94.0 + rng.gen_range(0.0..2.0),
                temperature: 25.0 + rng.gen_range(0.0..5.0),
            }
        })
        .collect();
    samples.reverse();

    ChargeHistory {
        cycle_count: 245,
        last_charged: now - Duration::hours(1),
        charge_history: samples,
        analytics: ChargeAnalytics {
            average_efficiency: 95.2,
            peak_power: 2300,
            total_energy_today: 45.6,
            predicted_cycles: 1200,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_voltage_stays_in_band() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let reading = sample_voltage(&mut rng);
            assert!(reading.voltage >= BASE_VOLTAGE - VOLTAGE_JITTER);
            assert!(reading.voltage <= BASE_VOLTAGE + VOLTAGE_JITTER);
            assert!((84.0..=86.0).contains(&reading.state_of_charge));
            assert!((145..=154).contains(&reading.estimated_range));
            assert!((24.0..=26.0).contains(&reading.temperature));
            assert_eq!(reading.temperature_status, TemperatureStatus::Normal);
            assert_eq!(reading.power_output, "482.0");
            assert_eq!(reading.nominal_voltage, 48.0);
        }
    }

    #[test]
    fn test_efficiency_has_one_decimal() {
        let reading = RandomTelemetry.voltage();
        let (_, decimals) = reading.efficiency.split_once('.').unwrap();
        assert_eq!(decimals.len(), 1);
        let value: f64 = reading.efficiency.parse().unwrap();
        assert!((94.3..=95.3).contains(&value));
    }

    #[test]
    fn test_cell_balance_statistics() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let balance = sample_cell_balance(&mut rng);
            assert_eq!(balance.cell_voltages.len(), CELL_COUNT);
            for v in &balance.cell_voltages {
                assert!(*v >= BASE_CELL_VOLTAGE - CELL_JITTER);
                assert!(*v <= BASE_CELL_VOLTAGE + CELL_JITTER);
            }

            // Spread of cells within +-0.02 can never reach 0.05
            assert_eq!(balance.balance_status, BalanceStatus::Good);

            let max: f64 = balance.statistics.max.parse().unwrap();
            let min: f64 = balance.statistics.min.parse().unwrap();
            let avg: f64 = balance.statistics.average.parse().unwrap();
            assert!(min <= avg && avg <= max);
            assert_eq!(balance.max_imbalance.split_once('.').unwrap().1.len(), 3);
        }
    }

    #[test]
    fn test_balance_status_wire_name() {
        assert_eq!(
            serde_json::to_value(BalanceStatus::NeedsBalancing).unwrap(),
            "Needs Balancing"
        );
    }

    #[test]
    fn test_history_shape() {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 10, 30, 0).unwrap();
        let history = sample_charge_history(&mut StdRng::seed_from_u64(3), now);

        assert_eq!(history.charge_history.len(), 24);
        assert_eq!(history.cycle_count, 245);
        assert_eq!(history.last_charged, now - Duration::hours(1));
        assert_eq!(history.charge_history.last().unwrap().timestamp, now);
        assert_eq!(
            history.charge_history.first().unwrap().timestamp,
            now - Duration::hours(23)
        );
        assert!(history
            .charge_history
            .windows(2)
            .all(|w| w[1].timestamp - w[0].timestamp == Duration::hours(1)));
    }

    #[test]
    fn test_history_day_night_rates() {
        // First sample lands at 12:00 UTC, so clock hour and series index differ
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 11, 0, 0).unwrap();
        let history = sample_charge_history(&mut StdRng::seed_from_u64(5), now);
        assert_eq!(history.charge_history[0].timestamp.hour(), 12);

        for sample in &history.charge_history {
            if is_daytime(sample.timestamp.hour()) {
                assert!((2.0..3.5).contains(&sample.charge));
                assert!((3.0..4.0).contains(&sample.discharge));
            } else {
                assert!((1.0..2.5).contains(&sample.charge));
                assert!((0.5..1.5).contains(&sample.discharge));
            }
            assert!((94.0..96.0).contains(&sample.efficiency));
            assert!((25.0..30.0).contains(&sample.temperature));
        }
    }

    #[test]
    fn test_daytime_window() {
        assert!(!is_daytime(7));
        assert!(is_daytime(8));
        assert!(is_daytime(20));
        assert!(!is_daytime(21));
    }
}
