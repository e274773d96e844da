/// Alert threshold evaluation
///
/// Each submitted diagnostic is compared against the owner's enabled
/// thresholds. Every breached bound becomes one alert-history row.
use crate::{
    db::models::{AlertHistory, AlertThreshold, BatteryDiagnostic, NewAlertHistory, NotificationMethod},
    metrics,
    store::Repository,
};

/// Which side of the threshold was crossed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Breach {
    BelowMinimum(f64),
    AboveMaximum(f64),
}

/// Check one value against a threshold's bounds. Bounds are inclusive.
pub fn check(threshold: &AlertThreshold, value: f64) -> Option<Breach> {
    if !threshold.is_enabled {
        return None;
    }
    if let Some(min) = threshold.min_value {
        if value < min {
            return Some(Breach::BelowMinimum(min));
        }
    }
    if let Some(max) = threshold.max_value {
        if value > max {
            return Some(Breach::AboveMaximum(max));
        }
    }
    None
}

/// Breaches produced by one diagnostic across a set of thresholds
pub fn evaluate(diagnostic: &BatteryDiagnostic, thresholds: &[AlertThreshold]) -> Vec<NewAlertHistory> {
    thresholds
        .iter()
        .filter(|t| t.user_id == diagnostic.user_id)
        .filter_map(|t| {
            let value = t.parameter_name.value_of(diagnostic);
            check(t, value).map(|breach| {
                let message = match breach {
                    Breach::BelowMinimum(min) => {
                        format!("{} {:.2} below minimum of {:.2}", t.parameter_name, value, min)
                    }
                    Breach::AboveMaximum(max) => {
                        format!("{} {:.2} exceeds maximum of {:.2}", t.parameter_name, value, max)
                    }
                };
                NewAlertHistory {
                    threshold_id: t.id,
                    parameter_name: t.parameter_name,
                    value,
                    severity: t.severity,
                    message,
                }
            })
        })
        .collect()
}

/// Evaluate a stored diagnostic against its owner's thresholds and record
/// every breach. A failed alert write is logged and skipped; the diagnostic
/// is already stored, so it never fails the submission.
pub async fn raise_alerts(store: &dyn Repository, diagnostic: &BatteryDiagnostic) -> Vec<AlertHistory> {
    match store.list_alert_thresholds(diagnostic.user_id).await {
        Ok(thresholds) => record_breaches(store, &thresholds, diagnostic).await,
        Err(e) => {
            tracing::error!(
                user_id = diagnostic.user_id,
                diagnostic_id = diagnostic.id,
                error = %e,
                "Failed to load alert thresholds"
            );
            Vec::new()
        }
    }
}

/// Record each breach of `thresholds` by `diagnostic`, returning the rows written
pub async fn record_breaches(
    store: &dyn Repository,
    thresholds: &[AlertThreshold],
    diagnostic: &BatteryDiagnostic,
) -> Vec<AlertHistory> {
    let mut recorded = Vec::new();

    for breach in evaluate(diagnostic, thresholds) {
        let method = thresholds
            .iter()
            .find(|t| t.id == breach.threshold_id)
            .map(|t| t.notification_method)
            .unwrap_or(NotificationMethod::Dashboard);
        let threshold_id = breach.threshold_id;

        let alert = match store.record_alert(diagnostic.user_id, breach).await {
            Ok(alert) => alert,
            Err(e) => {
                tracing::error!(
                    user_id = diagnostic.user_id,
                    diagnostic_id = diagnostic.id,
                    threshold_id,
                    error = %e,
                    "Failed to record alert"
                );
                continue;
            }
        };
        metrics::record_alert_raised(alert.parameter_name.as_str(), alert.severity.as_str());

        tracing::warn!(
            user_id = alert.user_id,
            alert_id = alert.id,
            threshold_id = alert.threshold_id,
            severity = alert.severity.as_str(),
            notification = method.as_str(),
            "{}",
            alert.message
        );

        recorded.push(alert);
    }

    recorded
}
