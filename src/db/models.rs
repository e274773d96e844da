/// Record types shared by every store implementation
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Registered API user
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub api_key: String,
}

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub api_key: String,
}

/// Submitted battery diagnostic
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryDiagnostic {
    pub id: i64,
    pub user_id: i64,
    /// Li-ion, LFP, Lead-acid
    pub battery_type: String,
    /// Percent
    pub state_of_health: f64,
    /// Percent
    pub state_of_charge: f64,
    /// Ah
    pub capacity: f64,
    /// mOhm
    pub internal_resistance: f64,
    /// Celsius
    pub temperature: f64,
    /// Volts
    pub voltage: f64,
    /// Percent
    pub fault_risk: f64,
    pub has_warning: bool,
    pub timestamp: DateTime<Utc>,
}

/// Diagnostic fields supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDiagnostic {
    pub battery_type: String,
    pub state_of_health: f64,
    pub state_of_charge: f64,
    pub capacity: f64,
    pub internal_resistance: f64,
    pub temperature: f64,
    pub voltage: f64,
    pub fault_risk: f64,
    pub has_warning: bool,
}

/// Diagnostic parameter an alert threshold can watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub enum AlertParameter {
    Voltage,
    Temperature,
    StateOfCharge,
    StateOfHealth,
    InternalResistance,
    Capacity,
    FaultRisk,
}

impl AlertParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertParameter::Voltage => "voltage",
            AlertParameter::Temperature => "temperature",
            AlertParameter::StateOfCharge => "stateOfCharge",
            AlertParameter::StateOfHealth => "stateOfHealth",
            AlertParameter::InternalResistance => "internalResistance",
            AlertParameter::Capacity => "capacity",
            AlertParameter::FaultRisk => "faultRisk",
        }
    }

    /// Read the watched value out of a diagnostic
    pub fn value_of(&self, diagnostic: &BatteryDiagnostic) -> f64 {
        match self {
            AlertParameter::Voltage => diagnostic.voltage,
            AlertParameter::Temperature => diagnostic.temperature,
            AlertParameter::StateOfCharge => diagnostic.state_of_charge,
            AlertParameter::StateOfHealth => diagnostic.state_of_health,
            AlertParameter::InternalResistance => diagnostic.internal_resistance,
            AlertParameter::Capacity => diagnostic.capacity,
            AlertParameter::FaultRisk => diagnostic.fault_risk,
        }
    }
}

impl fmt::Display for AlertParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum NotificationMethod {
    Email,
    Dashboard,
    Both,
}

impl NotificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationMethod::Email => "email",
            NotificationMethod::Dashboard => "dashboard",
            NotificationMethod::Both => "both",
        }
    }
}

/// A per-parameter min/max watch owned by a user
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertThreshold {
    pub id: i64,
    pub user_id: i64,
    pub parameter_name: AlertParameter,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub is_enabled: bool,
    pub severity: AlertSeverity,
    pub notification_method: NotificationMethod,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Incremented on every update
    pub version: i64,
}

/// Threshold fields supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlertThreshold {
    pub parameter_name: AlertParameter,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub is_enabled: bool,
    pub severity: AlertSeverity,
    pub notification_method: NotificationMethod,
}

/// Partial threshold update.
///
/// For the bounds, `None` leaves the value alone and `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdPatch {
    pub parameter_name: Option<AlertParameter>,
    pub min_value: Option<Option<f64>>,
    pub max_value: Option<Option<f64>>,
    pub is_enabled: Option<bool>,
    pub severity: Option<AlertSeverity>,
    pub notification_method: Option<NotificationMethod>,
}

impl ThresholdPatch {
    /// Merge the patch into an existing threshold without touching timestamps
    pub fn apply_to(&self, threshold: &mut AlertThreshold) {
        if let Some(parameter) = self.parameter_name {
            threshold.parameter_name = parameter;
        }
        if let Some(min) = self.min_value {
            threshold.min_value = min;
        }
        if let Some(max) = self.max_value {
            threshold.max_value = max;
        }
        if let Some(enabled) = self.is_enabled {
            threshold.is_enabled = enabled;
        }
        if let Some(severity) = self.severity {
            threshold.severity = severity;
        }
        if let Some(method) = self.notification_method {
            threshold.notification_method = method;
        }
    }
}

/// A recorded threshold breach
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertHistory {
    pub id: i64,
    pub user_id: i64,
    pub threshold_id: i64,
    pub parameter_name: AlertParameter,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub severity: AlertSeverity,
    pub message: String,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

/// Fields needed to record a breach
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlertHistory {
    pub threshold_id: i64,
    pub parameter_name: AlertParameter,
    pub value: f64,
    pub severity: AlertSeverity,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold() -> AlertThreshold {
        let now = Utc::now();
        AlertThreshold {
            id: 1,
            user_id: 1,
            parameter_name: AlertParameter::Voltage,
            min_value: Some(45.0),
            max_value: Some(52.0),
            is_enabled: true,
            severity: AlertSeverity::Warning,
            notification_method: NotificationMethod::Email,
            created: now,
            updated: now,
            version: 1,
        }
    }

    #[test]
    fn test_patch_leaves_unset_fields() {
        let mut t = threshold();
        ThresholdPatch {
            severity: Some(AlertSeverity::Critical),
            ..Default::default()
        }
        .apply_to(&mut t);

        assert_eq!(t.severity, AlertSeverity::Critical);
        assert_eq!(t.min_value, Some(45.0));
        assert_eq!(t.max_value, Some(52.0));
        assert!(t.is_enabled);
    }

    #[test]
    fn test_patch_can_clear_bound() {
        let mut t = threshold();
        ThresholdPatch {
            min_value: Some(None),
            ..Default::default()
        }
        .apply_to(&mut t);

        assert_eq!(t.min_value, None);
        assert_eq!(t.max_value, Some(52.0));
    }

    #[test]
    fn test_user_secrets_not_serialized() {
        let user = User {
            id: 7,
            username: "cell-tech".into(),
            password_hash: "$argon2id$...".into(),
            api_key: "deadbeef".into(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], 7);
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("apiKey").is_none());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_value(AlertParameter::StateOfCharge).unwrap(),
            "stateOfCharge"
        );
        assert_eq!(serde_json::to_value(AlertSeverity::Critical).unwrap(), "critical");
        assert_eq!(serde_json::to_value(NotificationMethod::Both).unwrap(), "both");
        assert!(serde_json::from_str::<AlertSeverity>("\"fatal\"").is_err());
    }

    #[test]
    fn test_value_of_reads_matching_field() {
        let diagnostic = BatteryDiagnostic {
            id: 1,
            user_id: 1,
            battery_type: "LFP".into(),
            state_of_health: 97.0,
            state_of_charge: 80.0,
            capacity: 100.0,
            internal_resistance: 15.0,
            temperature: 25.0,
            voltage: 51.2,
            fault_risk: 3.0,
            has_warning: false,
            timestamp: Utc::now(),
        };
        assert_eq!(AlertParameter::Voltage.value_of(&diagnostic), 51.2);
        assert_eq!(AlertParameter::FaultRisk.value_of(&diagnostic), 3.0);
        assert_eq!(AlertParameter::StateOfHealth.value_of(&diagnostic), 97.0);
    }
}
