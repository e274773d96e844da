/// Request body validation
///
/// Request bodies derive `validator::Validate`; the [`ValidatedJson`]
/// extractor parses JSON and runs the rules, turning failures into a
/// structured 400.
use crate::{
    db::models::{
        AlertParameter, AlertSeverity, AlertThreshold, NewAlertThreshold, NewDiagnostic, NotificationMethod,
        ThresholdPatch,
    },
    error::{ApiError, FieldError},
};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use validator::{Validate, ValidationError, ValidationErrors};

/// JSON body that has passed its validation rules
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::BadRequest(rejection.body_text()))?;
        value.validate().map_err(into_field_errors)?;
        Ok(ValidatedJson(value))
    }
}

/// Flatten validator output into a stable, path-sorted list
pub fn into_field_errors(errors: ValidationErrors) -> ApiError {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let path = if field == "__all__" {
                "$".to_string()
            } else {
                camel_case(&field)
            };
            errs.iter().map(move |e| FieldError {
                path: path.clone(),
                code: e.code.to_string(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed '{}' check", e.code)),
            })
        })
        .collect();
    fields.sort_by(|a, b| a.path.cmp(&b.path).then(a.code.cmp(&b.code)));
    ApiError::Validation(fields)
}

/// Report field paths with the same names the JSON body uses
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Signup body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 256, message = "username must be 1-256 characters"))]
    pub username: String,
    #[validate(length(min = 1, max = 256, message = "password must be 1-256 characters"))]
    pub password: String,
}

/// Diagnostic submission body
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiagnosticRequest {
    #[validate(length(min = 1, message = "batteryType is required"))]
    pub battery_type: String,
    #[validate(range(min = 0.0, max = 100.0, message = "must be between 0 and 100"))]
    pub state_of_health: f64,
    #[validate(range(min = 0.0, max = 100.0, message = "must be between 0 and 100"))]
    pub state_of_charge: f64,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub capacity: f64,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub internal_resistance: f64,
    pub temperature: f64,
    pub voltage: f64,
    #[validate(range(min = 0.0, max = 100.0, message = "must be between 0 and 100"))]
    pub fault_risk: f64,
    pub has_warning: bool,
}

impl From<CreateDiagnosticRequest> for NewDiagnostic {
    fn from(req: CreateDiagnosticRequest) -> Self {
        NewDiagnostic {
            battery_type: req.battery_type,
            state_of_health: req.state_of_health,
            state_of_charge: req.state_of_charge,
            capacity: req.capacity,
            internal_resistance: req.internal_resistance,
            temperature: req.temperature,
            voltage: req.voltage,
            fault_risk: req.fault_risk,
            has_warning: req.has_warning,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Alert threshold creation body
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_new_threshold_bounds"))]
pub struct CreateAlertThresholdRequest {
    pub parameter_name: AlertParameter,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
    pub severity: AlertSeverity,
    pub notification_method: NotificationMethod,
}

fn validate_new_threshold_bounds(req: &CreateAlertThresholdRequest) -> Result<(), ValidationError> {
    check_bounds(req.min_value, req.max_value)
}

impl From<CreateAlertThresholdRequest> for NewAlertThreshold {
    fn from(req: CreateAlertThresholdRequest) -> Self {
        NewAlertThreshold {
            parameter_name: req.parameter_name,
            min_value: req.min_value,
            max_value: req.max_value,
            is_enabled: req.is_enabled,
            severity: req.severity,
            notification_method: req.notification_method,
        }
    }
}

/// Distinguish an absent field from an explicit `null`
fn explicit_nullable<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

/// Partial threshold update body. Unknown fields such as `id`, `userId` or
/// `created` are rejected.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateAlertThresholdRequest {
    pub parameter_name: Option<AlertParameter>,
    #[serde(default, deserialize_with = "explicit_nullable")]
    pub min_value: Option<Option<f64>>,
    #[serde(default, deserialize_with = "explicit_nullable")]
    pub max_value: Option<Option<f64>>,
    pub is_enabled: Option<bool>,
    pub severity: Option<AlertSeverity>,
    pub notification_method: Option<NotificationMethod>,
}

impl From<UpdateAlertThresholdRequest> for ThresholdPatch {
    fn from(req: UpdateAlertThresholdRequest) -> Self {
        ThresholdPatch {
            parameter_name: req.parameter_name,
            min_value: req.min_value,
            max_value: req.max_value,
            is_enabled: req.is_enabled,
            severity: req.severity,
            notification_method: req.notification_method,
        }
    }
}

/// A threshold needs at least one bound, and min may not exceed max
pub fn check_bounds(min: Option<f64>, max: Option<f64>) -> Result<(), ValidationError> {
    match (min, max) {
        (None, None) => Err(bounds_error(
            "missing_bound",
            "at least one of minValue or maxValue is required",
        )),
        (Some(min), Some(max)) if min > max => Err(bounds_error(
            "inverted_bounds",
            "minValue must not exceed maxValue",
        )),
        _ => Ok(()),
    }
}

/// Re-check bounds on a threshold after a patch has been merged into it
pub fn check_merged_bounds(threshold: &AlertThreshold) -> Result<(), ApiError> {
    check_bounds(threshold.min_value, threshold.max_value).map_err(|e| {
        ApiError::Validation(vec![FieldError {
            path: "$".to_string(),
            code: e.code.to_string(),
            message: e.message.map(|m| m.to_string()).unwrap_or_default(),
        }])
    })
}

fn bounds_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_errors<T: Validate>(value: &T) -> Vec<FieldError> {
        match value.validate().map_err(into_field_errors) {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_empty_username_rejected() {
        let req = CreateUserRequest {
            username: String::new(),
            password: "secret".into(),
        };
        let errors = field_errors(&req);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "username");
        assert_eq!(errors[0].code, "length");
    }

    #[test]
    fn test_diagnostic_ranges() {
        let req: CreateDiagnosticRequest = serde_json::from_value(json!({
            "batteryType": "LFP",
            "stateOfHealth": 120.0,
            "stateOfCharge": -5.0,
            "capacity": 100.0,
            "internalResistance": 12.0,
            "temperature": 25.0,
            "voltage": 51.2,
            "faultRisk": 3.0,
            "hasWarning": false
        }))
        .unwrap();

        let errors = field_errors(&req);
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["stateOfCharge", "stateOfHealth"]);
        assert!(errors.iter().all(|e| e.message == "must be between 0 and 100"));
    }

    #[test]
    fn test_camel_case_paths() {
        assert_eq!(camel_case("state_of_charge"), "stateOfCharge");
        assert_eq!(camel_case("faultRisk"), "faultRisk");
        assert_eq!(camel_case("username"), "username");
    }

    #[test]
    fn test_threshold_defaults_enabled() {
        let req: CreateAlertThresholdRequest = serde_json::from_value(json!({
            "parameterName": "voltage",
            "minValue": 45.0,
            "severity": "warning",
            "notificationMethod": "email"
        }))
        .unwrap();
        assert!(req.is_enabled);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_threshold_bounds_rules() {
        assert!(check_bounds(Some(1.0), None).is_ok());
        assert!(check_bounds(None, Some(1.0)).is_ok());
        assert!(check_bounds(Some(1.0), Some(1.0)).is_ok());
        assert_eq!(check_bounds(None, None).unwrap_err().code, "missing_bound");
        assert_eq!(
            check_bounds(Some(5.0), Some(1.0)).unwrap_err().code,
            "inverted_bounds"
        );
    }

    #[test]
    fn test_inverted_threshold_reports_schema_error() {
        let req: CreateAlertThresholdRequest = serde_json::from_value(json!({
            "parameterName": "temperature",
            "minValue": 60.0,
            "maxValue": 10.0,
            "severity": "critical",
            "notificationMethod": "both"
        }))
        .unwrap();
        let errors = field_errors(&req);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "$");
        assert_eq!(errors[0].code, "inverted_bounds");
    }

    #[test]
    fn test_unknown_enum_value_fails_to_parse() {
        let parsed = serde_json::from_value::<CreateAlertThresholdRequest>(json!({
            "parameterName": "humidity",
            "minValue": 1.0,
            "severity": "warning",
            "notificationMethod": "email"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let req: UpdateAlertThresholdRequest =
            serde_json::from_value(json!({ "minValue": null, "isEnabled": false })).unwrap();
        assert_eq!(req.min_value, Some(None));
        assert_eq!(req.max_value, None);
        assert_eq!(req.is_enabled, Some(false));

        let patch: ThresholdPatch = req.into();
        assert_eq!(patch.min_value, Some(None));
    }

    #[test]
    fn test_merged_bounds_checked() {
        let now = chrono::Utc::now();
        let mut threshold = AlertThreshold {
            id: 1,
            user_id: 1,
            parameter_name: AlertParameter::Voltage,
            min_value: Some(45.0),
            max_value: Some(52.0),
            is_enabled: true,
            severity: AlertSeverity::Warning,
            notification_method: NotificationMethod::Dashboard,
            created: now,
            updated: now,
            version: 1,
        };
        assert!(check_merged_bounds(&threshold).is_ok());

        ThresholdPatch {
            min_value: Some(Some(60.0)),
            ..ThresholdPatch::default()
        }
        .apply_to(&mut threshold);
        match check_merged_bounds(&threshold) {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors[0].path, "$");
                assert_eq!(errors[0].code, "inverted_bounds");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_patch_rejects_owner_change() {
        let parsed =
            serde_json::from_value::<UpdateAlertThresholdRequest>(json!({ "userId": 2 }));
        assert!(parsed.is_err());
    }
}
