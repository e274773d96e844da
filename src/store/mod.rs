/// Record store
///
/// Users, diagnostics, alert thresholds and alert history behind one
/// repository seam. Every read and update past user lookup is scoped by the
/// owning user id; a record owned by someone else is reported as not found.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::{
    db::models::{
        AlertHistory, AlertThreshold, BatteryDiagnostic, NewAlertHistory, NewAlertThreshold,
        NewDiagnostic, NewUser, ThresholdPatch, User,
    },
    error::ApiResult,
};
use async_trait::async_trait;

/// Storage operations used by the API handlers
#[async_trait]
pub trait Repository: Send + Sync {
    /// Insert a user; fails with `Conflict` if the username is taken
    async fn create_user(&self, user: NewUser) -> ApiResult<User>;

    async fn get_user(&self, id: i64) -> ApiResult<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> ApiResult<Option<User>>;

    async fn get_user_by_api_key(&self, api_key: &str) -> ApiResult<Option<User>>;

    async fn create_diagnostic(
        &self,
        user_id: i64,
        diagnostic: NewDiagnostic,
    ) -> ApiResult<BatteryDiagnostic>;

    /// Caller's diagnostics in insertion order
    async fn list_diagnostics(&self, user_id: i64) -> ApiResult<Vec<BatteryDiagnostic>>;

    async fn create_alert_threshold(
        &self,
        user_id: i64,
        threshold: NewAlertThreshold,
    ) -> ApiResult<AlertThreshold>;

    /// Caller's thresholds in insertion order
    async fn list_alert_thresholds(&self, user_id: i64) -> ApiResult<Vec<AlertThreshold>>;

    /// Merge `patch` into the caller's threshold, stamp `updated` and bump `version`.
    /// A merge that leaves no bound, or min above max, fails with `Validation`
    /// and stores nothing.
    async fn update_alert_threshold(
        &self,
        user_id: i64,
        threshold_id: i64,
        patch: ThresholdPatch,
    ) -> ApiResult<AlertThreshold>;

    async fn record_alert(&self, user_id: i64, alert: NewAlertHistory) -> ApiResult<AlertHistory>;

    /// Caller's alert history, newest first
    async fn list_alert_history(&self, user_id: i64) -> ApiResult<Vec<AlertHistory>>;

    /// Mark an alert acknowledged. Acknowledging twice keeps the first timestamp.
    async fn acknowledge_alert(&self, user_id: i64, alert_id: i64) -> ApiResult<AlertHistory>;
}

/// Error message for a threshold the caller cannot see
pub(crate) fn threshold_not_found(threshold_id: i64) -> crate::error::ApiError {
    crate::error::ApiError::NotFound(format!("Alert threshold {} not found", threshold_id))
}

/// Error message for an alert the caller cannot see
pub(crate) fn alert_not_found(alert_id: i64) -> crate::error::ApiError {
    crate::error::ApiError::NotFound(format!("Alert {} not found", alert_id))
}
