/// SQLite-backed record store
///
/// Uses sqlx runtime queries so no DATABASE_URL is needed at compile time.
/// Owner scoping happens in every WHERE clause; threshold updates are
/// guarded by the row version.
use super::{alert_not_found, threshold_not_found, Repository};
use crate::{
    db::models::{
        AlertHistory, AlertThreshold, BatteryDiagnostic, NewAlertHistory, NewAlertThreshold,
        NewDiagnostic, NewUser, ThresholdPatch, User,
    },
    error::{ApiError, ApiResult},
    validation::check_merged_bounds,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

const THRESHOLD_COLUMNS: &str = "id, user_id, parameter_name, min_value, max_value, is_enabled, \
     severity, notification_method, created, updated, version";

const HISTORY_COLUMNS: &str = "id, user_id, threshold_id, parameter_name, value, timestamp, \
     severity, message, acknowledged, acknowledged_at";

/// Durable record store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    /// Wrap a pool whose migrations have already run
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn find_threshold(&self, user_id: i64, threshold_id: i64) -> ApiResult<AlertThreshold> {
        sqlx::query_as::<_, AlertThreshold>(&format!(
            "SELECT {} FROM alert_thresholds WHERE id = ?1 AND user_id = ?2",
            THRESHOLD_COLUMNS
        ))
        .bind(threshold_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| threshold_not_found(threshold_id))
    }

    async fn find_alert(&self, user_id: i64, alert_id: i64) -> ApiResult<AlertHistory> {
        sqlx::query_as::<_, AlertHistory>(&format!(
            "SELECT {} FROM alert_history WHERE id = ?1 AND user_id = ?2",
            HISTORY_COLUMNS
        ))
        .bind(alert_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| alert_not_found(alert_id))
    }

    /// Merge `patch` into a row read at `current.version` and write it back.
    ///
    /// The write only lands if nobody bumped the version since the read.
    async fn write_merged(
        &self,
        current: AlertThreshold,
        patch: &ThresholdPatch,
    ) -> ApiResult<AlertThreshold> {
        let read_version = current.version;
        let mut threshold = current;
        patch.apply_to(&mut threshold);
        check_merged_bounds(&threshold)?;

        threshold.updated = Utc::now();
        threshold.version = read_version + 1;

        let result = sqlx::query(
            "UPDATE alert_thresholds
             SET parameter_name = ?1, min_value = ?2, max_value = ?3, is_enabled = ?4,
                 severity = ?5, notification_method = ?6, updated = ?7, version = ?8
             WHERE id = ?9 AND user_id = ?10 AND version = ?11",
        )
        .bind(threshold.parameter_name)
        .bind(threshold.min_value)
        .bind(threshold.max_value)
        .bind(threshold.is_enabled)
        .bind(threshold.severity)
        .bind(threshold.notification_method)
        .bind(threshold.updated)
        .bind(threshold.version)
        .bind(threshold.id)
        .bind(threshold.user_id)
        .bind(read_version)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                threshold_id = threshold.id,
                read_version,
                "threshold update lost a version race"
            );
            return Err(ApiError::Conflict(format!(
                "Alert threshold {} was modified concurrently",
                threshold.id
            )));
        }

        Ok(threshold)
    }
}

#[async_trait]
impl Repository for SqliteStore {
    async fn create_user(&self, user: NewUser) -> ApiResult<User> {
        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password_hash, api_key) VALUES (?1, ?2, ?3)
             RETURNING id, username, password_hash, api_key",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.api_key)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(ApiError::Conflict(
                format!("Username {} already taken", user.username),
            )),
            Err(e) => Err(ApiError::Database(e)),
        }
    }

    async fn get_user(&self, id: i64) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, api_key FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, api_key FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn get_user_by_api_key(&self, api_key: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, api_key FROM users WHERE api_key = ?1",
        )
        .bind(api_key)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create_diagnostic(
        &self,
        user_id: i64,
        diagnostic: NewDiagnostic,
    ) -> ApiResult<BatteryDiagnostic> {
        let diagnostic = sqlx::query_as::<_, BatteryDiagnostic>(
            "INSERT INTO battery_diagnostics
                (user_id, battery_type, state_of_health, state_of_charge, capacity,
                 internal_resistance, temperature, voltage, fault_risk, has_warning, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             RETURNING id, user_id, battery_type, state_of_health, state_of_charge, capacity,
                 internal_resistance, temperature, voltage, fault_risk, has_warning, timestamp",
        )
        .bind(user_id)
        .bind(&diagnostic.battery_type)
        .bind(diagnostic.state_of_health)
        .bind(diagnostic.state_of_charge)
        .bind(diagnostic.capacity)
        .bind(diagnostic.internal_resistance)
        .bind(diagnostic.temperature)
        .bind(diagnostic.voltage)
        .bind(diagnostic.fault_risk)
        .bind(diagnostic.has_warning)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;
        Ok(diagnostic)
    }

    async fn list_diagnostics(&self, user_id: i64) -> ApiResult<Vec<BatteryDiagnostic>> {
        let rows = sqlx::query_as::<_, BatteryDiagnostic>(
            "SELECT id, user_id, battery_type, state_of_health, state_of_charge, capacity,
                 internal_resistance, temperature, voltage, fault_risk, has_warning, timestamp
             FROM battery_diagnostics WHERE user_id = ?1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create_alert_threshold(
        &self,
        user_id: i64,
        threshold: NewAlertThreshold,
    ) -> ApiResult<AlertThreshold> {
        let now = Utc::now();
        let threshold = sqlx::query_as::<_, AlertThreshold>(&format!(
            "INSERT INTO alert_thresholds
                (user_id, parameter_name, min_value, max_value, is_enabled, severity,
                 notification_method, created, updated, version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, 1)
             RETURNING {}",
            THRESHOLD_COLUMNS
        ))
        .bind(user_id)
        .bind(threshold.parameter_name)
        .bind(threshold.min_value)
        .bind(threshold.max_value)
        .bind(threshold.is_enabled)
        .bind(threshold.severity)
        .bind(threshold.notification_method)
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        Ok(threshold)
    }

    async fn list_alert_thresholds(&self, user_id: i64) -> ApiResult<Vec<AlertThreshold>> {
        let rows = sqlx::query_as::<_, AlertThreshold>(&format!(
            "SELECT {} FROM alert_thresholds WHERE user_id = ?1 ORDER BY id",
            THRESHOLD_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn update_alert_threshold(
        &self,
        user_id: i64,
        threshold_id: i64,
        patch: ThresholdPatch,
    ) -> ApiResult<AlertThreshold> {
        let current = self.find_threshold(user_id, threshold_id).await?;
        self.write_merged(current, &patch).await
    }

    async fn record_alert(&self, user_id: i64, alert: NewAlertHistory) -> ApiResult<AlertHistory> {
        let alert = sqlx::query_as::<_, AlertHistory>(&format!(
            "INSERT INTO alert_history
                (user_id, threshold_id, parameter_name, value, timestamp, severity, message,
                 acknowledged, acknowledged_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL)
             RETURNING {}",
            HISTORY_COLUMNS
        ))
        .bind(user_id)
        .bind(alert.threshold_id)
        .bind(alert.parameter_name)
        .bind(alert.value)
        .bind(Utc::now())
        .bind(alert.severity)
        .bind(&alert.message)
        .fetch_one(&self.db)
        .await?;
        Ok(alert)
    }

    async fn list_alert_history(&self, user_id: i64) -> ApiResult<Vec<AlertHistory>> {
        let rows = sqlx::query_as::<_, AlertHistory>(&format!(
            "SELECT {} FROM alert_history WHERE user_id = ?1 ORDER BY timestamp DESC, id DESC",
            HISTORY_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn acknowledge_alert(&self, user_id: i64, alert_id: i64) -> ApiResult<AlertHistory> {
        // Only the first acknowledgement stamps the time
        sqlx::query(
            "UPDATE alert_history SET acknowledged = 1, acknowledged_at = ?1
             WHERE id = ?2 AND user_id = ?3 AND acknowledged = 0",
        )
        .bind(Utc::now())
        .bind(alert_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        self.find_alert(user_id, alert_id).await
    }
}
