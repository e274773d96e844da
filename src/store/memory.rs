/// In-process record store
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
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// One collection with its own id sequence
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: Table<User>,
    diagnostics: Table<BatteryDiagnostic>,
    thresholds: Table<AlertThreshold>,
    history: Table<AlertHistory>,
}

/// Record store held in memory; contents are lost on restart.
///
/// All four collections sit behind one lock so a write is never observed
/// half-applied.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> ApiResult<User> {
        let mut tables = self.tables.write().await;

        if tables.users.rows.values().any(|u| u.username == user.username) {
            return Err(ApiError::Conflict(format!(
                "Username {} already taken",
                user.username
            )));
        }
        if tables.users.rows.values().any(|u| u.api_key == user.api_key) {
            return Err(ApiError::Conflict("API key collision".to_string()));
        }

        let id = tables.users.allocate_id();
        let user = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            api_key: user.api_key,
        };
        tables.users.rows.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> ApiResult<Option<User>> {
        Ok(self.tables.read().await.users.rows.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_user_by_api_key(&self, api_key: &str) -> ApiResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .rows
            .values()
            .find(|u| u.api_key == api_key)
            .cloned())
    }

    async fn create_diagnostic(
        &self,
        user_id: i64,
        diagnostic: NewDiagnostic,
    ) -> ApiResult<BatteryDiagnostic> {
        let mut tables = self.tables.write().await;
        let id = tables.diagnostics.allocate_id();
        let diagnostic = BatteryDiagnostic {
            id,
            user_id,
            battery_type: diagnostic.battery_type,
            state_of_health: diagnostic.state_of_health,
            state_of_charge: diagnostic.state_of_charge,
            capacity: diagnostic.capacity,
            internal_resistance: diagnostic.internal_resistance,
            temperature: diagnostic.temperature,
            voltage: diagnostic.voltage,
            fault_risk: diagnostic.fault_risk,
            has_warning: diagnostic.has_warning,
            timestamp: Utc::now(),
        };
        tables.diagnostics.rows.insert(id, diagnostic.clone());
        Ok(diagnostic)
    }

    async fn list_diagnostics(&self, user_id: i64) -> ApiResult<Vec<BatteryDiagnostic>> {
        let tables = self.tables.read().await;
        Ok(tables
            .diagnostics
            .rows
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_alert_threshold(
        &self,
        user_id: i64,
        threshold: NewAlertThreshold,
    ) -> ApiResult<AlertThreshold> {
        let mut tables = self.tables.write().await;
        let id = tables.thresholds.allocate_id();
        let now = Utc::now();
        let threshold = AlertThreshold {
            id,
            user_id,
            parameter_name: threshold.parameter_name,
            min_value: threshold.min_value,
            max_value: threshold.max_value,
            is_enabled: threshold.is_enabled,
            severity: threshold.severity,
            notification_method: threshold.notification_method,
            created: now,
            updated: now,
            version: 1,
        };
        tables.thresholds.rows.insert(id, threshold.clone());
        Ok(threshold)
    }

    async fn list_alert_thresholds(&self, user_id: i64) -> ApiResult<Vec<AlertThreshold>> {
        let tables = self.tables.read().await;
        Ok(tables
            .thresholds
            .rows
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_alert_threshold(
        &self,
        user_id: i64,
        threshold_id: i64,
        patch: ThresholdPatch,
    ) -> ApiResult<AlertThreshold> {
        let mut tables = self.tables.write().await;
        let threshold = tables
            .thresholds
            .rows
            .get_mut(&threshold_id)
            .filter(|t| t.user_id == user_id)
            .ok_or_else(|| threshold_not_found(threshold_id))?;

        let mut merged = threshold.clone();
        patch.apply_to(&mut merged);
        check_merged_bounds(&merged)?;

        merged.updated = Utc::now();
        merged.version += 1;
        *threshold = merged.clone();
        Ok(merged)
    }

    async fn record_alert(&self, user_id: i64, alert: NewAlertHistory) -> ApiResult<AlertHistory> {
        let mut tables = self.tables.write().await;
        let id = tables.history.allocate_id();
        let alert = AlertHistory {
            id,
            user_id,
            threshold_id: alert.threshold_id,
            parameter_name: alert.parameter_name,
            value: alert.value,
            timestamp: Utc::now(),
            severity: alert.severity,
            message: alert.message,
            acknowledged: false,
            acknowledged_at: None,
        };
        tables.history.rows.insert(id, alert.clone());
        Ok(alert)
    }

    async fn list_alert_history(&self, user_id: i64) -> ApiResult<Vec<AlertHistory>> {
        let tables = self.tables.read().await;
        let mut history: Vec<AlertHistory> = tables
            .history
            .rows
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(history)
    }

    async fn acknowledge_alert(&self, user_id: i64, alert_id: i64) -> ApiResult<AlertHistory> {
        let mut tables = self.tables.write().await;
        let alert = tables
            .history
            .rows
            .get_mut(&alert_id)
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| alert_not_found(alert_id))?;

        if !alert.acknowledged {
            alert.acknowledged = true;
            alert.acknowledged_at = Some(Utc::now());
        }
        Ok(alert.clone())
    }
}
