//! Supabase (PostgREST) backed storage adapter.

use async_trait::async_trait;
use postgrest::Postgrest;
use serde::Deserialize;
use std::sync::Arc;

use quiz_core::model::{Task, UserId};

use crate::repository::{
    RegistrationRecord, RegistrationRepository, StorageError, TaskRecord, TaskRepository,
};

/// PostgREST answers a `.single()` query over zero rows with 406.
const NO_ROWS: u16 = 406;

/// Connection settings for a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
    pub tasks_table: String,
    pub codes_table: String,
}

impl SupabaseConfig {
    /// Build a config with the default table names (`tasks`, `codes`).
    #[must_use]
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            tasks_table: "tasks".to_owned(),
            codes_table: "codes".to_owned(),
        }
    }

    #[must_use]
    pub fn with_tables(
        mut self,
        tasks_table: impl Into<String>,
        codes_table: impl Into<String>,
    ) -> Self {
        self.tasks_table = tasks_table.into();
        self.codes_table = codes_table.into();
        self
    }
}

/// Registration and task-bank repositories over Supabase's REST interface.
pub struct SupabaseStorage {
    client: Postgrest,
    tasks_table: String,
    codes_table: String,
}

/// Raw row of the codes table.
#[derive(Debug, Deserialize)]
struct CodeRow {
    code: String,
    #[serde(default)]
    telegram_id: Option<i64>,
}

impl From<CodeRow> for RegistrationRecord {
    fn from(row: CodeRow) -> Self {
        Self {
            code: row.code,
            telegram_id: row.telegram_id.map(UserId::new),
        }
    }
}

impl SupabaseStorage {
    #[must_use]
    pub fn new(config: SupabaseConfig) -> Self {
        let client = Postgrest::new(format!("{}/rest/v1", config.url.trim_end_matches('/')))
            .insert_header("apikey", config.key.clone())
            .insert_header("Authorization", format!("Bearer {}", config.key));
        Self {
            client,
            tasks_table: config.tasks_table,
            codes_table: config.codes_table,
        }
    }

    async fn find_code_row(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<RegistrationRecord>, StorageError> {
        let response = self
            .client
            .from(&self.codes_table)
            .select("*")
            .eq(column, value)
            .single()
            .execute()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        if response.status().as_u16() == NO_ROWS {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(table = %self.codes_table, %status, "code lookup failed");
            return Err(StorageError::Connection(format!(
                "code lookup failed with status {status}"
            )));
        }

        let row: CodeRow = response
            .json()
            .await
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        Ok(Some(row.into()))
    }
}

#[async_trait]
impl RegistrationRepository for SupabaseStorage {
    async fn find_by_code(&self, code: &str) -> Result<Option<RegistrationRecord>, StorageError> {
        self.find_code_row("code", code).await
    }

    async fn find_by_user(&self, user: UserId) -> Result<Option<RegistrationRecord>, StorageError> {
        self.find_code_row("telegram_id", &user.value().to_string())
            .await
    }

    async fn bind_user(&self, code: &str, user: UserId) -> Result<(), StorageError> {
        let body = serde_json::json!({ "telegram_id": user.value() }).to_string();
        let response = self
            .client
            .from(&self.codes_table)
            .update(body)
            .eq("code", code)
            .execute()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(table = %self.codes_table, %status, "code bind failed");
            return Err(StorageError::Connection(format!(
                "code bind failed with status {status}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for SupabaseStorage {
    async fn list_all(&self) -> Result<Vec<Task>, StorageError> {
        let response = self
            .client
            .from(&self.tasks_table)
            .select("*")
            .execute()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(table = %self.tasks_table, %status, "task load failed");
            return Err(StorageError::Connection(format!(
                "task load failed with status {status}"
            )));
        }

        let rows: Vec<TaskRecord> = response
            .json()
            .await
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        Ok(rows.into_iter().map(TaskRecord::into_task).collect())
    }
}

impl crate::repository::Storage {
    /// Both repositories over one Supabase project.
    #[must_use]
    pub fn supabase(config: SupabaseConfig) -> Self {
        let store = Arc::new(SupabaseStorage::new(config));
        let registrations: Arc<dyn RegistrationRepository> = store.clone();
        let tasks: Arc<dyn TaskRepository> = store;
        Self {
            registrations,
            tasks,
        }
    }
}
