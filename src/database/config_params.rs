//! Config parameter storage and retrieval from PostgreSQL.
//!
//! A generic key-value store, organized by category, that backs the
//! `database_operation` default tool (§4.6). Parameters are runtime-editable
//! independent of the process configuration tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::Result;

/// A stored configuration parameter.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConfigParam {
    pub id: Uuid,
    pub category: String,
    pub key: String,
    pub value: String,
    pub value_type: String,
    pub is_secret: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Value type hint for config params.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigValueType {
    String,
    Number,
    Boolean,
    Json,
}

impl ConfigValueType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for ConfigValueType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" | "str" => Ok(Self::String),
            "number" | "num" | "int" | "float" => Ok(Self::Number),
            "boolean" | "bool" => Ok(Self::Boolean),
            "json" | "object" | "array" => Ok(Self::Json),
            _ => Err(crate::error::Error::Config(format!(
                "Invalid value type: {}. Valid: string, number, boolean, json",
                s
            ))),
        }
    }
}

/// Config parameter store backed by PostgreSQL.
#[derive(Clone)]
pub struct ConfigParamStore {
    pool: PgPool,
}

impl ConfigParamStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a single parameter by category and key.
    pub async fn get(&self, category: &str, key: &str) -> Result<Option<ConfigParam>> {
        let param: Option<ConfigParam> =
            sqlx::query_as("SELECT * FROM config_params WHERE category = $1 AND key = $2")
                .bind(category)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(param)
    }

    /// Get all parameters, optionally filtered by category.
    pub async fn get_all(&self, category: Option<&str>) -> Result<Vec<ConfigParam>> {
        if let Some(cat) = category {
            let params: Vec<ConfigParam> =
                sqlx::query_as("SELECT * FROM config_params WHERE category = $1 ORDER BY category, key")
                    .bind(cat)
                    .fetch_all(&self.pool)
                    .await?;
            Ok(params)
        } else {
            let params: Vec<ConfigParam> =
                sqlx::query_as("SELECT * FROM config_params ORDER BY category, key")
                    .fetch_all(&self.pool)
                    .await?;
            Ok(params)
        }
    }

    /// Insert or update a parameter.
    pub async fn upsert(
        &self,
        category: &str,
        key: &str,
        value: &str,
        value_type: ConfigValueType,
        is_secret: bool,
        description: Option<&str>,
    ) -> Result<ConfigParam> {
        let param: ConfigParam = sqlx::query_as(
            r#"
            INSERT INTO config_params (category, key, value, value_type, is_secret, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (category, key) DO UPDATE SET
                value = EXCLUDED.value,
                value_type = EXCLUDED.value_type,
                is_secret = EXCLUDED.is_secret,
                description = COALESCE(EXCLUDED.description, config_params.description),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(category)
        .bind(key)
        .bind(value)
        .bind(value_type.as_str())
        .bind(is_secret)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(param)
    }

    /// Delete a parameter by category and key. Returns whether a row was removed.
    pub async fn delete(&self, category: &str, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM config_params WHERE category = $1 AND key = $2")
            .bind(category)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert a param only if it doesn't already exist. Returns 1 if
    /// inserted, 0 if skipped.
    pub async fn seed_if_absent(
        &self,
        category: &str,
        key: &str,
        value: &str,
        value_type: ConfigValueType,
        is_secret: bool,
        description: Option<&str>,
    ) -> Result<usize> {
        let result = sqlx::query(
            r#"
            INSERT INTO config_params (category, key, value, value_type, is_secret, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (category, key) DO NOTHING
            "#,
        )
        .bind(category)
        .bind(key)
        .bind(value)
        .bind(value_type.as_str())
        .bind(is_secret)
        .bind(description)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() as usize)
    }
}
