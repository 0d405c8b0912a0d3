//! SQLite template storage
//!
//! Each template family has one row in `template_families` holding the latest
//! version number, the columns used for filtering and the usage statistics.
//! Versions are immutable rows in `template_versions` with the template body
//! stored as JSON.

use std::str::FromStr;

use async_trait::async_trait;
use reportdesk::{Template, TemplateId, UsageStats, UsageUpdate};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use super::{TemplateFilter, TemplateStore};
use crate::error::{RegistryError, Result};

/// SQLite-based template storage implementation
pub struct SqliteStorage {
    pool: SqlitePool,
}

fn storage_err(context: &'static str) -> impl Fn(sqlx::Error) -> RegistryError {
    move |e| RegistryError::Storage(format!("{}: {}", context, e))
}

fn version_from_db(value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| RegistryError::Storage(format!("Invalid version number in database: {}", value)))
}

fn count_from_db(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| RegistryError::Storage(format!("Invalid usage count in database: {}", value)))
}

fn count_to_db(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| RegistryError::Storage(format!("Usage count out of range: {}", value)))
}

/// Rebuild a template from a joined version/family row
fn template_from_row(row: &SqliteRow) -> Result<Template> {
    let template_json: String = row.get("template_data");
    let mut template: Template = serde_json::from_str(&template_json).map_err(|e| {
        RegistryError::Storage(format!("Failed to deserialize template: {}", e))
    })?;

    template.usage = UsageStats {
        usage_count: count_from_db(row.get("usage_count"))?,
        average_completion_time: row.get("average_completion_time"),
    };
    Ok(template)
}

impl SqliteStorage {
    /// Create a new SQLite storage instance with the given database URL
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| RegistryError::Storage(format!("Invalid database path: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(storage_err("Failed to connect to SQLite"))?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create SQLite storage from the `DATABASE_URL` environment variable
    ///
    /// Example: sqlite:./data/reportdesk.db
    pub async fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/reportdesk.db".to_string());

        Self::new(&database_url).await
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS template_families (
                template_id TEXT PRIMARY KEY,
                latest_version INTEGER NOT NULL,
                department_id TEXT NOT NULL,
                report_type TEXT NOT NULL,
                is_public INTEGER NOT NULL DEFAULT 0,   -- SQLite boolean (0/1)
                usage_count INTEGER NOT NULL DEFAULT 0,
                average_completion_time REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err("Failed to create template_families table"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS template_versions (
                template_id TEXT NOT NULL REFERENCES template_families(template_id),
                version INTEGER NOT NULL,
                template_data TEXT NOT NULL,            -- JSON
                created_at TEXT NOT NULL,
                PRIMARY KEY (template_id, version)
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err("Failed to create template_versions table"))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_families_department ON template_families(department_id, report_type)",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err("Failed to create department index"))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_families_public ON template_families(is_public)")
            .execute(&self.pool)
            .await
            .map_err(storage_err("Failed to create public index"))?;

        Ok(())
    }
}

#[async_trait]
impl TemplateStore for SqliteStorage {
    async fn save_version(&self, template: &Template) -> Result<()> {
        let template_json = serde_json::to_string(template)
            .map_err(|e| RegistryError::Storage(format!("Failed to serialize template: {}", e)))?;

        let created_at = template
            .created_at
            .format(&Rfc3339)
            .map_err(|e| RegistryError::Storage(format!("Failed to format timestamp: {}", e)))?;
        let updated_at = template
            .updated_at
            .format(&Rfc3339)
            .map_err(|e| RegistryError::Storage(format!("Failed to format timestamp: {}", e)))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_err("Failed to begin transaction"))?;

        // The first statement writes, so concurrent appends queue on the
        // write lock and the loser sees the winner's version afterwards.
        let claimed = if template.version == 1 {
            sqlx::query(
                r#"
                INSERT INTO template_families
                (template_id, latest_version, department_id, report_type, is_public,
                 usage_count, average_completion_time, created_at, updated_at)
                VALUES (?, 1, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(template_id) DO NOTHING
            "#,
            )
            .bind(template.id.as_ref())
            .bind(template.department_id().as_ref())
            .bind(template.definition.report_type.as_str())
            .bind(template.is_public())
            .bind(count_to_db(template.usage.usage_count)?)
            .bind(template.usage.average_completion_time)
            .bind(&created_at)
            .bind(&updated_at)
            .execute(&mut *tx)
            .await
            .map_err(storage_err("Failed to create template family"))?
            .rows_affected()
        } else {
            sqlx::query(
                r#"
                UPDATE template_families
                SET latest_version = ?, department_id = ?, report_type = ?, is_public = ?, updated_at = ?
                WHERE template_id = ? AND latest_version = ?
            "#,
            )
            .bind(i64::from(template.version))
            .bind(template.department_id().as_ref())
            .bind(template.definition.report_type.as_str())
            .bind(template.is_public())
            .bind(&updated_at)
            .bind(template.id.as_ref())
            .bind(i64::from(template.version) - 1)
            .execute(&mut *tx)
            .await
            .map_err(storage_err("Failed to update template family"))?
            .rows_affected()
        };

        if claimed == 0 {
            let latest: Option<i64> =
                sqlx::query_scalar("SELECT latest_version FROM template_families WHERE template_id = ?")
                    .bind(template.id.as_ref())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(storage_err("Failed to read template family"))?;

            return Err(match latest {
                Some(latest) => RegistryError::Conflict {
                    template_id: template.id.to_string(),
                    expected: version_from_db(latest)? + 1,
                    actual: template.version,
                },
                None => RegistryError::TemplateNotFound(template.id.to_string()),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO template_versions (template_id, version, template_data, created_at)
            VALUES (?, ?, ?, ?)
        "#,
        )
        .bind(template.id.as_ref())
        .bind(i64::from(template.version))
        .bind(template_json)
        .bind(&updated_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_err("Failed to save template version"))?;

        tx.commit()
            .await
            .map_err(storage_err("Failed to commit template version"))?;

        debug!(template_id = %template.id, version = template.version, "Saved template version");
        Ok(())
    }

    async fn get_template(&self, id: &TemplateId) -> Result<Template> {
        let row = sqlx::query(
            r#"
            SELECT v.template_data, f.usage_count, f.average_completion_time
            FROM template_families f
            JOIN template_versions v
              ON v.template_id = f.template_id AND v.version = f.latest_version
            WHERE f.template_id = ?
        "#,
        )
        .bind(id.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("Failed to get template"))?
        .ok_or_else(|| RegistryError::TemplateNotFound(id.to_string()))?;

        template_from_row(&row)
    }

    async fn get_version(&self, id: &TemplateId, version: u32) -> Result<Template> {
        let row = sqlx::query(
            r#"
            SELECT v.template_data, f.usage_count, f.average_completion_time
            FROM template_families f
            JOIN template_versions v ON v.template_id = f.template_id
            WHERE f.template_id = ? AND v.version = ?
        "#,
        )
        .bind(id.as_ref())
        .bind(i64::from(version))
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("Failed to get template version"))?;

        match row {
            Some(row) => template_from_row(&row),
            None => {
                // Distinguish a missing family from a missing version
                self.list_versions(id).await?;
                Err(RegistryError::VersionNotFound {
                    template_id: id.to_string(),
                    version,
                })
            }
        }
    }

    async fn list_versions(&self, id: &TemplateId) -> Result<Vec<u32>> {
        let versions: Vec<i64> = sqlx::query_scalar(
            "SELECT version FROM template_versions WHERE template_id = ? ORDER BY version",
        )
        .bind(id.as_ref())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err("Failed to list template versions"))?;

        if versions.is_empty() {
            return Err(RegistryError::TemplateNotFound(id.to_string()));
        }
        versions.into_iter().map(version_from_db).collect()
    }

    async fn find_templates(&self, filter: &TemplateFilter) -> Result<Vec<Template>> {
        let department = filter.department_id.as_ref().map(|d| d.as_ref().to_string());
        let report_type = filter.report_type.map(|r| r.as_str());

        let rows = sqlx::query(
            r#"
            SELECT v.template_data, f.usage_count, f.average_completion_time
            FROM template_families f
            JOIN template_versions v
              ON v.template_id = f.template_id AND v.version = f.latest_version
            WHERE (? IS NULL OR f.department_id = ?)
              AND (? IS NULL OR f.report_type = ?)
              AND (? = 0 OR f.is_public = 1)
            ORDER BY f.template_id
        "#,
        )
        .bind(department.clone())
        .bind(department)
        .bind(report_type)
        .bind(report_type)
        .bind(filter.public_only)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err("Failed to query templates"))?;

        rows.iter().map(template_from_row).collect()
    }

    async fn apply_usage(&self, id: &TemplateId, update: UsageUpdate) -> Result<UsageStats> {
        // Reject bad input before touching the database.
        update.check()?;

        // One statement per update: SQLite serializes it on the write lock
        // and every expression reads the pre-update row. The arithmetic is
        // the same as `UsageStats::apply`.
        let query = match update {
            UsageUpdate::Increment => sqlx::query(
                r#"
                UPDATE template_families
                SET usage_count = usage_count + 1
                WHERE template_id = ?
                RETURNING usage_count, average_completion_time
            "#,
            )
            .bind(id.as_ref()),
            UsageUpdate::Completion(seconds) => sqlx::query(
                r#"
                UPDATE template_families
                SET usage_count = usage_count + 1,
                    average_completion_time = CASE
                        WHEN usage_count = 0 THEN ?
                        ELSE average_completion_time
                             + (? - average_completion_time) / (usage_count + 1)
                    END
                WHERE template_id = ?
                RETURNING usage_count, average_completion_time
            "#,
            )
            .bind(seconds)
            .bind(seconds)
            .bind(id.as_ref()),
        };

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err("Failed to update usage statistics"))?
            .ok_or_else(|| RegistryError::TemplateNotFound(id.to_string()))?;

        Ok(UsageStats {
            usage_count: count_from_db(row.get("usage_count"))?,
            average_completion_time: row.get("average_completion_time"),
        })
    }
}
