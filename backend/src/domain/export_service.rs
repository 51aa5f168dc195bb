//! Export request orchestration.
//!
//! Each request moves through an explicit state machine: pending ->
//! processing -> completed | failed. Generation runs synchronously inside
//! the creating request and is isolated behind [`ExportGenerator`] so a
//! queued worker could take it over later without changing the observable
//! lifecycle. A generation failure lands the request in the terminal
//! `failed` state; it never propagates to the caller, and there is no
//! retry — a new request must be issued instead.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{ExportFormat, ExportRequest, ExportStatus};
use tracing::{error, info};

use crate::auth::AuthUser;
use crate::db::DbConnection;
use crate::error::AppError;

/// Produces the export artifact and returns its URL.
pub trait ExportGenerator: Send + Sync {
    fn generate(&self, user_id: &str, format: ExportFormat) -> anyhow::Result<String>;
}

/// Resolves every export to a deterministic per-user, per-format path.
/// Repeated requests of the same format point at the same slot; the URL is
/// always the *current* export for that user and format.
pub struct MediaPathGenerator;

impl ExportGenerator for MediaPathGenerator {
    fn generate(&self, user_id: &str, format: ExportFormat) -> anyhow::Result<String> {
        Ok(format!(
            "/media/exports/{}/{}/export.{}",
            user_id,
            format.as_str(),
            format.as_str()
        ))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ExportRow {
    id: i64,
    user_id: String,
    user_username: String,
    format: String,
    status: String,
    requested_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    file_url: Option<String>,
}

impl ExportRow {
    fn into_dto(self) -> Result<ExportRequest, AppError> {
        let format = ExportFormat::from_string(&self.format)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        let status = ExportStatus::from_string(&self.status)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        Ok(ExportRequest {
            id: self.id,
            user: self.user_id,
            user_username: self.user_username,
            format,
            status,
            requested_at: self.requested_at,
            completed_at: self.completed_at,
            file_url: self.file_url,
        })
    }
}

#[derive(Clone)]
pub struct ExportService {
    db: DbConnection,
    generator: Arc<dyn ExportGenerator>,
}

impl ExportService {
    pub fn new(db: DbConnection, generator: Arc<dyn ExportGenerator>) -> Self {
        Self { db, generator }
    }

    /// Create an export request and run it to a terminal state before
    /// returning.
    pub async fn create(
        &self,
        owner: &AuthUser,
        format: ExportFormat,
    ) -> Result<ExportRequest, AppError> {
        info!("Export requested by user {} ({})", owner.id, format.as_str());

        let requested_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO export_requests (user_id, format, status, requested_at)
             VALUES (?, ?, 'pending', ?)",
        )
        .bind(&owner.id)
        .bind(format.as_str())
        .bind(requested_at)
        .execute(self.db.pool())
        .await?;
        let id = result.last_insert_rowid();

        self.set_status(id, ExportStatus::Processing).await?;

        match self.generator.generate(&owner.id, format) {
            Ok(file_url) => {
                sqlx::query(
                    "UPDATE export_requests
                     SET status = 'completed', completed_at = ?, file_url = ?
                     WHERE id = ?",
                )
                .bind(Utc::now())
                .bind(&file_url)
                .bind(id)
                .execute(self.db.pool())
                .await?;
                info!("Export {} completed at {}", id, file_url);
            }
            Err(e) => {
                // Terminal: completed_at and file_url stay unset, and the
                // error is swallowed into the state machine.
                error!("Export {} failed: {:?}", id, e);
                self.set_status(id, ExportStatus::Failed).await?;
            }
        }

        self.get(owner, id).await
    }

    pub async fn list(&self, owner: &AuthUser) -> Result<Vec<ExportRequest>, AppError> {
        let rows = sqlx::query_as::<_, ExportRow>(
            "SELECT e.*, u.username AS user_username FROM export_requests e
             JOIN users u ON u.id = e.user_id
             WHERE e.user_id = ?
             ORDER BY e.requested_at DESC",
        )
        .bind(&owner.id)
        .fetch_all(self.db.pool())
        .await?;
        rows.into_iter().map(ExportRow::into_dto).collect()
    }

    pub async fn get(&self, owner: &AuthUser, id: i64) -> Result<ExportRequest, AppError> {
        sqlx::query_as::<_, ExportRow>(
            "SELECT e.*, u.username AS user_username FROM export_requests e
             JOIN users u ON u.id = e.user_id
             WHERE e.id = ? AND e.user_id = ?",
        )
        .bind(id)
        .bind(&owner.id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::NotFound("Not found.".to_string()))?
        .into_dto()
    }

    async fn set_status(&self, id: i64, status: ExportStatus) -> Result<(), AppError> {
        sqlx::query("UPDATE export_requests SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_user, test_db};

    struct FailingGenerator;

    impl ExportGenerator for FailingGenerator {
        fn generate(&self, _user_id: &str, _format: ExportFormat) -> anyhow::Result<String> {
            Err(anyhow::anyhow!("disk full"))
        }
    }

    #[tokio::test]
    async fn test_csv_export_completes_with_deterministic_url() {
        let db = test_db().await;
        let user = create_user(&db, "casey").await;
        let service = ExportService::new(db, Arc::new(MediaPathGenerator));

        let export = service.create(&user, ExportFormat::Csv).await.unwrap();

        assert_eq!(export.status, ExportStatus::Completed);
        assert!(export.completed_at.is_some());
        assert_eq!(
            export.file_url.as_deref(),
            Some(format!("/media/exports/{}/csv/export.csv", user.id).as_str())
        );
    }

    #[tokio::test]
    async fn test_failed_generation_lands_in_terminal_failed_state() {
        let db = test_db().await;
        let user = create_user(&db, "casey").await;
        let service = ExportService::new(db, Arc::new(FailingGenerator));

        // Creation succeeds even though generation fails
        let export = service.create(&user, ExportFormat::Pdf).await.unwrap();

        assert_eq!(export.status, ExportStatus::Failed);
        assert!(export.completed_at.is_none());
        assert!(export.file_url.is_none());
    }

    #[tokio::test]
    async fn test_repeated_requests_share_the_format_slot() {
        let db = test_db().await;
        let user = create_user(&db, "casey").await;
        let service = ExportService::new(db, Arc::new(MediaPathGenerator));

        let first = service.create(&user, ExportFormat::Json).await.unwrap();
        let second = service.create(&user, ExportFormat::Json).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.file_url, second.file_url);
        assert_eq!(service.list(&user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_exports_are_ownership_scoped() {
        let db = test_db().await;
        let casey = create_user(&db, "casey").await;
        let riley = create_user(&db, "riley").await;
        let service = ExportService::new(db, Arc::new(MediaPathGenerator));

        let export = service.create(&casey, ExportFormat::Csv).await.unwrap();

        assert!(service.list(&riley).await.unwrap().is_empty());
        assert!(matches!(
            service.get(&riley, export.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
