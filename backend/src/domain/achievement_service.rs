//! Achievement badges. The HTTP surface is read-only; badges are issued
//! internally and a user can never earn the same named badge twice.

use chrono::{DateTime, Utc};
use shared::AchievementBadge;
use tracing::info;

use crate::auth::AuthUser;
use crate::db::DbConnection;
use crate::error::AppError;

const DEFAULT_ICON: &str = "trophy";

#[derive(Debug, sqlx::FromRow)]
struct BadgeRow {
    id: i64,
    user_id: String,
    user_username: String,
    name: String,
    description: String,
    icon: String,
    earned_at: DateTime<Utc>,
}

impl From<BadgeRow> for AchievementBadge {
    fn from(row: BadgeRow) -> Self {
        AchievementBadge {
            id: row.id,
            user: row.user_id,
            user_username: row.user_username,
            name: row.name,
            description: row.description,
            icon: row.icon,
            earned_at: row.earned_at,
        }
    }
}

#[derive(Clone)]
pub struct AchievementService {
    db: DbConnection,
}

impl AchievementService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn list_badges(&self, owner: &AuthUser) -> Result<Vec<AchievementBadge>, AppError> {
        let rows = sqlx::query_as::<_, BadgeRow>(
            "SELECT b.*, u.username AS user_username FROM achievement_badges b
             JOIN users u ON u.id = b.user_id
             WHERE b.user_id = ?
             ORDER BY b.earned_at DESC",
        )
        .bind(&owner.id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_badge(&self, owner: &AuthUser, id: i64) -> Result<AchievementBadge, AppError> {
        let row = sqlx::query_as::<_, BadgeRow>(
            "SELECT b.*, u.username AS user_username FROM achievement_badges b
             JOIN users u ON u.id = b.user_id
             WHERE b.id = ? AND b.user_id = ?",
        )
        .bind(id)
        .bind(&owner.id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::NotFound("Not found.".to_string()))?;
        Ok(row.into())
    }

    /// Issue a badge to a user. The (owner, name) pair is unique; a second
    /// award of the same name fails without persisting anything.
    pub async fn award(
        &self,
        owner: &AuthUser,
        name: &str,
        description: &str,
        icon: Option<&str>,
    ) -> Result<AchievementBadge, AppError> {
        let earned_at = Utc::now();
        let icon = icon.unwrap_or(DEFAULT_ICON);

        let result = sqlx::query(
            "INSERT INTO achievement_badges (user_id, name, description, icon, earned_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&owner.id)
        .bind(name)
        .bind(description)
        .bind(icon)
        .bind(earned_at)
        .execute(self.db.pool())
        .await;

        match result {
            Ok(done) => {
                info!("Awarded badge '{}' to user {}", name, owner.id);
                Ok(AchievementBadge {
                    id: done.last_insert_rowid(),
                    user: owner.id.clone(),
                    user_username: owner.username.clone(),
                    name: name.to_string(),
                    description: description.to_string(),
                    icon: icon.to_string(),
                    earned_at,
                })
            }
            Err(e) if is_unique_violation(&e) => Err(AppError::validation(
                "name",
                "This badge has already been earned.",
            )),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
