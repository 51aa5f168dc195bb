//! Goal management: owner-scoped CRUD with the derived progress percentage.
//!
//! Progress is computed on every read from target/current and never stored.
//! The `completed` list filter keeps the permissive parsing the API has
//! always had: a case-insensitive "true" selects completed goals and any
//! other value selects active ones.

use chrono::{DateTime, NaiveDate, Utc};
use shared::{CreateGoalRequest, Goal, UpdateGoalRequest};
use tracing::info;

use crate::auth::AuthUser;
use crate::db::DbConnection;
use crate::error::{AppError, FieldValidator};

const MAX_TITLE_LEN: usize = 200;
const MAX_UNIT_LEN: usize = 50;

#[derive(Debug, sqlx::FromRow)]
struct GoalRow {
    id: i64,
    user_id: String,
    user_username: String,
    title: String,
    description: String,
    target_value: f64,
    current_value: f64,
    unit: String,
    deadline: NaiveDate,
    is_completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GoalRow> for Goal {
    fn from(row: GoalRow) -> Self {
        let progress = Goal::progress_percentage(row.target_value, row.current_value);
        Goal {
            id: row.id,
            user: row.user_id,
            user_username: row.user_username,
            title: row.title,
            description: row.description,
            target_value: row.target_value,
            current_value: row.current_value,
            unit: row.unit,
            deadline: row.deadline,
            is_completed: row.is_completed,
            progress_percentage: progress,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Parse the `completed` query value: case-insensitive "true" means
/// completed, anything else (including garbage) means not completed.
pub fn parse_completed_filter(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}

#[derive(Clone)]
pub struct GoalService {
    db: DbConnection,
}

impl GoalService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn create_goal(
        &self,
        owner: &AuthUser,
        request: CreateGoalRequest,
    ) -> Result<Goal, AppError> {
        let mut v = FieldValidator::new();
        if request.title.trim().is_empty() {
            v.push("title", "This field may not be blank.");
        }
        if request.title.len() > MAX_TITLE_LEN {
            v.push(
                "title",
                format!("Ensure this field has no more than {} characters.", MAX_TITLE_LEN),
            );
        }
        if request.unit.trim().is_empty() {
            v.push("unit", "This field may not be blank.");
        }
        if request.unit.len() > MAX_UNIT_LEN {
            v.push(
                "unit",
                format!("Ensure this field has no more than {} characters.", MAX_UNIT_LEN),
            );
        }
        v.finish()?;

        let now = Utc::now();
        let description = request.description.unwrap_or_default();
        let current_value = request.current_value.unwrap_or(0.0);

        let result = sqlx::query(
            "INSERT INTO goals
             (user_id, title, description, target_value, current_value, unit, deadline, is_completed, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&owner.id)
        .bind(&request.title)
        .bind(&description)
        .bind(request.target_value)
        .bind(current_value)
        .bind(&request.unit)
        .bind(request.deadline)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        info!("Created goal '{}' for user {}", request.title, owner.id);

        Ok(Goal {
            id: result.last_insert_rowid(),
            user: owner.id.clone(),
            user_username: owner.username.clone(),
            title: request.title,
            description,
            target_value: request.target_value,
            current_value,
            unit: request.unit,
            deadline: request.deadline,
            is_completed: false,
            progress_percentage: Goal::progress_percentage(request.target_value, current_value),
            created_at: now,
            updated_at: now,
        })
    }

    /// List the user's goals, most recently created first, optionally
    /// filtered by completion state.
    pub async fn list_goals(
        &self,
        owner: &AuthUser,
        completed: Option<&str>,
    ) -> Result<Vec<Goal>, AppError> {
        let rows = match completed {
            Some(raw) => {
                sqlx::query_as::<_, GoalRow>(
                    "SELECT g.*, u.username AS user_username FROM goals g
                     JOIN users u ON u.id = g.user_id
                     WHERE g.user_id = ? AND g.is_completed = ?
                     ORDER BY g.created_at DESC",
                )
                .bind(&owner.id)
                .bind(parse_completed_filter(raw))
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, GoalRow>(
                    "SELECT g.*, u.username AS user_username FROM goals g
                     JOIN users u ON u.id = g.user_id
                     WHERE g.user_id = ?
                     ORDER BY g.created_at DESC",
                )
                .bind(&owner.id)
                .fetch_all(self.db.pool())
                .await?
            }
        };
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Goals not yet completed, for the dashboard's active list.
    pub async fn active_goals(&self, owner: &AuthUser) -> Result<Vec<Goal>, AppError> {
        self.list_goals(owner, Some("false")).await
    }

    pub async fn get_goal(&self, owner: &AuthUser, id: i64) -> Result<Goal, AppError> {
        let row = self.fetch_row(owner, id).await?;
        Ok(row.into())
    }

    /// Update a goal. Only description, current_value, and is_completed are
    /// mutable after creation.
    pub async fn update_goal(
        &self,
        owner: &AuthUser,
        id: i64,
        request: UpdateGoalRequest,
    ) -> Result<Goal, AppError> {
        let row = self.fetch_row(owner, id).await?;

        let description = request.description.unwrap_or(row.description);
        let current_value = request.current_value.unwrap_or(row.current_value);
        let is_completed = request.is_completed.unwrap_or(row.is_completed);
        let now = Utc::now();

        sqlx::query(
            "UPDATE goals
             SET description = ?, current_value = ?, is_completed = ?, updated_at = ?
             WHERE id = ? AND user_id = ?",
        )
        .bind(&description)
        .bind(current_value)
        .bind(is_completed)
        .bind(now)
        .bind(id)
        .bind(&owner.id)
        .execute(self.db.pool())
        .await?;

        info!("Updated goal {} for user {}", id, owner.id);
        self.get_goal(owner, id).await
    }

    async fn fetch_row(&self, owner: &AuthUser, id: i64) -> Result<GoalRow, AppError> {
        sqlx::query_as::<_, GoalRow>(
            "SELECT g.*, u.username AS user_username FROM goals g
             JOIN users u ON u.id = g.user_id
             WHERE g.id = ? AND g.user_id = ?",
        )
        .bind(id)
        .bind(&owner.id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::NotFound("Not found.".to_string()))
    }
}
