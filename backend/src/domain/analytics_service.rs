//! Time-windowed analytics across the four record categories.
//!
//! The window is `[now - days, now]`, lower bound inclusive; goal counts
//! ignore the window entirely. Averages come straight from SQL `AVG`, so an
//! empty window yields null rather than zero.

use chrono::{Duration, Utc};
use shared::{AcademicStats, AnalyticsSummary, GoalsStats, LifestyleStats, VitalsStats};

use crate::auth::AuthUser;
use crate::db::DbConnection;
use crate::error::AppError;

const DEFAULT_PERIOD_DAYS: i64 = 30;

#[derive(Debug, sqlx::FromRow)]
struct VitalsRow {
    count: i64,
    avg_heart_rate: Option<f64>,
    avg_spo2: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
struct LifestyleRow {
    count: i64,
    avg_sleep: Option<f64>,
    avg_stress: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
struct AcademicRow {
    count: i64,
    avg_study_hours: Option<f64>,
    avg_attendance: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
struct GoalsRow {
    total: i64,
    active: i64,
    completed: i64,
}

#[derive(Clone)]
pub struct AnalyticsService {
    db: DbConnection,
}

impl AnalyticsService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Aggregate the user's records over the last `days` days (default 30).
    /// `days` arrives as the raw query value so a non-numeric input can be
    /// rejected as a validation failure.
    pub async fn summarize(
        &self,
        owner: &AuthUser,
        days_raw: Option<&str>,
    ) -> Result<AnalyticsSummary, AppError> {
        let days: i64 = match days_raw {
            None => DEFAULT_PERIOD_DAYS,
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::validation("days", "A valid integer is required."))?,
        };
        let window = Duration::try_days(days)
            .ok_or_else(|| AppError::validation("days", "A valid integer is required."))?;
        let start = Utc::now() - window;

        let vitals = sqlx::query_as::<_, VitalsRow>(
            "SELECT COUNT(*) AS count,
                    AVG(heart_rate) AS avg_heart_rate,
                    AVG(oxygen_saturation) AS avg_spo2
             FROM vital_records WHERE user_id = ? AND timestamp >= ?",
        )
        .bind(&owner.id)
        .bind(start)
        .fetch_one(self.db.pool())
        .await?;

        let lifestyle = sqlx::query_as::<_, LifestyleRow>(
            "SELECT COUNT(*) AS count,
                    AVG(sleep_hours) AS avg_sleep,
                    AVG(stress_level) AS avg_stress
             FROM lifestyle_records WHERE user_id = ? AND timestamp >= ?",
        )
        .bind(&owner.id)
        .bind(start)
        .fetch_one(self.db.pool())
        .await?;

        let academic = sqlx::query_as::<_, AcademicRow>(
            "SELECT COUNT(*) AS count,
                    AVG(study_hours) AS avg_study_hours,
                    AVG(attendance_percentage) AS avg_attendance
             FROM academic_metrics WHERE user_id = ? AND timestamp >= ?",
        )
        .bind(&owner.id)
        .bind(start)
        .fetch_one(self.db.pool())
        .await?;

        let goals = sqlx::query_as::<_, GoalsRow>(
            "SELECT COUNT(*) AS total,
                    COALESCE(SUM(CASE WHEN is_completed = 0 THEN 1 ELSE 0 END), 0) AS active,
                    COALESCE(SUM(CASE WHEN is_completed != 0 THEN 1 ELSE 0 END), 0) AS completed
             FROM goals WHERE user_id = ?",
        )
        .bind(&owner.id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(AnalyticsSummary {
            period_days: days,
            vitals: VitalsStats {
                count: vitals.count,
                avg_heart_rate: vitals.avg_heart_rate,
                avg_spo2: vitals.avg_spo2,
            },
            lifestyle: LifestyleStats {
                count: lifestyle.count,
                avg_sleep: lifestyle.avg_sleep,
                avg_stress: lifestyle.avg_stress,
            },
            academic: AcademicStats {
                count: academic.count,
                avg_study_hours: academic.avg_study_hours,
                avg_attendance: academic.avg_attendance,
            },
            goals: GoalsStats {
                total: goals.total,
                active: goals.active,
                completed: goals.completed,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::goal_service::GoalService;
    use crate::domain::records_service::RecordsService;
    use crate::test_support::{create_user, test_db};
    use chrono::{DateTime, NaiveDate};
    use shared::{CreateGoalRequest, CreateVitalRequest, UpdateGoalRequest};

    async fn insert_vital_at(db: &DbConnection, user_id: &str, at: DateTime<Utc>, heart_rate: i64) {
        sqlx::query(
            "INSERT INTO vital_records
             (user_id, heart_rate, blood_pressure_systolic, blood_pressure_diastolic, temperature, oxygen_saturation, timestamp)
             VALUES (?, ?, 120, 80, 98.6, 98, ?)",
        )
        .bind(user_id)
        .bind(heart_rate)
        .bind(at)
        .execute(db.pool())
        .await
        .expect("Failed to insert vital record");
    }

    #[tokio::test]
    async fn test_empty_window_yields_null_averages_and_zero_counts() {
        let db = test_db().await;
        let user = create_user(&db, "casey").await;
        let service = AnalyticsService::new(db);

        let summary = service.summarize(&user, None).await.unwrap();

        assert_eq!(summary.period_days, 30);
        assert_eq!(summary.vitals.count, 0);
        assert!(summary.vitals.avg_heart_rate.is_none());
        assert!(summary.vitals.avg_spo2.is_none());
        assert_eq!(summary.lifestyle.count, 0);
        assert!(summary.lifestyle.avg_sleep.is_none());
        assert_eq!(summary.academic.count, 0);
        assert!(summary.academic.avg_study_hours.is_none());
        assert_eq!(summary.goals.total, 0);
    }

    #[tokio::test]
    async fn test_window_excludes_older_records() {
        let db = test_db().await;
        let user = create_user(&db, "casey").await;

        let now = Utc::now();
        insert_vital_at(&db, &user.id, now - Duration::days(40), 100).await;
        insert_vital_at(&db, &user.id, now - Duration::days(5), 60).await;
        insert_vital_at(&db, &user.id, now - Duration::days(1), 80).await;

        let service = AnalyticsService::new(db);
        let summary = service.summarize(&user, Some("30")).await.unwrap();

        assert_eq!(summary.period_days, 30);
        assert_eq!(summary.vitals.count, 2);
        assert_eq!(summary.vitals.avg_heart_rate, Some(70.0));
    }

    #[tokio::test]
    async fn test_non_numeric_days_is_rejected() {
        let db = test_db().await;
        let user = create_user(&db, "casey").await;
        let service = AnalyticsService::new(db);

        match service.summarize(&user, Some("soon")).await {
            Err(AppError::Validation(fields)) => assert!(fields.contains_key("days")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_goal_counts_are_unwindowed() {
        let db = test_db().await;
        let user = create_user(&db, "casey").await;
        let goal_service = GoalService::new(db.clone());

        let done = goal_service
            .create_goal(
                &user,
                CreateGoalRequest {
                    title: "Done".to_string(),
                    description: None,
                    target_value: 10.0,
                    current_value: None,
                    unit: "hours".to_string(),
                    deadline: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
                },
            )
            .await
            .unwrap();
        goal_service
            .update_goal(
                &user,
                done.id,
                UpdateGoalRequest {
                    is_completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        goal_service
            .create_goal(
                &user,
                CreateGoalRequest {
                    title: "Open".to_string(),
                    description: None,
                    target_value: 10.0,
                    current_value: None,
                    unit: "hours".to_string(),
                    deadline: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
                },
            )
            .await
            .unwrap();

        let service = AnalyticsService::new(db);
        // A zero-day window still counts every goal
        let summary = service.summarize(&user, Some("0")).await.unwrap();
        assert_eq!(summary.goals.total, 2);
        assert_eq!(summary.goals.active, 1);
        assert_eq!(summary.goals.completed, 1);
    }

    #[tokio::test]
    async fn test_summary_is_ownership_scoped() {
        let db = test_db().await;
        let casey = create_user(&db, "casey").await;
        let riley = create_user(&db, "riley").await;

        let records = RecordsService::new(db.clone());
        records
            .create_vital(
                &casey,
                CreateVitalRequest {
                    heart_rate: 72,
                    blood_pressure_systolic: 120,
                    blood_pressure_diastolic: 80,
                    temperature: 98.6,
                    oxygen_saturation: 98,
                },
            )
            .await
            .unwrap();

        let service = AnalyticsService::new(db);
        let rileys = service.summarize(&riley, None).await.unwrap();
        assert_eq!(rileys.vitals.count, 0);
        assert!(rileys.vitals.avg_heart_rate.is_none());
    }
}
