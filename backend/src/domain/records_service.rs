//! Measurement records: vitals, lifestyle, and academic metrics.
//!
//! All three resources share the same shape of access: owner-scoped lists
//! with optional inclusive date bounds, owner-scoped detail fetches, and
//! validated, server-stamped creation. The date-window filtering lives in
//! one place rather than being repeated per entity.

use chrono::{DateTime, NaiveDate, Utc};
use shared::{
    AcademicMetric, CreateAcademicRequest, CreateLifestyleRequest, CreateVitalRequest,
    LifestyleRecord, VitalRecord,
};
use tracing::info;

use crate::auth::AuthUser;
use crate::db::DbConnection;
use crate::error::{AppError, FieldValidator};

const DEFAULT_WATER_INTAKE: i64 = 8;

/// Inclusive time range over a record's timestamp; either bound may be
/// absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateWindow {
    /// Parse the `start_date`/`end_date` query values. Accepts RFC 3339
    /// datetimes or plain dates; a date-only start means midnight and a
    /// date-only end covers the whole day, keeping both bounds inclusive.
    pub fn parse(start_date: Option<&str>, end_date: Option<&str>) -> Result<Self, AppError> {
        let mut v = FieldValidator::new();

        let start = match start_date {
            None => None,
            Some(raw) => match parse_bound(raw, false) {
                Ok(dt) => Some(dt),
                Err(()) => {
                    v.push("start_date", format!("Invalid date: {}.", raw));
                    None
                }
            },
        };
        let end = match end_date {
            None => None,
            Some(raw) => match parse_bound(raw, true) {
                Ok(dt) => Some(dt),
                Err(()) => {
                    v.push("end_date", format!("Invalid date: {}.", raw));
                    None
                }
            },
        };
        v.finish()?;

        Ok(Self { start, end })
    }
}

fn parse_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ()> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ())?;
    let (h, m, s) = if end_of_day { (23, 59, 59) } else { (0, 0, 0) };
    let time = date.and_hms_opt(h, m, s).ok_or(())?;
    Ok(time.and_utc())
}

/// Owner-scoped list query over any of the measurement tables, most recent
/// first. The table name is a compile-time constant, never user input.
fn windowed_list_sql(table: &str, window: &DateWindow) -> String {
    let mut sql = format!(
        "SELECT r.*, u.username AS user_username FROM {} r \
         JOIN users u ON u.id = r.user_id WHERE r.user_id = ?",
        table
    );
    if window.start.is_some() {
        sql.push_str(" AND r.timestamp >= ?");
    }
    if window.end.is_some() {
        sql.push_str(" AND r.timestamp <= ?");
    }
    sql.push_str(" ORDER BY r.timestamp DESC");
    sql
}

#[derive(Debug, sqlx::FromRow)]
struct VitalRow {
    id: i64,
    user_id: String,
    user_username: String,
    heart_rate: i64,
    blood_pressure_systolic: i64,
    blood_pressure_diastolic: i64,
    temperature: f64,
    oxygen_saturation: i64,
    timestamp: DateTime<Utc>,
}

impl From<VitalRow> for VitalRecord {
    fn from(row: VitalRow) -> Self {
        VitalRecord {
            id: row.id,
            user: row.user_id,
            user_username: row.user_username,
            heart_rate: row.heart_rate,
            blood_pressure_systolic: row.blood_pressure_systolic,
            blood_pressure_diastolic: row.blood_pressure_diastolic,
            temperature: row.temperature,
            oxygen_saturation: row.oxygen_saturation,
            timestamp: row.timestamp,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LifestyleRow {
    id: i64,
    user_id: String,
    user_username: String,
    sleep_hours: f64,
    stress_level: i64,
    diet_quality_score: i64,
    water_intake: i64,
    physical_activity_minutes: i64,
    timestamp: DateTime<Utc>,
}

impl From<LifestyleRow> for LifestyleRecord {
    fn from(row: LifestyleRow) -> Self {
        LifestyleRecord {
            id: row.id,
            user: row.user_id,
            user_username: row.user_username,
            sleep_hours: row.sleep_hours,
            stress_level: row.stress_level,
            diet_quality_score: row.diet_quality_score,
            water_intake: row.water_intake,
            physical_activity_minutes: row.physical_activity_minutes,
            timestamp: row.timestamp,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AcademicRow {
    id: i64,
    user_id: String,
    user_username: String,
    study_hours: f64,
    attendance_percentage: f64,
    focus_level: i64,
    assignment_completion_rate: f64,
    timestamp: DateTime<Utc>,
}

impl From<AcademicRow> for AcademicMetric {
    fn from(row: AcademicRow) -> Self {
        AcademicMetric {
            id: row.id,
            user: row.user_id,
            user_username: row.user_username,
            study_hours: row.study_hours,
            attendance_percentage: row.attendance_percentage,
            focus_level: row.focus_level,
            assignment_completion_rate: row.assignment_completion_rate,
            timestamp: row.timestamp,
        }
    }
}

#[derive(Clone)]
pub struct RecordsService {
    db: DbConnection,
}

impl RecordsService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    async fn list_windowed<R>(
        &self,
        table: &str,
        owner_id: &str,
        window: &DateWindow,
    ) -> Result<Vec<R>, AppError>
    where
        R: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
    {
        let sql = windowed_list_sql(table, window);
        let mut query = sqlx::query_as::<_, R>(&sql).bind(owner_id);
        if let Some(start) = window.start {
            query = query.bind(start);
        }
        if let Some(end) = window.end {
            query = query.bind(end);
        }
        Ok(query.fetch_all(self.db.pool()).await?)
    }

    // --- Vitals ---

    pub async fn create_vital(
        &self,
        owner: &AuthUser,
        request: CreateVitalRequest,
    ) -> Result<VitalRecord, AppError> {
        let mut v = FieldValidator::new();
        v.range_int("heart_rate", request.heart_rate, 40, 200);
        v.range_int("blood_pressure_systolic", request.blood_pressure_systolic, 70, 200);
        v.range_int("blood_pressure_diastolic", request.blood_pressure_diastolic, 40, 130);
        v.range_float("temperature", request.temperature, 95.0, 105.0);
        v.range_int("oxygen_saturation", request.oxygen_saturation, 80, 100);
        v.finish()?;

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO vital_records
             (user_id, heart_rate, blood_pressure_systolic, blood_pressure_diastolic, temperature, oxygen_saturation, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&owner.id)
        .bind(request.heart_rate)
        .bind(request.blood_pressure_systolic)
        .bind(request.blood_pressure_diastolic)
        .bind(request.temperature)
        .bind(request.oxygen_saturation)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        info!("Recorded vitals for user {}", owner.id);

        Ok(VitalRecord {
            id: result.last_insert_rowid(),
            user: owner.id.clone(),
            user_username: owner.username.clone(),
            heart_rate: request.heart_rate,
            blood_pressure_systolic: request.blood_pressure_systolic,
            blood_pressure_diastolic: request.blood_pressure_diastolic,
            temperature: request.temperature,
            oxygen_saturation: request.oxygen_saturation,
            timestamp: now,
        })
    }

    pub async fn list_vitals(
        &self,
        owner: &AuthUser,
        window: &DateWindow,
    ) -> Result<Vec<VitalRecord>, AppError> {
        let rows: Vec<VitalRow> = self
            .list_windowed("vital_records", &owner.id, window)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_vital(&self, owner: &AuthUser, id: i64) -> Result<VitalRecord, AppError> {
        let row = sqlx::query_as::<_, VitalRow>(
            "SELECT r.*, u.username AS user_username FROM vital_records r
             JOIN users u ON u.id = r.user_id WHERE r.id = ? AND r.user_id = ?",
        )
        .bind(id)
        .bind(&owner.id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::NotFound("Not found.".to_string()))?;
        Ok(row.into())
    }

    /// Most recent vital record, or a not-found result with an explanatory
    /// message when the user has none.
    pub async fn latest_vital(&self, owner: &AuthUser) -> Result<VitalRecord, AppError> {
        let row = sqlx::query_as::<_, VitalRow>(
            "SELECT r.*, u.username AS user_username FROM vital_records r
             JOIN users u ON u.id = r.user_id WHERE r.user_id = ?
             ORDER BY r.timestamp DESC LIMIT 1",
        )
        .bind(&owner.id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::NotFound("No vital records found".to_string()))?;
        Ok(row.into())
    }

    // --- Lifestyle ---

    pub async fn create_lifestyle(
        &self,
        owner: &AuthUser,
        request: CreateLifestyleRequest,
    ) -> Result<LifestyleRecord, AppError> {
        let water_intake = request.water_intake.unwrap_or(DEFAULT_WATER_INTAKE);
        let physical_activity_minutes = request.physical_activity_minutes.unwrap_or(0);

        let mut v = FieldValidator::new();
        v.range_float("sleep_hours", request.sleep_hours, 0.0, 24.0);
        v.range_int("stress_level", request.stress_level, 1, 10);
        v.range_int("diet_quality_score", request.diet_quality_score, 1, 10);
        v.range_int("water_intake", water_intake, 0, 30);
        v.range_int("physical_activity_minutes", physical_activity_minutes, 0, 1440);
        v.finish()?;

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO lifestyle_records
             (user_id, sleep_hours, stress_level, diet_quality_score, water_intake, physical_activity_minutes, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&owner.id)
        .bind(request.sleep_hours)
        .bind(request.stress_level)
        .bind(request.diet_quality_score)
        .bind(water_intake)
        .bind(physical_activity_minutes)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        info!("Recorded lifestyle entry for user {}", owner.id);

        Ok(LifestyleRecord {
            id: result.last_insert_rowid(),
            user: owner.id.clone(),
            user_username: owner.username.clone(),
            sleep_hours: request.sleep_hours,
            stress_level: request.stress_level,
            diet_quality_score: request.diet_quality_score,
            water_intake,
            physical_activity_minutes,
            timestamp: now,
        })
    }

    pub async fn list_lifestyle(
        &self,
        owner: &AuthUser,
        window: &DateWindow,
    ) -> Result<Vec<LifestyleRecord>, AppError> {
        let rows: Vec<LifestyleRow> = self
            .list_windowed("lifestyle_records", &owner.id, window)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_lifestyle(
        &self,
        owner: &AuthUser,
        id: i64,
    ) -> Result<LifestyleRecord, AppError> {
        let row = sqlx::query_as::<_, LifestyleRow>(
            "SELECT r.*, u.username AS user_username FROM lifestyle_records r
             JOIN users u ON u.id = r.user_id WHERE r.id = ? AND r.user_id = ?",
        )
        .bind(id)
        .bind(&owner.id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::NotFound("Not found.".to_string()))?;
        Ok(row.into())
    }

    // --- Academic ---

    pub async fn create_academic(
        &self,
        owner: &AuthUser,
        request: CreateAcademicRequest,
    ) -> Result<AcademicMetric, AppError> {
        let mut v = FieldValidator::new();
        v.range_float("study_hours", request.study_hours, 0.0, 24.0);
        v.range_float("attendance_percentage", request.attendance_percentage, 0.0, 100.0);
        v.range_int("focus_level", request.focus_level, 1, 10);
        v.range_float(
            "assignment_completion_rate",
            request.assignment_completion_rate,
            0.0,
            100.0,
        );
        v.finish()?;

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO academic_metrics
             (user_id, study_hours, attendance_percentage, focus_level, assignment_completion_rate, timestamp)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&owner.id)
        .bind(request.study_hours)
        .bind(request.attendance_percentage)
        .bind(request.focus_level)
        .bind(request.assignment_completion_rate)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        info!("Recorded academic metric for user {}", owner.id);

        Ok(AcademicMetric {
            id: result.last_insert_rowid(),
            user: owner.id.clone(),
            user_username: owner.username.clone(),
            study_hours: request.study_hours,
            attendance_percentage: request.attendance_percentage,
            focus_level: request.focus_level,
            assignment_completion_rate: request.assignment_completion_rate,
            timestamp: now,
        })
    }

    pub async fn list_academic(
        &self,
        owner: &AuthUser,
        window: &DateWindow,
    ) -> Result<Vec<AcademicMetric>, AppError> {
        let rows: Vec<AcademicRow> = self
            .list_windowed("academic_metrics", &owner.id, window)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_academic(
        &self,
        owner: &AuthUser,
        id: i64,
    ) -> Result<AcademicMetric, AppError> {
        let row = sqlx::query_as::<_, AcademicRow>(
            "SELECT r.*, u.username AS user_username FROM academic_metrics r
             JOIN users u ON u.id = r.user_id WHERE r.id = ? AND r.user_id = ?",
        )
        .bind(id)
        .bind(&owner.id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::NotFound("Not found.".to_string()))?;
        Ok(row.into())
    }
}
