use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Colour theme a user has picked for their dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Ocean,
    Dark,
    Sunset,
    Forest,
}

impl Default for ThemePreference {
    fn default() -> Self {
        ThemePreference::Ocean
    }
}

impl ThemePreference {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemePreference::Ocean => "ocean",
            ThemePreference::Dark => "dark",
            ThemePreference::Sunset => "sunset",
            ThemePreference::Forest => "forest",
        }
    }

    /// Parse from string for database loading
    pub fn from_string(s: &str) -> Result<Self, String> {
        match s {
            "ocean" => Ok(ThemePreference::Ocean),
            "dark" => Ok(ThemePreference::Dark),
            "sunset" => Ok(ThemePreference::Sunset),
            "forest" => Ok(ThemePreference::Forest),
            _ => Err(format!("Invalid theme preference: {}", s)),
        }
    }
}

/// A user's profile as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub theme_preference: ThemePreference,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Login accepts either a username or an email in the `username` slot;
/// clients may also send the `email` field on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub access: String,
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub theme_preference: Option<ThemePreference>,
}

/// A single vitals measurement. Append-only; the server stamps owner and
/// timestamp at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalRecord {
    pub id: i64,
    /// ID of the owning user
    pub user: String,
    pub user_username: String,
    pub heart_rate: i64,
    pub blood_pressure_systolic: i64,
    pub blood_pressure_diastolic: i64,
    pub temperature: f64,
    pub oxygen_saturation: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateVitalRequest {
    pub heart_rate: i64,
    pub blood_pressure_systolic: i64,
    pub blood_pressure_diastolic: i64,
    pub temperature: f64,
    pub oxygen_saturation: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifestyleRecord {
    pub id: i64,
    pub user: String,
    pub user_username: String,
    pub sleep_hours: f64,
    pub stress_level: i64,
    pub diet_quality_score: i64,
    pub water_intake: i64,
    pub physical_activity_minutes: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLifestyleRequest {
    pub sleep_hours: f64,
    pub stress_level: i64,
    pub diet_quality_score: i64,
    /// Glasses of water; defaults to 8 when omitted
    pub water_intake: Option<i64>,
    /// Defaults to 0 when omitted
    pub physical_activity_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicMetric {
    pub id: i64,
    pub user: String,
    pub user_username: String,
    pub study_hours: f64,
    pub attendance_percentage: f64,
    pub focus_level: i64,
    pub assignment_completion_rate: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAcademicRequest {
    pub study_hours: f64,
    pub attendance_percentage: f64,
    pub focus_level: i64,
    pub assignment_completion_rate: f64,
}

/// A goal with its derived progress. `progress_percentage` is recomputed on
/// every read and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub user: String,
    pub user_username: String,
    pub title: String,
    pub description: String,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: String,
    pub deadline: NaiveDate,
    pub is_completed: bool,
    pub progress_percentage: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// Completion percentage for a goal. Returns 0 when the target is 0 and
    /// caps at 100. A negative current value yields a negative percentage;
    /// that quirk is part of the contract and must not be "fixed" here.
    pub fn progress_percentage(target_value: f64, current_value: f64) -> f64 {
        if target_value == 0.0 {
            return 0.0;
        }
        ((current_value / target_value) * 100.0).min(100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateGoalRequest {
    pub title: String,
    pub description: Option<String>,
    pub target_value: f64,
    pub current_value: Option<f64>,
    pub unit: String,
    pub deadline: NaiveDate,
}

/// Only these three fields are updatable after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateGoalRequest {
    pub description: Option<String>,
    pub current_value: Option<f64>,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementBadge {
    pub id: i64,
    pub user: String,
    pub user_username: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(format!("Invalid export format: {}", s)),
        }
    }
}

/// Lifecycle of an export request. `Completed` and `Failed` are terminal;
/// the server never transitions a request out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Pending => "pending",
            ExportStatus::Processing => "processing",
            ExportStatus::Completed => "completed",
            ExportStatus::Failed => "failed",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        match s {
            "pending" => Ok(ExportStatus::Pending),
            "processing" => Ok(ExportStatus::Processing),
            "completed" => Ok(ExportStatus::Completed),
            "failed" => Ok(ExportStatus::Failed),
            _ => Err(format!("Invalid export status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub id: i64,
    pub user: String,
    pub user_username: String,
    pub format: ExportFormat,
    pub status: ExportStatus,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateExportRequest {
    pub format: ExportFormat,
}

/// Averages are `None` (serialized as null) when the window holds no
/// records; callers must treat every avg_* field as nullable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsStats {
    pub count: i64,
    pub avg_heart_rate: Option<f64>,
    pub avg_spo2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifestyleStats {
    pub count: i64,
    pub avg_sleep: Option<f64>,
    pub avg_stress: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicStats {
    pub count: i64,
    pub avg_study_hours: Option<f64>,
    pub avg_attendance: Option<f64>,
}

/// Goal counts are unwindowed: every goal the user owns, regardless of date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalsStats {
    pub total: i64,
    pub active: i64,
    pub completed: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub period_days: i64,
    pub vitals: VitalsStats,
    pub lifestyle: LifestyleStats,
    pub academic: AcademicStats,
    pub goals: GoalsStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_zero_for_zero_target() {
        assert_eq!(Goal::progress_percentage(0.0, 50.0), 0.0);
    }

    #[test]
    fn progress_is_proportional() {
        assert_eq!(Goal::progress_percentage(100.0, 50.0), 50.0);
    }

    #[test]
    fn progress_clamps_at_one_hundred() {
        assert_eq!(Goal::progress_percentage(100.0, 150.0), 100.0);
    }

    #[test]
    fn progress_is_not_floored_below_zero() {
        // Documented quirk: negative current values produce negative
        // percentages rather than clamping to 0.
        assert_eq!(Goal::progress_percentage(100.0, -10.0), -10.0);
    }

    #[test]
    fn theme_round_trips_through_strings() {
        for theme in [
            ThemePreference::Ocean,
            ThemePreference::Dark,
            ThemePreference::Sunset,
            ThemePreference::Forest,
        ] {
            assert_eq!(ThemePreference::from_string(theme.as_str()), Ok(theme));
        }
        assert!(ThemePreference::from_string("neon").is_err());
    }

    #[test]
    fn export_enums_reject_unknown_values() {
        assert!(ExportFormat::from_string("xml").is_err());
        assert!(ExportStatus::from_string("queued").is_err());
    }

    #[test]
    fn export_format_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ExportFormat::Csv).unwrap(),
            "\"csv\""
        );
        assert_eq!(
            serde_json::from_str::<ExportStatus>("\"completed\"").unwrap(),
            ExportStatus::Completed
        );
    }
}
