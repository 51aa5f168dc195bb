use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use shared::{
    AcademicMetric, AchievementBadge, AnalyticsSummary, AuthResponse, CreateAcademicRequest,
    CreateExportRequest, CreateGoalRequest, CreateLifestyleRequest, CreateVitalRequest,
    ExportRequest, Goal, LifestyleRecord, LoginRequest, RefreshTokenRequest,
    RefreshTokenResponse, SignupRequest, UpdateGoalRequest, UpdateProfileRequest, UserProfile,
    VitalRecord,
};
use tracing::info;

use crate::auth::{AuthUser, TokenService};
use crate::config::Config;
use crate::db::DbConnection;
use crate::domain::{
    AchievementService, AnalyticsService, DateWindow, ExportService, GoalService,
    MediaPathGenerator, RecordsService, UserService,
};
use crate::error::AppError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub tokens: TokenService,
    pub users: UserService,
    pub records: RecordsService,
    pub goals: GoalService,
    pub achievements: AchievementService,
    pub exports: ExportService,
    pub analytics: AnalyticsService,
}

impl AppState {
    pub fn new(db: DbConnection, config: &Config) -> Self {
        Self {
            tokens: TokenService::new(&config.jwt_secret),
            users: UserService::new(db.clone()),
            records: RecordsService::new(db.clone()),
            goals: GoalService::new(db.clone()),
            achievements: AchievementService::new(db.clone()),
            exports: ExportService::new(db.clone(), Arc::new(MediaPathGenerator)),
            analytics: AnalyticsService::new(db),
        }
    }
}

/// Optional inclusive date bounds for the measurement list endpoints.
#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoalListQuery {
    pub completed: Option<String>,
}

/// `days` stays a raw string so a non-numeric value fails as a validation
/// error instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/token/refresh", post(refresh_token))
        .route("/auth/profile", get(profile))
        .route("/auth/profile/update", put(update_profile).patch(update_profile))
        .route("/vitals", get(list_vitals).post(create_vital))
        .route("/vitals/latest", get(latest_vital))
        .route("/vitals/:id", get(get_vital))
        .route("/lifestyle", get(list_lifestyle).post(create_lifestyle))
        .route("/lifestyle/:id", get(get_lifestyle))
        .route("/academic", get(list_academic).post(create_academic))
        .route("/academic/:id", get(get_academic))
        .route("/goals", get(list_goals).post(create_goal))
        .route("/goals/active", get(active_goals))
        .route("/goals/:id", get(get_goal).put(update_goal).patch(update_goal))
        .route("/achievements", get(list_achievements))
        .route("/achievements/:id", get(get_achievement))
        .route("/exports", get(list_exports).post(create_export))
        .route("/exports/:id", get(get_export))
        .route("/analytics/summary", get(analytics_summary))
        .route("/ping", get(ping))
        .with_state(state)
}

// --- Auth ---

pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!("POST /auth/signup - username: {}", request.username);
    let user = state.users.signup(request).await?;
    let tokens = state.tokens.issue_pair(&user.id)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { user, tokens })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state.users.login(request).await?;
    let tokens = state.tokens.issue_pair(&user.id)?;
    Ok(Json(AuthResponse { user, tokens }))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<RefreshTokenResponse>, AppError> {
    let access = state.tokens.refresh_access(&request.refresh)?;
    Ok(Json(RefreshTokenResponse { access }))
}

pub async fn profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.users.get_profile(&auth.id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    info!("Profile update for user {}", auth.id);
    Ok(Json(state.users.update_profile(&auth.id, request).await?))
}

// --- Vitals ---

pub async fn list_vitals(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<VitalRecord>>, AppError> {
    let window = DateWindow::parse(query.start_date.as_deref(), query.end_date.as_deref())?;
    Ok(Json(state.records.list_vitals(&auth, &window).await?))
}

pub async fn create_vital(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateVitalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.records.create_vital(&auth, request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_vital(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<VitalRecord>, AppError> {
    Ok(Json(state.records.get_vital(&auth, id).await?))
}

pub async fn latest_vital(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<VitalRecord>, AppError> {
    Ok(Json(state.records.latest_vital(&auth).await?))
}

// --- Lifestyle ---

pub async fn list_lifestyle(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<LifestyleRecord>>, AppError> {
    let window = DateWindow::parse(query.start_date.as_deref(), query.end_date.as_deref())?;
    Ok(Json(state.records.list_lifestyle(&auth, &window).await?))
}

pub async fn create_lifestyle(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateLifestyleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.records.create_lifestyle(&auth, request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_lifestyle(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<LifestyleRecord>, AppError> {
    Ok(Json(state.records.get_lifestyle(&auth, id).await?))
}

// --- Academic ---

pub async fn list_academic(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<AcademicMetric>>, AppError> {
    let window = DateWindow::parse(query.start_date.as_deref(), query.end_date.as_deref())?;
    Ok(Json(state.records.list_academic(&auth, &window).await?))
}

pub async fn create_academic(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateAcademicRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.records.create_academic(&auth, request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_academic(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<AcademicMetric>, AppError> {
    Ok(Json(state.records.get_academic(&auth, id).await?))
}

// --- Goals ---

pub async fn list_goals(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<GoalListQuery>,
) -> Result<Json<Vec<Goal>>, AppError> {
    Ok(Json(
        state
            .goals
            .list_goals(&auth, query.completed.as_deref())
            .await?,
    ))
}

pub async fn create_goal(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateGoalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let goal = state.goals.create_goal(&auth, request).await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

pub async fn active_goals(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Goal>>, AppError> {
    Ok(Json(state.goals.active_goals(&auth).await?))
}

pub async fn get_goal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Goal>, AppError> {
    Ok(Json(state.goals.get_goal(&auth, id).await?))
}

pub async fn update_goal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateGoalRequest>,
) -> Result<Json<Goal>, AppError> {
    Ok(Json(state.goals.update_goal(&auth, id, request).await?))
}

// --- Achievements ---

pub async fn list_achievements(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<AchievementBadge>>, AppError> {
    Ok(Json(state.achievements.list_badges(&auth).await?))
}

pub async fn get_achievement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<AchievementBadge>, AppError> {
    Ok(Json(state.achievements.get_badge(&auth, id).await?))
}

// --- Exports ---

pub async fn list_exports(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ExportRequest>>, AppError> {
    Ok(Json(state.exports.list(&auth).await?))
}

pub async fn create_export(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateExportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let export = state.exports.create(&auth, request.format).await?;
    Ok((StatusCode::CREATED, Json(export)))
}

pub async fn get_export(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ExportRequest>, AppError> {
    Ok(Json(state.exports.get(&auth, id).await?))
}

// --- Analytics ---

pub async fn analytics_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<AnalyticsSummary>, AppError> {
    Ok(Json(
        state
            .analytics
            .summarize(&auth, query.days.as_deref())
            .await?,
    ))
}

// --- Liveness ---

pub async fn ping() -> impl IntoResponse {
    Json(json!({ "status": "ok", "server": "running" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let db = test_db().await;
        let config = Config {
            database_url: String::new(),
            bind_addr: ([127, 0, 0, 1], 0).into(),
            jwt_secret: "test-secret".to_string(),
        };
        router(AppState::new(db, &config))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        serde_json::from_slice(&bytes).expect("Body was not JSON")
    }

    #[tokio::test]
    async fn test_ping_returns_static_status() {
        let app = test_router().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, json!({ "status": "ok", "server": "running" }));
    }

    #[tokio::test]
    async fn test_owned_resources_require_authentication() {
        for path in ["/vitals", "/goals", "/achievements", "/exports", "/analytics/summary"] {
            let app = test_router().await;
            let response = app
                .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(
                response.status(),
                StatusCode::UNAUTHORIZED,
                "{} should reject anonymous requests",
                path
            );
        }
    }

    #[tokio::test]
    async fn test_signup_then_authenticated_profile_fetch() {
        let app = test_router().await;

        let signup_body = json!({
            "username": "casey",
            "email": "casey@example.com",
            "password": "long-enough-password",
            "password_confirm": "long-enough-password",
            "first_name": "Casey",
            "last_name": null
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/auth/signup")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(signup_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        let access = body["tokens"]["access"].as_str().unwrap().to_string();
        assert_eq!(body["user"]["username"], "casey");
        assert_eq!(body["user"]["theme_preference"], "ocean");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/profile")
                    .header(header::AUTHORIZATION, format!("Bearer {}", access))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let profile = body_json(response).await;
        assert_eq!(profile["email"], "casey@example.com");
    }

    #[tokio::test]
    async fn test_login_with_bad_credentials_is_401() {
        let app = test_router().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "username": "ghost", "password": "whatever-this-is" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid credentials");
    }
}
