//! Account management: signup, login, and profile reads/updates.

use chrono::{DateTime, Utc};
use shared::{LoginRequest, SignupRequest, ThemePreference, UpdateProfileRequest, UserProfile};
use tracing::info;

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::db::DbConnection;
use crate::error::{AppError, FieldValidator};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    avatar_url: Option<String>,
    theme_preference: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_profile(self) -> Result<UserProfile, AppError> {
        let theme = ThemePreference::from_string(&self.theme_preference)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        Ok(UserProfile {
            id: self.id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            avatar_url: self.avatar_url,
            theme_preference: theme,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct UserService {
    db: DbConnection,
}

impl UserService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Register a new account. Violations are reported per field and nothing
    /// persists on failure.
    pub async fn signup(&self, request: SignupRequest) -> Result<UserProfile, AppError> {
        info!("Signing up user: {}", request.username);

        let mut v = FieldValidator::new();
        if request.username.trim().is_empty() {
            v.push("username", "This field may not be blank.");
        }
        if request.email.trim().is_empty() || !request.email.contains('@') {
            v.push("email", "Enter a valid email address.");
        }
        if request.password.len() < 8 {
            v.push("password", "Ensure this field has at least 8 characters.");
        }
        if request.password != request.password_confirm {
            v.push("password", "Passwords do not match.");
        }
        v.finish()?;

        if self.username_taken(&request.username).await? {
            return Err(AppError::validation(
                "username",
                "A user with that username already exists.",
            ));
        }
        if self.email_taken(&request.email).await? {
            return Err(AppError::validation(
                "email",
                "A user with that email already exists.",
            ));
        }

        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();
        let password_hash = hash_password(&request.password)?;

        sqlx::query(
            "INSERT INTO users
             (id, username, email, password_hash, first_name, last_name, theme_preference, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.username)
        .bind(&request.email)
        .bind(&password_hash)
        .bind(request.first_name.unwrap_or_default())
        .bind(request.last_name.unwrap_or_default())
        .bind(ThemePreference::default().as_str())
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        info!("Created user {}", id);
        self.get_profile(&id).await
    }

    /// Authenticate by username or email.
    pub async fn login(&self, request: LoginRequest) -> Result<UserProfile, AppError> {
        let identifier = request
            .username
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(request.email.as_deref().filter(|s| !s.is_empty()))
            .ok_or_else(|| {
                AppError::validation("username", "Please provide username/email and password")
            })?;

        info!("Login attempt for {}", identifier);

        let row = match self.find_by_username(identifier).await? {
            Some(row) => Some(row),
            None => self.find_by_email(identifier).await?,
        };

        match row {
            Some(row) if verify_password(&request.password, &row.password_hash) => {
                row.into_profile()
            }
            _ => Err(AppError::Authentication("Invalid credentials".to_string())),
        }
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfile, AppError> {
        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?
            .into_profile()
    }

    /// Apply a partial profile update; only these four fields are mutable.
    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile, AppError> {
        let row = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let first_name = request.first_name.unwrap_or(row.first_name);
        let last_name = request.last_name.unwrap_or(row.last_name);
        let avatar_url = request.avatar_url.or(row.avatar_url);
        let theme = match request.theme_preference {
            Some(theme) => theme,
            None => ThemePreference::from_string(&row.theme_preference)
                .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?,
        };

        sqlx::query(
            "UPDATE users
             SET first_name = ?, last_name = ?, avatar_url = ?, theme_preference = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&first_name)
        .bind(&last_name)
        .bind(&avatar_url)
        .bind(theme.as_str())
        .bind(Utc::now())
        .bind(user_id)
        .execute(self.db.pool())
        .await?;

        self.get_profile(user_id).await
    }

    /// Resolve a verified token subject into a principal, if the account
    /// still exists.
    pub async fn find_principal(&self, user_id: &str) -> Result<Option<AuthUser>, AppError> {
        Ok(self.find_by_id(user_id).await?.map(|row| AuthUser {
            id: row.id,
            username: row.username,
        }))
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRow>, AppError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRow>, AppError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, AppError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    async fn username_taken(&self, username: &str) -> Result<bool, AppError> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    async fn email_taken(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.find_by_email(email).await?.is_some())
    }
}
