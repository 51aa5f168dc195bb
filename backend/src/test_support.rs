//! Helpers shared by the service test modules.

use shared::SignupRequest;

use crate::auth::AuthUser;
use crate::db::DbConnection;
use crate::domain::UserService;

pub async fn test_db() -> DbConnection {
    DbConnection::init_test()
        .await
        .expect("Failed to create test database")
}

/// Create a user through the normal signup path and return it as a
/// principal.
pub async fn create_user(db: &DbConnection, username: &str) -> AuthUser {
    let service = UserService::new(db.clone());
    let profile = service
        .signup(SignupRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "long-enough-password".to_string(),
            password_confirm: "long-enough-password".to_string(),
            first_name: None,
            last_name: None,
        })
        .await
        .expect("Failed to create test user");
    AuthUser {
        id: profile.id,
        username: profile.username,
    }
}
