use std::env;
use std::net::SocketAddr;

const DEFAULT_DATABASE_URL: &str = "sqlite:wellness.db";
const DEFAULT_JWT_SECRET: &str = "dev-only-secret-change-me";

/// Runtime configuration, read once at startup. Every value has a
/// development default so the server runs with no environment set up.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));
        let jwt_secret =
            env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());

        Self {
            database_url,
            bind_addr,
            jwt_secret,
        }
    }
}
