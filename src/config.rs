use std::{fmt, path::PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Limits applied by the auth service.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPolicy {
    pub min_password_len: usize,
    pub reset_token_ttl_minutes: i64,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            min_password_len: 8,
            reset_token_ttl_minutes: 60,
        }
    }
}

/// First administrator, created on startup when configured.
#[derive(Clone, Deserialize)]
pub struct AdminSeed {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AdminSeed {
    /// Needs both `ANIMEVERSE_ADMIN_EMAIL` and `ANIMEVERSE_ADMIN_PASSWORD`.
    fn from_env() -> Option<Self> {
        let email = non_empty_var("ANIMEVERSE_ADMIN_EMAIL")?;
        let password = non_empty_var("ANIMEVERSE_ADMIN_PASSWORD")?;
        let username =
            non_empty_var("ANIMEVERSE_ADMIN_USERNAME").unwrap_or_else(|| "admin".into());
        Some(Self {
            email,
            username,
            password,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub policy: AuthPolicy,
    pub admin: Option<AdminSeed>,
    /// Backing file for local storage; in-memory when unset.
    pub storage_path: Option<PathBuf>,
    /// Artificial delay applied to every service call.
    pub latency_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "animeverse".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "animeverse-users".into()),
            ttl_minutes: env_parse("SESSION_TTL_MINUTES").unwrap_or(60 * 24 * 7),
        };
        let defaults = AuthPolicy::default();
        let policy = AuthPolicy {
            min_password_len: env_parse("AUTH_MIN_PASSWORD_LEN")
                .unwrap_or(defaults.min_password_len),
            reset_token_ttl_minutes: env_parse("RESET_TOKEN_TTL_MINUTES")
                .unwrap_or(defaults.reset_token_ttl_minutes),
        };
        let storage_path = non_empty_var("ANIMEVERSE_STORAGE_PATH").map(PathBuf::from);
        let latency_ms = env_parse("ANIMEVERSE_LATENCY_MS").unwrap_or(0);

        Ok(Self {
            jwt,
            policy,
            admin: AdminSeed::from_env(),
            storage_path,
            latency_ms,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
