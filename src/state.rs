use std::sync::Arc;

use tracing::info;

use crate::admin::bans::BanLedger;
use crate::admin::roles::Role;
use crate::auth::mailer::{LogMailer, Mailer};
use crate::auth::password::hash_password;
use crate::auth::repo::CredentialStore;
use crate::auth::repo_types::UserRecord;
use crate::auth::services::is_valid_email;
use crate::config::{AppConfig, AuthPolicy, JwtConfig};
use crate::error::{AuthError, AuthResult};
use crate::moderation::repo::ReportStore;
use crate::storage::{FileStorage, LocalStorage, MemoryStorage};

/// Everything the services share. Cloning is cheap and shares the stores;
/// build a fresh state to get isolated ones.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: CredentialStore,
    pub bans: BanLedger,
    pub reports: ReportStore,
    pub storage: Arc<dyn LocalStorage>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let storage = match &config.storage_path {
            Some(path) => {
                info!(path = %path.display(), "using file-backed local storage");
                Arc::new(FileStorage::new(path)) as Arc<dyn LocalStorage>
            }
            None => Arc::new(MemoryStorage::default()) as Arc<dyn LocalStorage>,
        };

        let state = Self::from_parts(config, storage, Arc::new(LogMailer));
        state.apply_admin_seed().await?;
        Ok(state)
    }

    /// Create the configured first administrator, if any.
    pub async fn apply_admin_seed(&self) -> AuthResult<Option<UserRecord>> {
        let Some(seed) = self.config.admin.clone() else {
            return Ok(None);
        };
        let admin = self
            .seed_user(&seed.email, &seed.username, &seed.password, Role::Admin)
            .await?;
        Ok(Some(admin))
    }

    /// Verified account with the given role, created without going through
    /// sign-up. This is how the first staff accounts come to exist.
    pub async fn seed_user(
        &self,
        email: &str,
        username: &str,
        password: &str,
        role: Role,
    ) -> AuthResult<UserRecord> {
        let email = email.trim();
        let username = username.trim();
        if username.is_empty() || !is_valid_email(email) {
            return Err(AuthError::validation("Invalid seed account"));
        }
        let min = self.config.policy.min_password_len;
        if password.chars().count() < min {
            return Err(AuthError::validation(format!(
                "Password must be at least {min} characters"
            )));
        }

        let mut user = UserRecord::new(email, username, hash_password(password)?);
        user.role = role;
        user.is_verified = true;
        user.verification_token = None;
        let user = self.users.insert(user).await?;

        info!(user_id = %user.id, role = %role, "account seeded");
        Ok(user)
    }

    pub fn from_parts(
        config: AppConfig,
        storage: Arc<dyn LocalStorage>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            users: CredentialStore::new(),
            bans: BanLedger::default(),
            reports: ReportStore::default(),
            storage,
            mailer,
        }
    }

    /// Isolated state with in-memory storage, a log mailer and test keys.
    pub fn fake() -> Self {
        let config = AppConfig {
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            policy: AuthPolicy::default(),
            admin: None,
            storage_path: None,
            latency_ms: 0,
        };
        Self::from_parts(
            config,
            Arc::new(MemoryStorage::default()),
            Arc::new(LogMailer),
        )
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn LocalStorage>) -> Self {
        self.storage = storage;
        self
    }
}
