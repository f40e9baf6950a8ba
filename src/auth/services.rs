use std::{sync::Arc, time::Duration};

use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{EmailVerification, ProfileUpdate, PublicUser, INVALID_CREDENTIALS, RESET_REQUESTED},
        jwt::SessionKeys,
        mailer::{EmailKind, Mailer, OutgoingEmail},
        password::{hash_password, verify_password},
        repo::CredentialStore,
        repo_types::UserRecord,
        session::{Session, SessionHolder},
    },
    config::AuthPolicy,
    error::{AuthError, AuthResult},
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid");
    }
    EMAIL_RE.is_match(email)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Sign-up, sign-in, verification and password flows over the credential store.
#[derive(Clone)]
pub struct AuthService {
    users: CredentialStore,
    sessions: SessionHolder,
    mailer: Arc<dyn Mailer>,
    keys: SessionKeys,
    policy: AuthPolicy,
    latency: Duration,
}

impl From<&AppState> for AuthService {
    fn from(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
            sessions: SessionHolder::new(state.storage.clone()),
            mailer: state.mailer.clone(),
            keys: SessionKeys::from(&state.config.jwt),
            policy: state.config.policy.clone(),
            latency: Duration::from_millis(state.config.latency_ms),
        }
    }
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self::from(state)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn ensure_password_len(&self, password: &str, label: &str) -> AuthResult<()> {
        let min = self.policy.min_password_len;
        if password.chars().count() < min {
            warn!("{label} too short");
            return Err(AuthError::validation(format!(
                "{label} must be at least {min} characters"
            )));
        }
        Ok(())
    }

    /// Mail failures never fail the calling operation.
    async fn dispatch(&self, to: &str, kind: EmailKind, token: &str) {
        let email = OutgoingEmail {
            to: to.to_string(),
            kind,
            token: token.to_string(),
        };
        if let Err(e) = self.mailer.send(email).await {
            warn!(error = %e, to = %to, kind = ?kind, "email dispatch failed");
        }
    }

    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> AuthResult<PublicUser> {
        self.simulate_latency().await;
        let email = email.trim();
        let username = username.trim();

        if email.is_empty() || username.is_empty() || password.is_empty() {
            return Err(AuthError::validation("All fields are required"));
        }
        if !is_valid_email(email) {
            warn!(email = %email, "invalid email");
            return Err(AuthError::validation("Invalid email"));
        }
        self.ensure_password_len(password, "Password")?;

        if self.users.find_by_email(email).await.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AuthError::conflict("Email already in use"));
        }
        if self.users.find_by_username(username).await.is_some() {
            warn!(username = %username, "username already taken");
            return Err(AuthError::conflict("Username already taken"));
        }

        let hash = hash_password(password)?;
        // insert re-checks uniqueness under the write lock
        let user = self
            .users
            .insert(UserRecord::new(email, username, hash))
            .await?;

        if let Some(token) = &user.verification_token {
            self.dispatch(&user.email, EmailKind::Verification, token)
                .await;
        }

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(PublicUser::from(&user))
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<PublicUser> {
        self.simulate_latency().await;
        let email = email.trim();

        let Some(user) = self.users.find_by_email(email).await else {
            warn!(email = %email, "sign in with unknown email");
            return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(email = %email, user_id = %user.id, "sign in with invalid password");
            return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
        }

        if user.is_banned_at(OffsetDateTime::now_utc()) {
            warn!(user_id = %user.id, "sign in by banned user");
            return Err(AuthError::unauthorized("Account is banned"));
        }

        let token = self.keys.sign(user.id)?;
        // the user may have been removed since the lookup
        let user = self
            .users
            .update(user.id, |u| {
                u.touch();
                PublicUser::from(&*u)
            })
            .await
            .ok_or_else(|| AuthError::unauthorized(INVALID_CREDENTIALS))?;

        self.sessions
            .save(&Session {
                user_id: user.id,
                token,
            })
            .await?;

        info!(user_id = %user.id, email = %user.email, "user signed in");
        Ok(user)
    }

    /// Clears the session. Storage failures are logged, never returned.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        self.simulate_latency().await;
        match self.sessions.clear().await {
            Ok(()) => info!("user signed out"),
            Err(e) => error!(error = %e, "failed to clear session"),
        }
    }

    /// The signed-in user, or `None` for a missing, invalid or orphaned session.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Option<PublicUser> {
        self.simulate_latency().await;
        let session = self.sessions.load().await?;

        let claims = match self.keys.verify(&session.token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, user_id = %session.user_id, "session token rejected");
                return None;
            }
        };
        if claims.sub != session.user_id {
            warn!(user_id = %session.user_id, sub = %claims.sub, "session token subject mismatch");
            return None;
        }

        self.users
            .find_by_id(session.user_id)
            .await
            .map(|u| PublicUser::from(&u))
    }

    /// Applies display name, avatar and bio; other fields are not editable here.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> AuthResult<PublicUser> {
        self.simulate_latency().await;
        let user = self
            .users
            .update(user_id, |u| {
                if let Some(name) = non_blank(update.display_name) {
                    u.display_name = name;
                }
                if let Some(avatar) = non_blank(update.avatar) {
                    u.avatar = Some(avatar);
                }
                if let Some(bio) = non_blank(update.bio) {
                    u.bio = Some(bio);
                }
                u.touch();
                PublicUser::from(&*u)
            })
            .await
            .ok_or_else(|| {
                warn!(user_id = %user_id, "profile update for unknown user");
                AuthError::not_found("User not found")
            })?;

        info!(user_id = %user_id, "profile updated");
        Ok(user)
    }

    /// With a token: consume it and mark the email verified.
    /// Without: issue a fresh token and mail it.
    #[instrument(skip(self, token))]
    pub async fn verify_email(
        &self,
        email: &str,
        token: Option<&str>,
    ) -> AuthResult<EmailVerification> {
        self.simulate_latency().await;
        let user = self
            .users
            .find_by_email(email.trim())
            .await
            .ok_or_else(|| AuthError::not_found("User not found"))?;

        match token.filter(|t| !t.trim().is_empty()) {
            Some(token) => {
                let verified = self
                    .users
                    .update(user.id, |u| {
                        if u.verification_token.as_deref() != Some(token) {
                            return false;
                        }
                        u.is_verified = true;
                        u.verification_token = None;
                        u.touch();
                        true
                    })
                    .await
                    .ok_or_else(|| AuthError::not_found("User not found"))?;

                if !verified {
                    warn!(user_id = %user.id, "invalid verification token");
                    return Err(AuthError::unauthorized("Invalid verification token"));
                }
                info!(user_id = %user.id, "email verified");
                Ok(EmailVerification::Verified)
            }
            None => {
                // issuing a token never clears `is_verified`
                let token = Uuid::new_v4().to_string();
                self.users
                    .update(user.id, |u| {
                        u.verification_token = Some(token.clone());
                        u.touch();
                    })
                    .await
                    .ok_or_else(|| AuthError::not_found("User not found"))?;

                self.dispatch(&user.email, EmailKind::Verification, &token)
                    .await;
                info!(user_id = %user.id, "verification token issued");
                Ok(EmailVerification::TokenSent)
            }
        }
    }

    /// Always answers with the same message so callers cannot tell which accounts exist.
    #[instrument(skip(self))]
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<&'static str> {
        self.simulate_latency().await;
        let Some(user) = self.users.find_by_email(email.trim()).await else {
            info!("password reset requested for unknown email");
            return Ok(RESET_REQUESTED);
        };

        let token = Uuid::new_v4().to_string();
        let expiry =
            OffsetDateTime::now_utc() + TimeDuration::minutes(self.policy.reset_token_ttl_minutes);
        self.users
            .update(user.id, |u| {
                u.reset_token = Some(token.clone());
                u.reset_expiry = Some(expiry);
                u.touch();
            })
            .await;

        self.dispatch(&user.email, EmailKind::PasswordReset, &token)
            .await;
        info!(user_id = %user.id, "password reset token issued");
        Ok(RESET_REQUESTED)
    }

    #[instrument(skip(self, token, new_password))]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<()> {
        self.simulate_latency().await;
        self.ensure_password_len(new_password, "Password")?;

        let user = self
            .users
            .find_by_reset_token(token)
            .await
            .ok_or_else(|| {
                warn!("password reset with unknown token");
                AuthError::unauthorized("Invalid or expired token")
            })?;

        if user
            .reset_expiry
            .is_some_and(|exp| OffsetDateTime::now_utc() > exp)
        {
            warn!(user_id = %user.id, "password reset with expired token");
            return Err(AuthError::unauthorized("Token has expired"));
        }

        let hash = hash_password(new_password)?;
        let consumed = self
            .users
            .update(user.id, |u| {
                // a concurrent reset may already have consumed the token
                if u.reset_token.as_deref() != Some(token) {
                    return false;
                }
                u.password_hash = hash;
                u.reset_token = None;
                u.reset_expiry = None;
                u.touch();
                true
            })
            .await
            .unwrap_or(false);

        if !consumed {
            return Err(AuthError::unauthorized("Invalid or expired token"));
        }
        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    #[instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        self.simulate_latency().await;
        let user = self
            .users
            .find_by_id(user_id)
            .await
            .ok_or_else(|| AuthError::not_found("User not found"))?;

        if !verify_password(current_password, &user.password_hash)? {
            warn!(user_id = %user_id, "change password with wrong current password");
            return Err(AuthError::unauthorized("Current password is incorrect"));
        }
        self.ensure_password_len(new_password, "New password")?;

        let hash = hash_password(new_password)?;
        self.users
            .update(user_id, |u| {
                u.password_hash = hash;
                u.touch();
            })
            .await
            .ok_or_else(|| AuthError::not_found("User not found"))?;

        info!(user_id = %user_id, "password changed");
        Ok(())
    }
}
