use tokio::sync::RwLock;
use tracing::debug;

use crate::auth::{
    dto::{AuthOutcome, ProfileUpdate, PublicUser},
    services::AuthService,
};

const NOT_AUTHENTICATED: &str = "Not authenticated";

/// Who may see a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    RequireAuth,
    RequireGuest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Hydration has not finished; render nothing yet.
    Loading,
    Allow,
    RedirectHome,
    RedirectToSignIn { redirect: String },
}

#[derive(Debug, Default)]
struct ContextState {
    user: Option<PublicUser>,
    initialized: bool,
    is_loading: bool,
}

/// Current-user state plus the auth operations the UI calls.
///
/// Every operation goes through the service; local state only changes on
/// success, and failures come back as an `AuthOutcome` message.
pub struct AuthContext {
    service: AuthService,
    state: RwLock<ContextState>,
}

impl AuthContext {
    pub fn new(service: AuthService) -> Self {
        Self {
            service,
            state: RwLock::new(ContextState {
                is_loading: true,
                ..ContextState::default()
            }),
        }
    }

    /// Hydrate from the stored session. Only the first call does anything.
    pub async fn init(&self) {
        if self.state.read().await.initialized {
            return;
        }
        let user = self.service.current_user().await;
        let mut state = self.state.write().await;
        if state.initialized {
            return;
        }
        debug!(signed_in = user.is_some(), "auth context hydrated");
        state.user = user;
        state.initialized = true;
        state.is_loading = false;
    }

    pub async fn user(&self) -> Option<PublicUser> {
        self.state.read().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.user.is_some()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading
    }

    async fn set_loading(&self, loading: bool) {
        self.state.write().await.is_loading = loading;
    }

    async fn set_user(&self, user: Option<PublicUser>) {
        self.state.write().await.user = user;
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthOutcome {
        self.set_loading(true).await;
        let outcome = match self.service.sign_in(email, password).await {
            Ok(user) => {
                self.set_user(Some(user)).await;
                AuthOutcome::ok()
            }
            Err(e) => AuthOutcome::from_error(e, "Failed to sign in"),
        };
        self.set_loading(false).await;
        outcome
    }

    /// Sets the current user on success without persisting a session.
    pub async fn sign_up(&self, email: &str, username: &str, password: &str) -> AuthOutcome {
        self.set_loading(true).await;
        let outcome = match self.service.sign_up(email, username, password).await {
            Ok(user) => {
                self.set_user(Some(user)).await;
                AuthOutcome::ok()
            }
            Err(e) => AuthOutcome::from_error(e, "Failed to create account"),
        };
        self.set_loading(false).await;
        outcome
    }

    pub async fn sign_out(&self) {
        self.service.sign_out().await;
        self.set_user(None).await;
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> AuthOutcome {
        let Some(current) = self.user().await else {
            return AuthOutcome::failure(NOT_AUTHENTICATED);
        };
        self.set_loading(true).await;
        let outcome = match self.service.update_profile(current.id, update).await {
            Ok(user) => {
                self.set_user(Some(user)).await;
                AuthOutcome::ok()
            }
            Err(e) => AuthOutcome::from_error(e, "Failed to update profile"),
        };
        self.set_loading(false).await;
        outcome
    }

    pub async fn send_verification_email(&self) -> AuthOutcome {
        let Some(current) = self.user().await else {
            return AuthOutcome::failure(NOT_AUTHENTICATED);
        };
        match self.service.verify_email(&current.email, None).await {
            Ok(result) => AuthOutcome::ok_with_message(result.message()),
            Err(e) => AuthOutcome::from_error(e, "Failed to verify email"),
        }
    }

    /// Consume a verification token for the signed-in user and refresh state.
    pub async fn confirm_email(&self, token: &str) -> AuthOutcome {
        let Some(current) = self.user().await else {
            return AuthOutcome::failure(NOT_AUTHENTICATED);
        };
        match self.service.verify_email(&current.email, Some(token)).await {
            Ok(result) => {
                self.set_user(Some(PublicUser {
                    is_verified: true,
                    ..current
                }))
                .await;
                AuthOutcome::ok_with_message(result.message())
            }
            Err(e) => AuthOutcome::from_error(e, "Failed to verify email"),
        }
    }

    pub async fn send_password_reset_email(&self, email: &str) -> AuthOutcome {
        match self.service.request_password_reset(email).await {
            Ok(message) => AuthOutcome::ok_with_message(message),
            Err(e) => AuthOutcome::from_error(e, "Failed to request password reset"),
        }
    }

    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AuthOutcome {
        match self.service.reset_password(token, new_password).await {
            Ok(()) => AuthOutcome::ok_with_message("Password reset successfully"),
            Err(e) => AuthOutcome::from_error(e, "Failed to reset password"),
        }
    }

    pub async fn change_password(&self, current_password: &str, new_password: &str) -> AuthOutcome {
        let Some(current) = self.user().await else {
            return AuthOutcome::failure(NOT_AUTHENTICATED);
        };
        match self
            .service
            .change_password(current.id, current_password, new_password)
            .await
        {
            Ok(()) => AuthOutcome::ok_with_message("Password changed successfully"),
            Err(e) => AuthOutcome::from_error(e, "Failed to change password"),
        }
    }

    /// Route guard: decide whether `path` may render for the current state.
    pub async fn guard(&self, access: Access, path: &str) -> GuardDecision {
        let state = self.state.read().await;
        if state.is_loading {
            return GuardDecision::Loading;
        }
        match access {
            Access::RequireGuest if state.user.is_some() => GuardDecision::RedirectHome,
            Access::RequireAuth if state.user.is_none() => GuardDecision::RedirectToSignIn {
                redirect: path.to_string(),
            },
            _ => GuardDecision::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        auth::mailer::{EmailKind, MemoryMailer},
        state::AppState,
    };

    fn setup() -> (AppState, Arc<MemoryMailer>) {
        let mailer = Arc::new(MemoryMailer::default());
        (AppState::fake().with_mailer(mailer.clone()), mailer)
    }

    #[tokio::test]
    async fn hydrates_from_existing_session() {
        let (state, _) = setup();
        let service = AuthService::new(&state);
        service
            .sign_up("alice@example.com", "alice", "password1")
            .await
            .unwrap();
        service
            .sign_in("alice@example.com", "password1")
            .await
            .unwrap();

        // a fresh context is a page reload
        let ctx = AuthContext::new(AuthService::new(&state));
        assert!(ctx.is_loading().await);
        assert_eq!(ctx.guard(Access::RequireAuth, "/profile").await, GuardDecision::Loading);

        ctx.init().await;
        assert!(!ctx.is_loading().await);
        assert!(ctx.is_authenticated().await);
        assert_eq!(ctx.user().await.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_state_untouched() {
        let (state, _) = setup();
        let ctx = AuthContext::new(AuthService::new(&state));
        ctx.init().await;

        let outcome = ctx.sign_in("ghost@example.com", "password1").await;
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("Invalid email or password"));
        assert!(!ctx.is_authenticated().await);
        assert!(!ctx.is_loading().await);
    }

    #[tokio::test]
    async fn sign_in_and_sign_out_drive_state() {
        let (state, _) = setup();
        let ctx = AuthContext::new(AuthService::new(&state));
        ctx.init().await;

        assert!(ctx.sign_up("alice@example.com", "alice", "password1").await.success);
        assert!(ctx.is_authenticated().await);

        ctx.sign_out().await;
        assert!(!ctx.is_authenticated().await);

        assert!(ctx.sign_in("alice@example.com", "password1").await.success);
        assert!(ctx.is_authenticated().await);

        let reloaded = AuthContext::new(AuthService::new(&state));
        reloaded.init().await;
        assert!(reloaded.is_authenticated().await);
    }

    #[tokio::test]
    async fn operations_needing_a_user_report_not_authenticated() {
        let (state, _) = setup();
        let ctx = AuthContext::new(AuthService::new(&state));
        ctx.init().await;

        for outcome in [
            ctx.update_profile(ProfileUpdate::default()).await,
            ctx.send_verification_email().await,
            ctx.confirm_email("token").await,
            ctx.change_password("password1", "password2").await,
        ] {
            assert!(!outcome.success);
            assert_eq!(outcome.message.as_deref(), Some(NOT_AUTHENTICATED));
        }
    }

    #[tokio::test]
    async fn verification_flow_updates_current_user() {
        let (state, mailer) = setup();
        let ctx = AuthContext::new(AuthService::new(&state));
        ctx.init().await;
        ctx.sign_up("alice@example.com", "alice", "password1").await;

        let sent = ctx.send_verification_email().await;
        assert_eq!(sent.message.as_deref(), Some("Verification email sent"));
        let token = mailer
            .last_token_for("alice@example.com", EmailKind::Verification)
            .await
            .unwrap();

        let confirmed = ctx.confirm_email(&token).await;
        assert!(confirmed.success);
        assert!(ctx.user().await.unwrap().is_verified);

        let again = ctx.confirm_email(&token).await;
        assert!(!again.success);
    }

    #[tokio::test]
    async fn password_reset_through_context() {
        let (state, mailer) = setup();
        let ctx = AuthContext::new(AuthService::new(&state));
        ctx.init().await;
        ctx.sign_up("alice@example.com", "alice", "password1").await;

        let requested = ctx.send_password_reset_email("alice@example.com").await;
        let unknown = ctx.send_password_reset_email("ghost@example.com").await;
        assert_eq!(requested, unknown);

        let token = mailer
            .last_token_for("alice@example.com", EmailKind::PasswordReset)
            .await
            .unwrap();
        let outcome = ctx.confirm_password_reset(&token, "brand-new-pass").await;
        assert_eq!(outcome.message.as_deref(), Some("Password reset successfully"));

        let outcome = ctx.change_password("brand-new-pass", "another-pass").await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn guard_redirects() {
        let (state, _) = setup();
        let ctx = AuthContext::new(AuthService::new(&state));
        ctx.init().await;

        assert_eq!(
            ctx.guard(Access::RequireAuth, "/profile").await,
            GuardDecision::RedirectToSignIn {
                redirect: "/profile".into()
            }
        );
        assert_eq!(ctx.guard(Access::RequireGuest, "/sign-in").await, GuardDecision::Allow);

        ctx.sign_up("alice@example.com", "alice", "password1").await;
        assert_eq!(ctx.guard(Access::RequireGuest, "/sign-in").await, GuardDecision::RedirectHome);
        assert_eq!(ctx.guard(Access::RequireAuth, "/profile").await, GuardDecision::Allow);
        assert_eq!(ctx.guard(Access::Public, "/").await, GuardDecision::Allow);
    }
}
