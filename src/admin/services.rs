use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    admin::{
        bans::{BanLedger, BanRecord},
        dto::{AdminUserView, BanDuration, BanRequest, UserDetails, UserFilter},
        roles::{has_permission, Permission, Role},
    },
    auth::{repo::CredentialStore, repo_types::BanStatus, repo_types::UserRecord},
    error::{AuthError, AuthResult},
    state::AppState,
};

/// User management over the shared credential store.
///
/// Every call names the acting user; their role (or custom grants) decides
/// what they may do. Banned actors are refused outright.
#[derive(Clone)]
pub struct AdminService {
    users: CredentialStore,
    bans: BanLedger,
}

impl From<&AppState> for AdminService {
    fn from(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
            bans: state.bans.clone(),
        }
    }
}

impl AdminService {
    pub fn new(state: &AppState) -> Self {
        Self::from(state)
    }

    async fn authorize(&self, actor_id: Uuid, any_of: &[Permission]) -> AuthResult<UserRecord> {
        let actor = self.users.find_by_id(actor_id).await;
        match actor {
            Some(actor)
                if !actor.is_banned_at(OffsetDateTime::now_utc())
                    && any_of.iter().any(|p| has_permission(&actor, *p)) =>
            {
                Ok(actor)
            }
            _ => {
                warn!(actor_id = %actor_id, required = ?any_of, "admin action denied");
                Err(AuthError::forbidden())
            }
        }
    }

    async fn target(&self, user_id: Uuid) -> AuthResult<UserRecord> {
        self.users
            .find_by_id(user_id)
            .await
            .ok_or_else(|| AuthError::not_found("User not found"))
    }

    /// Filtered listing, admins first, then alphabetical by username.
    #[instrument(skip(self, filter))]
    pub async fn list_users(
        &self,
        actor_id: Uuid,
        filter: UserFilter,
    ) -> AuthResult<Vec<AdminUserView>> {
        self.authorize(actor_id, &[Permission::ManageUsers, Permission::BanUsers])
            .await?;
        let now = OffsetDateTime::now_utc();

        let mut users: Vec<UserRecord> = self
            .users
            .all()
            .await
            .into_iter()
            .filter(|u| filter.matches(u, now))
            .collect();
        users.sort_by(|a, b| {
            a.role
                .rank()
                .cmp(&b.role.rank())
                .then_with(|| a.username.to_lowercase().cmp(&b.username.to_lowercase()))
        });

        Ok(users
            .iter()
            .map(|u| AdminUserView::from_record(u, now))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn user_details(&self, actor_id: Uuid, user_id: Uuid) -> AuthResult<UserDetails> {
        self.authorize(actor_id, &[Permission::ManageUsers, Permission::BanUsers])
            .await?;
        let user = self.target(user_id).await?;
        Ok(UserDetails {
            user: AdminUserView::from_record(&user, OffsetDateTime::now_utc()),
            ban_history: self.bans.history(user_id).await,
        })
    }

    #[instrument(skip(self))]
    pub async fn change_role(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> AuthResult<AdminUserView> {
        self.authorize(actor_id, &[Permission::ManageRoles]).await?;
        let view = self
            .users
            .update(user_id, |u| {
                u.role = role;
                u.touch();
                AdminUserView::from_record(u, OffsetDateTime::now_utc())
            })
            .await
            .ok_or_else(|| AuthError::not_found("User not found"))?;

        info!(actor_id = %actor_id, user_id = %user_id, role = %role, "role changed");
        Ok(view)
    }

    #[instrument(skip(self))]
    pub async fn grant_permission(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        permission: Permission,
    ) -> AuthResult<AdminUserView> {
        self.authorize(actor_id, &[Permission::ManageRoles]).await?;
        let view = self
            .users
            .update(user_id, |u| {
                if !u.custom_permissions.contains(&permission) {
                    u.custom_permissions.push(permission);
                }
                u.touch();
                AdminUserView::from_record(u, OffsetDateTime::now_utc())
            })
            .await
            .ok_or_else(|| AuthError::not_found("User not found"))?;

        info!(actor_id = %actor_id, user_id = %user_id, ?permission, "permission granted");
        Ok(view)
    }

    #[instrument(skip(self))]
    pub async fn revoke_permission(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        permission: Permission,
    ) -> AuthResult<AdminUserView> {
        self.authorize(actor_id, &[Permission::ManageRoles]).await?;
        let view = self
            .users
            .update(user_id, |u| {
                u.custom_permissions.retain(|p| *p != permission);
                u.touch();
                AdminUserView::from_record(u, OffsetDateTime::now_utc())
            })
            .await
            .ok_or_else(|| AuthError::not_found("User not found"))?;

        info!(actor_id = %actor_id, user_id = %user_id, ?permission, "permission revoked");
        Ok(view)
    }

    /// Only admins may ban admins.
    #[instrument(skip(self, request))]
    pub async fn ban_user(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        request: BanRequest,
    ) -> AuthResult<BanRecord> {
        let actor = self.authorize(actor_id, &[Permission::BanUsers]).await?;
        let reason = request.reason.trim().to_string();
        if reason.is_empty() {
            return Err(AuthError::validation("Please provide a reason for the ban"));
        }

        let target = self.target(user_id).await?;
        if target.role == Role::Admin && actor.role != Role::Admin {
            warn!(actor_id = %actor_id, user_id = %user_id, "non-admin tried to ban an admin");
            return Err(AuthError::forbidden());
        }

        let now = OffsetDateTime::now_utc();
        let expires_at = match request.duration {
            BanDuration::Permanent => None,
            BanDuration::Days(days) => Some(
                now.checked_add(TimeDuration::days(i64::from(days)))
                    .ok_or_else(|| {
                        warn!(days, "ban expiry out of range");
                        AuthError::validation("Invalid ban duration")
                    })?,
            ),
        };

        self.users
            .update(user_id, |u| {
                u.ban = Some(BanStatus {
                    reason: reason.clone(),
                    expires_at,
                });
                u.touch();
            })
            .await
            .ok_or_else(|| AuthError::not_found("User not found"))?;

        let record = BanRecord {
            user_id,
            admin_id: actor_id,
            reason,
            start_date: now,
            end_date: expires_at,
            is_active: true,
            notes: request.notes,
        };
        self.bans.record(record.clone()).await;

        info!(actor_id = %actor_id, user_id = %user_id, "user banned");
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn unban_user(&self, actor_id: Uuid, user_id: Uuid) -> AuthResult<()> {
        self.authorize(actor_id, &[Permission::BanUsers]).await?;
        self.users
            .update(user_id, |u| {
                u.ban = None;
                u.touch();
            })
            .await
            .ok_or_else(|| AuthError::not_found("User not found"))?;

        let closed = self
            .bans
            .close_active(user_id, OffsetDateTime::now_utc())
            .await;
        info!(actor_id = %actor_id, user_id = %user_id, closed, "user unbanned");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn ban_history(&self, actor_id: Uuid, user_id: Uuid) -> AuthResult<Vec<BanRecord>> {
        self.authorize(actor_id, &[Permission::ManageUsers, Permission::BanUsers])
            .await?;
        Ok(self.bans.history(user_id).await)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, actor_id: Uuid, user_id: Uuid) -> AuthResult<()> {
        self.authorize(actor_id, &[Permission::DeleteUsers]).await?;
        if !self.users.remove(user_id).await {
            return Err(AuthError::not_found("User not found"));
        }
        info!(actor_id = %actor_id, user_id = %user_id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{admin::dto::StatusFilter, auth::AuthService};

    struct Fixture {
        admin: AdminService,
        auth: AuthService,
        state: AppState,
    }

    impl Fixture {
        fn new() -> Self {
            let state = AppState::fake();
            Self {
                admin: AdminService::new(&state),
                auth: AuthService::new(&state),
                state,
            }
        }

        /// Plain users sign up; staff accounts are seeded.
        async fn user(&self, username: &str, role: Role) -> Uuid {
            let email = format!("{username}@example.com");
            if role == Role::User {
                self.auth
                    .sign_up(&email, username, "password1")
                    .await
                    .expect("sign up")
                    .id
            } else {
                self.state
                    .seed_user(&email, username, "password1", role)
                    .await
                    .expect("seed")
                    .id
            }
        }
    }

    fn ban(reason: &str) -> BanRequest {
        BanRequest {
            reason: reason.into(),
            duration: BanDuration::Days(30),
            notes: None,
        }
    }

    #[tokio::test]
    async fn list_sorts_by_role_then_username() {
        let f = Fixture::new();
        let admin = f.user("zed", Role::Admin).await;
        f.user("bob", Role::User).await;
        f.user("amy", Role::User).await;
        f.user("mod", Role::Moderator).await;
        f.user("critic", Role::Contributor).await;

        let names: Vec<String> = f
            .admin
            .list_users(admin, UserFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, ["zed", "mod", "critic", "amy", "bob"]);
    }

    #[tokio::test]
    async fn list_applies_filters() {
        let f = Fixture::new();
        let admin = f.user("admin", Role::Admin).await;
        let target = f.user("japanfan", Role::User).await;
        f.user("explorer", Role::User).await;
        f.admin.ban_user(admin, target, ban("spam")).await.unwrap();

        let banned = f
            .admin
            .list_users(
                admin,
                UserFilter {
                    status: StatusFilter::Banned,
                    ..UserFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(banned.len(), 1);
        assert_eq!(banned[0].id, target);
        assert_eq!(banned[0].ban_reason.as_deref(), Some("spam"));

        let users = f
            .admin
            .list_users(
                admin,
                UserFilter {
                    role: Some(Role::User),
                    search: Some("EXPLO".into()),
                    ..UserFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "explorer");
    }

    #[tokio::test]
    async fn plain_users_are_forbidden() {
        let f = Fixture::new();
        let user = f.user("alice", Role::User).await;
        let other = f.user("bob", Role::User).await;

        assert!(matches!(
            f.admin.list_users(user, UserFilter::default()).await,
            Err(AuthError::Forbidden(_))
        ));
        assert!(matches!(
            f.admin.delete_user(user, other).await,
            Err(AuthError::Forbidden(_))
        ));
        assert!(matches!(
            f.admin.list_users(Uuid::new_v4(), UserFilter::default()).await,
            Err(AuthError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn moderator_bans_users_but_not_admins() {
        let f = Fixture::new();
        let admin = f.user("admin", Role::Admin).await;
        let moderator = f.user("mod", Role::Moderator).await;
        let user = f.user("alice", Role::User).await;

        let record = f.admin.ban_user(moderator, user, ban("spam")).await.unwrap();
        assert!(record.is_active);
        assert_eq!(record.admin_id, moderator);
        assert!(record.end_date.is_some());

        assert!(matches!(
            f.admin.ban_user(moderator, admin, ban("coup")).await,
            Err(AuthError::Forbidden(_))
        ));
        assert!(matches!(
            f.admin.ban_user(moderator, user, ban("   ")).await,
            Err(AuthError::Validation(_))
        ));
        // moderators cannot delete
        assert!(matches!(
            f.admin.delete_user(moderator, user).await,
            Err(AuthError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn out_of_range_ban_duration_is_rejected() {
        let f = Fixture::new();
        let admin = f.user("admin", Role::Admin).await;
        let user = f.user("alice", Role::User).await;

        let err = f
            .admin
            .ban_user(
                admin,
                user,
                BanRequest {
                    reason: "spam".into(),
                    duration: BanDuration::Days(u32::MAX),
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert_eq!(err.to_string(), "Invalid ban duration");

        let target = f.state.users.find_by_id(user).await.unwrap();
        assert!(target.ban.is_none());
        assert!(f.admin.ban_history(admin, user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ban_blocks_sign_in_until_unbanned() {
        let f = Fixture::new();
        let admin = f.user("admin", Role::Admin).await;
        let user = f.user("alice", Role::User).await;

        f.admin
            .ban_user(
                admin,
                user,
                BanRequest {
                    reason: "harassment".into(),
                    duration: BanDuration::Permanent,
                    notes: Some("third strike".into()),
                },
            )
            .await
            .unwrap();
        assert!(f.auth.sign_in("alice@example.com", "password1").await.is_err());

        f.admin.unban_user(admin, user).await.unwrap();
        assert!(f.auth.sign_in("alice@example.com", "password1").await.is_ok());

        let history = f.admin.ban_history(admin, user).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].is_active);
        assert!(history[0].end_date.is_some());
        assert_eq!(history[0].notes.as_deref(), Some("third strike"));

        let details = f.admin.user_details(admin, user).await.unwrap();
        assert!(!details.user.is_banned);
        assert_eq!(details.ban_history, history);
    }

    #[tokio::test]
    async fn banned_admin_loses_powers() {
        let f = Fixture::new();
        let root = f.user("root", Role::Admin).await;
        let rogue = f.user("rogue", Role::Admin).await;
        f.admin.ban_user(root, rogue, ban("rogue")).await.unwrap();

        assert!(matches!(
            f.admin.list_users(rogue, UserFilter::default()).await,
            Err(AuthError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn role_changes_and_custom_permissions() {
        let f = Fixture::new();
        let admin = f.user("admin", Role::Admin).await;
        let user = f.user("alice", Role::User).await;

        let view = f
            .admin
            .change_role(admin, user, Role::Moderator)
            .await
            .unwrap();
        assert_eq!(view.role, Role::Moderator);
        assert!(f.admin.list_users(user, UserFilter::default()).await.is_ok());

        let critic = f.user("critic", Role::Contributor).await;
        f.admin
            .grant_permission(admin, critic, Permission::DeleteUsers)
            .await
            .unwrap();
        let victim = f.user("victim", Role::User).await;
        f.admin.delete_user(critic, victim).await.unwrap();
        assert!(f.state.users.find_by_id(victim).await.is_none());

        f.admin
            .revoke_permission(admin, critic, Permission::DeleteUsers)
            .await
            .unwrap();
        assert!(matches!(
            f.admin.delete_user(critic, user).await,
            Err(AuthError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn missing_targets_are_not_found() {
        let f = Fixture::new();
        let admin = f.user("admin", Role::Admin).await;
        let ghost = Uuid::new_v4();

        assert!(matches!(
            f.admin.delete_user(admin, ghost).await,
            Err(AuthError::NotFound(_))
        ));
        assert!(matches!(
            f.admin.change_role(admin, ghost, Role::User).await,
            Err(AuthError::NotFound(_))
        ));
        assert!(matches!(
            f.admin.ban_user(admin, ghost, ban("x")).await,
            Err(AuthError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleted_user_session_reads_as_signed_out() {
        let f = Fixture::new();
        let admin = f.user("admin", Role::Admin).await;
        let user = f.user("alice", Role::User).await;
        f.auth.sign_in("alice@example.com", "password1").await.unwrap();

        f.admin.delete_user(admin, user).await.unwrap();
        assert!(f.auth.current_user().await.is_none());
    }
}
