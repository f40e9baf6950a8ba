//! In-process identity, session and moderation services for the Animeverse
//! showcase: sign-up/sign-in with argon2 hashes and signed session tokens,
//! email verification and password reset flows, role-based user management
//! and a reported-comment queue.
//!
//! Build an [`AppState`] (from the environment or [`AppState::fake`]) and
//! construct services from it; services built from the same state share
//! its stores.

pub mod admin;
pub mod auth;
pub mod config;
pub mod error;
pub mod moderation;
pub mod state;
pub mod storage;
pub mod telemetry;

pub use admin::AdminService;
pub use auth::{AuthContext, AuthService};
pub use error::{AuthError, AuthResult};
pub use moderation::ModerationService;
pub use state::AppState;
