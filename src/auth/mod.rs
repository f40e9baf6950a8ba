pub mod claims;
pub mod context;
pub mod dto;
pub mod jwt;
pub mod mailer;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod session;

pub use context::{Access, AuthContext, GuardDecision};
pub use services::AuthService;
