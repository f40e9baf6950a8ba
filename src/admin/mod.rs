pub mod bans;
pub mod dto;
pub mod roles;
pub mod services;

pub use services::AdminService;
