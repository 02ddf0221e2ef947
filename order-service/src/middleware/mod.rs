pub mod auth;
pub mod permission;

pub use auth::{Principal, auth_middleware};
pub use permission::permission_middleware;
