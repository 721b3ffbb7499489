pub mod auth;

pub use auth::{authenticate, require_admin, require_login, require_self_or_admin, AuthUser};
