pub mod auth;
pub mod request_path;

pub use auth::{AuthUser, Claims};
pub use request_path::attach_request_path;
