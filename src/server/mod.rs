mod admin;
pub mod dto;
mod gate;
pub mod response;
mod router;
pub mod user;

pub use admin::admin_router;
pub use gate::{NamespaceContext, RoleGate, require_role};
pub use router::{AppState, create_router};
pub use user::user_router;
