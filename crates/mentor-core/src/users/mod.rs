pub mod model;
mod service;

pub use model::{UserProfile, UserRole, UserSummary};
pub use service::{normalize_username, UserService};
