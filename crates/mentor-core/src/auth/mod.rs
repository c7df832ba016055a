mod context;
mod local;

pub use context::AuthContext;
pub use local::LocalState;
