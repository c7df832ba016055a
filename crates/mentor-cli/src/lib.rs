// Library interface for mentor-cli. The binary in main.rs is a thin clap
// front end over `app::App`; integration tests drive both modules directly.

pub mod app;
pub mod commands;

pub use app::{App, ProfileEdit};
pub use commands::{handle_command, CommandResult};
