pub mod command_runner;
pub mod config;
pub mod identity;

pub use command_runner::ShellCommandRunner;
pub use config::{FileConfigStore, InMemoryConfigStore};
pub use identity::StaticOwnerIdentity;
