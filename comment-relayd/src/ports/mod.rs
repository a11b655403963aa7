pub mod command_runner;
pub mod config_store;
pub mod identity;

pub use command_runner::{
    CallerContext, CommandInvocation, CommandResult, CommandRunner, DispatchExtra, RespondFn,
};
pub use config_store::ConfigStore;
pub use identity::IdentityLookup;
