pub mod config;
pub mod value_object;

pub use config::PluginConfig;
pub use value_object::{CommandName, CommentAmount, OwnerIdentity, ReceivingId, RequestKey};
