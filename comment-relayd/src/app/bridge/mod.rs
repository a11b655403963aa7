pub mod auth;
pub mod dispatch;
pub mod model;
pub mod output;
pub mod respond;
pub mod secret;
pub mod validate;

pub use auth::Authenticator;
pub use dispatch::CommandDispatcher;
pub use model::{CommentQuery, IncomingCommentRequest};
pub use output::OutputLogReader;
pub use respond::{respond, BridgeResponse, ResponseHandle};
pub use secret::SecretProvisioner;
pub use validate::RequestValidator;
