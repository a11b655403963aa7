use crate::app::bridge::respond::ResponseHandle;
use crate::domain::comment::{CommandName, OwnerIdentity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Callback the command subsystem uses to answer the HTTP caller.
///
/// Only the first call per handle reaches the caller.
pub type RespondFn = Arc<dyn Fn(&CallerContext, &ResponseHandle, &str) + Send + Sync>;

/// Who is asking. Always the owner, never the anonymous HTTP caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallerContext {
    requester: OwnerIdentity,
}

impl CallerContext {
    pub fn owner(requester: OwnerIdentity) -> Self {
        Self { requester }
    }

    pub fn requester(&self) -> &OwnerIdentity {
        &self.requester
    }
}

#[derive(Clone, Debug)]
pub struct DispatchExtra {
    pub response: ResponseHandle,
    pub requester: OwnerIdentity,
}

#[derive(Clone, Debug)]
pub struct CommandInvocation {
    pub command: CommandName,
    pub args: Vec<String>,
    pub caller: CallerContext,
    pub extra: DispatchExtra,
}

impl CommandInvocation {
    pub fn response(&self) -> &ResponseHandle {
        &self.extra.response
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CommandResult {
    pub fn ok(message: Option<String>) -> Self {
        Self {
            success: true,
            message,
            reason: None,
        }
    }

    pub fn failed(message: Option<String>, reason: Option<String>) -> Self {
        Self {
            success: false,
            message,
            reason,
        }
    }

    /// Text describing a failure: the message when set, the reason otherwise.
    pub fn failure_text(&self) -> &str {
        self.message
            .as_deref()
            .filter(|text| !text.is_empty())
            .or_else(|| self.reason.as_deref().filter(|text| !text.is_empty()))
            .unwrap_or("command failed")
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run_command(
        &self,
        invocation: CommandInvocation,
        respond: RespondFn,
    ) -> anyhow::Result<CommandResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_text_prefers_message() {
        let result = CommandResult::failed(Some("quota hit".into()), Some("busy".into()));
        assert_eq!(result.failure_text(), "quota hit");
        let result = CommandResult::failed(None, Some("busy".into()));
        assert_eq!(result.failure_text(), "busy");
        let result = CommandResult::failed(Some(String::new()), None);
        assert_eq!(result.failure_text(), "command failed");
    }

    #[test]
    fn result_deserializes_without_optional_fields() {
        let result: CommandResult = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(result, CommandResult::ok(None));
    }
}
