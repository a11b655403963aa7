use super::model::ValidatedComment;
use super::respond::{respond, BridgeResponse, ResponseHandle};
use crate::domain::comment::{CommandName, OwnerIdentity};
use crate::ports::{
    CallerContext, CommandInvocation, CommandResult, CommandRunner, DispatchExtra, RespondFn,
};
use crate::telemetry::RelayMetrics;
use axum::http::StatusCode;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Forwards validated comment requests to the command subsystem and turns its
/// answer into exactly one HTTP response.
pub struct CommandDispatcher {
    runner: Arc<dyn CommandRunner>,
    requester: OnceCell<OwnerIdentity>,
    timeout: Option<Duration>,
    metrics: Option<Arc<RelayMetrics>>,
}

impl CommandDispatcher {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        timeout: Option<Duration>,
        metrics: Option<Arc<RelayMetrics>>,
    ) -> Self {
        Self {
            runner,
            requester: OnceCell::new(),
            timeout,
            metrics,
        }
    }

    /// Sets the identity every dispatch runs as. The first binding sticks.
    pub fn bind_requester(&self, owner: OwnerIdentity) {
        if let Err(owner) = self.requester.set(owner) {
            debug!(requester = %owner, "requester already bound; keeping the first one");
        }
    }

    pub fn requester(&self) -> Option<&OwnerIdentity> {
        self.requester.get()
    }

    /// Runs one invocation through the command subsystem.
    ///
    /// A failure writes 500 with the failure text unless the callback already
    /// answered. A success that never called back is finalized with 200 and
    /// the result message.
    pub async fn dispatch(&self, invocation: CommandInvocation, respond: RespondFn) -> CommandResult {
        let handle = invocation.response().clone();
        let command = invocation.command.clone();
        let result = match self.runner.run_command(invocation, respond).await {
            Ok(result) => result,
            Err(err) => CommandResult::failed(None, Some(format!("{err:#}"))),
        };

        if result.success {
            handle.send(BridgeResponse::ok(result.message.clone().unwrap_or_default()));
        } else {
            let text = result.failure_text();
            warn!(request_id = %handle.id(), %command, reason = %text, "command reported failure");
            if !handle.send(BridgeResponse::failure(text)) {
                debug!(request_id = %handle.id(), "failure arrived after the response was sent");
            }
        }
        result
    }

    /// Builds the `comment` invocation for `comment` and waits for its first
    /// response, bounded by the dispatch timeout.
    pub async fn relay_comment(self: &Arc<Self>, comment: ValidatedComment) -> BridgeResponse {
        let Some(requester) = self.requester().cloned() else {
            return BridgeResponse {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "relay is not ready".to_string(),
            };
        };

        let (handle, rx) = ResponseHandle::channel();
        let request_id = handle.id();
        let invocation = CommandInvocation {
            command: CommandName::comment(),
            args: comment.args(),
            caller: CallerContext::owner(requester.clone()),
            extra: DispatchExtra {
                response: handle.clone(),
                requester,
            },
        };

        let dispatcher = Arc::clone(self);
        let started = Instant::now();
        tokio::spawn(async move {
            let callback: RespondFn = Arc::new(respond);
            let result = dispatcher.dispatch(invocation, callback).await;
            let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
            if let Some(metrics) = &dispatcher.metrics {
                metrics.record_dispatch(result.success, latency_ms);
            }
            debug!(%request_id, success = result.success, latency_ms, "command dispatch finished");
        });

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, rx).await.ok(),
            None => Some(rx.await),
        };

        match outcome {
            Some(Ok(response)) => response,
            Some(Err(_)) => {
                warn!(%request_id, "command dispatch ended without a response");
                BridgeResponse::failure("command dispatch aborted")
            }
            None => {
                handle.close();
                warn!(%request_id, timeout_ms = self.timeout.map(|t| t.as_millis() as u64), "command dispatch timed out");
                BridgeResponse::timeout("command did not respond in time")
            }
        }
    }
}
