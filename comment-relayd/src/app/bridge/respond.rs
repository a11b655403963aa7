use crate::ports::CallerContext;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

/// Plain-text response written through a [`ResponseHandle`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeResponse {
    pub status: StatusCode,
    pub body: String,
}

impl BridgeResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    pub fn failure(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: body.into(),
        }
    }

    pub fn timeout(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::GATEWAY_TIMEOUT,
            body: body.into(),
        }
    }
}

impl IntoResponse for BridgeResponse {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.body,
        )
            .into_response()
    }
}

type Slot = Mutex<Option<oneshot::Sender<BridgeResponse>>>;

/// Correlates one command invocation with one HTTP response.
///
/// The sender is taken on the first write; every later write finds the slot
/// empty and does nothing.
#[derive(Clone)]
pub struct ResponseHandle {
    id: Uuid,
    slot: Arc<Slot>,
}

impl ResponseHandle {
    pub fn channel() -> (Self, oneshot::Receiver<BridgeResponse>) {
        let (tx, rx) = oneshot::channel();
        let handle = Self {
            id: Uuid::new_v4(),
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (handle, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Writes `response` unless something was already written. Returns whether
    /// this call was the one that wrote.
    pub fn send(&self, response: BridgeResponse) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(tx) => {
                if tx.send(response).is_err() {
                    debug!(request_id = %self.id, "caller went away before the response was ready");
                }
                true
            }
            None => false,
        }
    }

    pub fn is_sent(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Finalizes the handle without writing; later writes become no-ops.
    pub fn close(&self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("id", &self.id)
            .field("sent", &self.is_sent())
            .finish()
    }
}

/// Response callback handed to the command subsystem: 200 with `text`, first
/// write wins.
pub fn respond(context: &CallerContext, handle: &ResponseHandle, text: &str) {
    if !handle.send(BridgeResponse::ok(text)) {
        debug!(
            request_id = %handle.id(),
            requester = %context.requester(),
            "response already sent; dropping extra command output"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::comment::OwnerIdentity;

    fn context() -> CallerContext {
        CallerContext::owner(OwnerIdentity::new("owner").unwrap())
    }

    #[tokio::test]
    async fn only_first_write_reaches_caller() {
        let (handle, rx) = ResponseHandle::channel();
        respond(&context(), &handle, "progress");
        respond(&context(), &handle, "done");
        assert!(!handle.send(BridgeResponse::failure("late failure")));
        let response = rx.await.unwrap();
        assert_eq!(response, BridgeResponse::ok("progress"));
    }

    #[tokio::test]
    async fn clones_share_the_sent_flag() {
        let (handle, rx) = ResponseHandle::channel();
        let clone = handle.clone();
        assert!(!handle.is_sent());
        assert!(clone.send(BridgeResponse::failure("busy")));
        assert!(handle.is_sent());
        assert_eq!(rx.await.unwrap().status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn write_after_caller_left_is_not_an_error() {
        let (handle, rx) = ResponseHandle::channel();
        drop(rx);
        assert!(handle.send(BridgeResponse::ok("nobody listening")));
        assert!(!handle.send(BridgeResponse::ok("again")));
    }

    #[tokio::test]
    async fn close_turns_writes_into_no_ops() {
        let (handle, rx) = ResponseHandle::channel();
        handle.close();
        respond(&context(), &handle, "too late");
        assert!(rx.await.is_err());
    }
}
