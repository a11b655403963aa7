mod adapters;
mod app;
mod domain;
pub mod lifecycle;
mod ports;
mod telemetry;

pub use adapters::{FileConfigStore, InMemoryConfigStore, ShellCommandRunner, StaticOwnerIdentity};
pub use app::bridge::{respond, BridgeResponse, ResponseHandle};
pub use domain::comment::{
    CommandName, CommentAmount, OwnerIdentity, PluginConfig, ReceivingId, RequestKey,
};
pub use lifecycle::{LifecycleState, RelayDependencies, RelayServer};
pub use ports::{
    CallerContext, CommandInvocation, CommandResult, CommandRunner, ConfigStore, DispatchExtra,
    IdentityLookup, RespondFn,
};
pub use telemetry::RelayMetrics;

use anyhow::{anyhow, Context};
use app::bridge::{
    Authenticator, CommandDispatcher, CommentQuery, IncomingCommentRequest, OutputLogReader,
    RequestValidator, SecretProvisioner,
};
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::ctrl_c;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 3034;
pub const DEFAULT_CONFIG_NAME: &str = "comment-relay";

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>comment relay</title></head>
<body>
<h1>comment relay</h1>
<p>Post comments through the relay with:</p>
<pre>GET /comment?n=&lt;amount&gt;&amp;id=&lt;receiving id&gt;&amp;key=&lt;request key&gt;</pre>
<p>The request key is stored in the relay config file.</p>
<p>Command output is available at <a href="/output">/output</a>.</p>
</body>
</html>
"#;

const USAGE_HINT: &str =
    "Not found. Usage: GET /comment?n=<amount>&id=<receiving id>&key=<request key>\n";

#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: SocketAddr,
    pub config_dir: PathBuf,
    pub config_name: String,
    pub output_log: PathBuf,
    pub command_program: PathBuf,
    pub owner_id: String,
    pub dispatch_timeout: Option<Duration>,
    pub otlp_endpoint: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            config_dir: PathBuf::from("state"),
            config_name: DEFAULT_CONFIG_NAME.to_string(),
            output_log: PathBuf::from("output.log"),
            command_program: PathBuf::from("comment-command"),
            owner_id: "owner".to_string(),
            dispatch_timeout: Some(Duration::from_secs(120)),
            otlp_endpoint: None,
        }
    }
}

impl RelayDependencies {
    /// File-backed config, an external command program and a fixed owner.
    pub fn from_settings(
        settings: &Settings,
        metrics: Option<Arc<RelayMetrics>>,
    ) -> anyhow::Result<Self> {
        let owner = OwnerIdentity::new(settings.owner_id.clone()).map_err(|err| anyhow!(err))?;
        let runner = ShellCommandRunner::resolve(&settings.command_program)?;
        Ok(Self {
            config_store: Arc::new(FileConfigStore::new(settings.config_dir.clone())),
            runner: Arc::new(runner),
            identity: Arc::new(StaticOwnerIdentity::new(owner)),
            metrics,
        })
    }
}

#[derive(Clone)]
struct AppState {
    authenticator: Arc<Authenticator>,
    dispatcher: Arc<CommandDispatcher>,
    output: Arc<OutputLogReader>,
    metrics: Option<Arc<RelayMetrics>>,
}

impl AppState {
    fn new(settings: &Settings, deps: &RelayDependencies) -> Self {
        Self {
            authenticator: Arc::new(Authenticator::new(
                deps.config_store.clone(),
                settings.config_name.clone(),
            )),
            dispatcher: Arc::new(CommandDispatcher::new(
                deps.runner.clone(),
                settings.dispatch_timeout,
                deps.metrics.clone(),
            )),
            output: Arc::new(OutputLogReader::new(settings.output_log.clone())),
            metrics: deps.metrics.clone(),
        }
    }

    fn bind_requester(&self, owner: OwnerIdentity) {
        self.dispatcher.bind_requester(owner);
    }

    fn record(&self, route: &'static str, outcome: &'static str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_request(route, outcome);
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).fallback(not_found))
        .route("/comment", get(comment).fallback(not_found))
        .route("/output", get(output).fallback(not_found))
        .fallback(not_found)
        .with_state(state)
}

/// Provisions the request key (generating it if needed) and returns it.
pub async fn show_key(settings: &Settings) -> anyhow::Result<RequestKey> {
    let store = Arc::new(FileConfigStore::new(settings.config_dir.clone()));
    let config = SecretProvisioner::new(store, settings.config_name.clone(), None)
        .provision()
        .await?;
    config
        .request_key()
        .context("provisioned config has no request key")
}

pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let (metrics, provider) = if let Some(ref endpoint) = settings.otlp_endpoint {
        let (provider, metrics) = telemetry::init_metrics(endpoint, "comment-relayd")?;
        (Some(Arc::new(metrics)), Some(provider))
    } else {
        (None, None)
    };

    let deps = RelayDependencies::from_settings(&settings, metrics)?;
    let mut server = RelayServer::new(settings, deps);
    server.load().await?;
    if server.ready().await != LifecycleState::Listening {
        warn!("msg" = "comment relay is not serving; restart to retry");
    }

    shutdown_signal().await;
    server.unload().await;

    if let Some(provider) = provider {
        if let Err(e) = telemetry::shutdown_metrics(provider) {
            warn!("Failed to shutdown telemetry: {}", e);
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = ctrl_c().await;
    info!("msg" = "shutdown signal received");
}

fn caller_ip(connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn index(State(state): State<AppState>) -> Html<&'static str> {
    state.record("index", "ok");
    Html(INDEX_HTML)
}

async fn not_found(State(state): State<AppState>, uri: Uri) -> impl IntoResponse {
    state.record("fallback", "not_found");
    tracing::debug!(path = %uri.path(), "no route matched");
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        USAGE_HINT,
    )
}

async fn output(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> impl IntoResponse {
    let caller_ip = caller_ip(connect_info.as_ref());
    info!(%caller_ip, path = %state.output.path().display(), "serving output log");
    let body = state.output.read_contents().await;
    state.record("output", "ok");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
}

async fn comment(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    query: Option<Query<Vec<(String, String)>>>,
) -> Response {
    let pairs = query.map(|Query(pairs)| pairs).unwrap_or_default();
    let request = IncomingCommentRequest::from_query(
        CommentQuery::from_pairs(pairs),
        caller_ip(connect_info.as_ref()),
    );

    let comment = match RequestValidator::validate(&request) {
        Ok(comment) => comment,
        Err(err) => {
            info!(caller_ip = %request.caller_ip, reason = %err, "rejected comment request");
            state.record("comment", err.code());
            return ApiError::new(err.status(), err.code(), err.to_string()).into_response();
        }
    };

    if !state.authenticator.authenticate(request.key.as_deref()).await {
        let reason = match request.key.as_deref() {
            None | Some("") => "missing key",
            Some(_) => "invalid key",
        };
        warn!(caller_ip = %request.caller_ip, %reason, "rejected unauthenticated comment request");
        state.record("comment", "forbidden");
        return ApiError::forbidden("invalid_key", "missing or invalid key").into_response();
    }

    info!(
        caller_ip = %request.caller_ip,
        amount = %comment.amount,
        receiving_id = %comment.receiving_id,
        "dispatching comment command"
    );
    let response = state.dispatcher.relay_comment(comment).await;
    state.record("comment", outcome_label(response.status));
    response.into_response()
}

fn outcome_label(status: StatusCode) -> &'static str {
    match status {
        StatusCode::OK => "ok",
        StatusCode::GATEWAY_TIMEOUT => "timeout",
        StatusCode::SERVICE_UNAVAILABLE => "unavailable",
        _ => "failed",
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status;
        let body = Json(self.body);
        (status, body).into_response()
    }
}
