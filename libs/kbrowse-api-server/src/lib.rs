use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use kbrowse_api::{now_ms, ErrorKind, MessageQuery, QueryKind};
use kbrowse_engine::{MessageSearch, SearchError};

#[derive(Clone)]
struct AppState {
    search: Arc<MessageSearch>,
}

/// Build the HTTP routes over a search service.
pub fn router(search: Arc<MessageSearch>) -> Router {
    Router::new()
        .route("/api/topics/{name}/offsets", get(handle_topic_offsets))
        .route("/api/topics/{name}/messages", get(handle_find_messages))
        .with_state(AppState { search })
}

/// Serve the search API until `shutdown` is cancelled.
pub async fn run(
    port: u16,
    search: Arc<MessageSearch>,
    shutdown: CancellationToken,
) -> Result<(), String> {
    let app = router(search);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|e| format!("bind api :{port}: {e}"))?;
    tracing::info!(port, "search api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| format!("axum serve: {e}"))?;

    Ok(())
}

// --- REST: GET /api/topics/{name}/offsets ---

async fn handle_topic_offsets(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.search.topic_offsets(&name).await {
        Ok(offsets) => Json(offsets).into_response(),
        Err(e) => error_response(&e),
    }
}

// --- REST: GET /api/topics/{name}/messages?kind=&value=&key=&from=&to= ---

#[derive(Debug, Deserialize)]
struct FindMessagesParams {
    kind: String,
    #[serde(default)]
    value: String,
    key: Option<String>,
    /// Window start, Unix ms. Defaults to the beginning of time.
    from: Option<i64>,
    /// Window end, Unix ms. Defaults to now.
    to: Option<i64>,
}

impl FindMessagesParams {
    fn into_query(self) -> Result<(MessageQuery, i64, i64), SearchError> {
        let kind: QueryKind = self.kind.parse()?;
        let query = MessageQuery::from_parts(kind, self.value, self.key)?;
        Ok((query, self.from.unwrap_or(0), self.to.unwrap_or_else(now_ms)))
    }
}

async fn handle_find_messages(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<FindMessagesParams>,
) -> Response {
    let (query, from, to) = match params.into_query() {
        Ok(parts) => parts,
        Err(e) => return error_response(&e),
    };

    match state.search.search(&name, &query, from, to).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(&e),
    }
}

fn status_for(err: &SearchError) -> StatusCode {
    match err {
        SearchError::UnresolvedQuery(_) => StatusCode::BAD_REQUEST,
        SearchError::ClusterUnavailable(e) if e.kind == ErrorKind::NotFound => StatusCode::NOT_FOUND,
        SearchError::ClusterUnavailable(_) | SearchError::ShutDown => StatusCode::SERVICE_UNAVAILABLE,
        SearchError::AllPartitionsFailed { .. } => StatusCode::BAD_GATEWAY,
        SearchError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &SearchError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        tracing::warn!(error = %err, %status, "search request failed");
    }
    let body = serde_json::json!({
        "error": err.to_string(),
        "retryable": err.is_retryable(),
    });
    (status, Json(body)).into_response()
}
