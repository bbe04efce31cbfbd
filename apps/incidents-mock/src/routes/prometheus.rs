use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use url::form_urlencoded;

use crate::error::{AppError, AppResult};
use crate::services::interception::{intercept_instant, intercept_range, Intercept};
use crate::services::series::{matrix_response, vector_response};
use crate::services::timeline::QueryWindow;
use crate::state::AppState;
use crate::time::parse_time_param;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct QueryParams {
    query: String,
    start: Option<i64>,
    end: Option<i64>,
    time: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Range,
    Instant,
}

/// Merges URL parameters with a form-encoded body (POST queries).
fn parse_params(raw_query: Option<&str>, headers: &HeaderMap, body: &[u8]) -> QueryParams {
    let mut params = QueryParams::default();
    let mut apply = |pairs: form_urlencoded::Parse<'_>| {
        for (key, value) in pairs {
            match key.as_ref() {
                "query" => params.query = value.into_owned(),
                "start" => params.start = parse_time_param(&value),
                "end" => params.end = parse_time_param(&value),
                "time" => params.time = parse_time_param(&value),
                _ => {}
            }
        }
    };
    if let Some(raw) = raw_query {
        apply(form_urlencoded::parse(raw.as_bytes()));
    }
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));
    if is_form && !body.is_empty() {
        apply(form_urlencoded::parse(body));
    }
    params
}

async fn query_range(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let params = parse_params(uri.query(), &headers, &body);
    let Some(installation) = state.installation().await else {
        return pass_through(&state, Endpoint::Range, method, uri, headers, body).await;
    };

    let window = QueryWindow::new(params.start, params.end);
    match intercept_range(&installation, &params.query, window) {
        Intercept::Matrix(result) => {
            tracing::debug!(query = %params.query, series = result.len(), "answered range query");
            Ok(Json(matrix_response(result)).into_response())
        }
        _ => pass_through(&state, Endpoint::Range, method, uri, headers, body).await,
    }
}

async fn query_instant(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let params = parse_params(uri.query(), &headers, &body);
    let Some(installation) = state.installation().await else {
        return pass_through(&state, Endpoint::Instant, method, uri, headers, body).await;
    };

    match intercept_instant(&installation, &params.query, params.time) {
        Intercept::Vector(result) => {
            tracing::debug!(query = %params.query, series = result.len(), "answered instant query");
            Ok(Json(vector_response(result)).into_response())
        }
        _ => pass_through(&state, Endpoint::Instant, method, uri, headers, body).await,
    }
}

async fn other_api(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    if state.config.upstream_url.is_none() {
        return Err(AppError::new(
            StatusCode::NOT_FOUND,
            format!("{} is not mocked and no upstream is configured", uri.path()),
        ));
    }
    forward(&state, method, &uri, &headers, body).await
}

/// Hands an unanswered query to the upstream Prometheus, or replies with an
/// empty result set when there is none.
async fn pass_through(
    state: &AppState,
    endpoint: Endpoint,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    if state.config.upstream_url.is_some() {
        return forward(state, method, &uri, &headers, body).await;
    }
    tracing::debug!(path = %uri.path(), "no upstream; replying with empty result");
    let response = match endpoint {
        Endpoint::Range => Json(matrix_response(Vec::new())).into_response(),
        Endpoint::Instant => Json(vector_response(Vec::new())).into_response(),
    };
    Ok(response)
}

async fn forward(
    state: &AppState,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let Some(base) = state.config.upstream_url.as_ref() else {
        return Err(AppError::bad_gateway("no upstream configured"));
    };

    let mut url = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        uri.path().trim_start_matches('/')
    );
    if let Some(query) = uri.query().map(str::trim).filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }

    let mut request = state.http.request(method, &url).body(body.to_vec());
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        request = request.header(header::CONTENT_TYPE, content_type);
    }
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        request = request.header(header::AUTHORIZATION, auth);
    }

    tracing::debug!(upstream = %url, "passing request through");
    let response = request.send().await.map_err(|err| {
        tracing::warn!(upstream = %url, error = %err, "upstream request failed");
        AppError::bad_gateway(format!("upstream request failed: {err}"))
    })?;
    let status = response.status();
    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = response.bytes().await.map_err(|err| {
        tracing::warn!(upstream = %url, error = %err, "upstream body read failed");
        AppError::bad_gateway(format!("upstream body read failed: {err}"))
    })?;

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder
        .body(Body::from(bytes))
        .map_err(crate::error::internal_error)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/query_range", get(query_range).post(query_range))
        .route("/api/v1/query", get(query_instant).post(query_instant))
        .route("/api/{*path}", any(other_api))
}
