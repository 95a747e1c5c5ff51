//! Per-request pipeline: authenticate, resolve the input, translate, respond.

use crate::auth::is_authorized;
use crate::input::{is_remote_read_error, InputResolver};
use crate::response::RequestOutcome;
use crate::translate::{TranslateError, Translator};
use crate::types::{Config, QueryParams};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use std::sync::Arc;

/// Read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resolver: InputResolver,
    pub translator: Arc<dyn Translator>,
}

impl AppState {
    pub fn new(config: Config, translator: Arc<dyn Translator>) -> Result<Self, reqwest::Error> {
        let resolver = InputResolver::new(config.fetch_timeout)?;
        Ok(Self {
            config: Arc::new(config),
            resolver,
            translator,
        })
    }
}

/// Mounts [`convert_handler`] for every method on the configured sub-path.
///
/// A sub-path ending in `/` also serves everything below it; any other
/// sub-path matches exactly.
pub fn build_router(state: AppState) -> Router {
    let path = state.config.url_sub_path.clone();
    let mut router = Router::new().route(&path, any(convert_handler));
    if path.ends_with('/') {
        router = router.route(&format!("{path}*rest"), any(convert_handler));
    }
    router.with_state(state)
}

pub async fn convert_handler(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let (parts, body) = request.into_parts();
    let query = QueryParams::parse(parts.uri.query());

    let outcome = handle(&state, &query, &parts.headers, body).await;
    let status = outcome.status();
    match outcome.error_message() {
        None => log::debug!("{method} {path} -> {status}"),
        Some(reason) => log::warn!("{method} {path} -> {status}: {reason}"),
    }
    outcome.into_response()
}

async fn handle(
    state: &AppState,
    query: &QueryParams,
    headers: &HeaderMap,
    body: Body,
) -> RequestOutcome {
    if !is_authorized(query, headers, &state.config.auth_key) {
        return RequestOutcome::Unauthorized;
    }

    let input = match state.resolver.resolve(query, headers, body).await {
        Ok(input) => input,
        Err(err) => {
            log::debug!("input resolution failed: {err}");
            return err.into();
        }
    };

    let mut output = Vec::new();
    match state.translator.translate(input, &mut output).await {
        Ok(()) => RequestOutcome::Success(output),
        Err(TranslateError::Read(err)) if is_remote_read_error(&err) => {
            log::debug!("remote source failed mid-body: {err}");
            RequestOutcome::RemoteFetchFailed
        }
        Err(err) => {
            log::debug!("translation failed: {err}");
            RequestOutcome::TranslationFailed
        }
    }
}
