use std::sync::Arc;

use axum::{
    extract::Query,
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    error::HttpError,
    middleware::{session_token, user_from_token},
    service::route_guard::resolve,
    AppState,
};

pub fn guard_handler() -> Router {
    Router::new().route("/", get(check_route))
}

#[derive(Debug, Deserialize)]
pub struct GuardQueryDto {
    pub path: String,
}

/// Tells the front end whether the current session may open `path`. A
/// missing or stale session is treated as anonymous.
pub async fn check_route(
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<GuardQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    if !query.path.starts_with('/') {
        return Err(HttpError::bad_request("path must start with /"));
    }

    let role = match session_token(&cookie_jar, &headers) {
        Some(token) => user_from_token(&app_state, token)
            .await
            .ok()
            .map(|user| user.role),
        None => None,
    };

    Ok(Json(resolve(&query.path, role)))
}
