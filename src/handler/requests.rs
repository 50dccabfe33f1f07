use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::requestdb::RequestExt,
    dtos::{
        requestdtos::{CreateRequestDto, OpenRequestQueryDto, UpdateRequestDto},
        ApiResponse, RequestQueryDto,
    },
    error::HttpError,
    handler::bids::submit_bid,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn requests_handler() -> Router {
    let shipper_routes = Router::new()
        .route("/", post(create_request))
        .route("/mine", get(list_my_requests))
        .route("/:request_id", put(update_request))
        .route("/:request_id/cancel", post(cancel_request))
        .route("/:request_id/complete", post(complete_request))
        .route_layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::Shipper])
        }));

    let carrier_routes = Router::new()
        .route(
            "/open",
            get(list_open_requests).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Carrier, UserRole::Admin])
            })),
        )
        .route(
            "/:request_id/bids",
            post(submit_bid).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Carrier])
            })),
        );

    Router::new()
        .route("/:request_id", get(get_request))
        .merge(shipper_routes)
        .merge(carrier_routes)
}

pub async fn create_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let request = app_state
        .request_service
        .create_request(&user.user, &body)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Request created", request)),
    ))
}

pub async fn list_my_requests(
    Query(query_params): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (limit, offset) = query_params.limit_offset();

    let requests = app_state
        .db_client
        .get_requests_by_shipper(user.user.id, limit, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let total = app_state
        .db_client
        .count_requests_by_shipper(user.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "data": requests,
        "results": total,
    })))
}

pub async fn list_open_requests(
    Query(query_params): Query<OpenRequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (limit, offset) = query_params.pagination().limit_offset();

    let requests = app_state
        .db_client
        .get_open_requests(&query_params.filter(), limit, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success("Open requests", requests)))
}

pub async fn get_request(
    Path(request_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let detail = app_state
        .request_service
        .get_request_detail(&user.user, request_id)
        .await?;

    Ok(Json(ApiResponse::success("Request retrieved", detail)))
}

pub async fn update_request(
    Path(request_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdateRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let request = app_state
        .request_service
        .update_request(user.user.id, request_id, &body)
        .await?;

    Ok(Json(ApiResponse::success("Request updated", request)))
}

pub async fn cancel_request(
    Path(request_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let (request, cancelled_bids) = app_state
        .request_service
        .cancel_request(user.user.id, request_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Request cancelled",
        json!({
            "request": request,
            "cancelled_bids": cancelled_bids,
        }),
    )))
}

pub async fn complete_request(
    Path(request_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .request_service
        .complete_request(user.user.id, request_id)
        .await?;

    Ok(Json(ApiResponse::success("Request completed", request)))
}
