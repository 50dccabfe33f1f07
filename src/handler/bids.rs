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
    db::{biddb::BidExt, userdb::UserExt},
    dtos::{
        biddtos::{BidAction, CreateBidDto, RespondBidDto, UpdateBidDto},
        ApiResponse, RequestQueryDto,
    },
    error::HttpError,
    mail::mails::send_bid_accepted_email,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    service::bid_service::AcceptedBid,
    AppState,
};

pub fn bids_handler() -> Router {
    let carrier_routes = Router::new()
        .route("/mine", get(list_my_bids))
        .route("/:bid_id", put(update_bid))
        .route("/:bid_id/withdraw", post(withdraw_bid))
        .route_layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::Carrier])
        }));

    let shipper_routes = Router::new()
        .route("/received", get(list_received_bids))
        .route("/:bid_id/respond", post(respond_to_bid))
        .route_layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::Shipper])
        }));

    Router::new().merge(carrier_routes).merge(shipper_routes)
}

pub async fn submit_bid(
    Path(request_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateBidDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let bid = app_state
        .bid_service
        .submit_bid(&user.user, request_id, body)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success("Bid submitted", bid))))
}

pub async fn list_my_bids(
    Query(query_params): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (limit, offset) = query_params.limit_offset();

    let bids = app_state
        .db_client
        .get_bids_by_carrier(user.user.id, limit, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success("Bids retrieved", bids)))
}

pub async fn list_received_bids(
    Query(query_params): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (limit, offset) = query_params.limit_offset();

    let bids = app_state
        .db_client
        .get_bids_for_shipper(user.user.id, limit, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success("Bids retrieved", bids)))
}

pub async fn update_bid(
    Path(bid_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdateBidDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.amount.is_none() && body.comment.is_none() {
        return Err(HttpError::bad_request("Nothing to update"));
    }

    let bid = app_state
        .bid_service
        .update_bid(user.user.id, bid_id, body)
        .await?;

    Ok(Json(ApiResponse::success("Bid updated", bid)))
}

pub async fn withdraw_bid(
    Path(bid_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let bid = app_state
        .bid_service
        .withdraw_bid(user.user.id, bid_id)
        .await?;

    Ok(Json(ApiResponse::success("Bid withdrawn", bid)))
}

pub async fn respond_to_bid(
    Path(bid_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<RespondBidDto>,
) -> Result<impl IntoResponse, HttpError> {
    match body.action {
        BidAction::Reject => {
            let bid = app_state
                .bid_service
                .reject_bid(user.user.id, bid_id)
                .await?;

            Ok(Json(ApiResponse::success("Bid rejected", json!({ "bid": bid }))))
        }
        BidAction::Accept => {
            let accepted = app_state
                .bid_service
                .accept_bid(user.user.id, bid_id)
                .await?;

            notify_carrier(app_state.clone(), &accepted);

            Ok(Json(ApiResponse::success("Bid accepted", json!(accepted))))
        }
    }
}

/// Mails the winning carrier in the background; failures are only logged.
fn notify_carrier(app_state: Arc<AppState>, accepted: &AcceptedBid) {
    let carrier_id = accepted.bid.carrier_id;
    let amount = accepted.bid.amount.clone();
    let origin = accepted.request.origin.clone();
    let destination = accepted.request.destination.clone();
    let chat_id = accepted.chat.id.to_string();

    tokio::spawn(async move {
        let carrier = match app_state.db_client.get_user(Some(carrier_id), None, None).await {
            Ok(Some(carrier)) => carrier,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("could not load carrier {} for notification: {}", carrier_id, e);
                return;
            }
        };

        if let Err(e) = send_bid_accepted_email(
            &app_state.env,
            &carrier.email,
            &carrier.full_name,
            &amount,
            &origin,
            &destination,
            &chat_id,
        )
        .await
        {
            tracing::error!("Failed to send bid accepted email: {}", e);
        }
    });
}
