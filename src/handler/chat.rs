use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::chatdb::ChatExt,
    dtos::{
        chatdtos::{ChatDetailDto, MessageQueryDto, SendMessageDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    models::{chatmodel::Chat, usermodel::UserRole},
    service::{
        error::ServiceError,
        realtime::{ChangeKind, Table},
    },
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/", get(get_user_chats))
        .route("/unread-count", get(get_unread_count))
        .route("/:chat_id", get(get_chat_details))
        .route("/:chat_id/messages", get(get_messages).post(send_message))
        .route("/:chat_id/read", put(mark_chat_as_read))
}

/// Loads the chat and checks that `user_id` takes part in it, unless
/// `admin_read` lets an admin look at it.
async fn participant_chat(
    app_state: &AppState,
    chat_id: Uuid,
    user_id: Uuid,
    admin_read: bool,
) -> Result<Chat, HttpError> {
    let chat = app_state
        .db_client
        .get_chat_by_id(chat_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or(ServiceError::ChatNotFound(chat_id))?;

    if admin_read {
        return Ok(chat);
    }

    let is_participant = app_state
        .db_client
        .is_chat_participant(chat_id, user_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if !is_participant {
        return Err(ServiceError::NotChatParticipant(user_id, chat_id).into());
    }

    Ok(chat)
}

pub async fn get_user_chats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let chats = app_state
        .db_client
        .get_user_chats(user.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success("Chats retrieved", chats)))
}

pub async fn get_chat_details(
    Path(chat_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let chat = participant_chat(
        &app_state,
        chat_id,
        user.user.id,
        user.user.role == UserRole::Admin,
    )
    .await?;

    let participants = app_state
        .db_client
        .get_chat_participants(chat_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Chat retrieved",
        ChatDetailDto { chat, participants },
    )))
}

pub async fn get_messages(
    Path(chat_id): Path<Uuid>,
    Query(query_params): Query<MessageQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    participant_chat(&app_state, chat_id, user.user.id, false).await?;

    let (limit, offset) = query_params.limit_offset();

    let messages = app_state
        .db_client
        .get_chat_messages(chat_id, limit, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    // opening the thread counts as reading it
    let stamped = app_state
        .db_client
        .mark_messages_as_read(chat_id, user.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    app_state
        .realtime
        .publish_all(Table::Messages, ChangeKind::Update, &stamped);

    Ok(Json(ApiResponse::success("Messages retrieved", messages)))
}

pub async fn send_message(
    Path(chat_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    participant_chat(&app_state, chat_id, user.user.id, false).await?;

    let message = app_state
        .db_client
        .send_message(chat_id, user.user.id, body.content.trim())
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    app_state
        .realtime
        .publish(Table::Messages, ChangeKind::Insert, &message);

    Ok((StatusCode::CREATED, Json(ApiResponse::success("Message sent", message))))
}

pub async fn mark_chat_as_read(
    Path(chat_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    participant_chat(&app_state, chat_id, user.user.id, false).await?;

    let stamped = app_state
        .db_client
        .mark_messages_as_read(chat_id, user.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    app_state
        .realtime
        .publish_all(Table::Messages, ChangeKind::Update, &stamped);

    Ok(Json(ApiResponse::success(
        "Chat marked as read",
        json!({ "marked": stamped.len() }),
    )))
}

pub async fn get_unread_count(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let unread = app_state
        .db_client
        .get_unread_count(user.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Unread count",
        json!({ "unread_count": unread }),
    )))
}
