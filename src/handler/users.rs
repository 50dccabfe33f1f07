use std::sync::Arc;

use axum::{
    extract::Query,
    middleware,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde_json::json;
use validator::Validate;

use crate::{
    db::{chatdb::ChatExt, requestdb::RequestExt, userdb::UserExt},
    dtos::{
        FilterUserDto, ProfileUpdateDto, RequestQueryDto, Response, RoleUpdateDto, UserData,
        UserListResponseDto, UserPasswordUpdateDto, UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    service::{realtime::ChangeKind, route_guard::dashboard_for},
    utils::password,
    AppState,
};

pub fn users_handler() -> Router {
    Router::new()
        .route("/me", get(get_me).put(update_profile))
        .route("/dashboard", get(get_dashboard))
        .route("/password", put(update_user_password))
        .route(
            "/",
            get(get_users).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Admin])
            })),
        )
        .route(
            "/role",
            put(update_user_role).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Admin])
            })),
        )
}

pub async fn get_me(
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user.user),
        },
    }))
}

pub async fn update_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<ProfileUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.is_empty() {
        return Err(HttpError::bad_request("Nothing to update"));
    }

    let result = app_state
        .db_client
        .update_profile(
            user.user.id,
            body.full_name.as_deref().map(str::trim),
            body.company_name.as_deref().map(str::trim),
            body.phone.as_deref().map(str::trim),
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    app_state.realtime.publish_profile(ChangeKind::Update, &result);

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&result),
        },
    }))
}

/// Landing data for the role dashboard the front end routes to.
pub async fn get_dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let user = user.user;

    let unread_messages = app_state
        .db_client
        .get_unread_count(user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let posted_requests = match user.role {
        UserRole::Shipper => Some(
            app_state
                .db_client
                .count_requests_by_shipper(user.id)
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?,
        ),
        _ => None,
    };

    Ok(Json(json!({
        "status": "success",
        "data": {
            "role": user.role.to_str(),
            "dashboard": dashboard_for(user.role),
            "unread_messages": unread_messages,
            "posted_requests": posted_requests,
        }
    })))
}

pub async fn get_users(
    Query(query_params): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (limit, offset) = query_params.limit_offset();

    let users = app_state
        .db_client
        .get_users(limit, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let user_count = app_state
        .db_client
        .get_user_count()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results: user_count,
    }))
}

pub async fn update_user_role(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<RoleUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.target_user_id == user.user.id && body.role != UserRole::Admin {
        return Err(HttpError::bad_request("Admins cannot demote themselves"));
    }

    let result = app_state
        .db_client
        .update_user_role(body.target_user_id, body.role)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let updated = result.ok_or_else(|| HttpError::not_found(ErrorMessage::UserNoLongerExist.to_string()))?;

    tracing::info!(
        "admin {} set role of {} to {}",
        user.user.id,
        updated.id,
        updated.role.to_str()
    );
    app_state.realtime.publish_profile(ChangeKind::Update, &updated);

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&updated),
        },
    }))
}

pub async fn update_user_password(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<UserPasswordUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = user.user;

    let password_match = password::compare(&body.old_password, &user.password)
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if !password_match {
        return Err(HttpError::bad_request("Old password is incorrect".to_string()));
    }

    let hash_password = password::hash(&body.new_password)
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    app_state
        .db_client
        .update_user_password(user.id, hash_password)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(Response {
        message: "Password updated Successfully".to_string(),
        status: "success",
    }))
}
