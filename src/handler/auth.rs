use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::Cookie;
use chrono::{Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use validator::Validate;

use crate::{
    db::userdb::UserExt,
    dtos::{
        FilterUserDto, ForgotPasswordRequestDto, LoginUserDto, RegisterUserDto, ResetPasswordRequestDto,
        Response, UserData, UserLoginResponseDto, UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    mail::mails::{send_forgot_password_email, RESET_TOKEN_MINUTES},
    service::realtime::ChangeKind,
    utils::{password, token},
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

fn session_cookie(value: String, max_age: time::Duration) -> Result<HeaderValue, HttpError> {
    let cookie = Cookie::build(("token", value))
        .path("/")
        .max_age(max_age)
        .http_only(true)
        .build();

    cookie
        .to_string()
        .parse()
        .map_err(|_| HttpError::server_error(ErrorMessage::ServerError.to_string()))
}

fn reset_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let hashed_password = password::hash(&body.password)
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let result = app_state
        .db_client
        .save_user(
            body.email.trim(),
            &hashed_password,
            body.full_name.trim(),
            body.role,
            body.company_name.as_deref().map(str::trim).filter(|c| !c.is_empty()),
            body.phone.as_deref().map(str::trim),
        )
        .await;

    match result {
        Ok(user) => {
            tracing::info!("registered {} as {}", user.id, user.role.to_str());
            app_state.realtime.publish_profile(ChangeKind::Insert, &user);
            Ok((
                axum::http::StatusCode::CREATED,
                Json(UserResponseDto {
                    status: "success".to_string(),
                    data: UserData {
                        user: FilterUserDto::filter_user(&user),
                    },
                }),
            ))
        }
        Err(e) => Err(HttpError::from_db(e, &ErrorMessage::EmailExist.to_string())),
    }
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let result = app_state
        .db_client
        .get_user(None, Some(body.email.trim()), None)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let user = result.ok_or(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    let password_matched = password::compare(&body.password, &user.password)
        .map_err(|_| HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    if !password_matched {
        tracing::warn!("failed login for {}", user.id);
        return Err(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()));
    }

    let token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| HttpError::server_error(e.to_string()))?;

    let cookie_duration = time::Duration::minutes(app_state.env.jwt_maxage * 60);
    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, session_cookie(token.clone(), cookie_duration)?);

    let mut response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        token,
        data: UserData {
            user: FilterUserDto::filter_user(&user),
        },
    })
    .into_response();
    response.headers_mut().extend(headers);

    Ok(response)
}

pub async fn logout() -> Result<impl IntoResponse, HttpError> {
    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        session_cookie(String::new(), time::Duration::seconds(-1))?,
    );

    let mut response = Json(Response {
        status: "success",
        message: "Logged out".to_string(),
    })
    .into_response();
    response.headers_mut().extend(headers);

    Ok(response)
}

pub async fn forgot_password(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ForgotPasswordRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let result = app_state
        .db_client
        .get_user(None, Some(body.email.trim()), None)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    // same answer whether or not the address is registered
    let response = Response {
        message: "If that e-mail is registered, a password reset link has been sent.".to_string(),
        status: "success",
    };

    let Some(user) = result else {
        tracing::debug!("password reset asked for unknown address");
        return Ok(Json(response));
    };

    let token = reset_token();
    let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_MINUTES);

    app_state
        .db_client
        .set_reset_token(user.id, &token, expires_at)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    // a mail failure must not reveal that the address exists
    if let Err(e) = send_forgot_password_email(&app_state.env, &user.email, &user.full_name, &token).await {
        tracing::error!("Failed to send forgot password email to {}: {}", user.id, e);
    }

    Ok(Json(response))
}

pub async fn reset_password(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ResetPasswordRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let result = app_state
        .db_client
        .get_user(None, None, Some(&body.token))
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let user = result.ok_or(HttpError::bad_request("Invalid or expired token".to_string()))?;

    match user.reset_token_expires_at {
        Some(expires_at) if Utc::now() <= expires_at => {}
        _ => return Err(HttpError::bad_request("Invalid or expired token".to_string())),
    }

    let hash_password = password::hash(&body.new_password)
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    app_state
        .db_client
        .update_user_password(user.id, hash_password)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!("password reset for {}", user.id);

    Ok(Json(Response {
        message: "Password has been successfully reset.".to_string(),
        status: "success",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_tokens_are_random_and_url_safe() {
        let a = reset_token();
        let b = reset_token();
        assert_eq!(a.len(), 48);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn logout_cookie_expires_immediately() {
        let value = session_cookie(String::new(), time::Duration::seconds(-1)).unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("token=;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=-1") || value.contains("Max-Age=0"));
    }

    fn state_with_broken_smtp(pool: sqlx::PgPool) -> Arc<AppState> {
        use crate::{
            config::Config,
            db::db::DBClient,
            service::{bid_service::BidService, realtime::RealtimeHub, request_service::RequestService},
        };

        let env = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://unused".to_string()),
            "JWT_SECRET_KEY" => Some("auth-test-secret".to_string()),
            // nothing listens here, every send fails
            "SMTP_HOST" => Some("127.0.0.1".to_string()),
            _ => None,
        })
        .unwrap();

        let db_client = Arc::new(DBClient::new(pool));
        let realtime = RealtimeHub::new(8);
        Arc::new(AppState {
            bid_service: BidService::new(db_client.clone(), realtime.clone()),
            request_service: RequestService::new(db_client.clone(), realtime.clone()),
            env,
            db_client,
            realtime,
        })
    }

    async fn ask_for_reset(state: Arc<AppState>, email: &str) -> (axum::http::StatusCode, Vec<u8>) {
        let body = ForgotPasswordRequestDto { email: email.to_string() };
        let response = forgot_password(Extension(state), Json(body))
            .await
            .unwrap()
            .into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a Postgres DATABASE_URL"]
    async fn reset_answer_does_not_depend_on_mail_delivery(pool: sqlx::PgPool) {
        let state = state_with_broken_smtp(pool);
        state
            .db_client
            .save_user("known@railmatch.test", "not-a-real-hash", "Known", crate::models::usermodel::UserRole::Carrier, None, None)
            .await
            .unwrap();

        let known = ask_for_reset(state.clone(), "known@railmatch.test").await;
        let unknown = ask_for_reset(state.clone(), "nobody@railmatch.test").await;

        assert_eq!(known.0, axum::http::StatusCode::OK);
        assert_eq!(known, unknown);

        let user = state
            .db_client
            .get_user(None, Some("known@railmatch.test"), None)
            .await
            .unwrap()
            .unwrap();
        assert!(user.reset_token.is_some());
    }
}
