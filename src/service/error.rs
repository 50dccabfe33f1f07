use thiserror::Error;
use uuid::Uuid;
use crate::{
    error::HttpError,
    models::{bidmodel::BidStatus, requestmodel::RequestStatus},
};
use axum::http::StatusCode;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Request {0} not found")]
    RequestNotFound(Uuid),

    #[error("Bid {0} not found")]
    BidNotFound(Uuid),

    #[error("Chat {0} not found")]
    ChatNotFound(Uuid),

    #[error("Request {0} is {} and cannot be changed this way", .1.to_str())]
    InvalidRequestStatus(Uuid, RequestStatus),

    #[error("Bid {0} is {} and cannot be changed this way", .1.to_str())]
    InvalidBidStatus(Uuid, BidStatus),

    #[error("User {0} does not own request {1}")]
    NotRequestOwner(Uuid, Uuid),

    #[error("User {0} did not place bid {1}")]
    NotBidOwner(Uuid, Uuid),

    #[error("User {0} is not a participant of chat {1}")]
    NotChatParticipant(Uuid, Uuid),

    #[error("Only carriers can bid on requests")]
    NotACarrier,

    #[error("You cannot bid on your own request")]
    OwnRequest,

    #[error("You already have a pending bid on request {0}")]
    DuplicateBid(Uuid),

    #[error("Request {0} already has an accepted bid")]
    AlreadyAccepted(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        match error {
            ServiceError::Database(ref err) => {
                tracing::error!("service database error: {}", err);
                HttpError::new(crate::error::ErrorMessage::ServerError.to_string(), status)
            }
            _ => HttpError::new(error.to_string(), status),
        }
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::RequestNotFound(_)
            | ServiceError::BidNotFound(_)
            | ServiceError::ChatNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::InvalidRequestStatus(_, _)
            | ServiceError::InvalidBidStatus(_, _)
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::NotRequestOwner(_, _)
            | ServiceError::NotBidOwner(_, _)
            | ServiceError::NotChatParticipant(_, _)
            | ServiceError::NotACarrier
            | ServiceError::OwnRequest => StatusCode::FORBIDDEN,

            ServiceError::DuplicateBid(_)
            | ServiceError::AlreadyAccepted(_) => StatusCode::CONFLICT,

            ServiceError::Database(sqlx::Error::Database(err)) if err.is_unique_violation() => StatusCode::CONFLICT,

            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_errors_map_to_http() {
        let id = Uuid::new_v4();
        let http: HttpError = ServiceError::BidNotFound(id).into();
        assert_eq!(http.status, StatusCode::NOT_FOUND);

        let http: HttpError = ServiceError::InvalidRequestStatus(id, RequestStatus::InProgress).into();
        assert_eq!(http.status, StatusCode::BAD_REQUEST);
        assert!(http.message.ends_with("is in_progress and cannot be changed this way"));

        let http: HttpError = ServiceError::InvalidBidStatus(id, BidStatus::Withdrawn).into();
        assert!(http.message.contains("is withdrawn"));

        let http: HttpError = ServiceError::NotRequestOwner(id, id).into();
        assert_eq!(http.status, StatusCode::FORBIDDEN);

        let http: HttpError = ServiceError::DuplicateBid(id).into();
        assert_eq!(http.status, StatusCode::CONFLICT);
    }

    #[test]
    fn database_details_are_not_leaked() {
        let http: HttpError = ServiceError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(http.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!http.message.contains("pool"));
    }
}
