use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[serde(alias = "active", alias = "OPEN")]
    Open,
    #[serde(alias = "closed", alias = "IN_PROGRESS")]
    InProgress,
    #[serde(alias = "COMPLETED")]
    Completed,
    #[serde(alias = "CANCELLED")]
    Cancelled,
}

impl RequestStatus {
    pub fn to_str(&self) -> &str {
        match self {
            RequestStatus::Open => "open",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn accepts_bids(&self) -> bool {
        *self == RequestStatus::Open
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Open, RequestStatus::InProgress)
                | (RequestStatus::Open, RequestStatus::Cancelled)
                | (RequestStatus::InProgress, RequestStatus::Completed)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "wagon_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WagonType {
    Covered,
    Gondola,
    Flatcar,
    Tank,
    Hopper,
}

/// A shipper's posted transport job.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct CargoRequest {
    pub id: Uuid,
    pub shipper_id: Uuid,
    pub title: Option<String>,
    pub origin: String,
    pub destination: String,
    pub cargo_description: String,
    pub wagon_type: WagonType,
    pub wagon_count: i32,
    pub loading_date: NaiveDate,
    pub target_price: BigDecimal,
    pub status: RequestStatus,
    pub accepted_carrier_id: Option<Uuid>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct RequestWithBidStats {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub request: CargoRequest,
    pub bid_count: i64,
    pub pending_bid_count: i64,
    pub lowest_pending_amount: Option<BigDecimal>,
}

#[derive(Debug, Default, Clone)]
pub struct OpenRequestFilter {
    pub wagon_type: Option<WagonType>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}
