use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

use super::requestmodel::{RequestStatus, WagonType};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "bid_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    #[serde(alias = "PENDING")]
    Pending,
    #[serde(alias = "ACCEPTED")]
    Accepted,
    #[serde(alias = "REJECTED")]
    Rejected,
    /// Closed because the parent request was cancelled.
    #[serde(alias = "CANCELLED")]
    Cancelled,
    /// Pulled back by the carrier.
    Withdrawn,
}

impl BidStatus {
    pub fn to_str(&self) -> &str {
        match self {
            BidStatus::Pending => "pending",
            BidStatus::Accepted => "accepted",
            BidStatus::Rejected => "rejected",
            BidStatus::Cancelled => "cancelled",
            BidStatus::Withdrawn => "withdrawn",
        }
    }

    /// Every terminal status is reachable only from `Pending`.
    pub fn can_transition_to(&self, next: BidStatus) -> bool {
        *self == BidStatus::Pending && next != BidStatus::Pending
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Bid {
    pub id: Uuid,
    pub request_id: Uuid,
    pub carrier_id: Uuid,
    pub amount: BigDecimal,
    pub comment: Option<String>,
    pub status: BidStatus,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// A bid joined with the bidder's public profile fields.
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct BidWithCarrier {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub bid: Bid,
    pub carrier_name: String,
    pub carrier_company: Option<String>,
}

/// A bid joined with a summary of the request it targets.
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct BidWithRequest {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub bid: Bid,
    pub request_origin: String,
    pub request_destination: String,
    pub request_wagon_type: WagonType,
    pub request_loading_date: NaiveDate,
    pub request_status: RequestStatus,
    pub chat_id: Option<Uuid>,
}
