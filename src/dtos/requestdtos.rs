use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use validator::{Validate, ValidationError};

use crate::{
    models::{
        bidmodel::BidWithCarrier,
        requestmodel::{CargoRequest, OpenRequestFilter, WagonType},
    },
    utils::money::validate_price,
};

use super::RequestQueryDto;

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestDto {
    #[validate(length(max = 200, message = "Title is too long"))]
    pub title: Option<String>,

    #[validate(custom = "validate_not_blank", length(max = 200, message = "Origin is too long"))]
    pub origin: String,

    #[validate(custom = "validate_not_blank", length(max = 200, message = "Destination is too long"))]
    pub destination: String,

    #[validate(custom = "validate_not_blank", length(max = 2000, message = "Cargo description is too long"))]
    pub cargo_description: String,

    pub wagon_type: WagonType,

    #[validate(range(min = 1, max = 10000, message = "Wagon count must be greater than 0"))]
    pub wagon_count: i32,

    pub loading_date: NaiveDate,

    #[validate(custom = "validate_price")]
    pub target_price: BigDecimal,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateRequestDto {
    #[validate(length(max = 200, message = "Title is too long"))]
    pub title: Option<String>,

    #[validate(custom = "validate_not_blank", length(max = 200))]
    pub origin: Option<String>,

    #[validate(custom = "validate_not_blank", length(max = 200))]
    pub destination: Option<String>,

    #[validate(custom = "validate_not_blank", length(max = 2000))]
    pub cargo_description: Option<String>,

    pub wagon_type: Option<WagonType>,

    #[validate(range(min = 1, max = 10000, message = "Wagon count must be greater than 0"))]
    pub wagon_count: Option<i32>,

    pub loading_date: Option<NaiveDate>,

    #[validate(custom = "validate_price")]
    pub target_price: Option<BigDecimal>,
}

impl UpdateRequestDto {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.origin.is_none()
            && self.destination.is_none()
            && self.cargo_description.is_none()
            && self.wagon_type.is_none()
            && self.wagon_count.is_none()
            && self.loading_date.is_none()
            && self.target_price.is_none()
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[validate(schema(function = "validate_date_range"))]
pub struct OpenRequestQueryDto {
    pub wagon_type: Option<WagonType>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    #[validate(range(min = 1))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

impl OpenRequestQueryDto {
    pub fn filter(&self) -> OpenRequestFilter {
        OpenRequestFilter {
            wagon_type: self.wagon_type,
            date_from: self.date_from,
            date_to: self.date_to,
        }
    }

    pub fn pagination(&self) -> RequestQueryDto {
        RequestQueryDto { page: self.page, limit: self.limit }
    }
}

fn validate_date_range(query: &OpenRequestQueryDto) -> Result<(), ValidationError> {
    match (query.date_from, query.date_to) {
        (Some(from), Some(to)) if from > to => Err(ValidationError::new("date_from_after_date_to")),
        _ => Ok(()),
    }
}

pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct RequestDetailDto {
    #[serde(flatten)]
    pub request: CargoRequest,
    pub bids: Vec<BidWithCarrier>,
}
