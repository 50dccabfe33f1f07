use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use validator::{Validate, ValidationError};

use crate::utils::money::validate_positive_amount;

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateBidDto {
    #[validate(custom = "validate_positive_amount")]
    pub amount: BigDecimal,

    #[validate(custom = "validate_comment")]
    pub comment: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateBidDto {
    #[validate(custom = "validate_positive_amount")]
    pub amount: Option<BigDecimal>,

    #[validate(custom = "validate_comment")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BidAction {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondBidDto {
    pub action: BidAction,
}

/// Length is counted on the trimmed text, the form it is stored in.
fn validate_comment(comment: &str) -> Result<(), ValidationError> {
    if comment.trim().chars().count() > 1000 {
        let mut err = ValidationError::new("comment_too_long");
        err.message = Some("Comment must not exceed 1000 characters".into());
        return Err(err);
    }
    Ok(())
}

/// Blank comments are stored as NULL.
pub fn normalize_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}
