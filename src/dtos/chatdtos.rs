use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::chatmodel::{Chat, ChatParticipant};

use super::{requestdtos::validate_not_blank, userdtos::page_window};

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct SendMessageDto {
    #[validate(custom = "validate_message_content")]
    pub content: String,
}

/// Messages are stored trimmed, so the limit applies to the trimmed text.
fn validate_message_content(content: &str) -> Result<(), ValidationError> {
    validate_not_blank(content)?;
    if content.trim().chars().count() > 4000 {
        let mut err = ValidationError::new("message_too_long");
        err.message = Some("Message must not exceed 4000 characters".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct MessageQueryDto {
    #[validate(range(min = 1, max = 100000))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<usize>,
}

impl MessageQueryDto {
    /// Returns `(limit, offset)`; a thread loads 100 messages per page.
    pub fn limit_offset(&self) -> (i64, i64) {
        page_window(self.page, self.limit.unwrap_or(100), 200)
    }
}

#[derive(Debug, Serialize)]
pub struct ChatDetailDto {
    #[serde(flatten)]
    pub chat: Chat,
    pub participants: Vec<ChatParticipant>,
}
