use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[serde(alias = "owner", alias = "OWNER")]
    Shipper,
    #[serde(alias = "executor", alias = "EXECUTOR")]
    Carrier,
    Admin,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Shipper => "shipper",
            UserRole::Carrier => "carrier",
            UserRole::Admin => "admin",
        }
    }

    /// Roles a visitor may pick for themselves at sign-up.
    pub fn is_self_selectable(&self) -> bool {
        matches!(self, UserRole::Shipper | UserRole::Carrier)
    }
}

#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: uuid::Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub full_name: String,
    pub role: UserRole,
    pub company_name: Option<String>,
    pub phone: Option<String>,

    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}
