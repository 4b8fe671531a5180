use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::Lidnr;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Membership number or e-mail address.
    #[validate(length(min = 1, message = "Login is required"))]
    pub login: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Checkbox value; any of `on`, `1`, `true` asks for a long-lived session.
    #[serde(default)]
    pub remember: Option<String>,
}

impl LoginRequest {
    pub fn remember(&self) -> bool {
        matches!(
            self.remember.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("on" | "1" | "true" | "yes")
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub lidnr: Lidnr,
    pub full_name: String,
    pub remember: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// The caller as the ACL sees them.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityResponse {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lidnr: Option<Lidnr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// The role followed by everything it inherits, in search order.
    pub roles: Vec<String>,
}
