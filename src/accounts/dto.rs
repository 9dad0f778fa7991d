use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for account creation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Returned by `create`: the caller's plaintext input plus the new id.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserId {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedEmail {
    pub email: String,
    pub email_verified: bool,
}
