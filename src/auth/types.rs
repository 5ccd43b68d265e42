//! Types for authentication and user management

use serde::{Deserialize, Serialize};

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: i64,

    /// Display name
    pub name: String,

    /// Email address; guests have none
    #[serde(default)]
    pub email: Option<String>,

    /// Whether this is an upgradeable guest account
    #[serde(default)]
    pub is_guest: bool,
}

/// Response of every endpoint that starts a session
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    /// Bearer token
    pub token: String,

    /// The user data
    pub user: User,
}

/// Response carrying only a message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// Response of `PATCH /users/me`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResetPasswordRequest<'a> {
    pub token: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateUserNameRequest<'a> {
    pub name: &'a str,
}
