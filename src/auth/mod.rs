//! Authentication and user management

mod session;
mod types;

pub use session::*;
pub use types::*;

use crate::client::ApiClient;
use crate::error::Result;

impl ApiClient {
    /// Create an account with email and password
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse> {
        let body = RegisterRequest {
            name,
            email,
            password,
        };
        self.send_anonymous(self.post("/auth/register").json(&body)?)
            .await
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = LoginRequest { email, password };
        self.send_anonymous(self.post("/auth/login").json(&body)?)
            .await
    }

    /// Start a guest session
    pub async fn guest_login(&self) -> Result<AuthResponse> {
        self.send_anonymous(self.post("/auth/guest")).await
    }

    /// Attach email and password to the current guest account
    pub async fn upgrade_account(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = LoginRequest { email, password };
        self.send(self.post("/auth/upgrade").json(&body)?).await
    }

    /// Request a password reset mail
    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse> {
        let body = ForgotPasswordRequest { email };
        self.send_anonymous(self.post("/auth/forgot-password").json(&body)?)
            .await
    }

    /// Set a new password using the token from the reset mail
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<MessageResponse> {
        let body = ResetPasswordRequest {
            token,
            new_password,
        };
        self.send_anonymous(self.post("/auth/reset-password").json(&body)?)
            .await
    }

    /// Change the display name of the current user
    pub async fn update_user_name(&self, name: &str) -> Result<UpdateUserResponse> {
        let body = UpdateUserNameRequest { name };
        self.send(self.patch("/users/me").json(&body)?).await
    }
}
