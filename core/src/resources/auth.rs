use tracing::{debug, info};

use crate::client::{ApiClient, RequestOptions};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::types::{LoginRequest, TokenResponse, User};

/// `/auth` endpoints plus the login/logout flows built on them.
#[derive(Debug, Clone, Copy)]
pub struct Auth<'a> {
    client: &'a ApiClient,
}

impl<'a> Auth<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a bearer token. Does not store it.
    pub fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.client
            .request_json(HttpMethod::Post, "/auth/login", RequestOptions::json(&body)?)
    }

    /// Profile of the user owning the current token.
    pub fn me(&self) -> Result<User, ApiError> {
        self.client
            .request_json(HttpMethod::Get, "/auth/me", RequestOptions::new())
    }

    /// Log in, persist the token and return the signed-in profile.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let token = self.login(email, password)?;
        self.client.set_token(Some(&token.access_token));
        let user = self.me()?;
        info!(user_id = user.id, "signed in");
        Ok(user)
    }

    pub fn sign_out(&self) {
        self.client.clear_token();
        info!("signed out");
    }

    /// Re-validate the stored token.
    ///
    /// Returns `Ok(None)` without a request when no token is stored. Any
    /// HTTP failure drops the token and also yields `Ok(None)`; transport
    /// failures are returned as errors and leave the token in place.
    pub fn refresh_me(&self) -> Result<Option<User>, ApiError> {
        if self.client.get_token().is_none() {
            return Ok(None);
        }
        match self.me() {
            Ok(user) => Ok(Some(user)),
            Err(err @ ApiError::Transport(_)) => Err(err),
            Err(err) => {
                debug!(error = %err, "stored session rejected");
                self.client.clear_token();
                Ok(None)
            }
        }
    }
}
