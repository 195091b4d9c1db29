//! Login and logout.
//!
//! Authentication is pluggable through [`LoginProvider`]. The built-in
//! [`ServiceLogin`] exchanges a provider token with the service's own login
//! route; whatever the provider returns becomes the client's current user and
//! is visible to every client sharing the same user cell.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{ApiCall, Client, Error, Result, User};

/// Future returned by [`LoginProvider::login`].
pub type LoginFuture<'a> = Pin<Box<dyn Future<Output = Result<User>> + Send + 'a>>;

/// Something able to authenticate a user against an identity provider.
pub trait LoginProvider: Send + Sync {
    /// Authenticate with `provider` using provider specific `parameters`.
    fn login<'a>(&'a self, provider: &'a str, parameters: Value) -> LoginFuture<'a>;
}

/// Logs in through the service's `login/{provider}` route.
///
/// The request goes through the client's filter chain like any invocation.
/// Client errors returned by the service surface as [`Error::Auth`].
#[derive(Debug, Clone)]
pub struct ServiceLogin {
    client: Client,
}

impl ServiceLogin {
    /// Log in through `client`.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginReply {
    user: LoginReplyUser,
    authentication_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginReplyUser {
    user_id: String,
}

impl LoginProvider for ServiceLogin {
    fn login<'a>(&'a self, provider: &'a str, parameters: Value) -> LoginFuture<'a> {
        Box::pin(async move {
            let outcome = self
                .client
                .invoke_json::<LoginReply>(ApiCall::login(provider), Some(parameters))
                .await;

            match outcome.into_result() {
                Ok(reply) => {
                    Ok(User::new(reply.user.user_id).with_token(reply.authentication_token))
                }
                Err(error) if error.is_client_error() => {
                    let message = match &error {
                        Error::Http { message, .. } => message.clone(),
                        other => other.to_string(),
                    };
                    Err(Error::auth(message))
                }
                Err(Error::Decode { message, .. }) => {
                    Err(Error::auth(format!("unexpected login response: {message}")))
                }
                Err(error) => Err(error),
            }
        })
    }
}

impl Client {
    /// Authenticate through `identity` and make the result the current user.
    ///
    /// On failure the current user is left untouched.
    pub async fn login(
        &self,
        identity: &dyn LoginProvider,
        provider: &str,
        parameters: Value,
    ) -> Result<User> {
        match identity.login(provider, parameters).await {
            Ok(user) => {
                info!(provider, user_id = user.user_id(), "logged in");
                self.set_current_user(Some(user.clone()));
                Ok(user)
            }
            Err(error) => {
                warn!(provider, %error, "login failed");
                Err(error)
            }
        }
    }

    /// Exchange a provider token through the service's login route.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let user = client
    ///     .login_with_token("facebook", serde_json::json!({"access_token": token}))
    ///     .await?;
    /// ```
    pub async fn login_with_token(&self, provider: &str, token: Value) -> Result<User> {
        let identity = ServiceLogin::new(self.clone());
        self.login(&identity, provider, token).await
    }

    /// Forget the current user and return it.
    pub fn logout(&self) -> Option<User> {
        let previous = self.set_current_user(None);
        if let Some(user) = &previous {
            info!(user_id = user.user_id(), "logged out");
        }
        previous
    }
}
