//! services/api/src/adapters/google.rs
//!
//! Implements the `IdentityProvider` port with Google's OAuth 2.0
//! authorization code flow.

use async_trait::async_trait;
use meal_builder_core::domain::ExternalIdentity;
use meal_builder_core::ports::{IdentityProvider, PortError, PortResult};
use reqwest::Url;
use serde::Deserialize;
use tracing::{error, warn};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const PROVIDER: &str = "google";

/// An adapter that authenticates users against Google.
#[derive(Clone)]
pub struct GoogleIdentityAdapter {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl GoogleIdentityAdapter {
    pub fn new(
        client: reqwest::Client,
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> Self {
        Self {
            client,
            client_id,
            client_secret,
            redirect_url,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

#[async_trait]
impl IdentityProvider for GoogleIdentityAdapter {
    fn authorize_url(&self, state: &str) -> String {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_url.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("state", state),
        ];
        match Url::parse_with_params(AUTHORIZE_URL, &params) {
            Ok(url) => url.into(),
            // The base URL is a constant, so this only trips on a broken build.
            Err(_) => AUTHORIZE_URL.to_string(),
        }
    }

    async fn exchange_code(&self, code: &str) -> PortResult<ExternalIdentity> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            warn!("Google rejected the authorization code: {}", response.status());
            return Err(PortError::Unauthorized);
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Unreadable token response: {e}")))?;

        let info: UserInfo = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!("Failed to fetch Google user info: {:?}", e);
                PortError::Unexpected(format!("User info request failed: {e}"))
            })?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Unreadable user info: {e}")))?;

        let email = info.email.ok_or(PortError::Unauthorized)?;
        Ok(ExternalIdentity {
            provider: PROVIDER.to_string(),
            subject: info.sub,
            email,
            name: info.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_state_and_redirect() {
        let adapter = GoogleIdentityAdapter::new(
            reqwest::Client::new(),
            "client-123".into(),
            "secret".into(),
            "http://localhost:3000/auth/callback".into(),
        );
        let url = Url::parse(&adapter.authorize_url("abc")).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("state".into(), "abc".into())));
        assert!(pairs.contains(&("client_id".into(), "client-123".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "http://localhost:3000/auth/callback".into()
        )));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
    }
}
