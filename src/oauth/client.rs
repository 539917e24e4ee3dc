use std::time::Duration;

use async_trait::async_trait;
use oauth2::{
    basic::BasicClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use tracing::{debug, instrument, warn};

use super::{
    profile::{lacks_email, pick_github_email, set_email},
    FederatedProfile, OAuthError, Provider, SocialProvider,
};
use crate::config::ProviderConfig;

type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Authorization-code flow against one provider, backed by the `oauth2` crate.
pub struct OAuth2Provider {
    provider: Provider,
    client: ConfiguredClient,
    http: reqwest::Client,
}

impl OAuth2Provider {
    pub fn new(
        provider: Provider,
        config: &ProviderConfig,
        timeout: Duration,
    ) -> Result<Self, OAuthError> {
        let endpoints = provider.endpoints();
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(
                AuthUrl::new(endpoints.auth_url.to_string())
                    .map_err(|e| OAuthError::Config(format!("auth url: {e}")))?,
            )
            .set_token_uri(
                TokenUrl::new(endpoints.token_url.to_string())
                    .map_err(|e| OAuthError::Config(format!("token url: {e}")))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.clone())
                    .map_err(|e| OAuthError::Config(format!("redirect uri: {e}")))?,
            );

        // Token endpoints must not be followed through redirects.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OAuthError::Config(format!("http client: {e}")))?;

        Ok(Self {
            provider,
            client,
            http,
        })
    }

    async fn get_json(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<Option<serde_json::Value>, OAuthError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| OAuthError::Profile(e.to_string()))?;

        if !response.status().is_success() {
            warn!(%url, status = %response.status(), "provider request was not successful");
            return Ok(None);
        }

        let doc = response
            .json()
            .await
            .map_err(|e| OAuthError::Profile(format!("invalid json: {e}")))?;
        Ok(Some(doc))
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<FederatedProfile, OAuthError> {
        let endpoints = self.provider.endpoints();
        let mut doc = self
            .get_json(endpoints.profile_url, access_token)
            .await?
            .ok_or_else(|| OAuthError::Profile("profile request failed".into()))?;

        // Private addresses are only listed on the emails endpoint.
        if let Some(emails_url) = endpoints.emails_url.filter(|_| lacks_email(&doc)) {
            if let Some(emails) = self.get_json(emails_url, access_token).await? {
                if let Some(email) = pick_github_email(emails)? {
                    set_email(&mut doc, email);
                }
            }
        }

        self.provider.parse_profile(doc)
    }
}

#[async_trait]
impl SocialProvider for OAuth2Provider {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn authorization_url(&self) -> String {
        // The state parameter is generated but not verified on callback.
        let (url, _state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(
                self.provider
                    .endpoints()
                    .scopes
                    .iter()
                    .map(|s| Scope::new((*s).to_string())),
            )
            .url();
        url.to_string()
    }

    #[instrument(skip(self, code), fields(provider = %self.provider))]
    async fn exchange_code(&self, code: &str) -> Result<FederatedProfile, OAuthError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;
        debug!("authorization code exchanged");

        self.fetch_profile(token.access_token().secret()).await
    }
}
