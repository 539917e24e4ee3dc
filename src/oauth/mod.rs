use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod client;
mod profile;

pub use client::OAuth2Provider;

/// Errors raised while talking to an OAuth provider.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("invalid provider configuration: {0}")]
    Config(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("profile request failed: {0}")]
    Profile(String),

    #[error("profile is missing `{0}`")]
    IncompleteProfile(&'static str),
}

/// Providers this service knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Github,
    Google,
    Facebook,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Github, Provider::Google, Provider::Facebook];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Provider::Github => "github",
            Provider::Google => "google",
            Provider::Facebook => "facebook",
        }
    }

    /// Prefix of the environment variables holding this provider's credentials.
    pub const fn env_prefix(&self) -> &'static str {
        match self {
            Provider::Github => "GITHUB",
            Provider::Google => "GOOGLE",
            Provider::Facebook => "FACEBOOK",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(Provider::Github),
            "google" => Ok(Provider::Google),
            "facebook" => Ok(Provider::Facebook),
            _ => Err(OAuthError::UnknownProvider(s.to_string())),
        }
    }
}

/// Identity returned by a provider after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// What the login flow needs from a provider.
#[async_trait]
pub trait SocialProvider: Send + Sync {
    fn provider(&self) -> Provider;

    /// URL the browser is sent to in order to start the login.
    fn authorization_url(&self) -> String;

    /// Trades the callback's authorization code for the user's profile.
    async fn exchange_code(&self, code: &str) -> Result<FederatedProfile, OAuthError>;
}

/// The providers enabled for this deployment.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<Provider, Arc<dyn SocialProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn SocialProvider>) {
        self.providers.insert(provider.provider(), provider);
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn SocialProvider>> {
        self.providers.get(&provider).cloned()
    }

    pub fn enabled(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.providers.contains_key(p))
            .collect()
    }
}
