use std::collections::HashMap;

use serde::Deserialize;

use crate::oauth::Provider;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub cookie_secure: bool,
}

/// Client credentials registered with a provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub app_url: String,
    pub session: SessionConfig,
    pub oauth_timeout_secs: u64,
    pub providers: HashMap<Provider, ProviderConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process env.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url =
            var("DATABASE_URL").ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;
        let app_url = var("APP_URL")
            .unwrap_or_else(|| "http://localhost:8080".into())
            .trim_end_matches('/')
            .to_string();

        let session = SessionConfig {
            secret: var("SESSION_SECRET")
                .ok_or_else(|| anyhow::anyhow!("SESSION_SECRET is not set"))?,
            issuer: var("SESSION_ISSUER").unwrap_or_else(|| "social-login".into()),
            audience: var("SESSION_AUDIENCE").unwrap_or_else(|| "social-login-web".into()),
            ttl_minutes: var("SESSION_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(120),
            cookie_secure: var("SESSION_COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };

        let oauth_timeout_secs = var("OAUTH_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10);

        let mut providers = HashMap::new();
        for provider in Provider::ALL {
            let prefix = provider.env_prefix();
            let (Some(client_id), Some(client_secret)) = (
                var(&format!("{prefix}_CLIENT_ID")),
                var(&format!("{prefix}_CLIENT_SECRET")),
            ) else {
                continue;
            };
            let redirect_uri = var(&format!("{prefix}_REDIRECT_URI"))
                .unwrap_or_else(|| format!("{app_url}/auth/{provider}/callback"));
            providers.insert(
                provider,
                ProviderConfig {
                    client_id,
                    client_secret,
                    redirect_uri,
                },
            );
        }

        Ok(Self {
            database_url,
            app_url,
            session,
            oauth_timeout_secs,
            providers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_missing() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/social"),
            ("SESSION_SECRET", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(cfg.app_url, "http://localhost:8080");
        assert_eq!(cfg.session.issuer, "social-login");
        assert_eq!(cfg.session.ttl_minutes, 120);
        assert!(!cfg.session.cookie_secure);
        assert_eq!(cfg.oauth_timeout_secs, 10);
        assert!(cfg.providers.is_empty());
    }

    #[test]
    fn provider_needs_both_id_and_secret() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/social"),
            ("SESSION_SECRET", "s3cret"),
            ("APP_URL", "https://login.example.com/"),
            ("GITHUB_CLIENT_ID", "gh-id"),
            ("GITHUB_CLIENT_SECRET", "gh-secret"),
            ("GOOGLE_CLIENT_ID", "only-an-id"),
        ]))
        .unwrap();

        assert_eq!(cfg.providers.len(), 1);
        let github = &cfg.providers[&Provider::Github];
        assert_eq!(github.client_id, "gh-id");
        assert_eq!(
            github.redirect_uri,
            "https://login.example.com/auth/github/callback"
        );
    }

    #[test]
    fn redirect_uri_can_be_overridden() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/social"),
            ("SESSION_SECRET", "s3cret"),
            ("FACEBOOK_CLIENT_ID", "fb"),
            ("FACEBOOK_CLIENT_SECRET", "fb-secret"),
            ("FACEBOOK_REDIRECT_URI", "https://other.example/cb"),
        ]))
        .unwrap();

        assert_eq!(
            cfg.providers[&Provider::Facebook].redirect_uri,
            "https://other.example/cb"
        );
    }

    #[test]
    fn missing_session_secret_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(err.to_string().contains("SESSION_SECRET"));
    }
}
