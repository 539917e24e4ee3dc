use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use super::{FederatedProfile, OAuthError, Provider};

/// Fixed endpoints and scopes of a provider.
pub(crate) struct Endpoints {
    pub auth_url: &'static str,
    pub token_url: &'static str,
    pub profile_url: &'static str,
    /// Secondary endpoint listing the account's addresses, for profiles that
    /// hide the email.
    pub emails_url: Option<&'static str>,
    pub scopes: &'static [&'static str],
}

impl Provider {
    pub(crate) const fn endpoints(&self) -> Endpoints {
        match self {
            Provider::Github => Endpoints {
                auth_url: "https://github.com/login/oauth/authorize",
                token_url: "https://github.com/login/oauth/access_token",
                profile_url: "https://api.github.com/user",
                emails_url: Some("https://api.github.com/user/emails"),
                scopes: &["user:email"],
            },
            Provider::Google => Endpoints {
                auth_url: "https://accounts.google.com/o/oauth2/v2/auth",
                token_url: "https://oauth2.googleapis.com/token",
                profile_url: "https://openidconnect.googleapis.com/v1/userinfo",
                emails_url: None,
                scopes: &["openid", "profile", "email"],
            },
            Provider::Facebook => Endpoints {
                auth_url: "https://www.facebook.com/v19.0/dialog/oauth",
                token_url: "https://graph.facebook.com/v19.0/oauth/access_token",
                profile_url: "https://graph.facebook.com/v19.0/me?fields=id,name,email",
                emails_url: None,
                scopes: &["email"],
            },
        }
    }

    /// Maps the provider's profile document onto `{id, name, email}`.
    pub(crate) fn parse_profile(&self, doc: Value) -> Result<FederatedProfile, OAuthError> {
        let raw = match self {
            Provider::Github => {
                let user: GithubUser = from_value(doc)?;
                RawProfile {
                    id: Some(user.id.to_string()),
                    name: user.name.or(Some(user.login)),
                    email: user.email,
                }
            }
            Provider::Google => {
                let user: GoogleUser = from_value(doc)?;
                RawProfile {
                    id: user.sub,
                    name: user.name,
                    email: user.email,
                }
            }
            Provider::Facebook => {
                let user: FacebookUser = from_value(doc)?;
                RawProfile {
                    id: user.id,
                    name: user.name,
                    email: user.email,
                }
            }
        };
        raw.complete()
    }
}

/// True when the profile document carries no usable email.
pub(crate) fn lacks_email(doc: &Value) -> bool {
    doc.get("email")
        .and_then(Value::as_str)
        .map_or(true, str::is_empty)
}

/// Stores `email` on the profile document; non-object documents are left as they are.
pub(crate) fn set_email(doc: &mut Value, email: String) {
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("email".to_string(), Value::String(email));
    }
}

/// Picks an address from GitHub's `/user/emails` list: the primary verified
/// one, then any verified one, then the first listed.
pub(crate) fn pick_github_email(doc: Value) -> Result<Option<String>, OAuthError> {
    let emails: Vec<GithubEmail> = from_value(doc)?;
    let chosen = emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.iter().find(|e| e.verified))
        .or_else(|| emails.first());
    Ok(chosen.map(|e| e.email.clone()))
}

fn from_value<T: DeserializeOwned>(doc: Value) -> Result<T, OAuthError> {
    serde_json::from_value(doc)
        .map_err(|e| OAuthError::Profile(format!("unexpected profile shape: {e}")))
}

struct RawProfile {
    id: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

impl RawProfile {
    fn complete(self) -> Result<FederatedProfile, OAuthError> {
        let id = self
            .id
            .filter(|v| !v.is_empty())
            .ok_or(OAuthError::IncompleteProfile("id"))?;
        let email = self
            .email
            .filter(|v| !v.is_empty())
            .ok_or(OAuthError::IncompleteProfile("email"))?;
        Ok(FederatedProfile {
            id,
            name: self.name.unwrap_or_default(),
            email,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    verified: bool,
}

#[derive(Debug, Deserialize)]
struct GoogleUser {
    sub: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FacebookUser {
    id: Option<String>,
    name: Option<String>,
    email: Option<String>,
}
