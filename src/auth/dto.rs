use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::User;

/// Query string the provider sends back to the callback URL.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

/// Body of the application root.
#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub authenticated: bool,
    pub user: Option<PublicUser>,
}
