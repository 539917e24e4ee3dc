use anyhow::Context;
use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
use rand::{rngs::OsRng, seq::SliceRandom};
use tracing::{error, info, instrument};

use crate::{
    oauth::FederatedProfile,
    users::{NewUser, User, UserStore},
};

const PLACEHOLDER_ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyz";
const ALPHABET_REPEATS: usize = 5;
const PLACEHOLDER_LEN: usize = 5;

/// Throwaway credential for federated accounts; nobody ever logs in with it.
/// Shuffles the alphabet repeated five times and keeps the first five chars,
/// so a character may appear more than once.
pub fn placeholder_password() -> String {
    let mut pool: Vec<char> = PLACEHOLDER_ALPHABET.repeat(ALPHABET_REPEATS).chars().collect();
    pool.shuffle(&mut rand::thread_rng());
    pool.into_iter().take(PLACEHOLDER_LEN).collect()
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Outcome of reconciling a federated profile with the local users.
#[derive(Debug)]
pub struct Resolved {
    pub user: User,
    pub created: bool,
}

/// Returns the user matching `profile` by email AND social id, creating it if
/// absent.
///
/// A row that shares the email but has no social id (a password signup) does
/// not match, so a second row with the same email is created.
///
/// When a concurrent login inserts the same identity first, the insert is
/// refused and the winner's row is returned with `created == false`.
#[instrument(skip(users, profile), fields(social_id = %profile.id))]
pub async fn find_or_create_user(
    users: &dyn UserStore,
    profile: &FederatedProfile,
) -> anyhow::Result<Resolved> {
    if let Some(user) = users.find_by_identity(&profile.email, &profile.id).await? {
        return Ok(Resolved {
            user,
            created: false,
        });
    }

    let new = NewUser {
        name: profile.name.clone(),
        email: profile.email.clone(),
        password: hash_password(&placeholder_password())?,
        social_id: Some(profile.id.clone()),
    };

    if let Some(user) = users.insert_if_absent(&new).await? {
        info!(user_id = %user.id, email = %user.email, "user created from federated login");
        return Ok(Resolved {
            user,
            created: true,
        });
    }

    // Lost an insert race; the winner's row is visible now.
    let user = users
        .find_by_identity(&profile.email, &profile.id)
        .await?
        .context("user vanished after insert conflict")?;
    Ok(Resolved {
        user,
        created: false,
    })
}
