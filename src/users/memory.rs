use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo::UserStore,
    repo_types::{NewUser, User},
};

/// `UserStore` over a vector, with the same conflict rules as the `users` table.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<User> {
        self.rows.lock().expect("user rows lock").clone()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_identity(&self, email: &str, social_id: &str) -> anyhow::Result<Option<User>> {
        let rows = self.rows.lock().expect("user rows lock");
        Ok(rows
            .iter()
            .find(|u| u.email == email && u.social_id.as_deref() == Some(social_id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let rows = self.rows.lock().expect("user rows lock");
        Ok(rows.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_if_absent(&self, new: &NewUser) -> anyhow::Result<Option<User>> {
        let mut rows = self.rows.lock().expect("user rows lock");
        // Like SQL, a NULL social_id never conflicts.
        let taken = new.social_id.is_some()
            && rows
                .iter()
                .any(|u| u.email == new.email && u.social_id == new.social_id);
        if taken {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            email: new.email.clone(),
            password: new.password.clone(),
            social_id: new.social_id.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(user.clone());
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, social_id: Option<&str>) -> NewUser {
        NewUser {
            name: "Ann".into(),
            email: email.into(),
            password: "hash".into(),
            social_id: social_id.map(Into::into),
        }
    }

    #[tokio::test]
    async fn second_insert_of_same_identity_is_refused() {
        let store = MemoryUserStore::new();
        let first = store.insert_if_absent(&new_user("a@x.com", Some("42"))).await.unwrap();
        let second = store.insert_if_absent(&new_user("a@x.com", Some("42"))).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(store.all().len(), 1);
    }

    #[tokio::test]
    async fn null_social_ids_never_conflict() {
        let store = MemoryUserStore::new();
        store.insert_if_absent(&new_user("a@x.com", None)).await.unwrap();
        store.insert_if_absent(&new_user("a@x.com", None)).await.unwrap();
        assert_eq!(store.all().len(), 2);
    }

    #[tokio::test]
    async fn identity_lookup_requires_both_fields() {
        let store = MemoryUserStore::new();
        let user = store
            .insert_if_absent(&new_user("a@x.com", Some("42")))
            .await
            .unwrap()
            .unwrap();

        let hit = store.find_by_identity("a@x.com", "42").await.unwrap();
        assert_eq!(hit.map(|u| u.id), Some(user.id));
        assert!(store.find_by_identity("a@x.com", "43").await.unwrap().is_none());
        assert!(store.find_by_identity("b@x.com", "42").await.unwrap().is_none());
        assert!(store.find_by_id(user.id).await.unwrap().is_some());
    }
}
