use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use senselearn_application::{NewUser, UserRecord, UserRepository};
use senselearn_core::{AppError, AppResult};
use senselearn_domain::UserId;
use tokio::sync::RwLock;

/// Process-local user store. Email and username uniqueness are enforced on
/// insert.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn username_matches(user: &UserRecord, username: &str) -> bool {
    user.username
        .as_deref()
        .is_some_and(|existing| existing.eq_ignore_ascii_case(username))
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| username_matches(user, username))
            .cloned())
    }

    async fn create(&self, user: NewUser) -> AppResult<UserRecord> {
        let mut users = self.users.write().await;

        if users.values().any(|existing| existing.email == user.email) {
            return Err(AppError::Conflict(
                "An account with this email already exists".to_owned(),
            ));
        }

        if let Some(username) = user.username.as_deref()
            && users
                .values()
                .any(|existing| username_matches(existing, username))
        {
            return Err(AppError::Conflict("Username is already taken".to_owned()));
        }

        let record = UserRecord {
            id: UserId::new(),
            email: user.email,
            username: user.username,
            full_name: user.full_name,
            phone_number: user.phone_number,
            user_type: user.user_type,
            disability_type: user.disability_type,
            tutor_profile: user.tutor_profile,
            password_hash: user.password_hash,
            email_verified: false,
            created_at: Utc::now(),
        };
        users.insert(record.id, record.clone());

        Ok(record)
    }

    async fn update_password(&self, user_id: UserId, password_hash: &str) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))?;
        password_hash.clone_into(&mut user.password_hash);
        Ok(())
    }

    async fn mark_email_verified(&self, user_id: UserId) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))?;
        user.email_verified = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use senselearn_domain::UserType;

    use super::*;

    fn new_user(email: &str, username: Option<&str>) -> NewUser {
        NewUser {
            email: email.to_owned(),
            username: username.map(str::to_owned),
            full_name: "Ada Lovelace".to_owned(),
            phone_number: None,
            user_type: UserType::Student,
            disability_type: Some("none".to_owned()),
            tutor_profile: None,
            password_hash: "hash".to_owned(),
        }
    }

    #[tokio::test]
    async fn created_user_is_unverified_and_findable() -> AppResult<()> {
        let repository = InMemoryUserRepository::new();
        let user = repository
            .create(new_user("ada@senselearn.io", Some("ada")))
            .await?;

        assert!(!user.email_verified);
        assert_eq!(
            repository.find_by_id(user.id).await?.map(|found| found.email),
            Some("ada@senselearn.io".to_owned())
        );
        assert!(repository.find_by_username("ADA").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_or_username_conflicts() -> AppResult<()> {
        let repository = InMemoryUserRepository::new();
        repository
            .create(new_user("ada@senselearn.io", Some("ada")))
            .await?;

        let email = repository.create(new_user("ada@senselearn.io", None)).await;
        let username = repository
            .create(new_user("grace@senselearn.io", Some("Ada")))
            .await;
        assert!(matches!(email, Err(AppError::Conflict(_))));
        assert!(matches!(username, Err(AppError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn updates_apply_to_existing_users_only() -> AppResult<()> {
        let repository = InMemoryUserRepository::new();
        let user = repository.create(new_user("ada@senselearn.io", None)).await?;

        repository.update_password(user.id, "new-hash").await?;
        repository.mark_email_verified(user.id).await?;
        let stored = repository.find_by_email("ada@senselearn.io").await?;
        assert_eq!(
            stored.map(|user| (user.password_hash, user.email_verified)),
            Some(("new-hash".to_owned(), true))
        );

        let missing = repository.mark_email_verified(UserId::new()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
        Ok(())
    }
}
