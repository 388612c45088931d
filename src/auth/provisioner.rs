//! First-login user creation.

use std::sync::Arc;

use tracing::{debug, info};

use crate::db::{Repository, RepositoryResult, UserCreate, UserRecord};
use crate::types::UserId;

/// Creates local user records for verified subjects seen for the first time.
pub struct UserProvisioner<R> {
    repo: Arc<R>,
}

impl<R: Repository> UserProvisioner<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Make sure a local user exists for `user_id`.
    ///
    /// An existing record is returned unchanged; token claims never update a
    /// profile after it has been created. A missing user is only created
    /// when an email is available, otherwise `None` is returned.
    pub async fn ensure_user(
        &self,
        user_id: &UserId,
        email: Option<&str>,
        username: Option<&str>,
    ) -> RepositoryResult<Option<UserRecord>> {
        if let Some(user) = self.repo.get_user(user_id).await? {
            return Ok(Some(user));
        }

        let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
            debug!("No email in claims for {}, skipping provisioning", user_id);
            return Ok(None);
        };

        let username = username
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| user_id.default_username());

        let create = UserCreate {
            id: user_id.clone(),
            username,
            email: email.to_string(),
            is_admin: false,
        };

        match self.repo.create_user(&create).await {
            Ok(user) => {
                info!("Provisioned user {} ({})", user_id, user.username);
                Ok(Some(user))
            }
            // A concurrent first login for the same subject won the insert
            Err(e) if e.is_conflict() => match self.repo.get_user(user_id).await? {
                Some(user) => Ok(Some(user)),
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseConfig, SurrealRepository, create_connection, ensure_schema};

    async fn setup_provisioner() -> (UserProvisioner<SurrealRepository>, Arc<SurrealRepository>) {
        let db = create_connection(DatabaseConfig::memory()).await.unwrap();
        ensure_schema(&db).await.unwrap();
        let repo = Arc::new(SurrealRepository::new(db));
        (UserProvisioner::new(Arc::clone(&repo)), repo)
    }

    #[tokio::test]
    async fn test_creates_user_with_default_username() {
        let (provisioner, _) = setup_provisioner().await;
        let user_id = UserId::new("u1");

        let user = provisioner
            .ensure_user(&user_id, Some("u1@x.com"), None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(user.user_id(), user_id);
        assert_eq!(user.username, "user_u1");
        assert_eq!(user.email, "u1@x.com");
        assert!(!user.is_admin);
    }

    #[tokio::test]
    async fn test_uses_supplied_username() {
        let (provisioner, _) = setup_provisioner().await;

        let user = provisioner
            .ensure_user(&UserId::new("u2"), Some("u2@x.com"), Some("alice"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_without_email_nothing_is_created() {
        let (provisioner, repo) = setup_provisioner().await;
        let user_id = UserId::new("u3");

        let user = provisioner.ensure_user(&user_id, None, None).await.unwrap();
        assert!(user.is_none());
        assert!(repo.get_user(&user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_existing_user_is_not_updated() {
        let (provisioner, _) = setup_provisioner().await;
        let user_id = UserId::new("u4");

        provisioner
            .ensure_user(&user_id, Some("old@x.com"), Some("old"))
            .await
            .unwrap();
        let user = provisioner
            .ensure_user(&user_id, Some("new@x.com"), Some("new"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(user.email, "old@x.com");
        assert_eq!(user.username, "old");
    }

    #[tokio::test]
    async fn test_concurrent_first_logins_create_one_user() {
        let (provisioner, repo) = setup_provisioner().await;
        let provisioner = Arc::new(provisioner);
        let user_id = UserId::new("u5");

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let provisioner = Arc::clone(&provisioner);
                let user_id = user_id.clone();
                tokio::spawn(async move {
                    provisioner
                        .ensure_user(&user_id, Some("u5@x.com"), None)
                        .await
                })
            })
            .collect();

        for task in tasks {
            let user = task.await.unwrap().unwrap().unwrap();
            assert_eq!(user.user_id(), user_id);
        }

        let stored = repo.get_user_by_email("u5@x.com").await.unwrap();
        assert_eq!(stored.unwrap().user_id(), user_id);
    }

    #[tokio::test]
    async fn test_email_taken_by_another_subject_is_error() {
        let (provisioner, _) = setup_provisioner().await;

        provisioner
            .ensure_user(&UserId::new("u6"), Some("shared@x.com"), None)
            .await
            .unwrap();
        let err = provisioner
            .ensure_user(&UserId::new("u7"), Some("shared@x.com"), None)
            .await
            .unwrap_err();

        assert!(err.is_conflict());
    }
}
