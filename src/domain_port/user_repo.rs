use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("duplicate entry: {0}")]
    Duplicate(String),
    #[error("referenced row not found: {0}")]
    MissingReference(String),
    #[error("store error: {0}")]
    Store(String),
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `Duplicate` when the email is already registered.
    async fn create(&self, user: NewUser) -> Result<User, RepoError>;

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>, RepoError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Persists name, email and password hash.
    async fn update(&self, user: &User) -> Result<(), RepoError>;

    /// Soft delete. Returns false when no live row matched.
    async fn delete(&self, user_id: UserId) -> Result<bool, RepoError>;

    async fn list(&self, page: PageParams) -> Result<(Vec<User>, u64), RepoError>;

    /// Union of the permissions of every role held by the user, each listed once.
    async fn permissions_for(&self, user_id: UserId) -> Result<Vec<Permission>, RepoError>;

    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<(), RepoError>;

    async fn save_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepoError>;

    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, RepoError>;

    /// Stores the new hash and clears any pending reset token.
    async fn update_password(&self, user_id: UserId, password_hash: &str)
    -> Result<(), RepoError>;
}
