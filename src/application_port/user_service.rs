use crate::domain_model::{PageParams, Permission, RoleId, User, UserId};
use crate::domain_port::RepoError;
use crate::i18n::Locale;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("email is already taken")]
    EmailTaken,
    #[error("user not found")]
    UserNotFound,
    #[error("role not found")]
    RoleNotFound,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid or expired reset token")]
    InvalidOrExpiredToken,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct UpdateUserInput {
    pub name: String,
    pub email: String,
    /// Empty keeps the current password.
    pub password: String,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn create_user(&self, input: CreateUserInput) -> Result<User, UserError>;
    async fn get_user(&self, user_id: UserId) -> Result<User, UserError>;
    async fn list_users(&self, page: PageParams) -> Result<(Vec<User>, u64), UserError>;
    async fn update_user(&self, user_id: UserId, input: UpdateUserInput)
    -> Result<User, UserError>;
    async fn delete_user(&self, user_id: UserId) -> Result<(), UserError>;
    async fn permissions_for_user(&self, user_id: UserId) -> Result<Vec<Permission>, UserError>;
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<(), UserError>;
}

#[async_trait::async_trait]
pub trait PasswordResetService: Send + Sync {
    /// Issues a reset token and mails it. Unknown emails succeed silently.
    async fn request_reset(&self, email: &str, locale: &Locale) -> Result<(), UserError>;
    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), UserError>;
}

impl From<RepoError> for UserError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate(_) => UserError::EmailTaken,
            RepoError::MissingReference(e) | RepoError::Store(e) => UserError::Store(e),
        }
    }
}

impl From<super::AuthError> for UserError {
    fn from(err: super::AuthError) -> Self {
        UserError::InternalError(err.to_string())
    }
}
