use crate::domain_model::{Permission, Role, RoleId};
use crate::domain_port::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    #[error("role name is already taken")]
    NameTaken,
    #[error("role not found")]
    RoleNotFound,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("store error: {0}")]
    Store(String),
}

#[derive(Debug, Clone)]
pub struct RoleInput {
    pub name: String,
    pub permissions: Vec<String>,
}

#[async_trait::async_trait]
pub trait RoleService: Send + Sync {
    async fn create_role(&self, input: RoleInput) -> Result<Role, RoleError>;
    async fn list_roles(&self) -> Result<Vec<Role>, RoleError>;
    async fn get_role(&self, role_id: RoleId) -> Result<Role, RoleError>;
    async fn update_role(&self, role_id: RoleId, input: RoleInput) -> Result<Role, RoleError>;
    async fn delete_role(&self, role_id: RoleId) -> Result<(), RoleError>;
    async fn permissions_for_role(&self, role_id: RoleId) -> Result<Vec<Permission>, RoleError>;
}

impl From<RepoError> for RoleError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate(_) => RoleError::NameTaken,
            RepoError::MissingReference(e) | RepoError::Store(e) => RoleError::Store(e),
        }
    }
}
