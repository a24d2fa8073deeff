use super::RepoError;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait RoleRepo: Send + Sync {
    /// Permission names that do not exist yet are created.
    async fn create(&self, name: &str, permissions: &[String]) -> Result<Role, RepoError>;

    async fn list(&self) -> Result<Vec<Role>, RepoError>;

    async fn get(&self, role_id: RoleId) -> Result<Option<Role>, RepoError>;

    /// Replaces name and permission set. `None` when the role does not exist.
    async fn update(
        &self,
        role_id: RoleId,
        name: &str,
        permissions: &[String],
    ) -> Result<Option<Role>, RepoError>;

    async fn delete(&self, role_id: RoleId) -> Result<bool, RepoError>;
}
