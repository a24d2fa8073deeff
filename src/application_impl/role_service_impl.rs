use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;

pub struct RealRoleService {
    role_repo: Arc<dyn RoleRepo>,
}

impl RealRoleService {
    pub fn new(role_repo: Arc<dyn RoleRepo>) -> Self {
        RealRoleService { role_repo }
    }

    fn normalize(input: RoleInput) -> Result<RoleInput, RoleError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(RoleError::InvalidInput("role name is required".to_string()));
        }
        let mut permissions: Vec<String> = Vec::new();
        for p in input.permissions {
            let p = p.trim().to_string();
            if p.is_empty() {
                return Err(RoleError::InvalidInput("empty permission name".to_string()));
            }
            if !permissions.contains(&p) {
                permissions.push(p);
            }
        }
        Ok(RoleInput { name, permissions })
    }
}

#[async_trait::async_trait]
impl RoleService for RealRoleService {
    async fn create_role(&self, input: RoleInput) -> Result<Role, RoleError> {
        let RoleInput { name, permissions } = Self::normalize(input)?;
        Ok(self.role_repo.create(&name, &permissions).await?)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, RoleError> {
        Ok(self.role_repo.list().await?)
    }

    async fn get_role(&self, role_id: RoleId) -> Result<Role, RoleError> {
        self.role_repo
            .get(role_id)
            .await?
            .ok_or(RoleError::RoleNotFound)
    }

    async fn update_role(&self, role_id: RoleId, input: RoleInput) -> Result<Role, RoleError> {
        let RoleInput { name, permissions } = Self::normalize(input)?;
        self.role_repo
            .update(role_id, &name, &permissions)
            .await?
            .ok_or(RoleError::RoleNotFound)
    }

    async fn delete_role(&self, role_id: RoleId) -> Result<(), RoleError> {
        if !self.role_repo.delete(role_id).await? {
            return Err(RoleError::RoleNotFound);
        }
        Ok(())
    }

    async fn permissions_for_role(&self, role_id: RoleId) -> Result<Vec<Permission>, RoleError> {
        Ok(self.get_role(role_id).await?.permissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::InMemoryRoleRepo;

    fn service() -> RealRoleService {
        RealRoleService::new(Arc::new(InMemoryRoleRepo::new()))
    }

    fn input(name: &str, perms: &[&str]) -> RoleInput {
        RoleInput {
            name: name.to_string(),
            permissions: perms.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn crud_round() {
        let s = service();
        let role = s
            .create_role(input(" editor ", &["posts.write", "posts.write", "posts.read"]))
            .await
            .unwrap();
        assert_eq!(role.name, "editor");
        assert_eq!(role.permissions.len(), 2);

        let updated = s
            .update_role(role.id, input("writer", &["posts.write"]))
            .await
            .unwrap();
        assert_eq!(updated.name, "writer");
        let perms = s.permissions_for_role(role.id).await.unwrap();
        assert_eq!(perms.len(), 1);
        assert_eq!(perms[0].name, "posts.write");

        assert_eq!(s.list_roles().await.unwrap().len(), 1);
        s.delete_role(role.id).await.unwrap();
        assert!(matches!(
            s.get_role(role.id).await,
            Err(RoleError::RoleNotFound)
        ));
        assert!(matches!(
            s.delete_role(role.id).await,
            Err(RoleError::RoleNotFound)
        ));
    }

    #[tokio::test]
    async fn names_are_unique_and_required() {
        let s = service();
        s.create_role(input("admin", &[])).await.unwrap();
        assert!(matches!(
            s.create_role(input("admin", &[])).await,
            Err(RoleError::NameTaken)
        ));
        assert!(matches!(
            s.create_role(input("  ", &[])).await,
            Err(RoleError::InvalidInput(_))
        ));
        assert!(matches!(
            s.update_role(RoleId(77), input("x", &[])).await,
            Err(RoleError::RoleNotFound)
        ));
    }
}
