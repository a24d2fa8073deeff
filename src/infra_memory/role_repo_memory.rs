use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Tables {
    next_role_id: u64,
    next_permission_id: u64,
    roles: BTreeMap<RoleId, (String, Vec<PermissionId>)>,
    permissions: BTreeMap<PermissionId, String>,
}

impl Tables {
    fn permission_ids(&mut self, names: &[String]) -> Vec<PermissionId> {
        let mut ids = Vec::new();
        for name in names {
            let existing = self
                .permissions
                .iter()
                .find(|(_, n)| *n == name)
                .map(|(id, _)| *id);
            let id = match existing {
                Some(id) => id,
                None => {
                    self.next_permission_id += 1;
                    let id = PermissionId(self.next_permission_id);
                    self.permissions.insert(id, name.clone());
                    id
                }
            };
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    fn name_taken(&self, name: &str, except: Option<RoleId>) -> bool {
        self.roles
            .iter()
            .any(|(id, (n, _))| n == name && Some(*id) != except)
    }

    fn role(&self, role_id: RoleId) -> Option<Role> {
        self.roles.get(&role_id).map(|(name, perms)| Role {
            id: role_id,
            name: name.clone(),
            permissions: perms
                .iter()
                .filter_map(|pid| {
                    self.permissions.get(pid).map(|n| Permission {
                        id: *pid,
                        name: n.clone(),
                    })
                })
                .collect(),
        })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRoleRepo {
    tables: Mutex<Tables>,
}

impl InMemoryRoleRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, RepoError> {
        self.tables
            .lock()
            .map_err(|e| RepoError::Store(e.to_string()))
    }

    /// Roles are looked up by the in-memory user repo to resolve permissions.
    pub(crate) fn snapshot(&self, role_id: RoleId) -> Result<Option<Role>, RepoError> {
        Ok(self.lock()?.role(role_id))
    }
}

#[async_trait::async_trait]
impl RoleRepo for InMemoryRoleRepo {
    async fn create(&self, name: &str, permissions: &[String]) -> Result<Role, RepoError> {
        let mut tables = self.lock()?;
        if tables.name_taken(name, None) {
            return Err(RepoError::Duplicate(name.to_string()));
        }
        let permission_ids = tables.permission_ids(permissions);
        tables.next_role_id += 1;
        let id = RoleId(tables.next_role_id);
        tables.roles.insert(id, (name.to_string(), permission_ids));
        tables
            .role(id)
            .ok_or_else(|| RepoError::Store("role vanished after insert".to_string()))
    }

    async fn list(&self) -> Result<Vec<Role>, RepoError> {
        let tables = self.lock()?;
        Ok(tables.roles.keys().filter_map(|id| tables.role(*id)).collect())
    }

    async fn get(&self, role_id: RoleId) -> Result<Option<Role>, RepoError> {
        self.snapshot(role_id)
    }

    async fn update(
        &self,
        role_id: RoleId,
        name: &str,
        permissions: &[String],
    ) -> Result<Option<Role>, RepoError> {
        let mut tables = self.lock()?;
        if !tables.roles.contains_key(&role_id) {
            return Ok(None);
        }
        if tables.name_taken(name, Some(role_id)) {
            return Err(RepoError::Duplicate(name.to_string()));
        }
        let permission_ids = tables.permission_ids(permissions);
        tables
            .roles
            .insert(role_id, (name.to_string(), permission_ids));
        Ok(tables.role(role_id))
    }

    async fn delete(&self, role_id: RoleId) -> Result<bool, RepoError> {
        Ok(self.lock()?.roles.remove(&role_id).is_some())
    }
}
