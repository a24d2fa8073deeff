use super::InMemoryRoleRepo;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct Row {
    user: User,
    deleted: bool,
    roles: BTreeSet<RoleId>,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: u64,
    rows: BTreeMap<UserId, Row>,
}

impl Tables {
    fn live(&self) -> impl Iterator<Item = &Row> {
        self.rows.values().filter(|r| !r.deleted)
    }

    fn live_mut(&mut self, user_id: UserId) -> Option<&mut Row> {
        self.rows.get_mut(&user_id).filter(|r| !r.deleted)
    }
}

/// Users held in process memory. Role membership is resolved against the
/// shared in-memory role repo.
pub struct InMemoryUserRepo {
    tables: Mutex<Tables>,
    roles: Arc<InMemoryRoleRepo>,
}

impl InMemoryUserRepo {
    pub fn new(roles: Arc<InMemoryRoleRepo>) -> Self {
        InMemoryUserRepo {
            tables: Mutex::new(Tables::default()),
            roles,
        }
    }

    /// Starts ids at `first_id` instead of 1.
    pub fn with_first_id(roles: Arc<InMemoryRoleRepo>, first_id: u64) -> Self {
        let repo = Self::new(roles);
        if let Ok(mut tables) = repo.tables.lock() {
            tables.next_id = first_id.saturating_sub(1);
        }
        repo
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepoError> {
        self.tables
            .lock()
            .map_err(|e| RepoError::Store(e.to_string()))
    }
}

#[async_trait::async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let mut tables = self.lock()?;
        // Soft-deleted rows keep their email reserved, as the unique index does in MySQL.
        if tables.rows.values().any(|r| r.user.email == user.email) {
            return Err(RepoError::Duplicate(user.email));
        }
        tables.next_id += 1;
        let now = Utc::now();
        let record = User {
            id: UserId(tables.next_id),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.rows.insert(
            record.id,
            Row {
                user: record.clone(),
                deleted: false,
                roles: BTreeSet::new(),
            },
        );
        Ok(record)
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>, RepoError> {
        let tables = self.lock()?;
        Ok(tables
            .rows
            .get(&user_id)
            .filter(|r| !r.deleted)
            .map(|r| r.user.clone()))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.lock()?;
        Ok(tables
            .live()
            .find(|r| r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn update(&self, user: &User) -> Result<(), RepoError> {
        let mut tables = self.lock()?;
        if tables
            .rows
            .values()
            .any(|r| r.user.email == user.email && r.user.id != user.id)
        {
            return Err(RepoError::Duplicate(user.email.clone()));
        }
        let row = tables
            .live_mut(user.id)
            .ok_or_else(|| RepoError::MissingReference(format!("user {}", user.id)))?;
        row.user.name = user.name.clone();
        row.user.email = user.email.clone();
        row.user.password_hash = user.password_hash.clone();
        row.user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, user_id: UserId) -> Result<bool, RepoError> {
        let mut tables = self.lock()?;
        match tables.live_mut(user_id) {
            Some(row) => {
                row.deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, page: PageParams) -> Result<(Vec<User>, u64), RepoError> {
        let tables = self.lock()?;
        let total = tables.live().count() as u64;
        let users = tables
            .live()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .map(|r| r.user.clone())
            .collect();
        Ok((users, total))
    }

    async fn permissions_for(&self, user_id: UserId) -> Result<Vec<Permission>, RepoError> {
        let role_ids: Vec<RoleId> = {
            let tables = self.lock()?;
            match tables.rows.get(&user_id).filter(|r| !r.deleted) {
                Some(row) => row.roles.iter().copied().collect(),
                None => return Ok(Vec::new()),
            }
        };

        let mut permissions: Vec<Permission> = Vec::new();
        for role_id in role_ids {
            if let Some(role) = self.roles.snapshot(role_id)? {
                for perm in role.permissions {
                    if !permissions.iter().any(|p| p.id == perm.id) {
                        permissions.push(perm);
                    }
                }
            }
        }
        Ok(permissions)
    }

    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<(), RepoError> {
        if self.roles.snapshot(role_id)?.is_none() {
            return Err(RepoError::MissingReference(format!("role {}", role_id)));
        }
        let mut tables = self.lock()?;
        let row = tables
            .live_mut(user_id)
            .ok_or_else(|| RepoError::MissingReference(format!("user {}", user_id)))?;
        row.roles.insert(role_id);
        Ok(())
    }

    async fn save_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        let mut tables = self.lock()?;
        let row = tables
            .live_mut(user_id)
            .ok_or_else(|| RepoError::MissingReference(format!("user {}", user_id)))?;
        row.user.reset_token_hash = Some(token_hash.to_string());
        row.user.reset_token_expires_at = Some(expires_at);
        Ok(())
    }

    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, RepoError> {
        let tables = self.lock()?;
        Ok(tables
            .live()
            .find(|r| r.user.reset_token_hash.as_deref() == Some(token_hash))
            .map(|r| r.user.clone()))
    }

    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepoError> {
        let mut tables = self.lock()?;
        let row = tables
            .live_mut(user_id)
            .ok_or_else(|| RepoError::MissingReference(format!("user {}", user_id)))?;
        row.user.password_hash = password_hash.to_string();
        row.user.reset_token_hash = None;
        row.user.reset_token_expires_at = None;
        row.user.updated_at = Utc::now();
        Ok(())
    }
}
