use super::util::{is_dup_key, store_err};
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::{MySql, MySqlConnection, MySqlPool, Row, Transaction};
use std::collections::BTreeMap;

pub struct MySqlRoleRepo {
    pool: MySqlPool,
}

impl MySqlRoleRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlRoleRepo { pool }
    }

    /// Upserts each permission by name and links the set to the role,
    /// replacing whatever was linked before.
    async fn link_permissions(
        conn: &mut MySqlConnection,
        role_id: RoleId,
        permissions: &[String],
    ) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
            .bind(role_id)
            .execute(&mut *conn)
            .await
            .map_err(store_err)?;

        for name in permissions {
            let result = sqlx::query(
                r#"
INSERT INTO permissions (name) VALUES (?)
ON DUPLICATE KEY UPDATE id = LAST_INSERT_ID(id)
"#,
            )
            .bind(name)
            .execute(&mut *conn)
            .await
            .map_err(store_err)?;
            let permission_id = PermissionId(result.last_insert_id());

            sqlx::query("INSERT IGNORE INTO role_permissions (role_id, permission_id) VALUES (?, ?)")
                .bind(role_id)
                .bind(permission_id)
                .execute(&mut *conn)
                .await
                .map_err(store_err)?;
        }

        Ok(())
    }

    async fn permissions_by_role(
        &self,
        role_id: Option<RoleId>,
    ) -> Result<BTreeMap<RoleId, Vec<Permission>>, RepoError> {
        let rows = sqlx::query(
            r#"
SELECT rp.role_id, p.id, p.name
FROM role_permissions rp
JOIN permissions p ON p.id = rp.permission_id
WHERE (? IS NULL OR rp.role_id = ?)
ORDER BY rp.role_id, p.id
"#,
        )
        .bind(role_id)
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut grouped: BTreeMap<RoleId, Vec<Permission>> = BTreeMap::new();
        for row in rows {
            let role_id: RoleId = row.try_get("role_id").map_err(store_err)?;
            grouped.entry(role_id).or_default().push(Permission {
                id: row.try_get("id").map_err(store_err)?,
                name: row.try_get("name").map_err(store_err)?,
            });
        }
        Ok(grouped)
    }

    async fn commit(tx: Transaction<'_, MySql>) -> Result<(), RepoError> {
        tx.commit().await.map_err(store_err)
    }

    fn dup_or_store(name: &str) -> impl Fn(sqlx::Error) -> RepoError + '_ {
        move |e| {
            if is_dup_key(&e) {
                RepoError::Duplicate(name.to_string())
            } else {
                store_err(e)
            }
        }
    }
}

#[async_trait::async_trait]
impl RoleRepo for MySqlRoleRepo {
    async fn create(&self, name: &str, permissions: &[String]) -> Result<Role, RepoError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let result = sqlx::query("INSERT INTO roles (name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(Self::dup_or_store(name))?;
        let role_id = RoleId(result.last_insert_id());

        Self::link_permissions(&mut tx, role_id, permissions).await?;
        Self::commit(tx).await?;

        self.get(role_id)
            .await?
            .ok_or_else(|| RepoError::Store(format!("role {} vanished after insert", role_id)))
    }

    async fn list(&self) -> Result<Vec<Role>, RepoError> {
        let rows = sqlx::query("SELECT id, name FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        let mut permissions = self.permissions_by_role(None).await?;

        rows.into_iter()
            .map(|row| {
                let id: RoleId = row.try_get("id").map_err(store_err)?;
                Ok(Role {
                    id,
                    name: row.try_get("name").map_err(store_err)?,
                    permissions: permissions.remove(&id).unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn get(&self, role_id: RoleId) -> Result<Option<Role>, RepoError> {
        let row_opt = sqlx::query("SELECT id, name FROM roles WHERE id = ?")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        let Some(row) = row_opt else {
            return Ok(None);
        };

        let mut permissions = self.permissions_by_role(Some(role_id)).await?;
        Ok(Some(Role {
            id: role_id,
            name: row.try_get("name").map_err(store_err)?,
            permissions: permissions.remove(&role_id).unwrap_or_default(),
        }))
    }

    async fn update(
        &self,
        role_id: RoleId,
        name: &str,
        permissions: &[String],
    ) -> Result<Option<Role>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let exists: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM roles WHERE id = ?")
            .bind(role_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_err)?;
        if exists == 0 {
            return Ok(None);
        }

        sqlx::query("UPDATE roles SET name = ? WHERE id = ?")
            .bind(name)
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(Self::dup_or_store(name))?;

        Self::link_permissions(&mut tx, role_id, permissions).await?;
        Self::commit(tx).await?;

        self.get(role_id).await
    }

    async fn delete(&self, role_id: RoleId) -> Result<bool, RepoError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        for sql in [
            "DELETE FROM role_permissions WHERE role_id = ?",
            "DELETE FROM user_roles WHERE role_id = ?",
        ] {
            sqlx::query(sql)
                .bind(role_id)
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
        }
        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        Self::commit(tx).await?;
        Ok(result.rows_affected() > 0)
    }
}
