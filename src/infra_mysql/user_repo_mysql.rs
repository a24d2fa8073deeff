use super::util::{is_dup_key, is_missing_fk, store_err};
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

const USER_COLUMNS: &str = "id, name, email, password_hash, reset_token_hash, \
                            reset_token_expires_at, created_at, updated_at";

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    fn row_to_user(row: MySqlRow) -> Result<User, RepoError> {
        Ok(User {
            id: row.try_get("id").map_err(store_err)?,
            name: row.try_get("name").map_err(store_err)?,
            email: row.try_get("email").map_err(store_err)?,
            password_hash: row.try_get("password_hash").map_err(store_err)?,
            reset_token_hash: row.try_get("reset_token_hash").map_err(store_err)?,
            reset_token_expires_at: row.try_get("reset_token_expires_at").map_err(store_err)?,
            created_at: row.try_get("created_at").map_err(store_err)?,
            updated_at: row.try_get("updated_at").map_err(store_err)?,
        })
    }

    async fn fetch_one_where(
        &self,
        clause: &str,
        bind: impl for<'q> sqlx::Encode<'q, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Send + 'static,
    ) -> Result<Option<User>, RepoError> {
        let sql = format!(
            "SELECT {} FROM users WHERE {} AND deleted_at IS NULL",
            USER_COLUMNS, clause
        );
        let row_opt: Option<MySqlRow> = sqlx::query(&sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        row_opt.map(Self::row_to_user).transpose()
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let result = sqlx::query(
            r#"
INSERT INTO users (name, email, password_hash)
VALUES (?, ?, ?)
"#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                RepoError::Duplicate(user.email.clone())
            } else {
                store_err(e)
            }
        })?;

        let id = UserId(result.last_insert_id());
        self.get_by_id(id)
            .await?
            .ok_or_else(|| RepoError::Store(format!("user {} vanished after insert", id)))
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>, RepoError> {
        self.fetch_one_where("id = ?", user_id).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        self.fetch_one_where("email = ?", email.to_string()).await
    }

    async fn update(&self, user: &User) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
UPDATE users
SET name = ?, email = ?, password_hash = ?, updated_at = CURRENT_TIMESTAMP(6)
WHERE id = ? AND deleted_at IS NULL
"#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                RepoError::Duplicate(user.email.clone())
            } else {
                store_err(e)
            }
        })?;

        if result.rows_affected() == 0 && self.get_by_id(user.id).await?.is_none() {
            return Err(RepoError::MissingReference(format!("user {}", user.id)));
        }
        Ok(())
    }

    async fn delete(&self, user_id: UserId) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = CURRENT_TIMESTAMP(6) WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, page: PageParams) -> Result<(Vec<User>, u64), RepoError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await
                .map_err(store_err)?;

        let sql = format!(
            "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY id LIMIT ? OFFSET ?",
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        let users = rows
            .into_iter()
            .map(Self::row_to_user)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((users, total.max(0) as u64))
    }

    async fn permissions_for(&self, user_id: UserId) -> Result<Vec<Permission>, RepoError> {
        let rows = sqlx::query(
            r#"
SELECT DISTINCT p.id, p.name
FROM permissions p
JOIN role_permissions rp ON rp.permission_id = p.id
JOIN user_roles ur ON ur.role_id = rp.role_id
WHERE ur.user_id = ?
ORDER BY p.id
"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(Permission {
                    id: row.try_get("id").map_err(store_err)?,
                    name: row.try_get("name").map_err(store_err)?,
                })
            })
            .collect()
    }

    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<(), RepoError> {
        if self.get_by_id(user_id).await?.is_none() {
            return Err(RepoError::MissingReference(format!("user {}", user_id)));
        }

        sqlx::query("INSERT IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_missing_fk(&e) {
                    RepoError::MissingReference(format!("role {}", role_id))
                } else {
                    store_err(e)
                }
            })?;

        Ok(())
    }

    async fn save_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
UPDATE users
SET reset_token_hash = ?, reset_token_expires_at = ?
WHERE id = ? AND deleted_at IS NULL
"#,
        )
        .bind(token_hash)
        .bind(expires_at)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, RepoError> {
        self.fetch_one_where("reset_token_hash = ?", token_hash.to_string())
            .await
    }

    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
UPDATE users
SET password_hash = ?, reset_token_hash = NULL, reset_token_expires_at = NULL,
    updated_at = CURRENT_TIMESTAMP(6)
WHERE id = ? AND deleted_at IS NULL
"#,
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }
}
