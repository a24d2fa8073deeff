use super::validation::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
}

impl RealUserService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
    ) -> RealUserService {
        RealUserService {
            user_repo,
            credential_hasher,
        }
    }

    async fn existing(&self, user_id: UserId) -> Result<User, UserError> {
        self.user_repo
            .get_by_id(user_id)
            .await?
            .ok_or(UserError::UserNotFound)
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn create_user(&self, input: CreateUserInput) -> Result<User, UserError> {
        let CreateUserInput {
            name,
            email,
            password,
        } = input;
        validate_name(&name)?;
        validate_email(&email)?;
        validate_password(&password)?;

        if self.user_repo.get_by_email(&email).await?.is_some() {
            return Err(UserError::EmailTaken);
        }

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        let user = self
            .user_repo
            .create(NewUser {
                name,
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, UserError> {
        self.existing(user_id).await
    }

    async fn list_users(&self, page: PageParams) -> Result<(Vec<User>, u64), UserError> {
        Ok(self.user_repo.list(page).await?)
    }

    async fn update_user(
        &self,
        user_id: UserId,
        input: UpdateUserInput,
    ) -> Result<User, UserError> {
        let mut user = self.existing(user_id).await?;

        validate_name(&input.name)?;
        user.name = input.name;

        if user.email != input.email {
            validate_email(&input.email)?;
            if self.user_repo.get_by_email(&input.email).await?.is_some() {
                return Err(UserError::EmailTaken);
            }
            user.email = input.email;
        }

        if !input.password.is_empty() {
            validate_password(&input.password)?;
            user.password_hash = self.credential_hasher.hash_password(&input.password).await?;
        }

        self.user_repo.update(&user).await?;
        self.existing(user_id).await
    }

    async fn delete_user(&self, user_id: UserId) -> Result<(), UserError> {
        if !self.user_repo.delete(user_id).await? {
            return Err(UserError::UserNotFound);
        }
        info!(user_id = %user_id, "user deleted");
        Ok(())
    }

    async fn permissions_for_user(&self, user_id: UserId) -> Result<Vec<Permission>, UserError> {
        self.existing(user_id).await?;
        Ok(self.user_repo.permissions_for(user_id).await?)
    }

    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<(), UserError> {
        self.existing(user_id).await?;
        match self.user_repo.assign_role(user_id, role_id).await {
            Ok(()) => Ok(()),
            Err(RepoError::MissingReference(_)) => Err(UserError::RoleNotFound),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::Argon2PasswordHasher;
    use crate::infra_memory::*;

    struct Fixture {
        service: RealUserService,
        roles: Arc<InMemoryRoleRepo>,
    }

    fn fixture() -> Fixture {
        let roles = Arc::new(InMemoryRoleRepo::new());
        let repo = Arc::new(InMemoryUserRepo::new(roles.clone()));
        Fixture {
            service: RealUserService::new(repo, Arc::new(Argon2PasswordHasher)),
            roles,
        }
    }

    fn create(email: &str) -> CreateUserInput {
        CreateUserInput {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
        }
    }

    #[tokio::test]
    async fn create_hashes_password_and_rejects_duplicates() {
        let f = fixture();
        let user = f.service.create_user(create("a@x.com")).await.unwrap();
        assert_ne!(user.password_hash, "secret123");
        assert!(
            Argon2PasswordHasher
                .verify_password("secret123", &user.password_hash)
                .await
                .unwrap()
        );

        assert!(matches!(
            f.service.create_user(create("a@x.com")).await,
            Err(UserError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn create_validates_input() {
        let f = fixture();
        let mut input = create("a@x.com");
        input.password = "123".to_string();
        assert!(matches!(
            f.service.create_user(input).await,
            Err(UserError::InvalidInput(_))
        ));
        assert!(matches!(
            f.service.create_user(create("not-an-email")).await,
            Err(UserError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn update_keeps_password_when_blank_and_guards_email() {
        let f = fixture();
        let a = f.service.create_user(create("a@x.com")).await.unwrap();
        f.service.create_user(create("b@x.com")).await.unwrap();

        let updated = f
            .service
            .update_user(
                a.id,
                UpdateUserInput {
                    name: "Ada L.".to_string(),
                    email: "a@x.com".to_string(),
                    password: String::new(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada L.");
        assert_eq!(updated.password_hash, a.password_hash);

        let taken = f
            .service
            .update_user(
                a.id,
                UpdateUserInput {
                    name: "Ada".to_string(),
                    email: "b@x.com".to_string(),
                    password: String::new(),
                },
            )
            .await;
        assert!(matches!(taken, Err(UserError::EmailTaken)));
    }

    #[tokio::test]
    async fn list_pages_through_users() {
        let f = fixture();
        for i in 0..3 {
            f.service
                .create_user(create(&format!("u{}@x.com", i)))
                .await
                .unwrap();
        }
        let (page, total) = f
            .service
            .list_users(PageParams { page: 2, limit: 2 })
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].email, "u2@x.com");
    }

    #[tokio::test]
    async fn delete_then_lookup_fails() {
        let f = fixture();
        let user = f.service.create_user(create("a@x.com")).await.unwrap();
        f.service.delete_user(user.id).await.unwrap();
        assert!(matches!(
            f.service.get_user(user.id).await,
            Err(UserError::UserNotFound)
        ));
        assert!(matches!(
            f.service.delete_user(user.id).await,
            Err(UserError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn role_assignment_exposes_permissions() {
        let f = fixture();
        let user = f.service.create_user(create("a@x.com")).await.unwrap();
        let role = f
            .roles
            .create("admin", &["users.manage".to_string()])
            .await
            .unwrap();

        assert!(matches!(
            f.service.assign_role(user.id, RoleId(999)).await,
            Err(UserError::RoleNotFound)
        ));
        f.service.assign_role(user.id, role.id).await.unwrap();

        let perms = f.service.permissions_for_user(user.id).await.unwrap();
        assert_eq!(perms.len(), 1);
        assert_eq!(perms[0].name, "users.manage");
    }
}
