use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::i18n::{Locale, Translator};
use crate::logger::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};

pub const USERS_PATH: &str = "/api/v1/users";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        ApiResponse {
            success: false,
            message: message.clone(),
            data: None,
            error: Some(ApiError { code, message }),
        }
    }
}

/// Shared reply state for every handler.
#[derive(Clone)]
pub struct Responder {
    pub translator: Arc<Translator>,
    pub locale: Locale,
}

impl Responder {
    fn reply<T: Serialize>(&self, status: StatusCode, key: &str, data: T) -> WithStatus<Json> {
        let body = ApiResponse::ok(self.translator.t(&self.locale, key), data);
        warp::reply::with_status(warp::reply::json(&body), status)
    }

    fn ok<T: Serialize>(&self, key: &str, data: T) -> WithStatus<Json> {
        self.reply(StatusCode::OK, key, data)
    }

    fn created<T: Serialize>(&self, key: &str, data: T) -> WithStatus<Json> {
        self.reply(StatusCode::CREATED, key, data)
    }

    fn fail<E: Into<ApiErrorCode>>(&self, error: E) -> warp::Rejection {
        error.into().reject(&self.locale)
    }
}

// region auth

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

pub async fn login(
    body: LoginRequest,
    r: Responder,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = auth_service
        .login(LoginInput {
            email: body.email,
            password: body.password,
        })
        .await
        .map_err(|e| r.fail(e))?;

    // Presence is best effort, a failed marker does not undo the login.
    if let Err(e) = auth_service.track_user_login(result.user.id).await {
        warn!(user_id = %result.user.id, "tracking login failed: {}", e);
    }

    let response = LoginResponse {
        user: result.user,
        tokens: result.tokens,
    };
    Ok(r.ok("LoginSuccessful", response))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    r: Responder,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .refresh_token(&body.refresh_token)
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("TokenRefreshed", tokens))
}

pub async fn logout(
    body: RefreshRequest,
    bearer: Option<String>,
    r: Responder,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .logout(&body.refresh_token)
        .await
        .map_err(|e| r.fail(e))?;

    if let Some(token) = bearer {
        match auth_service.verify_access_token(&token).await {
            Ok(user_id) => auth_service
                .track_user_logout(user_id)
                .await
                .map_err(|e| r.fail(e))?,
            Err(e) => debug!("logout without a valid access token: {}", e),
        }
    }

    Ok(r.ok("LogoutSuccessful", ()))
}

pub async fn me(
    user_id: UserId,
    r: Responder,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = auth_service
        .get_auth_user(user_id)
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("UserFound", user))
}

#[derive(Debug, Serialize)]
pub struct OnlineStatus {
    pub user_id: UserId,
    pub online: bool,
}

pub async fn online_status(
    user_id: UserId,
    _caller: UserId,
    r: Responder,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let online = auth_service
        .is_user_online(user_id)
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("UserOnlineStatus", OnlineStatus { user_id, online }))
}

// endregion

// region users

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub async fn create_user(
    body: CreateUserRequest,
    r: Responder,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = user_service
        .create_user(CreateUserInput {
            name: body.name,
            email: body.email,
            password: body.password,
        })
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.created("UserCreated", user))
}

pub async fn list_users(
    query: PageQuery,
    _caller: UserId,
    r: Responder,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let params = PageParams::from(query);
    let (users, total) = user_service
        .list_users(params)
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok(
        "ListOfUsers",
        Paginated::new(users, params, total, USERS_PATH),
    ))
}

pub async fn get_user(
    user_id: UserId,
    _caller: UserId,
    r: Responder,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = user_service
        .get_user(user_id)
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("UserRetrieved", user))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
}

pub async fn update_user(
    user_id: UserId,
    body: UpdateUserRequest,
    _caller: UserId,
    r: Responder,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = user_service
        .update_user(
            user_id,
            UpdateUserInput {
                name: body.name,
                email: body.email,
                password: body.password.unwrap_or_default(),
            },
        )
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("UserUpdated", user))
}

pub async fn delete_user(
    user_id: UserId,
    _caller: UserId,
    r: Responder,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    user_service
        .delete_user(user_id)
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("UserDeleted", ()))
}

pub async fn user_permissions(
    user_id: UserId,
    _caller: UserId,
    r: Responder,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let permissions = user_service
        .permissions_for_user(user_id)
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("UserPermissions", permissions))
}

pub async fn assign_role(
    user_id: UserId,
    role_id: RoleId,
    _caller: UserId,
    r: Responder,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    user_service
        .assign_role(user_id, role_id)
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("RoleAssigned", ()))
}

// endregion

// region roles

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl From<RoleRequest> for RoleInput {
    fn from(body: RoleRequest) -> Self {
        RoleInput {
            name: body.name,
            permissions: body.permissions,
        }
    }
}

pub async fn create_role(
    body: RoleRequest,
    _caller: UserId,
    r: Responder,
    role_service: Arc<dyn RoleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let role = role_service
        .create_role(body.into())
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.created("RoleCreated", role))
}

pub async fn list_roles(
    _caller: UserId,
    r: Responder,
    role_service: Arc<dyn RoleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let roles = role_service.list_roles().await.map_err(|e| r.fail(e))?;
    Ok(r.ok("ListOfRoles", roles))
}

pub async fn get_role(
    role_id: RoleId,
    _caller: UserId,
    r: Responder,
    role_service: Arc<dyn RoleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let role = role_service
        .get_role(role_id)
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("RoleRetrieved", role))
}

pub async fn update_role(
    role_id: RoleId,
    body: RoleRequest,
    _caller: UserId,
    r: Responder,
    role_service: Arc<dyn RoleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let role = role_service
        .update_role(role_id, body.into())
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("RoleUpdated", role))
}

pub async fn delete_role(
    role_id: RoleId,
    _caller: UserId,
    r: Responder,
    role_service: Arc<dyn RoleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    role_service
        .delete_role(role_id)
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("RoleDeleted", ()))
}

pub async fn role_permissions(
    role_id: RoleId,
    _caller: UserId,
    r: Responder,
    role_service: Arc<dyn RoleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let permissions = role_service
        .permissions_for_role(role_id)
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("RolePermissions", permissions))
}

// endregion

// region password reset

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

pub async fn forgot_password(
    body: ForgotPasswordRequest,
    r: Responder,
    reset_service: Arc<dyn PasswordResetService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    reset_service
        .request_reset(&body.email, &r.locale)
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("PasswordResetRequestSuccess", ()))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

pub async fn reset_password(
    body: ResetPasswordRequest,
    r: Responder,
    reset_service: Arc<dyn PasswordResetService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    reset_service
        .reset_password(&body.token, &body.password)
        .await
        .map_err(|e| r.fail(e))?;
    Ok(r.ok("PasswordResetSuccess", ()))
}

// endregion
