use super::error::*;
use super::handler::{self, Responder};
use crate::application_port::AuthService;
use crate::domain_model::{PageQuery, RoleId, UserId};
use crate::i18n::{Locale, Translator};
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    auth_routes(server.clone())
        .or(user_routes(server.clone()))
        .or(role_routes(server.clone()))
        .or(password_routes(server))
}

fn auth_routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let respond = with_responder(server.translator.clone());

    let login = warp::path!("auth" / "login")
        .and(warp::post())
        .and(warp::body::json())
        .and(respond.clone())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh = warp::path!("auth" / "refresh")
        .and(warp::post())
        .and(warp::body::json())
        .and(respond.clone())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::path!("auth" / "logout")
        .and(warp::post())
        .and(warp::body::json())
        .and(bearer())
        .and(respond.clone())
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let me = warp::path!("auth" / "me")
        .and(warp::get())
        .and(with_verification(server.auth_service.clone()))
        .and(respond.clone())
        .and(with(server.auth_service.clone()))
        .and_then(handler::me);

    let online = warp::path!("users" / UserId / "online")
        .and(warp::get())
        .and(with_verification(server.auth_service.clone()))
        .and(respond)
        .and(with(server.auth_service.clone()))
        .and_then(handler::online_status);

    login.or(refresh).or(logout).or(me).or(online)
}

fn user_routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let respond = with_responder(server.translator.clone());
    let verified = with_verification(server.auth_service.clone());
    let users = with(server.user_service.clone());

    let create = warp::path!("users")
        .and(warp::post())
        .and(warp::body::json())
        .and(respond.clone())
        .and(users.clone())
        .and_then(handler::create_user);

    let list = warp::path!("users")
        .and(warp::get())
        .and(warp::query::<PageQuery>())
        .and(verified.clone())
        .and(respond.clone())
        .and(users.clone())
        .and_then(handler::list_users);

    let get = warp::path!("users" / UserId)
        .and(warp::get())
        .and(verified.clone())
        .and(respond.clone())
        .and(users.clone())
        .and_then(handler::get_user);

    let update = warp::path!("users" / UserId)
        .and(warp::put())
        .and(warp::body::json())
        .and(verified.clone())
        .and(respond.clone())
        .and(users.clone())
        .and_then(handler::update_user);

    let delete = warp::path!("users" / UserId)
        .and(warp::delete())
        .and(verified.clone())
        .and(respond.clone())
        .and(users.clone())
        .and_then(handler::delete_user);

    let permissions = warp::path!("users" / UserId / "permissions")
        .and(warp::get())
        .and(verified.clone())
        .and(respond.clone())
        .and(users.clone())
        .and_then(handler::user_permissions);

    let assign_role = warp::path!("users" / UserId / "roles" / RoleId)
        .and(warp::post())
        .and(verified)
        .and(respond)
        .and(users)
        .and_then(handler::assign_role);

    create
        .or(list)
        .or(get)
        .or(update)
        .or(delete)
        .or(permissions)
        .or(assign_role)
}

fn role_routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let respond = with_responder(server.translator.clone());
    let verified = with_verification(server.auth_service.clone());
    let roles = with(server.role_service.clone());

    let create = warp::path!("roles")
        .and(warp::post())
        .and(warp::body::json())
        .and(verified.clone())
        .and(respond.clone())
        .and(roles.clone())
        .and_then(handler::create_role);

    let list = warp::path!("roles")
        .and(warp::get())
        .and(verified.clone())
        .and(respond.clone())
        .and(roles.clone())
        .and_then(handler::list_roles);

    let get = warp::path!("roles" / RoleId)
        .and(warp::get())
        .and(verified.clone())
        .and(respond.clone())
        .and(roles.clone())
        .and_then(handler::get_role);

    let update = warp::path!("roles" / RoleId)
        .and(warp::put())
        .and(warp::body::json())
        .and(verified.clone())
        .and(respond.clone())
        .and(roles.clone())
        .and_then(handler::update_role);

    let delete = warp::path!("roles" / RoleId)
        .and(warp::delete())
        .and(verified.clone())
        .and(respond.clone())
        .and(roles.clone())
        .and_then(handler::delete_role);

    let permissions = warp::path!("roles" / RoleId / "permissions")
        .and(warp::get())
        .and(verified)
        .and(respond)
        .and(roles)
        .and_then(handler::role_permissions);

    create
        .or(list)
        .or(get)
        .or(update)
        .or(delete)
        .or(permissions)
}

fn password_routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let respond = with_responder(server.translator.clone());

    let forgot = warp::path!("password" / "forgot")
        .and(warp::post())
        .and(warp::body::json())
        .and(respond.clone())
        .and(with(server.password_reset_service.clone()))
        .and_then(handler::forgot_password);

    let reset = warp::path!("password" / "reset")
        .and(warp::post())
        .and(warp::body::json())
        .and(respond)
        .and(with(server.password_reset_service.clone()))
        .and_then(handler::reset_password);

    forgot.or(reset)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_locale() -> impl Filter<Extract = (Locale,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::ACCEPT_LANGUAGE.as_str())
        .map(|header: Option<String>| Locale::from_accept_language(header.as_deref()))
}

fn with_responder(
    translator: Arc<Translator>,
) -> impl Filter<Extract = (Responder,), Error = warp::Rejection> + Clone {
    with_locale().map(move |locale: Locale| Responder {
        translator: translator.clone(),
        locale,
    })
}

/// The token of an `Authorization: Bearer` header, if any.
fn bearer() -> impl Filter<Extract = (Option<String>,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_str()).map(
        |header: Option<String>| {
            header.and_then(|value| value.strip_prefix("Bearer ").map(str::to_string))
        },
    )
}

fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    bearer()
        .and(with_locale())
        .and_then(move |token: Option<String>, locale: Locale| {
            let auth_service = auth_service.clone();
            async move {
                let Some(token) = token else {
                    return Err(ApiErrorCode::MissingToken.reject(&locale));
                };
                auth_service
                    .verify_access_token(&token)
                    .await
                    .map_err(|_| ApiErrorCode::InvalidToken.reject(&locale))
            }
        })
}
