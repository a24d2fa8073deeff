use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use crate::i18n::{Locale, Translator};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApiErrorCode {
    InvalidCredentials,
    InvalidToken,
    MissingToken,
    InvalidInput,
    InvalidOrExpiredToken,
    UserNotFound,
    RoleNotFound,
    NotFound,
    MethodNotAllowed,
    EmailTaken,
    RoleNameTaken,
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::MissingToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::InvalidInput | ApiErrorCode::InvalidOrExpiredToken => {
                StatusCode::BAD_REQUEST
            }
            ApiErrorCode::UserNotFound | ApiErrorCode::RoleNotFound | ApiErrorCode::NotFound => {
                StatusCode::NOT_FOUND
            }
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::EmailTaken | ApiErrorCode::RoleNameTaken => StatusCode::CONFLICT,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Translation key of the client-facing message.
    pub fn message_key(self) -> &'static str {
        match self {
            ApiErrorCode::InvalidCredentials => "InvalidCredentials",
            ApiErrorCode::InvalidToken => "Unauthorized",
            ApiErrorCode::MissingToken => "MissingToken",
            ApiErrorCode::InvalidInput => "InvalidInput",
            ApiErrorCode::InvalidOrExpiredToken => "InvalidOrExpiredToken",
            ApiErrorCode::UserNotFound => "UserNotFound",
            ApiErrorCode::RoleNotFound => "RoleNotFound",
            ApiErrorCode::NotFound => "NotFound",
            ApiErrorCode::MethodNotAllowed => "MethodNotAllowed",
            ApiErrorCode::EmailTaken => "EmailTaken",
            ApiErrorCode::RoleNameTaken => "RoleNameTaken",
            ApiErrorCode::InternalError => "InternalError",
        }
    }

    pub fn reject(self, locale: &Locale) -> Rejection {
        reject::custom(ApiRejection {
            code: self,
            locale: locale.clone(),
        })
    }
}

/// A handler failure together with the locale its message is rendered in.
#[derive(Debug)]
pub struct ApiRejection {
    pub code: ApiErrorCode,
    pub locale: Locale,
}

impl reject::Reject for ApiRejection {}

pub fn error_reply(
    translator: &Translator,
    locale: &Locale,
    code: ApiErrorCode,
) -> warp::reply::WithStatus<warp::reply::Json> {
    let message = translator.t(locale, code.message_key());
    let body = ApiResponse::<()>::err(code, message);
    warp::reply::with_status(warp::reply::json(&body), code.status())
}

pub async fn recover_error(
    err: Rejection,
    translator: Arc<Translator>,
) -> Result<impl warp::Reply, Infallible> {
    if let Some(rejection) = err.find::<ApiRejection>() {
        return Ok(error_reply(&translator, &rejection.locale, rejection.code));
    }

    // A malformed body on a matched route outranks the 405s of its siblings.
    let code = if err.is_not_found() {
        ApiErrorCode::NotFound
    } else if err.find::<warp::body::BodyDeserializeError>().is_some()
        || err.find::<reject::InvalidQuery>().is_some()
        || err.find::<reject::UnsupportedMediaType>().is_some()
        || err.find::<reject::LengthRequired>().is_some()
        || err.find::<reject::PayloadTooLarge>().is_some()
    {
        ApiErrorCode::InvalidInput
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::MethodNotAllowed
    } else {
        ApiErrorCode::internal(format!("unhandled rejection: {:?}", err))
    };
    Ok(error_reply(&translator, &Locale::default(), code))
}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::InvalidAccessToken
            | AuthError::InvalidRefreshToken
            | AuthError::RefreshTokenNotFoundOrExpired => ApiErrorCode::InvalidToken,
            AuthError::UserNotFound => ApiErrorCode::UserNotFound,
            AuthError::Storage(e) | AuthError::TokenIssuance(e) | AuthError::InternalError(e) => {
                ApiErrorCode::internal(e)
            }
        }
    }
}

impl From<UserError> for ApiErrorCode {
    fn from(error: UserError) -> Self {
        match error {
            UserError::EmailTaken => ApiErrorCode::EmailTaken,
            UserError::UserNotFound => ApiErrorCode::UserNotFound,
            UserError::RoleNotFound => ApiErrorCode::RoleNotFound,
            UserError::InvalidInput(_) => ApiErrorCode::InvalidInput,
            UserError::InvalidOrExpiredToken => ApiErrorCode::InvalidOrExpiredToken,
            UserError::Store(e) | UserError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<RoleError> for ApiErrorCode {
    fn from(error: RoleError) -> Self {
        match error {
            RoleError::NameTaken => ApiErrorCode::RoleNameTaken,
            RoleError::RoleNotFound => ApiErrorCode::RoleNotFound,
            RoleError::InvalidInput(_) => ApiErrorCode::InvalidInput,
            RoleError::Store(e) => ApiErrorCode::internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_details_stay_out_of_the_code() {
        let code = ApiErrorCode::from(AuthError::Storage("redis down".to_string()));
        assert_eq!(code, ApiErrorCode::InternalError);
        assert_eq!(code.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn token_failures_are_unauthorized() {
        for err in [
            AuthError::InvalidAccessToken,
            AuthError::InvalidRefreshToken,
            AuthError::RefreshTokenNotFoundOrExpired,
        ] {
            assert_eq!(ApiErrorCode::from(err).status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(
            ApiErrorCode::from(UserError::EmailTaken).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn every_code_has_a_translation() {
        let translator = Translator::load_embedded().unwrap();
        let codes = [
            ApiErrorCode::InvalidCredentials,
            ApiErrorCode::InvalidToken,
            ApiErrorCode::MissingToken,
            ApiErrorCode::InvalidInput,
            ApiErrorCode::InvalidOrExpiredToken,
            ApiErrorCode::UserNotFound,
            ApiErrorCode::RoleNotFound,
            ApiErrorCode::NotFound,
            ApiErrorCode::MethodNotAllowed,
            ApiErrorCode::EmailTaken,
            ApiErrorCode::RoleNameTaken,
            ApiErrorCode::InternalError,
        ];
        for lang in ["en", "es"] {
            for code in codes {
                let msg = translator.t(&Locale::new(lang), code.message_key());
                assert!(!msg.starts_with("[Missing"), "{} {:?}", lang, code);
            }
        }
    }
}
