mod auth_service_impl;
mod credential_hasher;
mod password_reset_service_impl;
mod role_service_impl;
mod token_codec_jwt;
mod user_service_impl;
mod validation;

pub use auth_service_impl::*;
pub use credential_hasher::*;
pub use password_reset_service_impl::*;
pub use role_service_impl::*;
pub use token_codec_jwt::*;
pub use user_service_impl::*;
pub use validation::*;
