// store

mod session_store;

pub use session_store::*;

// repo

mod role_repo;
mod user_repo;

pub use role_repo::*;
pub use user_repo::*;

// outbound

mod mailer;

pub use mailer::*;
