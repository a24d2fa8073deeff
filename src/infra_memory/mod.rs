//! In-process adapters for every storage port. Used by the `fake` store
//! backend and by tests; nothing here survives a restart.

mod mailer_memory;
mod role_repo_memory;
mod session_store_memory;
mod user_repo_memory;

pub use mailer_memory::*;
pub use role_repo_memory::*;
pub use session_store_memory::*;
pub use user_repo_memory::*;
