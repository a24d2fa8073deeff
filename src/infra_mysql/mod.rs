mod role_repo_mysql;
mod user_repo_mysql;

pub use role_repo_mysql::*;
pub use user_repo_mysql::*;

mod util;
