mod page;
mod role;
mod user;

pub use page::*;
pub use role::*;
pub use user::*;
