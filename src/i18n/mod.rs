mod translator;
pub use translator::*;
