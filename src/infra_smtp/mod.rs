mod mailer_smtp;

pub use mailer_smtp::*;
