use crate::application_port::UserError;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 255;

pub fn validate_name(name: &str) -> Result<(), UserError> {
    if name.trim().is_empty() {
        return Err(UserError::InvalidInput("name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(UserError::InvalidInput("name too long".to_string()));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), UserError> {
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    };
    if !well_formed || email.len() > MAX_EMAIL_LEN {
        return Err(UserError::InvalidInput("invalid email".to_string()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), UserError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(UserError::InvalidInput("password too short".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("a@x").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@b@x.com").is_err());
        assert!(validate_email("plain").is_err());
    }

    #[test]
    fn names_and_passwords() {
        assert!(validate_name("  ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }
}
