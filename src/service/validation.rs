use crate::error::{Error, Result};

const MAX_USERNAME_LEN: usize = 64;
const MAX_NAMESPACE_NAME_LEN: usize = 100;
const MAX_NAMESPACE_DESCRIPTION_LEN: usize = 500;
const MAX_KEY_NAME_LEN: usize = 255;
const MAX_CREDENTIAL_DESCRIPTION_LEN: usize = 255;

fn is_valid_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
}

/// Free-form display names: any printable text within the length limit.
fn validate_label(value: &str, entity: &str, max_len: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::bad_input(format!("{entity} name cannot be empty")));
    }
    if value.chars().count() > max_len {
        return Err(Error::bad_input(format!(
            "{entity} name cannot exceed {max_len} characters"
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(Error::bad_input(format!(
            "{entity} name cannot contain control characters"
        )));
    }
    Ok(())
}

fn validate_description(value: Option<&str>, entity: &str, max_len: usize) -> Result<()> {
    if let Some(description) = value {
        if description.chars().count() > max_len {
            return Err(Error::bad_input(format!(
                "{entity} description cannot exceed {max_len} characters"
            )));
        }
    }
    Ok(())
}

pub fn validate_username(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::bad_input("Username cannot be empty"));
    }
    if name.len() > MAX_USERNAME_LEN {
        return Err(Error::bad_input(format!(
            "Username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if !name.chars().all(is_valid_username_char) {
        return Err(Error::bad_input(
            "Username can only contain alphanumeric characters, hyphens, underscores, and periods",
        ));
    }
    if name.starts_with(['-', '_', '.']) {
        return Err(Error::bad_input(
            "Username cannot start with a hyphen, underscore, or period",
        ));
    }
    Ok(())
}

pub fn validate_namespace_name(name: &str) -> Result<()> {
    validate_label(name, "Namespace", MAX_NAMESPACE_NAME_LEN)
}

pub fn validate_namespace_description(description: Option<&str>) -> Result<()> {
    validate_description(description, "Namespace", MAX_NAMESPACE_DESCRIPTION_LEN)
}

pub fn validate_key_name(name: &str) -> Result<()> {
    validate_label(name, "Key", MAX_KEY_NAME_LEN)
}

pub fn validate_credential_description(description: Option<&str>) -> Result<()> {
    validate_description(description, "API key", MAX_CREDENTIAL_DESCRIPTION_LEN)
}

pub fn validate_revision_number(revision_number: i64) -> Result<()> {
    if revision_number <= 0 {
        return Err(Error::bad_input("Revision number must be a positive integer"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        validate_username("alice").unwrap();
        validate_username("alice.smith-2").unwrap();
        assert!(validate_username("").is_err());
        assert!(validate_username("-alice").is_err());
        assert!(validate_username("al ice").is_err());
        assert!(validate_username(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_namespace_name_rules() {
        validate_namespace_name("Production (EU)").unwrap();
        validate_namespace_name(&"n".repeat(100)).unwrap();
        assert!(validate_namespace_name("").is_err());
        assert!(validate_namespace_name("   ").is_err());
        assert!(validate_namespace_name(&"n".repeat(101)).is_err());
        assert!(validate_namespace_name("bad\nname").is_err());
    }

    #[test]
    fn test_key_name_rules() {
        validate_key_name("database/url").unwrap();
        validate_key_name(&"k".repeat(255)).unwrap();
        assert!(validate_key_name(&"k".repeat(256)).is_err());
        assert!(matches!(validate_key_name("tab\tkey"), Err(Error::BadInput(_))));
    }

    #[test]
    fn test_description_limits() {
        validate_namespace_description(None).unwrap();
        validate_namespace_description(Some(&"d".repeat(500))).unwrap();
        assert!(validate_namespace_description(Some(&"d".repeat(501))).is_err());
        assert!(validate_credential_description(Some(&"d".repeat(256))).is_err());
    }

    #[test]
    fn test_revision_number_must_be_positive() {
        validate_revision_number(1).unwrap();
        assert!(validate_revision_number(0).is_err());
        assert!(validate_revision_number(-3).is_err());
    }
}
