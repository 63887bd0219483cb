use crate::error::{Error, Result};

const MAX_RECORD_TYPE_LEN: usize = 64;
const MAX_FIELD_KEY_LEN: usize = 100;

/// Collection holding the schema documents themselves.
pub const SCHEMAS_COLLECTION: &str = "schemas";

fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn validate_name(name: &str, entity: &str, max_len: usize) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err(format!("{entity} cannot be empty"));
    }
    if name.len() > max_len {
        return Err(format!("{entity} cannot exceed {max_len} characters"));
    }
    if !name.chars().all(is_valid_name_char) {
        return Err(format!(
            "{entity} can only contain alphanumeric characters, hyphens, and underscores"
        ));
    }
    if name.starts_with('-') {
        return Err(format!("{entity} cannot start with a hyphen"));
    }
    Ok(())
}

/// Record type names double as collection names in the store.
pub fn validate_record_type(name: &str) -> Result<()> {
    validate_name(name, "Record type name", MAX_RECORD_TYPE_LEN).map_err(Error::Validation)?;
    if name == SCHEMAS_COLLECTION {
        return Err(Error::Validation(format!(
            "Record type name '{SCHEMAS_COLLECTION}' is reserved"
        )));
    }
    Ok(())
}

pub fn validate_field_key(key: &str) -> Result<()> {
    validate_name(key, "Field key", MAX_FIELD_KEY_LEN).map_err(Error::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_record_type() {
        assert!(validate_record_type("contacts").is_ok());
        assert!(validate_record_type("order_items-2").is_ok());
        assert!(validate_record_type("").is_err());
        assert!(validate_record_type("-contacts").is_err());
        assert!(validate_record_type("con tacts").is_err());
        assert!(validate_record_type("schemas").is_err());
    }

    #[test]
    fn test_validate_field_key() {
        assert!(validate_field_key("isActive").is_ok());
        assert!(validate_field_key("first_name").is_ok());
        assert!(validate_field_key("a.b").is_err());
        assert!(validate_field_key(&"x".repeat(101)).is_err());
    }
}
