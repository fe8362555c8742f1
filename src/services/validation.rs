//! Request field checks shared by the services

use std::collections::HashMap;

use crate::error::ApiError;

/// Trimmed title with a character count within `min..=max`
pub fn title(field: &str, value: &str, min: usize, max: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min {
        let problem = if min <= 1 {
            format!("{} is required", capitalize(field))
        } else {
            format!("{} must be at least {} characters", capitalize(field), min)
        };
        return Err(ApiError::invalid_field(field, problem));
    }
    if len > max {
        return Err(ApiError::invalid_field(
            field,
            format!("{} must be at most {} characters", capitalize(field), max),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn optional_title(field: &str, value: Option<String>, min: usize, max: usize) -> Result<Option<String>, ApiError> {
    value.map(|v| title(field, &v, min, max)).transpose()
}

pub fn email(value: &str) -> Result<String, ApiError> {
    let value = value.trim().to_lowercase();
    let valid = match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    };
    if !valid {
        return Err(ApiError::invalid_field("email", "Email is invalid"));
    }
    Ok(value)
}

pub fn password(field: &str, value: &str) -> Result<(), ApiError> {
    if value.chars().count() < 6 {
        return Err(ApiError::invalid_field(field, "Password must be at least 6 characters"));
    }
    Ok(())
}

/// Value must be one of `allowed`
pub fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), ApiError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    let mut field_errors = HashMap::new();
    field_errors.insert(field.to_string(), format!("Must be one of: {}", allowed.join(", ")));
    Err(ApiError::validation_error(format!("Invalid {}", field), Some(field_errors)))
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_bounds() {
        assert_eq!(title("title", "  Backlog ", 3, 255).unwrap(), "Backlog");
        assert_eq!(title("title", "ab", 3, 255).unwrap_err().status_code(), 400);
        assert!(title("title", "", 1, 255).is_err());
        assert!(title("title", &"x".repeat(256), 1, 255).is_err());
    }

    #[test]
    fn email_shape() {
        assert_eq!(email(" Ann@Example.COM ").unwrap(), "ann@example.com");
        assert!(email("ann@localhost").is_err());
        assert!(email("@example.com").is_err());
    }

    #[test]
    fn enumerated_values() {
        assert!(one_of("priority", "high", &["low", "medium", "high"]).is_ok());
        assert!(one_of("priority", "urgent", &["low", "medium", "high"]).is_err());
    }
}
