//! Validation error collection shared by models and services.

use std::collections::HashMap;
use std::fmt;

/// Field name `validator` uses for struct-level (schema) errors.
const SCHEMA_FIELD: &str = "__all__";

/// Validation errors collection
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: HashMap<String, Vec<String>>,
    /// Base errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Get errors for a specific field
    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    /// Base messages first, then `"<field> <message>"` sorted by field.
    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        let mut fields: Vec<_> = self.errors.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (field, field_messages) in fields {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }

    /// `Ok(())` when nothing was collected, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_messages().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(source: validator::ValidationErrors) -> Self {
        let mut errors = ValidationErrors::new();
        for (field, field_errors) in source.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                if field == SCHEMA_FIELD {
                    errors.add_base(message);
                } else {
                    errors.add(field, message);
                }
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_query() {
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());

        errors.add("name", "is too long");
        errors.add_base("schedule is invalid");

        assert!(!errors.is_empty());
        assert!(errors.has_error("name"));
        assert!(!errors.has_error("priority"));
        assert_eq!(errors.get("name").map(Vec::len), Some(1));
    }

    #[test]
    fn test_full_messages_order() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "can't be blank");
        errors.add("comment", "is too long");
        errors.add_base("end is before start");

        assert_eq!(
            errors.full_messages(),
            vec![
                "end is before start".to_string(),
                "comment is too long".to_string(),
                "name can't be blank".to_string(),
            ]
        );
        assert_eq!(
            errors.to_string(),
            "end is before start, comment is too long, name can't be blank"
        );
    }

    #[test]
    fn test_merge() {
        let mut left = ValidationErrors::new();
        left.add("name", "a");
        let mut right = ValidationErrors::new();
        right.add("name", "b");
        right.add_base("c");

        left.merge(right);
        assert_eq!(left.get("name"), Some(&vec!["a".to_string(), "b".to_string()]));
        assert_eq!(left.base_errors, vec!["c".to_string()]);
    }

    #[test]
    fn test_from_validator_errors() {
        let mut source = validator::ValidationErrors::new();
        let mut error = validator::ValidationError::new("length");
        error.message = Some("is too long".into());
        source.add("name", error);
        source.add("__all__", validator::ValidationError::new("end_before_start"));

        let errors = ValidationErrors::from(source);
        assert_eq!(errors.get("name"), Some(&vec!["is too long".to_string()]));
        assert_eq!(errors.base_errors, vec!["end_before_start".to_string()]);
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.add_base("nope");
        assert!(errors.into_result().is_err());
    }
}
