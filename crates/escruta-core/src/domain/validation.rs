//! Request body validation helpers

use crate::error::{Error, FieldError, Result};

/// Accumulates field errors while checking a request body
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn not_blank(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if value.is_none_or(|v| v.trim().is_empty()) {
            self.errors.push(FieldError::new(field, "must not be blank"));
        }
        self
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        if value.chars().count() < min {
            self.errors
                .push(FieldError::new(field, format!("size must be at least {}", min)));
        }
        self
    }

    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if value.is_some_and(|v| v.chars().count() > max) {
            self.errors
                .push(FieldError::new(field, format!("size must be at most {}", max)));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !is_email(value) {
            self.errors
                .push(FieldError::new(field, "must be a well-formed email address"));
        }
        self
    }

    pub fn uuid(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        match value {
            None => self.errors.push(FieldError::new(field, "must not be null")),
            Some(v) if uuid::Uuid::parse_str(v).is_err() => {
                self.errors.push(FieldError::new(field, "must be a valid UUID"))
            }
            Some(_) => {}
        }
        self
    }

    pub fn url(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        let valid = value
            .and_then(|v| url::Url::parse(v.trim()).ok())
            .is_some_and(|u| matches!(u.scheme(), "http" | "https"));
        if !valid {
            self.errors.push(FieldError::new(field, "must be a valid URL"));
        }
        self
    }

    pub fn finish(&mut self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
        && !domain.contains('@')
}

/// Parse a UUID that already passed validation
pub fn parse_id(field: &str, value: &str) -> Result<uuid::Uuid> {
    uuid::Uuid::parse_str(value).map_err(|_| Error::invalid_field(field, "must be a valid UUID"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_all_errors() {
        let err = Validator::new()
            .not_blank("title", Some("  "))
            .email("email", "nope")
            .min_len("password", "short", 8)
            .finish()
            .unwrap_err();

        match err {
            Error::Validation(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["title", "email", "password"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_valid_values_pass() {
        assert!(
            Validator::new()
                .not_blank("title", Some("Physics"))
                .email("email", "ada@example.com")
                .uuid("id", Some("6f1c1c6e-4a55-4c1e-9d7a-1f2f3e4d5c6b"))
                .url("link", Some("https://en.wikipedia.org/wiki/Rust"))
                .finish()
                .is_ok()
        );
    }

    #[test]
    fn test_uuid_and_url_rules() {
        assert!(Validator::new().uuid("id", None).finish().is_err());
        assert!(Validator::new().uuid("id", Some("123")).finish().is_err());
        assert!(Validator::new().url("link", Some("ftp://x.org")).finish().is_err());
        assert!(Validator::new().url("link", None).finish().is_err());
    }
}
