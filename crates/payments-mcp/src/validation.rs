//! Input validation for tool arguments.
//!
//! Arguments are first shape-checked by serde, then field rules run through a
//! [`Validator`] that collects every issue before failing. Nothing here makes
//! network calls: an input that fails validation never reaches a provider.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ToolError;

/// Field-level rules for a tool input.
pub trait Validate {
    fn validate(&self, v: &mut Validator);
}

/// Collects validation issues, tracking the current field path.
#[derive(Debug, Default)]
pub struct Validator {
    path: Vec<String>,
    issues: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn field(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path.join("."), name)
        }
    }

    /// Run `f` with `name` appended to the field path.
    pub fn nested(&mut self, name: &str, f: impl FnOnce(&mut Self)) {
        self.path.push(name.to_string());
        f(self);
        self.path.pop();
    }

    pub fn issue(&mut self, name: &str, message: impl AsRef<str>) {
        let field = self.field(name);
        self.issues.push(format!("{field}: {}", message.as_ref()));
    }

    pub fn min_len(&mut self, name: &str, value: &str, min: usize) {
        if value.chars().count() < min {
            self.issue(name, format!("must contain at least {min} character(s)"));
        }
    }

    pub fn max_len(&mut self, name: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.issue(name, format!("must contain at most {max} character(s)"));
        }
    }

    pub fn opt_min_len(&mut self, name: &str, value: Option<&str>, min: usize) {
        if let Some(value) = value {
            self.min_len(name, value, min);
        }
    }

    pub fn opt_max_len(&mut self, name: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            self.max_len(name, value, max);
        }
    }

    pub fn email(&mut self, name: &str, value: &str) {
        if !is_email(value) {
            self.issue(name, "must be a valid email address");
        }
    }

    pub fn positive(&mut self, name: &str, value: i64) {
        if value <= 0 {
            self.issue(name, "must be a positive integer");
        }
    }

    pub fn opt_positive(&mut self, name: &str, value: Option<i64>) {
        if let Some(value) = value {
            self.positive(name, value);
        }
    }

    pub fn min(&mut self, name: &str, value: i64, min: i64) {
        if value < min {
            self.issue(name, format!("must be at least {min}"));
        }
    }

    pub fn range(&mut self, name: &str, value: i64, min: i64, max: i64) {
        if value < min || value > max {
            self.issue(name, format!("must be between {min} and {max}"));
        }
    }

    pub fn non_empty<T>(&mut self, name: &str, items: &[T]) {
        if items.is_empty() {
            self.issue(name, "must contain at least one item");
        }
    }

    pub fn finish(self) -> Result<(), ToolError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ToolError::InvalidInput(self.issues.join("; ")))
        }
    }
}

/// Deserialize and validate tool arguments. Missing arguments are treated
/// as an empty object.
pub fn parse_input<T: DeserializeOwned + Validate>(args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    let input: T =
        serde_json::from_value(args).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

    let mut v = Validator::new();
    input.validate(&mut v);
    v.finish()?;
    Ok(input)
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Inner {
        city: String,
    }

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        email: String,
        value: i64,
        inner: Inner,
    }

    impl Validate for Sample {
        fn validate(&self, v: &mut Validator) {
            v.min_len("name", &self.name, 1);
            v.email("email", &self.email);
            v.positive("value", self.value);
            v.nested("inner", |v| v.min_len("city", &self.inner.city, 1));
        }
    }

    #[test]
    fn test_valid_input_passes() {
        let s: Sample = parse_input(json!({
            "name": "Ana", "email": "ana@example.com", "value": 10, "inner": {"city": "SP"}
        }))
        .unwrap();
        assert_eq!(s.value, 10);
    }

    #[test]
    fn test_all_issues_reported_with_paths() {
        let err = parse_input::<Sample>(json!({
            "name": "", "email": "nope", "value": 0, "inner": {"city": ""}
        }))
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("name:"));
        assert!(msg.contains("email:"));
        assert!(msg.contains("value:"));
        assert!(msg.contains("inner.city:"));
    }

    #[test]
    fn test_shape_errors_are_invalid_input() {
        let err = parse_input::<Sample>(json!({"name": "x"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn test_null_args_become_empty_object() {
        let err = parse_input::<Sample>(Value::Null).unwrap_err();
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn test_email_rules() {
        assert!(is_email("e2e+run@example.com"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("a b@example.com"));
        assert!(!is_email("a@@example.com"));
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let mut v = Validator::new();
        v.max_len("comment", "ção", 3);
        assert!(v.finish().is_ok());
    }
}
