//! Field-level rule checking for every entity.
//!
//! Each rule set takes the raw input of a create or update request plus, for
//! updates, the id of the record being changed (so uniqueness ignores it).
//! A rule set either yields a typed draft ready for persistence or a
//! [`FieldErrors`] map of field name to violation messages.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

mod access;
mod cars;
mod ledger;
mod users;

pub use access::{validate_permission, validate_role, PermissionDraft, RoleDraft};
pub use cars::{validate_car, validate_car_fields, CarDraft};
pub use ledger::{validate_activity_log, validate_message, ActivityLogDraft, MessageDraft};
pub use users::{validate_user, ImageUpload, UserDraft, MAX_PROFILE_IMAGE_BYTES};

/// Field name to human-readable violation messages, ordered by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(value)` when no rule was violated.
    pub fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, msgs)| format!("{}: {}", field, msgs.join(" ")))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trimmed, non-empty value of a required text field.
fn required<'a>(errors: &mut FieldErrors, field: &str, value: Option<&'a str>) -> Option<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.add(field, format!("The {} field is required.", label(field)));
            None
        }
    }
}

/// Empty strings count as absent for nullable text fields.
fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn max_chars(errors: &mut FieldErrors, field: &str, value: &str, max: usize) -> bool {
    if value.chars().count() > max {
        errors.add(
            field,
            format!(
                "The {} field must not be greater than {} characters.",
                label(field),
                max
            ),
        );
        return false;
    }
    true
}

/// Parses a value into one case of a closed enumeration.
fn one_of<T: FromStr>(errors: &mut FieldErrors, field: &str, value: &str) -> Option<T> {
    match value.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.add(field, format!("The selected {} is invalid.", label(field)));
            None
        }
    }
}

fn label(field: &str) -> String {
    field.trim_end_matches("_id").replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_accumulate_per_field() {
        let mut errors = FieldErrors::default();
        assert!(errors.is_empty());
        errors.add("name", "first");
        errors.add("name", "second");
        errors.add("email", "third");
        assert_eq!(errors.get("name"), ["first", "second"]);
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["email", "name"]);
        assert!(errors.clone().finish(()).is_err());
        assert_eq!(errors.to_string(), "email: third; name: first second");
    }

    #[test]
    fn email_format() {
        assert!(is_valid_email("jane@example.com"));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("jane example@x.io"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn required_rejects_blank() {
        let mut errors = FieldErrors::default();
        assert_eq!(required(&mut errors, "brand", Some("  ")), None);
        assert_eq!(required(&mut errors, "model", None), None);
        assert_eq!(required(&mut errors, "color", Some(" red ")), Some("red"));
        assert_eq!(errors.get("brand"), ["The brand field is required."]);
        assert!(errors.has("model"));
        assert!(!errors.has("color"));
    }

    #[test]
    fn labels_drop_id_suffix() {
        assert_eq!(label("sender_id"), "sender");
        assert_eq!(label("serial_number"), "serial number");
    }
}
