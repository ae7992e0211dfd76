//! Field checks shared by the record forms.
//!
//! Messages follow the wording the web client shows, e.g.
//! `firstname is a required field`.

use crate::error::FieldErrors;

/// Column limit for text fields.
pub const MAX_TEXT_LEN: usize = 255;

pub fn required(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("{field} is a required field"));
    }
}

/// Length is counted in characters, not bytes.
pub fn max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, format!("{field} must be at most {max} characters"));
    }
}

/// Loose shape check (`local@domain.tld`); empty values pass.
pub fn email(errors: &mut FieldErrors, field: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    let valid = value.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && domain.contains('.')
            && !value.contains(char::is_whitespace)
    });
    if !valid {
        errors.add(field, format!("{field} must be a valid email"));
    }
}
