use crate::models::user::{CreateUserData, UserPatch};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[1-9]\d{0,15}$").unwrap();
    static ref PHONE_SEPARATORS: Regex = Regex::new(r"[\s\-()]").unwrap();
}

const MIN_NAME_LEN: usize = 2;

/// Form fields that carry validation rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserField {
    Name,
    Email,
    Phone,
}

/// Per-field validation messages, shown inline next to each input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<UserField, String>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: UserField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    fn add(&mut self, field: UserField, message: &str) {
        self.0.insert(field, message.to_string());
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.values().map(String::as_str).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Check every field of a new user
pub fn validate_create(data: &CreateUserData) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    check_name(&data.name, &mut errors);
    check_email(&data.email, &mut errors);
    if let Some(phone) = &data.phone {
        check_phone(phone, &mut errors);
    }

    errors.into_result()
}

/// Check only the fields a patch replaces
pub fn validate_patch(patch: &UserPatch) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if let Some(name) = &patch.name {
        check_name(name, &mut errors);
    }
    if let Some(email) = &patch.email {
        check_email(email, &mut errors);
    }
    if let Some(phone) = &patch.phone {
        check_phone(phone, &mut errors);
    }

    errors.into_result()
}

fn check_name(name: &str, errors: &mut ValidationErrors) {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        errors.add(UserField::Name, "Name is required");
    } else if trimmed.chars().count() < MIN_NAME_LEN {
        errors.add(UserField::Name, "Name must be at least 2 characters");
    }
}

fn check_email(email: &str, errors: &mut ValidationErrors) {
    if email.trim().is_empty() {
        errors.add(UserField::Email, "Email is required");
    } else if !EMAIL_RE.is_match(email.trim()) {
        errors.add(UserField::Email, "Please enter a valid email address");
    }
}

/// Empty is fine: phone is optional
fn check_phone(phone: &str, errors: &mut ValidationErrors) {
    if phone.trim().is_empty() {
        return;
    }
    let digits = PHONE_SEPARATORS.replace_all(phone, "");
    if !PHONE_RE.is_match(&digits) {
        errors.add(UserField::Phone, "Please enter a valid phone number");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserStatus;

    fn data(name: &str, email: &str, phone: Option<&str>) -> CreateUserData {
        CreateUserData {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            address: None,
            status: UserStatus::Active,
        }
    }

    #[test]
    fn test_name_length() {
        let errors = validate_create(&data("A", "a@b.co", None)).unwrap_err();
        assert_eq!(errors.get(UserField::Name), Some("Name must be at least 2 characters"));

        assert!(validate_create(&data("Al", "a@b.co", None)).is_ok());
    }

    #[test]
    fn test_name_required() {
        let errors = validate_create(&data("   ", "a@b.co", None)).unwrap_err();
        assert_eq!(errors.get(UserField::Name), Some("Name is required"));

        // Trimming happens before the length check
        assert!(validate_create(&data(" A ", "a@b.co", None)).is_err());
    }

    #[test]
    fn test_email_shape() {
        let errors = validate_create(&data("Al", "bad", None)).unwrap_err();
        assert_eq!(errors.get(UserField::Email), Some("Please enter a valid email address"));

        assert!(validate_create(&data("Al", "a@b.co", None)).is_ok());
        assert!(validate_create(&data("Al", "a b@c.de", None)).is_err());
        assert!(validate_create(&data("Al", "a@bco", None)).is_err());

        let errors = validate_create(&data("Al", "", None)).unwrap_err();
        assert_eq!(errors.get(UserField::Email), Some("Email is required"));
    }

    #[test]
    fn test_phone_rules() {
        assert!(validate_create(&data("Al", "a@b.co", Some(""))).is_ok());
        assert!(validate_create(&data("Al", "a@b.co", Some("+1 (555) 123-4567"))).is_ok());
        assert!(validate_create(&data("Al", "a@b.co", Some("5551234"))).is_ok());

        let errors = validate_create(&data("Al", "a@b.co", Some("12x45"))).unwrap_err();
        assert_eq!(errors.get(UserField::Phone), Some("Please enter a valid phone number"));

        // Leading zero and more than 16 digits are rejected
        assert!(validate_create(&data("Al", "a@b.co", Some("0123"))).is_err());
        assert!(validate_create(&data("Al", "a@b.co", Some("12345678901234567"))).is_err());
        assert!(validate_create(&data("Al", "a@b.co", Some("1234567890123456"))).is_ok());
    }

    #[test]
    fn test_errors_are_keyed_per_field() {
        let errors = validate_create(&data("A", "bad", Some("12x45"))).unwrap_err();
        assert_eq!(errors.len(), 3);

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["name"], "Name must be at least 2 characters");
        assert_eq!(json["email"], "Please enter a valid email address");
        assert_eq!(json["phone"], "Please enter a valid phone number");
    }

    #[test]
    fn test_patch_checks_only_present_fields() {
        assert!(validate_patch(&UserPatch::default()).is_ok());

        let patch = UserPatch {
            email: Some("bad".to_string()),
            ..Default::default()
        };
        let errors = validate_patch(&patch).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.get(UserField::Email).is_some());

        let clear_phone = UserPatch {
            phone: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_patch(&clear_phone).is_ok());
    }
}
