use serde::Deserialize;
use std::collections::BTreeMap;

const PLACEHOLDER_BASE: &str = "https://ui-avatars.com/api/";

/// Form input for creating or editing a student. Every field is optional on the
/// wire so that validation, not deserialization, reports what is missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudentDraft {
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    pub course: String,
    pub image: String,
}

/// Field name -> hint shown next to that field.
pub type FieldErrors = BTreeMap<String, String>;

pub fn validate_student(draft: &StudentDraft) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if draft.name.trim().is_empty() {
        errors.insert("name".into(), "Name is required".into());
    }

    let email = draft.email.trim();
    if email.is_empty() {
        errors.insert("email".into(), "Email is required".into());
    } else if !is_valid_email(email) {
        errors.insert("email".into(), "Please enter a valid email".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Shape check only: `local@domain.tld`, no whitespace, a single `@`, and a dot
/// in the domain with something on both sides of it.
pub fn is_valid_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = s.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

pub fn placeholder_image(name: &str) -> String {
    format!(
        "{}?name={}&background=random",
        PLACEHOLDER_BASE,
        encode_query_component(name.trim())
    )
}

fn encode_query_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
