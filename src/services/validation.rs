//! Field rules shared by the services. Errors are plain messages; each
//! service wraps them in its own validation variant.

use regex::Regex;
use std::sync::OnceLock;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NOTES_LEN: usize = 500;

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;

pub fn username(value: &str) -> Result<String, String> {
    let value = value.trim();
    if !USERNAME_LEN.contains(&value.chars().count()) {
        return Err(format!(
            "Username must be between {} and {} characters",
            USERNAME_LEN.start(),
            USERNAME_LEN.end()
        ));
    }
    Ok(value.to_string())
}

/// Lower-cased, trimmed email.
pub fn email(value: &str) -> Result<String, String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

    let value = value.trim().to_lowercase();
    if !re.is_match(&value) {
        return Err(format!("Invalid email address: {value}"));
    }
    Ok(value)
}

pub fn password(value: &str) -> Result<(), String> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(())
}

pub fn required(field: &str, value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(value.to_string())
}

pub fn notes(value: Option<&str>) -> Result<(), String> {
    match value {
        Some(notes) if notes.chars().count() > MAX_NOTES_LEN => Err(format!(
            "Notes must be {MAX_NOTES_LEN} characters or less"
        )),
        _ => Ok(()),
    }
}

pub fn non_negative<T: PartialOrd + Default + Copy>(field: &str, value: Option<T>) -> Result<(), String> {
    match value {
        Some(v) if v < T::default() => Err(format!("{field} cannot be negative")),
        _ => Ok(()),
    }
}

/// Empty or whitespace-only strings become `None`.
#[must_use]
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username() {
        assert_eq!(username("  alice ").unwrap(), "alice");
        assert!(username("ab").is_err());
        assert!(username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_email() {
        assert_eq!(email(" Alice@Example.COM ").unwrap(), "alice@example.com");
        assert!(email("not-an-email").is_err());
        assert!(email("a@b").is_err());
    }

    #[test]
    fn test_password() {
        assert!(password("12345").is_err());
        assert!(password("123456").is_ok());
    }

    #[test]
    fn test_non_negative() {
        assert!(non_negative("weight", Some(-0.5_f64)).is_err());
        assert!(non_negative("weight", Some(0.0_f64)).is_ok());
        assert!(non_negative::<i32>("pulse", None).is_ok());
    }

    #[test]
    fn test_notes() {
        assert!(notes(Some(&"x".repeat(501))).is_err());
        assert!(notes(Some("paid at counter")).is_ok());
    }
}
