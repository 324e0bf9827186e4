use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Field key to message, in field order of the key names.
pub type FieldErrors = BTreeMap<&'static str, String>;

pub const MIN_PASSWORD_LEN: usize = 6;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"))
}

fn otp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4,6}$").expect("otp pattern"))
}

pub fn email(value: &str) -> Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("Email is required".to_string());
    }
    if !email_re().is_match(value) {
        return Err("Enter a valid email address".to_string());
    }
    Ok(())
}

pub fn person_name(value: &str) -> Result<(), String> {
    let len = value.trim().chars().count();
    if len < 2 {
        Err("Name must be at least 2 characters".to_string())
    } else if len > 100 {
        Err("Name must be at most 100 characters".to_string())
    } else {
        Ok(())
    }
}

pub fn password(value: &str) -> Result<(), String> {
    if value.is_empty() {
        Err("Password is required".to_string())
    } else if value.chars().count() < MIN_PASSWORD_LEN {
        Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ))
    } else {
        Ok(())
    }
}

pub fn otp(value: &str) -> Result<(), String> {
    if otp_re().is_match(value.trim()) {
        Ok(())
    } else {
        Err("OTP must be 4 to 6 digits".to_string())
    }
}

pub fn task_name(value: &str) -> Result<(), String> {
    let len = value.trim().chars().count();
    if len < 2 {
        Err("Task name must be at least 2 characters".to_string())
    } else if len > 200 {
        Err("Task name must be at most 200 characters".to_string())
    } else {
        Ok(())
    }
}

pub fn description(value: &str) -> Result<(), String> {
    if value.chars().count() > 1000 {
        Err("Description must be at most 1000 characters".to_string())
    } else {
        Ok(())
    }
}

pub fn priority(value: &str) -> Result<(), String> {
    match crate::models::Priority::parse(value) {
        Some(_) => Ok(()),
        None => Err("Priority must be low, medium or high".to_string()),
    }
}

/// Empty is allowed; anything else must be a real `YYYY-MM-DD` date.
pub fn last_date(value: &str) -> Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| "Last date must be a valid date (YYYY-MM-DD)".to_string())
}

/// Runs a check and records its message under `key` on failure.
pub fn check(errors: &mut FieldErrors, key: &'static str, result: Result<(), String>) {
    if let Err(message) = result {
        errors.insert(key, message);
    }
}
