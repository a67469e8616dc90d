//! Account identity rules: usernames, public names and referral codes.

use uuid::Uuid;

use crate::domain::error::DomainError;

const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const GENERATED_CODE_LEN: usize = 8;
const MIN_CODE_LEN: usize = 4;
const MAX_CODE_LEN: usize = 16;
const MAX_ANONYMOUS_NAME_CHARS: usize = 40;

pub fn validate_username(username: &str) -> Result<String, DomainError> {
    let username = username.trim();
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(DomainError::validation(
            "username must be between 3 and 32 characters",
        ));
    }
    if !username
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return Err(DomainError::validation(
            "username may only contain letters, digits and underscores",
        ));
    }
    Ok(username.to_string())
}

pub fn validate_anonymous_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("anonymous_name must not be empty"));
    }
    if name.chars().count() > MAX_ANONYMOUS_NAME_CHARS {
        return Err(DomainError::validation(format!(
            "anonymous_name exceeds {MAX_ANONYMOUS_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

/// Referral codes compare case-insensitively; the stored form is uppercase.
pub fn normalize_referral_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

pub fn validate_desired_code(code: &str) -> Result<String, DomainError> {
    let code = normalize_referral_code(code);
    if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&code.len())
        || !code.chars().all(|ch| ch.is_ascii_alphanumeric())
    {
        return Err(DomainError::validation(format!(
            "referral code must be {MIN_CODE_LEN}-{MAX_CODE_LEN} letters or digits"
        )));
    }
    Ok(code)
}

pub fn generate_referral_code() -> String {
    random_code(GENERATED_CODE_LEN)
}

pub fn generate_anonymous_name() -> String {
    format!("Anon-{}", random_code(6))
}

fn random_code(len: usize) -> String {
    let bytes = Uuid::new_v4().into_bytes();
    bytes
        .iter()
        .take(len)
        .map(|byte| char::from(CODE_ALPHABET[usize::from(*byte) % CODE_ALPHABET.len()]))
        .collect()
}
