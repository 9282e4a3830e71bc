//! Input checks applied before a profile is persisted.

use crate::error::RoleError;

const PHONE_MIN_LEN: usize = 6;
const PHONE_MAX_LEN: usize = 30;

/// Accepts an empty phone, or 6 to 30 characters made of digits, spaces
/// and `-+()`.
pub fn validate_phone(phone: &str) -> Result<(), RoleError> {
    if phone.is_empty() {
        return Ok(());
    }

    let len = phone.chars().count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')'));

    if allowed && (PHONE_MIN_LEN..=PHONE_MAX_LEN).contains(&len) {
        Ok(())
    } else {
        Err(RoleError::InvalidPhone(phone.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_phone_is_allowed() {
        assert!(validate_phone("").is_ok());
    }

    #[test]
    fn formatted_numbers_are_accepted() {
        assert!(validate_phone("+54 9 (351) 555-0101").is_ok());
        assert!(validate_phone("555010").is_ok());
    }

    #[test]
    fn letters_are_rejected() {
        assert!(matches!(
            validate_phone("llamar al 555"),
            Err(RoleError::InvalidPhone(_))
        ));
    }

    #[test]
    fn length_bounds() {
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone(&"1".repeat(30)).is_ok());
        assert!(validate_phone(&"1".repeat(31)).is_err());
    }
}
