//! Input validation shared across features.
//!
//! Each concern has its own error enum so command error types can embed
//! them with `#[from]` and routes can map them to field-level messages.

use thiserror::Error;

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_PHONE_LENGTH: usize = 20;
pub const MIN_PHONE_DIGITS: usize = 7;
pub const MAX_NOTES_LENGTH: usize = 500;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    #[error("name is required")]
    Required,

    #[error("name must be at most {max_length} characters")]
    TooLong { max_length: usize },
}

/// Names of people, hospitals and cities: non-empty after trimming and
/// within length bounds.
pub fn validate_name(value: &str) -> Result<(), NameValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NameValidationError::Required);
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(NameValidationError::TooLong {
            max_length: MAX_NAME_LENGTH,
        });
    }
    Ok(())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailValidationError {
    #[error("email is required")]
    Required,

    #[error("email must be at most {max_length} characters")]
    TooLong { max_length: usize },

    #[error("email format is invalid")]
    InvalidFormat,
}

/// Structural email check: a single `@` with a dotted domain. Full RFC
/// validation is the gateway's problem; this catches obvious garbage.
pub fn validate_email(value: &str) -> Result<(), EmailValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EmailValidationError::Required);
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(EmailValidationError::TooLong {
            max_length: MAX_EMAIL_LENGTH,
        });
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(EmailValidationError::InvalidFormat);
    }
    let mut parts = trimmed.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(EmailValidationError::InvalidFormat),
    };
    if local.is_empty() || domain.is_empty() {
        return Err(EmailValidationError::InvalidFormat);
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(EmailValidationError::InvalidFormat);
    }
    Ok(())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneValidationError {
    #[error("phone number is required")]
    Required,

    #[error("phone number must contain at least {min_digits} digits")]
    TooFewDigits { min_digits: usize },

    #[error("phone number must be at most {max_length} characters")]
    TooLong { max_length: usize },

    #[error("phone number contains invalid character '{0}'")]
    InvalidCharacter(char),
}

/// Phone numbers: digits plus common separators, length-bounded.
pub fn validate_phone(value: &str) -> Result<(), PhoneValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PhoneValidationError::Required);
    }
    if trimmed.len() > MAX_PHONE_LENGTH {
        return Err(PhoneValidationError::TooLong {
            max_length: MAX_PHONE_LENGTH,
        });
    }
    for c in trimmed.chars() {
        if !(c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' ')) {
            return Err(PhoneValidationError::InvalidCharacter(c));
        }
    }
    let digits = trimmed.chars().filter(char::is_ascii_digit).count();
    if digits < MIN_PHONE_DIGITS {
        return Err(PhoneValidationError::TooFewDigits {
            min_digits: MIN_PHONE_DIGITS,
        });
    }
    Ok(())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotesValidationError {
    #[error("notes must be at most {max_length} characters")]
    TooLong { max_length: usize },
}

pub fn validate_notes(value: &str) -> Result<(), NotesValidationError> {
    if value.chars().count() > MAX_NOTES_LENGTH {
        return Err(NotesValidationError::TooLong {
            max_length: MAX_NOTES_LENGTH,
        });
    }
    Ok(())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityValidationError {
    #[error("quantity must be at least 1 unit")]
    NotPositive,
}

pub fn validate_quantity(units: i64) -> Result<(), QuantityValidationError> {
    if units < 1 {
        return Err(QuantityValidationError::NotPositive);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Asha Rao").is_ok());
        assert!(validate_name("  ").is_err());
        assert_eq!(validate_name(""), Err(NameValidationError::Required));
        let long = "x".repeat(MAX_NAME_LENGTH + 1);
        assert_eq!(
            validate_name(&long),
            Err(NameValidationError::TooLong {
                max_length: MAX_NAME_LENGTH
            })
        );
    }

    #[test]
    fn test_validate_email_accepts_normal_addresses() {
        assert!(validate_email("donor@example.com").is_ok());
        assert!(validate_email("a.b+tag@sub.example.org").is_ok());
    }

    #[test]
    fn test_validate_email_rejects_garbage() {
        assert_eq!(validate_email(""), Err(EmailValidationError::Required));
        assert_eq!(
            validate_email("no-at-sign"),
            Err(EmailValidationError::InvalidFormat)
        );
        assert_eq!(
            validate_email("two@@example.com"),
            Err(EmailValidationError::InvalidFormat)
        );
        assert_eq!(
            validate_email("user@nodot"),
            Err(EmailValidationError::InvalidFormat)
        );
        assert_eq!(
            validate_email("user@.leading.dot"),
            Err(EmailValidationError::InvalidFormat)
        );
        assert_eq!(
            validate_email("spaced user@example.com"),
            Err(EmailValidationError::InvalidFormat)
        );
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+91 98765 43210").is_ok());
        assert!(validate_phone("(022) 2345-6789").is_ok());
        assert_eq!(validate_phone(""), Err(PhoneValidationError::Required));
        assert_eq!(
            validate_phone("12345"),
            Err(PhoneValidationError::TooFewDigits {
                min_digits: MIN_PHONE_DIGITS
            })
        );
        assert_eq!(
            validate_phone("98765-432x0"),
            Err(PhoneValidationError::InvalidCharacter('x'))
        );
    }

    #[test]
    fn test_validate_notes() {
        assert!(validate_notes("").is_ok());
        assert!(validate_notes("urgent surgery tomorrow").is_ok());
        let long = "n".repeat(MAX_NOTES_LENGTH + 1);
        assert!(validate_notes(&long).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(4).is_ok());
        assert_eq!(
            validate_quantity(0),
            Err(QuantityValidationError::NotPositive)
        );
        assert_eq!(
            validate_quantity(-2),
            Err(QuantityValidationError::NotPositive)
        );
    }
}
