//! Custom `garde` rules shared by request payloads.
//!
//! Use with `#[garde(custom(...))]`, both rules accept any context.

/// Value must contain something else than whitespace.
pub fn not_blank<C>(value: &str, _ctx: &C) -> garde::Result {
    if value.trim().is_empty() {
        Err(garde::Error::new("field is required"))
    } else {
        Ok(())
    }
}

/// First character must be an uppercase letter.
///
/// Blank values pass, so combine with [`not_blank`] for required fields.
/// Characters without case (digits, punctuation) are rejected, as they have no
/// uppercase form.
pub fn first_letter_uppercase<C>(value: &str, _ctx: &C) -> garde::Result {
    let value = value.trim_start();
    match value.chars().next() {
        None => Ok(()),
        Some(c) if c.is_uppercase() => Ok(()),
        Some(_) => Err(garde::Error::new("first letter must be uppercase")),
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn test_first_letter() {
        assert!(first_letter_uppercase("Drama", &()).is_ok());
        assert!(first_letter_uppercase("Ñandú", &()).is_ok());
        assert!(first_letter_uppercase("drama", &()).is_err());
        assert!(first_letter_uppercase("1984", &()).is_err());
        assert!(first_letter_uppercase("", &()).is_ok());
        assert!(first_letter_uppercase("   ", &()).is_ok());
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("x", &()).is_ok());
        assert!(not_blank("", &()).is_err());
        assert!(not_blank(" \t\n", &()).is_err());
    }

    #[quickcheck]
    fn test_uppercased_is_valid(word: String) -> bool {
        let word: String = word.chars().filter(|c| c.is_alphabetic()).collect();
        match word.chars().next() {
            Some(c) if c.to_uppercase().count() == 1 && c.to_uppercase().all(char::is_uppercase) => {
                let fixed: String = c.to_uppercase().chain(word.chars().skip(1)).collect();
                first_letter_uppercase(&fixed, &()).is_ok()
            }
            _ => true,
        }
    }

    #[quickcheck]
    fn test_lowercase_start_is_invalid(rest: String) -> bool {
        let value = format!("a{rest}");
        first_letter_uppercase(&value, &()).is_err()
    }
}
