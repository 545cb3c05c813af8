//! Validation helpers for DTOs.

use validator::ValidationError;

/// Maximum accepted length for a participant display name.
pub const MAX_PARTICIPANT_NAME_LEN: usize = 64;

/// Validates that a participant name is non-blank and of reasonable length
/// once surrounding whitespace is trimmed.
pub fn validate_participant_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("participant_name_blank");
        err.message = Some("Participant name must not be blank".into());
        return Err(err);
    }

    if trimmed.len() > MAX_PARTICIPANT_NAME_LEN {
        let mut err = ValidationError::new("participant_name_length");
        err.message = Some(
            format!(
                "Participant name must be at most {} characters (got {})",
                MAX_PARTICIPANT_NAME_LEN,
                trimmed.len()
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_participant_name_valid() {
        assert!(validate_participant_name("Alice").is_ok());
        assert!(validate_participant_name("  Bob  ").is_ok());
        assert!(validate_participant_name(&"x".repeat(64)).is_ok());
    }

    #[test]
    fn test_validate_participant_name_blank() {
        assert!(validate_participant_name("").is_err());
        assert!(validate_participant_name("   ").is_err());
        assert!(validate_participant_name("\t\n").is_err());
    }

    #[test]
    fn test_validate_participant_name_too_long() {
        assert!(validate_participant_name(&"x".repeat(65)).is_err());
    }
}
