//! Validation of raw client input.

use crate::ROOM_CODE_LEN;

/// Longest display name accepted, counted in characters after trimming.
pub const MAX_PLAYER_NAME_LEN: usize = 20;

/// Returns `true` if `code` is present and a well-formed room code:
/// exactly six ASCII letters or digits, in either case.
///
/// Takes an `Option` because the field is optional on the wire; a missing
/// code is simply invalid here, while the join handler reports it as its
/// own error kind. [`RoomCode::parse`](crate::RoomCode::parse) gates on
/// this check.
pub fn validate_room_code(code: Option<&str>) -> bool {
    code.is_some_and(|c| {
        c.len() == ROOM_CODE_LEN && c.bytes().all(|b| b.is_ascii_alphanumeric())
    })
}

/// Trims a display name and checks its length.
///
/// Returns the trimmed name when it has 1–20 characters. Only length is
/// checked; control characters pass through.
pub fn validate_player_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if (1..=MAX_PLAYER_NAME_LEN).contains(&len) {
        Some(trimmed.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_room_code_accepts_six_alphanumerics() {
        assert!(validate_room_code(Some("ABC123")));
        assert!(validate_room_code(Some("abc123")));
    }

    #[test]
    fn test_validate_room_code_rejects_wrong_length_and_missing() {
        assert!(!validate_room_code(Some("ABC1234")));
        assert!(!validate_room_code(None));
        assert!(!validate_room_code(Some("")));
    }

    #[test]
    fn test_validate_room_code_rejects_punctuation_and_non_ascii() {
        // "ÄBC12" is six bytes but not six ASCII alphanumerics.
        for bad in ["ABC-12", "ÄBC12", "AB C12"] {
            assert!(!validate_room_code(Some(bad)), "{bad}");
            assert!(crate::RoomCode::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_validate_player_name_trims() {
        assert_eq!(validate_player_name("  Ana  "), Some("Ana".to_string()));
    }

    #[test]
    fn test_validate_player_name_length_bounds() {
        assert_eq!(validate_player_name("   "), None);
        assert!(validate_player_name(&"x".repeat(20)).is_some());
        assert!(validate_player_name(&"x".repeat(21)).is_none());
        // Counted in characters, not bytes.
        assert!(validate_player_name(&"é".repeat(20)).is_some());
    }

    #[test]
    fn test_validate_player_name_keeps_control_characters() {
        assert_eq!(
            validate_player_name("a\u{7}b"),
            Some("a\u{7}b".to_string())
        );
    }
}
