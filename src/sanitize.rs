//! Sanitization of untrusted text into safe filesystem path segments.
//!
//! Subjects and ticket-box names come straight out of email traffic, so
//! they can carry control characters, path separators, and Windows-reserved
//! punctuation. Every path segment we emit goes through here first.
//!
//! All functions are deterministic and idempotent: sanitizing an already
//! sanitized string is a no-op.

/// Placeholder used when a subject is empty after stripping.
pub const NO_SUBJECT: &str = "No Subject";

/// Placeholder used when a message has no associated ticket box.
pub const UNKNOWN_BOX: &str = "UnknownBox";

/// Maximum length (in characters) of a sanitized subject segment.
pub const MAX_SUBJECT_LEN: usize = 120;

/// Characters that are replaced with `_` in path segments.
const RESERVED: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Sanitize a subject line for use as part of an output filename.
///
/// Control characters are stripped, an empty result becomes
/// [`NO_SUBJECT`], reserved characters become `_`, and the result is
/// truncated to [`MAX_SUBJECT_LEN`] characters.
pub fn sanitize_subject(raw: &str) -> String {
    let stripped = strip_control(raw);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return NO_SUBJECT.to_string();
    }
    let bounded: String = replace_reserved(trimmed).chars().take(MAX_SUBJECT_LEN).collect();
    // Truncation can leave a trailing space, which would not survive a
    // second pass through trim. Drop it here to keep idempotence.
    bounded.trim_end().to_string()
}

/// Sanitize a ticket-box name for use as an output directory segment.
///
/// Same character rules as [`sanitize_subject`] but without the length
/// bound; an empty result becomes [`UNKNOWN_BOX`].
pub fn sanitize_folder(raw: &str) -> String {
    let stripped = strip_control(raw);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return UNKNOWN_BOX.to_string();
    }
    replace_reserved(trimmed)
}

/// Prepare a raw subject for the `Subject:` header: strip control
/// characters, trim, and substitute [`NO_SUBJECT`] when nothing is left.
///
/// No reserved-character replacement and no length bound; those rules
/// exist for path segments, not headers.
pub fn header_subject(raw: &str) -> String {
    let stripped = strip_control(raw);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return NO_SUBJECT.to_string();
    }
    trimmed.to_string()
}

/// Remove all control characters (including tab and newline).
pub fn strip_control(s: &str) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}

fn replace_reserved(s: &str) -> String {
    s.chars()
        .map(|c| if RESERVED.contains(&c) { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_chars_replaced() {
        assert_eq!(sanitize_subject("Q1/Report?"), "Q1_Report_");
        assert_eq!(sanitize_subject("a\\b/c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_control_chars_stripped() {
        assert_eq!(sanitize_subject("Hello\x00World\x1f"), "HelloWorld");
        assert_eq!(sanitize_subject("line1\nline2"), "line1line2");
    }

    #[test]
    fn test_empty_subject_placeholder() {
        assert_eq!(sanitize_subject(""), NO_SUBJECT);
        assert_eq!(sanitize_subject("   "), NO_SUBJECT);
        assert_eq!(sanitize_subject("\x00\x01\x02"), NO_SUBJECT);
    }

    #[test]
    fn test_subject_truncated_to_limit() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_subject(&long).chars().count(), MAX_SUBJECT_LEN);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let long = "é".repeat(200);
        let out = sanitize_subject(&long);
        assert_eq!(out.chars().count(), MAX_SUBJECT_LEN);
        assert!(out.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_idempotent() {
        for input in [
            "Q1/Report?",
            "",
            "  padded  ",
            "normal subject",
            "ctrl\x07chars",
            &"y".repeat(300),
        ] {
            let once = sanitize_subject(input);
            assert_eq!(sanitize_subject(&once), once, "input: {input:?}");
            let folder_once = sanitize_folder(input);
            assert_eq!(sanitize_folder(&folder_once), folder_once);
        }
    }

    #[test]
    fn test_header_subject_keeps_reserved_chars() {
        assert_eq!(header_subject("Q1/Report?"), "Q1/Report?");
        assert_eq!(header_subject("  padded  "), "padded");
        let long = "x".repeat(500);
        assert_eq!(header_subject(&long).len(), 500);
    }

    #[test]
    fn test_header_subject_placeholder() {
        assert_eq!(header_subject(""), NO_SUBJECT);
        assert_eq!(header_subject("   "), NO_SUBJECT);
        assert_eq!(header_subject("\x00\x01\x1f"), NO_SUBJECT);
    }

    #[test]
    fn test_folder_placeholder_and_no_truncation() {
        assert_eq!(sanitize_folder(""), UNKNOWN_BOX);
        assert_eq!(sanitize_folder("Support"), "Support");
        assert_eq!(sanitize_folder("a/b"), "a_b");
        let long = "z".repeat(300);
        assert_eq!(sanitize_folder(&long).len(), 300);
    }
}
