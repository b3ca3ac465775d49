//! Identifier to filename mapping.

/// Maps an identifier to a safe file stem.
///
/// Path separators, NUL and control characters become `_`; leading dots
/// and surrounding whitespace are trimmed; the stem is capped at 250 bytes so
/// `<stem>.json.part` still fits NAME_MAX. An identifier with nothing left
/// maps to `_`.
pub fn sanitize_identifier(identifier: &str) -> String {
    const STEM_MAX: usize = 250;

    let mapped: String = identifier
        .trim()
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == '\0' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = mapped.trim_start_matches('.');

    let mut take = trimmed.len().min(STEM_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    let stem = &trimmed[..take];
    if stem.is_empty() {
        "_".to_string()
    } else {
        stem.to_string()
    }
}
