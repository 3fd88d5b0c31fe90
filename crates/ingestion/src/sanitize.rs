//! Identifier sanitizing and extension mapping

/// Keep only `[A-Za-z0-9_.-]` and truncate to `max` characters.
///
/// Returns `None` when the input is empty, nothing survives, or only dots
/// survive (`.` and `..` would resolve outside the folder).
pub fn sanitize_identifier(raw: &str, max: usize) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .take(max)
        .collect();

    let all_dots = cleaned.chars().all(|c| c == '.');
    (!all_dots).then_some(cleaned)
}

/// File extension (with leading dot) for an image MIME type
pub fn extension_for<'a>(mime: &str, default_extension: &'a str) -> &'a str {
    match mime.to_ascii_lowercase().as_str() {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/webp" => ".webp",
        "image/gif" => ".gif",
        _ => default_extension,
    }
}
