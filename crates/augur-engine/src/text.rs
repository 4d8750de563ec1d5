//! Text bounding helpers

/// First `max_chars` characters of `text`, never splitting a character
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Trim and truncate
pub(crate) fn bounded(text: &str, max_chars: usize) -> String {
    truncate_chars(text.trim(), max_chars).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_bounded_trims_first() {
        assert_eq!(bounded("   tender notice  ", 6), "tender");
    }
}
