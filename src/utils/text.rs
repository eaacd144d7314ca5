const ELLIPSIS: &str = "...";

/// Cut `s` so the result, ellipsis included, is at most `max_chars` chars.
///
/// Platform message limits count characters, so the budget covers the
/// ellipsis too.
#[must_use]
pub fn truncate_to_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }

    let ellipsis_len = ELLIPSIS.chars().count();
    if max_chars <= ellipsis_len {
        return s.chars().take(max_chars).collect();
    }

    let keep = max_chars - ellipsis_len;
    let end = s.char_indices().nth(keep).map_or(s.len(), |(idx, _)| idx);
    format!("{}{ELLIPSIS}", &s[..end])
}
