use std::borrow::Cow;

const MAX_API_ERROR_CHARS: usize = 200;
const REDACTED: &str = "[REDACTED]";

/// Token prefixes that identify a credential on their own.
const PREFIX_PATTERNS: [&str; 4] = ["sk-", "xoxb-", "ghp_", "eyJ"];

/// Markers followed by a credential value.
const MARKER_PATTERNS: [&str; 8] = [
    "Authorization: Bearer ",
    "authorization: bearer ",
    "Authorization: Bot ",
    "Bearer ",
    "api_key=",
    "access_token=",
    "\"api_key\":\"",
    "\"token\":\"",
];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '=')
}

fn token_end(input: &str, from: usize) -> usize {
    input[from..]
        .char_indices()
        .find(|(_, c)| !is_secret_char(*c))
        .map_or(input.len(), |(i, _)| from + i)
}

/// Replace `marker<token>` (or the whole token when `keep_marker` is false)
/// with the redaction placeholder.
fn redact_after(scrubbed: &mut String, marker: &str, keep_marker: bool) -> bool {
    let mut modified = false;
    let mut search_from = 0;
    while let Some(rel) = scrubbed[search_from..].find(marker) {
        let start = search_from + rel;
        let content_start = start + marker.len();
        let end = token_end(scrubbed, content_start);

        if end == content_start {
            search_from = content_start;
            continue;
        }

        let replace_from = if keep_marker { content_start } else { start };
        scrubbed.replace_range(replace_from..end, REDACTED);
        modified = true;
        search_from = replace_from + REDACTED.len();
    }
    modified
}

/// Redact credential-looking substrings from provider error text.
pub fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    let suspicious = PREFIX_PATTERNS
        .iter()
        .chain(MARKER_PATTERNS.iter())
        .any(|pattern| input.contains(pattern));
    if !suspicious {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    let mut modified = false;
    for marker in MARKER_PATTERNS {
        modified |= redact_after(&mut scrubbed, marker, true);
    }
    for prefix in PREFIX_PATTERNS {
        modified |= redact_after(&mut scrubbed, prefix, false);
    }

    if modified {
        Cow::Owned(scrubbed)
    } else {
        Cow::Borrowed(input)
    }
}

/// Scrub secrets and cap the length of a provider error body before it is
/// logged or stored.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);
    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed.into_owned();
    }
    let mut capped: String = scrubbed.chars().take(MAX_API_ERROR_CHARS).collect();
    capped.push_str("...");
    capped
}
