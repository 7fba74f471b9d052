/// Display category derived from a raw event type: words split on whitespace,
/// underscores and hyphens, each title-cased, joined by single spaces.
pub fn normalize_category(event_type: &str) -> String {
    event_type
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|word| !word.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Filter value that keeps every event.
pub fn is_all(filter: &str) -> bool {
    let trimmed = filter.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
