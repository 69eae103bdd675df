/// Shortest token kept (in chars) is one longer than this.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Lowercase, replace anything that is neither a word character nor
/// whitespace with a space, split on whitespace and drop tokens of two chars
/// or fewer. Queries and documents go through the same function.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c.is_whitespace() { c } else { ' ' })
        .collect();
    normalized
        .split_whitespace()
        .filter(|t| t.chars().count() > MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_short_tokens() {
        assert_eq!(tokenize("The pump's O-ring, at 3.5 bar!"), vec!["the", "pump", "ring", "bar"]);
    }

    #[test]
    fn keeps_underscores_and_unicode_words() {
        assert_eq!(tokenize("snake_case Überdruck ok"), vec!["snake_case", "überdruck"]);
    }

    #[test]
    fn length_is_counted_in_chars() {
        // two chars, four bytes
        assert!(tokenize("éé").is_empty());
        assert_eq!(tokenize("ééé"), vec!["ééé"]);
    }
}
