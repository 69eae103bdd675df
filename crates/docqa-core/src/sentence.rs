//! Sentence segmentation on terminal punctuation followed by spaces.

/// Split `text` after every `.`, `!` or `?` that is followed by one or more
/// ASCII spaces. The punctuation stays with its sentence, the run of spaces
/// is dropped. Newlines are not boundaries. Empty fragments are skipped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if !matches!(ch, '.' | '!' | '?') { continue; }
        if !matches!(chars.peek(), Some(&(_, ' '))) { continue; }
        let end = i + ch.len_utf8();
        push_fragment(&mut sentences, &text[start..end]);
        let mut next = end;
        while let Some(&(j, ' ')) = chars.peek() {
            next = j + 1;
            chars.next();
        }
        start = next;
    }
    if start < text.len() {
        push_fragment(&mut sentences, &text[start..]);
    }
    sentences
}

fn push_fragment<'a>(out: &mut Vec<&'a str>, fragment: &'a str) {
    if !fragment.trim().is_empty() {
        out.push(fragment);
    }
}

#[cfg(test)]
mod tests {
    use super::split_sentences;

    #[test]
    fn splits_on_terminal_punctuation() {
        let s = split_sentences("One two. Three four! Five six? Seven");
        assert_eq!(s, vec!["One two.", "Three four!", "Five six?", "Seven"]);
    }

    #[test]
    fn consumes_runs_of_spaces() {
        assert_eq!(split_sentences("A.   B."), vec!["A.", "B."]);
    }

    #[test]
    fn punctuation_without_space_is_not_a_boundary() {
        assert_eq!(split_sentences("v1.2 is out.Next"), vec!["v1.2 is out.Next"]);
    }

    #[test]
    fn newline_is_not_a_boundary() {
        assert_eq!(split_sentences("First.\nSecond."), vec!["First.\nSecond."]);
    }

    #[test]
    fn trailing_spaces_do_not_make_empty_sentences() {
        assert_eq!(split_sentences("Done.  "), vec!["Done."]);
        assert!(split_sentences("").is_empty());
    }

    #[test]
    fn handles_multibyte_text() {
        assert_eq!(split_sentences("Café ouvert. Très bien!"), vec!["Café ouvert.", "Très bien!"]);
    }
}
