/// Collapse runs of 3+ newlines to a blank line and runs of 2+ spaces to one
/// space, then trim.
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0usize;
    let mut spaces = 0usize;
    for ch in text.chars() {
        match ch {
            '\n' => {
                spaces = 0;
                newlines += 1;
                if newlines <= 2 { out.push('\n'); }
            }
            ' ' => {
                newlines = 0;
                spaces += 1;
                if spaces == 1 { out.push(' '); }
            }
            _ => {
                newlines = 0;
                spaces = 0;
                out.push(ch);
            }
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::clean_text;

    #[test]
    fn collapses_blank_runs_and_spaces() {
        assert_eq!(clean_text("  a   b\n\n\n\nc  "), "a b\n\nc");
    }

    #[test]
    fn keeps_single_blank_line() {
        assert_eq!(clean_text("a\n\nb"), "a\n\nb");
    }
}
