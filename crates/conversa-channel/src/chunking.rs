use conversa_core::config::{MAX_FRAGMENT_CHARS, MAX_FRAGMENT_LINES, MAX_MESSAGE_BODY_CHARS};

/// Split an outbound body into fragments that respect the gateway's
/// per-message limits: each fragment holds at most [`MAX_FRAGMENT_LINES`]
/// lines and [`MAX_FRAGMENT_CHARS`] characters, and the whole body is
/// truncated to [`MAX_MESSAGE_BODY_CHARS`] before splitting.
///
/// Splits on line boundaries first; a single line longer than
/// `MAX_FRAGMENT_CHARS` is hard-split mid-line since there is nowhere else
/// to break it.
pub fn split_message(body: &str) -> Vec<String> {
    let truncated: String = body.chars().take(MAX_MESSAGE_BODY_CHARS).collect();

    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut current_lines = 0usize;

    for line in truncated.split('\n') {
        for piece in hard_split(line, MAX_FRAGMENT_CHARS) {
            let piece_len = piece.chars().count();
            let would_overflow_chars = current.chars().count() + piece_len + 1 > MAX_FRAGMENT_CHARS;
            let would_overflow_lines = current_lines + 1 > MAX_FRAGMENT_LINES;

            if !current.is_empty() && (would_overflow_chars || would_overflow_lines) {
                fragments.push(std::mem::take(&mut current));
                current_lines = 0;
            }

            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(&piece);
            current_lines += 1;
        }
    }

    if !current.is_empty() {
        fragments.push(current);
    }

    if fragments.is_empty() {
        fragments.push(String::new());
    }

    fragments
}

/// Break a single line into chunks of at most `max_chars`, preserving
/// content but producing no empty chunks unless `line` itself is empty.
fn hard_split(line: &str, max_chars: usize) -> Vec<String> {
    if line.chars().count() <= max_chars {
        return vec![line.to_string()];
    }
    line.chars()
        .collect::<Vec<char>>()
        .chunks(max_chars)
        .map(|c| c.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_is_single_fragment() {
        let fragments = split_message("hello there");
        assert_eq!(fragments, vec!["hello there".to_string()]);
    }

    #[test]
    fn splits_on_char_limit() {
        let body = "a".repeat(MAX_FRAGMENT_CHARS + 50);
        let fragments = split_message(&body);
        assert!(fragments.len() >= 2);
        for f in &fragments {
            assert!(f.chars().count() <= MAX_FRAGMENT_CHARS);
        }
    }

    #[test]
    fn splits_on_line_limit() {
        let body = (0..MAX_FRAGMENT_LINES + 10)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let fragments = split_message(&body);
        assert!(fragments.len() >= 2);
        for f in &fragments {
            assert!(f.split('\n').count() <= MAX_FRAGMENT_LINES);
        }
    }

    #[test]
    fn truncates_overall_body() {
        let body = "x".repeat(MAX_MESSAGE_BODY_CHARS + 1000);
        let fragments = split_message(&body);
        let total: usize = fragments.iter().map(|f| f.chars().count()).sum();
        assert!(total <= MAX_MESSAGE_BODY_CHARS);
    }
}
