//! Cheap pre-checks run before ever spending a model call on qualification.

const MIN_UTTERANCE_LEN: usize = 5;
const MIN_HISTORY_MESSAGES: usize = 3;

const TRIVIAL_GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "yo", "hiya", "sup", "good morning", "good afternoon", "good evening",
    "howdy", "hi there", "hello there",
];

fn is_trivial_greeting(utterance: &str) -> bool {
    let normalized = utterance.trim().trim_end_matches(['!', '.', '?']).to_lowercase();
    TRIVIAL_GREETINGS.contains(&normalized.as_str())
}

/// True when the utterance and history are substantial enough to be worth
/// an LLM qualification call at all.
pub fn passes_pre_gate(utterance: &str, history_len: usize) -> bool {
    utterance.trim().chars().count() >= MIN_UTTERANCE_LEN
        && !is_trivial_greeting(utterance)
        && history_len >= MIN_HISTORY_MESSAGES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_greeting() {
        assert!(!passes_pre_gate("Hi", 5));
    }

    #[test]
    fn rejects_thin_history() {
        assert!(!passes_pre_gate("we need enterprise pricing for 500 seats", 1));
    }

    #[test]
    fn accepts_substantial_message_with_history() {
        assert!(passes_pre_gate("we process 500+ inquiries daily and need enterprise pricing", 3));
    }
}
