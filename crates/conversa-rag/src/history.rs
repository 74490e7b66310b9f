use conversa_personalization::types::PersonalizationLevel;

/// How many prior turns to feed the model, scaled to how much context the
/// personalization level says is worth the tokens.
pub fn history_limit(level: PersonalizationLevel) -> usize {
    match level {
        PersonalizationLevel::Basic => 5,
        PersonalizationLevel::Contextual => 8,
        PersonalizationLevel::Relationship => 12,
        PersonalizationLevel::Closing => 15,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_gets_the_most_history() {
        assert_eq!(history_limit(PersonalizationLevel::Closing), 15);
        assert!(history_limit(PersonalizationLevel::Closing) > history_limit(PersonalizationLevel::Basic));
    }
}
