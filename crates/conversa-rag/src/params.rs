use conversa_llm::ChatParams;
use conversa_personalization::types::CommunicationStyle;

/// Model parameters tuned per communication style: technical/formal replies
/// stay tight and literal, conversational replies get more room and warmth.
pub fn model_params(model: &str, style: CommunicationStyle) -> ChatParams {
    let (temperature, max_tokens) = match style {
        CommunicationStyle::Technical => (0.5, 1000),
        CommunicationStyle::Business => (0.65, 900),
        CommunicationStyle::Conversational => (0.8, 800),
        CommunicationStyle::Formal => (0.55, 1200),
    };
    ChatParams { model: model.to_string(), temperature, max_tokens }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_stay_within_the_documented_ranges() {
        for style in [
            CommunicationStyle::Technical,
            CommunicationStyle::Business,
            CommunicationStyle::Conversational,
            CommunicationStyle::Formal,
        ] {
            let p = model_params("gpt-4o-mini", style);
            assert!((0.5..=0.8).contains(&p.temperature));
            assert!((800..=1200).contains(&p.max_tokens));
        }
    }
}
