use conversa_core::domain::Contact;

use crate::types::{
    CommunicationStyle, CtaType, PersonalizationLevel, RelationshipApproach, ResponseStrategy,
    Strategy, UrgencyLevel,
};

fn strategy_guidance(s: ResponseStrategy) -> &'static str {
    match s {
        ResponseStrategy::Educational => {
            "Focus on educating and informing. Provide valuable insights and build awareness."
        }
        ResponseStrategy::Consultative => {
            "Ask thoughtful questions to understand needs. Listen actively and provide tailored advice."
        }
        ResponseStrategy::SolutionFocused => {
            "Present specific solutions that address their identified needs. Be direct about benefits."
        }
        ResponseStrategy::Closing => {
            "Guide toward decision-making. Create urgency and provide clear next steps."
        }
    }
}

fn style_guidance(s: CommunicationStyle) -> &'static str {
    match s {
        CommunicationStyle::Technical => {
            "Use technical language, provide detailed specifications, focus on implementation details."
        }
        CommunicationStyle::Business => {
            "Focus on business benefits, ROI, efficiency gains, and strategic value."
        }
        CommunicationStyle::Conversational => "Use friendly, approachable tone. Be personable and engaging.",
        CommunicationStyle::Formal => "Maintain professional tone. Be structured and respectful.",
    }
}

fn personalization_guidance(level: PersonalizationLevel) -> &'static str {
    match level {
        PersonalizationLevel::Basic => "Use general information. Keep responses helpful but not overly specific.",
        PersonalizationLevel::Contextual => "Reference their expressed interests and basic context.",
        PersonalizationLevel::Relationship => "Leverage conversation history and demonstrated preferences.",
        PersonalizationLevel::Closing => {
            "Use deep context knowledge to create compelling, personalized responses."
        }
    }
}

fn journey_guidance(contact: &Contact) -> &'static str {
    use conversa_core::domain::JourneyStage::*;
    match contact.journey_stage {
        Discovery => "They're learning about solutions. Focus on education and awareness building.",
        Interest => "They've shown interest. Help them understand how you can help their specific situation.",
        Evaluation => "They're comparing options. Differentiate your solution and address concerns.",
        Decision => "They're ready to decide. Provide confidence and clear next steps.",
    }
}

fn cta_guidance(cta: CtaType) -> &'static str {
    match cta {
        CtaType::ScheduleCall => "Suggest scheduling a call to discuss their specific needs.",
        CtaType::RequestDemo => "Offer a demo or detailed walkthrough of relevant features.",
        CtaType::LearnMore => "Provide additional resources or offer to answer specific questions.",
        CtaType::EducationalContent => "Share helpful resources or insights related to their interests.",
        CtaType::StayConnected => "Offer to keep them updated on relevant developments.",
    }
}

fn urgency_guidance(level: UrgencyLevel) -> &'static str {
    match level {
        UrgencyLevel::High => {
            "Create appropriate urgency. Mention time-sensitive opportunities or limited availability."
        }
        UrgencyLevel::Medium => "Gently encourage action. Mention benefits of acting sooner rather than later.",
        UrgencyLevel::Low => {
            "Be patient and supportive. Focus on building relationship over pushing for immediate action."
        }
    }
}

fn relationship_guidance(approach: RelationshipApproach) -> &'static str {
    match approach {
        RelationshipApproach::TrustBuilding => "Focus on establishing credibility and demonstrating expertise.",
        RelationshipApproach::RelationshipDeepening => {
            "Build on existing rapport and show genuine interest in their success."
        }
        RelationshipApproach::ExecutiveRapport => {
            "Communicate at their level with strategic focus and respect for their time."
        }
        RelationshipApproach::CredibilityFocused => {
            "Provide evidence, data, and logical reasoning to build confidence."
        }
        RelationshipApproach::ProfessionalFriendly => {
            "Balance professionalism with warmth and approachability."
        }
    }
}

/// Renders a strategy into a block of plain-text guidance appended to the
/// model's system prompt. Never throws: every branch has a guidance string.
pub fn render(strategy: &Strategy, contact: &Contact) -> String {
    let mut lines = vec![
        format!("RESPONSE STRATEGY: {}", strategy_guidance(strategy.response_strategy)),
        format!("COMMUNICATION STYLE: {}", style_guidance(strategy.communication_style)),
        format!(
            "PERSONALIZATION LEVEL: {}",
            personalization_guidance(strategy.personalization_level)
        ),
    ];

    if let Some(name) = &contact.name {
        let company = contact.company.as_deref().unwrap_or("their company");
        lines.push(format!("CUSTOMER: {name} from {company}"));
    }

    lines.push(format!("CUSTOMER JOURNEY: {}", journey_guidance(contact)));

    if !strategy.pain_points_to_address.is_empty() {
        lines.push(format!("ADDRESS PAIN POINTS: {}", strategy.pain_points_to_address.join(", ")));
    }
    if !strategy.goals_to_highlight.is_empty() {
        lines.push(format!("HIGHLIGHT GOALS: {}", strategy.goals_to_highlight.join(", ")));
    }
    if !strategy.key_focus_areas.is_empty() {
        lines.push(format!("KEY FOCUS AREAS: {}", strategy.key_focus_areas.join(", ")));
    }
    if !strategy.examples_to_include.is_empty() && contact.prefer_as_example {
        lines.push(format!("INCLUDE EXAMPLES: {}", strategy.examples_to_include.join(", ")));
    }

    lines.push(format!("CALL TO ACTION: {}", cta_guidance(strategy.call_to_action_type)));
    lines.push(format!("URGENCY LEVEL: {}", urgency_guidance(strategy.urgency_level)));
    lines.push(format!(
        "RELATIONSHIP APPROACH: {}",
        relationship_guidance(strategy.relationship_approach)
    ));

    format!("\n\n--- PERSONALIZATION GUIDANCE ---\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::plan;
    use conversa_core::ids::TenantId;

    #[test]
    fn includes_customer_line_when_name_known() {
        let mut contact = Contact::new(TenantId::new(), "15551234567".to_string());
        contact.name = Some("Sarah".to_string());
        contact.company = Some("Acme".to_string());
        let strategy = plan(&contact);
        let rendered = render(&strategy, &contact);
        assert!(rendered.contains("CUSTOMER: Sarah from Acme"));
    }

    #[test]
    fn omits_examples_when_contact_opted_out() {
        let mut contact = Contact::new(TenantId::new(), "15551234567".to_string());
        contact.prefer_as_example = false;
        let strategy = plan(&contact);
        let rendered = render(&strategy, &contact);
        assert!(!rendered.contains("INCLUDE EXAMPLES"));
    }
}
