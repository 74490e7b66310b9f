use conversa_core::domain::{Contact, DecisionMakingStyle, EngagementLevel, JourneyStage, TechnicalLevel};

use crate::types::{
    CommunicationStyle, CtaType, PersonalizationLevel, RelationshipApproach, ResponseStrategy,
    Strategy, UrgencyLevel,
};

const PAIN_POINT_PRIORITY: &[(&str, u8)] = &[
    ("manual", 10),
    ("time-consuming", 9),
    ("inefficient", 8),
    ("slow", 7),
    ("frustrated", 6),
    ("problem", 5),
    ("issue", 4),
    ("challenge", 3),
    ("difficulty", 2),
    ("struggle", 1),
];

const GOAL_PRIORITY: &[(&str, u8)] = &[
    ("automate", 10),
    ("streamline", 9),
    ("improve", 8),
    ("increase", 7),
    ("reduce", 6),
    ("want to", 5),
    ("need to", 4),
    ("goal", 3),
    ("objective", 2),
    ("target", 1),
];

fn priority_of(map: &[(&str, u8)], key: &str) -> u8 {
    map.iter().find(|(k, _)| *k == key).map(|(_, p)| *p).unwrap_or(0)
}

fn response_strategy(contact: &Contact) -> ResponseStrategy {
    match contact.journey_stage {
        JourneyStage::Decision => ResponseStrategy::Closing,
        JourneyStage::Evaluation => ResponseStrategy::SolutionFocused,
        JourneyStage::Interest => ResponseStrategy::Consultative,
        JourneyStage::Discovery => ResponseStrategy::Educational,
    }
}

fn communication_style(contact: &Contact) -> CommunicationStyle {
    if contact.technical_level == TechnicalLevel::Developer
        || contact.technical_level == TechnicalLevel::Technical
    {
        return CommunicationStyle::Technical;
    }
    if contact.decision_making_style == DecisionMakingStyle::Analytical {
        return CommunicationStyle::Business;
    }
    if contact.engagement_level == EngagementLevel::High {
        return CommunicationStyle::Conversational;
    }
    if contact.decision_maker {
        return CommunicationStyle::Formal;
    }
    CommunicationStyle::Business
}

/// Mirrors the escalating granularity a reply is allowed: new contacts get
/// generic copy, contacts nearing a decision get the deepest context.
fn personalization_level(contact: &Contact) -> PersonalizationLevel {
    if contact.journey_stage == JourneyStage::Decision
        || contact.engagement_level == EngagementLevel::High
        || contact.decision_maker
    {
        return PersonalizationLevel::Closing;
    }
    if contact.journey_stage == JourneyStage::Evaluation
        || contact.conversation_count >= 3
        || contact.topics_discussed.len() >= 3
    {
        return PersonalizationLevel::Relationship;
    }
    if contact.journey_stage == JourneyStage::Interest
        || contact.conversation_count >= 1
        || !contact.pain_points_mentioned.is_empty()
    {
        return PersonalizationLevel::Contextual;
    }
    PersonalizationLevel::Basic
}

fn key_focus_areas(contact: &Contact) -> Vec<String> {
    let mut areas = Vec::new();
    let pains = &contact.pain_points_mentioned;
    let goals = &contact.goals_expressed;

    if pains.contains("manual") || pains.contains("time-consuming") {
        areas.push("automation_benefits".to_string());
    }
    if pains.contains("inefficient") || pains.contains("slow") {
        areas.push("efficiency_gains".to_string());
    }
    if goals.contains("automate") || goals.contains("streamline") {
        areas.push("workflow_automation".to_string());
    }
    if goals.contains("improve") || goals.contains("increase") {
        areas.push("performance_improvement".to_string());
    }
    if contact.topics_discussed.contains("pricing") {
        areas.push("value_proposition".to_string());
    }
    if contact.topics_discussed.contains("implementation") {
        areas.push("implementation_ease".to_string());
    }
    if let Some(industry) = &contact.industry_focus {
        areas.push(format!("{industry}_specific_solutions"));
    }
    if areas.is_empty() {
        areas = vec!["core_benefits".to_string(), "ease_of_use".to_string(), "roi".to_string()];
    }
    areas.truncate(3);
    areas
}

fn prioritize(set: &std::collections::BTreeSet<String>, priority: &[(&str, u8)], limit: usize) -> Vec<String> {
    let mut items: Vec<String> = set.iter().cloned().collect();
    items.sort_by(|a, b| priority_of(priority, b).cmp(&priority_of(priority, a)));
    items.truncate(limit);
    items
}

fn examples_to_include(contact: &Contact, pain_points: &[String]) -> Vec<String> {
    let mut examples = Vec::new();
    if let Some(industry) = &contact.industry_focus {
        examples.push(format!("{industry}_case_study"));
    }
    if let Some(size) = &contact.company_size {
        examples.push(format!("{size}_company_example"));
    }
    for pain_point in pain_points.iter().take(2) {
        examples.push(format!("{pain_point}_solution_example"));
    }
    if contact.technical_level == TechnicalLevel::Developer || contact.technical_level == TechnicalLevel::Technical {
        examples.push("technical_implementation_example".to_string());
    } else {
        examples.push("business_outcome_example".to_string());
    }
    if examples.is_empty() {
        examples = vec!["general_success_story".to_string(), "roi_example".to_string()];
    }
    examples.truncate(2);
    examples
}

fn cta_type(contact: &Contact) -> CtaType {
    match contact.journey_stage {
        JourneyStage::Decision => CtaType::ScheduleCall,
        JourneyStage::Evaluation => CtaType::RequestDemo,
        JourneyStage::Interest => CtaType::LearnMore,
        JourneyStage::Discovery => CtaType::EducationalContent,
    }
}

fn urgency_level(contact: &Contact) -> UrgencyLevel {
    match contact.timeline.as_deref() {
        Some("urgent") => return UrgencyLevel::High,
        Some("short") => return UrgencyLevel::Medium,
        _ => {}
    }
    if contact.engagement_level == EngagementLevel::High && contact.decision_maker {
        return UrgencyLevel::Medium;
    }
    if contact.journey_stage == JourneyStage::Decision {
        return UrgencyLevel::Medium;
    }
    UrgencyLevel::Low
}

fn relationship_approach(contact: &Contact) -> RelationshipApproach {
    if contact.conversation_count <= 1 {
        return RelationshipApproach::TrustBuilding;
    }
    if contact.engagement_level == EngagementLevel::High {
        return RelationshipApproach::RelationshipDeepening;
    }
    if contact.decision_maker {
        return RelationshipApproach::ExecutiveRapport;
    }
    if contact.decision_making_style == DecisionMakingStyle::Analytical {
        return RelationshipApproach::CredibilityFocused;
    }
    RelationshipApproach::ProfessionalFriendly
}

/// Builds the full adaptation strategy for one contact's next reply.
pub fn plan(contact: &Contact) -> Strategy {
    let pain_points_to_address = prioritize(&contact.pain_points_mentioned, PAIN_POINT_PRIORITY, 2);
    let goals_to_highlight = prioritize(&contact.goals_expressed, GOAL_PRIORITY, 2);

    Strategy {
        response_strategy: response_strategy(contact),
        communication_style: communication_style(contact),
        personalization_level: personalization_level(contact),
        key_focus_areas: key_focus_areas(contact),
        examples_to_include: examples_to_include(contact, &pain_points_to_address),
        pain_points_to_address,
        goals_to_highlight,
        call_to_action_type: cta_type(contact),
        urgency_level: urgency_level(contact),
        relationship_approach: relationship_approach(contact),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::ids::TenantId;

    fn contact() -> Contact {
        Contact::new(TenantId::new(), "15551234567".to_string())
    }

    #[test]
    fn discovery_stage_is_educational_and_basic() {
        let c = contact();
        let s = plan(&c);
        assert_eq!(s.response_strategy, ResponseStrategy::Educational);
        assert_eq!(s.personalization_level, PersonalizationLevel::Basic);
        assert_eq!(s.call_to_action_type, CtaType::EducationalContent);
    }

    #[test]
    fn decision_stage_closes_with_high_urgency_timeline() {
        let mut c = contact();
        c.journey_stage = JourneyStage::Decision;
        c.timeline = Some("urgent".to_string());
        let s = plan(&c);
        assert_eq!(s.response_strategy, ResponseStrategy::Closing);
        assert_eq!(s.personalization_level, PersonalizationLevel::Closing);
        assert_eq!(s.urgency_level, UrgencyLevel::High);
        assert_eq!(s.call_to_action_type, CtaType::ScheduleCall);
    }

    #[test]
    fn pain_points_are_priority_ordered() {
        let mut c = contact();
        c.pain_points_mentioned.insert("struggle".to_string());
        c.pain_points_mentioned.insert("manual".to_string());
        let s = plan(&c);
        assert_eq!(s.pain_points_to_address[0], "manual");
    }

    #[test]
    fn new_contact_gets_trust_building_approach() {
        let c = contact();
        let s = plan(&c);
        assert_eq!(s.relationship_approach, RelationshipApproach::TrustBuilding);
    }

    #[test]
    fn developer_gets_technical_style() {
        let mut c = contact();
        c.technical_level = TechnicalLevel::Developer;
        let s = plan(&c);
        assert_eq!(s.communication_style, CommunicationStyle::Technical);
    }
}
