use std::fmt;

/// How the reply should try to move the conversation forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStrategy {
    Educational,
    Consultative,
    SolutionFocused,
    Closing,
}

impl fmt::Display for ResponseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Educational => "educational",
            Self::Consultative => "consultative",
            Self::SolutionFocused => "solution_focused",
            Self::Closing => "closing",
        };
        write!(f, "{s}")
    }
}

/// Register and framing for the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunicationStyle {
    Technical,
    Business,
    Conversational,
    Formal,
}

impl fmt::Display for CommunicationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Technical => "technical",
            Self::Business => "business",
            Self::Conversational => "conversational",
            Self::Formal => "formal",
        };
        write!(f, "{s}")
    }
}

/// How much conversation-specific context the reply is allowed to lean on.
/// Mirrors the granularity controls the RAG and processor layers use to
/// decide how much history to feed the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalizationLevel {
    Basic,
    Contextual,
    Relationship,
    Closing,
}

impl fmt::Display for PersonalizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Basic => "basic",
            Self::Contextual => "contextual",
            Self::Relationship => "relationship",
            Self::Closing => "closing",
        };
        write!(f, "{s}")
    }
}

/// Complete set of adaptation decisions for one reply.
#[derive(Debug, Clone)]
pub struct Strategy {
    pub response_strategy: ResponseStrategy,
    pub communication_style: CommunicationStyle,
    pub personalization_level: PersonalizationLevel,
    pub key_focus_areas: Vec<String>,
    pub pain_points_to_address: Vec<String>,
    pub goals_to_highlight: Vec<String>,
    pub examples_to_include: Vec<String>,
    pub call_to_action_type: CtaType,
    pub urgency_level: UrgencyLevel,
    pub relationship_approach: RelationshipApproach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtaType {
    ScheduleCall,
    RequestDemo,
    LearnMore,
    EducationalContent,
    StayConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrgencyLevel {
    High,
    Medium,
    Low,
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipApproach {
    TrustBuilding,
    RelationshipDeepening,
    ExecutiveRapport,
    CredibilityFocused,
    ProfessionalFriendly,
}

impl Strategy {
    pub fn default_strategy() -> Self {
        Self {
            response_strategy: ResponseStrategy::Consultative,
            communication_style: CommunicationStyle::Business,
            personalization_level: PersonalizationLevel::Basic,
            key_focus_areas: vec!["core_benefits".to_string()],
            pain_points_to_address: vec![],
            goals_to_highlight: vec![],
            examples_to_include: vec!["general_success_story".to_string()],
            call_to_action_type: CtaType::LearnMore,
            urgency_level: UrgencyLevel::Low,
            relationship_approach: RelationshipApproach::ProfessionalFriendly,
        }
    }
}
