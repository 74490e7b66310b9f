use std::collections::BTreeSet;

/// A single extracted value with the confidence the extractor assigned it.
/// Used to gate merges into the contact record: a lower-confidence value
/// never overwrites an already-known one.
#[derive(Debug, Clone)]
pub struct Field<T> {
    pub value: T,
    pub confidence: f32,
}

/// Everything the LLM or the regex fallback might pull out of one message.
/// Every field is independently optional; an empty struct means nothing
/// new was found.
#[derive(Debug, Clone, Default)]
pub struct ExtractedInfo {
    pub name: Option<Field<String>>,
    pub email: Option<Field<String>>,
    pub company: Option<Field<String>>,
    pub position: Option<Field<String>>,
    pub industry_focus: Option<Field<String>>,
    pub company_size: Option<Field<String>>,
    pub technical_level: Option<Field<String>>,
    pub budget_range: Option<Field<String>>,
    pub timeline: Option<Field<String>>,
    pub decision_maker: Option<Field<bool>>,
    pub pain_points_mentioned: BTreeSet<String>,
    pub goals_expressed: BTreeSet<String>,
    pub competitors_mentioned: BTreeSet<String>,
    pub topics_discussed: BTreeSet<String>,
}

/// Confidence assigned to values pulled from free-text regex matching, as
/// opposed to a model's structured extraction (which reports its own
/// per-field confidence, defaulting to [`LLM_DEFAULT_CONFIDENCE`] when the
/// model omits one).
pub const REGEX_FALLBACK_CONFIDENCE: f32 = 0.6;
pub const LLM_DEFAULT_CONFIDENCE: f32 = 0.9;
