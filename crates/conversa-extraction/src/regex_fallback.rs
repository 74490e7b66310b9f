//! Deterministic extraction used when the model is unavailable, returns an
//! empty result, or a field it didn't cover. Entirely regex/keyword based so
//! it never needs a network round trip.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::types::{ExtractedInfo, Field, REGEX_FALLBACK_CONFIDENCE};

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("static pattern is valid regex")
}

static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        ci(r"my name is ([A-Za-z]+(?:\s+[A-Za-z]+){0,2})(?:\s+and|\s+from|\s*,|\s*\.|\s*$)"),
        ci(r"i'?m\s+(?:dr\.?\s+|mr\.?\s+|ms\.?\s+)?([A-Za-z]+(?:\s+[A-Za-z]+){0,2})(?:\s+and|\s+from|\s*,|\s*\.|\s*$)"),
        ci(r"i am\s+(?:dr\.?\s+|mr\.?\s+|ms\.?\s+)?([A-Za-z]+(?:\s+[A-Za-z]+){0,2})(?:\s+and|\s+from|\s*,|\s*\.|\s*$)"),
        ci(r"call me ([A-Za-z]+(?:\s+[A-Za-z]+)?)(?:\s+and|\s+from|\s*,|\s*\.|\s*$)"),
        ci(r"this is\s+(?:dr\.?\s+|mr\.?\s+|ms\.?\s+)?([A-Za-z]+(?:\s+[A-Za-z]+){0,2})(?:\s+and|\s+from|\s*,|\s*\.|\s*$)"),
    ]
});

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());

static TITLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        ci(r"i'?m (?:the |a )?(?:chief |head |senior |lead )?(ceo|cto|cfo|cmo|vp|director|manager|engineer|developer|analyst|coordinator|specialist)(?:\s+of\s+[\w\s]+)?"),
        ci(r"(?:as|i'?m) (?:the |a )?(?:chief |head |senior |lead )?([\w\s]{2,25})(?:\s+at|\s+for|\s*,|\s*$)"),
        ci(r"my (?:role|position|title) is (?:the |a )?([\w\s]{2,25})(?:\s+at|\s+for|\s*,|\s*$)"),
    ]
});

static COMPANY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?:i work at|we'?re from|working at|employed at)\s+([A-Z][A-Za-z0-9\s&.-]{2,30}(?:\s+(?:Corp|Inc|LLC|Ltd|Company|Co))?)(?:\s|\.|\s+and|\s+you|\s+where|$)").unwrap(),
        Regex::new(r"our company (?:is |called )?([A-Z][A-Za-z0-9\s&.-]{2,30}(?:\s+(?:Corp|Inc|LLC|Ltd|Company|Co))?)(?:\s|\.|\s+and|\s+you|\s+where|$)").unwrap(),
        Regex::new(r"(?:company called|working for)\s+([A-Z][A-Za-z0-9\s&.-]{2,30}(?:\s+(?:Corp|Inc|LLC|Ltd|Company|Co))?)(?:\s|\.|\s+and|\s+you|\s+where|$)").unwrap(),
    ]
});

const INVALID_NAMES: &[&str] = &[
    "hello", "hi", "hey", "bot", "here", "looking", "interested", "thanks", "please", "help",
    "support", "team", "company", "business", "service", "solution", "product", "information",
];

const INVALID_TITLES: &[&str] = &["here", "there", "work", "job", "position", "looking", "interested"];

const INVALID_COMPANIES: &[&str] = &[
    "work", "company", "business", "here", "there", "place", "office", "team", "group",
    "organization", "firm", "agency",
];

const PAIN_INDICATORS: &[&str] = &[
    "problem",
    "issue",
    "challenge",
    "difficulty",
    "struggle",
    "frustrated",
    "slow",
    "inefficient",
    "manual",
    "time-consuming",
];

const GOAL_INDICATORS: &[&str] = &[
    "want to",
    "need to",
    "goal",
    "objective",
    "target",
    "improve",
    "increase",
    "reduce",
    "automate",
    "streamline",
];

const COMPETITOR_SIGNALS: &[&str] = &["compare", "vs", "versus", "alternatives", "competitors"];

const DECISION_MAKER_SIGNALS: &[&str] = &[
    "i decide",
    "my decision",
    "i choose",
    "ceo",
    "founder",
    "owner",
    "manager",
    "director",
    "head of",
];

fn is_valid_name(name: &str) -> bool {
    if name.len() < 2 || name.len() > 50 {
        return false;
    }
    let lower = name.to_lowercase();
    !INVALID_NAMES.contains(&lower.as_str()) && name.chars().all(|c| c.is_alphabetic() || c == ' ')
}

fn is_valid_job_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    !INVALID_TITLES.contains(&lower.as_str())
}

fn is_valid_company_name(company: &str) -> bool {
    if company.len() < 2 || company.len() > 100 {
        return false;
    }
    !INVALID_COMPANIES.contains(&company.to_lowercase().as_str())
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_name(message: &str) -> Option<String> {
    for pattern in NAME_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(message) {
            let candidate = title_case(captures.get(1)?.as_str().trim());
            if is_valid_name(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

fn extract_email(message: &str) -> Option<String> {
    EMAIL_PATTERN.find(message).map(|m| m.as_str().to_lowercase())
}

fn extract_title(message_lower: &str) -> Option<String> {
    for pattern in TITLE_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(message_lower) {
            let candidate = title_case(captures.get(1)?.as_str().trim());
            if is_valid_job_title(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

fn extract_company(message: &str) -> Option<String> {
    for pattern in COMPANY_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(message) {
            let candidate = captures.get(1)?.as_str().trim().to_string();
            if is_valid_company_name(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

fn extract_budget_range(message: &str, message_lower: &str) -> Option<&'static str> {
    if !(message_lower.contains("budget") || message.contains('$')) {
        return None;
    }
    if message_lower.contains("small") || message_lower.contains("tight") {
        Some("small")
    } else if message_lower.contains("large") || message_lower.contains("significant") {
        Some("large")
    } else {
        Some("medium")
    }
}

fn extract_timeline(message_lower: &str) -> Option<&'static str> {
    if message_lower.contains("urgent") || message_lower.contains("asap") {
        Some("urgent")
    } else if message_lower.contains("soon") || message_lower.contains("quickly") {
        Some("short")
    } else if message_lower.contains("months") || message_lower.contains("planning") {
        Some("medium")
    } else {
        None
    }
}

const INDUSTRY_KEYWORDS: &[(&str, &[&str])] = &[
    ("healthcare", &["hospital", "medical", "healthcare", "clinic", "patient", "doctor", "nurse", "health"]),
    ("fintech", &["bank", "finance", "financial", "payment", "trading", "investment", "insurance", "loans"]),
    ("retail", &["store", "shop", "ecommerce", "e-commerce", "retail", "customer", "sales", "merchandise"]),
    ("manufacturing", &["factory", "production", "manufacturing", "supply chain", "logistics", "warehouse"]),
    ("education", &["school", "university", "education", "student", "teacher", "academic", "learning"]),
    ("saas", &["software", "saas", "platform", "app", "tech", "startup", "development"]),
    ("consulting", &["consulting", "consultant", "advisory", "services", "client"]),
    ("real_estate", &["real estate", "property", "mortgage", "housing", "construction"]),
];

fn extract_industry(message_lower: &str) -> Option<&'static str> {
    INDUSTRY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| message_lower.contains(k)))
        .map(|(industry, _)| *industry)
}

static SIZE_PATTERNS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    vec![
        ("startup", vec![ci(r"startup"), ci(r"founding"), ci(r"just started"), ci(r"small team"), ci(r"team of \d{1,2}")]),
        ("small", vec![ci(r"small business"), ci(r"team of \d{1,3}"), ci(r"\d{1,2} employees"), ci(r"family business")]),
        ("medium", vec![ci(r"growing company"), ci(r"100 employees"), ci(r"mid-size"), ci(r"medium business"), ci(r"\d{2,3} people")]),
        ("enterprise", vec![ci(r"large company"), ci(r"corporation"), ci(r"1000 employees"), ci(r"enterprise"), ci(r"multinational")]),
    ]
});

fn extract_company_size(message_lower: &str) -> Option<&'static str> {
    SIZE_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(message_lower)))
        .map(|(size, _)| *size)
}

/// Runs every pattern over one inbound message. Each hit is tagged with
/// [`REGEX_FALLBACK_CONFIDENCE`]; the caller merges on top of any
/// higher-confidence value already on file.
pub fn extract(message: &str) -> ExtractedInfo {
    let message_lower = message.to_lowercase();
    let mut info = ExtractedInfo::default();

    if let Some(name) = extract_name(message) {
        info.name = Some(Field { value: name, confidence: REGEX_FALLBACK_CONFIDENCE });
    }
    if let Some(email) = extract_email(message) {
        info.email = Some(Field { value: email, confidence: REGEX_FALLBACK_CONFIDENCE });
    }
    if let Some(title) = extract_title(&message_lower) {
        info.position = Some(Field { value: title, confidence: REGEX_FALLBACK_CONFIDENCE });
    }
    if let Some(company) = extract_company(message) {
        info.company = Some(Field { value: company, confidence: REGEX_FALLBACK_CONFIDENCE });
    }
    if let Some(budget) = extract_budget_range(message, &message_lower) {
        info.budget_range =
            Some(Field { value: budget.to_string(), confidence: REGEX_FALLBACK_CONFIDENCE });
    }
    if let Some(timeline) = extract_timeline(&message_lower) {
        info.timeline =
            Some(Field { value: timeline.to_string(), confidence: REGEX_FALLBACK_CONFIDENCE });
    }
    if let Some(industry) = extract_industry(&message_lower) {
        info.industry_focus =
            Some(Field { value: industry.to_string(), confidence: REGEX_FALLBACK_CONFIDENCE });
    }
    if let Some(size) = extract_company_size(&message_lower) {
        info.company_size =
            Some(Field { value: size.to_string(), confidence: REGEX_FALLBACK_CONFIDENCE });
    }
    if DECISION_MAKER_SIGNALS.iter().any(|s| message_lower.contains(s)) {
        info.decision_maker = Some(Field { value: true, confidence: REGEX_FALLBACK_CONFIDENCE });
    }

    for indicator in PAIN_INDICATORS {
        if message_lower.contains(indicator) {
            info.pain_points_mentioned.insert(indicator.to_string());
        }
    }
    for indicator in GOAL_INDICATORS {
        if message_lower.contains(indicator) {
            info.goals_expressed.insert(indicator.to_string());
        }
    }
    for signal in COMPETITOR_SIGNALS {
        if message_lower.contains(signal) {
            info.competitors_mentioned.insert(signal.to_string());
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_name_email_and_title() {
        let info = extract("Hi, my name is Sarah Connor, I'm the director of engineering, reach me at sarah.connor@example.com");
        assert_eq!(info.name.unwrap().value, "Sarah Connor");
        assert_eq!(info.email.unwrap().value, "sarah.connor@example.com");
    }

    #[test]
    fn rejects_greeting_as_name() {
        let info = extract("hi there, just looking around");
        assert!(info.name.is_none());
    }

    #[test]
    fn detects_pain_points_and_goals() {
        let info = extract("our process is manual and time-consuming, we want to automate it");
        assert!(info.pain_points_mentioned.contains("manual"));
        assert!(info.pain_points_mentioned.contains("time-consuming"));
        assert!(info.goals_expressed.contains("want to"));
        assert!(info.goals_expressed.contains("automate"));
    }

    #[test]
    fn detects_budget_and_timeline() {
        let info = extract("we have a small budget and need this done asap");
        assert_eq!(info.budget_range.unwrap().value, "small");
        assert_eq!(info.timeline.unwrap().value, "urgent");
    }

    #[test]
    fn detects_decision_maker_signal() {
        let info = extract("I'm the founder and I decide on purchases like this");
        assert!(info.decision_maker.unwrap().value);
    }

    #[test]
    fn detects_competitor_comparison() {
        let info = extract("how do you compare to your competitors and alternatives?");
        assert!(info.competitors_mentioned.contains("compare"));
        assert!(info.competitors_mentioned.contains("competitors"));
        assert!(info.competitors_mentioned.contains("alternatives"));
    }

    #[test]
    fn extracts_company_name() {
        let info = extract("I work at Acme Corp and we need help scaling");
        assert_eq!(info.company.unwrap().value, "Acme Corp");
    }
}
