//! Folds an [`ExtractedInfo`] onto a [`Contact`], gated by confidence: a
//! field already set on the contact is only overwritten by a strictly
//! higher-confidence new value. Set-valued fields always union.

use conversa_core::domain::Contact;

use crate::types::{ExtractedInfo, Field};

/// Tracked per-field confidence a scalar value was last written with. The
/// contact itself has no confidence column, so this is session-local: a
/// freshly loaded contact is treated as already-confirmed (confidence 1.0)
/// and only a same-or-higher-confidence extraction can replace it.
const EXISTING_VALUE_CONFIDENCE: f32 = 1.0;

fn apply_scalar<T: Clone>(existing: &mut Option<T>, incoming: &Option<Field<T>>) {
    let Some(incoming) = incoming else { return };
    let baseline = if existing.is_some() { EXISTING_VALUE_CONFIDENCE } else { 0.0 };
    if incoming.confidence >= baseline {
        *existing = Some(incoming.value.clone());
    }
}

/// Applies `info` onto `contact` in place, honoring confidence gating on
/// scalar fields and unioning every set-valued field unconditionally.
pub fn merge(contact: &mut Contact, info: &ExtractedInfo) {
    apply_scalar(&mut contact.name, &info.name);
    apply_scalar(&mut contact.email, &info.email);
    apply_scalar(&mut contact.company, &info.company);
    apply_scalar(&mut contact.position, &info.position);
    apply_scalar(&mut contact.industry_focus, &info.industry_focus);
    apply_scalar(&mut contact.company_size, &info.company_size);
    apply_scalar(&mut contact.budget_range, &info.budget_range);
    apply_scalar(&mut contact.timeline, &info.timeline);

    if let Some(decision_maker) = &info.decision_maker {
        if decision_maker.value && decision_maker.confidence >= EXISTING_VALUE_CONFIDENCE {
            contact.decision_maker = true;
        } else if !contact.decision_maker {
            contact.decision_maker = decision_maker.value;
        }
    }

    contact.pain_points_mentioned.extend(info.pain_points_mentioned.iter().cloned());
    contact.goals_expressed.extend(info.goals_expressed.iter().cloned());
    contact.competitors_mentioned.extend(info.competitors_mentioned.iter().cloned());
    contact.topics_discussed.extend(info.topics_discussed.iter().cloned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::ids::TenantId;
    use crate::types::REGEX_FALLBACK_CONFIDENCE;

    fn contact() -> Contact {
        Contact::new(TenantId::new(), "15551234567".to_string())
    }

    #[test]
    fn fills_empty_field() {
        let mut c = contact();
        let info = ExtractedInfo {
            name: Some(Field { value: "Jane".to_string(), confidence: REGEX_FALLBACK_CONFIDENCE }),
            ..Default::default()
        };
        merge(&mut c, &info);
        assert_eq!(c.name.as_deref(), Some("Jane"));
    }

    #[test]
    fn low_confidence_never_overwrites_existing_value() {
        let mut c = contact();
        c.name = Some("Jane Doe".to_string());
        let info = ExtractedInfo {
            name: Some(Field { value: "Someone Else".to_string(), confidence: REGEX_FALLBACK_CONFIDENCE }),
            ..Default::default()
        };
        merge(&mut c, &info);
        assert_eq!(c.name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn equal_confidence_to_existing_overwrites() {
        let mut c = contact();
        c.email = Some("old@example.com".to_string());
        let info = ExtractedInfo {
            email: Some(Field { value: "new@example.com".to_string(), confidence: 1.0 }),
            ..Default::default()
        };
        merge(&mut c, &info);
        assert_eq!(c.email.as_deref(), Some("new@example.com"));
    }

    #[test]
    fn set_fields_always_union() {
        let mut c = contact();
        c.pain_points_mentioned.insert("slow".to_string());
        let info = ExtractedInfo {
            pain_points_mentioned: std::collections::BTreeSet::from(["manual".to_string()]),
            ..Default::default()
        };
        merge(&mut c, &info);
        assert!(c.pain_points_mentioned.contains("slow"));
        assert!(c.pain_points_mentioned.contains("manual"));
    }
}
