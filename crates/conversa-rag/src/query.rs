//! Query enrichment: appends context hints so the embedding captures the
//! contact's situation, not just the literal words of the message.

use conversa_core::domain::Contact;

pub fn enriched_query(message: &str, contact: &Contact) -> String {
    let mut parts = vec![message.to_string()];
    if let Some(industry) = &contact.industry_focus {
        parts.push(format!("industry: {industry}"));
    }
    if let Some(size) = &contact.company_size {
        parts.push(format!("company size: {size}"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::ids::TenantId;

    #[test]
    fn appends_industry_and_size_hints() {
        let mut contact = Contact::new(TenantId::new(), "15551234567".to_string());
        contact.industry_focus = Some("healthcare".to_string());
        contact.company_size = Some("enterprise".to_string());
        let q = enriched_query("what's your pricing?", &contact);
        assert!(q.contains("industry: healthcare"));
        assert!(q.contains("company size: enterprise"));
    }

    #[test]
    fn leaves_query_unchanged_with_no_hints() {
        let contact = Contact::new(TenantId::new(), "15551234567".to_string());
        let q = enriched_query("hello", &contact);
        assert_eq!(q, "hello");
    }
}
