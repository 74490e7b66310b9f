use conversa_core::domain::Contact;
use conversa_personalization::types::CtaType;
use conversa_personalization::Strategy;

/// Prefixes the customer's name on their very first reply, if the model
/// didn't already address them by it.
fn prefix_name(reply: String, contact: &Contact, is_first_contact: bool) -> String {
    let Some(name) = &contact.name else { return reply };
    if !is_first_contact || reply.to_lowercase().contains(&name.to_lowercase()) {
        return reply;
    }
    let first_name = name.split_whitespace().next().unwrap_or(name);
    format!("Hi {first_name}! {reply}")
}

/// Appends the scheduling link when the strategy calls for a booking CTA,
/// the cooldown hasn't suppressed it, and the model's own reply doesn't
/// already include one.
fn append_cta_link(reply: String, strategy: &Strategy, discovery_call_allowed: bool, discovery_call_url: &str) -> String {
    if !discovery_call_allowed || strategy.call_to_action_type != CtaType::ScheduleCall || reply.contains(discovery_call_url) {
        return reply;
    }
    format!("{reply}\n\nYou can book a time directly here: {discovery_call_url}")
}

pub fn apply(
    reply: String,
    contact: &Contact,
    strategy: &Strategy,
    is_first_contact: bool,
    discovery_call_allowed: bool,
    discovery_call_url: &str,
) -> String {
    let reply = prefix_name(reply, contact, is_first_contact);
    append_cta_link(reply, strategy, discovery_call_allowed, discovery_call_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::ids::TenantId;
    use conversa_personalization::plan;

    fn contact_named(name: &str) -> Contact {
        let mut c = Contact::new(TenantId::new(), "15551234567".to_string());
        c.name = Some(name.to_string());
        c
    }

    #[test]
    fn prefixes_name_on_first_contact_when_absent() {
        let c = contact_named("Jordan Lee");
        let out = prefix_name("Thanks for reaching out!".to_string(), &c, true);
        assert_eq!(out, "Hi Jordan! Thanks for reaching out!");
    }

    #[test]
    fn skips_prefix_when_name_already_present() {
        let c = contact_named("Jordan Lee");
        let out = prefix_name("Hey Jordan, happy to help.".to_string(), &c, true);
        assert_eq!(out, "Hey Jordan, happy to help.");
    }

    #[test]
    fn skips_prefix_after_first_contact() {
        let c = contact_named("Jordan Lee");
        let out = prefix_name("Thanks!".to_string(), &c, false);
        assert_eq!(out, "Thanks!");
    }

    const TEST_LINK: &str = "https://example.test/discovery-call";

    #[test]
    fn appends_cta_link_when_strategy_calls_for_it() {
        let mut c = Contact::new(TenantId::new(), "15551234567".to_string());
        c.name = None;
        let mut strategy = plan(&c);
        strategy.call_to_action_type = CtaType::ScheduleCall;
        let out = append_cta_link("Let's find a time to chat.".to_string(), &strategy, true, TEST_LINK);
        assert!(out.contains(TEST_LINK));
    }

    #[test]
    fn does_not_duplicate_link_already_present() {
        let mut c = Contact::new(TenantId::new(), "15551234567".to_string());
        c.name = None;
        let mut strategy = plan(&c);
        strategy.call_to_action_type = CtaType::ScheduleCall;
        let reply = format!("Book here: {TEST_LINK}");
        let out = append_cta_link(reply.clone(), &strategy, true, TEST_LINK);
        assert_eq!(out, reply);
    }

    #[test]
    fn suppresses_cta_link_when_cooldown_active() {
        let mut c = Contact::new(TenantId::new(), "15551234567".to_string());
        c.name = None;
        let mut strategy = plan(&c);
        strategy.call_to_action_type = CtaType::ScheduleCall;
        let out = append_cta_link("Let's find a time to chat.".to_string(), &strategy, false, TEST_LINK);
        assert!(!out.contains(TEST_LINK));
    }
}
