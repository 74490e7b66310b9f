//! Canonical phone-number form, chosen once at the tenant boundary.
//!
//! Settles on **digits-only, country-code prefixed, no leading `+`** — e.g.
//! `15551234567` — since that's the form the channel gateway's wire format
//! uses for `to`/`sender_id`, and every other representation (`+E164`,
//! `jid@suffix`) can be derived from it trivially, while the reverse
//! (recovering a stripped country code from a bare local number) is lossy.
//! See DESIGN.md for the full rationale.

/// Normalize a raw phone number (however it arrived: `+1 (555) 123-4567`,
/// `15551234567@s.whatsapp.net`, `555-123-4567`) into the canonical form.
///
/// Strips everything but ASCII digits, including any channel-specific JID
/// suffix (`@...`) and leading `+`. Does not attempt to infer or attach a
/// missing country code — callers that need that must resolve it from
/// tenant configuration before calling this function.
pub fn canonicalize(raw: &str) -> String {
    let before_suffix = raw.split('@').next().unwrap_or(raw);
    before_suffix.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// A canonicalized number is valid if it has a plausible length for an
/// E.164-style number (country code + subscriber number).
pub fn is_valid(canonical: &str) -> bool {
    let len = canonical.len();
    (8..=15).contains(&len) && canonical.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_formatting() {
        assert_eq!(canonicalize("+1 (555) 123-4567"), "15551234567");
    }

    #[test]
    fn strips_jid_suffix() {
        assert_eq!(canonicalize("15551234567@s.whatsapp.net"), "15551234567");
    }

    #[test]
    fn already_canonical_is_unchanged() {
        assert_eq!(canonicalize("15551234567"), "15551234567");
    }

    #[test]
    fn validity_bounds() {
        assert!(is_valid("15551234567"));
        assert!(!is_valid("123"));
        assert!(!is_valid("1234567890123456"));
        assert!(!is_valid("555abc1234"));
    }
}
