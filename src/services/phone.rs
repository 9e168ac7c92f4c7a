use once_cell::sync::Lazy;
use regex::Regex;

static NON_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").expect("static regex"));

pub const GROUP_JID_SUFFIX: &str = "@g.us";

/// Derive a bare phone number from a WhatsApp JID.
///
/// `5511999998888@s.whatsapp.net`, `5511999998888:12@s.whatsapp.net`,
/// `5511999998888@c.us` and `+55 11 99999-8888` all yield `5511999998888`.
pub fn normalize_phone(remote_jid: &str) -> Option<String> {
    let local = remote_jid.trim().split('@').next().unwrap_or_default();
    let local = local.split(':').next().unwrap_or_default();
    let digits = NON_DIGITS.replace_all(local, "");

    if digits.is_empty() {
        None
    } else {
        Some(digits.into_owned())
    }
}

pub fn is_group_jid(remote_jid: &str) -> bool {
    remote_jid.trim().ends_with(GROUP_JID_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_whatsapp_suffixes() {
        assert_eq!(
            normalize_phone("5511999998888@s.whatsapp.net").as_deref(),
            Some("5511999998888")
        );
        assert_eq!(normalize_phone("5511999998888@c.us").as_deref(), Some("5511999998888"));
        assert_eq!(
            normalize_phone("5511999998888:23@s.whatsapp.net").as_deref(),
            Some("5511999998888")
        );
        assert_eq!(
            normalize_phone("120363025246125486@g.us").as_deref(),
            Some("120363025246125486")
        );
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(normalize_phone("+55 (11) 99999-8888").as_deref(), Some("5511999998888"));
        assert_eq!(normalize_phone("  5511999998888  ").as_deref(), Some("5511999998888"));
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("@s.whatsapp.net"), None);
        assert_eq!(normalize_phone("status@broadcast"), None);
    }

    #[test]
    fn test_group_detection() {
        assert!(is_group_jid("120363025246125486@g.us"));
        assert!(!is_group_jid("5511999998888@s.whatsapp.net"));
    }
}
