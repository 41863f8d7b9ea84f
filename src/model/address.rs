//! Best-effort sender address extraction.
//!
//! Storage filenames embed the sender, so all that is needed here is the
//! first thing shaped like an email address anywhere in the From header —
//! not a full RFC 5322 address-list parser.

use std::sync::LazyLock;

use regex::Regex;

/// Matches `local@domain.tld` with at least one dot in the domain.
static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._-]+@[A-Za-z0-9._-]+\.[A-Za-z0-9_-]+").expect("valid pattern")
});

/// Find the first email-address-shaped substring in a raw From header.
///
/// Works on any of the common shapes:
/// - `user@example.com`
/// - `<user@example.com>`
/// - `Display Name <user@example.com>`
/// - `"Last, First" <user@example.com>`
pub fn first_address(raw: &str) -> Option<&str> {
    ADDRESS.find(raw).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_address() {
        assert_eq!(first_address("user@example.com"), Some("user@example.com"));
    }

    #[test]
    fn test_display_name_and_angle_brackets() {
        assert_eq!(
            first_address("\"Jane Doe\" <jane@example.com>"),
            Some("jane@example.com")
        );
    }

    #[test]
    fn test_first_of_several() {
        assert_eq!(
            first_address("a@b.example, c@d.example"),
            Some("a@b.example")
        );
    }

    #[test]
    fn test_domain_needs_a_dot() {
        assert_eq!(first_address("user@localhost"), None);
    }

    #[test]
    fn test_no_address() {
        assert_eq!(first_address("Undisclosed recipients"), None);
    }
}
