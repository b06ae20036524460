use crate::domain::email::EmailAddress;
use regex::Regex;
use std::sync::LazyLock;

// local-part "@" domain with at least one dot; the last label is word chars only.
static EMAIL_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("email syntax pattern compiles")
});

pub fn is_valid_email_syntax(email: &str) -> bool {
    EMAIL_SYNTAX.is_match(email)
}

/// True when the address belongs to exactly `domain`. Subdomains do not match.
pub fn belongs_to_domain(email: &EmailAddress, domain: &str) -> bool {
    email.domain() == domain
}
