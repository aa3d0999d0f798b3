//! Email address parsing, validation, and recipient-list normalization.
//!
//! Recipient fields in the ticketing database are free-form delimited
//! strings (`;` or `,` separated) accumulated over years of traffic, so
//! every candidate is validated and invalid tokens are silently dropped —
//! a bad address must never block export of the whole record.

/// Fallback sender used when the record's from-address fails validation.
pub const FALLBACK_SENDER: &str = "noreply@example.com";

/// A parsed email address.
///
/// # Examples
/// - `"Support Desk <desk@acme.com>"` → `display_name = "Support Desk"`, `address = "desk@acme.com"`
/// - `"ops@acme.com"` → `display_name = ""`, `address = "ops@acme.com"`
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    /// Parse a single email address from a raw field value.
    ///
    /// Supported formats:
    /// - `"user@domain.com"`
    /// - `"<user@domain.com>"`
    /// - `"Display Name <user@domain.com>"`
    /// - `"\"Display, Name\" <user@domain.com>"`
    ///
    /// Returns `None` when the bare address part fails validation.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        // Try "Display Name <address>" or "<address>"
        if let Some(angle_start) = trimmed.rfind('<') {
            if let Some(angle_end) = trimmed.rfind('>') {
                if angle_end > angle_start {
                    let addr = trimmed[angle_start + 1..angle_end].trim();
                    if !is_valid_address(addr) {
                        return None;
                    }
                    let display_name = strip_quotes(trimmed[..angle_start].trim());
                    return Some(Self {
                        display_name,
                        address: addr.to_string(),
                    });
                }
            }
        }

        // Bare address: "user@domain.com"
        if is_valid_address(trimmed) {
            return Some(Self {
                display_name: String::new(),
                address: trimmed.to_string(),
            });
        }

        None
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Syntactic validation of a bare `local@domain` address.
///
/// Deliberately permissive (no full RFC 5321 grammar): exactly one `@`,
/// non-empty local and domain parts, no whitespace or control characters,
/// and a domain that neither starts nor ends with a dot.
pub fn is_valid_address(addr: &str) -> bool {
    if addr.is_empty() || addr.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let mut parts = addr.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = match parts.next() {
        Some(d) => d,
        None => return false,
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    !domain.starts_with('.') && !domain.ends_with('.')
}

/// Split a delimited recipient field (`;` or `,` separated) into
/// validated addresses. Empty and invalid entries are dropped.
pub fn split_recipients(raw: &str) -> Vec<EmailAddress> {
    raw.split([';', ','])
        .filter_map(EmailAddress::parse)
        .collect()
}

/// Merge the primary recipient and the delimited to/cc fields into the
/// ordered `(to, cc)` lists.
///
/// A non-empty primary address is prepended to the to-list ahead of any
/// addresses parsed from the to-field, matching how the original rows
/// were written.
pub fn normalize_recipients(
    primary_to: &str,
    to_raw: &str,
    cc_raw: &str,
) -> (Vec<EmailAddress>, Vec<EmailAddress>) {
    let mut to = Vec::new();
    if let Some(primary) = EmailAddress::parse(primary_to) {
        to.push(primary);
    } else if !primary_to.trim().is_empty() {
        tracing::debug!(raw = primary_to, "Dropping invalid primary recipient");
    }
    to.extend(split_recipients(to_raw));

    let cc = split_recipients(cc_raw);
    (to, cc)
}

/// Validate the sender field, substituting [`FALLBACK_SENDER`] when it
/// does not parse as an address.
pub fn normalize_sender(raw: &str) -> EmailAddress {
    match EmailAddress::parse(raw) {
        Some(addr) => addr,
        None => {
            tracing::warn!(raw, "Invalid sender address, using fallback");
            EmailAddress {
                display_name: String::new(),
                address: FALLBACK_SENDER.to_string(),
            }
        }
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}
