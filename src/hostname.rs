//! Hostname/label normalization and validation per RFC 1035 LDH rules.
use crate::error::{ScoutError, ScoutResult};

const MAX_HOSTNAME_LEN: usize = 253;

fn is_valid_label(part: &str) -> bool {
    let bytes = part.as_bytes();
    if bytes.is_empty() || bytes.len() > 63 {
        return false;
    }
    let is_ldh = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-';
    let is_alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    if !is_alnum(bytes[0]) {
        return false;
    }
    if bytes.len() == 1 {
        return true;
    }
    if !is_alnum(bytes[bytes.len() - 1]) {
        return false;
    }
    bytes[1..bytes.len() - 1].iter().all(|&b| is_ldh(b))
}

fn validate_hostname(value: &str, allow_single_label: bool, value_name: &str) -> ScoutResult<()> {
    if value.len() > MAX_HOSTNAME_LEN {
        return Err(ScoutError::validation(format!(
            "{value_name} is too long (max {MAX_HOSTNAME_LEN} characters)"
        )));
    }

    let parts: Vec<&str> = value.split('.').collect();
    if !allow_single_label && parts.len() < 2 {
        return Err(ScoutError::validation(format!(
            "{value_name} must contain at least one dot"
        )));
    }
    for part in &parts {
        if !is_valid_label(part) {
            return Err(ScoutError::validation(format!(
                "invalid {value_name}: {value:?}"
            )));
        }
    }
    Ok(())
}

/// Lowercase, trim leading/trailing dots, and validate an apex domain
/// (must contain at least one dot).
pub fn normalize_domain(raw: &str) -> ScoutResult<String> {
    let domain = raw.trim().trim_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return Err(ScoutError::validation("domain must be non-empty"));
    }
    validate_hostname(&domain, false, "domain")?;
    Ok(domain)
}

/// Lowercase, trim leading/trailing dots, and validate a label (which may
/// itself be dotted, e.g. "foo.dev").
pub fn normalize_label(raw: &str) -> ScoutResult<String> {
    let label = raw.trim().trim_matches('.').to_ascii_lowercase();
    if label.is_empty() {
        return Err(ScoutError::validation("label must be non-empty"));
    }
    validate_hostname(&label, true, "label")?;
    Ok(label)
}

/// Join a normalized label and domain into an FQDN.
pub fn fqdn(label: &str, domain: &str) -> String {
    format!("{label}.{domain}")
}
