//! Certificate-transparency feed contract: mapping the collaborator's
//! subdomain list down to validated, deduplicated labels. The HTTP fetch
//! itself lives outside this crate; this module only consumes its output.
use std::collections::HashSet;

use crate::hostname::normalize_label;

/// Map an ordered list of lowercased subdomain strings under `domain` to
/// normalized labels: strip the leading `*.` wildcard marker, require the
/// `.domain` suffix, validate, and dedup in first-seen order.
pub fn subdomains_to_labels(subdomains: &[String], domain: &str) -> Vec<String> {
    let suffix = format!(".{domain}");
    let mut seen = HashSet::new();
    let mut labels = Vec::new();

    for raw in subdomains {
        let mut item = raw.trim().trim_matches('.').to_ascii_lowercase();
        if let Some(stripped) = item.strip_prefix("*.") {
            item = stripped.to_string();
        }
        if item == domain || !item.ends_with(&suffix) {
            continue;
        }
        let label_part = &item[..item.len() - suffix.len()];
        if label_part.is_empty() {
            continue;
        }
        let Ok(normalized) = normalize_label(label_part) else {
            continue;
        };
        if seen.insert(normalized.clone()) {
            labels.push(normalized);
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_wildcard_marker_and_suffix() {
        let subs = vec!["*.api.example.com".to_string(), "www.example.com".to_string()];
        let labels = subdomains_to_labels(&subs, "example.com");
        assert_eq!(labels, vec!["api", "www"]);
    }

    #[test]
    fn dedups_and_skips_apex_and_unrelated() {
        let subs = vec![
            "www.example.com".to_string(),
            "WWW.example.com".to_string(),
            "example.com".to_string(),
            "other.org".to_string(),
        ];
        let labels = subdomains_to_labels(&subs, "example.com");
        assert_eq!(labels, vec!["www"]);
    }

    #[test]
    fn skips_labels_that_fail_validation() {
        let subs = vec!["bad_label.example.com".to_string()];
        assert!(subdomains_to_labels(&subs, "example.com").is_empty());
    }

    #[test]
    fn preserves_nested_labels() {
        let subs = vec!["foo.dev.example.com".to_string()];
        let labels = subdomains_to_labels(&subs, "example.com");
        assert_eq!(labels, vec!["foo.dev"]);
    }
}
