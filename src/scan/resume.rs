//! Resume loader: recover the set of already-scanned labels from a prior
//! NDJSON output file.
use std::collections::HashSet;
use std::io::BufRead;

use serde_json::Value;

use crate::error::ScoutResult;
use crate::hostname::normalize_label;

/// Read a prior NDJSON output, collecting normalized labels for every record
/// whose `subdomain` ends in `.{domain}`. Malformed lines, non-object lines,
/// and non-matching subdomains are silently ignored.
pub fn load_resume_set<R: BufRead>(reader: R, domain: &str) -> ScoutResult<HashSet<String>> {
    let suffix = format!(".{domain}");
    let mut seen = HashSet::new();

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(trimmed) else {
            continue;
        };
        let Some(subdomain) = obj.get("subdomain").and_then(Value::as_str) else {
            continue;
        };
        let lowered = subdomain.trim().to_ascii_lowercase();
        if !lowered.ends_with(&suffix) {
            continue;
        }
        let label_part = &lowered[..lowered.len() - suffix.len()];
        if let Ok(normalized) = normalize_label(label_part) {
            seen.insert(normalized);
        }
    }

    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn collects_matching_subdomains() {
        let ndjson = "{\"subdomain\":\"www.example.com\",\"status\":\"resolved\"}\n\
                      {\"subdomain\":\"api.other.com\",\"status\":\"resolved\"}\n";
        let seen = load_resume_set(Cursor::new(ndjson), "example.com").unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen.contains("www"));
    }

    #[test]
    fn ignores_malformed_and_nonobject_lines() {
        let ndjson = "not json\n[1,2,3]\n{\"subdomain\":\"api.example.com\"}\n";
        let seen = load_resume_set(Cursor::new(ndjson), "example.com").unwrap();
        assert_eq!(seen, HashSet::from(["api".to_string()]));
    }
}
