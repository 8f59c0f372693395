//! Dangling-CNAME / subdomain-takeover detection: fetch a candidate host
//! over HTTPS then HTTP, and score the response body against a fingerprint
//! catalog.
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ScoutError, ScoutResult};

const USER_AGENT: &str = concat!("subdomain-scout/", env!("CARGO_PKG_VERSION"));
const BODY_SAMPLE_BYTES: usize = 16 * 1024;
const MIN_SCORE: i32 = 50;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Fingerprint {
    pub service: String,
    pub body_substrings: Vec<String>,
    #[serde(default)]
    pub status_codes: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FingerprintCatalog {
    pub version: String,
    pub fingerprints: Vec<Fingerprint>,
}

impl FingerprintCatalog {
    pub fn default_catalog() -> Self {
        FingerprintCatalog {
            version: "2026-02-09".to_string(),
            fingerprints: vec![
                Fingerprint {
                    service: "GitHub Pages".to_string(),
                    body_substrings: vec!["there isn't a github pages site here.".to_string()],
                    status_codes: vec![404],
                },
                Fingerprint {
                    service: "Heroku".to_string(),
                    body_substrings: vec!["no such app".to_string()],
                    status_codes: vec![404],
                },
                Fingerprint {
                    service: "Shopify".to_string(),
                    body_substrings: vec![
                        "sorry, this shop is currently unavailable".to_string()
                    ],
                    status_codes: vec![402, 403, 404],
                },
                Fingerprint {
                    service: "Fastly".to_string(),
                    body_substrings: vec!["fastly error: unknown domain".to_string()],
                    status_codes: vec![503],
                },
                Fingerprint {
                    service: "Unbounce".to_string(),
                    body_substrings: vec![
                        "the requested url was not found on this server".to_string(),
                        "unbounce".to_string(),
                    ],
                    status_codes: vec![404],
                },
            ],
        }
    }

    pub fn load_from_file(path: &Path) -> ScoutResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let raw: serde_json::Value = serde_json::from_str(&contents)?;

        let version = raw
            .get("version")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                ScoutError::validation("takeover fingerprint catalog requires non-empty 'version'")
            })?
            .trim()
            .to_string();

        let fingerprints_raw = raw
            .get("fingerprints")
            .and_then(|v| v.as_array())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                ScoutError::validation(
                    "takeover fingerprint catalog requires non-empty 'fingerprints' list",
                )
            })?;

        let mut fingerprints = Vec::with_capacity(fingerprints_raw.len());
        for (idx, item) in fingerprints_raw.iter().enumerate() {
            let n = idx + 1;
            let service = item
                .get("service")
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| {
                    ScoutError::validation(format!("fingerprints[{n}] missing non-empty 'service'"))
                })?
                .trim()
                .to_string();

            let body_substrings: Vec<String> = item
                .get("body_substrings")
                .and_then(|v| v.as_array())
                .filter(|a| !a.is_empty())
                .ok_or_else(|| {
                    ScoutError::validation(format!(
                        "fingerprints[{n}] missing non-empty 'body_substrings' list"
                    ))
                })?
                .iter()
                .filter_map(|s| s.as_str())
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
            if body_substrings.is_empty() {
                return Err(ScoutError::validation(format!(
                    "fingerprints[{n}] has no valid body_substrings"
                )));
            }

            let status_codes: Vec<i32> = match item.get("status_codes") {
                None => Vec::new(),
                Some(serde_json::Value::Array(codes)) => {
                    let mut out = Vec::with_capacity(codes.len());
                    for code in codes {
                        let code = code.as_i64().ok_or_else(|| {
                            ScoutError::validation(format!(
                                "fingerprints[{n}] contains non-integer status code"
                            ))
                        })?;
                        out.push(code as i32);
                    }
                    out
                }
                Some(_) => {
                    return Err(ScoutError::validation(format!(
                        "fingerprints[{n}] 'status_codes' must be a list"
                    )))
                }
            };

            fingerprints.push(Fingerprint {
                service,
                body_substrings,
                status_codes,
            });
        }

        Ok(FingerprintCatalog {
            version,
            fingerprints,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TakeoverFinding {
    pub service: String,
    pub confidence: &'static str,
    pub score: i32,
    pub fingerprint_version: String,
    pub matched_pattern: String,
    pub status_code: u16,
    pub url: String,
}

pub struct TakeoverChecker {
    client: reqwest::blocking::Client,
    catalog: FingerprintCatalog,
}

impl TakeoverChecker {
    pub fn new(timeout: Duration, catalog: FingerprintCatalog) -> ScoutResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(TakeoverChecker { client, catalog })
    }

    /// Fetch `https://host/` then `http://host/` and return the single
    /// highest-scoring fingerprint match across both, or `None`. A network
    /// failure on one scheme doesn't prevent the other from being tried.
    pub fn check(&self, hostname: &str) -> Option<TakeoverFinding> {
        let mut best: Option<TakeoverFinding> = None;

        for scheme in ["https", "http"] {
            let url = format!("{scheme}://{hostname}/");
            let Some((status_code, body)) = self.fetch(&url) else {
                continue;
            };

            for fp in &self.catalog.fingerprints {
                let (score, matched_pattern) = score_fingerprint(&body, status_code, fp);
                if score < MIN_SCORE {
                    continue;
                }
                let better = best.as_ref().map_or(true, |b| score > b.score);
                if better {
                    best = Some(TakeoverFinding {
                        service: fp.service.clone(),
                        confidence: confidence_label(score),
                        score,
                        fingerprint_version: self.catalog.version.clone(),
                        matched_pattern,
                        status_code,
                        url: url.clone(),
                    });
                }
            }
        }

        best
    }

    fn fetch(&self, url: &str) -> Option<(u16, String)> {
        let resp = self.client.get(url).send().ok()?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().ok()?;
        let sample = &bytes[..bytes.len().min(BODY_SAMPLE_BYTES)];
        let body = String::from_utf8_lossy(sample).to_ascii_lowercase();
        Some((status, body))
    }
}

fn score_fingerprint(body: &str, status_code: u16, fp: &Fingerprint) -> (i32, String) {
    let matched: Vec<&str> = fp
        .body_substrings
        .iter()
        .filter(|pattern| body.contains(pattern.as_str()))
        .map(|s| s.as_str())
        .collect();

    if matched.is_empty() {
        return (0, String::new());
    }

    let per_pattern_score = (70 / fp.body_substrings.len() as i32).max(20);
    let mut score = (per_pattern_score * matched.len() as i32).min(90);

    if !fp.status_codes.is_empty() && fp.status_codes.contains(&(status_code as i32)) {
        score = (score + 20).min(100);
    }

    (score, matched[0].to_string())
}

fn confidence_label(score: i32) -> &'static str {
    if score >= 90 {
        "high"
    } else if score >= 70 {
        "medium"
    } else {
        "low"
    }
}
