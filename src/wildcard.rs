//! Wildcard DNS detection: per-zone random-label probing, IP-set caching,
//! and optional HTTP-based false-positive suppression.
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;

use crate::resolver::ResolverMode;

pub const DEFAULT_PROBE_COUNT: usize = 3;
pub const DEFAULT_WILDCARD_THRESHOLD: u32 = 2;

/// An unordered, deduplicated IP set, used as a cache key and for the
/// "is this ipset a wildcard ipset" membership test.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpSet(Vec<String>);

impl IpSet {
    pub fn from_ips(ips: &[String]) -> Self {
        let mut set: Vec<String> = ips.to_vec();
        set.sort();
        set.dedup();
        IpSet(set)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

struct ZoneEntry {
    wildcard_ipsets: HashSet<IpSet>,
}

/// Caches, per parent zone, the set of IP-sets that random-label probes
/// resolved to at least `threshold` times. Computed at most once per zone
/// per scan.
pub struct WildcardDetector {
    probe_count: usize,
    threshold: u32,
    cache: Mutex<HashMap<String, ZoneEntry>>,
}

impl WildcardDetector {
    pub fn new(probe_count: usize, threshold: u32) -> Self {
        WildcardDetector {
            probe_count: probe_count.max(2),
            threshold,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The parent zone of a candidate FQDN: the hostname minus its first label.
    pub fn parent_zone(fqdn: &str) -> Option<&str> {
        fqdn.split_once('.').map(|(_, rest)| rest)
    }

    /// Classify a resolved candidate against its zone's wildcard ipsets,
    /// populating the cache for that zone on first use.
    pub fn classify(&self, mode: &ResolverMode, fqdn: &str, ips: &[String]) -> bool {
        let Some(zone) = Self::parent_zone(fqdn) else {
            return false;
        };
        if ips.is_empty() {
            return false;
        }

        self.ensure_zone(mode, zone);

        let cache = self.cache.lock().unwrap();
        let Some(entry) = cache.get(zone) else {
            return false;
        };
        let candidate_set = IpSet::from_ips(ips);
        !candidate_set.is_empty() && entry.wildcard_ipsets.contains(&candidate_set)
    }

    fn ensure_zone(&self, mode: &ResolverMode, zone: &str) {
        {
            let cache = self.cache.lock().unwrap();
            if cache.contains_key(zone) {
                return;
            }
        }

        let mut hits: HashMap<IpSet, u32> = HashMap::new();
        for _ in 0..self.probe_count {
            let probe_name = format!("_sdscout-{}.{}", random_hex_label(), zone);
            if let Ok(host) = mode.resolve(&probe_name) {
                if !host.ips.is_empty() {
                    *hits.entry(IpSet::from_ips(&host.ips)).or_insert(0) += 1;
                }
            }
        }

        let wildcard_ipsets = hits
            .into_iter()
            .filter(|(_, count)| *count >= self.threshold)
            .map(|(ipset, _)| ipset)
            .collect();

        self.cache.lock().unwrap().insert(
            zone.to_string(),
            ZoneEntry { wildcard_ipsets },
        );
    }

    /// Generate one fresh random probe name for `zone`, for HTTP false-positive
    /// suppression comparisons against a suspected wildcard candidate.
    pub fn random_probe_name(zone: &str) -> String {
        format!("_sdscout-{}.{}", random_hex_label(), zone)
    }
}

fn random_hex_label() -> String {
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap())
        .collect()
}

/// Result of the optional HTTP false-positive suppression check: whether the
/// candidate's body differs meaningfully from the zone-probe's body.
pub fn looks_distinct_from_wildcard_probe(
    client: &reqwest::blocking::Client,
    candidate_host: &str,
    zone: &str,
    timeout: Duration,
) -> bool {
    let probe_host = WildcardDetector::random_probe_name(zone);
    let candidate_body = fetch_scrubbed_body(client, candidate_host, timeout);
    let probe_body = fetch_scrubbed_body(client, &probe_host, timeout);

    match (candidate_body, probe_body) {
        (Some(c), Some(p)) => c != p,
        // If either fetch failed outright, we can't prove the candidate is
        // distinct: keep the wildcard classification.
        _ => false,
    }
}

fn fetch_scrubbed_body(
    client: &reqwest::blocking::Client,
    host: &str,
    timeout: Duration,
) -> Option<String> {
    for scheme in ["https", "http"] {
        let url = format!("{scheme}://{host}/");
        if let Ok(resp) = client.get(&url).timeout(timeout).send() {
            if let Ok(text) = resp.text() {
                let truncated: String = text.chars().take(16 * 1024).collect();
                return Some(scrub_hostname(&truncated.to_lowercase(), host));
            }
        }
    }
    None
}

fn scrub_hostname(body: &str, host: &str) -> String {
    body.replace(&host.to_lowercase(), "")
}
