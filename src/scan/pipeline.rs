//! The scan pipeline: label ingestion, dedup, bounded-concurrency dispatch,
//! retry, classification, and streaming output.
use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::ScoutResult;
use crate::hostname::fqdn;
use crate::resolver::{RecordType, ResolverMode};
use crate::retry::{real_sleep, resolve_with_retries, RetryConfig};
use crate::scan::record::{ScanResult, Status};
use crate::scan::sink::OutputSink;
use crate::takeover::TakeoverChecker;
use crate::wildcard::WildcardDetector;

pub struct ScanConfig {
    pub domain: String,
    pub concurrency: usize,
    pub retry: RetryConfig,
    pub status_filter: Option<HashSet<Status>>,
    pub include_cname: bool,
    pub wildcard_http_suppression: bool,
    pub http_timeout: Duration,
}

#[derive(Default)]
struct Counters {
    resolved: usize,
    not_found: usize,
    error: usize,
    wildcard: usize,
    cname: usize,
    written: usize,
    takeover_checked: usize,
    takeover_suspected: usize,
}

/// Everything a worker needs to process one label, shared read-only (or
/// internally synchronized) across threads.
struct Shared {
    cfg: ScanConfig,
    mode: ResolverMode,
    wildcard: Option<WildcardDetector>,
    takeover: Option<TakeoverChecker>,
    http_client: Option<reqwest::blocking::Client>,
}

fn process_one(shared: &Shared, label: &str) -> ScanResult {
    let subdomain = fqdn(label, &shared.cfg.domain);
    let start = Instant::now();

    let outcome = resolve_with_retries(&shared.mode, &subdomain, shared.cfg.retry, &real_sleep);
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let mut result = match outcome.result {
        Ok(host) => ScanResult {
            subdomain: subdomain.clone(),
            ips: host.ips,
            status: Status::Resolved,
            elapsed_ms,
            attempts: outcome.attempts,
            retries: outcome.retries,
            error: None,
            error_type: None,
            error_code: None,
            cnames: non_empty(host.cnames),
            canonical_target: host.canonical_target,
            dns_record_types: non_empty(sorted_record_type_strings(&host.record_types)),
            ttl_min: host.ttl_min,
            ttl_max: host.ttl_max,
            takeover: None,
        },
        Err(issue) => {
            let mut status = if issue.not_found { Status::NotFound } else { Status::Error };
            let mut cnames = None;
            let mut canonical_target = None;
            let mut dns_record_types = None;
            let mut ttl_min = None;
            let mut ttl_max = None;

            if let Some(partial) = &issue.partial {
                if shared.cfg.include_cname && !partial.cnames.is_empty() {
                    status = Status::Cname;
                }
                cnames = non_empty(partial.cnames.clone());
                canonical_target = partial.canonical_target.clone();
                dns_record_types = non_empty(sorted_record_type_strings(&partial.record_types));
                ttl_min = partial.ttl_min;
                ttl_max = partial.ttl_max;
            }

            ScanResult {
                subdomain: subdomain.clone(),
                ips: Vec::new(),
                status,
                elapsed_ms,
                attempts: outcome.attempts,
                retries: outcome.retries,
                error: if matches!(status, Status::NotFound | Status::Cname) {
                    None
                } else {
                    Some(issue.message)
                },
                error_type: if matches!(status, Status::NotFound | Status::Cname) {
                    None
                } else {
                    Some(issue.error_type)
                },
                error_code: if matches!(status, Status::NotFound | Status::Cname) {
                    None
                } else {
                    issue.error_code
                },
                cnames,
                canonical_target,
                dns_record_types,
                ttl_min,
                ttl_max,
                takeover: None,
            }
        }
    };

    // Wildcard classification, then takeover probe, strictly in that order.
    if matches!(result.status, Status::Resolved) {
        if let Some(detector) = &shared.wildcard {
            if detector.classify(&shared.mode, &subdomain, &result.ips) {
                let suppressed = shared.cfg.wildcard_http_suppression
                    && shared
                        .http_client
                        .as_ref()
                        .map(|client| {
                            WildcardDetector::parent_zone(&subdomain).is_some_and(|zone| {
                                crate::wildcard::looks_distinct_from_wildcard_probe(
                                    client,
                                    &subdomain,
                                    zone,
                                    shared.cfg.http_timeout,
                                )
                            })
                        })
                        .unwrap_or(false);
                if !suppressed {
                    result.status = Status::Wildcard;
                }
            }
        }
    }

    result
}

fn probe_takeover(shared: &Shared, result: &mut ScanResult, counters: &Mutex<Counters>) {
    if !matches!(result.status, Status::Resolved | Status::Wildcard) {
        return;
    }
    let Some(checker) = &shared.takeover else {
        return;
    };
    counters.lock().unwrap().takeover_checked += 1;
    if let Some(finding) = checker.check(&result.subdomain) {
        counters.lock().unwrap().takeover_suspected += 1;
        result.takeover = Some(finding);
    }
}

/// Record types in canonical order `[A, AAAA, CNAME]`, filtered to what was
/// actually observed (`RecordType`'s derived `Ord` matches that order).
fn sorted_record_type_strings(types: &[RecordType]) -> Vec<String> {
    let mut sorted = types.to_vec();
    sorted.sort();
    sorted.into_iter().map(|rt| rt.as_str().to_string()).collect()
}

fn non_empty<T>(v: Vec<T>) -> Option<Vec<T>> {
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

fn passes_filter(cfg: &ScanConfig, status: Status) -> bool {
    match &cfg.status_filter {
        Some(allowed) => allowed.contains(&status),
        None => true,
    }
}

/// Drive one full scan: dedup the combined wordlist + CT label stream,
/// dispatch across `cfg.concurrency` workers, classify, and stream results
/// to `sink` in completion order.
pub fn run_scan(
    mode: ResolverMode,
    wordlist_labels: Vec<String>,
    ct_labels: Vec<String>,
    cfg: ScanConfig,
    wildcard: Option<WildcardDetector>,
    takeover: Option<TakeoverChecker>,
    resume_seen: HashSet<String>,
    sink: &mut OutputSink,
) -> ScoutResult<crate::summary::ScanSummary> {
    let start = Instant::now();
    let mut summary = crate::summary::ScanSummary::default();
    summary.ct_labels = ct_labels.len();

    let mut seen = HashSet::new();
    let mut to_resolve = Vec::new();

    for label in wordlist_labels.into_iter().chain(ct_labels) {
        summary.labels_total += 1;
        if !seen.insert(label.clone()) {
            summary.labels_deduped += 1;
            continue;
        }
        summary.labels_unique += 1;
        if resume_seen.contains(&label) {
            summary.labels_skipped_existing += 1;
            continue;
        }
        to_resolve.push(label);
    }

    let http_client = if cfg.wildcard_http_suppression {
        Some(
            reqwest::blocking::Client::builder()
                .timeout(cfg.http_timeout)
                .build()
                .map_err(crate::error::ScoutError::from)?,
        )
    } else {
        None
    };

    let shared = Arc::new(Shared {
        cfg,
        mode,
        wildcard,
        takeover,
        http_client,
    });
    let counters = Arc::new(Mutex::new(Counters::default()));

    let concurrency = shared.cfg.concurrency.max(1);
    if concurrency == 1 {
        for label in to_resolve {
            let mut result = process_one(&shared, &label);
            probe_takeover(&shared, &mut result, &counters);
            record_and_emit(&shared, &counters, result, sink)?;
        }
    } else {
        run_concurrent(&shared, to_resolve, concurrency, &counters, sink)?;
    }

    let final_counters = counters.lock().unwrap();
    summary.resolved = final_counters.resolved;
    summary.not_found = final_counters.not_found;
    summary.error = final_counters.error;
    summary.wildcard = final_counters.wildcard;
    summary.cname = final_counters.cname;
    summary.written = final_counters.written;
    summary.takeover_checked = final_counters.takeover_checked;
    summary.takeover_suspected = final_counters.takeover_suspected;
    summary.attempted = summary.resolved
        + summary.not_found
        + summary.error
        + summary.wildcard
        + summary.cname;
    summary.elapsed_ms = start.elapsed().as_millis() as u64;

    Ok(summary)
}

fn run_concurrent(
    shared: &Arc<Shared>,
    labels: Vec<String>,
    concurrency: usize,
    counters: &Arc<Mutex<Counters>>,
    sink: &mut OutputSink,
) -> ScoutResult<()> {
    let work = Arc::new(Mutex::new(labels.into_iter()));
    let (tx, rx) = mpsc::channel::<ScanResult>();

    std::thread::scope(|scope| {
        for worker_id in 0..concurrency {
            let work = Arc::clone(&work);
            let tx = tx.clone();
            let shared = Arc::clone(shared);
            let counters = Arc::clone(counters);
            scope.spawn(move || {
                loop {
                    let next = work.lock().unwrap().next();
                    let Some(label) = next else { break };
                    let mut result = process_one(&shared, &label);
                    probe_takeover(&shared, &mut result, &counters);
                    debug!("worker {worker_id} resolved {}", result.subdomain);
                    if tx.send(result).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        for result in rx {
            if let Err(e) = record_and_emit(shared, counters, result, sink) {
                warn!("output sink write failed: {e}");
                return Err(e);
            }
        }
        Ok(())
    })
}

fn record_and_emit(
    shared: &Shared,
    counters: &Mutex<Counters>,
    result: ScanResult,
    sink: &mut OutputSink,
) -> ScoutResult<()> {
    {
        let mut c = counters.lock().unwrap();
        match result.status {
            Status::Resolved => c.resolved += 1,
            Status::NotFound => c.not_found += 1,
            Status::Error => c.error += 1,
            Status::Wildcard => c.wildcard += 1,
            Status::Cname => c.cname += 1,
        }
    }

    if passes_filter(&shared.cfg, result.status) {
        let line = result.to_ndjson_line()?;
        sink.write_line(&line)?;
        counters.lock().unwrap().written += 1;
    }

    Ok(())
}
