//! Completion summaries for the three top-level operations, emitted either
//! as a human-readable line or as a tagged JSON object.
use serde::Serialize;

use crate::diff::DiffSummary;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Default, Clone, Serialize)]
pub struct ScanSummary {
    pub labels_total: usize,
    pub labels_unique: usize,
    pub labels_deduped: usize,
    pub labels_skipped_existing: usize,
    pub attempted: usize,
    pub resolved: usize,
    pub not_found: usize,
    pub error: usize,
    pub wildcard: usize,
    pub cname: usize,
    pub written: usize,
    pub ct_labels: usize,
    pub takeover_checked: usize,
    pub takeover_suspected: usize,
    pub elapsed_ms: u64,
}

impl ScanSummary {
    pub fn human_readable(&self) -> String {
        format!(
            "scanned attempted={} resolved={} not_found={} error={} wildcard={} cname={} \
written={} labels_total={} labels_unique={} labels_deduped={} labels_skipped_existing={} \
ct_labels={} takeover_checked={} takeover_suspected={} elapsed_ms={}",
            self.attempted,
            self.resolved,
            self.not_found,
            self.error,
            self.wildcard,
            self.cname,
            self.written,
            self.labels_total,
            self.labels_unique,
            self.labels_deduped,
            self.labels_skipped_existing,
            self.ct_labels,
            self.takeover_checked,
            self.takeover_suspected,
            self.elapsed_ms
        )
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Tagged<'a> {
            kind: &'static str,
            schema_version: u32,
            #[serde(flatten)]
            summary: &'a ScanSummary,
        }
        serde_json::to_string(&Tagged {
            kind: "scan_summary",
            schema_version: SCHEMA_VERSION,
            summary: self,
        })
    }

    /// 1 iff any error records were produced.
    pub fn exit_code(&self) -> i32 {
        if self.error > 0 {
            1
        } else {
            0
        }
    }
}

pub fn diff_summary_human(summary: &DiffSummary) -> String {
    format!(
        "diff old_total={} new_total={} added={} removed={} changed={} unchanged={}",
        summary.old_total, summary.new_total, summary.added, summary.removed, summary.changed, summary.unchanged
    )
}

pub fn diff_summary_json(summary: &DiffSummary) -> serde_json::Result<String> {
    #[derive(Serialize)]
    struct Tagged<'a> {
        kind: &'static str,
        schema_version: u32,
        #[serde(flatten)]
        summary: &'a DiffSummary,
    }
    serde_json::to_string(&Tagged {
        kind: "diff_summary",
        schema_version: SCHEMA_VERSION,
        summary,
    })
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct CtSummary {
    pub records_fetched: usize,
    pub names_seen: usize,
    pub emitted: usize,
    pub elapsed_ms: u64,
}

impl CtSummary {
    pub fn human_readable(&self) -> String {
        format!(
            "ct records_fetched={} names_seen={} emitted={} elapsed_ms={}",
            self.records_fetched, self.names_seen, self.emitted, self.elapsed_ms
        )
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Tagged<'a> {
            kind: &'static str,
            schema_version: u32,
            #[serde(flatten)]
            summary: &'a CtSummary,
        }
        serde_json::to_string(&Tagged {
            kind: "ct_summary",
            schema_version: SCHEMA_VERSION,
            summary: self,
        })
    }
}
