//! The per-label scan result record and its NDJSON schema.
use serde::Serialize;

use crate::takeover::TakeoverFinding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Resolved,
    NotFound,
    Error,
    Wildcard,
    Cname,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Resolved => "resolved",
            Status::NotFound => "not_found",
            Status::Error => "error",
            Status::Wildcard => "wildcard",
            Status::Cname => "cname",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub subdomain: String,
    pub ips: Vec<String>,
    pub status: Status,
    pub elapsed_ms: u64,
    pub attempts: u32,
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnames: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_record_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub takeover: Option<TakeoverFinding>,
}

impl ScanResult {
    pub fn to_ndjson_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
