//! The scan pipeline's choice of resolver: the OS's address-info lookup, or
//! the crate's own DNS client pinned to specific nameservers.
use std::net::ToSocketAddrs;

use crate::error::ScoutError;
use crate::resolver::client::{DnsClient, ResolvedHost, DEFAULT_MAX_CNAME_DEPTH};

/// A classified resolve failure, carrying exactly what the scan result
/// record needs for its `error`/`error_type`/`error_code` fields.
#[derive(Debug, Clone)]
pub struct ResolveIssue {
    pub not_found: bool,
    pub retryable: bool,
    pub message: String,
    pub error_type: &'static str,
    pub error_code: Option<i64>,
    /// Whatever the client observed before concluding not_found/error —
    /// in particular a followed CNAME chain, needed for the pipeline's
    /// CNAME-only reclassification.
    pub partial: Option<ResolvedHost>,
}

impl ResolveIssue {
    fn not_found(message: impl Into<String>) -> Self {
        ResolveIssue {
            not_found: true,
            retryable: false,
            message: message.into(),
            error_type: "gaierror",
            error_code: None,
            partial: None,
        }
    }
}

pub enum ResolverMode {
    System,
    Custom {
        client: DnsClient,
        max_cname_depth: usize,
    },
}

impl ResolverMode {
    pub fn custom(client: DnsClient) -> Self {
        ResolverMode::Custom {
            client,
            max_cname_depth: DEFAULT_MAX_CNAME_DEPTH,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, ResolverMode::Custom { .. })
    }

    pub fn resolve(&self, fqdn: &str) -> Result<ResolvedHost, ResolveIssue> {
        match self {
            ResolverMode::System => resolve_system(fqdn),
            ResolverMode::Custom {
                client,
                max_cname_depth,
            } => resolve_custom(client, fqdn, *max_cname_depth),
        }
    }
}

fn resolve_system(fqdn: &str) -> Result<ResolvedHost, ResolveIssue> {
    match (fqdn, 0u16).to_socket_addrs() {
        Ok(iter) => {
            let mut ips = Vec::new();
            for addr in iter {
                let ip = addr.ip().to_string();
                if !ips.contains(&ip) {
                    ips.push(ip);
                }
            }
            if ips.is_empty() {
                // Open question (b): normalize an empty system-resolver result
                // to not_found, matching the custom-resolver path.
                return Err(ResolveIssue::not_found("no addresses returned"));
            }
            Ok(ResolvedHost {
                ips,
                ..ResolvedHost::default()
            })
        }
        Err(e) => Err(classify_system_error(&e)),
    }
}

fn classify_system_error(e: &std::io::Error) -> ResolveIssue {
    let msg = e.to_string();
    let lower = msg.to_ascii_lowercase();

    let looks_like_not_found = lower.contains("nodename nor servname")
        || lower.contains("name or service not known")
        || lower.contains("failed to lookup address information")
        || lower.contains("no such host");
    if looks_like_not_found {
        return ResolveIssue::not_found(msg);
    }

    let looks_like_try_again = lower.contains("try again") || lower.contains("temporary failure");
    if looks_like_try_again {
        return ResolveIssue {
            not_found: false,
            retryable: true,
            message: msg,
            error_type: "gaierror",
            error_code: e.raw_os_error().map(i64::from),
            partial: None,
        };
    }

    ResolveIssue {
        not_found: false,
        retryable: false,
        message: msg,
        error_type: "oserror",
        error_code: e.raw_os_error().map(i64::from),
        partial: None,
    }
}

fn resolve_custom(
    client: &DnsClient,
    fqdn: &str,
    max_cname_depth: usize,
) -> Result<ResolvedHost, ResolveIssue> {
    match client.resolve_host_details(fqdn, max_cname_depth) {
        Ok(host) if host.ips.is_empty() => {
            // Both an empty answer set and RCODE=3 (NXDOMAIN) surface as
            // empty ips from the client; both mean not_found here, with the
            // CNAME chain (if any) preserved for the pipeline's CNAME-only
            // reclassification.
            let partial = if host.cnames.is_empty() { None } else { Some(host) };
            Err(ResolveIssue {
                not_found: true,
                retryable: false,
                message: "no records found".to_string(),
                error_type: "gaierror",
                error_code: None,
                partial,
            })
        }
        Ok(host) => Ok(host),
        Err(ScoutError::Timeout) => Err(ResolveIssue {
            not_found: false,
            retryable: true,
            message: "dns query timed out".to_string(),
            error_type: "timeout",
            error_code: None,
            partial: None,
        }),
        Err(ScoutError::DnsRcode(code)) => Err(ResolveIssue {
            not_found: false,
            retryable: false,
            message: format!("dns error response (rcode={code})"),
            error_type: "dns",
            error_code: Some(code as i64),
            partial: None,
        }),
        Err(e @ ScoutError::DnsMalformed(_)) | Err(e @ ScoutError::DnsTransactionMismatch) => {
            Err(ResolveIssue {
                not_found: false,
                retryable: false,
                message: e.to_string(),
                error_type: "dns",
                error_code: None,
                partial: None,
            })
        }
        Err(e) => Err(ResolveIssue {
            not_found: false,
            retryable: false,
            message: e.to_string(),
            error_type: "oserror",
            error_code: None,
            partial: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_nxdomain_message_as_not_found() {
        let e = std::io::Error::new(std::io::ErrorKind::Other, "Name or service not known");
        let issue = classify_system_error(&e);
        assert!(issue.not_found);
    }

    #[test]
    fn classifies_try_again_as_retryable() {
        let e = std::io::Error::new(std::io::ErrorKind::Other, "Try again");
        let issue = classify_system_error(&e);
        assert!(issue.retryable);
        assert!(!issue.not_found);
    }
}
