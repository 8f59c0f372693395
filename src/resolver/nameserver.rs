//! Nameserver spec parsing: `1.2.3.4`, `1.2.3.4:port`, `2001:db8::1`,
//! `[2001:db8::1]`, `[2001:db8::1]:port`.
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::error::{ScoutError, ScoutResult};

const DEFAULT_PORT: u16 = 53;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nameserver {
    pub addr: SocketAddr,
}

impl Nameserver {
    pub fn parse(spec: &str) -> ScoutResult<Self> {
        let raw = spec.trim();
        if raw.is_empty() {
            return Err(ScoutError::validation("resolver must be non-empty"));
        }

        let (host, port) = if let Some(rest) = raw.strip_prefix('[') {
            let end = rest
                .find(']')
                .ok_or_else(|| ScoutError::validation("invalid resolver: missing ']'"))?;
            let host = rest[..end].trim().to_string();
            let tail = rest[end + 1..].trim();
            let port = if tail.is_empty() {
                DEFAULT_PORT
            } else {
                let digits = tail.strip_prefix(':').ok_or_else(|| {
                    ScoutError::validation("invalid resolver: unexpected trailing content after ']'")
                })?;
                digits
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| ScoutError::validation("invalid resolver port"))?
            };
            (host, port)
        } else if raw.matches(':').count() == 1 && raw.contains('.') {
            let (host_part, port_part) = raw.split_once(':').unwrap();
            let port = port_part
                .trim()
                .parse::<u16>()
                .map_err(|_| ScoutError::validation("invalid resolver port"))?;
            (host_part.trim().to_string(), port)
        } else {
            (raw.to_string(), DEFAULT_PORT)
        };

        if port == 0 {
            return Err(ScoutError::validation("invalid resolver port"));
        }

        let ip: IpAddr = host
            .parse()
            .map_err(|_| ScoutError::validation("invalid resolver IP address"))?;

        Ok(Nameserver {
            addr: SocketAddr::new(ip, port),
        })
    }

    pub fn is_v6(&self) -> bool {
        self.addr.is_ipv6()
    }
}

impl fmt::Display for Nameserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// Load resolver `ip[:port]` entries from a file: `#`-comments stripped,
/// blanks skipped, order-preserving dedup. Errors if the file yields zero
/// entries.
pub fn load_nameservers_file(contents: &str, src_name: &str) -> ScoutResult<Vec<Nameserver>> {
    let mut entries = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (idx, raw_line) in contents.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let spec = line.split_whitespace().next().unwrap_or("");
        let ns = Nameserver::parse(spec)
            .map_err(|e| ScoutError::validation(format!("invalid resolver in {src_name}:{lineno}: {e}")))?;
        if seen.insert(ns.addr) {
            entries.push(ns);
        }
    }

    if entries.is_empty() {
        return Err(ScoutError::validation(format!(
            "resolver file {src_name} contains no valid entries"
        )));
    }
    Ok(entries)
}
