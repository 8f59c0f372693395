//! DNS resolution: nameserver parsing, the wire-level client, and the
//! system/custom resolver facade the scan pipeline drives.
pub mod client;
pub mod facade;
pub mod nameserver;

pub use client::{DnsClient, RecordType, ResolvedHost, DEFAULT_MAX_CNAME_DEPTH};
pub use facade::{ResolveIssue, ResolverMode};
pub use nameserver::{load_nameservers_file, Nameserver};
