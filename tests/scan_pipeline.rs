//! End-to-end scan pipeline test against an in-process DNS stub — no real
//! network access.
use std::collections::HashSet;
use std::io::BufRead;
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

use subdomain_scout::resolver::{DnsClient, Nameserver, ResolverMode};
use subdomain_scout::retry::RetryConfig;
use subdomain_scout::scan::{run_scan, OutputSink, ScanConfig};

/// A UDP DNS stub that resolves exactly one FQDN to one A record and NXDOMAINs
/// everything else.
fn spawn_stub(known_fqdn: &'static str, ip: [u8; 4]) -> Nameserver {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap();

    thread::spawn(move || {
        let mut buf = [0u8; 512];
        loop {
            let Ok((n, from)) = socket.recv_from(&mut buf) else {
                return;
            };
            let query = &buf[..n];
            let id = u16::from_be_bytes([query[0], query[1]]);
            let qname = decode_qname(&query[12..]);

            let mut resp = Vec::new();
            resp.extend_from_slice(&id.to_be_bytes());
            if qname == known_fqdn {
                resp.extend_from_slice(&0x8180u16.to_be_bytes());
                resp.extend_from_slice(&1u16.to_be_bytes());
                resp.extend_from_slice(&1u16.to_be_bytes());
                resp.extend_from_slice(&0u16.to_be_bytes());
                resp.extend_from_slice(&0u16.to_be_bytes());
                resp.extend_from_slice(&query[12..]);
                resp.extend_from_slice(&[0xC0, 0x0C]);
                resp.extend_from_slice(&1u16.to_be_bytes()); // TYPE A
                resp.extend_from_slice(&1u16.to_be_bytes()); // CLASS IN
                resp.extend_from_slice(&300u32.to_be_bytes()); // TTL
                resp.extend_from_slice(&4u16.to_be_bytes());
                resp.extend_from_slice(&ip);
            } else {
                resp.extend_from_slice(&0x8183u16.to_be_bytes()); // NXDOMAIN
                resp.extend_from_slice(&1u16.to_be_bytes());
                resp.extend_from_slice(&0u16.to_be_bytes());
                resp.extend_from_slice(&0u16.to_be_bytes());
                resp.extend_from_slice(&0u16.to_be_bytes());
                resp.extend_from_slice(&query[12..]);
            }
            let _ = socket.send_to(&resp, from);
        }
    });

    Nameserver {
        addr: std::net::SocketAddr::new("127.0.0.1".parse().unwrap(), addr.port()),
    }
}

fn decode_qname(mut rest: &[u8]) -> String {
    let mut labels = Vec::new();
    loop {
        let len = rest[0] as usize;
        if len == 0 {
            break;
        }
        labels.push(String::from_utf8_lossy(&rest[1..1 + len]).to_string());
        rest = &rest[1 + len..];
    }
    labels.join(".")
}

#[test]
fn scan_resolves_known_label_and_classifies_rest_not_found() {
    let ns = spawn_stub("www.stub.test", [5, 6, 7, 8]);
    let client = DnsClient::new(vec![ns], Duration::from_secs(2));
    let mode = ResolverMode::custom(client);

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.ndjson");
    let mut sink = OutputSink::new_file(&output).unwrap();

    let cfg = ScanConfig {
        domain: "stub.test".to_string(),
        concurrency: 2,
        retry: RetryConfig { retries: 0, backoff_ms: 0 },
        status_filter: None,
        include_cname: false,
        wildcard_http_suppression: false,
        http_timeout: Duration::from_secs(1),
    };

    let summary = run_scan(
        mode,
        vec!["www".to_string(), "missing".to_string()],
        Vec::new(),
        cfg,
        None,
        None,
        HashSet::new(),
        &mut sink,
    )
    .unwrap();
    sink.finish().unwrap();

    assert_eq!(summary.resolved, 1);
    assert_eq!(summary.not_found, 1);
    assert_eq!(summary.written, 2);

    let contents = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);

    let mut saw_resolved = false;
    for line in &lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        if value["subdomain"] == "www.stub.test" {
            assert_eq!(value["status"], "resolved");
            assert_eq!(value["ips"][0], "5.6.7.8");
            saw_resolved = true;
        } else {
            assert_eq!(value["status"], "not_found");
        }
    }
    assert!(saw_resolved);
}

#[test]
fn scan_with_status_filter_only_writes_matching_records() {
    let ns = spawn_stub("www.filtertest.test", [1, 1, 1, 1]);
    let client = DnsClient::new(vec![ns], Duration::from_secs(2));
    let mode = ResolverMode::custom(client);

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.ndjson");
    let mut sink = OutputSink::new_file(&output).unwrap();

    let mut filter = HashSet::new();
    filter.insert(subdomain_scout::scan::Status::Resolved);

    let cfg = ScanConfig {
        domain: "filtertest.test".to_string(),
        concurrency: 1,
        retry: RetryConfig { retries: 0, backoff_ms: 0 },
        status_filter: Some(filter),
        include_cname: false,
        wildcard_http_suppression: false,
        http_timeout: Duration::from_secs(1),
    };

    let summary = run_scan(
        mode,
        vec!["www".to_string(), "missing".to_string()],
        Vec::new(),
        cfg,
        None,
        None,
        HashSet::new(),
        &mut sink,
    )
    .unwrap();
    sink.finish().unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.written, 1);

    let contents = std::fs::read_to_string(&output).unwrap();
    assert_eq!(contents.lines().count(), 1);
}

#[test]
fn resume_mode_skips_previously_seen_labels_and_appends() {
    let ns = spawn_stub("new.resumetest.test", [2, 2, 2, 2]);
    let client = DnsClient::new(vec![ns], Duration::from_secs(2));
    let mode = ResolverMode::custom(client);

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.ndjson");
    std::fs::write(
        &output,
        "{\"subdomain\":\"old.resumetest.test\",\"status\":\"resolved\",\"ips\":[\"9.9.9.9\"],\"elapsed_ms\":1,\"attempts\":1,\"retries\":0}\n",
    )
    .unwrap();

    let resume_seen = subdomain_scout::scan::resume::load_resume_set(
        std::io::BufReader::new(std::fs::File::open(&output).unwrap()),
        "resumetest.test",
    )
    .unwrap();
    assert!(resume_seen.contains("old"));

    let mut sink = OutputSink::append_file(&output).unwrap();
    let cfg = ScanConfig {
        domain: "resumetest.test".to_string(),
        concurrency: 1,
        retry: RetryConfig { retries: 0, backoff_ms: 0 },
        status_filter: None,
        include_cname: false,
        wildcard_http_suppression: false,
        http_timeout: Duration::from_secs(1),
    };

    let summary = run_scan(
        mode,
        vec!["old".to_string(), "new".to_string()],
        Vec::new(),
        cfg,
        None,
        None,
        resume_seen,
        &mut sink,
    )
    .unwrap();
    sink.finish().unwrap();

    assert_eq!(summary.labels_skipped_existing, 1);
    assert_eq!(summary.attempted, 1);

    let reader = std::io::BufReader::new(std::fs::File::open(&output).unwrap());
    let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("old.resumetest.test"));
    assert!(lines[1].contains("new.resumetest.test"));
}
