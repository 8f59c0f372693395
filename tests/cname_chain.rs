//! CNAME-chain resolution against an in-process two-hop DNS stub.
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

use subdomain_scout::resolver::{DnsClient, Nameserver};
use subdomain_scout::wire::message::{QTYPE_A, QTYPE_CNAME};

/// `alias.chain.test` CNAMEs to `target.chain.test`, which has an A record.
/// Both A and AAAA queries are served; AAAA gets an empty (but successful)
/// answer so the chain still resolves via A.
fn spawn_chain_stub() -> Nameserver {
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
            let qtype_offset = 12 + qname_wire_len(&query[12..]);
            let qtype = u16::from_be_bytes([query[qtype_offset], query[qtype_offset + 1]]);

            let mut resp = Vec::new();
            resp.extend_from_slice(&id.to_be_bytes());

            if qname == "alias.chain.test" && qtype == QTYPE_A {
                resp.extend_from_slice(&0x8180u16.to_be_bytes());
                resp.extend_from_slice(&1u16.to_be_bytes());
                resp.extend_from_slice(&1u16.to_be_bytes());
                resp.extend_from_slice(&0u16.to_be_bytes());
                resp.extend_from_slice(&0u16.to_be_bytes());
                resp.extend_from_slice(&query[12..]);
                resp.extend_from_slice(&[0xC0, 0x0C]);
                resp.extend_from_slice(&QTYPE_CNAME.to_be_bytes());
                resp.extend_from_slice(&1u16.to_be_bytes());
                resp.extend_from_slice(&300u32.to_be_bytes());
                let mut target_encoded = Vec::new();
                for label in "target.chain.test".split('.') {
                    target_encoded.push(label.len() as u8);
                    target_encoded.extend_from_slice(label.as_bytes());
                }
                target_encoded.push(0);
                resp.extend_from_slice(&(target_encoded.len() as u16).to_be_bytes());
                resp.extend_from_slice(&target_encoded);
            } else if qname == "target.chain.test" && qtype == QTYPE_A {
                resp.extend_from_slice(&0x8180u16.to_be_bytes());
                resp.extend_from_slice(&1u16.to_be_bytes());
                resp.extend_from_slice(&1u16.to_be_bytes());
                resp.extend_from_slice(&0u16.to_be_bytes());
                resp.extend_from_slice(&0u16.to_be_bytes());
                resp.extend_from_slice(&query[12..]);
                resp.extend_from_slice(&[0xC0, 0x0C]);
                resp.extend_from_slice(&QTYPE_A.to_be_bytes());
                resp.extend_from_slice(&1u16.to_be_bytes());
                resp.extend_from_slice(&120u32.to_be_bytes());
                resp.extend_from_slice(&4u16.to_be_bytes());
                resp.extend_from_slice(&[7, 8, 9, 10]);
            } else {
                // AAAA queries (for either name) and anything else: empty
                // no-error answer.
                resp.extend_from_slice(&0x8180u16.to_be_bytes());
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

fn qname_wire_len(rest: &[u8]) -> usize {
    let mut pos = 0;
    loop {
        let len = rest[pos] as usize;
        pos += 1;
        if len == 0 {
            break;
        }
        pos += len;
    }
    pos
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
fn follows_cname_to_final_a_record() {
    let ns = spawn_chain_stub();
    let client = DnsClient::new(vec![ns], Duration::from_secs(2));
    let host = client.resolve_host_details("alias.chain.test", 8).unwrap();

    assert_eq!(host.ips, vec!["7.8.9.10".to_string()]);
    assert_eq!(host.cnames, vec!["target.chain.test".to_string()]);
    assert_eq!(host.canonical_target, Some("target.chain.test".to_string()));
}
