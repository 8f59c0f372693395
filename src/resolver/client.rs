//! A from-scratch DNS client: UDP with TCP fallback on truncation,
//! multi-nameserver failover, and CNAME-chain following.
use std::io::{Read, Write};
use std::net::{TcpStream, UdpSocket};
use std::time::Duration;

use log::debug;

use crate::error::{ScoutError, ScoutResult};
use crate::resolver::nameserver::Nameserver;
use crate::wire::message::{self, ParsedResponse, QTYPE_AAAA, QTYPE_A};

pub const DEFAULT_MAX_CNAME_DEPTH: usize = 8;
const MAX_DNS_PACKET_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
        }
    }
}

/// The result of walking A/AAAA/CNAME records to their conclusion for a name.
#[derive(Debug, Default, Clone)]
pub struct ResolvedHost {
    pub ips: Vec<String>,
    pub cnames: Vec<String>,
    pub record_types: Vec<RecordType>,
    pub ttl_min: Option<u32>,
    pub ttl_max: Option<u32>,
    pub canonical_target: Option<String>,
}

impl ResolvedHost {
    fn observe_ttl(&mut self, ttl: u32) {
        self.ttl_min = Some(self.ttl_min.map_or(ttl, |m| m.min(ttl)));
        self.ttl_max = Some(self.ttl_max.map_or(ttl, |m| m.max(ttl)));
    }

    fn observe_type(&mut self, rt: RecordType) {
        if !self.record_types.contains(&rt) {
            self.record_types.push(rt);
        }
    }
}

pub struct DnsClient {
    nameservers: Vec<Nameserver>,
    timeout: Duration,
}

impl DnsClient {
    pub fn new(nameservers: Vec<Nameserver>, timeout: Duration) -> Self {
        Self {
            nameservers,
            timeout,
        }
    }

    /// Resolve `name`, following CNAME chains up to `max_cname_depth` hops.
    pub fn resolve_host_details(
        &self,
        name: &str,
        max_cname_depth: usize,
    ) -> ScoutResult<ResolvedHost> {
        let mut host = ResolvedHost::default();
        let mut current = name.to_string();
        let mut visited = std::collections::HashSet::new();
        visited.insert(current.clone());

        for _ in 0..=max_cname_depth {
            let mut collected_ip_this_round = false;
            let cnames_before = host.cnames.len();

            for qtype in [QTYPE_A, QTYPE_AAAA] {
                let resp = self.query(&current, qtype)?;
                self.merge_response(&mut host, &resp, qtype, &mut collected_ip_this_round);
            }

            if collected_ip_this_round {
                break;
            }

            if host.cnames.len() > cnames_before {
                let target = host.cnames.last().unwrap().clone();
                if !visited.insert(target.clone()) {
                    // loop guard: target already visited
                    break;
                }
                current = target;
                continue;
            }

            break;
        }

        host.canonical_target = host.cnames.last().cloned();
        Ok(host)
    }

    fn merge_response(
        &self,
        host: &mut ResolvedHost,
        resp: &ParsedResponse,
        qtype: u16,
        collected_ip_this_round: &mut bool,
    ) {
        for (ip, ttl) in &resp.addresses {
            if !host.ips.contains(ip) {
                host.ips.push(ip.clone());
            }
            host.observe_ttl(*ttl);
            *collected_ip_this_round = true;
        }
        if !resp.addresses.is_empty() {
            host.observe_type(if qtype == QTYPE_A {
                RecordType::A
            } else {
                RecordType::Aaaa
            });
        }
        for (target, ttl) in &resp.cnames {
            if Some(target) != host.cnames.last() {
                host.cnames.push(target.clone());
                host.observe_type(RecordType::Cname);
            }
            host.observe_ttl(*ttl);
        }
    }

    /// Query all configured nameservers in order for `(name, qtype)`. Tries
    /// UDP first; on TC=1 retries the same query over TCP to the same
    /// server. RCODE 0/3 is a valid terminal outcome; anything else moves on
    /// to the next nameserver. Returns the last error (preferring a
    /// timeout) if every nameserver failed.
    fn query(&self, name: &str, qtype: u16) -> ScoutResult<ParsedResponse> {
        let mut last_err: Option<ScoutError> = None;

        for ns in &self.nameservers {
            match self.query_one(ns, name, qtype) {
                Ok(resp) if resp.rcode == 0 || resp.rcode == 3 => return Ok(resp),
                Ok(resp) => {
                    debug!("nameserver {ns} returned rcode={}, trying next", resp.rcode);
                    last_err = Some(ScoutError::DnsRcode(resp.rcode));
                }
                Err(e) => {
                    debug!("nameserver {ns} failed: {e}, trying next");
                    let prefer_timeout = matches!(e, ScoutError::Timeout);
                    if prefer_timeout || !matches!(last_err, Some(ScoutError::Timeout)) {
                        last_err = Some(e);
                    }
                }
            }
        }

        Err(last_err.unwrap_or(ScoutError::Timeout))
    }

    fn query_one(&self, ns: &Nameserver, name: &str, qtype: u16) -> ScoutResult<ParsedResponse> {
        let encoded = message::encode_query(name, qtype)?;
        let resp = self.udp_send(ns, &encoded.bytes)?;
        let parsed = message::parse_response(&resp, encoded.id, qtype)?;

        if parsed.truncated {
            debug!("response from {ns} truncated, retrying over TCP");
            let encoded = message::encode_query(name, qtype)?;
            let resp = self.tcp_send(ns, &encoded.bytes)?;
            return message::parse_response(&resp, encoded.id, qtype);
        }

        Ok(parsed)
    }

    fn udp_send(&self, ns: &Nameserver, query: &[u8]) -> ScoutResult<Vec<u8>> {
        let bind_addr = if ns.is_v6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_read_timeout(Some(self.timeout))?;
        socket.set_write_timeout(Some(self.timeout))?;
        socket.send_to(query, ns.addr)?;

        let mut buf = [0u8; MAX_DNS_PACKET_SIZE];
        let received = socket.recv(&mut buf).map_err(classify_io_timeout)?;
        Ok(buf[..received].to_vec())
    }

    fn tcp_send(&self, ns: &Nameserver, query: &[u8]) -> ScoutResult<Vec<u8>> {
        let mut stream = TcpStream::connect_timeout(&ns.addr, self.timeout)
            .map_err(classify_io_timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let len = query.len() as u16;
        stream.write_all(&len.to_be_bytes())?;
        stream.write_all(query)?;

        let mut len_buf = [0u8; 2];
        stream.read_exact(&mut len_buf).map_err(classify_io_timeout)?;
        let expected = u16::from_be_bytes(len_buf) as usize;

        let mut data = vec![0u8; expected];
        stream.read_exact(&mut data).map_err(classify_io_timeout)?;
        Ok(data)
    }
}

fn classify_io_timeout(e: std::io::Error) -> ScoutError {
    use std::io::ErrorKind;
    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) {
        ScoutError::Timeout
    } else {
        ScoutError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::message::{encode_query, QTYPE_A};
    use std::net::UdpSocket as StdUdpSocket;
    use std::thread;

    /// A minimal UDP DNS stub that always answers A queries with one fixed IP.
    fn spawn_stub(ip: &'static str, ttl: u32) -> (Nameserver, thread::JoinHandle<()>) {
        let socket = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 512];
            if let Ok((n, from)) = socket.recv_from(&mut buf) {
                let query = &buf[..n];
                let id = u16::from_be_bytes([query[0], query[1]]);
                let mut resp = Vec::new();
                resp.extend_from_slice(&id.to_be_bytes());
                resp.extend_from_slice(&0x8180u16.to_be_bytes());
                resp.extend_from_slice(&1u16.to_be_bytes());
                resp.extend_from_slice(&1u16.to_be_bytes());
                resp.extend_from_slice(&0u16.to_be_bytes());
                resp.extend_from_slice(&0u16.to_be_bytes());
                // echo back the question section verbatim
                resp.extend_from_slice(&query[12..]);
                // answer: same name via pointer to offset 12
                resp.extend_from_slice(&[0xC0, 0x0C]);
                resp.extend_from_slice(&QTYPE_A.to_be_bytes());
                resp.extend_from_slice(&1u16.to_be_bytes());
                resp.extend_from_slice(&ttl.to_be_bytes());
                resp.extend_from_slice(&4u16.to_be_bytes());
                let octets: Vec<u8> = ip.split('.').map(|p| p.parse().unwrap()).collect();
                resp.extend_from_slice(&octets);
                let _ = socket.send_to(&resp, from);
            }
        });
        (
            Nameserver {
                addr: std::net::SocketAddr::new("127.0.0.1".parse().unwrap(), addr.port()),
            },
            handle,
        )
    }

    #[test]
    fn resolves_a_record_via_stub_server() {
        let (ns, handle) = spawn_stub("9.9.9.9", 60);
        let client = DnsClient::new(vec![ns], Duration::from_secs(2));
        let host = client
            .resolve_host_details("probe.example.com", DEFAULT_MAX_CNAME_DEPTH)
            .unwrap();
        assert_eq!(host.ips, vec!["9.9.9.9".to_string()]);
        assert_eq!(host.ttl_min, Some(60));
        handle.join().unwrap();
    }

    #[test]
    fn encode_query_has_random_transaction_id() {
        let a = encode_query("x.example.com", QTYPE_A).unwrap();
        let b = encode_query("x.example.com", QTYPE_A).unwrap();
        assert_ne!(a.id, b.id, "transaction ids should (almost always) differ");
    }
}
