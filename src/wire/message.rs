//! DNS query encoding and response parsing (RFC 1035 message format),
//! minus everything the resolver doesn't need (EDNS0, non-IN classes,
//! non-A/AAAA/CNAME record types).
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rand::Rng;
use std::io::Cursor;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{ScoutError, ScoutResult};
use crate::wire::name::{decode_name, encode_name};

pub const QTYPE_A: u16 = 1;
pub const QTYPE_AAAA: u16 = 28;
pub const QTYPE_CNAME: u16 = 5;
pub const QCLASS_IN: u16 = 1;

const HEADER_LEN: usize = 12;
const FLAG_RD: u16 = 0x0100;
const FLAG_QR: u16 = 0x8000;
const FLAG_TC: u16 = 0x0200;

/// A query ready to send: the transaction id (for matching the reply) and
/// the encoded wire bytes.
pub struct EncodedQuery {
    pub id: u16,
    pub bytes: Vec<u8>,
}

/// Encode a standard recursive query with a single question.
pub fn encode_query(name: &str, qtype: u16) -> ScoutResult<EncodedQuery> {
    let id = rand::thread_rng().gen::<u16>();
    let mut buf = Vec::with_capacity(32);

    buf.write_u16::<BigEndian>(id)?;
    buf.write_u16::<BigEndian>(FLAG_RD)?;
    buf.write_u16::<BigEndian>(1)?; // QDCOUNT
    buf.write_u16::<BigEndian>(0)?; // ANCOUNT
    buf.write_u16::<BigEndian>(0)?; // NSCOUNT
    buf.write_u16::<BigEndian>(0)?; // ARCOUNT

    encode_name(name, &mut buf)?;
    buf.write_u16::<BigEndian>(qtype)?;
    buf.write_u16::<BigEndian>(QCLASS_IN)?;

    Ok(EncodedQuery { id, bytes: buf })
}

/// A decoded answer section, filtered to what the resolver cares about.
#[derive(Debug, Default)]
pub struct ParsedResponse {
    pub rcode: u8,
    pub truncated: bool,
    /// (ip literal, ttl) pairs for A/AAAA records matching the query type.
    pub addresses: Vec<(String, u32)>,
    /// CNAME targets observed, in answer order, with their TTL.
    pub cnames: Vec<(String, u32)>,
}

/// Parse a DNS response, validating the header against the expected
/// transaction id.
pub fn parse_response(data: &[u8], expected_id: u16, qtype: u16) -> ScoutResult<ParsedResponse> {
    if data.len() < HEADER_LEN {
        return Err(ScoutError::DnsMalformed("short message".into()));
    }

    let mut cursor = Cursor::new(data);
    let id = cursor.read_u16::<BigEndian>()?;
    if id != expected_id {
        return Err(ScoutError::DnsTransactionMismatch);
    }
    let flags = cursor.read_u16::<BigEndian>()?;
    if flags & FLAG_QR == 0 {
        return Err(ScoutError::DnsMalformed("missing QR flag".into()));
    }
    let truncated = flags & FLAG_TC != 0;
    let rcode = (flags & 0x000F) as u8;

    let qdcount = cursor.read_u16::<BigEndian>()?;
    let ancount = cursor.read_u16::<BigEndian>()?;
    let _nscount = cursor.read_u16::<BigEndian>()?;
    let _arcount = cursor.read_u16::<BigEndian>()?;

    let mut offset = HEADER_LEN;

    for _ in 0..qdcount {
        let (_, next) = decode_name(data, offset)?;
        offset = next + 4; // QTYPE + QCLASS
        if offset > data.len() {
            return Err(ScoutError::DnsMalformed(
                "malformed question section".into(),
            ));
        }
    }

    let mut response = ParsedResponse {
        rcode,
        truncated,
        addresses: Vec::new(),
        cnames: Vec::new(),
    };

    let mut seen_cnames = std::collections::HashSet::new();

    for _ in 0..ancount {
        let (_, next) = decode_name(data, offset)?;
        offset = next;
        if offset + 10 > data.len() {
            return Err(ScoutError::DnsMalformed("malformed answer header".into()));
        }
        let rtype = u16::from_be_bytes([data[offset], data[offset + 1]]);
        let rclass = u16::from_be_bytes([data[offset + 2], data[offset + 3]]);
        let ttl = u32::from_be_bytes([
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
            data[offset + 7],
        ]);
        let rdlength = u16::from_be_bytes([data[offset + 8], data[offset + 9]]) as usize;
        offset += 10;

        if offset + rdlength > data.len() {
            return Err(ScoutError::DnsMalformed("malformed rdata".into()));
        }
        let rdata = &data[offset..offset + rdlength];
        offset += rdlength;

        if rclass != QCLASS_IN {
            continue;
        }

        if rtype == QTYPE_CNAME {
            let (target, _) = decode_name(data, offset - rdlength)?;
            let target = target.trim_matches('.').to_ascii_lowercase();
            if seen_cnames.insert(target.clone()) {
                response.cnames.push((target, ttl));
            }
        } else if rtype == qtype {
            match (rtype, rdlength) {
                (QTYPE_A, 4) => {
                    let ip = Ipv4Addr::new(rdata[0], rdata[1], rdata[2], rdata[3]);
                    response.addresses.push((ip.to_string(), ttl));
                }
                (QTYPE_AAAA, 16) => {
                    let mut octets = [0u8; 16];
                    octets.copy_from_slice(rdata);
                    let ip = Ipv6Addr::from(octets);
                    response.addresses.push((ip.to_string(), ttl));
                }
                _ => {}
            }
        }
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, WriteBytesExt};

    fn build_a_response(id: u16, qname: &str, ip: Ipv4Addr, ttl: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u16::<BigEndian>(id).unwrap();
        buf.write_u16::<BigEndian>(0x8180).unwrap(); // QR=1, RD+RA
        buf.write_u16::<BigEndian>(1).unwrap();
        buf.write_u16::<BigEndian>(1).unwrap();
        buf.write_u16::<BigEndian>(0).unwrap();
        buf.write_u16::<BigEndian>(0).unwrap();
        encode_name(qname, &mut buf).unwrap();
        buf.write_u16::<BigEndian>(QTYPE_A).unwrap();
        buf.write_u16::<BigEndian>(QCLASS_IN).unwrap();
        // answer
        encode_name(qname, &mut buf).unwrap();
        buf.write_u16::<BigEndian>(QTYPE_A).unwrap();
        buf.write_u16::<BigEndian>(QCLASS_IN).unwrap();
        buf.write_u32::<BigEndian>(ttl).unwrap();
        buf.write_u16::<BigEndian>(4).unwrap();
        buf.extend_from_slice(&ip.octets());
        buf
    }

    #[test]
    fn parses_a_record() {
        let data = build_a_response(0x1234, "example.com", Ipv4Addr::new(1, 2, 3, 4), 300);
        let parsed = parse_response(&data, 0x1234, QTYPE_A).unwrap();
        assert_eq!(parsed.rcode, 0);
        assert!(!parsed.truncated);
        assert_eq!(parsed.addresses, vec![("1.2.3.4".to_string(), 300)]);
        assert!(parsed.cnames.is_empty());
    }

    #[test]
    fn rejects_id_mismatch() {
        let data = build_a_response(0x1234, "example.com", Ipv4Addr::new(1, 2, 3, 4), 300);
        let err = parse_response(&data, 0x4321, QTYPE_A).unwrap_err();
        assert!(matches!(err, ScoutError::DnsTransactionMismatch));
    }

    #[test]
    fn rejects_short_message() {
        let err = parse_response(&[0u8; 4], 0, QTYPE_A).unwrap_err();
        assert!(matches!(err, ScoutError::DnsMalformed(_)));
    }

    #[test]
    fn encode_decode_query_preserves_qname_and_qtype() {
        let query = encode_query("www.Example.com", QTYPE_AAAA).unwrap();
        let (name, offset) = decode_name(&query.bytes, 12).unwrap();
        assert_eq!(name, "www.example.com");
        let qtype = u16::from_be_bytes([query.bytes[offset], query.bytes[offset + 1]]);
        assert_eq!(qtype, QTYPE_AAAA);
    }
}
