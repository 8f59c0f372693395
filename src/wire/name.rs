//! DNS name encoding/decoding, including compression-pointer handling: a
//! hard iteration cap, remembering the first pointer taken so the caller's
//! "next offset" lands right after it regardless of where decoding jumped,
//! and rejection of reserved length-byte bits.
use crate::error::{ScoutError, ScoutResult};

const MAX_NAME_BYTES: usize = 255;
const POINTER_ITERATION_CAP: usize = 256;

/// Length-prefixed labels, each <= 63 bytes, terminated by a zero byte.
/// `name` must already be normalized (lowercase, dot-trimmed).
pub fn encode_name(name: &str, buf: &mut Vec<u8>) -> ScoutResult<()> {
    let mut total = 0usize;
    for label in name.split('.') {
        if label.len() > 63 {
            return Err(ScoutError::validation("dns label too long"));
        }
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
        total += 1 + label.len();
    }
    buf.push(0);
    if total + 1 > MAX_NAME_BYTES {
        return Err(ScoutError::validation("dns name too long"));
    }
    Ok(())
}

/// Decode a (possibly compressed) name starting at `start` within the full
/// message `data`. Returns the lowercased, dot-joined name (without a
/// trailing dot) and the offset of the byte immediately following the
/// name *as encountered at `start`* — i.e. after the terminating zero byte,
/// or after the two-byte pointer if one was taken at the top level.
pub fn decode_name(data: &[u8], start: usize) -> ScoutResult<(String, usize)> {
    let mut labels: Vec<String> = Vec::new();
    let mut cursor = start;
    let mut resume_at: Option<usize> = None;
    let mut iterations = 0usize;

    loop {
        iterations += 1;
        if iterations > POINTER_ITERATION_CAP {
            return Err(ScoutError::DnsMalformed(
                "name compression loop detected".into(),
            ));
        }
        if cursor >= data.len() {
            return Err(ScoutError::DnsMalformed(
                "name exceeds message length".into(),
            ));
        }

        let len_byte = data[cursor];
        if len_byte == 0 {
            if resume_at.is_none() {
                resume_at = Some(cursor + 1);
            }
            break;
        }

        match len_byte & 0xC0 {
            0x00 => {
                let size = len_byte as usize;
                let label_start = cursor + 1;
                let label_end = label_start + size;
                if label_end > data.len() {
                    return Err(ScoutError::DnsMalformed("truncated label".into()));
                }
                let label = std::str::from_utf8(&data[label_start..label_end])
                    .map_err(|e| ScoutError::DnsMalformed(format!("non-utf8 label: {e}")))?;
                labels.push(label.to_ascii_lowercase());
                cursor = label_end;
            }
            0xC0 => {
                if cursor + 1 >= data.len() {
                    return Err(ScoutError::DnsMalformed(
                        "truncated compression pointer".into(),
                    ));
                }
                let pointer =
                    (((data[cursor] as u16) & 0x3F) << 8) | (data[cursor + 1] as u16);
                if resume_at.is_none() {
                    resume_at = Some(cursor + 2);
                }
                cursor = pointer as usize;
            }
            _ => {
                return Err(ScoutError::DnsMalformed(
                    "reserved label-length bits set".into(),
                ));
            }
        }
    }

    let joined = labels.join(".");
    if joined.len() > MAX_NAME_BYTES {
        return Err(ScoutError::DnsMalformed("oversized name".into()));
    }
    Ok((joined, resume_at.unwrap_or(cursor)))
}
