//! Length-prefixed self-delimiting binary framing for segment files.
//!
//! Each frame is `[8-byte little-endian length][bincode-encoded payload]`.
//! The segment header is written as the first frame, followed by one frame
//! per stored record, in file order. This framing is not wire-compatible
//! with any other serialization this data may have previously used.

use serde::{Serialize, de::DeserializeOwned};
use std::io::{self, Read, Write};

const LEN_WIDTH: usize = 8;
const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

pub fn write_frame<W: Write, T: Serialize>(w: &mut W, item: &T) -> Result<(), bincode::error::EncodeError> {
    let payload = bincode::serde::encode_to_vec(item, BINCODE_CONFIG)?;
    let len = payload.len() as u64;
    w.write_all(&len.to_le_bytes())
        .map_err(|e| bincode::error::EncodeError::Io {
            inner: e,
            index: 0,
        })?;
    w.write_all(&payload)
        .map_err(|e| bincode::error::EncodeError::Io {
            inner: e,
            index: 0,
        })?;
    Ok(())
}

/// Reads one frame. Returns `Ok(None)` on a clean end-of-stream (no bytes
/// read at all), so callers can loop until exhaustion without special-casing
/// the final frame.
pub fn read_frame<R: Read, T: DeserializeOwned>(
    r: &mut R,
) -> Result<Option<T>, bincode::error::DecodeError> {
    let mut len_bytes = [0u8; LEN_WIDTH];
    match read_exact_or_eof(r, &mut len_bytes)? {
        false => return Ok(None),
        true => {}
    }
    let len = u64::from_le_bytes(len_bytes) as usize;
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload)
        .map_err(|e| bincode::error::DecodeError::Io {
            inner: e,
            additional: len,
        })?;
    let (item, _) = bincode::serde::decode_from_slice(&payload, BINCODE_CONFIG)?;
    Ok(Some(item))
}

/// Like `Read::read_exact`, but returns `Ok(false)` instead of erroring when
/// zero bytes are available before the buffer is filled at all (a clean
/// EOF), and a hard I/O error for a short/partial read.
fn read_exact_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<bool, bincode::error::DecodeError> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(bincode::error::DecodeError::Io {
                    inner: io::Error::new(io::ErrorKind::UnexpectedEof, "truncated frame"),
                    additional: buf.len() - filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(bincode::error::DecodeError::Io {
                    inner: e,
                    additional: buf.len() - filled,
                });
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Cursor;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        a: u32,
        b: Vec<u8>,
    }

    #[test]
    fn round_trips_a_sequence_of_frames() {
        let items = vec![
            Item { a: 1, b: vec![1, 2, 3] },
            Item { a: 2, b: vec![] },
            Item { a: 3, b: vec![9; 200] },
        ];

        let mut buf = Vec::new();
        for item in &items {
            write_frame(&mut buf, item).unwrap();
        }

        let mut cursor = Cursor::new(buf);
        let mut decoded = Vec::new();
        while let Some(item) = read_frame::<_, Item>(&mut cursor).unwrap() {
            decoded.push(item);
        }
        assert_eq!(decoded, items);
    }

    #[test]
    fn empty_stream_yields_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert_eq!(read_frame::<_, Item>(&mut cursor).unwrap(), None);
    }
}
