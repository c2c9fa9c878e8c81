//! Header framing of the control stream.
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;

use crate::consts::MAX_HEADER_LEN;
use crate::error::Error;
use crate::error::Result;

/// Read one header terminated by `\n` or `\0`, without the terminator.
///
/// Bytes after the terminator stay in the reader, a transfer payload is read from
/// there. Returns `Ok(None)` on a clean EOF. A trailing header without terminator at
/// EOF is still returned.
pub async fn read_header<R>(reader: &mut R) -> Result<Option<String>>
where R: AsyncBufRead + Unpin {
    let mut header = Vec::new();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }
        match available.iter().position(|b| *b == b'\n' || *b == b'\0') {
            Some(end) => {
                header.extend_from_slice(&available[..end]);
                reader.consume(end + 1);
                return decode(header).map(Some);
            }
            None => {
                let len = available.len();
                header.extend_from_slice(available);
                reader.consume(len);
            }
        }
        if header.len() > MAX_HEADER_LEN {
            return Err(Error::HeaderTooLong(MAX_HEADER_LEN));
        }
    }
    if header.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    decode(header).map(Some)
}

fn decode(header: Vec<u8>) -> Result<String> {
    let mut line = String::from_utf8(header)?;
    if line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}
