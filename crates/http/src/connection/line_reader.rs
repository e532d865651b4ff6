//! CRLF/LF line assembly on top of a [`Connection`]'s read buffer.
//!
//! Both readers share one deadline across all the reads it takes to complete
//! a line, so a slow peer cannot stretch the budget by trickling bytes.

use tokio::time::Instant;

use crate::connection::Connection;
use crate::protocol::ConnError;

/// Returns the next line without its terminator. A trailing CR is dropped.
pub async fn read_line(conn: &mut Connection, deadline: Instant) -> Result<Vec<u8>, ConnError> {
    loop {
        if let Some(end) = conn.buffered().iter().position(|&b| b == b'\n') {
            let line = strip_cr(&conn.buffered()[..end]).to_vec();
            conn.consume(end + 1);
            return Ok(line);
        }
        conn.read_until(deadline).await?;
    }
}

/// Like [`read_line`], but folds continuation lines (starting with space or
/// tab) into the current one, joined by a single space.
///
/// An empty line is returned as is; it ends a header block.
pub async fn read_header_line(conn: &mut Connection, deadline: Instant) -> Result<Vec<u8>, ConnError> {
    let mut line = read_line(conn, deadline).await?;
    if line.is_empty() {
        return Ok(line);
    }

    loop {
        let next = loop {
            if let Some(&b) = conn.buffered().first() {
                break b;
            }
            conn.read_until(deadline).await?;
        };

        if next != b' ' && next != b'\t' {
            return Ok(line);
        }

        let continuation = read_line(conn, deadline).await?;
        let trimmed_len = line.trim_ascii_end().len();
        line.truncate(trimmed_len);
        line.push(b' ');
        line.extend_from_slice(continuation.trim_ascii());
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}
