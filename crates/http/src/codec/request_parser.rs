//! Request-line and header parsing over a [`Connection`].
//!
//! The parser is a small state machine driven by whole lines:
//!
//! ```text
//! AwaitingRequestLine --(non-blank line)--> ParsingRequestLine
//! ParsingRequestLine  --(no version)------> Complete
//! ParsingRequestLine  --(HTTP/M.N)--------> ParsingHeaders
//! ParsingHeaders      --(empty line)------> Complete
//! ```
//!
//! Any failure leaves the machine with a [`ParseError`], whose
//! [`status_code`](ParseError::status_code) decides the response.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::connection::Connection;
use crate::connection::line_reader::{read_header_line, read_line};
use crate::ensure;
use crate::protocol::uri::{parse_host_port, parse_request_target, validate_target};
use crate::protocol::{HttpVersion, Method, ParseError, RequestHead, parse_ranges};

#[derive(Debug)]
enum ParseState {
    AwaitingRequestLine,
    ParsingRequestLine(Vec<u8>),
    ParsingHeaders,
    Complete,
}

/// Reads one request head from `conn`.
///
/// All reads share a deadline `timeout` from now. Leading blank lines are
/// skipped. A request line without a version ends the request there.
pub async fn read_request(conn: &mut Connection, timeout: Duration) -> Result<RequestHead, ParseError> {
    let deadline = Instant::now() + timeout;
    let mut head = RequestHead::default();
    let mut state = ParseState::AwaitingRequestLine;

    loop {
        state = match state {
            ParseState::AwaitingRequestLine => {
                let line = read_line(conn, deadline).await?;
                if line.trim_ascii().is_empty() {
                    trace!(peer = %conn.peer_addr(), "skipping blank line before request");
                    ParseState::AwaitingRequestLine
                } else {
                    ParseState::ParsingRequestLine(line)
                }
            }
            ParseState::ParsingRequestLine(line) => {
                let line = String::from_utf8(line).map_err(|_| ParseError::invalid_request_line("not valid utf-8"))?;
                parse_request_line(&line, &mut head)?;
                if head.is_legacy() { ParseState::Complete } else { ParseState::ParsingHeaders }
            }
            ParseState::ParsingHeaders => {
                let line = read_header_line(conn, deadline).await?;
                if line.is_empty() {
                    ParseState::Complete
                } else {
                    let line = std::str::from_utf8(&line).map_err(|_| ParseError::invalid_header("not valid utf-8"))?;
                    let (name, value) = parse_header_line(line)?;
                    apply_header(&mut head, name, value)?;
                    ParseState::ParsingHeaders
                }
            }
            ParseState::Complete => {
                debug!(peer = %conn.peer_addr(), request = %head.request_line, "request head parsed");
                return Ok(head);
            }
        };
    }
}

/// Splits `METHOD SP URI [SP HTTP/M.N]` and fills the request-line fields
/// of `head`.
pub fn parse_request_line(line: &str, head: &mut RequestHead) -> Result<(), ParseError> {
    let mut tokens = line.split_ascii_whitespace();
    let method_token = tokens.next().ok_or_else(|| ParseError::invalid_request_line("empty request line"))?;
    let uri_token = tokens.next().ok_or_else(|| ParseError::invalid_request_line("missing request target"))?;
    let version = match tokens.next() {
        Some(token) => HttpVersion::parse(token).ok_or_else(|| ParseError::InvalidVersion(token.to_string()))?,
        None => HttpVersion::HTTP_09,
    };
    ensure!(tokens.next().is_none(), ParseError::invalid_request_line("unexpected token after version"));

    let method = Method::from_token(method_token);
    let target = parse_request_target(uri_token, method)?;
    validate_target(&target.path, method)?;

    head.method = method;
    head.request_line = line.to_string();
    head.uri = target.path;
    head.query = target.query;
    if target.host.is_some() {
        head.host = target.host;
        head.port = target.port;
    }
    head.version = version;
    head.keep_alive = version.is_at_least_11();
    Ok(())
}

/// Splits a header line at its first colon. The name is lower-cased and must
/// be non-empty without whitespace; the value is trimmed.
pub fn parse_header_line(line: &str) -> Result<(String, String), ParseError> {
    let (name, value) = line.split_once(':').ok_or_else(|| ParseError::invalid_header(format!("missing ':' in {line:?}")))?;
    ensure!(!name.is_empty(), ParseError::invalid_header("empty field name"));
    ensure!(!name.bytes().any(|b| b.is_ascii_whitespace()), ParseError::invalid_header(format!("whitespace in field name {name:?}")));

    Ok((name.to_ascii_lowercase(), value.trim().to_string()))
}

/// Stores a header and applies the side effects of the fields the engine
/// understands.
pub fn apply_header(head: &mut RequestHead, name: String, value: String) -> Result<(), ParseError> {
    match name.as_str() {
        "connection" => {
            head.keep_alive = value.split(',').any(|token| token.trim().eq_ignore_ascii_case("keep-alive"));
        }
        "host" => {
            if head.host.is_none() {
                let (host, port) = parse_host_port(&value)?;
                head.host = Some(host);
                head.port = port;
            }
        }
        "from" => head.from = Some(value.clone()),
        "user-agent" => head.user_agent = Some(value.clone()),
        "referer" => head.referer = Some(value.clone()),
        "expect" => {
            if value.eq_ignore_ascii_case("100-continue") {
                head.continue_required = true;
            }
        }
        "range" => {
            if let Some(specs) = value.get(..6).filter(|prefix| prefix.eq_ignore_ascii_case("bytes=")).map(|_| &value[6..]) {
                head.ranges.extend(parse_ranges(specs)?);
            }
        }
        "cookie" => {
            head.cookies.extend(value.split(';').map(str::trim).filter(|cookie| !cookie.is_empty()).map(str::to_string));
        }
        "content-length" => {
            // the body length decides where the next request starts
            ensure!(!value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()), ParseError::invalid_header(format!("Content-Length {value:?}")));
            let length: u64 = value.parse().map_err(|_| ParseError::invalid_header(format!("Content-Length {value:?} out of range")))?;
            if let Some(earlier) = head.content_length() {
                ensure!(earlier == length, ParseError::invalid_header("conflicting Content-Length"));
                return Ok(());
            }
        }
        _ => {}
    }

    head.headers.add(name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use indoc::indoc;
    use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

    use super::*;
    use crate::protocol::RangeSpec;

    async fn parse_with(raw: &[u8], timeout: Duration) -> (Result<RequestHead, ParseError>, DuplexStream, Connection) {
        let (mut client, server) = duplex(64 * 1024);
        client.write_all(raw).await.unwrap();
        let mut conn = Connection::new(server, "10.0.0.1:5000".parse().unwrap());
        let result = read_request(&mut conn, timeout).await;
        (result, client, conn)
    }

    async fn parse(raw: &str) -> Result<RequestHead, ParseError> {
        parse_with(raw.as_bytes(), Duration::from_secs(1)).await.0
    }

    #[tokio::test]
    async fn keep_alive_get_with_encoded_path() {
        let head = parse("GET /foo%20bar?x=1 HTTP/1.1\r\nHost: h\r\nConnection: keep-alive\r\n\r\n").await.unwrap();

        assert_eq!(head.method(), Method::Get);
        assert_eq!(head.uri(), "/foo bar");
        assert_eq!(head.query(), Some("x=1"));
        assert_eq!(head.version(), HttpVersion::HTTP_11);
        assert!(head.keep_alive());
        assert_eq!(head.host(), Some("h"));
        assert_eq!(head.port(), 80);
        assert_eq!(head.request_line(), "GET /foo%20bar?x=1 HTTP/1.1");
    }

    #[tokio::test]
    async fn request_line_tokens_for_every_method() {
        for method in ["GET", "HEAD", "POST", "PUT", "DELETE", "TRACE", "OPTIONS"] {
            let head = parse(&format!("{method} /a/b.html HTTP/1.0\r\n\r\n")).await.unwrap();
            assert_eq!(head.method().as_str(), method);
            assert_eq!(head.uri(), "/a/b.html");
            assert_eq!(head.version(), HttpVersion::HTTP_10);
            assert!(!head.keep_alive());
        }

        let head = parse("BREW /pot HTTP/1.1\r\n\r\n").await.unwrap();
        assert_eq!(head.method(), Method::Unknown);
    }

    #[tokio::test]
    async fn headers_and_side_effects() {
        let raw = indoc! {"
            GET /index.html HTTP/1.1\r
            Host: example.com:8080\r
            User-Agent: curl/7.79.1\r
            From: someone@example.com\r
            Referer: http://example.com/\r
            Cookie: a=1; b=2;;  c=3\r
            Range: bytes=0-99,-20\r
            Expect: 100-continue\r
            Accept: */*\r
            X-Dup: 1\r
            x-dup: 2\r
            \r
        "};
        let head = parse(raw).await.unwrap();

        assert_eq!(head.host(), Some("example.com"));
        assert_eq!(head.port(), 8080);
        assert_eq!(head.user_agent(), Some("curl/7.79.1"));
        assert_eq!(head.from_header(), Some("someone@example.com"));
        assert_eq!(head.referer(), Some("http://example.com/"));
        assert_eq!(head.cookies(), ["a=1", "b=2", "c=3"]);
        assert_eq!(head.ranges(), [RangeSpec::From { first: 0, last: Some(99) }, RangeSpec::Suffix(20)]);
        assert!(head.continue_required());
        assert!(head.keep_alive());
        assert_eq!(head.header("ACCEPT"), Some("*/*"));
        assert_eq!(head.headers().get_all("x-dup").collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(head.headers().len(), 10);
    }

    #[tokio::test]
    async fn connection_close_clears_keep_alive() {
        let head = parse("GET / HTTP/1.1\r\nConnection: close\r\n\r\n").await.unwrap();
        assert!(!head.keep_alive());

        let head = parse("GET / HTTP/1.0\r\nConnection: Keep-Alive\r\n\r\n").await.unwrap();
        assert!(head.keep_alive());
    }

    #[tokio::test]
    async fn folded_header_value() {
        let head = parse("GET / HTTP/1.1\r\nX-Folded: one\r\n two\r\n\tthree\r\n\r\n").await.unwrap();
        assert_eq!(head.header("x-folded"), Some("one two three"));
    }

    #[tokio::test]
    async fn leading_blank_lines_are_skipped() {
        let head = parse("\r\n\r\n\nGET /x HTTP/1.1\r\n\r\n").await.unwrap();
        assert_eq!(head.uri(), "/x");
    }

    #[tokio::test]
    async fn legacy_request_has_no_headers() {
        let (result, _client, conn) = parse_with(b"GET /old\r\nNot: a header\r\n", Duration::from_secs(1)).await;
        let head = result.unwrap();

        assert!(head.is_legacy());
        assert_eq!(head.uri(), "/old");
        assert!(head.headers().is_empty());
        assert_eq!(conn.buffered(), b"Not: a header\r\n");
    }

    #[tokio::test]
    async fn absolute_form_target() {
        let head = parse("GET http://www.example.com:81/a?b HTTP/1.1\r\nHost: ignored:99\r\n\r\n").await.unwrap();
        assert_eq!(head.host(), Some("www.example.com"));
        assert_eq!(head.port(), 81);
        assert_eq!(head.uri(), "/a");
        assert_eq!(head.query(), Some("b"));
    }

    #[tokio::test]
    async fn asterisk_target() {
        let head = parse("OPTIONS * HTTP/1.1\r\n\r\n").await.unwrap();
        assert_eq!(head.uri(), "*");

        let err = parse("GET * HTTP/1.1\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedUriForm(_)));
        assert_eq!(err.status_code(), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn malformed_requests_are_400() {
        let cases = [
            "GET /a%zz HTTP/1.1\r\n\r\n",
            "GET /.hidden HTTP/1.1\r\n\r\n",
            "GET /../etc/passwd HTTP/1.1\r\n\r\n",
            "GET relative HTTP/1.1\r\n\r\n",
            "GET / HTTX/1.1\r\n\r\n",
            "GET / HTTP/1.1 extra\r\n\r\n",
            "GET\r\n\r\n",
            "GET / HTTP/1.1\r\nNoColon\r\n\r\n",
            "GET / HTTP/1.1\r\n: empty-name\r\n\r\n",
            "GET / HTTP/1.1\r\nBad Name: x\r\n\r\n",
            "GET / HTTP/1.1\r\nRange: bytes=9-1\r\n\r\n",
            "GET / HTTP/1.1\r\nHost: h:0\r\n\r\n",
            "GET / HTTP/1.1\r\nHost: h:70000\r\n\r\n",
            "POST / HTTP/1.1\r\nContent-Length: 2x\r\n\r\n",
            "POST / HTTP/1.1\r\nContent-Length: -1\r\n\r\n",
            "POST / HTTP/1.1\r\nContent-Length: \r\n\r\n",
            "POST / HTTP/1.1\r\nContent-Length: 99999999999999999999999\r\n\r\n",
            "POST / HTTP/1.1\r\nContent-Length: 3\r\nContent-Length: 30\r\n\r\n",
        ];

        for raw in cases {
            let err = parse(raw).await.unwrap_err();
            assert_eq!(err.status_code(), Some(StatusCode::BAD_REQUEST), "{raw:?} gave {err}");
        }
    }

    #[tokio::test]
    async fn repeated_content_length_is_kept_once() {
        let head = parse("POST / HTTP/1.1\r\nContent-Length: 3\r\nContent-Length: 3\r\n\r\n").await.unwrap();
        assert_eq!(head.content_length(), Some(3));
        assert_eq!(head.headers().get_all("content-length").count(), 1);
    }

    #[tokio::test]
    async fn range_without_bytes_unit_is_ignored() {
        let head = parse("GET / HTTP/1.1\r\nRange: items=1-2\r\n\r\n").await.unwrap();
        assert!(head.ranges().is_empty());
        assert_eq!(head.header("range"), Some("items=1-2"));
    }

    #[tokio::test]
    async fn non_utf8_lines_are_400() {
        let (result, _client, _conn) = parse_with(b"GET /\xff HTTP/1.1\r\n\r\n", Duration::from_secs(1)).await;
        assert_eq!(result.unwrap_err().status_code(), Some(StatusCode::BAD_REQUEST));

        let (result, _client, _conn) = parse_with(b"GET / HTTP/1.1\r\nX: \xfe\r\n\r\n", Duration::from_secs(1)).await;
        assert_eq!(result.unwrap_err().status_code(), Some(StatusCode::BAD_REQUEST));

        let (result, _client, _conn) = parse_with(b"GET /%ff HTTP/1.1\r\n\r\n", Duration::from_secs(1)).await;
        assert_eq!(result.unwrap_err().status_code(), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn silence_times_out_with_408() {
        let (result, _client, _conn) = parse_with(b"", Duration::from_millis(30)).await;
        let err = result.unwrap_err();
        assert!(matches!(err, ParseError::Timeout));
        assert_eq!(err.status_code(), Some(StatusCode::REQUEST_TIMEOUT));
    }

    #[tokio::test]
    async fn stalled_headers_time_out() {
        let (result, _client, _conn) = parse_with(b"GET / HTTP/1.1\r\nHost: h\r\n", Duration::from_millis(30)).await;
        assert_eq!(result.unwrap_err().status_code(), Some(StatusCode::REQUEST_TIMEOUT));
    }

    #[tokio::test]
    async fn eof_is_a_connection_failure() {
        let (mut client, server) = duplex(1024);
        client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
        drop(client);

        let mut conn = Connection::new(server, "10.0.0.1:5000".parse().unwrap());
        let err = read_request(&mut conn, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ParseError::Connection { .. }));
        assert_eq!(err.status_code(), None);
    }

    #[tokio::test]
    async fn pipelined_requests_stay_buffered() {
        let (result, _client, mut conn) = parse_with(b"GET /1 HTTP/1.1\r\n\r\nGET /2 HTTP/1.1\r\n\r\n", Duration::from_secs(1)).await;
        assert_eq!(result.unwrap().uri(), "/1");

        let second = read_request(&mut conn, Duration::from_secs(1)).await.unwrap();
        assert_eq!(second.uri(), "/2");
    }

    #[test]
    fn header_line_splitting() {
        assert_eq!(parse_header_line("Content-Type:  text/html ").unwrap(), ("content-type".to_string(), "text/html".to_string()));
        assert_eq!(parse_header_line("X-Time: 12:30:00").unwrap(), ("x-time".to_string(), "12:30:00".to_string()));
        assert_eq!(parse_header_line("X-Empty:").unwrap(), ("x-empty".to_string(), String::new()));
        assert!(parse_header_line("no colon").is_err());
    }
}
