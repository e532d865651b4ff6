//! Request-target handling: query split, percent-decoding, absolute-form
//! normalization and path canonicalization.

use crate::ensure;
use crate::protocol::{Method, ParseError};

/// Port assumed when neither the request target nor `Host` names one.
pub const DEFAULT_PORT: u16 = 80;

/// The request target after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Host from an absolute-form target.
    pub host: Option<String>,
    pub port: u16,
    /// Percent-decoded path, or `*`.
    pub path: String,
    /// Raw query, without the `?`.
    pub query: Option<String>,
}

/// Splits and normalizes the URI token of a request line.
///
/// The query is split off at the first `?` and kept raw; only the path is
/// percent-decoded. `http://host[:port]/path` is reduced to its path with
/// the authority extracted.
pub fn parse_request_target(raw: &str, method: Method) -> Result<RequestTarget, ParseError> {
    let (raw_path, query) = match raw.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (raw, None),
    };

    let (host, port, raw_path) = if raw_path.starts_with('/') || raw_path == "*" {
        (None, DEFAULT_PORT, raw_path)
    } else if let Some(authority_and_path) = strip_prefix_ignore_ascii_case(raw_path, "http://") {
        let (authority, path) = match authority_and_path.find('/') {
            Some(slash) => authority_and_path.split_at(slash),
            None if method == Method::Options => (authority_and_path, "*"),
            None => (authority_and_path, "/"),
        };
        let (host, port) = parse_host_port(authority)?;
        (Some(host), port, path)
    } else {
        return Err(ParseError::invalid_uri(format!("unsupported request target {raw:?}")));
    };

    let decoded = percent_decode(raw_path)?;
    let path = String::from_utf8(decoded).map_err(|_| ParseError::invalid_uri("decoded path is not valid utf-8"))?;

    Ok(RequestTarget { host, port, path, query })
}

fn strip_prefix_ignore_ascii_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// Decodes `%XX` escapes (either hex case). Any `%` not followed by two hex
/// digits is an error.
pub fn percent_decode(input: &str) -> Result<Vec<u8>, ParseError> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = bytes.get(i + 1).copied().and_then(hex_value);
            let lo = bytes.get(i + 2).copied().and_then(hex_value);
            match (hi, lo) {
                (Some(hi), Some(lo)) => decoded.push((hi << 4) | lo),
                _ => return Err(ParseError::invalid_uri(format!("malformed escape at offset {i}"))),
            }
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    Ok(decoded)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Parses `host[:port]`, defaulting the port to 80.
///
/// Bracketed IPv6 literals keep their brackets. The port must be decimal and
/// within `1..=65535`.
pub fn parse_host_port(authority: &str) -> Result<(String, u16), ParseError> {
    let (host, port) = if authority.starts_with('[') {
        let close = authority.find(']').ok_or_else(|| ParseError::invalid_uri(format!("unterminated ipv6 literal {authority:?}")))?;
        let (host, rest) = authority.split_at(close + 1);
        match rest {
            "" => (host, None),
            _ => (host, Some(rest.strip_prefix(':').ok_or_else(|| ParseError::invalid_uri(format!("bad authority {authority:?}")))?)),
        }
    } else {
        match authority.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    let port = match port {
        None => DEFAULT_PORT,
        Some(digits) => {
            ensure!(!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()), ParseError::invalid_uri(format!("bad port {digits:?}")));
            match digits.parse::<u16>() {
                Ok(port) if port != 0 => port,
                _ => return Err(ParseError::invalid_uri(format!("port out of range {digits:?}"))),
            }
        }
    };

    Ok((host.to_string(), port))
}

/// Checks the decoded target of a request: a bare `*` only for OPTIONS,
/// anything else must be a path that passes [`canonicalize_path`].
pub fn validate_target(path: &str, method: Method) -> Result<(), ParseError> {
    if path == "*" {
        ensure!(method == Method::Options, ParseError::UnsupportedUriForm(format!("'*' with {method}")));
        return Ok(());
    }

    ensure!(canonicalize_path(path).is_some(), ParseError::invalid_uri(format!("path {path:?} rejected")));
    Ok(())
}

/// Resolves `.` and `..` segments of an absolute path.
///
/// Returns `None` when the path does not start with `/`, contains `*`, has an
/// empty segment before its end, has a segment other than `.`/`..` starting
/// with `.`, or climbs above the root.
pub fn canonicalize_path(path: &str) -> Option<String> {
    let rest = path.strip_prefix('/')?;
    if path.contains('*') {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    let mut parts = rest.split('/').peekable();
    while let Some(segment) = parts.next() {
        match segment {
            "" if parts.peek().is_none() => {}
            "" => return None,
            "." => {}
            ".." => {
                segments.pop()?;
            }
            hidden if hidden.starts_with('.') => return None,
            name => segments.push(name),
        }
    }

    let mut canonical = String::with_capacity(path.len());
    canonical.push('/');
    canonical.push_str(&segments.join("/"));
    if path.ends_with('/') && !segments.is_empty() {
        canonical.push('/');
    }
    Some(canonical)
}

/// Whether `path` passes [`canonicalize_path`].
pub fn is_valid_path(path: &str) -> bool {
    canonicalize_path(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_decode_every_byte() {
        for b in 0..=255u8 {
            if b == b'/' {
                continue;
            }
            let upper = format!("/%{b:02X}");
            let lower = format!("/%{b:02x}");
            assert_eq!(percent_decode(&upper).unwrap(), vec![b'/', b]);
            assert_eq!(percent_decode(&lower).unwrap(), vec![b'/', b]);
        }
    }

    #[test]
    fn percent_decode_malformed() {
        assert!(percent_decode("/a%").is_err());
        assert!(percent_decode("/a%2").is_err());
        assert!(percent_decode("/a%zz").is_err());
        assert!(percent_decode("/a%g1b").is_err());
        assert_eq!(percent_decode("/foo%20bar").unwrap(), b"/foo bar");
    }

    #[test]
    fn split_query_before_decoding() {
        let target = parse_request_target("/foo%20bar?x=1&y=%41", Method::Get).unwrap();
        assert_eq!(target.path, "/foo bar");
        assert_eq!(target.query.as_deref(), Some("x=1&y=%41"));
        assert_eq!(target.host, None);
        assert_eq!(target.port, 80);

        let target = parse_request_target("/a%3Fb", Method::Get).unwrap();
        assert_eq!(target.path, "/a?b");
        assert_eq!(target.query, None);
    }

    #[test]
    fn absolute_form() {
        let target = parse_request_target("http://www.example.com:8080/file.cgi?parm", Method::Get).unwrap();
        assert_eq!(target.host.as_deref(), Some("www.example.com"));
        assert_eq!(target.port, 8080);
        assert_eq!(target.path, "/file.cgi");
        assert_eq!(target.query.as_deref(), Some("parm"));

        let target = parse_request_target("HTTP://example.com", Method::Get).unwrap();
        assert_eq!(target.host.as_deref(), Some("example.com"));
        assert_eq!(target.port, 80);
        assert_eq!(target.path, "/");

        let target = parse_request_target("http://example.com", Method::Options).unwrap();
        assert_eq!(target.path, "*");

        assert!(parse_request_target("http://example.com:0/", Method::Get).is_err());
        assert!(parse_request_target("http://example.com:99999/", Method::Get).is_err());
        assert!(parse_request_target("ftp://example.com/", Method::Get).is_err());
        assert!(parse_request_target("relative/path", Method::Get).is_err());
    }

    #[test]
    fn host_port() {
        assert_eq!(parse_host_port("h").unwrap(), ("h".to_string(), 80));
        assert_eq!(parse_host_port("h:81").unwrap(), ("h".to_string(), 81));
        assert_eq!(parse_host_port("[::1]:8080").unwrap(), ("[::1]".to_string(), 8080));
        assert_eq!(parse_host_port("[::1]").unwrap(), ("[::1]".to_string(), 80));
        assert!(parse_host_port("h:").is_err());
        assert!(parse_host_port("h:8a").is_err());
        assert!(parse_host_port("[::1").is_err());
    }

    #[test]
    fn asterisk_only_for_options() {
        assert!(validate_target("*", Method::Options).is_ok());
        assert!(matches!(validate_target("*", Method::Get), Err(ParseError::UnsupportedUriForm(_))));
        assert!(validate_target("/a*b", Method::Get).is_err());
    }

    #[test]
    fn canonical_paths() {
        assert_eq!(canonicalize_path("/a/../b").as_deref(), Some("/b"));
        assert_eq!(canonicalize_path("/a/./b").as_deref(), Some("/a/b"));
        assert_eq!(canonicalize_path("/b").as_deref(), Some("/b"));
        assert_eq!(canonicalize_path("/").as_deref(), Some("/"));
        assert_eq!(canonicalize_path("/a/..").as_deref(), Some("/"));
        assert_eq!(canonicalize_path("/.").as_deref(), Some("/"));
        assert_eq!(canonicalize_path("/dir/").as_deref(), Some("/dir/"));
    }

    #[test]
    fn rejected_paths() {
        assert!(!is_valid_path("/.hidden"));
        assert!(!is_valid_path("/a/.git/config"));
        assert!(!is_valid_path("/a/..b"));
        assert!(!is_valid_path("/.."));
        assert!(!is_valid_path("/a/../../b"));
        assert!(!is_valid_path("/a//b"));
        assert!(!is_valid_path("a/b"));
        assert!(!is_valid_path("/a*"));
        assert!(!is_valid_path(""));
    }

    #[test]
    fn decoded_traversal_is_rejected() {
        let target = parse_request_target("/a/%2e%2e/%2e%2e/etc", Method::Get).unwrap();
        assert_eq!(target.path, "/a/../../etc");
        assert!(validate_target(&target.path, Method::Get).is_err());
    }
}
