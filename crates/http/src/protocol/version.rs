use std::fmt;

/// Protocol version taken from the `HTTP/<major>.<minor>` request-line token.
///
/// Ordering compares the major number first, then the minor one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HttpVersion {
    pub major: u16,
    pub minor: u16,
}

impl HttpVersion {
    /// A request line without a version token.
    pub const HTTP_09: HttpVersion = HttpVersion { major: 0, minor: 9 };
    pub const HTTP_10: HttpVersion = HttpVersion { major: 1, minor: 0 };
    pub const HTTP_11: HttpVersion = HttpVersion { major: 1, minor: 1 };

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Parses `HTTP/<digits>.<digits>`, returning `None` for anything else.
    pub fn parse(token: &str) -> Option<Self> {
        let numbers = token.strip_prefix("HTTP/")?;
        let (major, minor) = numbers.split_once('.')?;
        Some(Self { major: parse_number(major)?, minor: parse_number(minor)? })
    }

    /// Whether the version implies persistent connections by default.
    pub fn is_at_least_11(&self) -> bool {
        *self >= Self::HTTP_11
    }
}

fn parse_number(digits: &str) -> Option<u16> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl Default for HttpVersion {
    fn default() -> Self {
        Self::HTTP_09
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}
