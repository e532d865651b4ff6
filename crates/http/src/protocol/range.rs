//! `Range: bytes=...` request header values.

use std::str::FromStr;

use crate::protocol::ParseError;

/// One byte-range spec out of a `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `first-` or `first-last`, both inclusive.
    From { first: u64, last: Option<u64> },
    /// `-n`: the final `n` bytes.
    Suffix(u64),
}

impl RangeSpec {
    /// Resolves the range against a representation of `size` bytes into an
    /// inclusive `(start, end)` interval.
    ///
    /// Returns `None` when the range cannot be satisfied.
    pub fn resolve(&self, size: u64) -> Option<(u64, u64)> {
        if size == 0 {
            return None;
        }

        match *self {
            RangeSpec::Suffix(0) => None,
            RangeSpec::Suffix(n) => Some((size.saturating_sub(n), size - 1)),
            RangeSpec::From { first, .. } if first >= size => None,
            RangeSpec::From { first, last } => Some((first, last.map_or(size - 1, |last| last.min(size - 1)))),
        }
    }
}

impl FromStr for RangeSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (first, last) = s.trim().split_once('-').ok_or_else(|| ParseError::invalid_range(format!("missing '-' in {s:?}")))?;

        if first.is_empty() {
            return parse_offset(last).map(RangeSpec::Suffix);
        }

        let first = parse_offset(first)?;
        if last.is_empty() {
            return Ok(RangeSpec::From { first, last: None });
        }

        let last = parse_offset(last)?;
        if last < first {
            return Err(ParseError::invalid_range(format!("last byte {last} before first byte {first}")));
        }
        Ok(RangeSpec::From { first, last: Some(last) })
    }
}

fn parse_offset(digits: &str) -> Result<u64, ParseError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::invalid_range(format!("bad offset {digits:?}")));
    }
    digits.parse().map_err(|e| ParseError::invalid_range(format!("offset {digits:?}: {e}")))
}

/// Parses the part of a `Range` value after `bytes=`: comma-separated specs,
/// empty list elements ignored.
pub fn parse_ranges(value: &str) -> Result<Vec<RangeSpec>, ParseError> {
    let specs = value.split(',').map(str::trim).filter(|item| !item.is_empty()).map(RangeSpec::from_str).collect::<Result<Vec<_>, _>>()?;

    if specs.is_empty() {
        return Err(ParseError::invalid_range("empty range set"));
    }
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_forms() {
        assert_eq!("0-499".parse::<RangeSpec>().unwrap(), RangeSpec::From { first: 0, last: Some(499) });
        assert_eq!("500-".parse::<RangeSpec>().unwrap(), RangeSpec::From { first: 500, last: None });
        assert_eq!("-200".parse::<RangeSpec>().unwrap(), RangeSpec::Suffix(200));
    }

    #[test]
    fn parse_invalid() {
        assert!("".parse::<RangeSpec>().is_err());
        assert!("abc".parse::<RangeSpec>().is_err());
        assert!("5-2".parse::<RangeSpec>().is_err());
        assert!("-".parse::<RangeSpec>().is_err());
        assert!("1-x".parse::<RangeSpec>().is_err());
        assert!(parse_ranges(" , ").is_err());
    }

    #[test]
    fn parse_list() {
        let specs = parse_ranges("0-0, -1,,10-").unwrap();
        assert_eq!(specs, vec![RangeSpec::From { first: 0, last: Some(0) }, RangeSpec::Suffix(1), RangeSpec::From { first: 10, last: None }]);
    }

    #[test]
    fn resolve_against_size() {
        assert_eq!(RangeSpec::From { first: 0, last: Some(499) }.resolve(1000), Some((0, 499)));
        assert_eq!(RangeSpec::From { first: 500, last: None }.resolve(1000), Some((500, 999)));
        assert_eq!(RangeSpec::From { first: 900, last: Some(5000) }.resolve(1000), Some((900, 999)));
        assert_eq!(RangeSpec::Suffix(200).resolve(1000), Some((800, 999)));
        assert_eq!(RangeSpec::Suffix(5000).resolve(1000), Some((0, 999)));
        assert_eq!(RangeSpec::From { first: 1000, last: None }.resolve(1000), None);
        assert_eq!(RangeSpec::Suffix(0).resolve(1000), None);
        assert_eq!(RangeSpec::Suffix(10).resolve(0), None);
    }
}
