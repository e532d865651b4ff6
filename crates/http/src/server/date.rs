//! `Date` header values.
//!
//! Formatting an IMF-fixdate for every response is wasted work when the value
//! only changes once a second, so the [`DateService`] keeps the last value and
//! refreshes it lazily once it has aged past [`REFRESH_INTERVAL`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;

/// How long a formatted date is reused.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(800);

#[derive(Debug)]
struct CachedDate {
    formatted_at: Instant,
    value: Arc<str>,
}

impl CachedDate {
    fn now() -> Self {
        Self { formatted_at: Instant::now(), value: Arc::from(http_date()) }
    }
}

/// Shared, lock-free cache of the current HTTP date.
#[derive(Debug)]
pub struct DateService {
    current: ArcSwap<CachedDate>,
}

impl DateService {
    pub fn new() -> Self {
        Self { current: ArcSwap::from_pointee(CachedDate::now()) }
    }

    /// The current date as `Sun, 06 Nov 1994 08:49:37 GMT`.
    pub fn current(&self) -> Arc<str> {
        let cached = self.current.load();
        if cached.formatted_at.elapsed() < REFRESH_INTERVAL {
            return Arc::clone(&cached.value);
        }

        let fresh = CachedDate::now();
        let value = Arc::clone(&fresh.value);
        self.current.store(Arc::new(fresh));
        value
    }
}

impl Default for DateService {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats the current time as an IMF-fixdate.
pub fn http_date() -> String {
    let mut buf = faf_http_date::get_date_buff_no_key();
    faf_http_date::get_date_no_key(&mut buf);
    String::from_utf8_lossy(&buf[..]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imf_fixdate_shape() {
        let date = http_date();
        assert_eq!(date.len(), 29);
        assert!(date.ends_with(" GMT"));
        assert_eq!(&date[3..5], ", ");
    }

    #[test]
    fn cached_value_is_reused() {
        let service = DateService::new();
        let first = service.current();
        let second = service.current();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn stale_value_is_refreshed() {
        let service = DateService::new();
        let first = service.current();
        std::thread::sleep(REFRESH_INTERVAL + Duration::from_millis(50));
        let second = service.current();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
