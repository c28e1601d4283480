//! Cache lifetime extraction from `cache-control` response headers.
//!
//! Only the `max-age=<digits>` directive is recognised. Anything else,
//! including a malformed `max-age`, yields no TTL rather than an error:
//!
//! - `max-age=120` → `Some(120)`
//! - `public, max-age=0` → `Some(0)`
//! - `no-store` → `None`
//! - `max-age=abc` → `None`
//!
//! A missing TTL is not the same as a zero TTL.

use regex::Regex;
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use std::sync::OnceLock;

fn max_age_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"max-age=(\d+)").unwrap())
}

/// Extracts the `max-age` lifetime, in seconds, from response headers.
///
/// Header lookup is case-insensitive. Returns `None` when the header is
/// missing, not valid UTF-8, carries no `max-age` directive, or the value
/// does not fit in a `u64`.
///
/// # Examples
///
/// ```
/// use boundfetch::ttl::extract_ttl;
/// use reqwest::header::{HeaderMap, HeaderValue};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("Cache-Control", HeaderValue::from_static("max-age=120"));
/// assert_eq!(extract_ttl(&headers), Some(120));
///
/// assert_eq!(extract_ttl(&HeaderMap::new()), None);
/// ```
pub fn extract_ttl(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(CACHE_CONTROL)?.to_str().ok()?;
    extract_ttl_from_str(value)
}

/// Extracts the `max-age` lifetime from a raw `cache-control` value.
pub fn extract_ttl_from_str(cache_control: &str) -> Option<u64> {
    let captures = max_age_pattern().captures(cache_control)?;
    captures.get(1)?.as_str().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_max_age_present() {
        assert_eq!(extract_ttl(&headers_with("max-age=120")), Some(120));
    }

    #[test]
    fn test_no_store_is_absent() {
        assert_eq!(extract_ttl(&headers_with("no-store")), None);
    }

    #[test]
    fn test_missing_header_is_absent() {
        assert_eq!(extract_ttl(&HeaderMap::new()), None);
    }

    #[test]
    fn test_non_digit_value_is_absent() {
        assert_eq!(extract_ttl(&headers_with("max-age=abc")), None);
    }

    #[test]
    fn test_missing_value_is_absent() {
        assert_eq!(extract_ttl(&headers_with("max-age=")), None);
        assert_eq!(extract_ttl(&headers_with("max-age")), None);
    }

    #[test]
    fn test_zero_is_distinct_from_absent() {
        assert_eq!(extract_ttl(&headers_with("max-age=0")), Some(0));
    }

    #[test]
    fn test_directive_among_others() {
        assert_eq!(
            extract_ttl(&headers_with("public, max-age=3600, must-revalidate")),
            Some(3600)
        );
    }

    #[test]
    fn test_header_name_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("CACHE-CONTROL", HeaderValue::from_static("max-age=15"));
        assert_eq!(extract_ttl(&headers), Some(15));
    }

    #[test]
    fn test_overflow_is_absent() {
        assert_eq!(
            extract_ttl_from_str("max-age=999999999999999999999999999"),
            None
        );
    }

    #[test]
    fn test_leading_digits_are_used() {
        assert_eq!(extract_ttl_from_str("max-age=12abc"), Some(12));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_any_u32_round_trips(secs in any::<u32>()) {
                let value = format!("private, max-age={}", secs);
                prop_assert_eq!(extract_ttl_from_str(&value), Some(secs as u64));
            }

            #[test]
            fn test_without_directive_is_absent(value in "[a-z ,=-]*") {
                prop_assume!(!value.contains("max-age="));
                prop_assert_eq!(extract_ttl_from_str(&value), None);
            }
        }
    }
}
