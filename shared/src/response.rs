//! API Response types
//!
//! Pagination metadata and the conventional list envelope returned by
//! the certificate backend.

use serde::{Deserialize, Serialize};

/// Pagination metadata carried in `x-*` response headers
///
/// Every field is optional: a missing or unparseable header means
/// "unknown", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: Option<i64>,
    pub page_limit: Option<i64>,
    pub total_count: Option<i64>,
    pub total_pages: Option<i64>,
}

impl Pagination {
    /// Build from raw header values
    pub fn from_header_values(
        current_page: Option<&str>,
        page_limit: Option<&str>,
        total_count: Option<&str>,
        total_pages: Option<&str>,
    ) -> Self {
        Self {
            current_page: current_page.and_then(parse_int),
            page_limit: page_limit.and_then(parse_int),
            total_count: total_count.and_then(parse_int),
            total_pages: total_pages.and_then(parse_int),
        }
    }

    /// True when no header carried a usable value
    pub fn is_unknown(&self) -> bool {
        *self == Self::default()
    }
}

/// Lenient integer parse: leading whitespace, optional sign, then the
/// longest run of digits. `"12abc"` is 12, `"abc"` is unknown.
pub fn parse_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Pagination block inside a list body (`{ current_page, last_page, per_page, total }`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPagination {
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default = "first_page")]
    pub last_page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default)]
    pub total: u64,
}

fn first_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

impl Default for BodyPagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            last_page: 1,
            per_page: 10,
            total: 0,
        }
    }
}

/// List response body
///
/// ```json
/// { "data": [ ... ], "message": "ok", "pagination": { ... }, "status": 200 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<BodyPagination>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<serde_json::Value>,
}

impl<T> Default for ListEnvelope<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            pagination: None,
            message: None,
            status: None,
        }
    }
}

impl<T> ListEnvelope<T> {
    /// Pagination with the front-end defaults applied when the body has none
    pub fn pagination_or_default(&self) -> BodyPagination {
        self.pagination.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_is_lenient() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("  7"), Some(7));
        assert_eq!(parse_int("12abc"), Some(12));
        assert_eq!(parse_int("-3"), Some(-3));
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
    }

    #[test]
    fn test_missing_headers_are_unknown() {
        let p = Pagination::from_header_values(None, None, Some("42"), None);
        assert_eq!(p.total_count, Some(42));
        assert_eq!(p.current_page, None);
        assert!(!p.is_unknown());
        assert!(Pagination::default().is_unknown());
    }

    #[test]
    fn test_list_envelope_defaults() {
        let env: ListEnvelope<serde_json::Value> = serde_json::from_str(r#"{"message":"ok"}"#).unwrap();
        assert!(env.data.is_empty());
        assert_eq!(env.message.as_deref(), Some("ok"));
        assert_eq!(env.pagination_or_default(), BodyPagination::default());

        let env: ListEnvelope<serde_json::Value> =
            serde_json::from_str(r#"{"data":[1,2],"pagination":{"current_page":2,"total":12}}"#).unwrap();
        let page = env.pagination_or_default();
        assert_eq!(page.current_page, 2);
        assert_eq!(page.per_page, 10);
        assert_eq!(page.total, 12);
    }
}
