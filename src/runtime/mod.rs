//! Support code linked into programs that compile generated binders.
//!
//! Generated code only ever calls what is re-exported here, through the path set in
//! `GeneratorOptions::runtime`.
mod error;
mod registry;
mod section;

use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

pub use error::BindError;
pub use registry::BinderRegistry;
pub use section::{ConfigSection, PATH_SEPARATOR};

/// `FromStr` on a trimmed value; absent or unparseable values are `None`.
pub fn parse_value<T: FromStr>(raw: Option<&str>) -> Option<T> {
    raw?.trim().parse().ok()
}

/// Case-insensitive `true`/`false`.
pub fn parse_bool(raw: Option<&str>) -> Option<bool> {
    let raw = raw?.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Standard-alphabet base64. An absent key is `None`, not a decode error.
pub fn decode_base64(raw: Option<&str>) -> Option<Vec<u8>> {
    BASE64.decode(raw?.trim()).ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_value_defaults_to_none() {
        assert_eq!(parse_value::<i32>(Some(" 42 ")), Some(42));
        assert_eq!(parse_value::<i32>(Some("forty-two")), None);
        assert_eq!(parse_value::<i32>(None), None);
        assert_eq!(parse_value::<std::net::IpAddr>(Some("127.0.0.1")).map(|ip| ip.is_loopback()), Some(true));
    }

    #[test]
    fn booleans_ignore_case() {
        assert_eq!(parse_bool(Some("True")), Some(true));
        assert_eq!(parse_bool(Some("FALSE")), Some(false));
        assert_eq!(parse_bool(Some("yes")), None);
    }

    #[test]
    fn base64_absent_or_invalid_is_none() {
        assert_eq!(decode_base64(Some("aGVsbG8=")), Some(b"hello".to_vec()));
        assert_eq!(decode_base64(None), None);
        assert_eq!(decode_base64(Some("not base64!")), None);
    }
}
