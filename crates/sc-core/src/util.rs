//! Primitive string/byte helpers shared by parsers and producers.
//!
//! All of these treat their input as untrusted: decoding never panics
//! and falls back to a harmless value on malformed sequences.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;

/// Normalizing base64 decode: accepts the URL-safe alphabet, stray
/// whitespace and missing padding.
pub fn b64_decode(input: &str) -> Option<Vec<u8>> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let cleaned = cleaned.trim_end_matches('=');
    STANDARD_NO_PAD.decode(cleaned).ok()
}

/// [`b64_decode`] into UTF-8, `None` on either failure.
pub fn b64_decode_str(input: &str) -> Option<String> {
    String::from_utf8(b64_decode(input)?).ok()
}

/// Standard-alphabet encode with padding (subscription body convention).
pub fn b64_encode(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

/// URL-safe, unpadded encode (SIP002 userinfo, SSR sub-fields).
pub fn b64_encode_url(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Percent-decode that never fails: malformed sequences yield the raw
/// input unchanged.
pub fn url_decode(s: &str) -> String {
    match urlencoding::decode(s) {
        Ok(v) => v.into_owned(),
        Err(_) => s.to_string(),
    }
}

pub fn url_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Split a query string into decoded key/value pairs, order preserved.
/// Bare keys (no `=`) map to an empty value.
pub fn split_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|kv| !kv.is_empty())
        .map(|kv| match kv.split_once('=') {
            Some((k, v)) => (k.to_string(), url_decode(v)),
            None => (kv.to_string(), String::new()),
        })
        .collect()
}

/// Split `host:port`, honouring `[ipv6]:port` brackets. Rejects port 0.
pub fn split_host_port(s: &str) -> Option<(String, u16)> {
    let (host, port_str) = if let Some(rest) = s.strip_prefix('[') {
        let (host, rest) = rest.split_once(']')?;
        (host.to_string(), rest.strip_prefix(':')?)
    } else {
        let (host, port) = s.rsplit_once(':')?;
        // An unbracketed IPv6 literal would leave more colons in the
        // host and fabricate a bogus split.
        if host.contains(':') {
            return None;
        }
        (host.to_string(), port)
    };
    if host.is_empty() {
        return None;
    }
    let port: u16 = port_str.parse().ok()?;
    if port == 0 {
        return None;
    }
    Some((host, port))
}

/// `true` if every char is in the (URL-safe or standard) base64 alphabet.
pub fn looks_like_base64(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '-' | '_' | '='))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn b64_normalizes_urlsafe_whitespace_and_padding() {
        assert_eq!(b64_decode("dGVzdA=="), Some(b"test".to_vec()));
        assert_eq!(b64_decode("dGVzdA"), Some(b"test".to_vec()));
        assert_eq!(b64_decode("dGVz\ndA==\n"), Some(b"test".to_vec()));
        // "~~~?" encodes to fn5+Pw== (contains + and /); URL-safe form uses - and _
        assert_eq!(b64_decode("fn5-Pw"), b64_decode("fn5+Pw=="));
    }

    #[test]
    fn url_decode_falls_back_on_malformed_input() {
        assert_eq!(url_decode("a%20b"), "a b");
        assert_eq!(url_decode("100%zz"), "100%zz");
    }

    #[test]
    fn host_port_handles_ipv6_brackets() {
        assert_eq!(
            split_host_port("[2001:db8::1]:443"),
            Some(("2001:db8::1".to_string(), 443))
        );
        assert_eq!(
            split_host_port("example.com:8388"),
            Some(("example.com".to_string(), 8388))
        );
        assert_eq!(split_host_port("example.com:0"), None);
        assert_eq!(split_host_port("noport"), None);
        // Unbracketed IPv6 must not split into a truncated host.
        assert_eq!(split_host_port("2001:db8::1"), None);
        assert_eq!(split_host_port("2001:db8::1:443"), None);
    }

    #[test]
    fn query_split_decodes_values() {
        let q = split_query("path=%2Fws&sni=a.com&flag");
        assert_eq!(q[0], ("path".to_string(), "/ws".to_string()));
        assert_eq!(q[1], ("sni".to_string(), "a.com".to_string()));
        assert_eq!(q[2], ("flag".to_string(), String::new()));
    }
}
