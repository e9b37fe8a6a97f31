//! Whole-document format detection.
//! 整篇文档的格式识别。
//!
//! Heuristics run in strict priority order because several of them
//! match loosely: the unambiguous JSON/YAML markers come first, the
//! Base64 check (which needs a decode-and-sniff to avoid false
//! positives on short hostnames) comes late.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::util;

/// Input dialect of a whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Clash-style YAML with a `proxies:` list.
    StructuredConfig,
    /// SIP008-style `{"version":1,"servers":[...]}` list.
    JsonServerList,
    /// One share link per line.
    UriList,
    /// Base64 blob wrapping another document.
    Base64,
    /// Client-specific `key = value, ...` line format.
    PlatformLine,
    /// Captive portal / ISP hijack page.
    HtmlError,
    Unknown,
}

impl SourceFormat {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StructuredConfig => "structured-config",
            Self::JsonServerList => "json-server-list",
            Self::UriList => "uri-list",
            Self::Base64 => "base64",
            Self::PlatformLine => "platform-line",
            Self::HtmlError => "html-error",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

static PROTO_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?i)(ss|ssr|vmess|vless|trojan|hysteria2?|hy2|tuic|wireguard|wg|anytls|snell|socks5?|https?)://",
    )
    .expect("protocol prefix regex")
});

/// Minimum length before a bare token is even considered Base64; below
/// this, short hostnames false-positive too easily.
const BASE64_MIN_LEN: usize = 24;

/// Detect the dialect of `text`.
pub fn detect(text: &str) -> SourceFormat {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return SourceFormat::Unknown;
    }

    // 1) HTML error page (captive portal, ISP hijack).
    let lower = trimmed[..trimmed.len().min(256)].to_ascii_lowercase();
    if lower.starts_with("<!doctype") || lower.starts_with("<html") || lower.starts_with("<head") {
        return SourceFormat::HtmlError;
    }

    // 2) JSON server list: top-level version + servers shape.
    if trimmed.starts_with('{') && trimmed.contains("\"servers\"") && trimmed.contains("\"version\"")
    {
        return SourceFormat::JsonServerList;
    }

    // 3) Structured config: `proxies:` plus list-item syntax.
    if (trimmed.starts_with("proxies:") || trimmed.contains("\nproxies:"))
        && (trimmed.contains("\n  -") || trimmed.contains("\n-") || trimmed.contains("- {"))
    {
        return SourceFormat::StructuredConfig;
    }

    // 4) URI list: first meaningful line carries a known scheme.
    if let Some(line) = first_payload_line(trimmed) {
        if PROTO_PREFIX.is_match(line) {
            return SourceFormat::UriList;
        }
    }

    // 5) Base64: whole body, no whitespace, alphabet only, and the
    //    decoded text must actually sniff as protocol links.
    if trimmed.len() >= BASE64_MIN_LEN
        && !trimmed.contains(char::is_whitespace)
        && util::looks_like_base64(trimmed)
    {
        if let Some(decoded) = util::b64_decode_str(trimmed) {
            if let Some(line) = first_payload_line(&decoded) {
                if PROTO_PREFIX.is_match(line) {
                    return SourceFormat::Base64;
                }
            }
        }
    }

    // 6) Platform key=value line format (Quantumult-style).
    if let Some(line) = first_payload_line(trimmed) {
        if line.contains('=') && line.contains(',') {
            return SourceFormat::PlatformLine;
        }
    }

    SourceFormat::Unknown
}

/// First non-empty, non-comment line.
pub fn first_payload_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| {
        !l.is_empty() && !l.starts_with('#') && !l.starts_with(';') && !l.starts_with("//")
    })
}

/// `true` if the line starts with a scheme one of the link parsers owns.
pub fn has_proto_prefix(line: &str) -> bool {
    PROTO_PREFIX.is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order() {
        assert_eq!(
            detect("<!DOCTYPE html><html></html>"),
            SourceFormat::HtmlError
        );
        assert_eq!(
            detect("{\"version\":1,\"servers\":[]}"),
            SourceFormat::JsonServerList
        );
        assert_eq!(
            detect("proxies:\n  - { name: a, type: ss }"),
            SourceFormat::StructuredConfig
        );
        assert_eq!(
            detect("# comment\nss://YWJj@1.2.3.4:443#x"),
            SourceFormat::UriList
        );
        assert_eq!(detect("name = ss, 1.2.3.4, 443"), SourceFormat::PlatformLine);
        assert_eq!(detect("hello world"), SourceFormat::Unknown);
    }

    #[test]
    fn base64_requires_decode_sniff() {
        // base64("ss://YWJj@1.2.3.4:443#x\n")
        let body = crate::util::b64_encode("ss://YWJj@1.2.3.4:443#x\n");
        assert_eq!(detect(&body), SourceFormat::Base64);
        // Alphabet-only but decodes to garbage: not Base64.
        assert_eq!(detect("aaaaaaaaaaaaaaaaaaaaaaaaaaaa"), SourceFormat::Unknown);
    }
}
