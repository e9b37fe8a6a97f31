//! Per-protocol link decoders behind an open dispatch table.
//! 按协议划分的链接解码器，统一走开放式分发表。
//!
//! Each family exposes `test(line) -> bool` (a cheap prefix predicate)
//! and `parse(line) -> Result<Node, ParseError>`. Dispatch resolves to
//! the first matching entry, so registering a protocol is one line in
//! [`PARSERS`]. Order matters only where prefixes overlap: `ssr://`
//! must come before `ss://`, `socks5://` before generic matching.

pub mod hysteria;
pub mod quantumult;
pub mod shadowsocks;
pub mod simple;
pub mod trojan;
pub mod tuic;
pub mod uri;
pub mod vless;
pub mod vmess;
pub mod wireguard;

use crate::error::ParseError;
use crate::model::Node;

/// One registered protocol family.
pub struct LinkParser {
    pub scheme: &'static str,
    pub test: fn(&str) -> bool,
    pub parse: fn(&str) -> Result<Node, ParseError>,
}

/// The dispatch table, first match wins.
pub const PARSERS: &[LinkParser] = &[
    LinkParser { scheme: "ssr", test: shadowsocks::test_ssr, parse: shadowsocks::parse_ssr },
    LinkParser { scheme: "ss", test: shadowsocks::test, parse: shadowsocks::parse },
    LinkParser { scheme: "vmess", test: vmess::test, parse: vmess::parse },
    LinkParser { scheme: "vless", test: vless::test, parse: vless::parse },
    LinkParser { scheme: "trojan", test: trojan::test, parse: trojan::parse },
    LinkParser { scheme: "hysteria2", test: hysteria::test_v2, parse: hysteria::parse_v2 },
    LinkParser { scheme: "hysteria", test: hysteria::test_v1, parse: hysteria::parse_v1 },
    LinkParser { scheme: "tuic", test: tuic::test, parse: tuic::parse },
    LinkParser { scheme: "wireguard", test: wireguard::test, parse: wireguard::parse },
    LinkParser { scheme: "anytls", test: simple::test_anytls, parse: simple::parse_anytls },
    LinkParser { scheme: "snell", test: simple::test_snell, parse: simple::parse_snell },
    LinkParser { scheme: "socks5", test: simple::test_socks, parse: simple::parse_socks },
    LinkParser { scheme: "http", test: simple::test_http, parse: simple::parse_http },
];

/// Decode one share link. Returns [`ParseError::UnknownScheme`] when no
/// registered family claims the line.
pub fn parse_line(line: &str) -> Result<Node, ParseError> {
    let line = line.trim();
    for parser in PARSERS {
        if (parser.test)(line) {
            return (parser.parse)(line);
        }
    }
    Err(ParseError::UnknownScheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_resolves_overlapping_prefixes() {
        // ssr:// must not be claimed by the ss:// family.
        let inner = format!(
            "1.2.3.4:8388:origin:aes-128-cfb:plain:{}",
            crate::util::b64_encode_url(b"pwd")
        );
        let node =
            parse_line(&format!("ssr://{}", crate::util::b64_encode_url(inner.as_bytes()))).unwrap();
        assert_eq!(node.proto(), "ssr");
    }

    #[test]
    fn unknown_scheme_is_an_explicit_miss() {
        assert!(matches!(
            parse_line("gopher://example.com:70"),
            Err(ParseError::UnknownScheme)
        ));
    }
}
