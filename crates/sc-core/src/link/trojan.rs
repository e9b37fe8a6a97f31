//! `trojan://password@host:port?query#name` links. Trojan is TLS by
//! definition, so the TLS descriptor defaults to enabled.

use crate::error::ParseError;
use crate::link::uri;
use crate::model::{Node, Payload, Trojan};
use crate::util;

pub fn test(line: &str) -> bool {
    line.starts_with("trojan://")
}

pub fn parse(line: &str) -> Result<Node, ParseError> {
    let body = line.strip_prefix("trojan://").ok_or(ParseError::UnknownScheme)?;
    let parts = uri::split(body)?;
    let password = parts
        .userinfo
        .as_deref()
        .filter(|u| !u.is_empty())
        .map(util::url_decode)
        .ok_or(ParseError::MissingField("password"))?;
    let transport = uri::transport_from_query(&parts);
    let tls = uri::tls_from_query(&parts, true);
    Ok(Node {
        name: parts.name(),
        server: parts.host.clone(),
        port: parts.port,
        udp: true,
        raw_uri: Some(line.to_string()),
        payload: Payload::Trojan(Trojan {
            password,
            transport,
            tls,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_link_defaults_to_tls() {
        let node = parse("trojan://p%40ss@server.com:443?sni=example.com#MyTrojan").unwrap();
        assert_eq!(node.name, "MyTrojan");
        let Payload::Trojan(t) = &node.payload else { panic!() };
        assert_eq!(t.password, "p@ss");
        assert!(t.tls.enabled);
        assert_eq!(t.tls.sni.as_deref(), Some("example.com"));
    }

    #[test]
    fn missing_password_is_rejected() {
        assert!(parse("trojan://server.com:443").is_err());
    }
}
