//! `vless://uuid@host:port?query#name` links.

use crate::error::ParseError;
use crate::link::uri;
use crate::model::{Node, Payload, Vless};

pub fn test(line: &str) -> bool {
    line.starts_with("vless://")
}

pub fn parse(line: &str) -> Result<Node, ParseError> {
    let body = line.strip_prefix("vless://").ok_or(ParseError::UnknownScheme)?;
    let parts = uri::split(body)?;
    let uuid = parts
        .userinfo
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or(ParseError::MissingField("uuid"))?;
    let transport = uri::transport_from_query(&parts);
    let tls = uri::tls_from_query(&parts, false);
    Ok(Node {
        name: parts.name(),
        server: parts.host.clone(),
        port: parts.port,
        udp: true,
        raw_uri: Some(line.to_string()),
        payload: Payload::Vless(Vless {
            uuid,
            flow: parts.get(&["flow"]).filter(|f| !f.is_empty()).map(str::to_string),
            transport,
            tls,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransportKind;

    #[test]
    fn reality_link() {
        let node = parse(
            "vless://uuid-3@9.9.9.9:443?security=reality&sni=apple.com&pbk=PUBKEY&sid=0123&fp=chrome&flow=xtls-rprx-vision#R",
        )
        .unwrap();
        match &node.payload {
            Payload::Vless(v) => {
                assert_eq!(v.flow.as_deref(), Some("xtls-rprx-vision"));
                let tls = &v.tls;
                assert!(tls.enabled);
                assert_eq!(tls.fingerprint.as_deref(), Some("chrome"));
                assert_eq!(tls.reality.as_ref().unwrap().public_key, "PUBKEY");
            }
            other => panic!("wrong payload: {other:?}"),
        }
    }

    #[test]
    fn missing_uuid_is_rejected() {
        assert!(matches!(
            parse("vless://9.9.9.9:443#X"),
            Err(ParseError::MissingField("uuid"))
        ));
    }

    #[test]
    fn ws_transport() {
        let node = parse("vless://u@h.example:80?type=ws&path=%2Fapi&host=cdn.example#W").unwrap();
        let Payload::Vless(v) = &node.payload else { panic!() };
        assert_eq!(v.transport.kind, TransportKind::Ws);
        assert_eq!(v.transport.host.as_deref(), Some("cdn.example"));
    }
}
