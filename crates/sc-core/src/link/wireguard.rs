//! `wireguard://`/`wg://` links:
//! `wireguard://private_key@host:port?publickey=...&address=...#name`.

use crate::error::ParseError;
use crate::link::uri;
use crate::model::{Node, Payload, WireGuard};
use crate::util;

pub fn test(line: &str) -> bool {
    line.starts_with("wireguard://") || line.starts_with("wg://")
}

pub fn parse(line: &str) -> Result<Node, ParseError> {
    let body = line
        .strip_prefix("wireguard://")
        .or_else(|| line.strip_prefix("wg://"))
        .ok_or(ParseError::UnknownScheme)?;
    let parts = uri::split(body)?;
    let private_key = parts
        .userinfo
        .as_deref()
        .filter(|u| !u.is_empty())
        .map(util::url_decode)
        .ok_or(ParseError::MissingField("private_key"))?;
    let public_key = parts
        .get(&["publickey", "public-key", "pbk"])
        .filter(|k| !k.is_empty())
        .ok_or(ParseError::MissingField("publickey"))?
        .to_string();
    let address = parts
        .get(&["address", "ip"])
        .map(|a| {
            a.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok(Node {
        name: parts.name(),
        server: parts.host.clone(),
        port: parts.port,
        udp: true,
        raw_uri: Some(line.to_string()),
        payload: Payload::WireGuard(WireGuard {
            private_key,
            public_key,
            preshared_key: parts
                .get(&["presharedkey", "preshared-key", "psk"])
                .map(str::to_string),
            address,
            mtu: parts.get(&["mtu"]).and_then(|v| v.parse().ok()),
            reserved: parts.get(&["reserved"]).map(str::to_string),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wg_alias() {
        let link = "wg://PRIV%2Bkey@w.example:51820?publickey=PUB&address=10.0.0.2%2F32,fd00::2%2F128&mtu=1420#WG";
        let node = parse(link).unwrap();
        let Payload::WireGuard(w) = &node.payload else { panic!() };
        assert_eq!(w.private_key, "PRIV+key");
        assert_eq!(w.public_key, "PUB");
        assert_eq!(w.address.len(), 2);
        assert_eq!(w.mtu, Some(1420));
    }

    #[test]
    fn missing_publickey_is_rejected() {
        assert!(matches!(
            parse("wireguard://PRIV@w.example:51820"),
            Err(ParseError::MissingField("publickey"))
        ));
    }
}
