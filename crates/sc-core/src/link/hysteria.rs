//! `hysteria://` (v1) and `hysteria2://`/`hy2://` links.

use crate::error::ParseError;
use crate::link::uri;
use crate::model::{Hysteria, Hysteria2, Node, Obfs, Payload};
use crate::util;

pub fn test_v1(line: &str) -> bool {
    line.starts_with("hysteria://")
}

pub fn test_v2(line: &str) -> bool {
    line.starts_with("hysteria2://") || line.starts_with("hy2://")
}

/// v1: `hysteria://host:port?auth=...&upmbps=...&downmbps=...#name`.
pub fn parse_v1(line: &str) -> Result<Node, ParseError> {
    let body = line
        .strip_prefix("hysteria://")
        .ok_or(ParseError::UnknownScheme)?;
    let parts = uri::split(body)?;
    let mut tls = uri::tls_from_query(&parts, true);
    tls.enabled = true;
    Ok(Node {
        name: parts.name(),
        server: parts.host.clone(),
        port: parts.port,
        udp: true,
        raw_uri: Some(line.to_string()),
        payload: Payload::Hysteria(Hysteria {
            auth: parts.get(&["auth", "auth_str"]).filter(|a| !a.is_empty()).map(str::to_string),
            protocol: parts.get(&["protocol"]).map(str::to_string),
            up_mbps: parts.get(&["upmbps", "up"]).and_then(|v| v.parse().ok()),
            down_mbps: parts.get(&["downmbps", "down"]).and_then(|v| v.parse().ok()),
            obfs: parts.get(&["obfs", "obfsParam"]).filter(|o| !o.is_empty()).map(str::to_string),
            tls,
        }),
    })
}

/// v2: `hysteria2://password@host:port?sni=...&obfs=salamander&obfs-password=...#name`.
pub fn parse_v2(line: &str) -> Result<Node, ParseError> {
    let body = line
        .strip_prefix("hysteria2://")
        .or_else(|| line.strip_prefix("hy2://"))
        .ok_or(ParseError::UnknownScheme)?;
    let parts = uri::split(body)?;
    let password = parts
        .userinfo
        .as_deref()
        .map(util::url_decode)
        .unwrap_or_default();
    let mut tls = uri::tls_from_query(&parts, true);
    tls.enabled = true;

    let obfs = parts
        .get(&["obfs"])
        .filter(|o| !o.is_empty())
        .map(|kind| Obfs {
            kind: kind.to_string(),
            host: None,
            password: parts.get(&["obfs-password", "obfs_password"]).map(str::to_string),
        });

    Ok(Node {
        name: parts.name(),
        server: parts.host.clone(),
        port: parts.port,
        udp: true,
        raw_uri: Some(line.to_string()),
        payload: Payload::Hysteria2(Hysteria2 {
            password,
            obfs,
            up_mbps: parts.get(&["up"]).and_then(|v| v.parse().ok()),
            down_mbps: parts.get(&["down"]).and_then(|v| v.parse().ok()),
            tls,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_link() {
        let node =
            parse_v1("hysteria://1.2.3.4:9443?auth=tok&upmbps=100&downmbps=500&peer=sni.example&insecure=1#H1")
                .unwrap();
        let Payload::Hysteria(h) = &node.payload else { panic!() };
        assert_eq!(h.auth.as_deref(), Some("tok"));
        assert_eq!(h.up_mbps, Some(100));
        assert!(h.tls.insecure);
        assert_eq!(h.tls.sni.as_deref(), Some("sni.example"));
    }

    #[test]
    fn v2_alias_hy2() {
        let a = parse_v2("hysteria2://pw@h.example:443?sni=x.example#A").unwrap();
        let b = parse_v2("hy2://pw@h.example:443?sni=x.example#A").unwrap();
        assert_eq!(a.payload, b.payload);
    }

    #[test]
    fn v2_salamander_obfs() {
        let node =
            parse_v2("hysteria2://pw@h.example:443?obfs=salamander&obfs-password=ob#S").unwrap();
        let Payload::Hysteria2(h) = &node.payload else { panic!() };
        let obfs = h.obfs.as_ref().unwrap();
        assert_eq!(obfs.kind, "salamander");
        assert_eq!(obfs.password.as_deref(), Some("ob"));
    }
}
