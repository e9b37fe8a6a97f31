//! Shared splitter for `credential@host:port?query#fragment` links and
//! the query-key synonym table the URI-style parsers all use.

use crate::error::ParseError;
use crate::model::{Reality, Tls, Transport, TransportKind};
use crate::util;

/// Decomposed URI-style link (scheme already stripped).
#[derive(Debug, Clone, Default)]
pub struct UriParts {
    /// Raw userinfo (before `@`), not decoded.
    pub userinfo: Option<String>,
    pub host: String,
    pub port: u16,
    /// Decoded key/value pairs, order preserved.
    pub query: Vec<(String, String)>,
    /// Percent-decoded fragment.
    pub fragment: Option<String>,
}

impl UriParts {
    /// First query value matching any of `keys` (already decoded).
    pub fn get(&self, keys: &[&str]) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| keys.iter().any(|key| k.eq_ignore_ascii_case(key)))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_bool(&self, keys: &[&str]) -> bool {
        matches!(self.get(keys), Some("1") | Some("true") | Some("True"))
    }

    /// Display name: decoded fragment, else `host:port`.
    pub fn name(&self) -> String {
        match &self.fragment {
            Some(f) if !f.is_empty() => f.clone(),
            _ => crate::model::Node::default_name(&self.host, self.port),
        }
    }
}

/// Split a link body. Missing host or port is a hard per-item failure.
pub fn split(body: &str) -> Result<UriParts, ParseError> {
    let (body, fragment) = match body.split_once('#') {
        Some((b, f)) => (b, Some(util::url_decode(f.trim()))),
        None => (body, None),
    };
    let (body, query_str) = match body.split_once('?') {
        Some((b, q)) => (b, q),
        None => (body, ""),
    };
    // Strip SIP002-style trailing slash before the query.
    let body = body.strip_suffix('/').unwrap_or(body);
    let (userinfo, host_port) = match body.rsplit_once('@') {
        Some((u, hp)) => (Some(u.to_string()), hp),
        None => (None, body),
    };
    if host_port.is_empty() {
        return Err(ParseError::MissingHost);
    }
    let (host, port) = util::split_host_port(host_port).ok_or(ParseError::InvalidPort)?;
    Ok(UriParts {
        userinfo,
        host,
        port,
        query: util::split_query(query_str),
        fragment,
    })
}

/// Build a [`Transport`] from the shared query vocabulary
/// (`type`/`network`, `path`, `host`, `serviceName`, `mode`).
pub fn transport_from_query(parts: &UriParts) -> Transport {
    let kind = parts
        .get(&["type", "network", "net"])
        .map(TransportKind::from_str_loose)
        .unwrap_or_default();
    let mut t = Transport {
        kind,
        ..Transport::default()
    };
    match kind {
        TransportKind::Ws | TransportKind::H2 => {
            t.path = parts.get(&["path"]).map(str::to_string);
            t.host = parts.get(&["host"]).map(str::to_string);
        }
        TransportKind::Grpc => {
            t.service_name = parts.get(&["serviceName", "service-name", "path"]).map(str::to_string);
            t.mode = parts.get(&["mode"]).map(str::to_string);
        }
        _ => {}
    }
    t
}

/// Build a [`Tls`] from the shared query vocabulary (`security`,
/// `sni`/`peer`/`servername`, `alpn`, `fp`, `insecure`/`allowInsecure`,
/// Reality `pbk`/`sid`/`spx`).
pub fn tls_from_query(parts: &UriParts, default_enabled: bool) -> Tls {
    let security = parts.get(&["security"]).unwrap_or("");
    let enabled = match security {
        "tls" | "reality" | "xtls" => true,
        "none" => false,
        _ => default_enabled,
    };
    let mut tls = Tls {
        enabled,
        sni: parts.get(&["sni", "peer", "servername"]).map(str::to_string),
        fingerprint: parts.get(&["fp", "fingerprint"]).map(str::to_string),
        insecure: parts.get_bool(&["insecure", "allowInsecure", "allow_insecure"]),
        ..Tls::default()
    };
    if let Some(alpn) = parts.get(&["alpn"]) {
        tls.alpn = alpn
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if security == "reality" || parts.get(&["pbk"]).is_some() {
        if let Some(pbk) = parts.get(&["pbk", "public-key"]) {
            tls.enabled = true;
            tls.reality = Some(Reality {
                public_key: pbk.to_string(),
                short_id: parts.get(&["sid", "short-id"]).map(str::to_string),
                spider_x: parts.get(&["spx", "spider-x"]).map(str::to_string),
            });
        }
    }
    tls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_full_shape() {
        let p = split("user@example.com:443?sni=a.com&alpn=h2%2Chttp%2F1.1#My%20Node").unwrap();
        assert_eq!(p.userinfo.as_deref(), Some("user"));
        assert_eq!(p.host, "example.com");
        assert_eq!(p.port, 443);
        assert_eq!(p.get(&["sni"]), Some("a.com"));
        assert_eq!(p.fragment.as_deref(), Some("My Node"));
    }

    #[test]
    fn split_rejects_missing_port() {
        assert!(matches!(split("user@example.com"), Err(ParseError::InvalidPort)));
        assert!(matches!(split(""), Err(ParseError::MissingHost)));
    }

    #[test]
    fn reality_implies_tls() {
        let p = split("u@h:443?security=reality&pbk=KEY&sid=ab12").unwrap();
        let tls = tls_from_query(&p, false);
        assert!(tls.enabled);
        let r = tls.reality.unwrap();
        assert_eq!(r.public_key, "KEY");
        assert_eq!(r.short_id.as_deref(), Some("ab12"));
    }

    #[test]
    fn synonym_keys_resolve() {
        let p = split("u@h:443?peer=sni.example&allowInsecure=1&net=ws&path=%2Fws").unwrap();
        let tls = tls_from_query(&p, true);
        assert_eq!(tls.sni.as_deref(), Some("sni.example"));
        assert!(tls.insecure);
        let t = transport_from_query(&p);
        assert_eq!(t.kind, TransportKind::Ws);
        assert_eq!(t.path.as_deref(), Some("/ws"));
    }
}
