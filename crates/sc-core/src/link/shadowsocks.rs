//! `ss://` and `ssr://` links.
//!
//! Shadowsocks has three nested sub-formats, tried in order:
//! SIP002 (`base64(method:password)@host:port`), the legacy whole-body
//! base64 form (`base64(method:password@host:port)`), and the
//! JSON-in-base64 form some clients emit. SSR is a single base64 body
//! with colon-separated fields and base64 sub-fields in its query.

use crate::error::ParseError;
use crate::link::uri;
use crate::model::{Node, Payload, Shadowsocks, ShadowsocksR};
use crate::util;

pub fn test(line: &str) -> bool {
    line.starts_with("ss://")
}

pub fn test_ssr(line: &str) -> bool {
    line.starts_with("ssr://")
}

pub fn parse(line: &str) -> Result<Node, ParseError> {
    let body = line.strip_prefix("ss://").ok_or(ParseError::UnknownScheme)?;
    let mut node = parse_sip002(body)
        .or_else(|_| parse_legacy(body))
        .or_else(|_| parse_json_b64(body))?;
    node.raw_uri = Some(line.to_string());
    Ok(node)
}

/// SIP002: `ss://b64url(method:password)@host:port/?plugin=...#name`.
/// Plain `method:password` userinfo (percent-encoded) is also accepted.
fn parse_sip002(body: &str) -> Result<Node, ParseError> {
    let parts = uri::split(body)?;
    let userinfo = parts.userinfo.as_deref().ok_or(ParseError::Malformed("ss"))?;
    let decoded = if userinfo.contains(':') {
        util::url_decode(userinfo)
    } else {
        util::b64_decode_str(userinfo).ok_or(ParseError::Base64)?
    };
    let (cipher, password) = decoded
        .split_once(':')
        .ok_or(ParseError::MissingField("password"))?;

    let (plugin, plugin_opts) = match parts.get(&["plugin"]) {
        Some(raw) => split_plugin(raw),
        None => (None, Vec::new()),
    };

    Ok(Node {
        name: parts.name(),
        server: parts.host.clone(),
        port: parts.port,
        udp: true,
        raw_uri: None,
        payload: Payload::Shadowsocks(Shadowsocks {
            cipher: cipher.to_string(),
            password: password.to_string(),
            plugin,
            plugin_opts,
        }),
    })
}

/// Legacy: the whole body (minus fragment) is base64 of
/// `method:password@host:port`.
fn parse_legacy(body: &str) -> Result<Node, ParseError> {
    let (blob, fragment) = match body.split_once('#') {
        Some((b, f)) => (b, Some(util::url_decode(f))),
        None => (body, None),
    };
    let decoded = util::b64_decode_str(blob).ok_or(ParseError::Base64)?;
    let (userinfo, host_port) = decoded.rsplit_once('@').ok_or(ParseError::Malformed("ss"))?;
    let (cipher, password) = userinfo
        .split_once(':')
        .ok_or(ParseError::MissingField("password"))?;
    let (server, port) = util::split_host_port(host_port).ok_or(ParseError::InvalidPort)?;
    let name = fragment
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| Node::default_name(&server, port));
    Ok(Node {
        name,
        server,
        port,
        udp: true,
        raw_uri: None,
        payload: Payload::Shadowsocks(Shadowsocks {
            cipher: cipher.to_string(),
            password: password.to_string(),
            plugin: None,
            plugin_opts: Vec::new(),
        }),
    })
}

/// VMess-style JSON-in-base64 with shadowsocks field names.
fn parse_json_b64(body: &str) -> Result<Node, ParseError> {
    let decoded = util::b64_decode(body).ok_or(ParseError::Base64)?;
    let json: serde_json::Value =
        serde_json::from_slice(&decoded).map_err(|e| ParseError::Json(e.to_string()))?;
    crate::document::sip008_entry(&json).ok_or(ParseError::Malformed("ss"))
}

/// Tokenize a SIP003 plugin option string on `;` then `=`.
fn split_plugin(raw: &str) -> (Option<String>, Vec<(String, String)>) {
    let mut iter = raw.split(';');
    let plugin = iter.next().filter(|p| !p.is_empty()).map(str::to_string);
    let opts = iter
        .filter(|tok| !tok.is_empty())
        .map(|tok| match tok.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (tok.to_string(), String::new()),
        })
        .collect();
    (plugin, opts)
}

pub fn parse_ssr(line: &str) -> Result<Node, ParseError> {
    let body = line.strip_prefix("ssr://").ok_or(ParseError::UnknownScheme)?;
    let decoded = util::b64_decode_str(body).ok_or(ParseError::Base64)?;

    let (main, params) = match decoded.split_once("/?") {
        Some((m, p)) => (m, p),
        None => (decoded.as_str(), ""),
    };
    // host:port:protocol:method:obfs:base64(password), host may be IPv6,
    // so split the five rightmost colons.
    let mut fields = main.rsplitn(6, ':');
    let pass_b64 = fields.next().ok_or(ParseError::Malformed("ssr"))?;
    let obfs = fields.next().ok_or(ParseError::Malformed("ssr"))?;
    let cipher = fields.next().ok_or(ParseError::Malformed("ssr"))?;
    let protocol = fields.next().ok_or(ParseError::Malformed("ssr"))?;
    let port_str = fields.next().ok_or(ParseError::Malformed("ssr"))?;
    let server = fields.next().ok_or(ParseError::Malformed("ssr"))?.to_string();
    if server.is_empty() {
        return Err(ParseError::MissingHost);
    }
    let port: u16 = port_str.parse().map_err(|_| ParseError::InvalidPort)?;
    if port == 0 {
        return Err(ParseError::InvalidPort);
    }
    let password = util::b64_decode_str(pass_b64).ok_or(ParseError::Base64)?;

    let query = util::split_query(params);
    let b64_param = |key: &str| {
        query
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| util::b64_decode_str(v))
            .filter(|s| !s.is_empty())
    };
    let name = b64_param("remarks").unwrap_or_else(|| Node::default_name(&server, port));

    Ok(Node {
        name,
        server,
        port,
        udp: true,
        raw_uri: Some(line.to_string()),
        payload: Payload::ShadowsocksR(ShadowsocksR {
            cipher: cipher.to_string(),
            password,
            protocol: protocol.to_string(),
            protocol_param: b64_param("protoparam"),
            obfs: obfs.to_string(),
            obfs_param: b64_param("obfsparam"),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sip002_base64_userinfo() {
        // base64("aes-256-gcm:password")
        let node = parse("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@1.2.3.4:8388#TestNode").unwrap();
        assert_eq!(node.name, "TestNode");
        assert_eq!(node.server, "1.2.3.4");
        assert_eq!(node.port, 8388);
        let Payload::Shadowsocks(ss) = &node.payload else { panic!() };
        assert_eq!(ss.cipher, "aes-256-gcm");
        assert_eq!(ss.password, "password");
    }

    #[test]
    fn sip002_plugin_tokenized() {
        let node = parse(
            "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@1.2.3.4:8388/?plugin=obfs-local%3Bobfs%3Dhttp%3Bobfs-host%3Dcdn.example#P",
        )
        .unwrap();
        let Payload::Shadowsocks(ss) = &node.payload else { panic!() };
        assert_eq!(ss.plugin.as_deref(), Some("obfs-local"));
        assert_eq!(
            ss.plugin_opts,
            vec![
                ("obfs".to_string(), "http".to_string()),
                ("obfs-host".to_string(), "cdn.example".to_string()),
            ]
        );
    }

    #[test]
    fn legacy_whole_body_base64() {
        let blob = util::b64_encode_url("rc4-md5:secret@9.8.7.6:443");
        let node = parse(&format!("ss://{blob}#Legacy")).unwrap();
        assert_eq!(node.name, "Legacy");
        assert_eq!(node.port, 443);
        let Payload::Shadowsocks(ss) = &node.payload else { panic!() };
        assert_eq!(ss.cipher, "rc4-md5");
        assert_eq!(ss.password, "secret");
    }

    #[test]
    fn ssr_link() {
        // 1.2.3.4:8388:origin:aes-128-cfb:plain:base64("pwd")/?remarks=base64("Name")
        let inner = format!(
            "1.2.3.4:8388:origin:aes-128-cfb:plain:{}/?remarks={}&obfsparam={}",
            util::b64_encode_url("pwd"),
            util::b64_encode_url("Name"),
            util::b64_encode_url("obfs.example")
        );
        let node = parse_ssr(&format!("ssr://{}", util::b64_encode_url(inner))).unwrap();
        assert_eq!(node.name, "Name");
        let Payload::ShadowsocksR(ssr) = &node.payload else { panic!() };
        assert_eq!(ssr.cipher, "aes-128-cfb");
        assert_eq!(ssr.password, "pwd");
        assert_eq!(ssr.obfs_param.as_deref(), Some("obfs.example"));
    }
}
