//! `vmess://` links.
//!
//! Two wire forms are accepted, tried in order: the legacy V2 format
//! (base64 of a JSON object with `ps`/`add`/`port`/`id`/... keys) and
//! the bare URI form `vmess://uuid@host:port?query#name`. Anything else
//! fails closed with a typed error.

use serde_json::Value;

use crate::error::ParseError;
use crate::link::uri;
use crate::model::{Node, Payload, TransportKind, Vmess};
use crate::util;

pub fn test(line: &str) -> bool {
    line.starts_with("vmess://")
}

pub fn parse(line: &str) -> Result<Node, ParseError> {
    let body = line.strip_prefix("vmess://").ok_or(ParseError::UnknownScheme)?;
    match parse_v2_json(body) {
        Ok(mut node) => {
            node.raw_uri = Some(line.to_string());
            Ok(node)
        }
        Err(_) => {
            let mut node = parse_uri_form(body)?;
            node.raw_uri = Some(line.to_string());
            Ok(node)
        }
    }
}

/// Legacy V2 share format: base64(JSON).
fn parse_v2_json(body: &str) -> Result<Node, ParseError> {
    let decoded = util::b64_decode(body).ok_or(ParseError::Base64)?;
    let json: Value =
        serde_json::from_slice(&decoded).map_err(|e| ParseError::Json(e.to_string()))?;
    let obj = json
        .as_object()
        .ok_or_else(|| ParseError::Json("not an object".into()))?;

    let server = obj
        .get("add")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::MissingHost)?
        .to_string();
    // `port` shows up as both string and number in the wild.
    let port = match obj.get("port") {
        Some(Value::String(s)) => s.parse::<u16>().ok(),
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
        _ => None,
    }
    .filter(|p| *p > 0)
    .ok_or(ParseError::InvalidPort)?;
    let uuid = obj
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::MissingField("id"))?
        .to_string();

    let str_of = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
    let alter_id = match obj.get("aid") {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as u16,
        _ => 0,
    };

    let mut transport = crate::model::Transport {
        kind: str_of("net")
            .map(|s| TransportKind::from_str_loose(&s))
            .unwrap_or_default(),
        ..Default::default()
    };
    match transport.kind {
        TransportKind::Ws | TransportKind::H2 => {
            transport.path = str_of("path");
            transport.host = str_of("host").filter(|s| !s.is_empty());
        }
        TransportKind::Grpc => {
            transport.service_name = str_of("path").filter(|s| !s.is_empty());
        }
        _ => {}
    }

    let mut tls = crate::model::Tls::default();
    tls.enabled = str_of("tls").as_deref() == Some("tls");
    tls.sni = str_of("sni").filter(|s| !s.is_empty());
    tls.fingerprint = str_of("fp").filter(|s| !s.is_empty());
    if let Some(alpn) = str_of("alpn").filter(|s| !s.is_empty()) {
        tls.alpn = alpn.split(',').map(|s| s.trim().to_string()).collect();
    }

    let name = str_of("ps")
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Node::default_name(&server, port));

    Ok(Node {
        name,
        server,
        port,
        udp: true,
        raw_uri: None,
        payload: Payload::Vmess(Vmess {
            uuid,
            alter_id,
            security: str_of("scy").unwrap_or_else(|| "auto".to_string()),
            transport,
            tls,
        }),
    })
}

/// Bare URI form, shaped like a vless link.
fn parse_uri_form(body: &str) -> Result<Node, ParseError> {
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
        raw_uri: None,
        payload: Payload::Vmess(Vmess {
            uuid,
            alter_id: 0,
            security: parts
                .get(&["encryption", "scy"])
                .unwrap_or("auto")
                .to_string(),
            transport,
            tls,
        }),
    })
}
