//! Quantumult-style `proto = host:port, key=value, ..., tag=name` lines
//! (the platform-line document dialect).

use crate::error::ParseError;
use crate::model::{
    Http, Node, Payload, Shadowsocks, Socks5, Tls, Transport, TransportKind, Trojan, Vmess,
};
use crate::util;

/// Parse one platform line. The scheme-style parsers never claim these,
/// so this is only reached through the platform-line document strategy.
pub fn parse_line(line: &str) -> Result<Node, ParseError> {
    let (head, rest) = line.split_once('=').ok_or(ParseError::Malformed("platform-line"))?;
    let proto = head.trim().to_ascii_lowercase();
    let mut fields = rest.split(',').map(str::trim);
    let host_port = fields.next().ok_or(ParseError::MissingHost)?;
    let (server, port) = util::split_host_port(host_port).ok_or(ParseError::InvalidPort)?;

    let mut kv: Vec<(String, String)> = Vec::new();
    for tok in fields {
        if let Some((k, v)) = tok.split_once('=') {
            kv.push((k.trim().to_ascii_lowercase(), v.trim().trim_matches('"').to_string()));
        }
    }
    let get = |key: &str| kv.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
    let name = get("tag")
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Node::default_name(&server, port));

    let payload = match proto.as_str() {
        "shadowsocks" | "ss" => Payload::Shadowsocks(Shadowsocks {
            cipher: get("method")
                .or_else(|| get("encrypt-method"))
                .ok_or(ParseError::MissingField("method"))?
                .to_string(),
            password: get("password").ok_or(ParseError::MissingField("password"))?.to_string(),
            plugin: None,
            plugin_opts: Vec::new(),
        }),
        "vmess" => {
            let mut transport = Transport::default();
            let mut tls = Tls::default();
            match get("obfs") {
                Some("ws") => transport.kind = TransportKind::Ws,
                Some("wss") => {
                    transport.kind = TransportKind::Ws;
                    tls.enabled = true;
                }
                Some("over-tls") => tls.enabled = true,
                _ => {}
            }
            if transport.kind == TransportKind::Ws {
                transport.path = get("obfs-uri").map(str::to_string);
                transport.host = get("obfs-host").map(str::to_string);
            }
            tls.sni = get("tls-host").map(str::to_string);
            Payload::Vmess(Vmess {
                uuid: get("password").ok_or(ParseError::MissingField("password"))?.to_string(),
                alter_id: 0,
                security: get("method").unwrap_or("auto").to_string(),
                transport,
                tls,
            })
        }
        "trojan" => {
            let mut tls = Tls::on();
            tls.sni = get("tls-host").map(str::to_string);
            tls.insecure = get("tls-verification") == Some("false");
            Payload::Trojan(Trojan {
                password: get("password").ok_or(ParseError::MissingField("password"))?.to_string(),
                transport: Transport::default(),
                tls,
            })
        }
        "http" => Payload::Http(Http {
            username: get("username").map(str::to_string),
            password: get("password").map(str::to_string),
            tls: if get("over-tls") == Some("true") {
                Tls::on()
            } else {
                Tls::default()
            },
        }),
        "socks5" => Payload::Socks5(Socks5 {
            username: get("username").map(str::to_string),
            password: get("password").map(str::to_string),
            tls: Tls::default(),
        }),
        _ => return Err(ParseError::UnknownScheme),
    };

    Ok(Node {
        name,
        server,
        port,
        udp: get("udp-relay") != Some("false"),
        raw_uri: None,
        payload,
    })
}
