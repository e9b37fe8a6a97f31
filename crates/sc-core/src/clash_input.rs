//! Structured-config (Clash-style YAML) input: maps native proxy
//! objects onto the IR. Field names vary per protocol
//! (`cipher`/`method`, `sni`/`servername`, nested `ws-opts`/`grpc-opts`),
//! so each protocol gets its own mapper over a shared field-access layer.

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::ParseError;
use crate::model::{
    AnyTls, Http, Hysteria, Hysteria2, Node, Obfs, Payload, Reality, Shadowsocks, ShadowsocksR,
    Snell, Socks5, Tls, Transport, TransportKind, Trojan, Tuic, Vless, Vmess, WireGuard,
};

#[derive(Deserialize)]
struct ClashDoc {
    #[serde(default)]
    proxies: Vec<Value>,
}

/// Parse the `proxies:` section. Per-entry failures are returned to the
/// caller alongside the successes so the document layer can log them.
pub fn parse(yaml: &str) -> Result<Vec<Result<Node, ParseError>>, ParseError> {
    let doc: ClashDoc =
        serde_yaml::from_str(yaml).map_err(|e| ParseError::Json(e.to_string()))?;
    Ok(doc.proxies.iter().map(entry_to_node).collect())
}

fn entry_to_node(entry: &Value) -> Result<Node, ParseError> {
    let kind = str_field(entry, &["type"]).ok_or(ParseError::MissingField("type"))?;
    let server = str_field(entry, &["server"]).ok_or(ParseError::MissingHost)?;
    let port = u16_field(entry, "port").filter(|p| *p > 0).ok_or(ParseError::InvalidPort)?;
    let name = str_field(entry, &["name"]).unwrap_or_else(|| Node::default_name(&server, port));
    // Clash semantics: UDP on unless explicitly disabled.
    let udp = bool_field(entry, "udp").unwrap_or(true);

    let payload = match kind.as_str() {
        "ss" => map_ss(entry)?,
        "ssr" => map_ssr(entry)?,
        "vmess" => map_vmess(entry)?,
        "vless" => map_vless(entry)?,
        "trojan" => map_trojan(entry)?,
        "snell" => map_snell(entry)?,
        "hysteria" => map_hysteria(entry)?,
        "hysteria2" => map_hysteria2(entry)?,
        "tuic" => map_tuic(entry)?,
        "wireguard" => map_wireguard(entry)?,
        "anytls" => map_anytls(entry)?,
        "socks5" => Payload::Socks5(Socks5 {
            username: str_field(entry, &["username"]),
            password: str_field(entry, &["password"]),
            tls: tls_of(entry, false),
        }),
        "http" => Payload::Http(Http {
            username: str_field(entry, &["username"]),
            password: str_field(entry, &["password"]),
            tls: tls_of(entry, false),
        }),
        _ => return Err(ParseError::UnknownScheme),
    };

    Ok(Node {
        name,
        server,
        port,
        udp,
        raw_uri: None,
        payload,
    })
}

fn map_ss(entry: &Value) -> Result<Payload, ParseError> {
    let (plugin, plugin_opts) = match str_field(entry, &["plugin"]) {
        Some(plugin) => {
            let mut opts = Vec::new();
            if let Some(Value::Mapping(m)) = entry.get("plugin-opts") {
                for (k, v) in m {
                    if let (Some(k), Some(v)) = (k.as_str(), scalar_to_string(v)) {
                        opts.push((k.to_string(), v));
                    }
                }
            }
            (Some(plugin), opts)
        }
        None => (None, Vec::new()),
    };
    Ok(Payload::Shadowsocks(Shadowsocks {
        cipher: str_field(entry, &["cipher", "method"]).ok_or(ParseError::MissingField("cipher"))?,
        password: str_field(entry, &["password"]).ok_or(ParseError::MissingField("password"))?,
        plugin,
        plugin_opts,
    }))
}

fn map_ssr(entry: &Value) -> Result<Payload, ParseError> {
    Ok(Payload::ShadowsocksR(ShadowsocksR {
        cipher: str_field(entry, &["cipher", "method"]).ok_or(ParseError::MissingField("cipher"))?,
        password: str_field(entry, &["password"]).ok_or(ParseError::MissingField("password"))?,
        protocol: str_field(entry, &["protocol"]).unwrap_or_else(|| "origin".to_string()),
        protocol_param: str_field(entry, &["protocol-param", "protocolparam"]),
        obfs: str_field(entry, &["obfs"]).unwrap_or_else(|| "plain".to_string()),
        obfs_param: str_field(entry, &["obfs-param", "obfsparam"]),
    }))
}

fn map_vmess(entry: &Value) -> Result<Payload, ParseError> {
    Ok(Payload::Vmess(Vmess {
        uuid: str_field(entry, &["uuid"]).ok_or(ParseError::MissingField("uuid"))?,
        alter_id: u16_field(entry, "alterId").unwrap_or(0),
        security: str_field(entry, &["cipher"]).unwrap_or_else(|| "auto".to_string()),
        transport: transport_of(entry),
        tls: tls_of(entry, false),
    }))
}

fn map_vless(entry: &Value) -> Result<Payload, ParseError> {
    Ok(Payload::Vless(Vless {
        uuid: str_field(entry, &["uuid"]).ok_or(ParseError::MissingField("uuid"))?,
        flow: str_field(entry, &["flow"]).filter(|f| !f.is_empty()),
        transport: transport_of(entry),
        tls: tls_of(entry, false),
    }))
}

fn map_trojan(entry: &Value) -> Result<Payload, ParseError> {
    Ok(Payload::Trojan(Trojan {
        password: str_field(entry, &["password"]).ok_or(ParseError::MissingField("password"))?,
        transport: transport_of(entry),
        tls: tls_of(entry, true),
    }))
}

fn map_snell(entry: &Value) -> Result<Payload, ParseError> {
    let obfs = entry
        .get("obfs-opts")
        .and_then(|o| o.as_mapping())
        .and_then(|m| {
            let kind = m.get(&Value::from("mode")).and_then(Value::as_str)?;
            Some(Obfs {
                kind: kind.to_string(),
                host: m
                    .get(&Value::from("host"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                password: None,
            })
        });
    Ok(Payload::Snell(Snell {
        psk: str_field(entry, &["psk"]).ok_or(ParseError::MissingField("psk"))?,
        version: u16_field(entry, "version").unwrap_or(4) as u8,
        obfs,
    }))
}

fn map_hysteria(entry: &Value) -> Result<Payload, ParseError> {
    Ok(Payload::Hysteria(Hysteria {
        auth: str_field(entry, &["auth-str", "auth_str", "auth"]),
        protocol: str_field(entry, &["protocol"]),
        up_mbps: u32_field(entry, &["up", "up-speed"]),
        down_mbps: u32_field(entry, &["down", "down-speed"]),
        obfs: str_field(entry, &["obfs"]),
        tls: tls_always_on(entry),
    }))
}

fn map_hysteria2(entry: &Value) -> Result<Payload, ParseError> {
    let obfs = str_field(entry, &["obfs"]).map(|kind| Obfs {
        kind,
        host: None,
        password: str_field(entry, &["obfs-password"]),
    });
    Ok(Payload::Hysteria2(Hysteria2 {
        password: str_field(entry, &["password", "auth"]).ok_or(ParseError::MissingField("password"))?,
        obfs,
        up_mbps: u32_field(entry, &["up"]),
        down_mbps: u32_field(entry, &["down"]),
        tls: tls_always_on(entry),
    }))
}

fn map_tuic(entry: &Value) -> Result<Payload, ParseError> {
    Ok(Payload::Tuic(Tuic {
        uuid: str_field(entry, &["uuid"]).ok_or(ParseError::MissingField("uuid"))?,
        password: str_field(entry, &["password"]).unwrap_or_default(),
        congestion_control: str_field(entry, &["congestion-controller", "congestion-control"]),
        udp_relay_mode: str_field(entry, &["udp-relay-mode"]),
        tls: tls_always_on(entry),
    }))
}

fn map_wireguard(entry: &Value) -> Result<Payload, ParseError> {
    let mut address = Vec::new();
    if let Some(ip) = str_field(entry, &["ip"]) {
        address.push(ip);
    }
    if let Some(ip6) = str_field(entry, &["ipv6"]) {
        address.push(ip6);
    }
    Ok(Payload::WireGuard(WireGuard {
        private_key: str_field(entry, &["private-key"]).ok_or(ParseError::MissingField("private-key"))?,
        public_key: str_field(entry, &["public-key"]).ok_or(ParseError::MissingField("public-key"))?,
        preshared_key: str_field(entry, &["preshared-key", "pre-shared-key"]),
        address,
        mtu: u16_field(entry, "mtu"),
        reserved: match entry.get("reserved") {
            Some(Value::Sequence(seq)) => Some(
                seq.iter()
                    .filter_map(scalar_to_string)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Some(other) => scalar_to_string(other),
            None => None,
        },
    }))
}

fn map_anytls(entry: &Value) -> Result<Payload, ParseError> {
    Ok(Payload::AnyTls(AnyTls {
        password: str_field(entry, &["password"]).ok_or(ParseError::MissingField("password"))?,
        tls: tls_always_on(entry),
    }))
}

fn transport_of(entry: &Value) -> Transport {
    let kind = str_field(entry, &["network"])
        .map(|n| TransportKind::from_str_loose(&n))
        .unwrap_or_default();
    let mut t = Transport {
        kind,
        ..Transport::default()
    };
    match kind {
        TransportKind::Ws => {
            if let Some(opts) = entry.get("ws-opts").and_then(Value::as_mapping) {
                t.path = opts
                    .get(&Value::from("path"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                t.host = opts
                    .get(&Value::from("headers"))
                    .and_then(Value::as_mapping)
                    .and_then(|h| h.get(&Value::from("Host")))
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
            // Pre-ws-opts legacy keys.
            if t.path.is_none() {
                t.path = str_field(entry, &["ws-path"]);
            }
        }
        TransportKind::Grpc => {
            t.service_name = entry
                .get("grpc-opts")
                .and_then(Value::as_mapping)
                .and_then(|o| o.get(&Value::from("grpc-service-name")))
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        TransportKind::H2 => {
            if let Some(opts) = entry.get("h2-opts").and_then(Value::as_mapping) {
                t.path = opts
                    .get(&Value::from("path"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
        }
        _ => {}
    }
    t
}

fn tls_of(entry: &Value, default_enabled: bool) -> Tls {
    let mut tls = Tls {
        enabled: bool_field(entry, "tls").unwrap_or(default_enabled),
        sni: str_field(entry, &["sni", "servername"]),
        insecure: bool_field(entry, "skip-cert-verify").unwrap_or(false),
        fingerprint: str_field(entry, &["client-fingerprint"]),
        ..Tls::default()
    };
    if let Some(Value::Sequence(seq)) = entry.get("alpn") {
        tls.alpn = seq.iter().filter_map(scalar_to_string).collect();
    }
    if let Some(opts) = entry.get("reality-opts").and_then(Value::as_mapping) {
        if let Some(pbk) = opts.get(&Value::from("public-key")).and_then(Value::as_str) {
            tls.enabled = true;
            tls.reality = Some(Reality {
                public_key: pbk.to_string(),
                short_id: opts
                    .get(&Value::from("short-id"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                spider_x: None,
            });
        }
    }
    tls
}

fn tls_always_on(entry: &Value) -> Tls {
    let mut tls = tls_of(entry, true);
    tls.enabled = true;
    tls
}

fn str_field(entry: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| entry.get(k).and_then(scalar_to_string))
}

fn u16_field(entry: &Value, key: &str) -> Option<u16> {
    match entry.get(key) {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

fn u32_field(entry: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter().find_map(|k| match entry.get(k) {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        // Clash accepts "100 Mbps"-style strings here.
        Some(Value::String(s)) => s
            .split_whitespace()
            .next()
            .and_then(|tok| tok.parse().ok()),
        _ => None,
    })
}

fn bool_field(entry: &Value, key: &str) -> Option<bool> {
    match entry.get(key) {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) => {
            if s.eq_ignore_ascii_case("true") {
                Some(true)
            } else if s.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ss_entry_with_ws_vmess_entry() {
        let yaml = r#"
proxies:
  - name: test-ss
    type: ss
    server: 1.2.3.4
    port: 8388
    cipher: aes-256-gcm
    password: pass
  - name: test-vmess
    type: vmess
    server: 5.6.7.8
    port: 443
    uuid: uuid-7
    alterId: 0
    cipher: auto
    tls: true
    servername: sni.example
    network: ws
    ws-opts:
      path: /ws
      headers:
        Host: host.test
"#;
        let entries = parse(yaml).unwrap();
        assert_eq!(entries.len(), 2);
        let ss = entries[0].as_ref().unwrap();
        assert_eq!(ss.proto(), "ss");
        assert!(ss.udp, "udp defaults to true");
        let vm = entries[1].as_ref().unwrap();
        let Payload::Vmess(v) = &vm.payload else { panic!() };
        assert!(v.tls.enabled);
        assert_eq!(v.tls.sni.as_deref(), Some("sni.example"));
        assert_eq!(v.transport.path.as_deref(), Some("/ws"));
        assert_eq!(v.transport.host.as_deref(), Some("host.test"));
    }

    #[test]
    fn vless_reality_entry() {
        let yaml = r#"
proxies:
  - name: r
    type: vless
    server: 9.9.9.9
    port: 443
    uuid: uuid-8
    flow: xtls-rprx-vision
    reality-opts:
      public-key: PUB
      short-id: "01"
"#;
        let entries = parse(yaml).unwrap();
        let node = entries[0].as_ref().unwrap();
        let Payload::Vless(v) = &node.payload else { panic!() };
        assert!(v.tls.enabled, "reality implies tls");
        assert_eq!(v.tls.reality.as_ref().unwrap().public_key, "PUB");
    }

    #[test]
    fn bad_entry_does_not_poison_batch() {
        let yaml = r#"
proxies:
  - name: ok
    type: ss
    server: 1.2.3.4
    port: 8388
    cipher: aes-256-gcm
    password: x
  - name: broken
    type: ss
    server: 1.2.3.4
    port: 8388
"#;
        let entries = parse(yaml).unwrap();
        assert!(entries[0].is_ok());
        assert!(entries[1].is_err());
    }
}
