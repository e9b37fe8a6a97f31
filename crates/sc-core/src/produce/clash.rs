//! Structured-config (Clash-style YAML) producer.
//!
//! Proxy and group entries are rendered as single-line flow-style maps
//! (downstream clients expect flow style for these lists, not block
//! style). JSON object syntax is valid YAML flow syntax, so each entry
//! is built as a `serde_json` map and printed on its own `- ` line.

use serde_json::{json, Map, Value};

use crate::error::ProduceError;
use crate::model::{Node, Payload, Tls, Transport, TransportKind};
use crate::produce::{render_each, ProduceOptions, GROUP_AUTO, GROUP_SELECT, TEST_URL};
use crate::ruleset::{RuleKind, RouteRule};

pub fn produce(nodes: &[Node], opts: &ProduceOptions) -> String {
    let rendered = render_each(nodes, "clash", proxy_value);

    let mut out = String::new();
    if let Some(hint) = &opts.filename_hint {
        out.push_str(&format!("# {}\n", hint));
    }
    out.push_str("port: 7890\nsocks-port: 7891\nallow-lan: false\nmode: rule\nlog-level: info\n");
    out.push_str("proxies:\n");
    let mut names = Vec::with_capacity(rendered.len());
    for (i, value) in &rendered {
        names.push(nodes[*i].name.clone());
        out.push_str("  - ");
        out.push_str(&value.to_string());
        out.push('\n');
    }

    out.push_str("proxy-groups:\n");
    let mut select_members = vec![Value::from(GROUP_AUTO)];
    select_members.extend(names.iter().map(|n| Value::from(n.as_str())));
    let select = json!({
        "name": GROUP_SELECT,
        "type": "select",
        "proxies": select_members,
    });
    let auto = json!({
        "name": GROUP_AUTO,
        "type": "url-test",
        "url": TEST_URL,
        "interval": 300,
        "proxies": names,
    });
    out.push_str("  - ");
    out.push_str(&select.to_string());
    out.push('\n');
    out.push_str("  - ");
    out.push_str(&auto.to_string());
    out.push('\n');

    if let Some(template) = &opts.rule_template {
        out.push_str("rules:\n");
        for rule in &template.rules {
            out.push_str("  - ");
            out.push_str(&rule_line(rule));
            out.push('\n');
        }
    }
    out
}

/// Every protocol in the IR has a structured-config rendering.
fn proxy_value(node: &Node) -> Result<Value, ProduceError> {
    let mut map = Map::new();
    map.insert("name".into(), node.name.clone().into());
    map.insert("server".into(), node.server.clone().into());
    map.insert("port".into(), node.port.into());
    if !node.udp {
        map.insert("udp".into(), false.into());
    }

    match &node.payload {
        Payload::Shadowsocks(p) => {
            map.insert("type".into(), "ss".into());
            map.insert("cipher".into(), p.cipher.clone().into());
            map.insert("password".into(), p.password.clone().into());
            if let Some(plugin) = &p.plugin {
                map.insert("plugin".into(), plugin.clone().into());
                if !p.plugin_opts.is_empty() {
                    let mut opts = Map::new();
                    for (k, v) in &p.plugin_opts {
                        opts.insert(k.clone(), v.clone().into());
                    }
                    map.insert("plugin-opts".into(), opts.into());
                }
            }
        }
        Payload::ShadowsocksR(p) => {
            map.insert("type".into(), "ssr".into());
            map.insert("cipher".into(), p.cipher.clone().into());
            map.insert("password".into(), p.password.clone().into());
            map.insert("protocol".into(), p.protocol.clone().into());
            if let Some(v) = &p.protocol_param {
                map.insert("protocol-param".into(), v.clone().into());
            }
            map.insert("obfs".into(), p.obfs.clone().into());
            if let Some(v) = &p.obfs_param {
                map.insert("obfs-param".into(), v.clone().into());
            }
        }
        Payload::Vmess(p) => {
            map.insert("type".into(), "vmess".into());
            map.insert("uuid".into(), p.uuid.clone().into());
            map.insert("alterId".into(), p.alter_id.into());
            map.insert("cipher".into(), p.security.clone().into());
            put_transport(&mut map, &p.transport);
            put_tls(&mut map, &p.tls);
        }
        Payload::Vless(p) => {
            map.insert("type".into(), "vless".into());
            map.insert("uuid".into(), p.uuid.clone().into());
            if let Some(flow) = &p.flow {
                map.insert("flow".into(), flow.clone().into());
            }
            put_transport(&mut map, &p.transport);
            put_tls(&mut map, &p.tls);
        }
        Payload::Trojan(p) => {
            map.insert("type".into(), "trojan".into());
            map.insert("password".into(), p.password.clone().into());
            put_transport(&mut map, &p.transport);
            put_tls_sni_only(&mut map, &p.tls);
        }
        Payload::Snell(p) => {
            map.insert("type".into(), "snell".into());
            map.insert("psk".into(), p.psk.clone().into());
            map.insert("version".into(), p.version.into());
            if let Some(obfs) = &p.obfs {
                let mut o = Map::new();
                o.insert("mode".into(), obfs.kind.clone().into());
                if let Some(host) = &obfs.host {
                    o.insert("host".into(), host.clone().into());
                }
                map.insert("obfs-opts".into(), o.into());
            }
        }
        Payload::Hysteria(p) => {
            map.insert("type".into(), "hysteria".into());
            if let Some(auth) = &p.auth {
                map.insert("auth-str".into(), auth.clone().into());
            }
            if let Some(v) = &p.protocol {
                map.insert("protocol".into(), v.clone().into());
            }
            if let Some(v) = p.up_mbps {
                map.insert("up".into(), v.into());
            }
            if let Some(v) = p.down_mbps {
                map.insert("down".into(), v.into());
            }
            if let Some(v) = &p.obfs {
                map.insert("obfs".into(), v.clone().into());
            }
            put_tls_sni_only(&mut map, &p.tls);
        }
        Payload::Hysteria2(p) => {
            map.insert("type".into(), "hysteria2".into());
            map.insert("password".into(), p.password.clone().into());
            if let Some(obfs) = &p.obfs {
                map.insert("obfs".into(), obfs.kind.clone().into());
                if let Some(pw) = &obfs.password {
                    map.insert("obfs-password".into(), pw.clone().into());
                }
            }
            if let Some(v) = p.up_mbps {
                map.insert("up".into(), v.into());
            }
            if let Some(v) = p.down_mbps {
                map.insert("down".into(), v.into());
            }
            put_tls_sni_only(&mut map, &p.tls);
        }
        Payload::Tuic(p) => {
            map.insert("type".into(), "tuic".into());
            map.insert("uuid".into(), p.uuid.clone().into());
            map.insert("password".into(), p.password.clone().into());
            if let Some(v) = &p.congestion_control {
                map.insert("congestion-controller".into(), v.clone().into());
            }
            if let Some(v) = &p.udp_relay_mode {
                map.insert("udp-relay-mode".into(), v.clone().into());
            }
            put_tls_sni_only(&mut map, &p.tls);
        }
        Payload::WireGuard(p) => {
            map.insert("type".into(), "wireguard".into());
            map.insert("private-key".into(), p.private_key.clone().into());
            map.insert("public-key".into(), p.public_key.clone().into());
            if let Some(v) = &p.preshared_key {
                map.insert("preshared-key".into(), v.clone().into());
            }
            if let Some(ip) = p.address.first() {
                map.insert("ip".into(), ip.clone().into());
            }
            if let Some(ip6) = p.address.get(1) {
                map.insert("ipv6".into(), ip6.clone().into());
            }
            if let Some(v) = p.mtu {
                map.insert("mtu".into(), v.into());
            }
        }
        Payload::AnyTls(p) => {
            map.insert("type".into(), "anytls".into());
            map.insert("password".into(), p.password.clone().into());
            put_tls_sni_only(&mut map, &p.tls);
        }
        Payload::Socks5(p) => {
            map.insert("type".into(), "socks5".into());
            put_user_pass(&mut map, p.username.as_deref(), p.password.as_deref());
            if p.tls.enabled {
                map.insert("tls".into(), true.into());
            }
        }
        Payload::Http(p) => {
            map.insert("type".into(), "http".into());
            put_user_pass(&mut map, p.username.as_deref(), p.password.as_deref());
            if p.tls.enabled {
                map.insert("tls".into(), true.into());
                if let Some(sni) = &p.tls.sni {
                    map.insert("sni".into(), sni.clone().into());
                }
            }
        }
    }
    Ok(Value::Object(map))
}

fn put_user_pass(map: &mut Map<String, Value>, user: Option<&str>, pass: Option<&str>) {
    if let Some(u) = user {
        map.insert("username".into(), u.into());
    }
    if let Some(p) = pass {
        map.insert("password".into(), p.into());
    }
}

fn put_transport(map: &mut Map<String, Value>, t: &Transport) {
    match t.kind {
        TransportKind::Tcp => {}
        TransportKind::Ws => {
            map.insert("network".into(), "ws".into());
            let mut opts = Map::new();
            if let Some(path) = &t.path {
                opts.insert("path".into(), path.clone().into());
            }
            if let Some(host) = &t.host {
                opts.insert("headers".into(), json!({ "Host": host }));
            }
            if !opts.is_empty() {
                map.insert("ws-opts".into(), opts.into());
            }
        }
        TransportKind::Grpc => {
            map.insert("network".into(), "grpc".into());
            if let Some(svc) = &t.service_name {
                map.insert("grpc-opts".into(), json!({ "grpc-service-name": svc }));
            }
        }
        TransportKind::H2 => {
            map.insert("network".into(), "h2".into());
            if let Some(path) = &t.path {
                map.insert("h2-opts".into(), json!({ "path": path }));
            }
        }
        TransportKind::Quic => {
            map.insert("network".into(), "quic".into());
        }
        TransportKind::Kcp => {
            map.insert("network".into(), "kcp".into());
        }
    }
}

/// TLS for the tls-native protocols (trojan, hysteria*, tuic, anytls):
/// no `tls:` flag, the protocol implies it.
fn put_tls_sni_only(map: &mut Map<String, Value>, tls: &Tls) {
    if let Some(sni) = &tls.sni {
        map.insert("sni".into(), sni.clone().into());
    }
    if tls.insecure {
        map.insert("skip-cert-verify".into(), true.into());
    }
    if !tls.alpn.is_empty() {
        map.insert("alpn".into(), tls.alpn.clone().into());
    }
}

fn put_tls(map: &mut Map<String, Value>, tls: &Tls) {
    if !tls.enabled {
        return;
    }
    map.insert("tls".into(), true.into());
    if let Some(sni) = &tls.sni {
        map.insert("servername".into(), sni.clone().into());
    }
    if tls.insecure {
        map.insert("skip-cert-verify".into(), true.into());
    }
    if !tls.alpn.is_empty() {
        map.insert("alpn".into(), tls.alpn.clone().into());
    }
    if let Some(fp) = &tls.fingerprint {
        map.insert("client-fingerprint".into(), fp.clone().into());
    }
    if let Some(reality) = &tls.reality {
        let mut r = Map::new();
        r.insert("public-key".into(), reality.public_key.clone().into());
        if let Some(sid) = &reality.short_id {
            r.insert("short-id".into(), sid.clone().into());
        }
        map.insert("reality-opts".into(), r.into());
    }
}

fn rule_line(rule: &RouteRule) -> String {
    match rule.kind {
        RuleKind::Domain => format!("DOMAIN,{},{}", rule.value, rule.target),
        RuleKind::DomainSuffix => format!("DOMAIN-SUFFIX,{},{}", rule.value, rule.target),
        RuleKind::DomainKeyword => format!("DOMAIN-KEYWORD,{},{}", rule.value, rule.target),
        RuleKind::IpCidr => format!("IP-CIDR,{},{}", rule.value, rule.target),
        RuleKind::GeoIp => format!("GEOIP,{},{}", rule.value, rule.target),
        RuleKind::Final => format!("MATCH,{}", rule.target),
    }
}
