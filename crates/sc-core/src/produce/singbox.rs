//! JSON config producer (sing-box outbound vocabulary:
//! `type`/`tag`/`server`/`server_port` with nested `tls`/`transport`).
//! ssr and snell have no representation here and are skipped per node.

use serde_json::{json, Map, Value};

use crate::error::ProduceError;
use crate::model::{Node, Payload, Tls, Transport, TransportKind};
use crate::produce::{render_each, ProduceOptions, GROUP_AUTO, GROUP_SELECT, TEST_URL};
use crate::ruleset::{RuleKind, RouteRule, RuleTemplate};

pub fn produce(nodes: &[Node], opts: &ProduceOptions) -> String {
    let rendered = render_each(nodes, "singbox", outbound_value);

    let mut outbounds: Vec<Value> = Vec::with_capacity(rendered.len() + 2);
    let mut names: Vec<String> = Vec::with_capacity(rendered.len());
    for (i, value) in rendered {
        names.push(nodes[i].name.clone());
        outbounds.push(value);
    }
    let mut select_members = vec![Value::from(GROUP_AUTO)];
    select_members.extend(names.iter().map(|n| Value::from(n.as_str())));
    outbounds.push(json!({
        "type": "selector",
        "tag": GROUP_SELECT,
        "outbounds": select_members,
        "default": GROUP_AUTO,
    }));
    outbounds.push(json!({
        "type": "urltest",
        "tag": GROUP_AUTO,
        "outbounds": names,
        "url": TEST_URL,
        "interval": "5m",
    }));

    let mut root = Map::new();
    root.insert("outbounds".into(), outbounds.into());
    if let Some(template) = &opts.rule_template {
        root.insert("route".into(), json!({ "rules": route_rules(template) }));
    }
    serde_json::to_string_pretty(&Value::Object(root)).unwrap_or_else(|_| "{}".to_string())
}

fn outbound_value(node: &Node) -> Result<Value, ProduceError> {
    let mut map = Map::new();
    map.insert("tag".into(), node.name.clone().into());
    map.insert("server".into(), node.server.clone().into());
    map.insert("server_port".into(), node.port.into());

    match &node.payload {
        Payload::Shadowsocks(p) => {
            map.insert("type".into(), "shadowsocks".into());
            map.insert("method".into(), p.cipher.clone().into());
            map.insert("password".into(), p.password.clone().into());
            if let Some(plugin) = &p.plugin {
                map.insert("plugin".into(), plugin.clone().into());
                let opts: Vec<String> = p
                    .plugin_opts
                    .iter()
                    .map(|(k, v)| {
                        if v.is_empty() {
                            k.clone()
                        } else {
                            format!("{k}={v}")
                        }
                    })
                    .collect();
                map.insert("plugin_opts".into(), opts.join(";").into());
            }
        }
        Payload::Vmess(p) => {
            map.insert("type".into(), "vmess".into());
            map.insert("uuid".into(), p.uuid.clone().into());
            map.insert("security".into(), p.security.clone().into());
            if p.alter_id > 0 {
                map.insert("alter_id".into(), p.alter_id.into());
            }
            put_transport(&mut map, &p.transport);
            put_tls(&mut map, &p.tls, &node.server);
        }
        Payload::Vless(p) => {
            map.insert("type".into(), "vless".into());
            map.insert("uuid".into(), p.uuid.clone().into());
            if let Some(flow) = &p.flow {
                map.insert("flow".into(), flow.clone().into());
            }
            put_transport(&mut map, &p.transport);
            put_tls(&mut map, &p.tls, &node.server);
        }
        Payload::Trojan(p) => {
            map.insert("type".into(), "trojan".into());
            map.insert("password".into(), p.password.clone().into());
            put_transport(&mut map, &p.transport);
            put_tls(&mut map, &p.tls, &node.server);
        }
        Payload::Hysteria(p) => {
            map.insert("type".into(), "hysteria".into());
            if let Some(auth) = &p.auth {
                map.insert("auth_str".into(), auth.clone().into());
            }
            if let Some(v) = p.up_mbps {
                map.insert("up_mbps".into(), v.into());
            }
            if let Some(v) = p.down_mbps {
                map.insert("down_mbps".into(), v.into());
            }
            if let Some(obfs) = &p.obfs {
                map.insert("obfs".into(), obfs.clone().into());
            }
            put_tls(&mut map, &p.tls, &node.server);
        }
        Payload::Hysteria2(p) => {
            map.insert("type".into(), "hysteria2".into());
            map.insert("password".into(), p.password.clone().into());
            if let Some(obfs) = &p.obfs {
                map.insert(
                    "obfs".into(),
                    json!({
                        "type": obfs.kind,
                        "password": obfs.password.clone().unwrap_or_default(),
                    }),
                );
            }
            if let Some(v) = p.up_mbps {
                map.insert("up_mbps".into(), v.into());
            }
            if let Some(v) = p.down_mbps {
                map.insert("down_mbps".into(), v.into());
            }
            put_tls(&mut map, &p.tls, &node.server);
        }
        Payload::Tuic(p) => {
            map.insert("type".into(), "tuic".into());
            map.insert("uuid".into(), p.uuid.clone().into());
            map.insert("password".into(), p.password.clone().into());
            if let Some(v) = &p.congestion_control {
                map.insert("congestion_control".into(), v.clone().into());
            }
            if let Some(v) = &p.udp_relay_mode {
                map.insert("udp_relay_mode".into(), v.clone().into());
            }
            put_tls(&mut map, &p.tls, &node.server);
        }
        Payload::WireGuard(p) => {
            map.insert("type".into(), "wireguard".into());
            map.insert("private_key".into(), p.private_key.clone().into());
            map.insert("peer_public_key".into(), p.public_key.clone().into());
            if let Some(v) = &p.preshared_key {
                map.insert("pre_shared_key".into(), v.clone().into());
            }
            if !p.address.is_empty() {
                map.insert("local_address".into(), p.address.clone().into());
            }
            if let Some(v) = p.mtu {
                map.insert("mtu".into(), v.into());
            }
            if let Some(v) = &p.reserved {
                map.insert("reserved".into(), v.clone().into());
            }
        }
        Payload::AnyTls(p) => {
            map.insert("type".into(), "anytls".into());
            map.insert("password".into(), p.password.clone().into());
            put_tls(&mut map, &p.tls, &node.server);
        }
        Payload::Socks5(p) => {
            map.insert("type".into(), "socks".into());
            map.insert("version".into(), "5".into());
            if let Some(u) = &p.username {
                map.insert("username".into(), u.clone().into());
            }
            if let Some(pw) = &p.password {
                map.insert("password".into(), pw.clone().into());
            }
        }
        Payload::Http(p) => {
            map.insert("type".into(), "http".into());
            if let Some(u) = &p.username {
                map.insert("username".into(), u.clone().into());
            }
            if let Some(pw) = &p.password {
                map.insert("password".into(), pw.clone().into());
            }
            put_tls(&mut map, &p.tls, &node.server);
        }
        Payload::ShadowsocksR(_) => {
            return Err(ProduceError::Unsupported {
                proto: "ssr",
                target: "singbox",
            })
        }
        Payload::Snell(_) => {
            return Err(ProduceError::Unsupported {
                proto: "snell",
                target: "singbox",
            })
        }
    }
    Ok(Value::Object(map))
}

fn put_transport(map: &mut Map<String, Value>, t: &Transport) {
    let value = match t.kind {
        TransportKind::Tcp | TransportKind::Quic | TransportKind::Kcp => return,
        TransportKind::Ws => {
            let mut v = Map::new();
            v.insert("type".into(), "ws".into());
            v.insert("path".into(), t.path.clone().unwrap_or_else(|| "/".into()).into());
            if let Some(host) = &t.host {
                v.insert("headers".into(), json!({ "Host": host }));
            }
            Value::Object(v)
        }
        TransportKind::Grpc => json!({
            "type": "grpc",
            "service_name": t.service_name.clone().unwrap_or_default(),
        }),
        TransportKind::H2 => {
            let mut v = Map::new();
            v.insert("type".into(), "http".into());
            if let Some(path) = &t.path {
                v.insert("path".into(), path.clone().into());
            }
            if let Some(host) = &t.host {
                v.insert("host".into(), json!([host]));
            }
            Value::Object(v)
        }
    };
    map.insert("transport".into(), value);
}

fn put_tls(map: &mut Map<String, Value>, tls: &Tls, server: &str) {
    if !tls.enabled {
        return;
    }
    let mut v = Map::new();
    v.insert("enabled".into(), true.into());
    v.insert(
        "server_name".into(),
        tls.sni.clone().unwrap_or_else(|| server.to_string()).into(),
    );
    if tls.insecure {
        v.insert("insecure".into(), true.into());
    }
    if !tls.alpn.is_empty() {
        v.insert("alpn".into(), tls.alpn.clone().into());
    }
    if let Some(fp) = &tls.fingerprint {
        v.insert("utls".into(), json!({ "enabled": true, "fingerprint": fp }));
    }
    if let Some(reality) = &tls.reality {
        v.insert(
            "reality".into(),
            json!({
                "enabled": true,
                "public_key": reality.public_key,
                "short_id": reality.short_id.clone().unwrap_or_default(),
            }),
        );
    }
    map.insert("tls".into(), Value::Object(v));
}

fn route_rules(template: &RuleTemplate) -> Vec<Value> {
    template.rules.iter().map(route_rule).collect()
}

fn route_rule(rule: &RouteRule) -> Value {
    let outbound = rule.target.as_str();
    match rule.kind {
        RuleKind::Domain => json!({ "domain": [rule.value], "outbound": outbound }),
        RuleKind::DomainSuffix => json!({ "domain_suffix": [rule.value], "outbound": outbound }),
        RuleKind::DomainKeyword => json!({ "domain_keyword": [rule.value], "outbound": outbound }),
        RuleKind::IpCidr => json!({ "ip_cidr": [rule.value], "outbound": outbound }),
        RuleKind::GeoIp => json!({ "geoip": [rule.value], "outbound": outbound }),
        RuleKind::Final => json!({ "outbound": outbound }),
    }
}
