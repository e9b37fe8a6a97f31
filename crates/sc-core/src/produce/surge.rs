//! Surge text producer.
//!
//! Support matrix: ss, vmess, trojan, snell, tuic, hysteria2, socks5,
//! http. vless, ssr, hysteria v1, wireguard and anytls have no Surge
//! rendering and are skipped per node.

use crate::error::ProduceError;
use crate::model::{Node, Payload, Tls, TransportKind};
use crate::produce::{render_each, ProduceOptions, GROUP_AUTO, GROUP_SELECT, TEST_URL};
use crate::ruleset::{RuleKind, RouteRule};

pub fn produce(nodes: &[Node], opts: &ProduceOptions) -> String {
    let rendered = render_each(nodes, "surge", proxy_line);

    let mut out = String::new();
    if let Some(hint) = &opts.filename_hint {
        out.push_str(&format!("#!MANAGED-CONFIG {}\n\n", hint));
    }
    out.push_str("[General]\nskip-proxy = 127.0.0.1, 192.168.0.0/16, 10.0.0.0/8, localhost\ndns-server = system\n\n");

    out.push_str("[Proxy]\n");
    let mut names = Vec::with_capacity(rendered.len());
    for (i, line) in &rendered {
        names.push(nodes[*i].name.as_str());
        out.push_str(line);
        out.push('\n');
    }

    out.push_str("\n[Proxy Group]\n");
    out.push_str(&format!(
        "{} = select, {}, {}\n",
        GROUP_SELECT,
        GROUP_AUTO,
        names.join(", ")
    ));
    out.push_str(&format!(
        "{} = url-test, {}, url = {}, interval = 300\n",
        GROUP_AUTO,
        names.join(", "),
        TEST_URL
    ));

    if let Some(template) = &opts.rule_template {
        out.push_str("\n[Rule]\n");
        for rule in &template.rules {
            out.push_str(&rule_line(rule));
            out.push('\n');
        }
    }
    out
}

fn proxy_line(node: &Node) -> Result<String, ProduceError> {
    let unsupported = |proto: &'static str| ProduceError::Unsupported {
        proto,
        target: "surge",
    };
    let head = format!("{} = ", node.name);
    let mut parts: Vec<String>;
    match &node.payload {
        Payload::Shadowsocks(p) => {
            parts = vec![
                "ss".into(),
                node.server.clone(),
                node.port.to_string(),
                format!("encrypt-method={}", p.cipher),
                format!("password={}", p.password),
            ];
            if p.plugin.as_deref() == Some("obfs-local") || p.plugin.as_deref() == Some("simple-obfs")
            {
                for (k, v) in &p.plugin_opts {
                    match k.as_str() {
                        "obfs" => parts.push(format!("obfs={}", v)),
                        "obfs-host" => parts.push(format!("obfs-host={}", v)),
                        _ => {}
                    }
                }
            }
            if node.udp {
                parts.push("udp-relay=true".into());
            }
        }
        Payload::Vmess(p) => {
            parts = vec![
                "vmess".into(),
                node.server.clone(),
                node.port.to_string(),
                format!("username={}", p.uuid),
            ];
            match p.transport.kind {
                TransportKind::Tcp => {}
                TransportKind::Ws => {
                    parts.push("ws=true".into());
                    if let Some(path) = &p.transport.path {
                        parts.push(format!("ws-path={}", path));
                    }
                    if let Some(host) = &p.transport.host {
                        parts.push(format!("ws-headers=Host:{}", host));
                    }
                }
                _ => return Err(unsupported("vmess")),
            }
            push_tls(&mut parts, &p.tls);
        }
        Payload::Trojan(p) => {
            parts = vec![
                "trojan".into(),
                node.server.clone(),
                node.port.to_string(),
                format!("password={}", p.password),
            ];
            push_tls(&mut parts, &p.tls);
        }
        Payload::Snell(p) => {
            parts = vec![
                "snell".into(),
                node.server.clone(),
                node.port.to_string(),
                format!("psk={}", p.psk),
                format!("version={}", p.version),
            ];
            if let Some(obfs) = &p.obfs {
                parts.push(format!("obfs={}", obfs.kind));
                if let Some(host) = &obfs.host {
                    parts.push(format!("obfs-host={}", host));
                }
            }
        }
        Payload::Tuic(p) => {
            parts = vec![
                "tuic-v5".into(),
                node.server.clone(),
                node.port.to_string(),
                format!("uuid={}", p.uuid),
                format!("password={}", p.password),
            ];
            if !p.tls.alpn.is_empty() {
                parts.push(format!("alpn={}", p.tls.alpn.join(",")));
            }
            push_tls(&mut parts, &p.tls);
        }
        Payload::Hysteria2(p) => {
            parts = vec![
                "hysteria2".into(),
                node.server.clone(),
                node.port.to_string(),
                format!("password={}", p.password),
            ];
            push_tls(&mut parts, &p.tls);
        }
        Payload::Socks5(p) => {
            let kind = if p.tls.enabled { "socks5-tls" } else { "socks5" };
            parts = vec![kind.into(), node.server.clone(), node.port.to_string()];
            push_user_pass(&mut parts, p.username.as_deref(), p.password.as_deref());
        }
        Payload::Http(p) => {
            let kind = if p.tls.enabled { "https" } else { "http" };
            parts = vec![kind.into(), node.server.clone(), node.port.to_string()];
            push_user_pass(&mut parts, p.username.as_deref(), p.password.as_deref());
        }
        Payload::Vless(_) => return Err(unsupported("vless")),
        Payload::ShadowsocksR(_) => return Err(unsupported("ssr")),
        Payload::Hysteria(_) => return Err(unsupported("hysteria")),
        Payload::WireGuard(_) => return Err(unsupported("wireguard")),
        Payload::AnyTls(_) => return Err(unsupported("anytls")),
    }
    Ok(format!("{}{}", head, parts.join(", ")))
}

fn push_user_pass(parts: &mut Vec<String>, user: Option<&str>, pass: Option<&str>) {
    if let Some(u) = user {
        parts.push(u.to_string());
    }
    if let Some(p) = pass {
        parts.push(p.to_string());
    }
}

fn push_tls(parts: &mut Vec<String>, tls: &Tls) {
    if tls.enabled {
        // tls-native protocols repeat it harmlessly.
        if let Some(sni) = &tls.sni {
            parts.push(format!("sni={}", sni));
        }
        if tls.insecure {
            parts.push("skip-cert-verify=true".into());
        }
    }
}

fn rule_line(rule: &RouteRule) -> String {
    match rule.kind {
        RuleKind::Domain => format!("DOMAIN,{},{}", rule.value, rule.target),
        RuleKind::DomainSuffix => format!("DOMAIN-SUFFIX,{},{}", rule.value, rule.target),
        RuleKind::DomainKeyword => format!("DOMAIN-KEYWORD,{},{}", rule.value, rule.target),
        RuleKind::IpCidr => format!("IP-CIDR,{},{}", rule.value, rule.target),
        RuleKind::GeoIp => format!("GEOIP,{},{}", rule.value, rule.target),
        RuleKind::Final => format!("FINAL,{}", rule.target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Shadowsocks, Vless};

    #[test]
    fn vless_is_omitted_without_error() {
        let nodes = vec![
            Node {
                name: "V".into(),
                server: "v.example".into(),
                port: 443,
                udp: true,
                raw_uri: None,
                payload: Payload::Vless(Vless {
                    uuid: "u".into(),
                    ..Vless::default()
                }),
            },
            Node {
                name: "S".into(),
                server: "1.2.3.4".into(),
                port: 8388,
                udp: true,
                raw_uri: None,
                payload: Payload::Shadowsocks(Shadowsocks {
                    cipher: "aes-256-gcm".into(),
                    password: "pw".into(),
                    plugin: None,
                    plugin_opts: Vec::new(),
                }),
            },
        ];
        let doc = produce(&nodes, &ProduceOptions::default());
        assert!(doc.contains("S = ss, 1.2.3.4, 8388"));
        assert!(!doc.contains("V = "));
        // The skipped node must not appear in the groups either.
        assert!(doc.contains("PROXY = select, AUTO, S"));
    }
}
