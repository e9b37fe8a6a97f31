//! Loon text producer.
//!
//! Support matrix: ss, ssr, vmess, vless, trojan, http, socks5,
//! hysteria2. Everything else is skipped per node.

use crate::error::ProduceError;
use crate::model::{Node, Payload, Tls, Transport, TransportKind};
use crate::produce::{render_each, ProduceOptions, GROUP_AUTO, GROUP_SELECT, TEST_URL};
use crate::ruleset::{RuleKind, RouteRule};

pub fn produce(nodes: &[Node], opts: &ProduceOptions) -> String {
    let rendered = render_each(nodes, "loon", proxy_line);

    let mut out = String::new();
    if let Some(hint) = &opts.filename_hint {
        out.push_str(&format!("# {}\n\n", hint));
    }
    out.push_str("[Proxy]\n");
    let mut names = Vec::with_capacity(rendered.len());
    for (i, line) in &rendered {
        names.push(nodes[*i].name.as_str());
        out.push_str(line);
        out.push('\n');
    }

    out.push_str("\n[Proxy Group]\n");
    out.push_str(&format!(
        "{} = select,{},{}\n",
        GROUP_SELECT,
        GROUP_AUTO,
        names.join(",")
    ));
    out.push_str(&format!(
        "{} = url-test,{},url = {},interval = 300\n",
        GROUP_AUTO,
        names.join(","),
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
    let head = format!("{} = ", node.name);
    let mut parts: Vec<String>;
    match &node.payload {
        Payload::Shadowsocks(p) => {
            parts = vec![
                "Shadowsocks".into(),
                node.server.clone(),
                node.port.to_string(),
                p.cipher.clone(),
                format!("\"{}\"", p.password),
            ];
            if node.udp {
                parts.push("udp=true".into());
            }
        }
        Payload::ShadowsocksR(p) => {
            parts = vec![
                "ShadowsocksR".into(),
                node.server.clone(),
                node.port.to_string(),
                p.cipher.clone(),
                format!("\"{}\"", p.password),
                format!("protocol={}", p.protocol),
                format!("obfs={}", p.obfs),
            ];
            if let Some(v) = &p.protocol_param {
                parts.push(format!("protocol-param={}", v));
            }
            if let Some(v) = &p.obfs_param {
                parts.push(format!("obfs-param={}", v));
            }
        }
        Payload::Vmess(p) => {
            parts = vec![
                "vmess".into(),
                node.server.clone(),
                node.port.to_string(),
                p.security.clone(),
                format!("\"{}\"", p.uuid),
                format!("alterId={}", p.alter_id),
            ];
            push_transport(&mut parts, &p.transport)?;
            push_tls(&mut parts, &p.tls);
        }
        Payload::Vless(p) => {
            parts = vec![
                "VLESS".into(),
                node.server.clone(),
                node.port.to_string(),
                format!("\"{}\"", p.uuid),
            ];
            if let Some(flow) = &p.flow {
                parts.push(format!("flow={}", flow));
            }
            push_transport(&mut parts, &p.transport)?;
            push_tls(&mut parts, &p.tls);
            if let Some(reality) = &p.tls.reality {
                parts.push(format!("public-key={}", reality.public_key));
                if let Some(sid) = &reality.short_id {
                    parts.push(format!("short-id={}", sid));
                }
            }
        }
        Payload::Trojan(p) => {
            parts = vec![
                "trojan".into(),
                node.server.clone(),
                node.port.to_string(),
                format!("\"{}\"", p.password),
            ];
            push_transport(&mut parts, &p.transport)?;
            push_tls(&mut parts, &p.tls);
        }
        Payload::Hysteria2(p) => {
            parts = vec![
                "Hysteria2".into(),
                node.server.clone(),
                node.port.to_string(),
                format!("\"{}\"", p.password),
            ];
            push_tls(&mut parts, &p.tls);
        }
        Payload::Http(p) => {
            let kind = if p.tls.enabled { "https" } else { "http" };
            parts = vec![kind.into(), node.server.clone(), node.port.to_string()];
            if let (Some(u), Some(pw)) = (&p.username, &p.password) {
                parts.push(u.clone());
                parts.push(format!("\"{}\"", pw));
            }
        }
        Payload::Socks5(p) => {
            parts = vec![
                "socks5".into(),
                node.server.clone(),
                node.port.to_string(),
            ];
            if let (Some(u), Some(pw)) = (&p.username, &p.password) {
                parts.push(u.clone());
                parts.push(format!("\"{}\"", pw));
            }
            if p.tls.enabled {
                parts.push("over-tls=true".into());
            }
        }
        Payload::Hysteria(_) => return Err(unsupported("hysteria")),
        Payload::Tuic(_) => return Err(unsupported("tuic")),
        Payload::WireGuard(_) => return Err(unsupported("wireguard")),
        Payload::AnyTls(_) => return Err(unsupported("anytls")),
        Payload::Snell(_) => return Err(unsupported("snell")),
    }
    Ok(format!("{}{}", head, parts.join(",")))
}

fn unsupported(proto: &'static str) -> ProduceError {
    ProduceError::Unsupported {
        proto,
        target: "loon",
    }
}

fn push_transport(parts: &mut Vec<String>, transport: &Transport) -> Result<(), ProduceError> {
    match transport.kind {
        TransportKind::Tcp => parts.push("transport=tcp".into()),
        TransportKind::Ws => {
            parts.push("transport=ws".into());
            if let Some(path) = &transport.path {
                parts.push(format!("path={}", path));
            }
            if let Some(host) = &transport.host {
                parts.push(format!("host={}", host));
            }
        }
        _ => return Err(unsupported("transport")),
    }
    Ok(())
}

fn push_tls(parts: &mut Vec<String>, tls: &Tls) {
    if tls.enabled {
        parts.push("over-tls=true".into());
        if let Some(sni) = &tls.sni {
            parts.push(format!("tls-name={}", sni));
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
    use crate::model::{Shadowsocks, Snell};

    #[test]
    fn snell_is_skipped() {
        let nodes = vec![
            Node {
                name: "A".into(),
                server: "a.example".into(),
                port: 443,
                udp: true,
                raw_uri: None,
                payload: Payload::Snell(Snell {
                    psk: "k".into(),
                    version: 4,
                    obfs: None,
                }),
            },
            Node {
                name: "B".into(),
                server: "b.example".into(),
                port: 8388,
                udp: true,
                raw_uri: None,
                payload: Payload::Shadowsocks(Shadowsocks {
                    cipher: "aes-128-gcm".into(),
                    password: "pw".into(),
                    plugin: None,
                    plugin_opts: Vec::new(),
                }),
            },
        ];
        let doc = produce(&nodes, &ProduceOptions::default());
        assert!(doc.contains("B = Shadowsocks,b.example,8388,aes-128-gcm,\"pw\""));
        assert!(!doc.contains("A = "));
    }
}
