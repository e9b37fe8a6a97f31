//! Quantumult X text producer.
//!
//! Emits `[server_local]` node lines plus `[policy]` groups and an
//! optional `[filter_local]` block. Support matrix: ss, ssr, vmess,
//! trojan, http, socks5.

use crate::error::ProduceError;
use crate::model::{Node, Payload, Tls, Transport, TransportKind};
use crate::produce::{render_each, ProduceOptions, GROUP_AUTO, GROUP_SELECT, TEST_URL};
use crate::ruleset::{RuleKind, RouteRule};

pub fn produce(nodes: &[Node], opts: &ProduceOptions) -> String {
    let rendered = render_each(nodes, "quantumult-x", server_line);

    let mut out = String::new();
    if let Some(hint) = &opts.filename_hint {
        out.push_str(&format!("; {}\n\n", hint));
    }
    out.push_str("[server_local]\n");
    let mut names = Vec::with_capacity(rendered.len());
    for (i, line) in &rendered {
        names.push(nodes[*i].name.as_str());
        out.push_str(line);
        out.push('\n');
    }

    out.push_str("\n[policy]\n");
    out.push_str(&format!(
        "static={}, {}, {}\n",
        GROUP_SELECT,
        GROUP_AUTO,
        names.join(", ")
    ));
    out.push_str(&format!(
        "url-latency-benchmark={}, {}, check-interval=300, server-check-url={}\n",
        GROUP_AUTO,
        names.join(", "),
        TEST_URL
    ));

    if let Some(template) = &opts.rule_template {
        out.push_str("\n[filter_local]\n");
        for rule in &template.rules {
            out.push_str(&rule_line(rule));
            out.push('\n');
        }
    }
    out
}

fn server_line(node: &Node) -> Result<String, ProduceError> {
    let unsupported = |proto: &'static str| ProduceError::Unsupported {
        proto,
        target: "quantumult-x",
    };
    let addr = format!("{}:{}", node.server, node.port);
    let mut parts: Vec<String>;
    match &node.payload {
        Payload::Shadowsocks(p) => {
            parts = vec![
                format!("shadowsocks={}", addr),
                format!("method={}", p.cipher),
                format!("password={}", p.password),
            ];
            if p.plugin.is_some() {
                for (k, v) in &p.plugin_opts {
                    match k.as_str() {
                        "obfs" => parts.push(format!("obfs={}", v)),
                        "obfs-host" => parts.push(format!("obfs-host={}", v)),
                        _ => {}
                    }
                }
            }
            parts.push(format!("udp-relay={}", node.udp));
        }
        Payload::ShadowsocksR(p) => {
            parts = vec![
                format!("shadowsocks={}", addr),
                format!("method={}", p.cipher),
                format!("password={}", p.password),
                format!("ssr-protocol={}", p.protocol),
                format!("obfs={}", p.obfs),
            ];
            if let Some(v) = &p.protocol_param {
                parts.push(format!("ssr-protocol-param={}", v));
            }
            if let Some(v) = &p.obfs_param {
                parts.push(format!("obfs-host={}", v));
            }
        }
        Payload::Vmess(p) => {
            parts = vec![
                format!("vmess={}", addr),
                format!("method={}", normalize_vmess_method(&p.security)),
                format!("password={}", p.uuid),
            ];
            push_obfs(&mut parts, &p.transport, &p.tls)?;
            parts.push(format!("udp-relay={}", node.udp));
        }
        Payload::Trojan(p) => {
            parts = vec![
                format!("trojan={}", addr),
                format!("password={}", p.password),
            ];
            if p.tls.enabled {
                parts.push("over-tls=true".into());
                if let Some(sni) = &p.tls.sni {
                    parts.push(format!("tls-host={}", sni));
                }
                parts.push(format!("tls-verification={}", !p.tls.insecure));
            }
        }
        Payload::Http(p) => {
            parts = vec![format!("http={}", addr)];
            push_user_pass(&mut parts, p.username.as_deref(), p.password.as_deref());
            if p.tls.enabled {
                parts.push("over-tls=true".into());
            }
        }
        Payload::Socks5(p) => {
            parts = vec![format!("socks5={}", addr)];
            push_user_pass(&mut parts, p.username.as_deref(), p.password.as_deref());
        }
        Payload::Vless(_) => return Err(unsupported("vless")),
        Payload::Hysteria(_) => return Err(unsupported("hysteria")),
        Payload::Hysteria2(_) => return Err(unsupported("hysteria2")),
        Payload::Tuic(_) => return Err(unsupported("tuic")),
        Payload::WireGuard(_) => return Err(unsupported("wireguard")),
        Payload::AnyTls(_) => return Err(unsupported("anytls")),
        Payload::Snell(_) => return Err(unsupported("snell")),
    }
    parts.push(format!("tag={}", node.name));
    Ok(parts.join(", "))
}

/// Quantumult X rejects `auto`; map it to a concrete cipher.
fn normalize_vmess_method(security: &str) -> &str {
    match security {
        "auto" | "" => "chacha20-poly1305",
        other => other,
    }
}

fn push_user_pass(parts: &mut Vec<String>, user: Option<&str>, pass: Option<&str>) {
    if let Some(u) = user {
        parts.push(format!("username={}", u));
    }
    if let Some(p) = pass {
        parts.push(format!("password={}", p));
    }
}

fn push_obfs(parts: &mut Vec<String>, transport: &Transport, tls: &Tls) -> Result<(), ProduceError> {
    match (transport.kind, tls.enabled) {
        (TransportKind::Tcp, false) => {}
        (TransportKind::Tcp, true) => parts.push("obfs=over-tls".into()),
        (TransportKind::Ws, enabled) => {
            parts.push(if enabled { "obfs=wss".into() } else { "obfs=ws".into() });
            if let Some(path) = &transport.path {
                parts.push(format!("obfs-uri={}", path));
            }
            if let Some(host) = &transport.host {
                parts.push(format!("obfs-host={}", host));
            }
        }
        _ => {
            return Err(ProduceError::Unsupported {
                proto: "vmess",
                target: "quantumult-x",
            })
        }
    }
    if tls.enabled {
        if let Some(sni) = &tls.sni {
            parts.push(format!("tls-host={}", sni));
        }
        parts.push(format!("tls-verification={}", !tls.insecure));
    }
    Ok(())
}

fn rule_line(rule: &RouteRule) -> String {
    match rule.kind {
        RuleKind::Domain => format!("host, {}, {}", rule.value, rule.target),
        RuleKind::DomainSuffix => format!("host-suffix, {}, {}", rule.value, rule.target),
        RuleKind::DomainKeyword => format!("host-keyword, {}, {}", rule.value, rule.target),
        RuleKind::IpCidr => format!("ip-cidr, {}, {}", rule.value, rule.target),
        RuleKind::GeoIp => format!("geoip, {}, {}", rule.value, rule.target),
        RuleKind::Final => format!("final, {}", rule.target),
    }
}
