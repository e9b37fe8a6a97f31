//! Pure transformations over a node sequence: filter, dedupe, rename.
//! 节点序列上的纯变换：过滤、去重、改名。

use std::collections::HashMap;

use regex::RegexBuilder;
use tracing::debug;

use crate::model::Node;

/// Options for one [`process`] call.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub dedupe: bool,
    /// Source label prefixed onto every node name.
    pub rename_label: Option<String>,
}

/// One compiled filter rule.
enum Rule {
    /// `proto:ss,vmess`: match by protocol set.
    Proto(Vec<String>),
    /// Valid regex, matched against the display name.
    Pattern(regex::Regex),
    /// Invalid-regex fallback: case-insensitive substring on the name.
    Substr(String),
}

impl Rule {
    fn compile(raw: &str) -> Self {
        if let Some(protos) = raw.strip_prefix("proto:") {
            let mut set = Vec::new();
            for tok in protos.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                match tok.to_ascii_lowercase().as_str() {
                    // `ss` is the family alias: it covers ssr too.
                    "ss" | "shadowsocks" => {
                        set.push("ss".to_string());
                        set.push("ssr".to_string());
                    }
                    "ssr" | "shadowsocksr" => set.push("ssr".to_string()),
                    "hy2" => set.push("hysteria2".to_string()),
                    "wg" => set.push("wireguard".to_string()),
                    "socks" => set.push("socks5".to_string()),
                    other => set.push(other.to_string()),
                }
            }
            return Self::Proto(set);
        }
        match RegexBuilder::new(raw).case_insensitive(true).build() {
            Ok(re) => Self::Pattern(re),
            Err(_) => {
                debug!(rule = raw, "invalid regex, degrading to substring match");
                Self::Substr(raw.to_ascii_lowercase())
            }
        }
    }

    fn matches(&self, node: &Node) -> bool {
        match self {
            Self::Proto(set) => set.iter().any(|p| p == node.proto()),
            Self::Pattern(re) => re.is_match(&node.name),
            Self::Substr(needle) => node.name.to_ascii_lowercase().contains(needle),
        }
    }
}

/// Keep nodes matching no exclude rule and, when include rules exist,
/// at least one include rule. Exclusion always wins.
pub fn filter(nodes: Vec<Node>, include: &[String], exclude: &[String]) -> Vec<Node> {
    let include: Vec<Rule> = include.iter().map(|r| Rule::compile(r)).collect();
    let exclude: Vec<Rule> = exclude.iter().map(|r| Rule::compile(r)).collect();
    nodes
        .into_iter()
        .filter(|node| {
            if exclude.iter().any(|r| r.matches(node)) {
                return false;
            }
            include.is_empty() || include.iter().any(|r| r.matches(node))
        })
        .collect()
}

/// Deduplication identity: protocol + endpoint + primary credential,
/// extended with the transport identity for stream-capable protocols.
/// TLS parameters are not part of it: two listings of the same
/// endpoint that differ only in SNI or Reality keys merge.
pub fn fingerprint(node: &Node) -> String {
    let mut fp = format!("{}://{}:{}", node.proto(), node.server, node.port);
    if let Some(cred) = node.credential() {
        fp.push('|');
        fp.push_str(cred);
    }
    if let Some(t) = node.transport() {
        fp.push('|');
        fp.push_str(t.kind.as_str());
        if let Some(path) = &t.path {
            fp.push('|');
            fp.push_str(path);
        }
        if let Some(svc) = &t.service_name {
            fp.push('|');
            fp.push_str(svc);
        }
    }
    fp
}

/// Collapse nodes sharing a fingerprint to the one with the shortest
/// name; ties keep the first seen. First-occurrence order is preserved.
pub fn dedupe(nodes: Vec<Node>) -> Vec<Node> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        let fp = fingerprint(&node);
        match seen.get(&fp) {
            Some(&slot) => {
                if node.name.len() < out[slot].name.len() {
                    out[slot] = node;
                }
            }
            None => {
                seen.insert(fp, out.len());
                out.push(node);
            }
        }
    }
    out
}

/// Prefix every name with `label - `, skipping names already prefixed
/// (renaming is idempotent).
pub fn rename(nodes: Vec<Node>, label: &str) -> Vec<Node> {
    let prefix = format!("{} - ", label);
    nodes
        .into_iter()
        .map(|mut node| {
            if !node.name.starts_with(&prefix) {
                node.name = format!("{}{}", prefix, node.name);
            }
            node
        })
        .collect()
}

/// Full pipeline: filter, then dedupe, then rename.
pub fn process(nodes: Vec<Node>, opts: &ProcessOptions) -> Vec<Node> {
    let mut nodes = filter(nodes, &opts.include, &opts.exclude);
    if opts.dedupe {
        nodes = dedupe(nodes);
    }
    if let Some(label) = opts.rename_label.as_deref().filter(|l| !l.is_empty()) {
        nodes = rename(nodes, label);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    fn ss_node(name: &str, server: &str, port: u16, password: &str) -> Node {
        Node {
            name: name.to_string(),
            server: server.to_string(),
            port,
            udp: true,
            raw_uri: None,
            payload: Payload::Shadowsocks(Shadowsocks {
                cipher: "aes-256-gcm".to_string(),
                password: password.to_string(),
                plugin: None,
                plugin_opts: Vec::new(),
            }),
        }
    }

    fn vless_node(name: &str, sni: Option<&str>) -> Node {
        Node {
            name: name.to_string(),
            server: "v.example".to_string(),
            port: 443,
            udp: true,
            raw_uri: None,
            payload: Payload::Vless(Vless {
                uuid: "uuid".to_string(),
                flow: None,
                transport: Transport::default(),
                tls: Tls {
                    enabled: true,
                    sni: sni.map(str::to_string),
                    ..Tls::default()
                },
            }),
        }
    }

    #[test]
    fn exclusion_wins_over_inclusion() {
        let nodes = vec![ss_node("HK-1", "a", 1, "x"), ss_node("US-1", "b", 2, "x")];
        let kept = filter(
            nodes,
            &["HK".to_string()],
            &["HK-1".to_string()],
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn include_never_grows_the_set() {
        let nodes = vec![ss_node("HK-1", "a", 1, "x"), ss_node("US-1", "b", 2, "x")];
        let exclude = vec!["US".to_string()];
        let unconstrained = filter(nodes.clone(), &[], &exclude);
        let constrained = filter(nodes, &["nomatch".to_string()], &exclude);
        assert!(constrained.len() <= unconstrained.len());
        for n in &constrained {
            assert!(unconstrained.iter().any(|u| u.name == n.name));
        }
    }

    #[test]
    fn proto_rule_ss_alias_covers_ssr() {
        let ssr = Node {
            payload: Payload::ShadowsocksR(ShadowsocksR::default()),
            ..ss_node("R", "c", 3, "x")
        };
        let nodes = vec![ss_node("S", "a", 1, "x"), ssr, vless_node("V", None)];
        let kept = filter(nodes, &["proto:ss".to_string()], &[]);
        let protos: Vec<_> = kept.iter().map(|n| n.proto()).collect();
        assert_eq!(protos, vec!["ss", "ssr"]);
    }

    #[test]
    fn invalid_regex_degrades_to_substring() {
        let nodes = vec![ss_node("HK [Pro]", "a", 1, "x"), ss_node("US", "b", 2, "x")];
        // Unbalanced bracket: not a valid regex.
        let kept = filter(nodes, &["hk [pro".to_string()], &[]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "HK [Pro]");
    }

    #[test]
    fn dedupe_keeps_shortest_name() {
        let nodes = vec![
            ss_node("Long Name Node", "1.2.3.4", 8388, "pw"),
            ss_node("Short", "1.2.3.4", 8388, "pw"),
            ss_node("Other", "1.2.3.4", 8389, "pw"),
        ];
        let out = dedupe(nodes);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "Short");
    }

    #[test]
    fn dedupe_is_order_insensitive_on_fingerprints() {
        let a = ss_node("AA", "1.2.3.4", 8388, "pw");
        let b = ss_node("B", "1.2.3.4", 8388, "pw");
        let c = ss_node("CCC", "5.6.7.8", 443, "pw");
        let fwd = dedupe(vec![a.clone(), b.clone(), c.clone()]);
        let rev = dedupe(vec![c, b, a]);
        let mut fwd_fp: Vec<_> = fwd.iter().map(fingerprint).collect();
        let mut rev_fp: Vec<_> = rev.iter().map(fingerprint).collect();
        fwd_fp.sort();
        rev_fp.sort();
        assert_eq!(fwd_fp, rev_fp);
        // Shortest-name survivor is the same either way.
        assert!(fwd.iter().any(|n| n.name == "B"));
        assert!(rev.iter().any(|n| n.name == "B"));
    }

    #[test]
    fn dedupe_ignores_tls_params() {
        let nodes = vec![
            vless_node("One", Some("a.example")),
            vless_node("Two", Some("b.example")),
        ];
        assert_eq!(dedupe(nodes).len(), 1);
    }

    #[test]
    fn different_transport_paths_stay_distinct() {
        let mut a = vless_node("A", None);
        let mut b = vless_node("B", None);
        let Payload::Vless(ref mut pa) = a.payload else { panic!() };
        pa.transport.kind = TransportKind::Ws;
        pa.transport.path = Some("/one".to_string());
        let Payload::Vless(ref mut pb) = b.payload else { panic!() };
        pb.transport.kind = TransportKind::Ws;
        pb.transport.path = Some("/two".to_string());
        assert_eq!(dedupe(vec![a, b]).len(), 2);
    }

    #[test]
    fn rename_is_idempotent() {
        let nodes = vec![ss_node("N", "a", 1, "x")];
        let once = rename(nodes, "Lab");
        let twice = rename(once.clone(), "Lab");
        assert_eq!(once, twice);
        assert_eq!(once[0].name, "Lab - N");
    }
}
