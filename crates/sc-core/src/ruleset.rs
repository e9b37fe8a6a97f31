//! Routing rule templates consumed by the structural producers.
//!
//! A template is an ordered list of `{match-kind, value, target}`
//! triples; each producer translates it into its own rule syntax.

/// Match kind of one routing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Domain,
    DomainSuffix,
    DomainKeyword,
    IpCidr,
    GeoIp,
    /// Catch-all; `value` is ignored.
    Final,
}

impl RuleKind {
    fn from_token(tok: &str) -> Option<Self> {
        match tok.to_ascii_uppercase().as_str() {
            "DOMAIN" => Some(Self::Domain),
            "DOMAIN-SUFFIX" => Some(Self::DomainSuffix),
            "DOMAIN-KEYWORD" => Some(Self::DomainKeyword),
            "IP-CIDR" | "IP-CIDR6" => Some(Self::IpCidr),
            "GEOIP" => Some(Self::GeoIp),
            "FINAL" | "MATCH" => Some(Self::Final),
            _ => None,
        }
    }
}

/// One `{match-kind, value, target}` triple.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub kind: RuleKind,
    pub value: String,
    /// Policy target, usually a group name.
    pub target: String,
}

/// Ordered rule list supplied by the host.
#[derive(Debug, Clone, Default)]
pub struct RuleTemplate {
    pub rules: Vec<RouteRule>,
}

impl RuleTemplate {
    /// Parse Clash/Surge-style `KIND,value,TARGET` lines; unknown kinds
    /// are skipped, `FINAL,TARGET` takes two fields.
    pub fn parse(text: &str) -> Self {
        let mut rules = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let parts: Vec<&str> = line.split(',').map(str::trim).collect();
            let Some(kind) = RuleKind::from_token(parts[0]) else {
                continue;
            };
            let rule = if kind == RuleKind::Final {
                parts.get(1).map(|target| RouteRule {
                    kind,
                    value: String::new(),
                    target: target.to_string(),
                })
            } else {
                match (parts.get(1), parts.get(2)) {
                    (Some(value), Some(target)) => Some(RouteRule {
                        kind,
                        value: value.to_string(),
                        target: target.to_string(),
                    }),
                    _ => None,
                }
            };
            if let Some(rule) = rule {
                rules.push(rule);
            }
        }
        Self { rules }
    }

    /// Built-in minimal template: domestic traffic direct, rest proxied.
    pub fn minimal(proxy_group: &str) -> Self {
        let direct = "DIRECT".to_string();
        Self {
            rules: vec![
                RouteRule {
                    kind: RuleKind::GeoIp,
                    value: "CN".to_string(),
                    target: direct.clone(),
                },
                RouteRule {
                    kind: RuleKind::IpCidr,
                    value: "192.168.0.0/16".to_string(),
                    target: direct.clone(),
                },
                RouteRule {
                    kind: RuleKind::IpCidr,
                    value: "10.0.0.0/8".to_string(),
                    target: direct,
                },
                RouteRule {
                    kind: RuleKind::Final,
                    value: String::new(),
                    target: proxy_group.to_string(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_triples_and_skips_unknown() {
        let t = RuleTemplate::parse(
            "# comment\nDOMAIN-SUFFIX,google.com,PROXY\nWEIRD-KIND,x,y\nFINAL,PROXY\n",
        );
        assert_eq!(t.rules.len(), 2);
        assert_eq!(t.rules[0].kind, RuleKind::DomainSuffix);
        assert_eq!(t.rules[1].kind, RuleKind::Final);
        assert_eq!(t.rules[1].target, "PROXY");
    }

    #[test]
    fn minimal_routes_domestic_direct_and_ends_in_final() {
        let t = RuleTemplate::minimal("PROXY");
        assert!(t
            .rules
            .iter()
            .any(|r| r.kind == RuleKind::GeoIp && r.value == "CN" && r.target == "DIRECT"));
        assert!(t
            .rules
            .iter()
            .filter(|r| r.kind == RuleKind::IpCidr)
            .all(|r| r.target == "DIRECT"));
        let last = t.rules.last().unwrap();
        assert_eq!(last.kind, RuleKind::Final);
        assert_eq!(last.target, "PROXY");
    }
}
