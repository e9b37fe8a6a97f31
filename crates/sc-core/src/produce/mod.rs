//! Per-target producers: encode a node sequence into one client dialect.
//! 目标端生成器：把节点序列编码为某一客户端方言。
//!
//! Every producer declares its own protocol support matrix; a node the
//! dialect cannot express yields a per-item [`ProduceError`] that the
//! driver logs and skips; one exotic node never sinks the document.

mod base64_list;
mod clash;
mod loon;
mod quantumultx;
mod singbox;
mod surge;

use tracing::debug;

use crate::error::ProduceError;
use crate::model::Node;
use crate::ruleset::RuleTemplate;

/// Output dialect identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    StructuredConfig,
    JsonConfig,
    SurgeText,
    LoonText,
    QuantumultxText,
    Base64UriList,
}

impl Target {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StructuredConfig => "clash",
            Self::JsonConfig => "singbox",
            Self::SurgeText => "surge",
            Self::LoonText => "loon",
            Self::QuantumultxText => "quanx",
            Self::Base64UriList => "base64",
        }
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clash" | "structured" | "yaml" => Ok(Self::StructuredConfig),
            "singbox" | "sing-box" | "json" => Ok(Self::JsonConfig),
            "surge" => Ok(Self::SurgeText),
            "loon" => Ok(Self::LoonText),
            "quanx" | "quantumultx" | "qx" => Ok(Self::QuantumultxText),
            "base64" | "mixed" | "uri" => Ok(Self::Base64UriList),
            other => Err(format!("unknown target: {other}")),
        }
    }
}

/// Rendering options shared by all producers.
#[derive(Debug, Clone, Default)]
pub struct ProduceOptions {
    /// Routing rules for the structural dialects; `None` emits no rules.
    pub rule_template: Option<RuleTemplate>,
    /// Advisory output file name, embedded as a header comment where the
    /// dialect supports one.
    pub filename_hint: Option<String>,
}

/// Group names used by every structural producer.
pub(crate) const GROUP_SELECT: &str = "PROXY";
pub(crate) const GROUP_AUTO: &str = "AUTO";
pub(crate) const TEST_URL: &str = "http://www.gstatic.com/generate_204";

/// Render `nodes` into `target`. Unsupported nodes are skipped with a
/// debug log; the document itself always renders.
pub fn produce(nodes: &[Node], target: Target, opts: &ProduceOptions) -> String {
    match target {
        Target::StructuredConfig => clash::produce(nodes, opts),
        Target::JsonConfig => singbox::produce(nodes, opts),
        Target::SurgeText => surge::produce(nodes, opts),
        Target::LoonText => loon::produce(nodes, opts),
        Target::QuantumultxText => quantumultx::produce(nodes, opts),
        Target::Base64UriList => base64_list::produce(nodes, opts),
    }
}

/// Shared driver helper: run `f` over the nodes, collect the rendered
/// values, log-and-skip per-item failures.
pub(crate) fn render_each<T>(
    nodes: &[Node],
    dialect: &'static str,
    f: impl Fn(&Node) -> Result<T, ProduceError>,
) -> Vec<(usize, T)> {
    let mut out = Vec::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        match f(node) {
            Ok(v) => out.push((i, v)),
            Err(e) => debug!(dialect, node = %node.name, error = %e, "node skipped"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parses_aliases() {
        assert_eq!("clash".parse::<Target>().unwrap(), Target::StructuredConfig);
        assert_eq!("qx".parse::<Target>().unwrap(), Target::QuantumultxText);
        assert!("t-rex".parse::<Target>().is_err());
    }
}
