//! Document-level parsing: classify, pick a strategy, decode per item.
//! 文档级解析：识别格式、选择策略、逐项解码。
//!
//! A malformed item never aborts the batch: it becomes a [`Diagnostic`]
//! and the rest of the document is still processed. Nested encodings
//! (Base64 wrapping a URI list or JSON) are unwrapped at most one level
//! to keep adversarial input from recursing.

use serde_json::Value;
use tracing::{debug, warn};

use crate::classify::{self, SourceFormat};
use crate::error::{DocumentError, ParseError};
use crate::link;
use crate::model::{Node, Payload, Shadowsocks};
use crate::{clash_input, util};

/// Why one input item was skipped.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Item index within the document (line or array position).
    pub index: usize,
    /// Dialect the document was classified as.
    pub dialect: SourceFormat,
    pub reason: String,
}

/// Outcome of parsing one whole document.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub format: Option<SourceFormat>,
    /// Successfully decoded nodes, input order preserved.
    pub nodes: Vec<Node>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedDocument {
    fn new(format: SourceFormat) -> Self {
        Self {
            format: Some(format),
            ..Self::default()
        }
    }

    fn skip(&mut self, index: usize, reason: impl Into<String>) {
        let reason = reason.into();
        let dialect = self.format.unwrap_or(SourceFormat::Unknown);
        debug!(index, dialect = %dialect, %reason, "skipping item");
        self.diagnostics.push(Diagnostic {
            index,
            dialect,
            reason,
        });
    }

    /// Collapse into the caller-facing result: empty means
    /// "no valid nodes found", carried as a value rather than a panic
    /// or an opaque error.
    pub fn into_nodes(self) -> Result<Vec<Node>, DocumentError> {
        if self.nodes.is_empty() {
            Err(DocumentError::NoValidNodes {
                format: self.format.unwrap_or(SourceFormat::Unknown),
            })
        } else {
            Ok(self.nodes)
        }
    }
}

/// Classify `text` and decode every item it contains.
pub fn parse_document(text: &str) -> ParsedDocument {
    parse_with_depth(text, 0)
}

/// Extra Base64 unwrap levels allowed beyond the first.
const MAX_UNWRAP_DEPTH: usize = 1;

fn parse_with_depth(text: &str, depth: usize) -> ParsedDocument {
    let format = classify::detect(text);
    let mut doc = ParsedDocument::new(format);
    match format {
        SourceFormat::HtmlError => {
            warn!("input looks like an HTML error page, refusing to parse");
            doc.skip(0, "html error page (captive portal or hijacked response)");
        }
        SourceFormat::JsonServerList => parse_json_server_list(text, &mut doc),
        SourceFormat::StructuredConfig => parse_structured(text, &mut doc),
        SourceFormat::UriList => parse_uri_list(text, &mut doc),
        SourceFormat::PlatformLine => parse_platform_lines(text, &mut doc),
        SourceFormat::Base64 => {
            if depth >= MAX_UNWRAP_DEPTH {
                doc.skip(0, "base64 nesting too deep");
            } else {
                match util::b64_decode_str(text.trim()) {
                    Some(inner) => {
                        let mut inner_doc = parse_with_depth(&inner, depth + 1);
                        // Keep the outer classification; the inner one is
                        // an implementation detail of the unwrap.
                        doc.nodes = std::mem::take(&mut inner_doc.nodes);
                        doc.diagnostics = std::mem::take(&mut inner_doc.diagnostics);
                    }
                    None => doc.skip(0, "base64 body failed to decode"),
                }
            }
        }
        SourceFormat::Unknown => {
            // Fallback ladder: line-by-line links, then one Base64 unwrap.
            parse_uri_list(text, &mut doc);
            if doc.nodes.is_empty() && depth < MAX_UNWRAP_DEPTH {
                if let Some(inner) = util::b64_decode_str(text.trim()) {
                    let inner_doc = parse_with_depth(&inner, depth + 1);
                    if !inner_doc.nodes.is_empty() {
                        doc.nodes = inner_doc.nodes;
                        doc.diagnostics = inner_doc.diagnostics;
                        return doc;
                    }
                }
            }
            if doc.nodes.is_empty() {
                doc.diagnostics.clear();
                doc.skip(0, "unrecognized document format");
            }
        }
    }
    doc
}

fn parse_uri_list(text: &str, doc: &mut ParsedDocument) {
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        match link::parse_line(line) {
            Ok(node) => doc.nodes.push(node),
            Err(e) => doc.skip(index, e.to_string()),
        }
    }
}

fn parse_platform_lines(text: &str, doc: &mut ParsedDocument) {
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') || line.starts_with('[')
        {
            continue;
        }
        // Scheme-style links may be mixed into platform documents.
        let parsed = if classify::has_proto_prefix(line) {
            link::parse_line(line)
        } else {
            link::quantumult::parse_line(line)
        };
        match parsed {
            Ok(node) => doc.nodes.push(node),
            Err(e) => doc.skip(index, e.to_string()),
        }
    }
}

fn parse_structured(text: &str, doc: &mut ParsedDocument) {
    match clash_input::parse(text) {
        Ok(entries) => {
            for (index, entry) in entries.into_iter().enumerate() {
                match entry {
                    Ok(node) => doc.nodes.push(node),
                    Err(e) => doc.skip(index, e.to_string()),
                }
            }
        }
        Err(e) => doc.skip(0, format!("structured config rejected: {e}")),
    }
}

/// SIP008-style `{"version":1,"servers":[...]}` documents.
fn parse_json_server_list(text: &str, doc: &mut ParsedDocument) {
    let json: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            doc.skip(0, format!("json rejected: {e}"));
            return;
        }
    };
    let Some(servers) = json.get("servers").and_then(Value::as_array) else {
        doc.skip(0, "no servers array");
        return;
    };
    for (index, entry) in servers.iter().enumerate() {
        match sip008_entry(entry) {
            Some(node) => doc.nodes.push(node),
            None => doc.skip(index, "incomplete server object"),
        }
    }
}

/// Map one SIP008 server object onto a shadowsocks node. Shared with the
/// `ss://` JSON-in-base64 sub-format.
pub fn sip008_entry(entry: &Value) -> Option<Node> {
    let server = entry.get("server")?.as_str().filter(|s| !s.is_empty())?.to_string();
    let port = match entry.get("server_port").or_else(|| entry.get("port"))? {
        Value::Number(n) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .filter(|p| *p > 0)?;
    let password = entry.get("password")?.as_str()?.to_string();
    let cipher = entry.get("method")?.as_str()?.to_string();
    let name = entry
        .get("remarks")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Node::default_name(&server, port));
    let (plugin, plugin_opts) = match entry.get("plugin").and_then(Value::as_str) {
        Some(p) if !p.is_empty() => {
            let opts_raw = entry.get("plugin_opts").and_then(Value::as_str).unwrap_or("");
            let opts = opts_raw
                .split(';')
                .filter(|tok| !tok.is_empty())
                .map(|tok| match tok.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (tok.to_string(), String::new()),
                })
                .collect();
            (Some(p.to_string()), opts)
        }
        _ => (None, Vec::new()),
    };
    Some(Node {
        name,
        server,
        port,
        udp: true,
        raw_uri: None,
        payload: Payload::Shadowsocks(Shadowsocks {
            cipher,
            password,
            plugin,
            plugin_opts,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_page_yields_zero_nodes_with_reason() {
        let doc = parse_document("<!DOCTYPE html>\n<html><body>blocked</body></html>");
        assert_eq!(doc.format, Some(SourceFormat::HtmlError));
        assert!(doc.nodes.is_empty());
        assert!(!doc.diagnostics.is_empty());
        let err = doc.into_nodes().unwrap_err();
        assert!(err.to_string().contains("html-error"));
    }

    #[test]
    fn one_bad_line_does_not_sink_the_batch() {
        let text = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@1.2.3.4:8388#A\n\
                    ss://not-base64-at-all\n\
                    trojan://pw@t.example:443#B";
        let doc = parse_document(text);
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.diagnostics.len(), 1);
        assert_eq!(doc.diagnostics[0].index, 1);
    }

    #[test]
    fn base64_document_unwraps_once() {
        let inner = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@1.2.3.4:8388#A\nvless://u@v.example:443#B";
        let doc = parse_document(&util::b64_encode(inner));
        assert_eq!(doc.format, Some(SourceFormat::Base64));
        assert_eq!(doc.nodes.len(), 2);
    }

    #[test]
    fn double_base64_is_cut_off() {
        let inner = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@1.2.3.4:8388#A";
        let once = util::b64_encode(inner);
        let twice = util::b64_encode(&once);
        // One unwrap is allowed, the second is not.
        let doc = parse_document(&twice);
        assert!(doc.nodes.is_empty());
    }

    #[test]
    fn sip008_document() {
        let text = r#"{"version":1,"servers":[
            {"remarks":"S1","server":"1.2.3.4","server_port":8388,"password":"pw","method":"aes-256-gcm"},
            {"server":"bad"}
        ]}"#;
        let doc = parse_document(text);
        assert_eq!(doc.format, Some(SourceFormat::JsonServerList));
        assert_eq!(doc.nodes.len(), 1);
        assert_eq!(doc.nodes[0].name, "S1");
        assert_eq!(doc.diagnostics.len(), 1);
    }
}
