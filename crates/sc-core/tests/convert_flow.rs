//! End-to-end conversion flows: document in, rendered dialect out.

use sc_core::produce::{ProduceOptions, Target};
use sc_core::{parse_document, process, produce, ProcessOptions, RuleTemplate, SourceFormat};

const MIXED_DOC: &str = "\
ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@1.2.3.4:8388#HK-01
trojan://secret@tr.example.com:443?sni=tr.example.com#US-Trojan
vless://11111111-2222-3333-4444-555555555555@vl.example.com:443?type=ws&path=%2Fws&security=tls#JP-Vless
hysteria2://hpass@hy.example.com:8443?sni=hy.example.com#SG-Hy2
";

#[test]
fn uri_list_to_clash_flow_style() {
    let doc = parse_document(MIXED_DOC);
    assert_eq!(doc.format, Some(SourceFormat::UriList));
    assert_eq!(doc.nodes.len(), 4);
    assert!(doc.diagnostics.is_empty());

    let yaml = produce(&doc.nodes, Target::StructuredConfig, &ProduceOptions::default());
    assert!(yaml.contains("proxies:\n"));
    // Flow style, one map per line.
    for line in yaml.lines().filter(|l| l.starts_with("  - {")) {
        assert!(line.ends_with('}'));
    }
    assert!(yaml.contains("\"name\":\"HK-01\""));
    assert!(yaml.contains("\"type\":\"trojan\""));
    assert!(yaml.contains("\"type\":\"hysteria2\""));
    assert!(yaml.contains("\"name\":\"PROXY\""));
    assert!(yaml.contains("url-test"));
}

#[test]
fn surge_omits_unsupported_without_error() {
    let doc = parse_document(MIXED_DOC);
    let text = produce(&doc.nodes, Target::SurgeText, &ProduceOptions::default());
    assert!(text.contains("HK-01 = ss, 1.2.3.4, 8388"));
    assert!(text.contains("US-Trojan = trojan"));
    assert!(text.contains("SG-Hy2 = hysteria2"));
    // vless has no Surge rendering; the node silently drops out.
    assert!(!text.contains("JP-Vless ="));
    assert!(!text.contains("select, AUTO, HK-01, US-Trojan, JP-Vless"));
}

#[test]
fn singbox_output_is_valid_json_with_groups() {
    let doc = parse_document(MIXED_DOC);
    let text = produce(&doc.nodes, Target::JsonConfig, &ProduceOptions::default());
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let outbounds = value["outbounds"].as_array().unwrap();
    let tags: Vec<&str> = outbounds
        .iter()
        .filter_map(|o| o["tag"].as_str())
        .collect();
    assert!(tags.contains(&"HK-01"));
    assert!(tags.contains(&"JP-Vless"));
    assert!(tags.contains(&"PROXY"));
    assert!(tags.contains(&"AUTO"));
}

#[test]
fn base64_wrapped_document_unwraps_once() {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    let encoded = STANDARD.encode(MIXED_DOC.as_bytes());
    let doc = parse_document(&encoded);
    assert_eq!(doc.format, Some(SourceFormat::Base64));
    assert_eq!(doc.nodes.len(), 4);

    // A second wrapping layer is past the depth cap.
    let double = STANDARD.encode(encoded.as_bytes());
    let doc = parse_document(&double);
    assert!(doc.nodes.is_empty());
}

#[test]
fn pipeline_then_produce() {
    let doc = parse_document(MIXED_DOC);
    let nodes = process(
        doc.nodes,
        &ProcessOptions {
            include: Vec::new(),
            exclude: vec!["proto:vless".into()],
            dedupe: true,
            rename_label: Some("Mine".into()),
        },
    );
    assert_eq!(nodes.len(), 3);
    assert!(nodes.iter().all(|n| n.name.starts_with("Mine - ")));

    let text = produce(&nodes, Target::LoonText, &ProduceOptions::default());
    assert!(text.contains("Mine - HK-01 = Shadowsocks,1.2.3.4,8388"));
}

#[test]
fn rule_template_renders_in_every_structural_dialect() {
    let template = RuleTemplate::parse(
        "DOMAIN-SUFFIX,example.com,PROXY\nGEOIP,CN,DIRECT\nFINAL,PROXY\n",
    );
    let doc = parse_document(MIXED_DOC);
    let opts = ProduceOptions {
        rule_template: Some(template),
        filename_hint: None,
    };

    let clash = produce(&doc.nodes, Target::StructuredConfig, &opts);
    assert!(clash.contains("rules:\n"));
    assert!(clash.contains("DOMAIN-SUFFIX,example.com,PROXY"));
    assert!(clash.contains("MATCH,PROXY"));

    let surge = produce(&doc.nodes, Target::SurgeText, &opts);
    assert!(surge.contains("[Rule]\nDOMAIN-SUFFIX,example.com,PROXY"));
    assert!(surge.contains("FINAL,PROXY"));

    let quanx = produce(&doc.nodes, Target::QuantumultxText, &opts);
    assert!(quanx.contains("[filter_local]\nhost-suffix, example.com, PROXY"));
    assert!(quanx.contains("final, PROXY"));
}

#[test]
fn builtin_minimal_template_renders() {
    let doc = parse_document(MIXED_DOC);
    let opts = ProduceOptions {
        rule_template: Some(RuleTemplate::minimal("PROXY")),
        filename_hint: None,
    };

    let clash = produce(&doc.nodes, Target::StructuredConfig, &opts);
    assert!(clash.contains("GEOIP,CN,DIRECT"));
    assert!(clash.contains("IP-CIDR,192.168.0.0/16,DIRECT"));
    assert!(clash.contains("MATCH,PROXY"));
}
