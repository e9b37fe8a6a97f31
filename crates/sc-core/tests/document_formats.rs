//! Classifier-driven parsing across the input dialects.

use sc_core::{parse_document, SourceFormat};

#[test]
fn clash_yaml_document() {
    let doc = parse_document(
        r#"
port: 7890
proxies:
  - name: "HK"
    type: ss
    server: 1.2.3.4
    port: 8388
    cipher: aes-256-gcm
    password: pw
  - name: "VM"
    type: vmess
    server: v.example
    port: 443
    uuid: 11111111-2222-3333-4444-555555555555
    alterId: 0
    cipher: auto
    network: ws
    ws-opts:
      path: /chat
"#,
    );
    assert_eq!(doc.format, Some(SourceFormat::StructuredConfig));
    assert_eq!(doc.nodes.len(), 2);
    assert_eq!(doc.nodes[0].proto(), "ss");
    assert_eq!(doc.nodes[1].proto(), "vmess");
}

#[test]
fn sip008_server_list() {
    let doc = parse_document(
        r#"{"version":1,"servers":[
            {"server":"1.2.3.4","server_port":8388,"password":"pw","method":"aes-256-gcm","remarks":"HK"},
            {"server":"5.6.7.8","server_port":443,"password":"pw2","method":"chacha20-ietf-poly1305"}
        ]}"#,
    );
    assert_eq!(doc.format, Some(SourceFormat::JsonServerList));
    assert_eq!(doc.nodes.len(), 2);
    assert_eq!(doc.nodes[0].name, "HK");
    // No remarks falls back to server:port.
    assert_eq!(doc.nodes[1].name, "5.6.7.8:443");
}

#[test]
fn platform_lines() {
    let doc = parse_document(
        "shadowsocks = 1.2.3.4:8388, method=aes-256-gcm, password=pw, tag=HK\n\
         trojan = tr.example:443, password=secret, over-tls=true, tag=TR\n",
    );
    assert_eq!(doc.format, Some(SourceFormat::PlatformLine));
    assert_eq!(doc.nodes.len(), 2);
    assert_eq!(doc.nodes[0].name, "HK");
    assert_eq!(doc.nodes[1].proto(), "trojan");
}

#[test]
fn html_hijack_page_yields_nothing() {
    let doc = parse_document("<!DOCTYPE html><html><body>Pay your bill</body></html>");
    assert_eq!(doc.format, Some(SourceFormat::HtmlError));
    assert!(doc.nodes.is_empty());
    assert_eq!(doc.diagnostics.len(), 1);
}

#[test]
fn bad_entry_does_not_sink_the_rest() {
    let doc = parse_document(
        "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@1.2.3.4:8388#OK\n\
         ss://not-base64-at-all\n\
         trojan://pw@t.example:443#Also-OK\n",
    );
    assert_eq!(doc.nodes.len(), 2);
    assert_eq!(doc.diagnostics.len(), 1);
    assert_eq!(doc.diagnostics[0].index, 1);
}
