//! Base64 share-link list producer.
//!
//! Rebuilds (or replays) one URI per node, joins with newlines, and
//! base64-encodes the whole document. Every protocol has a URI form,
//! so nothing is skipped here.

use crate::model::Node;
use crate::produce::ProduceOptions;
use crate::uri::build_uri;
use crate::util::b64_encode;

pub fn produce(nodes: &[Node], _opts: &ProduceOptions) -> String {
    let lines: Vec<String> = nodes.iter().map(build_uri).collect();
    b64_encode(lines.join("\n").as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_document;
    use crate::util::b64_decode_str;

    #[test]
    fn encoded_list_round_trips_through_the_classifier() {
        let doc = parse_document("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@1.2.3.4:8388#TestNode\n");
        let encoded = produce(&doc.nodes, &ProduceOptions::default());
        let plain = b64_decode_str(&encoded).unwrap();
        assert!(plain.starts_with("ss://"));
        let back = parse_document(&plain);
        assert_eq!(back.nodes.len(), 1);
        assert_eq!(back.nodes[0].name, "TestNode");
    }
}
