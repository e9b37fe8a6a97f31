//! Subscription conversion core.
//! 订阅转换核心库。
//!
//! Turns proxy-subscription documents of any recognizable dialect into a
//! canonical node list, runs them through a filter/dedupe/rename
//! pipeline, and renders the result in a target dialect:
//! - Input classification and unwrapping (`classify`, `document`)
//! - Share-link grammars, one parser per scheme (`link`)
//! - Clash-style YAML ingestion (`clash_input`)
//! - Node processing (`pipeline`)
//! - Output producers (`produce`) and share-link rebuilding (`uri`)

pub mod classify;
pub mod clash_input;
pub mod document;
pub mod error;
pub mod link;
pub mod model;
pub mod pipeline;
pub mod produce;
pub mod ruleset;
pub mod subinfo;
pub mod uri;
pub mod util;

pub use classify::SourceFormat;
pub use document::{parse_document, ParsedDocument};
pub use error::{DocumentError, ParseError, ProduceError};
pub use model::{Node, Payload};
pub use pipeline::{process, ProcessOptions};
pub use produce::{produce, ProduceOptions, Target};
pub use ruleset::RuleTemplate;
pub use subinfo::SubInfo;
