//! subconv: 订阅转换命令行入口。
//! Reads a subscription document, runs the node pipeline, renders the
//! chosen target dialect.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sc_core::produce::{ProduceOptions, Target};
use sc_core::{process, ProcessOptions, RuleTemplate, SubInfo};

#[derive(Parser, Debug)]
#[command(name = "subconv", version, about = "Proxy subscription converter")]
struct Args {
    /// Input file; `-` or absent reads stdin.
    input: Option<PathBuf>,

    /// Output dialect: clash | singbox | surge | loon | quanx | base64.
    #[arg(short, long, default_value = "clash")]
    target: Target,

    /// Keep only nodes matching these rules (`proto:ss`, regex, or substring).
    #[arg(long)]
    include: Vec<String>,

    /// Drop nodes matching these rules; exclusion wins over inclusion.
    #[arg(long)]
    exclude: Vec<String>,

    /// Collapse endpoint duplicates, keeping the shortest name.
    #[arg(long)]
    dedupe: bool,

    /// Prefix every node name with this label.
    #[arg(long)]
    rename: Option<String>,

    /// Routing rule template file (`KIND,value,TARGET` lines); absent
    /// uses a built-in minimal template.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Output file; absent writes stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let text = read_input(args.input.as_deref())?;

    if let Some(info) = SubInfo::scan(&text) {
        info!(
            upload = ?info.upload,
            download = ?info.download,
            total = ?info.total,
            expire = ?info.expire,
            "subscription userinfo"
        );
    }

    let doc = sc_core::parse_document(&text);
    for diag in &doc.diagnostics {
        warn!(index = diag.index, dialect = %diag.dialect, reason = %diag.reason, "entry skipped");
    }
    if doc.nodes.is_empty() {
        bail!(
            "no valid nodes in input (detected format: {})",
            doc.format.map(|f| f.name()).unwrap_or("unknown")
        );
    }
    info!(
        nodes = doc.nodes.len(),
        skipped = doc.diagnostics.len(),
        format = doc.format.map(|f| f.name()).unwrap_or("unknown"),
        "document parsed"
    );

    let nodes = process(
        doc.nodes,
        &ProcessOptions {
            include: args.include.clone(),
            exclude: args.exclude.clone(),
            dedupe: args.dedupe,
            rename_label: args.rename.clone(),
        },
    );
    if nodes.is_empty() {
        bail!("all nodes were filtered out");
    }

    let rule_template = match &args.rules {
        Some(path) => {
            let body = fs::read_to_string(path)
                .with_context(|| format!("reading rule template {}", path.display()))?;
            Some(RuleTemplate::parse(&body))
        }
        // The producers route FINAL traffic into their select group.
        None => Some(RuleTemplate::minimal("PROXY")),
    };
    let opts = ProduceOptions {
        rule_template,
        filename_hint: args
            .output
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned()),
    };

    let rendered = sc_core::produce(&nodes, args.target, &opts);

    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", rendered),
    }
    Ok(())
}

fn read_input(path: Option<&std::path::Path>) -> anyhow::Result<String> {
    match path {
        Some(p) if p.as_os_str() != "-" => {
            fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}
