//! Subscription traffic/expiry metadata.
//!
//! Providers ship this either as a `subscription-userinfo` response
//! header or as an informational first line of the document, always in
//! the `upload=..; download=..; total=..; expire=..` shape. It is
//! surfaced to the host and never rendered into proxy lines.

/// Byte counters plus an optional unix expiry timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubInfo {
    pub upload: Option<u64>,
    pub download: Option<u64>,
    pub total: Option<u64>,
    pub expire: Option<u64>,
}

impl SubInfo {
    /// Parse a `key=value; key=value` line. Unknown keys are ignored;
    /// returns `None` when no known key is present.
    pub fn parse(line: &str) -> Option<Self> {
        let mut info = SubInfo::default();
        let mut seen = false;
        for part in line.split(';') {
            let (key, value) = match part.split_once('=') {
                Some(kv) => kv,
                None => continue,
            };
            let value = value.trim();
            // expire can arrive as a float timestamp.
            let num = value
                .parse::<u64>()
                .ok()
                .or_else(|| value.parse::<f64>().ok().map(|f| f as u64));
            match key.trim().to_ascii_lowercase().as_str() {
                "upload" => {
                    info.upload = num;
                    seen = true;
                }
                "download" => {
                    info.download = num;
                    seen = true;
                }
                "total" => {
                    info.total = num;
                    seen = true;
                }
                "expire" => {
                    info.expire = num;
                    seen = true;
                }
                _ => {}
            }
        }
        seen.then_some(info)
    }

    /// Look for the metadata in the first few lines of a document,
    /// tolerating comment markers in front of it.
    pub fn scan(text: &str) -> Option<Self> {
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .take(3)
            .find_map(|line| {
                let line = line
                    .trim()
                    .trim_start_matches(['#', ';'])
                    .trim_start_matches("//")
                    .trim();
                let line = line.strip_prefix("STATUS=").unwrap_or(line);
                Self::parse(line)
            })
    }

    /// Bytes still available, when both counters are known.
    pub fn remaining(&self) -> Option<u64> {
        let used = self.upload.unwrap_or(0) + self.download.unwrap_or(0);
        self.total.map(|t| t.saturating_sub(used))
    }
}
