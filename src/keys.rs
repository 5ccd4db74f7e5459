//! Key-space layout shared by every crawl-state component.
//!
//! All keys of one crawl live under a single prefix so several crawls can
//! share one Redis database:
//! - `<prefix>:request:<id>` visited markers
//! - `<prefix>:cookie:<host>` cookie blobs
//! - `<prefix>:queue` pending work list

const REQUEST_SEGMENT: &str = "request";
const COOKIE_SEGMENT: &str = "cookie";
const QUEUE_SEGMENT: &str = "queue";

/// Builds fully-qualified keys for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn visited_key(&self, id: u64) -> String {
        format!("{}:{}:{}", self.prefix, REQUEST_SEGMENT, id)
    }

    pub fn cookie_key(&self, host: &str) -> String {
        format!("{}:{}:{}", self.prefix, COOKIE_SEGMENT, host)
    }

    pub fn queue_key(&self) -> String {
        format!("{}:{}", self.prefix, QUEUE_SEGMENT)
    }

    /// Glob matching every cookie record of this prefix.
    pub fn cookie_pattern(&self) -> String {
        format!("{}:{}:*", escape_glob(&self.prefix), COOKIE_SEGMENT)
    }

    /// Glob matching every visited marker of this prefix.
    pub fn visited_pattern(&self) -> String {
        format!("{}:{}:*", escape_glob(&self.prefix), REQUEST_SEGMENT)
    }
}

/// Escape Redis glob metacharacters so a prefix only ever matches itself.
pub fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
