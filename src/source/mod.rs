// src/source/mod.rs
pub mod feed;
pub mod page;

use anyhow::Result;
use once_cell::sync::OnceCell;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Sent with every outbound request so the profile owner can tell the
/// agent apart from browser traffic.
pub const USER_AGENT: &str = "mixsite-agent/0.1";

/// One piece of externally hosted audio content with its metadata.
/// Values produced by a source have `first_seen_at = None` until the
/// store accepts them.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mix {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    /// Raw feed timestamp string, e.g. RFC 2822. Kept verbatim.
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub play_count: u32,
    #[serde(default)]
    pub favorite_count: u32,
    /// RFC 3339, set by the store on insert.
    #[serde(default)]
    pub first_seen_at: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

impl Mix {
    /// Build a mix from the two required fields; everything else defaults
    /// to empty. The id is derived from the URL.
    pub fn from_link(title: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: mix_id_from_url(&url),
            title: title.into(),
            url,
            description: String::new(),
            published: String::new(),
            thumbnail: String::new(),
            duration: String::new(),
            tags: Vec::new(),
            play_count: 0,
            favorite_count: 0,
            first_seen_at: None,
            is_featured: false,
        }
    }
}

/// Derive the stable mix id: the last non-empty path segment of the URL,
/// or an 8-hex-char SHA-256 prefix of the whole URL when no segment can
/// be extracted.
pub fn mix_id_from_url(url: &str) -> String {
    static RE_LAST_SEGMENT: OnceCell<Regex> = OnceCell::new();
    let re = RE_LAST_SEGMENT.get_or_init(|| Regex::new(r"/([^/]+)/?$").unwrap());
    if let Some(caps) = re.captures(url) {
        return caps[1].to_string();
    }
    let digest = Sha256::digest(url.as_bytes());
    digest
        .iter()
        .take(4)
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[async_trait::async_trait]
pub trait MixSource: Send + Sync {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Mix>>;
    fn name(&self) -> &'static str;
}

/// Try each source in order and return the first non-empty result.
/// Errors and empty results both fall through to the next strategy;
/// nothing propagates to the caller.
pub async fn fetch_first_non_empty(sources: &[Box<dyn MixSource>], limit: usize) -> Vec<Mix> {
    for source in sources {
        match source.fetch_latest(limit).await {
            Ok(mixes) if !mixes.is_empty() => return mixes,
            Ok(_) => {
                tracing::debug!(source = source.name(), "source returned no mixes, trying next")
            }
            Err(e) => tracing::warn!(error = ?e, source = source.name(), "source error"),
        }
    }
    Vec::new()
}
