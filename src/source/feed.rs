use anyhow::{Context, Result};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;

use crate::source::{Mix, MixSource, USER_AGENT};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    // quick-xml's serde deserializer matches elements by local name, so
    // media:thumbnail and itunes:duration bind without their prefixes.
    #[serde(rename = "thumbnail")]
    thumbnail: Option<MediaThumbnail>,
    #[serde(rename = "duration")]
    duration: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<String>,
}
#[derive(Debug, Deserialize)]
struct MediaThumbnail {
    #[serde(rename = "@url")]
    url: Option<String>,
}

/// Primary strategy: the per-profile RSS feed.
pub struct FeedSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl FeedSource {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client: reqwest::Client::new(),
            },
        }
    }

    /// Parse from an in-memory document; used by tests and tooling.
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    fn parse_items_from_str(s: &str, limit: usize) -> Result<Vec<Mix>> {
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing mixcloud rss xml")?;

        let mut out = Vec::new();
        for it in rss.channel.item.into_iter().take(limit) {
            // Entries without a title or link carry nothing we can publish.
            let (Some(title), Some(link)) = (it.title, it.link) else {
                continue;
            };
            if title.trim().is_empty() || link.trim().is_empty() {
                continue;
            }

            let mut mix = Mix::from_link(title, link);
            mix.description = it.description.unwrap_or_default();
            mix.published = it.pub_date.unwrap_or_default();
            mix.thumbnail = it.thumbnail.and_then(|t| t.url).unwrap_or_default();
            mix.duration = it.duration.unwrap_or_default();
            mix.tags = it.categories;
            out.push(mix);
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl MixSource for FeedSource {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Mix>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s, limit),
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .header(reqwest::header::USER_AGENT, USER_AGENT)
                    .timeout(Duration::from_secs(30))
                    .send()
                    .await
                    .context("feed http get()")?
                    .text()
                    .await
                    .context("feed http .text()")?;
                Self::parse_items_from_str(&body, limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        "feed"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
