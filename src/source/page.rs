use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use scraper::{Html, Selector};
use std::time::Duration;

use crate::source::{Mix, MixSource, USER_AGENT};

/// Fallback strategy: scrape the public profile page for content cards.
/// Only title and link are recoverable here; all other fields stay empty.
pub struct ProfilePageSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

fn card_selector() -> &'static Selector {
    static SEL: OnceCell<Selector> = OnceCell::new();
    SEL.get_or_init(|| Selector::parse("div.cloudcast-item").unwrap())
}

fn title_selector() -> &'static Selector {
    static SEL: OnceCell<Selector> = OnceCell::new();
    SEL.get_or_init(|| Selector::parse("h3, h4").unwrap())
}

fn link_selector() -> &'static Selector {
    static SEL: OnceCell<Selector> = OnceCell::new();
    SEL.get_or_init(|| Selector::parse("a").unwrap())
}

impl ProfilePageSource {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client: reqwest::Client::new(),
            },
        }
    }

    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    fn parse_cards(html: &str, limit: usize) -> Vec<Mix> {
        let doc = Html::parse_document(html);
        let mut out = Vec::new();

        for card in doc.select(card_selector()).take(limit) {
            let title = card
                .select(title_selector())
                .next()
                .map(|t| t.text().collect::<String>().trim().to_string());
            let href = card
                .select(link_selector())
                .next()
                .and_then(|a| a.value().attr("href"));

            let (Some(title), Some(href)) = (title, href) else {
                tracing::warn!("skipping content card without title or link");
                continue;
            };
            if title.is_empty() {
                continue;
            }

            let url = if href.starts_with("http") {
                href.to_string()
            } else {
                format!("https://www.mixcloud.com{href}")
            };
            out.push(Mix::from_link(title, url));
        }

        out
    }
}

#[async_trait::async_trait]
impl MixSource for ProfilePageSource {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Mix>> {
        match &self.mode {
            Mode::Fixture(s) => Ok(Self::parse_cards(s, limit)),
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .header(reqwest::header::USER_AGENT, USER_AGENT)
                    .timeout(Duration::from_secs(30))
                    .send()
                    .await
                    .context("profile page http get()")?
                    .text()
                    .await
                    .context("profile page http .text()")?;
                Ok(Self::parse_cards(&body, limit))
            }
        }
    }

    fn name(&self) -> &'static str {
        "profile-page"
    }
}
